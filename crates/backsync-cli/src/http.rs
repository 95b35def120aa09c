//! reqwest を使った NetworkClient

use std::time::Duration;

use async_trait::async_trait;
use backsync_core::domain::{HeaderList, OutboundRequest, RedirectPolicy};
use backsync_core::ports::{NetworkClient, NetworkError, NetworkResponse};
use tracing::{debug, warn};

pub struct ReqwestClient {
    follow: reqwest::Client,
    no_redirect: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let follow = reqwest::Client::builder().timeout(timeout).build()?;
        let no_redirect = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            follow,
            no_redirect,
        })
    }

    fn client_for(&self, request: &OutboundRequest) -> &reqwest::Client {
        match request.options.redirect {
            RedirectPolicy::Follow => &self.follow,
            RedirectPolicy::Error | RedirectPolicy::Manual => &self.no_redirect,
        }
    }
}

fn classify(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::TimedOut
    } else if err.is_connect() {
        NetworkError::Unreachable(err.to_string())
    } else {
        NetworkError::Transport(err.to_string())
    }
}

#[async_trait]
impl NetworkClient for ReqwestClient {
    async fn send(&self, request: &OutboundRequest) -> Result<NetworkResponse, NetworkError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| NetworkError::Transport(format!("bad method: {e}")))?;

        let mut builder = self.client_for(request).request(method, &request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(referrer) = &request.options.referrer {
            builder = builder.header(reqwest::header::REFERER, referrer);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        debug!(url = %request.url, status = status.as_u16(), "response received");

        // HTTP のステータスは問わない（エラー応答も「届いた」扱い）
        // redirect を拒否する設定でも、サーバーはリクエストを受け取っている
        if status.is_redirection() && request.options.redirect == RedirectPolicy::Error {
            warn!(url = %request.url, %status, "redirect not followed");
        }

        let mut headers = HeaderList::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.append(name.as_str(), value);
            }
        }
        // ステータス行が届いた時点で送信済み。body が途中で切れても再送はしない
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                warn!(url = %request.url, status = status.as_u16(), error = %e, "response body lost");
                Vec::new()
            }
        };

        Ok(NetworkResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}
