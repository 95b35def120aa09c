//! 接続 probe - URL を定期的に叩いて offline → online の遷移で signal を発火

use std::time::Duration;

use backsync_core::ports::ConnectivitySignal;
use tokio::sync::watch;
use tracing::{debug, info};

/// Remembers the last observation; reports only offline → online edges.
#[derive(Debug, Default)]
pub struct Transitions {
    online: Option<bool>,
}

impl Transitions {
    /// Returns `true` when this observation is a transition to online.
    /// The first online observation counts, so a fresh watcher drains at start.
    pub fn observe(&mut self, online: bool) -> bool {
        let previous = self.online.replace(online);
        online && previous != Some(true)
    }
}

pub struct Probe {
    url: String,
    interval: Duration,
    client: reqwest::Client,
}

impl Probe {
    pub fn new(url: String, interval: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(interval.min(Duration::from_secs(5)))
            .build()?;
        Ok(Self {
            url,
            interval,
            client,
        })
    }

    async fn check(&self) -> bool {
        // 何らかの応答が返れば online
        match self.client.head(&self.url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(url = %self.url, error = %e, "probe failed");
                false
            }
        }
    }

    pub async fn run(self, signal: ConnectivitySignal, mut shutdown: watch::Receiver<bool>) {
        let mut transitions = Transitions::default();
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            let online = self.check().await;
            if transitions.observe(online) {
                info!(url = %self.url, "connectivity restored");
                if !signal.notify() {
                    break;
                }
            }
        }
    }
}
