//! NetworkClient port - リクエストの再送
//!
//! # 成功と失敗の境界
//! - レスポンスが返れば（HTTP status に関係なく）成功
//! - レスポンスが得られない場合だけ `NetworkError`（replay を止める）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{HeaderList, OutboundRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkResponse {
    pub status: u16,
    pub headers: HeaderList,
    pub body: Vec<u8>,
}

impl NetworkResponse {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            headers: HeaderList::new(),
            body: Vec::new(),
        }
    }
}

/// No response was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("host unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    TimedOut,

    #[error("transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<NetworkResponse, NetworkError>;
}
