use async_trait::async_trait;
use thiserror::Error;

use crate::domain::chat::HistoryEntry;
use crate::domain::order::{OrderResultData, TrackOrderRequest};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("request could not be delivered: {0}")]
    Transport(String),
    #[error("no matching record was found")]
    NotFound,
    #[error("remote service answered with status {status}")]
    Rejected { status: u16 },
    #[error("response could not be decoded: {0}")]
    Decode(String),
    #[error("request failed validation: {0}")]
    Validation(String),
}

#[async_trait]
pub trait OrderLookup: Send + Sync {
    async fn track_order(&self, request: &TrackOrderRequest)
        -> Result<OrderResultData, RemoteError>;
}

#[async_trait]
pub trait ReplyService: Send + Sync {
    async fn reply(&self, message: &str, history: &[HistoryEntry]) -> Result<String, RemoteError>;
}

/// Routing collaborator for options that open a storefront page.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator for hosts without a router.
#[derive(Clone, Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _path: &str) {}
}
