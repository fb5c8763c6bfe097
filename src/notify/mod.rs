// src/notify/mod.rs
pub mod email;

use async_trait::async_trait;
use thiserror::Error;

use crate::capture::CaptureArtifact;
use crate::ingest::types::CanonicalPost;

pub use email::EmailSender;

/// One post and its capture, if the capture succeeded.
#[derive(Debug, Clone)]
pub struct DeliveryItem {
    pub post: CanonicalPost,
    pub artifact: Option<CaptureArtifact>,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid address {0:?}")]
    Address(String),

    #[error("building message: {0}")]
    Build(String),

    #[error("transport: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, handle: &str, items: &[DeliveryItem]) -> Result<(), DeliveryError>;
    fn name(&self) -> &'static str;
}
