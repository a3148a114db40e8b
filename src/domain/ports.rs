use crate::domain::model::{
    DealListing, FormattedMessage, IncomingMessage, PipelineResult, PostRequest,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    /// Appends `data` and returns only once it is durable.
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Produces the current deal listings. Fails with `SourceUnavailable`.
#[async_trait]
pub trait DealSource: Send + Sync {
    async fn fetch_candidates(&self) -> Result<Vec<DealListing>>;
}

/// Turns a product URL into an affiliate URL. Fails with `ConversionFailed`.
#[async_trait]
pub trait LinkConverter: Send + Sync {
    async fn convert(&self, original_url: &str) -> Result<String>;
}

/// Product ids that were already posted.
#[async_trait]
pub trait SeenStore: Send + Sync {
    fn contains(&self, product_id: &str) -> bool;
    /// Idempotent. The id is persisted before this returns.
    async fn add(&mut self, product_id: &str) -> Result<()>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sends messages to the fixed destination channel. Fails with `PublishFailed`.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&mut self, message: &FormattedMessage) -> Result<()>;
}

/// Where operator commands come from and where replies go.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn next_messages(&mut self) -> Result<Vec<IncomingMessage>>;
    async fn reply(&self, chat_id: i64, text: &str) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn run(&mut self, request: PostRequest) -> Result<PipelineResult>;
}
