pub mod command;
pub mod engine;
pub mod format;
pub mod pipeline;

pub use crate::domain::model::{DealListing, FormattedMessage, PipelineResult, PostRequest};
pub use crate::domain::ports::{
    ChatTransport, DealSource, LinkConverter, Pipeline, Publisher, SeenStore, Storage,
};
pub use crate::utils::error::Result;
