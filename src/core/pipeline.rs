use crate::core::format::format_message;
use crate::domain::model::{DealListing, PipelineResult, PostRequest};
use crate::domain::ports::{DealSource, LinkConverter, Pipeline, Publisher, SeenStore};
use crate::utils::error::{DealError, Result};

/// fetch → filter unseen → convert → format → publish → record as seen.
pub struct DealPipeline<D, L, P, S>
where
    D: DealSource,
    L: LinkConverter,
    P: Publisher,
    S: SeenStore,
{
    source: D,
    converter: L,
    publisher: P,
    store: S,
}

impl<D, L, P, S> DealPipeline<D, L, P, S>
where
    D: DealSource,
    L: LinkConverter,
    P: Publisher,
    S: SeenStore,
{
    pub fn new(source: D, converter: L, publisher: P, store: S) -> Self {
        Self {
            source,
            converter,
            publisher,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    async fn unseen_candidates(&self) -> Result<(usize, Vec<DealListing>)> {
        let candidates = self.source.fetch_candidates().await?;
        let fetched = candidates.len();
        let unseen: Vec<DealListing> = candidates
            .into_iter()
            .filter(|listing| !self.store.contains(&listing.product_id))
            .collect();

        tracing::info!(
            "📦 Fetched {} listings, {} not posted before",
            fetched,
            unseen.len()
        );
        Ok((fetched, unseen))
    }

    /// What a run would post, without converting, publishing or recording anything.
    pub async fn preview(&self, request: PostRequest) -> Result<Vec<DealListing>> {
        let (_, unseen) = self.unseen_candidates().await?;
        Ok(unseen.into_iter().take(request.count()).collect())
    }

    pub async fn run(&mut self, request: PostRequest) -> Result<PipelineResult> {
        tracing::info!("🚀 Starting pipeline run for {} listings", request.count());

        let (_, unseen) = match self.unseen_candidates().await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!("❌ Aborting run, nothing posted: {}", e);
                return Err(e);
            }
        };

        let mut result = PipelineResult::new(request.count(), unseen.len());

        for listing in unseen {
            if result.is_complete() {
                break;
            }

            // The source may list the same product twice.
            if self.store.contains(&listing.product_id) {
                continue;
            }

            let affiliate_url = match self.converter.convert(&listing.original_url).await {
                Ok(url) => url,
                Err(e) => {
                    log_skip(&listing, &e);
                    result.skipped += 1;
                    continue;
                }
            };

            let message = format_message(&listing, &affiliate_url);
            if let Err(e) = self.publisher.publish(&message).await {
                log_skip(&listing, &e);
                result.skipped += 1;
                continue;
            }

            // Already in the channel; the operator has to learn how many went out.
            if let Err(e) = self.store.add(&listing.product_id).await {
                let posted = result.posted_count() + 1;
                tracing::error!(
                    "❌ Posted {} but could not record it, stopping after {} posts: {}",
                    listing.product_id,
                    posted,
                    e
                );
                return Err(DealError::RecordFailed {
                    product_id: listing.product_id,
                    posted,
                    reason: e.to_string(),
                });
            }
            tracing::debug!("Posted {} ({})", listing.product_id, listing.title);
            result.posted.push(listing.product_id);
        }

        tracing::info!(
            "✅ Run finished: posted {}/{}, skipped {}",
            result.posted_count(),
            result.requested,
            result.skipped
        );
        Ok(result)
    }
}

fn log_skip(listing: &DealListing, error: &DealError) {
    if error.is_item_level() {
        tracing::warn!("⚠️ Skipping {}: {}", listing.product_id, error);
    } else {
        tracing::error!("⚠️ Skipping {} on unexpected error: {}", listing.product_id, error);
    }
}

#[async_trait::async_trait]
impl<D, L, P, S> Pipeline for DealPipeline<D, L, P, S>
where
    D: DealSource,
    L: LinkConverter,
    P: Publisher,
    S: SeenStore,
{
    async fn run(&mut self, request: PostRequest) -> Result<PipelineResult> {
        DealPipeline::run(self, request).await
    }
}
