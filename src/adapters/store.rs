use crate::domain::ports::{SeenStore, Storage};
use crate::utils::error::{DealError, Result};
use std::collections::HashSet;

/// Seen product ids kept in a newline-delimited file, one id per line.
///
/// The whole file is read once by [`FileSeenStore::load`]; every new id is
/// appended and synced before [`SeenStore::add`] returns.
pub struct FileSeenStore<S: Storage> {
    storage: S,
    path: String,
    ids: HashSet<String>,
}

impl<S: Storage> FileSeenStore<S> {
    /// Ids are compared and stored trimmed, so `" A "` and `"A"` are the same product.
    pub async fn load(storage: S, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let ids = match storage.read_file(&path).await {
            Ok(bytes) => parse_ids(&bytes),
            Err(DealError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No seen-items file at {}, starting empty", path);
                HashSet::new()
            }
            Err(e) => return Err(e),
        };

        tracing::info!("📚 Loaded {} seen product ids from {}", ids.len(), path);
        Ok(Self { storage, path, ids })
    }

}

fn parse_ids(bytes: &[u8]) -> HashSet<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait::async_trait]
impl<S: Storage> SeenStore for FileSeenStore<S> {
    fn contains(&self, product_id: &str) -> bool {
        self.ids.contains(product_id.trim())
    }

    async fn add(&mut self, product_id: &str) -> Result<()> {
        let product_id = product_id.trim();
        if product_id.is_empty() || product_id.contains('\n') {
            return Err(DealError::ConfigValidationError {
                field: "product_id".to_string(),
                message: format!("cannot store id {:?}", product_id),
            });
        }
        if self.ids.contains(product_id) {
            return Ok(());
        }

        let line = format!("{}\n", product_id);
        self.storage.append_file(&self.path, line.as_bytes()).await?;
        self.ids.insert(product_id.to_string());
        Ok(())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}
