//! Catalog backed by a JSON manifest of streams and chat bindings
use super::{CatalogListing, CatalogStore, ChatBinding, Stream};
use crate::error::{ReplayError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};

/// Reads a manifest shaped like
/// `{"streams": [Stream, ...], "chat_bindings": [{"hash", "chat_path"}, ...]}`.
///
/// Entries that fail to parse, or whose files are gone, are reported in the
/// listing's `errors` rather than returned.
#[derive(Debug, Clone)]
pub struct ManifestCatalog {
    manifest_path: PathBuf,
}

impl ManifestCatalog {
    pub fn new(manifest_path: PathBuf) -> Self {
        Self { manifest_path }
    }
}

#[async_trait]
impl CatalogStore for ManifestCatalog {
    async fn list(&self) -> Result<CatalogListing> {
        if !self.manifest_path.exists() {
            return Err(ReplayError::NotFound(self.manifest_path.clone()));
        }

        let content = tokio::fs::read_to_string(&self.manifest_path).await?;
        let document: Value = serde_json::from_str(&content).map_err(|e| {
            ReplayError::format(format!("manifest {}: {}", self.manifest_path.display(), e))
        })?;

        let mut listing = CatalogListing::default();

        let streams: Vec<Stream> = parse_entries(&document, "streams", &mut listing.errors);
        for stream in streams {
            if stream.path.exists() {
                listing.streams.push(stream);
            } else {
                listing
                    .errors
                    .push(format!("stream file missing: {}", stream.path.display()));
            }
        }

        let bindings: Vec<ChatBinding> = parse_entries(&document, "chat_bindings", &mut listing.errors);
        for binding in bindings {
            if binding.chat_path.exists() {
                listing.chat_bindings.push(binding);
            } else {
                listing
                    .errors
                    .push(format!("chat export missing: {}", binding.chat_path.display()));
            }
        }

        info!(
            "📚 Manifest {}: {} streams, {} chat bindings, {} errors",
            self.manifest_path.display(),
            listing.streams.len(),
            listing.chat_bindings.len(),
            listing.errors.len()
        );

        Ok(listing)
    }
}

fn parse_entries<T: DeserializeOwned>(document: &Value, key: &str, errors: &mut Vec<String>) -> Vec<T> {
    let Some(entries) = document.get(key).and_then(Value::as_array) else {
        debug!("Manifest has no `{}` list", key);
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| match serde_json::from_value::<T>(entry.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                errors.push(format!("{}[{}]: {}", key, position, e));
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FileType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_manifest_listing_reports_broken_entries() {
        let temp_dir = TempDir::new().unwrap();
        let video = temp_dir.path().join("stream.mp4");
        let chat = temp_dir.path().join("export.json");
        tokio::fs::write(&video, b"video").await.unwrap();
        tokio::fs::write(&chat, b"{}").await.unwrap();

        let manifest = serde_json::json!({
            "streams": [
                { "hash": "h1", "path": video, "file_type": "livestream", "duration": 60.0 },
                { "hash": "h2", "path": temp_dir.path().join("gone.mp4"), "file_type": "livestream" },
                { "path": "no-hash.mp4" }
            ],
            "chat_bindings": [
                { "hash": "h1", "chat_path": chat },
                { "hash": "h3", "chat_path": temp_dir.path().join("gone.json") }
            ]
        });
        let manifest_path = temp_dir.path().join("catalog.json");
        tokio::fs::write(&manifest_path, manifest.to_string()).await.unwrap();

        let listing = ManifestCatalog::new(manifest_path).list().await.unwrap();

        assert_eq!(listing.streams.len(), 1);
        assert_eq!(listing.streams[0].file_type, FileType::Livestream);
        assert_eq!(listing.streams[0].duration, Some(60.0));
        assert_eq!(listing.chat_bindings.len(), 1);
        assert_eq!(listing.errors.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_manifest_is_not_found() {
        let err = ManifestCatalog::new(PathBuf::from("/no/such/catalog.json"))
            .list()
            .await
            .unwrap_err();
        assert!(matches!(err, ReplayError::NotFound(_)));
    }
}
