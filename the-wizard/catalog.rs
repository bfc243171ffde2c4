//! An in-memory [`Lookup`] backed by a JSON catalog file.
//!
//! The file maps source ids to raw items:
//!
//! ```json
//! { "chebi": [{ "id": "CHEBI:17234", "name": "glucose", "prefix": "chebi" }] }
//! ```

use std::{
  collections::HashMap,
  fs,
  path::{
    Path,
    PathBuf,
  },
  time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
  config::DEFAULT_MAX_RESULTS,
  lookup::{
    Lookup,
    LookupRequest,
    LookupResponse,
  },
  records::RawItem,
};

#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("failed to read catalog {path}: {source}")]
  Read {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("malformed catalog {path}: {source}")]
  Parse {
    path:   PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Debug, Clone)]
pub struct StaticCatalog {
  sources:     HashMap<String, Vec<RawItem>>,
  max_results: usize,
  latency:     Duration,
}

impl StaticCatalog {
  pub fn new(sources: HashMap<String, Vec<RawItem>>) -> Self {
    Self {
      sources,
      max_results: DEFAULT_MAX_RESULTS,
      latency: Duration::ZERO,
    }
  }

  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    Ok(Self::new(serde_json::from_str(json)?))
  }

  pub fn load(path: &Path) -> Result<Self, CatalogError> {
    let json = fs::read_to_string(path).map_err(|source| {
      CatalogError::Read {
        path: path.to_path_buf(),
        source,
      }
    })?;
    let catalog = Self::from_json(&json).map_err(|source| {
      CatalogError::Parse {
        path: path.to_path_buf(),
        source,
      }
    })?;
    log::debug!(
      "loaded catalog {} with {} sources",
      path.display(),
      catalog.sources.len()
    );
    Ok(catalog)
  }

  pub fn with_max_results(mut self, max_results: usize) -> Self {
    self.max_results = max_results.max(1);
    self
  }

  /// Delay every answer, the way a remote service would.
  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  pub fn sources(&self) -> impl Iterator<Item = &str> {
    self.sources.keys().map(String::as_str)
  }

  pub fn search(&self, source: &str, query: &str) -> LookupResponse {
    let Some(items) = self.sources.get(source) else {
      return LookupResponse::failed(format!("Unknown database '{source}'"));
    };
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
      return LookupResponse::found(query, Vec::new());
    }
    let matches = |item: &RawItem| {
      item.name.to_lowercase().contains(&needle)
        || item
          .id
          .as_deref()
          .is_some_and(|id| id.to_lowercase().contains(&needle))
    };
    let hits = items
      .iter()
      .filter(|item| matches(*item))
      .take(self.max_results)
      .cloned()
      .collect();
    LookupResponse::found(query, hits)
  }
}

#[async_trait]
impl Lookup for StaticCatalog {
  async fn lookup(&self, request: LookupRequest) -> LookupResponse {
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }
    self.search(request.source.as_str(), &request.query)
  }
}
