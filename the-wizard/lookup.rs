//! Boundaries to the collaborators the wizard talks to but does not own: the
//! lookup service, the notification surface and the code that finally applies
//! an annotation to a document.

use std::fmt;

use async_trait::async_trait;
use serde::{
  Deserialize,
  Serialize,
};

use crate::records::RawItem;

/// Identifies the data source a lookup runs against (`chebi`, `uniprot`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for SourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for SourceId {
  fn from(id: &str) -> Self {
    Self::new(id)
  }
}

impl From<String> for SourceId {
  fn from(id: String) -> Self {
    Self(id)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
  pub source:     SourceId,
  pub query:      String,
  /// Generation of the session value that produced this request. Informational
  /// for the collaborator; staleness is decided by the echoed query.
  pub generation: u64,
}

/// What the lookup collaborator answers. The JSON shapes are `{"error": ...}`
/// and `{"query": ..., "items": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupResponse {
  Failed { error: String },
  Found { query: String, items: Vec<RawItem> },
}

impl LookupResponse {
  pub fn found(query: impl Into<String>, items: Vec<RawItem>) -> Self {
    Self::Found {
      query: query.into(),
      items,
    }
  }

  pub fn failed(error: impl Into<String>) -> Self {
    Self::Failed {
      error: error.into(),
    }
  }
}

#[async_trait]
pub trait Lookup: Send + Sync {
  async fn lookup(&self, request: LookupRequest) -> LookupResponse;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
  Info,
  Error,
}

/// Fire-and-forget user notifications.
pub trait Notifier: Send + Sync {
  fn notify(&self, kind: NoticeKind, message: &str);
}

/// Everything the insertion collaborator needs to annotate an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
  pub entity_name: String,
  pub source_id:   String,
  pub identifier:  String,
  pub uri:         String,
}

impl fmt::Display for Annotation {
  /// The annotation statement: `glucose identity "http://identifiers.org/chebi/CHEBI:17234"`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} identity \"{}\"", self.entity_name, self.uri)
  }
}

/// Applies a finished annotation somewhere (a document, stdout, ...).
pub trait AnnotationSink {
  fn apply(&self, annotation: &Annotation) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn response_shapes_decode() {
    let failed: LookupResponse =
      serde_json::from_value(json!({ "error": "Connection Error!" })).unwrap();
    assert_eq!(failed, LookupResponse::failed("Connection Error!"));

    let found: LookupResponse = serde_json::from_value(json!({
      "query": "glucose",
      "items": [{ "id": "CHEBI:17234", "name": "glucose", "prefix": "chebi" }],
    }))
    .unwrap();
    let LookupResponse::Found { query, items } = found else {
      panic!("expected a successful response");
    };
    assert_eq!(query, "glucose");
    assert_eq!(items[0].id.as_deref(), Some("CHEBI:17234"));
  }

  #[test]
  fn annotation_renders_as_statement() {
    let annotation = Annotation {
      entity_name: "glucose".into(),
      source_id:   "chebi".into(),
      identifier:  "CHEBI:17234".into(),
      uri:         "http://identifiers.org/chebi/CHEBI:17234".into(),
    };
    assert_eq!(
      annotation.to_string(),
      r#"glucose identity "http://identifiers.org/chebi/CHEBI:17234""#
    );
  }
}
