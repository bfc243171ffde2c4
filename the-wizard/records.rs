//! Projection of raw lookup results into render-ready picker records.
//!
//! A [`RawItem`] is whatever the lookup collaborator returned for one hit. The
//! [`Projector`] turns it into a [`DisplayRecord`] once; records are never
//! mutated afterwards and keep the raw item around as their payload so later
//! consumers (building an annotation URI, for instance) see exactly what the
//! service sent.

use std::{
  collections::HashMap,
  sync::Arc,
};

use serde::{
  Deserialize,
  Serialize,
};
use serde_json::{
  Map,
  Value,
};

/// One hit as reported by the lookup collaborator.
///
/// Only `name` is guaranteed. Identity is carried either by `id` + `prefix`
/// or by a full `iri`; any other source-specific fields land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
  pub name:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:          Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prefix:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub iri:         Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub detail:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(flatten)]
  pub extra:       Map<String, Value>,
}

impl RawItem {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  pub fn with_id(mut self, id: impl Into<String>) -> Self {
    self.id = Some(id.into());
    self
  }

  pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.prefix = Some(prefix.into());
    self
  }

  pub fn with_iri(mut self, iri: impl Into<String>) -> Self {
    self.iri = Some(iri.into());
    self
  }

  /// A source-specific string field from `extra`.
  pub fn extra_str(&self, key: &str) -> Option<&str> {
    self.extra.get(key).and_then(Value::as_str)
  }
}

/// The uniform shape every picker renders.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRecord {
  pub label:          String,
  pub detail:         String,
  pub description:    String,
  /// Keep the record visible even when the surface's own text filter would
  /// hide it (search results rarely contain the query verbatim).
  pub always_visible: bool,
  pub payload:        Arc<RawItem>,
}

impl DisplayRecord {
  /// A fixed choice (a database, a rate law) rather than a search hit.
  pub fn choice(label: impl Into<String>, id: impl Into<String>) -> Self {
    let label = label.into();
    Self {
      payload: Arc::new(RawItem::new(label.clone()).with_id(id)),
      label,
      detail: String::new(),
      description: String::new(),
      always_visible: true,
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
    self.detail = detail.into();
    self
  }

  pub fn id(&self) -> Option<&str> {
    self.payload.id.as_deref()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelStyle {
  /// Just the item's name.
  #[default]
  Name,
  /// `"Name (ID)"`, used when browsing catalogs where names repeat.
  NameWithId,
}

/// Per-source behavior that would otherwise be special-cased in the
/// projector or the annotation builder.
#[derive(Clone, Copy)]
pub struct SourceTemplate {
  /// Fallback description when the item carries none.
  pub describe: fn(&RawItem) -> Option<String>,
  /// Annotation URI for the item.
  pub uri:      fn(&RawItem) -> Option<String>,
}

impl std::fmt::Debug for SourceTemplate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SourceTemplate").finish_non_exhaustive()
  }
}

const IDENTIFIERS_ORG: &str = "http://identifiers.org";

fn identifiers_uri(namespace: &str, item: &RawItem) -> Option<String> {
  item
    .id
    .as_deref()
    .map(|id| format!("{IDENTIFIERS_ORG}/{namespace}/{id}"))
}

fn no_description(_: &RawItem) -> Option<String> {
  None
}

fn chebi_uri(item: &RawItem) -> Option<String> {
  identifiers_uri("chebi", item)
}

fn uniprot_uri(item: &RawItem) -> Option<String> {
  identifiers_uri("uniprot", item)
}

fn uniprot_description(item: &RawItem) -> Option<String> {
  item
    .extra_str("genes")
    .or_else(|| item.extra_str("entry_name"))
    .filter(|text| !text.is_empty())
    .map(str::to_owned)
}

fn rhea_uri(item: &RawItem) -> Option<String> {
  identifiers_uri("rhea", item)
}

fn biomodels_uri(item: &RawItem) -> Option<String> {
  identifiers_uri("biomodels.db", item)
}

fn ontology_uri(item: &RawItem) -> Option<String> {
  item.iri.clone()
}

fn ontology_description(item: &RawItem) -> Option<String> {
  item.extra_str("ontology_name").map(str::to_owned)
}

/// Source-keyed table of [`SourceTemplate`]s, keyed by the item `prefix`.
#[derive(Debug, Clone)]
pub struct SourceTemplates {
  templates: HashMap<String, SourceTemplate>,
}

impl Default for SourceTemplates {
  fn default() -> Self {
    let mut templates = Self::empty();
    templates.insert("chebi", SourceTemplate {
      describe: no_description,
      uri:      chebi_uri,
    });
    templates.insert("uniprot", SourceTemplate {
      describe: uniprot_description,
      uri:      uniprot_uri,
    });
    templates.insert("rhea", SourceTemplate {
      describe: no_description,
      uri:      rhea_uri,
    });
    templates.insert("biomodels", SourceTemplate {
      describe: no_description,
      uri:      biomodels_uri,
    });
    templates.insert("ontology", SourceTemplate {
      describe: ontology_description,
      uri:      ontology_uri,
    });
    templates
  }
}

impl SourceTemplates {
  pub fn empty() -> Self {
    Self {
      templates: HashMap::new(),
    }
  }

  pub fn insert(&mut self, prefix: impl Into<String>, template: SourceTemplate) {
    self.templates.insert(prefix.into(), template);
  }

  pub fn get(&self, prefix: &str) -> Option<&SourceTemplate> {
    self.templates.get(prefix)
  }

  fn for_item(&self, item: &RawItem) -> Option<&SourceTemplate> {
    item.prefix.as_deref().and_then(|prefix| self.get(prefix))
  }

  /// Annotation URI for `item`. Unknown prefixes fall back to the generic
  /// identifiers.org form when both prefix and id are present.
  pub fn uri(&self, item: &RawItem) -> Option<String> {
    match self.for_item(item) {
      Some(template) => (template.uri)(item),
      None => {
        let prefix = item.prefix.as_deref()?;
        identifiers_uri(prefix, item)
      },
    }
  }

  pub fn describe(&self, item: &RawItem) -> Option<String> {
    self
      .for_item(item)
      .and_then(|template| (template.describe)(item))
  }
}

/// Maps raw items to display records. Total, deterministic and free of side
/// effects.
#[derive(Debug, Clone, Default)]
pub struct Projector {
  style:     LabelStyle,
  templates: Arc<SourceTemplates>,
}

impl Projector {
  pub fn new(style: LabelStyle, templates: Arc<SourceTemplates>) -> Self {
    Self { style, templates }
  }

  pub fn style(&self) -> LabelStyle {
    self.style
  }

  pub fn templates(&self) -> &Arc<SourceTemplates> {
    &self.templates
  }

  pub fn project(&self, item: &RawItem) -> DisplayRecord {
    let label = match (self.style, item.id.as_deref()) {
      (LabelStyle::NameWithId, Some(id)) => format!("{} ({})", item.name, id),
      _ => item.name.clone(),
    };
    let detail = item
      .detail
      .clone()
      .or_else(|| item.id.clone())
      .unwrap_or_default();
    let description = item
      .description
      .clone()
      .or_else(|| self.templates.describe(item))
      .unwrap_or_default();

    DisplayRecord {
      label,
      detail,
      description,
      always_visible: true,
      payload: Arc::new(item.clone()),
    }
  }

  pub fn project_all(&self, items: &[RawItem]) -> Vec<DisplayRecord> {
    items.iter().map(|item| self.project(item)).collect()
  }
}

#[cfg(test)]
mod tests {
  use quickcheck::QuickCheck;
  use serde_json::json;

  use super::*;

  fn glucose() -> RawItem {
    RawItem::new("glucose")
      .with_id("CHEBI:17234")
      .with_prefix("chebi")
  }

  #[test]
  fn projects_name_and_falls_back_to_id_for_detail() {
    let record = Projector::default().project(&glucose());
    assert_eq!(record.label, "glucose");
    assert_eq!(record.detail, "CHEBI:17234");
    assert_eq!(record.description, "");
    assert!(record.always_visible);
    assert_eq!(*record.payload, glucose());
  }

  #[test]
  fn catalog_style_decorates_label_with_id() {
    let projector = Projector::new(LabelStyle::NameWithId, Arc::default());
    let record = projector.project(&RawItem::new("Repressilator").with_id("BIOMD0000000012"));
    assert_eq!(record.label, "Repressilator (BIOMD0000000012)");

    let bare = projector.project(&RawItem::new("no id here"));
    assert_eq!(bare.label, "no id here");
  }

  #[test]
  fn empty_names_still_render() {
    let record = Projector::default().project(&RawItem::new(""));
    assert_eq!(record.label, "");
    assert!(record.always_visible);
  }

  #[test]
  fn uniprot_description_comes_from_template() {
    let item: RawItem = serde_json::from_value(json!({
      "id": "P69905",
      "name": "Hemoglobin subunit alpha",
      "entry_name": "HBA_HUMAN",
      "genes": "HBA1 HBA2",
      "prefix": "uniprot",
    }))
    .unwrap();
    let record = Projector::default().project(&item);
    assert_eq!(record.description, "HBA1 HBA2");
    assert_eq!(item.extra_str("entry_name"), Some("HBA_HUMAN"));
  }

  #[test]
  fn explicit_fields_win_over_placeholders() {
    let mut item = glucose();
    item.detail = Some("sugar".into());
    item.description = Some("a monosaccharide".into());
    let record = Projector::default().project(&item);
    assert_eq!(record.detail, "sugar");
    assert_eq!(record.description, "a monosaccharide");
  }

  #[test]
  fn uri_templates_per_source() {
    let templates = SourceTemplates::default();
    assert_eq!(
      templates.uri(&glucose()).as_deref(),
      Some("http://identifiers.org/chebi/CHEBI:17234")
    );
    assert_eq!(
      templates
        .uri(&RawItem::new("m").with_id("BIOMD1").with_prefix("biomodels"))
        .as_deref(),
      Some("http://identifiers.org/biomodels.db/BIOMD1")
    );
    let term = RawItem::new("nucleus")
      .with_prefix("ontology")
      .with_iri("http://purl.obolibrary.org/obo/GO_0005634");
    assert_eq!(
      templates.uri(&term).as_deref(),
      Some("http://purl.obolibrary.org/obo/GO_0005634")
    );
    assert_eq!(
      templates
        .uri(&RawItem::new("x").with_id("42").with_prefix("kegg"))
        .as_deref(),
      Some("http://identifiers.org/kegg/42")
    );
    assert_eq!(templates.uri(&RawItem::new("orphan")), None);
  }

  #[test]
  fn projection_is_deterministic_and_keeps_payload() {
    fn prop(name: String, id: Option<String>, prefix: Option<String>) -> bool {
      let item = RawItem {
        name,
        id,
        prefix,
        ..RawItem::default()
      };
      let projector = Projector::new(LabelStyle::NameWithId, Arc::default());
      let first = projector.project(&item);
      let second = projector.project(&item);
      first == second && *first.payload == item && first.always_visible
    }

    QuickCheck::new()
      .tests(200)
      .quickcheck(prop as fn(String, Option<String>, Option<String>) -> bool);
  }
}
