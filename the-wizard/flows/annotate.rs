use std::{
  fmt,
  str::FromStr,
  sync::Arc,
};

use anyhow::{
  Context,
  bail,
};
use async_trait::async_trait;
use thiserror::Error;

use crate::{
  lookup::{
    Annotation,
    SourceId,
  },
  records::{
    DisplayRecord,
    LabelStyle,
    SourceTemplates,
  },
  session::{
    Pick,
    PickerConfig,
  },
  state::WizardState,
  wizard::{
    Step,
    StepOutcome,
    StepRef,
    Wizard,
  },
};

pub const TITLE: &str = "Create Annotation";
pub const EMPTY_NOTICE: &str = "Annotation not found";

const DATABASE: &str = "database";
const ENTITY: &str = "entity";

static DATABASES: [(&str, &str); 9] = [
  ("ChEBI", "chebi"),
  ("UniProt", "uniprot"),
  ("RHEA", "rhea"),
  ("Gene Ontology", "gontology"),
  ("Cell Type Ontology", "contology"),
  ("Protein Ontology", "pontology"),
  ("Ontology for Biomedical Investigations", "bontology"),
  ("Foundational Model of Anatomy", "fontology"),
  ("Mouse Adult Gross Anatomy", "montology"),
];

/// What kind of model entity is being annotated. Decides which databases
/// are recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityKind {
  Species,
  Compartment,
  Reaction,
  #[default]
  Other,
}

impl EntityKind {
  fn recommended(self) -> &'static [&'static str] {
    match self {
      Self::Species => &["chebi", "pontology", "uniprot"],
      Self::Compartment => &["gontology", "contology", "montology", "bontology", "fontology"],
      Self::Reaction => &["gontology", "rhea"],
      Self::Other => &[],
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Species => "species",
      Self::Compartment => "compartment",
      Self::Reaction => "reaction",
      Self::Other => "other",
    })
  }
}

#[derive(Debug, Error)]
#[error("unknown entity kind '{0}' (expected species, compartment, reaction or other)")]
pub struct UnknownEntityKind(String);

impl FromStr for EntityKind {
  type Err = UnknownEntityKind;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "species" => Ok(Self::Species),
      "compartment" => Ok(Self::Compartment),
      "reaction" => Ok(Self::Reaction),
      "other" => Ok(Self::Other),
      _ => Err(UnknownEntityKind(s.to_owned())),
    }
  }
}

/// The databases offered for `kind`, recommended ones first.
pub fn database_choices(kind: EntityKind) -> Vec<DisplayRecord> {
  let recommended = kind.recommended();
  let mut choices: Vec<DisplayRecord> = recommended
    .iter()
    .filter_map(|id| DATABASES.iter().find(|(_, known)| known == id))
    .map(|(label, id)| DisplayRecord::choice(*label, *id).with_description("recommended"))
    .collect();
  choices.extend(
    DATABASES
      .iter()
      .filter(|(_, id)| !recommended.contains(id))
      .map(|(label, id)| DisplayRecord::choice(*label, *id)),
  );
  choices
}

/// The answer of a finished annotation wizard.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationChoice {
  /// Label of the chosen database.
  pub database: String,
  pub entity:   DisplayRecord,
}

impl AnnotationChoice {
  pub fn from_state(state: &WizardState) -> Option<Self> {
    Some(Self {
      database: state.record(DATABASE)?.label.clone(),
      entity:   state.record(ENTITY)?.clone(),
    })
  }

  /// Build the annotation for `entity_name`. `None` when the chosen item
  /// carries no usable identity.
  pub fn to_annotation(&self, entity_name: &str, templates: &SourceTemplates) -> Option<Annotation> {
    let item = &self.entity.payload;
    let uri = templates.uri(item)?;
    let identifier = item.id.clone().or_else(|| item.iri.clone())?;
    Some(Annotation {
      entity_name: entity_name.to_owned(),
      source_id: item.prefix.clone().unwrap_or_default(),
      identifier,
      uri,
    })
  }
}

/// Pick a database, then search it live.
pub fn annotation_wizard(kind: EntityKind, initial_query: Option<String>) -> StepRef {
  Arc::new(PickDatabase {
    kind,
    initial_query,
  })
}

struct PickDatabase {
  kind:          EntityKind,
  initial_query: Option<String>,
}

#[async_trait]
impl Step for PickDatabase {
  fn name(&self) -> &str {
    "pick-database"
  }

  async fn run(&self, wizard: &mut Wizard, state: &mut WizardState) -> anyhow::Result<StepOutcome> {
    let config = PickerConfig::new(TITLE, 1, 2)
      .placeholder("Pick a database to query")
      .items(database_choices(self.kind))
      .active(state.record(DATABASE).cloned());
    match wizard.show(config).await {
      Ok(Pick::Record(database)) => {
        log::info!("annotating against {}", database.label);
        state.set_record(DATABASE, database);
        Ok(StepOutcome::next(EnterQuery {
          initial_query: self.initial_query.clone(),
        }))
      },
      Ok(Pick::Text(text)) => bail!("database picker accepted free text {text:?}"),
      Err(signal) => Ok(signal.into()),
    }
  }
}

struct EnterQuery {
  initial_query: Option<String>,
}

#[async_trait]
impl Step for EnterQuery {
  fn name(&self) -> &str {
    "enter-query"
  }

  async fn run(&self, wizard: &mut Wizard, state: &mut WizardState) -> anyhow::Result<StepOutcome> {
    let source = state
      .record(DATABASE)
      .and_then(DisplayRecord::id)
      .map(SourceId::from)
      .context("no database chosen before searching")?;
    let search = wizard.search(source, LabelStyle::Name).spawn();
    let config = PickerConfig::new(TITLE, 2, 2)
      .placeholder("Enter query")
      .initial_value(self.initial_query.clone())
      .on_value_changed(search.into_callback());
    match wizard.show(config).await {
      Ok(Pick::Record(entity)) => {
        state.set_record(ENTITY, entity);
        Ok(StepOutcome::Completed)
      },
      Ok(Pick::Text(text)) => bail!("query picker accepted free text {text:?}"),
      Err(signal) => Ok(signal.into()),
    }
  }
}
