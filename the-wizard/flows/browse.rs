use std::sync::Arc;

use anyhow::{
  Context,
  bail,
};
use async_trait::async_trait;

use crate::{
  lookup::SourceId,
  records::{
    DisplayRecord,
    LabelStyle,
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

pub const TITLE: &str = "Browse Biomodels";
pub const EMPTY_NOTICE: &str = "No models found";
pub const SOURCE: &str = "biomodels";

const QUERY: &str = "model-query";
const MODEL: &str = "model";

pub fn validate_query(value: &str) -> Option<String> {
  value
    .trim()
    .is_empty()
    .then(|| "Query is empty".to_string())
}

/// Type a query, then pick one of the matching models.
pub fn biomodel_browser() -> StepRef {
  Arc::new(EnterModelQuery)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BiomodelChoice {
  pub query: String,
  pub model: DisplayRecord,
}

impl BiomodelChoice {
  pub fn from_state(state: &WizardState) -> Option<Self> {
    Some(Self {
      query: state.text(QUERY)?.to_owned(),
      model: state.record(MODEL)?.clone(),
    })
  }
}

struct EnterModelQuery;

#[async_trait]
impl Step for EnterModelQuery {
  fn name(&self) -> &str {
    "enter-model-query"
  }

  async fn run(&self, wizard: &mut Wizard, state: &mut WizardState) -> anyhow::Result<StepOutcome> {
    let config = PickerConfig::new(TITLE, 1, 2)
      .prompt("Enter query for model")
      .initial_value(state.text(QUERY).map(str::to_owned))
      .validate(validate_query);
    match wizard.show(config).await {
      Ok(Pick::Text(query)) => {
        state.set_text(QUERY, query.trim());
        Ok(StepOutcome::next(PickModel))
      },
      Ok(Pick::Record(record)) => bail!("model query accepted a record {:?}", record.label),
      Err(signal) => Ok(signal.into()),
    }
  }
}

struct PickModel;

#[async_trait]
impl Step for PickModel {
  fn name(&self) -> &str {
    "pick-model"
  }

  async fn run(&self, wizard: &mut Wizard, state: &mut WizardState) -> anyhow::Result<StepOutcome> {
    let query = state
      .text(QUERY)
      .context("no model query entered")?
      .to_owned();
    let Some(models) = wizard
      .fetch(SourceId::from(SOURCE), &query, LabelStyle::NameWithId)
      .await
    else {
      // nothing to pick from, let the user edit the query
      return Ok(StepOutcome::Back);
    };

    let config = PickerConfig::new(TITLE, 2, 2)
      .placeholder("Pick a biomodel")
      .items(models)
      .active(state.record(MODEL).cloned());
    match wizard.show(config).await {
      Ok(Pick::Record(model)) => {
        state.set_record(MODEL, model);
        Ok(StepOutcome::Completed)
      },
      Ok(Pick::Text(text)) => bail!("model picker accepted free text {text:?}"),
      Err(signal) => Ok(signal.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_queries_are_rejected() {
    assert_eq!(validate_query("").as_deref(), Some("Query is empty"));
    assert_eq!(validate_query("   ").as_deref(), Some("Query is empty"));
    assert_eq!(validate_query("repressilator"), None);
  }
}
