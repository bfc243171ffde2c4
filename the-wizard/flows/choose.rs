use anyhow::bail;
use async_trait::async_trait;

use crate::{
  records::DisplayRecord,
  session::{
    Pick,
    PickerConfig,
  },
  state::WizardState,
  wizard::{
    Step,
    StepOutcome,
    Wizard,
  },
};

/// A one-step wizard over a fixed list of records.
pub struct ChooseOne {
  title:       String,
  placeholder: String,
  items:       Vec<DisplayRecord>,
}

impl ChooseOne {
  pub const KEY: &'static str = "choice";

  pub fn new(title: impl Into<String>, placeholder: impl Into<String>, items: Vec<DisplayRecord>) -> Self {
    Self {
      title: title.into(),
      placeholder: placeholder.into(),
      items,
    }
  }

  pub fn rate_law(items: Vec<DisplayRecord>) -> Self {
    Self::new("Insert Rate Law", "Select rate law", items)
  }

  pub fn annotation(items: Vec<DisplayRecord>) -> Self {
    Self::new("Select Annotation", "Select Annotation", items)
  }

  pub fn chosen(state: &WizardState) -> Option<&DisplayRecord> {
    state.record(Self::KEY)
  }
}

#[async_trait]
impl Step for ChooseOne {
  fn name(&self) -> &str {
    "choose-one"
  }

  async fn run(&self, wizard: &mut Wizard, state: &mut WizardState) -> anyhow::Result<StepOutcome> {
    let config = PickerConfig::new(self.title.clone(), 1, 1)
      .placeholder(self.placeholder.clone())
      .items(self.items.clone())
      .active(state.record(Self::KEY).cloned());
    match wizard.show(config).await {
      Ok(Pick::Record(record)) => {
        state.set_record(Self::KEY, record);
        Ok(StepOutcome::Completed)
      },
      Ok(Pick::Text(text)) => bail!("{} accepted free text {text:?}", self.title),
      Err(signal) => Ok(signal.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use super::*;
  use crate::{
    catalog::StaticCatalog,
    config::WizardConfig,
    notices::MessageCenter,
    session::SessionInput,
    wizard::{
      StepRef,
      WizardOutcome,
    },
  };

  #[tokio::test]
  async fn rate_law_prompt_and_pick() {
    let (mut wizard, mut ui) = Wizard::new(
      WizardConfig::default(),
      Arc::new(StaticCatalog::new(Default::default())),
      Arc::new(Mutex::new(MessageCenter::default())),
    );
    let laws = vec![
      DisplayRecord::choice("Mass action", "mass-action"),
      DisplayRecord::choice("Michaelis-Menten", "michaelis-menten"),
    ];

    let driver = async {
      let view = ui.next_session(0).await.unwrap();
      assert_eq!(view.title, "Insert Rate Law");
      assert_eq!(view.placeholder, "Select rate law");
      assert!(!view.back_button);
      ui.send(SessionInput::Select(1));
    };
    let step: StepRef = Arc::new(ChooseOne::rate_law(laws));
    let (outcome, ()) = tokio::join!(wizard.run(step, WizardState::new()), driver);

    let WizardOutcome::Completed(state) = outcome.unwrap() else {
      panic!("choice should complete");
    };
    assert_eq!(ChooseOne::chosen(&state).unwrap().label, "Michaelis-Menten");
  }

  #[test]
  fn annotation_choice_titles() {
    let choose = ChooseOne::annotation(Vec::new());
    assert_eq!(choose.title, "Select Annotation");
    assert_eq!(choose.placeholder, "Select Annotation");
  }
}
