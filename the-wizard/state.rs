use std::collections::HashMap;

use crate::records::DisplayRecord;

/// One step's answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
  Record(DisplayRecord),
  Text(String),
}

/// Answers accumulated across a wizard run, keyed by the name the step chose.
///
/// Answers survive navigating back, so a revisited step can offer its prior
/// choice as the highlighted item or pre-filled value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardState {
  answers: HashMap<String, Answer>,
}

impl WizardState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, key: impl Into<String>, answer: Answer) {
    self.answers.insert(key.into(), answer);
  }

  pub fn set_record(&mut self, key: impl Into<String>, record: DisplayRecord) {
    self.set(key, Answer::Record(record));
  }

  pub fn set_text(&mut self, key: impl Into<String>, text: impl Into<String>) {
    self.set(key, Answer::Text(text.into()));
  }

  pub fn get(&self, key: &str) -> Option<&Answer> {
    self.answers.get(key)
  }

  pub fn record(&self, key: &str) -> Option<&DisplayRecord> {
    match self.answers.get(key)? {
      Answer::Record(record) => Some(record),
      Answer::Text(_) => None,
    }
  }

  pub fn text(&self, key: &str) -> Option<&str> {
    match self.answers.get(key)? {
      Answer::Text(text) => Some(text),
      Answer::Record(_) => None,
    }
  }

  pub fn remove(&mut self, key: &str) -> Option<Answer> {
    self.answers.remove(key)
  }

  pub fn len(&self) -> usize {
    self.answers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.answers.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn typed_accessors_distinguish_answers() {
    let mut state = WizardState::new();
    state.set_record("database", DisplayRecord::choice("ChEBI", "chebi"));
    state.set_text("query", "glucose");

    assert_eq!(state.record("database").unwrap().label, "ChEBI");
    assert_eq!(state.text("database"), None);
    assert_eq!(state.text("query"), Some("glucose"));
    assert_eq!(state.record("query"), None);
    assert_eq!(state.len(), 2);

    state.set_text("query", "fructose");
    assert_eq!(state.text("query"), Some("fructose"));
    assert!(state.remove("query").is_some());
    assert_eq!(state.len(), 1);
  }
}
