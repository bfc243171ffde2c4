//! The step controller.
//!
//! A wizard is a stack of [`Step`]s. Each step shows at most one session and
//! decides what happens next by returning a [`StepOutcome`]; the controller
//! turns those outcomes into stack operations and makes sure only one session
//! is ever live.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{
  mpsc::{
    UnboundedReceiver,
    UnboundedSender,
    unbounded_channel,
  },
  watch,
};

use crate::{
  config::WizardConfig,
  lookup::{
    Lookup,
    LookupRequest,
    LookupResponse,
    NoticeKind,
    Notifier,
    SourceId,
  },
  records::{
    DisplayRecord,
    LabelStyle,
    Projector,
    SourceTemplates,
  },
  search::{
    DEFAULT_EMPTY_NOTICE,
    SearchOptions,
  },
  session::{
    Pick,
    PickerConfig,
    PickerSession,
    SessionHandle,
    SessionInput,
    SessionView,
    Signal,
    ViewPublisher,
  },
  state::WizardState,
};

pub type StepRef = Arc<dyn Step>;

/// What a step asks the controller to do next.
pub enum StepOutcome {
  /// Run `next`, keeping this step on the stack to come back to.
  Continue(StepRef),
  Completed,
  Back,
  Cancel,
  /// Show this step again.
  Resume,
}

impl StepOutcome {
  pub fn next(step: impl Step + 'static) -> Self {
    Self::Continue(Arc::new(step))
  }
}

impl From<Signal> for StepOutcome {
  fn from(signal: Signal) -> Self {
    match signal {
      Signal::Back => Self::Back,
      Signal::Cancel => Self::Cancel,
      Signal::Resume => Self::Resume,
    }
  }
}

impl std::fmt::Debug for StepOutcome {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Continue(step) => f.debug_tuple("Continue").field(&step.name()).finish(),
      Self::Completed => f.write_str("Completed"),
      Self::Back => f.write_str("Back"),
      Self::Cancel => f.write_str("Cancel"),
      Self::Resume => f.write_str("Resume"),
    }
  }
}

#[async_trait]
pub trait Step: Send + Sync {
  fn name(&self) -> &str;

  async fn run(&self, wizard: &mut Wizard, state: &mut WizardState) -> anyhow::Result<StepOutcome>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardOutcome {
  Completed(WizardState),
  Cancelled,
}

#[derive(Debug, Error)]
pub enum WizardError {
  #[error("step '{step}' failed: {source}")]
  Step {
    step:   String,
    #[source]
    source: anyhow::Error,
  },
}

/// The frontend's side of a wizard.
pub struct WizardUi {
  pub inputs: UnboundedSender<SessionInput>,
  pub view:   watch::Receiver<Option<SessionView>>,
}

impl WizardUi {
  /// Returns false once the wizard is gone.
  pub fn send(&self, input: SessionInput) -> bool {
    self.inputs.send(input).is_ok()
  }

  pub fn snapshot(&self) -> Option<SessionView> {
    self.view.borrow().clone()
  }

  /// Wait until a live session newer than `after` is on screen.
  pub async fn next_session(&mut self, after: u64) -> Option<SessionView> {
    let view = self
      .view
      .wait_for(|view| {
        view
          .as_ref()
          .is_some_and(|view| view.id > after && view.enabled)
      })
      .await
      .ok()?;
    view.clone()
  }

  /// Wait until the visible view satisfies `predicate`.
  pub async fn wait_for(&mut self, predicate: impl Fn(&SessionView) -> bool) -> Option<SessionView> {
    let view = self
      .view
      .wait_for(|view| view.as_ref().is_some_and(&predicate))
      .await
      .ok()?;
    view.clone()
  }
}

pub struct Wizard {
  config:          WizardConfig,
  lookup:          Arc<dyn Lookup>,
  notifier:        Arc<dyn Notifier>,
  templates:       Arc<SourceTemplates>,
  empty_notice:    String,
  steps:           Vec<StepRef>,
  current:         Option<SessionHandle>,
  next_session_id: u64,
  inputs:          UnboundedReceiver<SessionInput>,
  publisher:       ViewPublisher,
}

impl Wizard {
  pub fn new(
    config: WizardConfig,
    lookup: Arc<dyn Lookup>,
    notifier: Arc<dyn Notifier>,
  ) -> (Self, WizardUi) {
    let (input_tx, input_rx) = unbounded_channel();
    let (view_tx, view_rx) = watch::channel(None);
    let wizard = Self {
      config,
      lookup,
      notifier,
      templates: Arc::default(),
      empty_notice: DEFAULT_EMPTY_NOTICE.to_string(),
      steps: Vec::new(),
      current: None,
      next_session_id: 0,
      inputs: input_rx,
      publisher: Arc::new(view_tx),
    };
    let ui = WizardUi {
      inputs: input_tx,
      view:   view_rx,
    };
    (wizard, ui)
  }

  pub fn with_templates(mut self, templates: Arc<SourceTemplates>) -> Self {
    self.templates = templates;
    self
  }

  pub fn with_empty_notice(mut self, notice: impl Into<String>) -> Self {
    self.empty_notice = notice.into();
    self
  }

  pub fn config(&self) -> &WizardConfig {
    &self.config
  }

  pub fn templates(&self) -> &Arc<SourceTemplates> {
    &self.templates
  }

  /// Number of steps on the stack.
  pub fn depth(&self) -> usize {
    self.steps.len()
  }

  pub fn current(&self) -> Option<&SessionHandle> {
    self.current.as_ref()
  }

  pub fn notify(&self, kind: NoticeKind, message: &str) {
    self.notifier.notify(kind, message);
  }

  /// Options for a live search against `source`, bound to this wizard's
  /// collaborators. Spawn them and hand the coordinator to the session.
  pub fn search(&self, source: SourceId, style: LabelStyle) -> SearchOptions {
    SearchOptions::new(source, self.lookup.clone(), self.notifier.clone(), &self.config)
      .projector(Projector::new(style, self.templates.clone()))
      .empty_notice(self.empty_notice.clone())
  }

  /// One lookup outside any session. Errors and empty results are reported
  /// through the notifier and yield `None`.
  pub async fn fetch(
    &self,
    source: SourceId,
    query: &str,
    style: LabelStyle,
  ) -> Option<Vec<DisplayRecord>> {
    let request = LookupRequest {
      source,
      query: query.to_owned(),
      generation: 0,
    };
    match self.lookup.lookup(request).await {
      LookupResponse::Failed { error } => {
        self.notify(NoticeKind::Error, &format!("Could not perform query: {error}"));
        None
      },
      LookupResponse::Found { items, .. } if items.is_empty() => {
        self.notify(NoticeKind::Info, &self.empty_notice);
        None
      },
      LookupResponse::Found { items, .. } => {
        let shown = items.len().min(self.config.max_results);
        let projector = Projector::new(style, self.templates.clone());
        Some(projector.project_all(&items[..shown]))
      },
    }
  }

  /// Open a session, replacing whatever was on screen, and wait for it to
  /// resolve.
  pub async fn show(&mut self, config: PickerConfig) -> Result<Pick, Signal> {
    self.dispose_current();
    // input aimed at the previous surface must not leak into this one
    while self.inputs.try_recv().is_ok() {}

    self.next_session_id += 1;
    let session = PickerSession::open(self.next_session_id, config, self.publisher.clone());
    self.current = Some(session.handle().clone());
    session
      .resolve(&mut self.inputs, self.config.resume_timeout)
      .await
  }

  fn dispose_current(&mut self) {
    if let Some(session) = self.current.take() {
      session.dispose();
    }
  }

  /// Run the wizard from `start` until it completes or is cancelled.
  pub async fn run(
    &mut self,
    start: StepRef,
    mut state: WizardState,
  ) -> Result<WizardOutcome, WizardError> {
    self.steps.clear();
    self.steps.push(start);
    let completed = self.drive(&mut state).await;
    self.steps.clear();
    self.dispose_current();

    if completed? {
      Ok(WizardOutcome::Completed(state))
    } else {
      Ok(WizardOutcome::Cancelled)
    }
  }

  async fn drive(&mut self, state: &mut WizardState) -> Result<bool, WizardError> {
    while let Some(step) = self.steps.last().cloned() {
      if let Some(previous) = &self.current {
        previous.retire();
      }
      log::debug!("running step '{}' at depth {}", step.name(), self.steps.len());

      let outcome = step
        .run(self, state)
        .await
        .map_err(|source| {
          WizardError::Step {
            step: step.name().to_owned(),
            source,
          }
        })?;
      log::trace!("step '{}' returned {outcome:?}", step.name());

      match outcome {
        StepOutcome::Continue(next) => self.steps.push(next),
        StepOutcome::Completed => return Ok(true),
        StepOutcome::Back => {
          self.dispose_current();
          if self.steps.len() < 2 {
            return Ok(false);
          }
          self.steps.pop();
        },
        StepOutcome::Resume => self.dispose_current(),
        StepOutcome::Cancel => return Ok(false),
      }
    }
    Ok(false)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{
    AtomicUsize,
    Ordering,
  };

  use parking_lot::Mutex;

  use super::*;
  use crate::notices::MessageCenter;

  struct NoLookup;

  #[async_trait]
  impl Lookup for NoLookup {
    async fn lookup(&self, request: LookupRequest) -> LookupResponse {
      LookupResponse::found(request.query, Vec::new())
    }
  }

  fn wizard() -> (Wizard, WizardUi) {
    Wizard::new(
      WizardConfig::default(),
      Arc::new(NoLookup),
      Arc::new(Mutex::new(MessageCenter::default())),
    )
  }

  fn databases() -> Vec<DisplayRecord> {
    vec![
      DisplayRecord::choice("ChEBI", "chebi"),
      DisplayRecord::choice("UniProt", "uniprot"),
    ]
  }

  struct First {
    runs: Arc<AtomicUsize>,
  }

  #[async_trait]
  impl Step for First {
    fn name(&self) -> &str {
      "first"
    }

    async fn run(&self, wizard: &mut Wizard, state: &mut WizardState) -> anyhow::Result<StepOutcome> {
      self.runs.fetch_add(1, Ordering::SeqCst);
      let config = PickerConfig::new("Create Annotation", 1, 2)
        .items(databases())
        .active(state.record("database").cloned())
        .should_resume(|| async { true });
      match wizard.show(config).await {
        Ok(Pick::Record(record)) => {
          state.set_record("database", record);
          Ok(StepOutcome::next(Second))
        },
        Ok(Pick::Text(_)) => anyhow::bail!("unexpected text"),
        Err(signal) => Ok(signal.into()),
      }
    }
  }

  struct Second;

  #[async_trait]
  impl Step for Second {
    fn name(&self) -> &str {
      "second"
    }

    async fn run(&self, wizard: &mut Wizard, state: &mut WizardState) -> anyhow::Result<StepOutcome> {
      let config = PickerConfig::new("Create Annotation", 2, 2).items(databases());
      match wizard.show(config).await {
        Ok(Pick::Record(record)) => {
          state.set_record("entity", record);
          Ok(StepOutcome::Completed)
        },
        Ok(Pick::Text(_)) => anyhow::bail!("unexpected text"),
        Err(signal) => Ok(signal.into()),
      }
    }
  }

  fn first() -> (StepRef, Arc<AtomicUsize>) {
    let runs = Arc::new(AtomicUsize::new(0));
    let step: StepRef = Arc::new(First { runs: runs.clone() });
    (step, runs)
  }

  #[tokio::test]
  async fn back_reopens_previous_step_with_prior_answer_active() {
    let (mut wizard, mut ui) = wizard();
    let (start, runs) = first();

    let driver = async {
      let view = ui.next_session(0).await.unwrap();
      assert_eq!(view.step, 1);
      assert_eq!(view.active, None);
      assert!(!view.back_button);
      ui.send(SessionInput::Select(0));

      let view = ui.next_session(view.id).await.unwrap();
      assert_eq!(view.step, 2);
      assert!(view.back_button);
      ui.send(SessionInput::Back);

      let view = ui.next_session(view.id).await.unwrap();
      assert_eq!(view.step, 1);
      assert_eq!(view.active_item().unwrap().label, "ChEBI");
      ui.send(SessionInput::Accept);

      let view = ui.next_session(view.id).await.unwrap();
      assert_eq!(view.step, 2);
      ui.send(SessionInput::Select(1));
    };
    let (outcome, ()) = tokio::join!(wizard.run(start, WizardState::new()), driver);

    let WizardOutcome::Completed(state) = outcome.unwrap() else {
      panic!("wizard should complete");
    };
    assert_eq!(state.record("database").unwrap().label, "ChEBI");
    assert_eq!(state.record("entity").unwrap().label, "UniProt");
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(wizard.depth(), 0);
    assert!(ui.snapshot().is_none());
  }

  #[tokio::test]
  async fn hide_without_resume_cancels_from_any_step() {
    let (mut wizard, mut ui) = wizard();

    let driver = async {
      let view = ui.next_session(0).await.unwrap();
      assert_eq!(view.step, 2);
      ui.send(SessionInput::Hide);
    };
    let (outcome, ()) = tokio::join!(wizard.run(Arc::new(Second), WizardState::new()), driver);

    assert_eq!(outcome.unwrap(), WizardOutcome::Cancelled);
    assert_eq!(wizard.depth(), 0);
    assert!(ui.snapshot().is_none());
  }

  #[tokio::test]
  async fn resume_reruns_the_same_step() {
    let (mut wizard, mut ui) = wizard();
    let (start, runs) = first();

    let driver = async {
      let view = ui.next_session(0).await.unwrap();
      ui.send(SessionInput::Hide);
      let view = ui.next_session(view.id).await.unwrap();
      assert_eq!(view.step, 1);
      ui.send(SessionInput::Select(0));
      let view = ui.next_session(view.id).await.unwrap();
      assert_eq!(view.step, 2);
      ui.send(SessionInput::Hide);
    };
    let (outcome, ()) = tokio::join!(wizard.run(start, WizardState::new()), driver);

    assert_eq!(outcome.unwrap(), WizardOutcome::Cancelled);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
  }

  struct BackFirst;

  #[async_trait]
  impl Step for BackFirst {
    fn name(&self) -> &str {
      "back-first"
    }

    async fn run(&self, _: &mut Wizard, _: &mut WizardState) -> anyhow::Result<StepOutcome> {
      Ok(StepOutcome::Back)
    }
  }

  #[tokio::test]
  async fn back_from_the_first_step_cancels() {
    let (mut wizard, _ui) = wizard();
    let outcome = wizard.run(Arc::new(BackFirst), WizardState::new()).await;
    assert_eq!(outcome.unwrap(), WizardOutcome::Cancelled);
  }

  struct Broken;

  #[async_trait]
  impl Step for Broken {
    fn name(&self) -> &str {
      "broken"
    }

    async fn run(&self, wizard: &mut Wizard, _: &mut WizardState) -> anyhow::Result<StepOutcome> {
      wizard.next_session_id += 1;
      let session = PickerSession::open(
        wizard.next_session_id,
        PickerConfig::new("broken", 1, 1),
        wizard.publisher.clone(),
      );
      wizard.current = Some(session.handle().clone());
      anyhow::bail!("lookup backend exploded")
    }
  }

  #[tokio::test]
  async fn step_errors_propagate_and_dispose_the_session() {
    let (mut wizard, ui) = wizard();
    let err = wizard
      .run(Arc::new(Broken), WizardState::new())
      .await
      .unwrap_err();

    let WizardError::Step { step, source } = &err;
    assert_eq!(step, "broken");
    assert_eq!(source.to_string(), "lookup backend exploded");
    assert!(ui.snapshot().is_none());
  }

  #[tokio::test]
  async fn frontend_disconnect_cancels() {
    let (mut wizard, ui) = wizard();
    drop(ui);
    let (start, _) = first();
    let outcome = wizard.run(start, WizardState::new()).await;
    assert_eq!(outcome.unwrap(), WizardOutcome::Cancelled);
  }

  #[tokio::test]
  async fn fetch_reports_empty_results() {
    let notices = Arc::new(Mutex::new(MessageCenter::default()));
    let (wizard, _ui) = Wizard::new(WizardConfig::default(), Arc::new(NoLookup), notices.clone());
    let wizard = wizard.with_empty_notice("Annotation not found");

    let records = wizard
      .fetch(SourceId::from("biomodels"), "nothing", LabelStyle::NameWithId)
      .await;
    assert!(records.is_none());
    assert_eq!(notices.lock().active().unwrap().text, "Annotation not found");
  }
}
