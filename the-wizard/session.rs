//! A single on-screen selection surface.
//!
//! The session does not draw anything itself. It publishes [`SessionView`]
//! snapshots through a watch channel for whatever frontend is attached and
//! consumes [`SessionInput`] events coming back from it, until it resolves to a
//! [`Pick`] or a control [`Signal`].

use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{
      AtomicBool,
      AtomicU64,
      Ordering,
    },
  },
  time::Duration,
};

use futures_util::future::{
  BoxFuture,
  FutureExt,
};
use parking_lot::Mutex;
use tokio::{
  sync::{
    mpsc::UnboundedReceiver,
    watch,
  },
  time::Instant,
};

use crate::records::DisplayRecord;

/// Called with the session and its new value on every value change.
pub type ValueChanged = Arc<dyn Fn(&SessionHandle, &str) + Send + Sync>;
/// Consulted when the surface is dismissed: `true` reopens the same step.
pub type ResumePredicate = Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;
/// Returns an inline error message for an unacceptable value.
pub type Validator = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Publisher side of the view channel shared by every session of a wizard.
pub type ViewPublisher = Arc<watch::Sender<Option<SessionView>>>;

/// How a session ends when the user actually chose something.
#[derive(Debug, Clone, PartialEq)]
pub enum Pick {
  Record(DisplayRecord),
  /// Free text accepted by an input-box style session.
  Text(String),
}

/// How a session ends when the user navigated instead of choosing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
  Back,
  Cancel,
  Resume,
}

/// Events a frontend feeds into the visible session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
  ChangeValue(String),
  SetActive(usize),
  Select(usize),
  /// Enter: choose the active item, or submit the typed value.
  Accept,
  Back,
  /// The surface was dismissed (escape, focus loss).
  Hide,
}

/// Everything a frontend needs to render the visible session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
  pub id:                 u64,
  pub title:              String,
  pub step:               usize,
  pub total_steps:        usize,
  pub placeholder:        String,
  pub prompt:             Option<String>,
  pub items:              Vec<DisplayRecord>,
  pub active:             Option<usize>,
  pub value:              String,
  pub busy:               bool,
  pub enabled:            bool,
  pub back_button:        bool,
  pub validation_message: Option<String>,
}

impl SessionView {
  pub fn active_item(&self) -> Option<&DisplayRecord> {
    self.active.and_then(|index| self.items.get(index))
  }
}

pub struct PickerConfig {
  title:            String,
  step:             usize,
  total_steps:      usize,
  placeholder:      String,
  prompt:           Option<String>,
  items:            Vec<DisplayRecord>,
  active:           Option<DisplayRecord>,
  initial_value:    Option<String>,
  on_value_changed: Option<ValueChanged>,
  should_resume:    Option<ResumePredicate>,
  validate:         Option<Validator>,
}

impl PickerConfig {
  pub fn new(title: impl Into<String>, step: usize, total_steps: usize) -> Self {
    Self {
      title: title.into(),
      step,
      total_steps,
      placeholder: String::new(),
      prompt: None,
      items: Vec::new(),
      active: None,
      initial_value: None,
      on_value_changed: None,
      should_resume: None,
      validate: None,
    }
  }

  pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
    self.placeholder = placeholder.into();
    self
  }

  pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
    self.prompt = Some(prompt.into());
    self
  }

  pub fn items(mut self, items: Vec<DisplayRecord>) -> Self {
    self.items = items;
    self
  }

  /// Highlight this record when the session opens (matched by value).
  pub fn active(mut self, active: Option<DisplayRecord>) -> Self {
    self.active = active;
    self
  }

  /// Pre-fill the value. The value-changed callback fires once on open.
  pub fn initial_value(mut self, value: Option<String>) -> Self {
    self.initial_value = value.filter(|value| !value.is_empty());
    self
  }

  pub fn on_value_changed<F>(mut self, callback: F) -> Self
  where
    F: Fn(&SessionHandle, &str) + Send + Sync + 'static,
  {
    self.on_value_changed = Some(Arc::new(callback));
    self
  }

  pub fn should_resume<F, Fut>(mut self, predicate: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
  {
    self.should_resume = Some(Arc::new(move || predicate().boxed()));
    self
  }

  /// Turn the surface into an input box: `Accept` without an active item
  /// submits the value once `validate` returns no message.
  pub fn validate<F>(mut self, validate: F) -> Self
  where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
  {
    self.validate = Some(Arc::new(validate));
    self
  }
}

struct SessionShared {
  id:                u64,
  view:              Mutex<SessionView>,
  generation:        AtomicU64,
  disposed:          AtomicBool,
  last_error_notice: Mutex<Option<Instant>>,
  publisher:         ViewPublisher,
}

/// Cheap handle to a session's live state, shared with in-flight searches.
///
/// Once the session is retired every mutation through the handle becomes a
/// no-op, so late responses cannot leak into whatever is on screen next.
#[derive(Clone)]
pub struct SessionHandle {
  inner: Arc<SessionShared>,
}

impl std::fmt::Debug for SessionHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SessionHandle")
      .field("id", &self.inner.id)
      .field("generation", &self.generation())
      .field("disposed", &self.is_disposed())
      .finish()
  }
}

impl SessionHandle {
  fn new(view: SessionView, publisher: ViewPublisher) -> Self {
    Self {
      inner: Arc::new(SessionShared {
        id: view.id,
        view: Mutex::new(view),
        generation: AtomicU64::new(0),
        disposed: AtomicBool::new(false),
        last_error_notice: Mutex::new(None),
        publisher,
      }),
    }
  }

  pub fn id(&self) -> u64 {
    self.inner.id
  }

  /// Number of value changes seen so far.
  pub fn generation(&self) -> u64 {
    self.inner.generation.load(Ordering::Acquire)
  }

  pub fn is_disposed(&self) -> bool {
    self.inner.disposed.load(Ordering::Acquire)
  }

  /// The live text value.
  pub fn value(&self) -> String {
    self.inner.view.lock().value.clone()
  }

  pub fn view(&self) -> SessionView {
    self.inner.view.lock().clone()
  }

  fn item(&self, index: usize) -> Option<DisplayRecord> {
    self.inner.view.lock().items.get(index).cloned()
  }

  fn update(&self, f: impl FnOnce(&mut SessionView)) {
    if self.is_disposed() {
      return;
    }
    let mut view = self.inner.view.lock();
    f(&mut view);
    self.publish(&view);
  }

  /// Push `view` to the frontend, but only while this session is the one on
  /// screen. A newer session's surface is never overwritten.
  fn publish(&self, view: &SessionView) {
    self.inner.publisher.send_if_modified(|current| {
      match current {
        Some(shown) if shown.id == view.id => {
          *shown = view.clone();
          true
        },
        _ => false,
      }
    });
  }

  /// Swap the whole item list in one step. The first item becomes active.
  pub fn replace_items(&self, items: Vec<DisplayRecord>) {
    self.update(|view| {
      view.active = if items.is_empty() { None } else { Some(0) };
      view.items = items;
    });
  }

  pub fn set_busy(&self, busy: bool) {
    self.update(|view| view.busy = busy);
  }

  /// Freeze the surface while an asynchronous step transition is pending.
  pub fn set_pending(&self, pending: bool) {
    self.update(|view| {
      view.enabled = !pending;
      view.busy = pending;
    });
  }

  fn set_active(&self, index: usize) {
    self.update(|view| {
      if index < view.items.len() {
        view.active = Some(index);
      }
    });
  }

  fn set_validation_message(&self, message: Option<String>) {
    self.update(|view| view.validation_message = message);
  }

  fn change_value(&self, value: String, validate: Option<&Validator>) -> u64 {
    let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
    let message = validate.and_then(|validate| validate(&value));
    self.update(|view| {
      view.value = value;
      view.validation_message = message;
    });
    generation
  }

  /// Whether an error notice may be shown now, given the last one shown for
  /// this session. Claiming records `now` as the new last notice.
  pub fn claim_error_notice(&self, now: Instant, window: Duration) -> bool {
    let mut last = self.inner.last_error_notice.lock();
    if last.is_some_and(|last| now.saturating_duration_since(last) < window) {
      return false;
    }
    *last = Some(now);
    true
  }

  /// Stop accepting updates but leave the (now frozen) surface on screen
  /// until the next session replaces it.
  pub fn retire(&self) {
    self.set_pending(true);
    self.inner.disposed.store(true, Ordering::Release);
  }

  /// Retire and take the surface off screen.
  pub fn dispose(&self) {
    self.retire();
    let id = self.id();
    self.inner.publisher.send_if_modified(|current| {
      if current.as_ref().is_some_and(|view| view.id == id) {
        *current = None;
        true
      } else {
        false
      }
    });
  }
}

/// The resolving side of a session, owned by whoever awaits its outcome.
pub struct PickerSession {
  handle:           SessionHandle,
  on_value_changed: Option<ValueChanged>,
  should_resume:    Option<ResumePredicate>,
  validate:         Option<Validator>,
}

impl PickerSession {
  /// Publish the surface and apply the initial value, if any.
  pub fn open(id: u64, config: PickerConfig, publisher: ViewPublisher) -> Self {
    let PickerConfig {
      title,
      step,
      total_steps,
      placeholder,
      prompt,
      items,
      active,
      initial_value,
      on_value_changed,
      should_resume,
      validate,
    } = config;

    let active = active.and_then(|active| items.iter().position(|item| *item == active));
    let view = SessionView {
      id,
      title,
      step,
      total_steps,
      placeholder,
      prompt,
      items,
      active,
      value: String::new(),
      busy: false,
      enabled: true,
      back_button: step > 1,
      validation_message: None,
    };
    publisher.send_replace(Some(view.clone()));

    let session = Self {
      handle: SessionHandle::new(view, publisher),
      on_value_changed,
      should_resume,
      validate,
    };
    if let Some(value) = initial_value {
      session.set_value(value);
    }
    session
  }

  pub fn handle(&self) -> &SessionHandle {
    &self.handle
  }

  /// Change the value as if the user typed it: bumps the generation,
  /// revalidates and notifies the value-changed callback.
  pub fn set_value(&self, value: impl Into<String>) {
    let value = value.into();
    self.handle.change_value(value.clone(), self.validate.as_ref());
    if let Some(callback) = &self.on_value_changed {
      callback(&self.handle, &value);
    }
  }

  fn accept(&self) -> Option<Pick> {
    let view = self.handle.view();
    if let Some(record) = view.active_item() {
      return Some(Pick::Record(record.clone()));
    }
    let validate = self.validate.as_ref()?;
    match validate(&view.value) {
      Some(message) => {
        self.handle.set_validation_message(Some(message));
        None
      },
      None => Some(Pick::Text(view.value)),
    }
  }

  async fn dismissed(&self, resume_timeout: Duration) -> Signal {
    let Some(should_resume) = &self.should_resume else {
      return Signal::Cancel;
    };
    match tokio::time::timeout(resume_timeout, should_resume()).await {
      Ok(true) => Signal::Resume,
      Ok(false) => Signal::Cancel,
      Err(_) => {
        log::warn!(
          "resume predicate did not answer within {}ms, cancelling",
          resume_timeout.as_millis()
        );
        Signal::Cancel
      },
    }
  }

  /// Consume frontend input until the session resolves.
  pub async fn resolve(
    &self,
    inputs: &mut UnboundedReceiver<SessionInput>,
    resume_timeout: Duration,
  ) -> Result<Pick, Signal> {
    loop {
      let Some(input) = inputs.recv().await else {
        log::debug!("frontend disconnected, cancelling session {}", self.handle.id());
        return Err(Signal::Cancel);
      };
      match input {
        SessionInput::ChangeValue(value) => self.set_value(value),
        SessionInput::SetActive(index) => self.handle.set_active(index),
        SessionInput::Select(index) => {
          if let Some(record) = self.handle.item(index) {
            return Ok(Pick::Record(record));
          }
          log::debug!("ignoring selection of missing item {index}");
        },
        SessionInput::Accept => {
          if let Some(pick) = self.accept() {
            return Ok(pick);
          }
        },
        SessionInput::Back => {
          if self.handle.view().back_button {
            return Err(Signal::Back);
          }
        },
        SessionInput::Hide => return Err(self.dismissed(resume_timeout).await),
      }
    }
  }
}
