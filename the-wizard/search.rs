//! Debounced, cancellable lookups driven by a session's value changes.
//!
//! Every keystroke is forwarded to a [`QueryHook`] running as a background
//! task. The hook waits for the value to settle, then issues exactly one
//! lookup for the latest value. Responses are only applied while they still
//! describe what the user is looking at: the session must be live and its
//! value must equal the query the response answers.

use std::{
  sync::Arc,
  time::Duration,
};

use the_wizard_event::{
  AsyncHook,
  TaskController,
  TaskHandle,
  cancelable_future,
  send_blocking,
};
use tokio::{
  sync::mpsc::Sender,
  time::Instant,
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
  records::Projector,
  session::SessionHandle,
};

pub const DEFAULT_EMPTY_NOTICE: &str = "Nothing found";

/// What [`SearchCoordinator::apply_response`] did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
  /// The session moved on (or is gone); nothing changed.
  Stale,
  Items(usize),
  /// Items cleared and the "nothing found" notice shown.
  Empty,
  /// Items cleared. `notified` is false when the notice was rate limited.
  Failed { notified: bool },
}

/// Everything needed to run lookups for one source.
pub struct SearchOptions {
  pub source:       SourceId,
  pub lookup:       Arc<dyn Lookup>,
  pub notifier:     Arc<dyn Notifier>,
  pub projector:    Projector,
  pub debounce:     Duration,
  pub error_window: Duration,
  pub max_results:  usize,
  pub empty_notice: String,
}

impl SearchOptions {
  pub fn new(
    source: SourceId,
    lookup: Arc<dyn Lookup>,
    notifier: Arc<dyn Notifier>,
    config: &WizardConfig,
  ) -> Self {
    Self {
      source,
      lookup,
      notifier,
      projector: Projector::default(),
      debounce: config.debounce,
      error_window: config.error_notice_window,
      max_results: config.max_results,
      empty_notice: DEFAULT_EMPTY_NOTICE.to_string(),
    }
  }

  pub fn projector(mut self, projector: Projector) -> Self {
    self.projector = projector;
    self
  }

  pub fn empty_notice(mut self, notice: impl Into<String>) -> Self {
    self.empty_notice = notice.into();
    self
  }

  pub fn spawn(self) -> SearchCoordinator {
    SearchCoordinator::spawn(self)
  }
}

struct Shared {
  source:       SourceId,
  lookup:       Arc<dyn Lookup>,
  notifier:     Arc<dyn Notifier>,
  projector:    Projector,
  error_window: Duration,
  max_results:  usize,
  empty_notice: String,
}

/// Front of the search pipeline. Cheap to hand to a session as its
/// value-changed callback via [`SearchCoordinator::into_callback`].
#[derive(Clone)]
pub struct SearchCoordinator {
  shared: Arc<Shared>,
  tx:     Sender<QueryEvent>,
}

impl SearchCoordinator {
  pub fn spawn(options: SearchOptions) -> Self {
    let SearchOptions {
      source,
      lookup,
      notifier,
      projector,
      debounce,
      error_window,
      max_results,
      empty_notice,
    } = options;
    let shared = Arc::new(Shared {
      source,
      lookup,
      notifier,
      projector,
      error_window,
      max_results: max_results.max(1),
      empty_notice,
    });
    let tx = QueryHook {
      shared: shared.clone(),
      debounce,
      pending: None,
      task_controller: TaskController::new(),
    }
    .spawn();
    Self { shared, tx }
  }

  pub fn source(&self) -> &SourceId {
    &self.shared.source
  }

  /// Feed a value change. Any lookup still in flight is cancelled and the
  /// debounce restarts.
  pub fn on_value_changed(&self, session: &SessionHandle, value: &str) {
    send_blocking(&self.tx, QueryEvent {
      session:    session.clone(),
      value:      value.to_owned(),
      generation: session.generation(),
    });
  }

  pub fn into_callback(self) -> impl Fn(&SessionHandle, &str) + Send + Sync + 'static {
    move |session: &SessionHandle, value: &str| self.on_value_changed(session, value)
  }

  /// Apply a response to `session`. `asked` is the query the request carried;
  /// a successful response is matched against the query it echoes instead.
  pub fn apply_response(
    &self,
    session: &SessionHandle,
    asked: &str,
    response: LookupResponse,
  ) -> Applied {
    self.shared.apply_response(session, asked, response)
  }
}

impl Shared {
  fn apply_response(&self, session: &SessionHandle, asked: &str, response: LookupResponse) -> Applied {
    if session.is_disposed() {
      return Applied::Stale;
    }
    match response {
      LookupResponse::Failed { error } => {
        if session.value() != asked {
          return Applied::Stale;
        }
        session.replace_items(Vec::new());
        let notified = session.claim_error_notice(Instant::now(), self.error_window);
        if notified {
          self
            .notifier
            .notify(NoticeKind::Error, &format!("Could not perform query: {error}"));
        } else {
          log::debug!("suppressing lookup error notice for session {}: {error}", session.id());
        }
        Applied::Failed { notified }
      },
      LookupResponse::Found { query, items } => {
        if session.value() != query {
          log::trace!("dropping stale results for {query:?}");
          return Applied::Stale;
        }
        if items.is_empty() {
          session.replace_items(Vec::new());
          self.notifier.notify(NoticeKind::Info, &self.empty_notice);
          return Applied::Empty;
        }
        let shown = items.len().min(self.max_results);
        let records = self.projector.project_all(&items[..shown]);
        session.replace_items(records);
        Applied::Items(shown)
      },
    }
  }
}

struct QueryEvent {
  session:    SessionHandle,
  value:      String,
  generation: u64,
}

/// Debounces value changes and owns the single in-flight lookup.
struct QueryHook {
  shared:          Arc<Shared>,
  debounce:        Duration,
  pending:         Option<QueryEvent>,
  task_controller: TaskController,
}

impl AsyncHook for QueryHook {
  type Event = QueryEvent;

  fn handle_event(&mut self, event: QueryEvent, _deadline: Option<Instant>) -> Option<Instant> {
    self.task_controller.cancel();
    self.pending = Some(event);
    Some(Instant::now() + self.debounce)
  }

  fn finish_debounce(&mut self) {
    let Some(query) = self.pending.take() else {
      return;
    };
    if query.session.is_disposed() || query.session.generation() != query.generation {
      log::trace!("skipping lookup for superseded value {:?}", query.value);
      return;
    }
    let handle = self.task_controller.restart();
    tokio::spawn(run_lookup(self.shared.clone(), query, handle));
  }
}

async fn run_lookup(shared: Arc<Shared>, query: QueryEvent, handle: TaskHandle) {
  let QueryEvent {
    session,
    value,
    generation,
  } = query;
  let request = LookupRequest {
    source: shared.source.clone(),
    query: value.clone(),
    generation,
  };
  log::debug!("looking up {value:?} in {}", shared.source);

  session.set_busy(true);
  let response = cancelable_future(shared.lookup.lookup(request), handle).await;
  session.set_busy(false);

  let Some(response) = response else {
    log::trace!("lookup for {value:?} cancelled");
    return;
  };
  let applied = shared.apply_response(&session, &value, response);
  log::debug!("lookup for {value:?}: {applied:?}");
}
