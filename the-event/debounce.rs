//! Utilities for declaring an async (usually debounced) hook

use std::time::Duration;

use futures_executor::block_on;
use tokio::{
  sync::mpsc::{
    self,
    Sender,
    error::TrySendError,
  },
  time::Instant,
};

/// Maximum time to block when sending to a full channel.
const SEND_TIMEOUT_MS: u64 = 2;

/// Capacity of the channel feeding a hook. Keystrokes arrive in bursts, so
/// leave plenty of headroom before `send_blocking` has to wait.
const HOOK_CHANNEL_CAPACITY: usize = 256;

/// A background task that receives events through a channel and decides,
/// per event, whether to act now or to (re)arm a debounce deadline.
///
/// The hook lives until every sender returned by [`AsyncHook::spawn`] is
/// dropped. A deadline that is still armed at that point is discarded:
/// whoever fed the hook is gone, so nobody is waiting for the result.
pub trait AsyncHook: Sync + Send + 'static + Sized {
  type Event: Sync + Send + 'static;

  /// Called immediately for every received event. Returning `Some` arms (or
  /// re-arms) the debounce deadline, returning the passed `deadline` keeps the
  /// current one, and `None` disarms it.
  fn handle_event(&mut self, event: Self::Event, deadline: Option<Instant>) -> Option<Instant>;

  /// Called once the armed deadline passes without a new event.
  fn finish_debounce(&mut self);

  fn spawn(self) -> mpsc::Sender<Self::Event> {
    let (tx, rx) = mpsc::channel(HOOK_CHANNEL_CAPACITY);
    // only spawn worker if we are inside runtime to avoid having to spawn a runtime
    // for unrelated unit tests
    if tokio::runtime::Handle::try_current().is_ok() {
      tokio::spawn(run(self, rx));
    } else {
      log::debug!("no tokio runtime, hook events will be dropped");
    }
    tx
  }
}

async fn run<Hook: AsyncHook>(mut hook: Hook, mut rx: mpsc::Receiver<Hook::Event>) {
  let mut deadline: Option<Instant> = None;
  loop {
    let event = match deadline {
      Some(at) => {
        match tokio::time::timeout_at(at, rx.recv()).await {
          Ok(event) => event,
          Err(_elapsed) => {
            deadline = None;
            hook.finish_debounce();
            continue;
          },
        }
      },
      None => rx.recv().await,
    };
    let Some(event) = event else {
      if deadline.is_some() {
        log::trace!("hook channel closed with a pending debounce, discarding it");
      }
      break;
    };
    deadline = hook.handle_event(event, deadline);
  }
}

/// Send an event to a hook from synchronous code.
///
/// Tries a non-blocking send first. If the channel is full it blocks for at
/// most `SEND_TIMEOUT_MS` and then drops the event, since a stalled frontend
/// is worse than a lost keystroke (the next one supersedes it anyway).
pub fn send_blocking<T>(tx: &Sender<T>, data: T) {
  match tx.try_send(data) {
    Ok(()) => {},
    Err(TrySendError::Full(data)) => {
      if block_on(tx.send_timeout(data, Duration::from_millis(SEND_TIMEOUT_MS))).is_err() {
        log::warn!("hook channel stayed full, dropping event");
      }
    },
    Err(TrySendError::Closed(_)) => {
      log::warn!("Attempted to send to closed channel");
    },
  }
}
