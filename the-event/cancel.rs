//! Cooperative cancellation for work spawned by hooks.
//!
//! A [`TaskController`] owns at most one running task at a time. Every call to
//! [`TaskController::restart`] cancels whatever was running before and hands
//! out a fresh [`TaskHandle`] for the replacement.

use std::future::Future;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct TaskController {
  current: Option<TaskHandle>,
}

impl TaskController {
  pub fn new() -> Self {
    Self::default()
  }

  /// Cancel the running task (if any).
  pub fn cancel(&mut self) {
    if let Some(handle) = self.current.take() {
      handle.token.cancel();
    }
  }

  /// Cancel the running task and return a handle for its replacement.
  pub fn restart(&mut self) -> TaskHandle {
    self.cancel();
    let handle = TaskHandle {
      token: CancellationToken::new(),
    };
    self.current = Some(handle.clone());
    handle
  }
}

/// Passed into a spawned task so it can observe cancellation. The controller
/// keeps one clone; the task keeps the other.
#[derive(Debug, Clone)]
pub struct TaskHandle {
  token: CancellationToken,
}

impl TaskHandle {
  pub fn is_canceled(&self) -> bool {
    self.token.is_cancelled()
  }

  pub async fn canceled(&self) {
    self.token.cancelled().await
  }
}

/// Run `future` until it completes or `handle` is cancelled, whichever comes
/// first. Returns `None` when cancelled.
pub async fn cancelable_future<T>(future: impl Future<Output = T>, handle: TaskHandle) -> Option<T> {
  tokio::select! {
    biased;
    _ = handle.canceled() => None,
    output = future => Some(output),
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[tokio::test(start_paused = true)]
  async fn restart_cancels_previous_task() {
    let mut controller = TaskController::new();
    let first = controller.restart();
    let task = tokio::spawn(cancelable_future(
      tokio::time::sleep(Duration::from_secs(5)),
      first,
    ));

    let _second = controller.restart();
    assert_eq!(task.await.unwrap(), None);
  }

  #[tokio::test(start_paused = true)]
  async fn completed_future_returns_output() {
    let mut controller = TaskController::new();
    let handle = controller.restart();
    let output = cancelable_future(async { 42 }, handle).await;
    assert_eq!(output, Some(42));
  }

  #[test]
  fn cancel_only_reaches_current_handle() {
    let mut controller = TaskController::new();
    let first = controller.restart();
    let second = controller.restart();
    assert!(first.is_canceled());
    assert!(!second.is_canceled());

    controller.cancel();
    assert!(second.is_canceled());
  }

  #[tokio::test]
  async fn dropping_controller_leaves_task_running() {
    let mut controller = TaskController::new();
    let handle = controller.restart();
    drop(controller);
    assert_eq!(cancelable_future(async { 7 }, handle).await, Some(7));
  }
}
