//! Async building blocks shared by the wizard: debounced hooks that run as
//! background tokio tasks, and cooperative cancellation for the work they
//! spawn.

mod cancel;
mod debounce;

pub use cancel::{
  TaskController,
  TaskHandle,
  cancelable_future,
};
pub use debounce::{
  AsyncHook,
  send_blocking,
};
