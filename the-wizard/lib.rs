//! Multi-step picker wizards with debounced live search.
//!
//! A [`Wizard`] runs a stack of [`Step`]s. Each step shows one
//! [`PickerSession`](session::PickerSession); sessions that search as the user
//! types hand their value changes to a [`SearchCoordinator`], which debounces
//! them, queries a [`Lookup`] and projects the hits into
//! [`DisplayRecord`]s. Frontends drive the wizard through [`WizardUi`].

pub mod catalog;
pub mod config;
pub mod flows;
pub mod lookup;
pub mod notices;
pub mod records;
pub mod search;
pub mod session;
pub mod state;
pub mod wizard;

pub use catalog::StaticCatalog;
pub use config::WizardConfig;
pub use lookup::{
  Annotation,
  AnnotationSink,
  Lookup,
  LookupRequest,
  LookupResponse,
  NoticeKind,
  Notifier,
  SourceId,
};
pub use notices::MessageCenter;
pub use records::{
  DisplayRecord,
  LabelStyle,
  Projector,
  RawItem,
  SourceTemplates,
};
pub use search::SearchCoordinator;
pub use session::{
  Pick,
  PickerConfig,
  SessionInput,
  SessionView,
  Signal,
};
pub use state::{
  Answer,
  WizardState,
};
pub use wizard::{
  Step,
  StepOutcome,
  StepRef,
  Wizard,
  WizardError,
  WizardOutcome,
  WizardUi,
};
