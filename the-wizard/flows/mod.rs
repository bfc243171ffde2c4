//! The concrete wizards built on the step controller.

pub mod annotate;
pub mod browse;
pub mod choose;

pub use annotate::{
  AnnotationChoice,
  EntityKind,
  annotation_wizard,
  database_choices,
};
pub use browse::{
  BiomodelChoice,
  biomodel_browser,
};
pub use choose::ChooseOne;
