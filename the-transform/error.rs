use the_model::{
  ContentError,
  RangeError,
  ReplaceError,
};
use thiserror::Error;

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Why a step could not be applied to a document.
///
/// Step application never panics on a document it doesn't fit; callers get
/// one of these back and the document stays untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
  #[error("structure replace would overwrite content")]
  OverwritesContent,
  #[error("gap is not a flat range")]
  GapNotFlat,
  #[error("content does not fit in gap")]
  GapMismatch,
  #[error("no node at position {pos}")]
  NoNode { pos: usize },
  #[error("replace failed: {0}")]
  Replace(ReplaceError),
  #[error("invalid content: {0}")]
  Content(#[from] ContentError),
  #[error(transparent)]
  Range(#[from] RangeError),
}

impl StepError {
  pub(crate) fn from_replace(err: ReplaceError) -> Self {
    match err {
      ReplaceError::Range(err) => StepError::Range(err),
      err => StepError::Replace(err),
    }
  }
}

/// Errors returned by [`Transform`](crate::Transform) operations and the
/// step codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransformError {
  #[error("step failed: {0}")]
  Step(#[from] StepError),
  #[error(transparent)]
  Range(#[from] RangeError),
  #[error(transparent)]
  Content(#[from] ContentError),
  #[error("no node at position {pos}")]
  NoNode { pos: usize },
  #[error("{name} is not a textblock type")]
  NotTextblock { name: String },
  #[error("invalid content for node type {name}")]
  InvalidContent { name: String },
  #[error("wrapper {name} does not form valid content of its parent wrapper")]
  InvalidWrapper { name: String },
  #[error("unknown step type {0:?}")]
  UnknownStepType(String),
  #[error("step type {0:?} is already registered")]
  DuplicateStepType(String),
  #[error("invalid {step_type} step JSON: {message}")]
  InvalidStepJson { step_type: String, message: String },
}
