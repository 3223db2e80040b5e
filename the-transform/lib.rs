//! Steps, position mapping and transforms over `the-model` documents.
//!
//! Every change to a document is expressed as a [`Step`]: a small,
//! invertible, serializable description of an edit. Applying a step either
//! produces a new document or fails with a [`StepError`], leaving the input
//! untouched.
//!
//! Each step also produces a [`StepMap`] describing how positions move
//! through it. A [`Mapping`] chains step maps so positions in an old
//! document can be carried forward, with mirror information so that a step
//! followed by its inverse maps positions back exactly.
//!
//! A [`Transform`] applies steps in sequence and is where the higher level
//! editing operations live: replacing with fitting, lifting, wrapping,
//! splitting, joining, retyping blocks and adding or removing marks.

pub mod attr_step;
pub mod error;
pub mod json;
pub mod map;
mod mark;
pub mod mark_step;
pub mod rebase;
mod replace;
pub mod replace_step;
pub mod step;
pub mod structure;
pub mod transform;

pub use attr_step::{
  AttrStep,
  DocAttrStep,
};
pub use error::{
  Result,
  StepError,
  TransformError,
};
pub use json::{
  StepCodec,
  StepDecoder,
};
pub use map::{
  Assoc,
  DelInfo,
  MapRange,
  MapResult,
  Mappable,
  Mapping,
  Recover,
  StepMap,
};
pub use mark::MarkFilter;
pub use mark_step::{
  AddMarkStep,
  AddNodeMarkStep,
  RemoveMarkStep,
  RemoveNodeMarkStep,
};
pub use rebase::{
  Rebaseable,
  rebase_steps,
};
pub use replace::replace_step;
pub use replace_step::{
  ReplaceAroundStep,
  ReplaceStep,
};
pub use step::{
  Step,
  StepKind,
  StepResult,
};
pub use structure::{
  Wrapper,
  can_join,
  can_split,
  drop_point,
  find_wrapping,
  insert_point,
  join_point,
  joinable,
  lift_target,
};
pub use transform::{
  NodeMarkTarget,
  Transform,
};
