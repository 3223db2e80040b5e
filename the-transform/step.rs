//! Steps: atomic, invertible, serializable document edits.

use std::fmt;

use serde_json::Value;
use the_model::{
  Node,
  Schema,
  Slice,
};

use crate::{
  attr_step::{
    AttrStep,
    DocAttrStep,
  },
  error::{
    Result,
    StepError,
  },
  json::StepCodec,
  map::{
    Mappable,
    StepMap,
  },
  mark_step::{
    AddMarkStep,
    AddNodeMarkStep,
    RemoveMarkStep,
    RemoveNodeMarkStep,
  },
  replace_step::{
    ReplaceAroundStep,
    ReplaceStep,
  },
};

/// Outcome of applying a step: the new document or why the step doesn't
/// fit.
pub type StepResult = std::result::Result<Node, StepError>;

/// Replace `from..to` in `doc` with `slice`, turning a failed model replace
/// into a step error.
pub(crate) fn apply_replace(doc: &Node, from: usize, to: usize, slice: &Slice) -> StepResult {
  doc
    .replace(from, to, slice)
    .map_err(StepError::from_replace)
}

/// Behavior shared by every kind of step.
pub trait StepKind {
  /// Apply the step to `doc`. Fails without side effects when the step
  /// doesn't fit the document.
  fn apply(&self, doc: &Node) -> StepResult;

  /// The position changes this step makes.
  fn get_map(&self) -> StepMap {
    StepMap::empty()
  }

  /// A step that undoes this one, given the document it was applied to.
  fn invert(&self, doc: &Node) -> Step;

  /// Move the step through `mapping`, or `None` when its target was
  /// deleted.
  fn map(&self, mapping: &dyn Mappable) -> Option<Step>;

  /// A single step with the effect of this one followed by `other`, when
  /// such a step exists.
  fn merge(&self, other: &Step) -> Option<Step> {
    let _ = other;
    None
  }

  fn to_json(&self) -> Value;
}

/// Every step kind the engine knows about.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
  Replace(ReplaceStep),
  ReplaceAround(ReplaceAroundStep),
  AddMark(AddMarkStep),
  RemoveMark(RemoveMarkStep),
  AddNodeMark(AddNodeMarkStep),
  RemoveNodeMark(RemoveNodeMarkStep),
  Attr(AttrStep),
  DocAttr(DocAttrStep),
}

macro_rules! each_step {
  ($step:expr, $inner:ident => $body:expr) => {
    match $step {
      Step::Replace($inner) => $body,
      Step::ReplaceAround($inner) => $body,
      Step::AddMark($inner) => $body,
      Step::RemoveMark($inner) => $body,
      Step::AddNodeMark($inner) => $body,
      Step::RemoveNodeMark($inner) => $body,
      Step::Attr($inner) => $body,
      Step::DocAttr($inner) => $body,
    }
  };
}

impl Step {
  /// The `stepType` id used on the wire.
  pub fn step_type(&self) -> &'static str {
    match self {
      Step::Replace(_) => "replace",
      Step::ReplaceAround(_) => "replaceAround",
      Step::AddMark(_) => "addMark",
      Step::RemoveMark(_) => "removeMark",
      Step::AddNodeMark(_) => "addNodeMark",
      Step::RemoveNodeMark(_) => "removeNodeMark",
      Step::Attr(_) => "attr",
      Step::DocAttr(_) => "docAttr",
    }
  }

  /// Decode a step with the built-in step types. Use a [`StepCodec`] to
  /// accept additional ids.
  pub fn from_json(schema: &Schema, json: &Value) -> Result<Step> {
    StepCodec::new().decode(schema, json)
  }
}

impl StepKind for Step {
  fn apply(&self, doc: &Node) -> StepResult {
    each_step!(self, step => step.apply(doc))
  }

  fn get_map(&self) -> StepMap {
    each_step!(self, step => step.get_map())
  }

  fn invert(&self, doc: &Node) -> Step {
    each_step!(self, step => step.invert(doc))
  }

  fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
    each_step!(self, step => step.map(mapping))
  }

  fn merge(&self, other: &Step) -> Option<Step> {
    each_step!(self, step => step.merge(other))
  }

  fn to_json(&self) -> Value {
    each_step!(self, step => step.to_json())
  }
}

macro_rules! impl_from_step {
  ($($variant:ident($ty:ty)),* $(,)?) => {
    $(
      impl From<$ty> for Step {
        fn from(step: $ty) -> Self {
          Step::$variant(step)
        }
      }
    )*
  };
}

impl_from_step! {
  Replace(ReplaceStep),
  ReplaceAround(ReplaceAroundStep),
  AddMark(AddMarkStep),
  RemoveMark(RemoveMarkStep),
  AddNodeMark(AddNodeMarkStep),
  RemoveNodeMark(RemoveNodeMarkStep),
  Attr(AttrStep),
  DocAttr(DocAttrStep),
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_json())
  }
}
