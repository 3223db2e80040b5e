//! The [`Transform`] accumulator.
//!
//! A transform starts from a document and applies steps one by one, keeping
//! every intermediate document and a [`Mapping`] through all of the steps.
//! The higher level editing operations live in `impl Transform` blocks next
//! to the algorithms that compute their steps.

use serde_json::Value;
use the_model::{
  Fragment,
  Mark,
  MarkType,
  Node,
  ResolveCache,
  ResolvedPos,
  Slice,
};
use tracing::{
  debug,
  trace,
};

use crate::{
  attr_step::{
    AttrStep,
    DocAttrStep,
  },
  error::{
    Result,
    TransformError,
  },
  map::Mapping,
  mark_step::{
    AddNodeMarkStep,
    RemoveNodeMarkStep,
  },
  step::{
    Step,
    StepKind,
    StepResult,
  },
};

/// Which node mark to remove: a specific mark, or the first mark of a type.
#[derive(Debug, Clone)]
pub enum NodeMarkTarget {
  Mark(Mark),
  Type(MarkType),
}

impl From<Mark> for NodeMarkTarget {
  fn from(mark: Mark) -> Self {
    NodeMarkTarget::Mark(mark)
  }
}

impl From<MarkType> for NodeMarkTarget {
  fn from(ty: MarkType) -> Self {
    NodeMarkTarget::Type(ty)
  }
}

/// An ordered batch of steps applied to a document.
#[derive(Debug)]
pub struct Transform {
  doc:     Node,
  steps:   Vec<Step>,
  docs:    Vec<Node>,
  mapping: Mapping,
  cache:   ResolveCache,
}

impl Transform {
  pub fn new(doc: Node) -> Self {
    Self {
      doc,
      steps: Vec::new(),
      docs: Vec::new(),
      mapping: Mapping::new(),
      cache: ResolveCache::new(),
    }
  }

  /// The current document, with every step applied.
  pub fn doc(&self) -> &Node {
    &self.doc
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  /// The document before each step, in step order.
  pub fn docs(&self) -> &[Node] {
    &self.docs
  }

  /// Maps positions in the starting document to the current one.
  pub fn mapping(&self) -> &Mapping {
    &self.mapping
  }

  /// The document the transform started from.
  pub fn before(&self) -> &Node {
    self.docs.first().unwrap_or(&self.doc)
  }

  pub fn doc_changed(&self) -> bool {
    !self.steps.is_empty()
  }

  pub(crate) fn mapping_mut(&mut self) -> &mut Mapping {
    &mut self.mapping
  }

  /// Resolve `pos` in the current document.
  pub fn resolve(&self, pos: usize) -> Result<ResolvedPos> {
    Ok(self.cache.resolve(&self.doc, pos)?)
  }

  /// Apply `step`, failing the operation if it doesn't fit the current
  /// document.
  pub fn step(&mut self, step: impl Into<Step>) -> Result<&mut Self> {
    let step = step.into();
    if let Err(err) = self.maybe_step(step.clone()) {
      debug!(step = %step, %err, "step failed");
      return Err(TransformError::Step(err));
    }
    Ok(self)
  }

  /// Try to apply `step`. The transform only changes when the step applies.
  pub fn maybe_step(&mut self, step: impl Into<Step>) -> StepResult {
    let step = step.into();
    let doc = step.apply(&self.doc)?;
    trace!(step_type = step.step_type(), steps = self.steps.len() + 1, "applied step");
    self.add_step(step, doc.clone());
    Ok(doc)
  }

  fn add_step(&mut self, step: Step, doc: Node) {
    let previous = std::mem::replace(&mut self.doc, doc);
    self.docs.push(previous);
    self.mapping.append_map(step.get_map(), None);
    self.steps.push(step);
  }

  /// Replace `from..to` with `slice`, fitting the slice into the document
  /// structure where needed. Nothing happens when no fitting exists.
  pub fn replace(&mut self, from: usize, to: usize, slice: &Slice) -> Result<&mut Self> {
    if let Some(step) = crate::replace::replace_step(&self.doc, from, to, slice)? {
      self.step(step)?;
    }
    Ok(self)
  }

  pub fn replace_with(&mut self, from: usize, to: usize, content: impl Into<Fragment>) -> Result<&mut Self> {
    self.replace(from, to, &Slice::new(content.into(), 0, 0))
  }

  pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self> {
    self.replace(from, to, &Slice::empty())
  }

  pub fn insert(&mut self, pos: usize, content: impl Into<Fragment>) -> Result<&mut Self> {
    self.replace_with(pos, pos, content)
  }

  /// Set a single attribute of the node at `pos`.
  pub fn set_node_attribute(&mut self, pos: usize, attr: impl Into<String>, value: Value) -> Result<&mut Self> {
    self.step(AttrStep::new(pos, attr, value))
  }

  pub fn set_doc_attribute(&mut self, attr: impl Into<String>, value: Value) -> Result<&mut Self> {
    self.step(DocAttrStep::new(attr, value))
  }

  pub fn add_node_mark(&mut self, pos: usize, mark: Mark) -> Result<&mut Self> {
    self.step(AddNodeMarkStep::new(pos, mark))
  }

  /// Remove a mark, or the first mark of a type, from the node at `pos`.
  /// Removing a mark the node doesn't have is a no-op.
  pub fn remove_node_mark(&mut self, pos: usize, target: impl Into<NodeMarkTarget>) -> Result<&mut Self> {
    let node = self
      .doc
      .node_at(pos)
      .ok_or(TransformError::NoNode { pos })?;
    let mark = match target.into() {
      NodeMarkTarget::Mark(mark) => mark.is_in_set(node.marks()).then_some(mark),
      NodeMarkTarget::Type(ty) => ty.is_in_set(node.marks()),
    };
    match mark {
      Some(mark) => self.step(RemoveNodeMarkStep::new(pos, mark)),
      None => Ok(self),
    }
  }
}
