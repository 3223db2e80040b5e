//! Steps that add or remove marks on inline content or on single nodes.

use serde_json::{
  Map,
  Value,
};
use the_model::{
  Fragment,
  Mark,
  Node,
  Slice,
};

use crate::{
  error::StepError,
  map::{
    Assoc,
    Mappable,
  },
  replace_step::ReplaceStep,
  step::{
    Step,
    StepKind,
    StepResult,
    apply_replace,
  },
};

/// Rebuild `fragment`, passing every inline node through `f` together with
/// its parent.
fn map_inline(fragment: &Fragment, parent: &Node, f: &impl Fn(&Node, &Node) -> Node) -> Fragment {
  let mapped = fragment
    .iter()
    .map(|child| {
      let child = if child.content().size() > 0 {
        child.copy(map_inline(child.content(), child, f))
      } else {
        child.clone()
      };
      if child.is_inline() {
        f(&child, parent)
      } else {
        child
      }
    })
    .collect();
  Fragment::from_vec(mapped)
}

fn mark_json(step_type: &str, from: usize, to: usize, mark: &Mark) -> Value {
  let mut json = Map::new();
  json.insert("stepType".into(), step_type.into());
  json.insert("mark".into(), mark.to_json());
  json.insert("from".into(), from.into());
  json.insert("to".into(), to.into());
  Value::Object(json)
}

fn node_mark_json(step_type: &str, pos: usize, mark: &Mark) -> Value {
  let mut json = Map::new();
  json.insert("stepType".into(), step_type.into());
  json.insert("pos".into(), pos.into());
  json.insert("mark".into(), mark.to_json());
  Value::Object(json)
}

/// A step putting the content of `doc` between `from` and `to` back in
/// place. Mark steps keep sizes, so the range lines up after applying them.
fn restore_range(doc: &Node, from: usize, to: usize, fallback: impl FnOnce() -> Step) -> Step {
  match doc.slice(from, to, false) {
    Ok(slice) => ReplaceStep::new(from, to, slice).into(),
    Err(_) => fallback(),
  }
}

/// Add `mark` to all inline content between `from` and `to`, where the
/// parent allows it.
#[derive(Debug, Clone, PartialEq)]
pub struct AddMarkStep {
  pub from: usize,
  pub to:   usize,
  pub mark: Mark,
}

impl AddMarkStep {
  pub fn new(from: usize, to: usize, mark: Mark) -> Self {
    Self { from, to, mark }
  }
}

impl StepKind for AddMarkStep {
  fn apply(&self, doc: &Node) -> StepResult {
    let old = doc.slice(self.from, self.to, false)?;
    let from = doc.resolve(self.from)?;
    let parent = from.node(from.shared_depth(self.to));
    let content = map_inline(old.content(), parent, &|node, parent| {
      if !node.is_atom() || !parent.ty().allows_mark_type(self.mark.ty()) {
        return node.clone();
      }
      node.mark(&self.mark.add_to_set(node.marks()))
    });
    let slice = Slice::new(content, old.open_start(), old.open_end());
    apply_replace(doc, self.from, self.to, &slice)
  }

  fn invert(&self, doc: &Node) -> Step {
    let mut uniform = true;
    doc.nodes_between(self.from, self.to, |node, _, parent, _| {
      if node.is_inline() && uniform {
        let marks = node.marks();
        let adds = node.is_atom() && parent.is_some_and(|parent| parent.ty().allows_mark_type(self.mark.ty()));
        uniform = !self.mark.is_in_set(marks) && (!adds || self.mark.add_to_set(marks).len() == marks.len() + 1);
      }
      uniform
    });
    if uniform {
      RemoveMarkStep::new(self.from, self.to, self.mark.clone()).into()
    } else {
      restore_range(doc, self.from, self.to, || {
        RemoveMarkStep::new(self.from, self.to, self.mark.clone()).into()
      })
    }
  }

  fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
    let from = mapping.map_result(self.from, Assoc::After);
    let to = mapping.map_result(self.to, Assoc::Before);
    if (from.deleted() && to.deleted()) || from.pos >= to.pos {
      return None;
    }
    Some(AddMarkStep::new(from.pos, to.pos, self.mark.clone()).into())
  }

  fn merge(&self, other: &Step) -> Option<Step> {
    match other {
      Step::AddMark(other) if other.mark == self.mark && self.from <= other.to && self.to >= other.from => {
        Some(
          AddMarkStep::new(
            self.from.min(other.from),
            self.to.max(other.to),
            self.mark.clone(),
          )
          .into(),
        )
      },
      _ => None,
    }
  }

  fn to_json(&self) -> Value {
    mark_json("addMark", self.from, self.to, &self.mark)
  }
}

/// Remove `mark` from all inline content between `from` and `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveMarkStep {
  pub from: usize,
  pub to:   usize,
  pub mark: Mark,
}

impl RemoveMarkStep {
  pub fn new(from: usize, to: usize, mark: Mark) -> Self {
    Self { from, to, mark }
  }
}

impl StepKind for RemoveMarkStep {
  fn apply(&self, doc: &Node) -> StepResult {
    let old = doc.slice(self.from, self.to, false)?;
    let content = map_inline(old.content(), doc, &|node, _parent| {
      node.mark(&self.mark.remove_from_set(node.marks()))
    });
    let slice = Slice::new(content, old.open_start(), old.open_end());
    apply_replace(doc, self.from, self.to, &slice)
  }

  fn invert(&self, doc: &Node) -> Step {
    let mut uniform = true;
    doc.nodes_between(self.from, self.to, |node, _, parent, _| {
      if node.is_inline() && uniform {
        let allowed = parent.is_some_and(|parent| parent.ty().allows_mark_type(self.mark.ty()));
        uniform = node.is_atom() && allowed && self.mark.is_in_set(node.marks());
      }
      uniform
    });
    if uniform {
      AddMarkStep::new(self.from, self.to, self.mark.clone()).into()
    } else {
      restore_range(doc, self.from, self.to, || {
        AddMarkStep::new(self.from, self.to, self.mark.clone()).into()
      })
    }
  }

  fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
    let from = mapping.map_result(self.from, Assoc::After);
    let to = mapping.map_result(self.to, Assoc::Before);
    if (from.deleted() && to.deleted()) || from.pos >= to.pos {
      return None;
    }
    Some(RemoveMarkStep::new(from.pos, to.pos, self.mark.clone()).into())
  }

  fn merge(&self, other: &Step) -> Option<Step> {
    match other {
      Step::RemoveMark(other) if other.mark == self.mark && self.from <= other.to && self.to >= other.from => {
        Some(
          RemoveMarkStep::new(
            self.from.min(other.from),
            self.to.max(other.to),
            self.mark.clone(),
          )
          .into(),
        )
      },
      _ => None,
    }
  }

  fn to_json(&self) -> Value {
    mark_json("removeMark", self.from, self.to, &self.mark)
  }
}

/// The non-text node at `pos`, or the error a node step reports.
fn node_at(doc: &Node, pos: usize) -> Result<&Node, StepError> {
  doc
    .node_at(pos)
    .filter(|node| !node.is_text())
    .ok_or(StepError::NoNode { pos })
}

/// Replace the node at `pos` with `updated`, which carries no content: the
/// original content is kept by leaving the slice open at its end.
pub(crate) fn replace_markup(doc: &Node, pos: usize, node: &Node, updated: Node) -> StepResult {
  let open_end = if node.is_leaf() { 0 } else { 1 };
  let slice = Slice::new(Fragment::from(updated), 0, open_end);
  apply_replace(doc, pos, pos + 1, &slice)
}

/// Add a mark to the node at `pos`.
#[derive(Debug, Clone, PartialEq)]
pub struct AddNodeMarkStep {
  pub pos:  usize,
  pub mark: Mark,
}

impl AddNodeMarkStep {
  pub fn new(pos: usize, mark: Mark) -> Self {
    Self { pos, mark }
  }
}

impl StepKind for AddNodeMarkStep {
  fn apply(&self, doc: &Node) -> StepResult {
    let node = node_at(doc, self.pos)?;
    let updated = node
      .mark(&self.mark.add_to_set(node.marks()))
      .copy(Fragment::empty());
    replace_markup(doc, self.pos, node, updated)
  }

  fn invert(&self, doc: &Node) -> Step {
    if let Some(node) = doc.node_at(self.pos) {
      let new_set = self.mark.add_to_set(node.marks());
      if new_set.len() == node.marks().len() {
        // Adding replaced an excluded mark; restoring it takes that mark back.
        let replaced = node.marks().iter().find(|mark| !mark.is_in_set(&new_set));
        let mark = replaced.unwrap_or(&self.mark).clone();
        return AddNodeMarkStep::new(self.pos, mark).into();
      }
    }
    RemoveNodeMarkStep::new(self.pos, self.mark.clone()).into()
  }

  fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
    let pos = mapping.map_result(self.pos, Assoc::After);
    (!pos.deleted_after()).then(|| AddNodeMarkStep::new(pos.pos, self.mark.clone()).into())
  }

  fn to_json(&self) -> Value {
    node_mark_json("addNodeMark", self.pos, &self.mark)
  }
}

/// Remove a mark from the node at `pos`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveNodeMarkStep {
  pub pos:  usize,
  pub mark: Mark,
}

impl RemoveNodeMarkStep {
  pub fn new(pos: usize, mark: Mark) -> Self {
    Self { pos, mark }
  }
}

impl StepKind for RemoveNodeMarkStep {
  fn apply(&self, doc: &Node) -> StepResult {
    let node = node_at(doc, self.pos)?;
    let updated = node
      .mark(&self.mark.remove_from_set(node.marks()))
      .copy(Fragment::empty());
    replace_markup(doc, self.pos, node, updated)
  }

  fn invert(&self, doc: &Node) -> Step {
    match doc.node_at(self.pos) {
      Some(node) if self.mark.is_in_set(node.marks()) => AddNodeMarkStep::new(self.pos, self.mark.clone()).into(),
      _ => self.clone().into(),
    }
  }

  fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
    let pos = mapping.map_result(self.pos, Assoc::After);
    (!pos.deleted_after()).then(|| RemoveNodeMarkStep::new(pos.pos, self.mark.clone()).into())
  }

  fn to_json(&self) -> Value {
    node_mark_json("removeNodeMark", self.pos, &self.mark)
  }
}
