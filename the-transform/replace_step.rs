//! Steps that replace a range of the document with a slice.

use serde_json::{
  Map,
  Value,
};
use the_model::{
  Node,
  ReplaceError,
  Slice,
};

use crate::{
  error::StepError,
  map::{
    Assoc,
    MapRange,
    Mappable,
    StepMap,
  },
  step::{
    Step,
    StepKind,
    StepResult,
    apply_replace,
  },
};

/// Replace `from..to` with `slice`.
///
/// When `structure` is set the step may only touch node boundaries: it fails
/// instead of deleting any actual content. Structural steps are what lift,
/// wrap and join produce, and mapping them through concurrent edits must not
/// make them eat text.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceStep {
  pub from:      usize,
  pub to:        usize,
  pub slice:     Slice,
  pub structure: bool,
}

impl ReplaceStep {
  pub fn new(from: usize, to: usize, slice: Slice) -> Self {
    Self {
      from,
      to,
      slice,
      structure: false,
    }
  }

  pub fn structural(from: usize, to: usize, slice: Slice) -> Self {
    Self {
      from,
      to,
      slice,
      structure: true,
    }
  }
}

impl StepKind for ReplaceStep {
  fn apply(&self, doc: &Node) -> StepResult {
    if self.structure && content_between(doc, self.from, self.to)? {
      return Err(StepError::OverwritesContent);
    }
    apply_replace(doc, self.from, self.to, &self.slice)
  }

  fn get_map(&self) -> StepMap {
    StepMap::new(vec![MapRange::new(
      self.from,
      self.to - self.from,
      self.slice.size(),
    )])
  }

  /// # Panics
  ///
  /// Panics when `doc` is not a document the step applies to.
  fn invert(&self, doc: &Node) -> Step {
    let removed = doc
      .slice(self.from, self.to, false)
      .unwrap_or_else(|err| panic!("inverting replace step against a foreign document: {err}"));
    ReplaceStep::new(self.from, self.from + self.slice.size(), removed).into()
  }

  fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
    let from = mapping.map_result(self.from, Assoc::After);
    let to = mapping.map_result(self.to, Assoc::Before);
    if from.deleted_across() && to.deleted_across() {
      return None;
    }
    Some(
      ReplaceStep {
        from:      from.pos,
        to:        from.pos.max(to.pos),
        slice:     self.slice.clone(),
        structure: self.structure,
      }
      .into(),
    )
  }

  fn merge(&self, other: &Step) -> Option<Step> {
    let Step::Replace(other) = other else {
      return None;
    };
    if other.structure || self.structure {
      return None;
    }
    let joined = |first: &Slice, second: &Slice| {
      if first.size() + second.size() == 0 {
        Slice::empty()
      } else {
        Slice::new(
          first.content().append(second.content()),
          first.open_start(),
          second.open_end(),
        )
      }
    };
    if self.from + self.slice.size() == other.from
      && self.slice.open_end() == 0
      && other.slice.open_start() == 0
    {
      let slice = joined(&self.slice, &other.slice);
      Some(ReplaceStep::new(self.from, self.to + (other.to - other.from), slice).into())
    } else if other.to == self.from && self.slice.open_start() == 0 && other.slice.open_end() == 0 {
      let slice = joined(&other.slice, &self.slice);
      Some(ReplaceStep::new(other.from, self.to, slice).into())
    } else {
      None
    }
  }

  fn to_json(&self) -> Value {
    let mut json = Map::new();
    json.insert("stepType".into(), "replace".into());
    json.insert("from".into(), self.from.into());
    json.insert("to".into(), self.to.into());
    if let Some(slice) = self.slice.to_json() {
      json.insert("slice".into(), slice);
    }
    if self.structure {
      json.insert("structure".into(), true.into());
    }
    Value::Object(json)
  }
}

/// Replace `from..to` with `slice`, but keep the content of `gap_from..gap_to`
/// and place it into the slice at offset `insert`.
///
/// Used to wrap, unwrap or retype a range of nodes without touching what is
/// inside them.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceAroundStep {
  pub from:      usize,
  pub to:        usize,
  pub gap_from:  usize,
  pub gap_to:    usize,
  pub slice:     Slice,
  pub insert:    usize,
  pub structure: bool,
}

impl ReplaceAroundStep {
  pub fn new(
    from: usize,
    to: usize,
    gap_from: usize,
    gap_to: usize,
    slice: Slice,
    insert: usize,
    structure: bool,
  ) -> Self {
    Self {
      from,
      to,
      gap_from,
      gap_to,
      slice,
      insert,
      structure,
    }
  }
}

impl StepKind for ReplaceAroundStep {
  fn apply(&self, doc: &Node) -> StepResult {
    if self.structure
      && (content_between(doc, self.from, self.gap_from)? || content_between(doc, self.gap_to, self.to)?)
    {
      return Err(StepError::OverwritesContent);
    }
    let gap = doc.slice(self.gap_from, self.gap_to, false)?;
    if gap.open_start() > 0 || gap.open_end() > 0 {
      return Err(StepError::GapNotFlat);
    }
    let inserted = self
      .slice
      .insert_at(self.insert, gap.content())
      .ok_or(StepError::GapMismatch)?;
    apply_replace(doc, self.from, self.to, &inserted)
  }

  fn get_map(&self) -> StepMap {
    // Out-of-order fields never apply; they map as empty ranges.
    StepMap::new(vec![
      MapRange::new(self.from, self.gap_from.saturating_sub(self.from), self.insert),
      MapRange::new(
        self.gap_to,
        self.to.saturating_sub(self.gap_to),
        self.slice.size().saturating_sub(self.insert),
      ),
    ])
  }

  /// # Panics
  ///
  /// Panics when `doc` is not a document the step applies to.
  fn invert(&self, doc: &Node) -> Step {
    let gap = self.gap_to - self.gap_from;
    let removed = doc
      .slice(self.from, self.to, false)
      .map_err(ReplaceError::from)
      .and_then(|slice| slice.remove_between(self.gap_from - self.from, self.gap_to - self.from))
      .unwrap_or_else(|err| panic!("inverting replace-around step against a foreign document: {err}"));
    ReplaceAroundStep::new(
      self.from,
      self.from + self.slice.size() + gap,
      self.from + self.insert,
      self.from + self.insert + gap,
      removed,
      self.gap_from - self.from,
      self.structure,
    )
    .into()
  }

  fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
    let from = mapping.map_result(self.from, Assoc::After);
    let to = mapping.map_result(self.to, Assoc::Before);
    let gap_from = if self.from == self.gap_from {
      from.pos
    } else {
      mapping.map(self.gap_from, Assoc::Before)
    };
    let gap_to = if self.to == self.gap_to {
      to.pos
    } else {
      mapping.map(self.gap_to, Assoc::After)
    };
    if (from.deleted_across() && to.deleted_across()) || gap_from < from.pos || gap_to > to.pos {
      return None;
    }
    Some(
      ReplaceAroundStep::new(
        from.pos,
        to.pos,
        gap_from,
        gap_to,
        self.slice.clone(),
        self.insert,
        self.structure,
      )
      .into(),
    )
  }

  fn to_json(&self) -> Value {
    let mut json = Map::new();
    json.insert("stepType".into(), "replaceAround".into());
    json.insert("from".into(), self.from.into());
    json.insert("to".into(), self.to.into());
    json.insert("gapFrom".into(), self.gap_from.into());
    json.insert("gapTo".into(), self.gap_to.into());
    json.insert("insert".into(), self.insert.into());
    if let Some(slice) = self.slice.to_json() {
      json.insert("slice".into(), slice);
    }
    if self.structure {
      json.insert("structure".into(), true.into());
    }
    Value::Object(json)
  }
}

/// Whether `from..to` contains anything besides node boundaries.
fn content_between(doc: &Node, from: usize, to: usize) -> Result<bool, StepError> {
  let rp = doc.resolve(from)?;
  let mut dist = to.saturating_sub(from);
  let mut depth = rp.depth();
  while dist > 0 && depth > 0 && rp.index_after(depth) == rp.node(depth).child_count() {
    depth -= 1;
    dist -= 1;
  }
  if dist > 0 {
    let mut next = rp.node(depth).maybe_child(rp.index_after(depth));
    while dist > 0 {
      match next {
        Some(node) if !node.is_leaf() => {
          next = node.first_child();
          dist -= 1;
        },
        _ => return Ok(true),
      }
    }
  }
  Ok(false)
}

#[cfg(test)]
mod test {
  use serde_json::json;
  use the_model::{
    Fragment,
    test_utils::*,
  };

  use super::*;

  fn doc_of(text_content: &str) -> Node {
    doc([p([text(text_content)])])
  }

  #[test]
  fn inserts_and_inverts_text() {
    let doc = doc_of("hi");
    let step = ReplaceStep::new(1, 1, Slice::new(Fragment::from(text("X")), 0, 0));
    let after = step.apply(&doc).unwrap();
    assert_eq!(after, doc_of("Xhi"));
    let undo = step.invert(&doc);
    assert_eq!(undo.apply(&after).unwrap(), doc);
  }

  #[test]
  fn structure_steps_refuse_to_delete_content() {
    let doc = doc([p([text("a")]), p([text("b")])]);
    let join = ReplaceStep::structural(2, 4, Slice::empty());
    assert_eq!(join.apply(&doc).unwrap(), doc_of("ab"));
    let greedy = ReplaceStep::structural(1, 4, Slice::empty());
    assert_eq!(greedy.apply(&doc), Err(StepError::OverwritesContent));
  }

  #[test]
  fn maps_through_deletions() {
    let step = ReplaceStep::new(4, 6, Slice::empty());
    let before = StepMap::new(vec![MapRange::new(0, 0, 2)]);
    assert_eq!(step.map(&before), Some(ReplaceStep::new(6, 8, Slice::empty()).into()));
    let swallowed = StepMap::new(vec![MapRange::new(2, 8, 0)]);
    assert_eq!(step.map(&swallowed), None);
  }

  #[test]
  fn merges_adjacent_typing() {
    let a = ReplaceStep::new(1, 1, Slice::new(Fragment::from(text("a")), 0, 0));
    let b = ReplaceStep::new(2, 2, Slice::new(Fragment::from(text("b")), 0, 0));
    let merged = a.merge(&b.clone().into()).unwrap();
    assert_eq!(merged, ReplaceStep::new(1, 1, Slice::new(Fragment::from(text("ab")), 0, 0)).into());

    let back = ReplaceStep::new(2, 3, Slice::empty());
    let back2 = ReplaceStep::new(1, 2, Slice::empty());
    assert_eq!(back.merge(&back2.into()), Some(ReplaceStep::new(1, 3, Slice::empty()).into()));

    let far = ReplaceStep::new(9, 9, Slice::new(Fragment::from(text("c")), 0, 0));
    assert_eq!(a.merge(&far.into()), None);
  }

  #[test]
  fn wraps_with_replace_around() {
    let doc = doc([p([text("ab")])]);
    let quote = blockquote([p([])]).copy(Fragment::empty());
    let step = ReplaceAroundStep::new(0, 4, 0, 4, Slice::new(Fragment::from(quote), 0, 0), 1, true);
    let wrapped = step.apply(&doc).unwrap();
    assert_eq!(wrapped.to_string(), "doc(blockquote(paragraph(\"ab\")))");
    assert_eq!(step.get_map().map(2, Assoc::After), 3);

    let undo = step.invert(&doc);
    assert_eq!(undo.apply(&wrapped).unwrap(), doc);
  }

  #[test]
  fn replace_around_rejects_bad_gaps() {
    let doc = doc([p([text("ab")]), p([text("cd")])]);
    let quote = blockquote([p([])]).copy(Fragment::empty());
    let slice = Slice::new(Fragment::from(quote), 0, 0);
    let uneven = ReplaceAroundStep::new(0, 8, 2, 8, slice.clone(), 1, false);
    assert_eq!(uneven.apply(&doc), Err(StepError::GapNotFlat));

    let list = ul([li([p([])])]).copy(Fragment::empty());
    let mismatch = ReplaceAroundStep::new(0, 8, 0, 8, Slice::new(Fragment::from(list), 0, 0), 1, false);
    assert_eq!(mismatch.apply(&doc), Err(StepError::GapMismatch));
  }

  #[test]
  fn json_shape() {
    let step = ReplaceStep::structural(1, 3, Slice::empty());
    assert_eq!(step.to_json(), json!({ "stepType": "replace", "from": 1, "to": 3, "structure": true }));
    let around = ReplaceAroundStep::new(0, 4, 1, 3, Slice::empty(), 0, false);
    assert_eq!(
      around.to_json(),
      json!({ "stepType": "replaceAround", "from": 0, "to": 4, "gapFrom": 1, "gapTo": 3, "insert": 0 })
    );
  }
}
