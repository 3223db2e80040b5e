//! Adding and removing inline marks over a range, and clearing content a
//! new parent type would not accept.

use the_model::{
  ContentMatch,
  Fragment,
  Mark,
  MarkType,
  NodeType,
  Slice,
  Whitespace,
};

use crate::{
  error::{
    Result,
    TransformError,
  },
  mark_step::{
    AddMarkStep,
    RemoveMarkStep,
  },
  replace_step::ReplaceStep,
  structure::newlines,
  transform::Transform,
};

/// Which marks [`Transform::remove_mark`] takes off.
#[derive(Debug, Clone)]
pub enum MarkFilter {
  /// This exact mark.
  Mark(Mark),
  /// Every mark of this type.
  Type(MarkType),
  All,
}

impl From<Mark> for MarkFilter {
  fn from(mark: Mark) -> Self {
    MarkFilter::Mark(mark)
  }
}

impl From<MarkType> for MarkFilter {
  fn from(ty: MarkType) -> Self {
    MarkFilter::Type(ty)
  }
}

impl MarkFilter {
  fn matching(&self, marks: &[Mark]) -> Vec<Mark> {
    match self {
      MarkFilter::Mark(mark) if mark.is_in_set(marks) => vec![mark.clone()],
      MarkFilter::Mark(_) => Vec::new(),
      MarkFilter::Type(ty) => marks.iter().filter(|mark| mark.ty() == ty).cloned().collect(),
      MarkFilter::All => marks.to_vec(),
    }
  }
}

struct PendingRemoval {
  mark:  Mark,
  from:  usize,
  to:    usize,
  /// Index of the last inline node the removal covered.
  visit: usize,
}

impl Transform {
  /// Add `mark` to the inline content between `from` and `to`. Marks the
  /// new mark excludes are removed first.
  pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<&mut Self> {
    let mut removed: Vec<RemoveMarkStep> = Vec::new();
    let mut added: Vec<AddMarkStep> = Vec::new();
    let mut removing: Option<usize> = None;
    self.doc().nodes_between(from, to, |node, pos, parent, _| {
      if !node.is_inline() {
        return true;
      }
      let allowed = parent.is_some_and(|parent| parent.ty().allows_mark_type(mark.ty()));
      if mark.is_in_set(node.marks()) || !allowed {
        return true;
      }
      let start = pos.max(from);
      let end = (pos + node.node_size()).min(to);
      let new_set = mark.add_to_set(node.marks());
      for old in node.marks().iter().filter(|old| !old.is_in_set(&new_set)) {
        match removing {
          Some(i) if removed[i].to == start && &removed[i].mark == old => removed[i].to = end,
          _ => {
            removing = Some(removed.len());
            removed.push(RemoveMarkStep::new(start, end, old.clone()));
          },
        }
      }
      match added.last_mut() {
        Some(step) if step.to == start => step.to = end,
        _ => added.push(AddMarkStep::new(start, end, mark.clone())),
      }
      true
    });
    for step in removed {
      self.step(step)?;
    }
    for step in added {
      self.step(step)?;
    }
    Ok(self)
  }

  /// Remove the marks selected by `filter` from the inline content between
  /// `from` and `to`.
  pub fn remove_mark(&mut self, from: usize, to: usize, filter: impl Into<MarkFilter>) -> Result<&mut Self> {
    let filter = filter.into();
    let mut matched: Vec<PendingRemoval> = Vec::new();
    let mut visit = 0;
    self.doc().nodes_between(from, to, |node, pos, _, _| {
      if !node.is_inline() {
        return true;
      }
      visit += 1;
      let end = (pos + node.node_size()).min(to);
      for mark in filter.matching(node.marks()) {
        let previous = matched
          .iter_mut()
          .rev()
          .find(|pending| pending.visit + 1 == visit && pending.mark == mark);
        match previous {
          Some(pending) => {
            pending.to = end;
            pending.visit = visit;
          },
          None => {
            matched.push(PendingRemoval {
              mark,
              from: pos.max(from),
              to: end,
              visit,
            })
          },
        }
      }
      true
    });
    for pending in matched {
      self.step(RemoveMarkStep::new(pending.from, pending.to, pending.mark))?;
    }
    Ok(self)
  }

  /// Make the children of the node at `pos` fit in a node of `parent_type`,
  /// starting from `matched` (the type's start state by default): drop
  /// children it doesn't accept, strip marks it doesn't allow, fill in
  /// required content at the end, and, when `clear_newlines` is set and the
  /// type doesn't preserve whitespace, turn line breaks into spaces.
  pub fn clear_incompatible(
    &mut self,
    pos: usize,
    parent_type: &NodeType,
    matched: Option<ContentMatch>,
    clear_newlines: bool,
  ) -> Result<&mut Self> {
    let node = self
      .doc()
      .node_at(pos)
      .cloned()
      .ok_or(TransformError::NoNode { pos })?;
    let mut matched = matched.unwrap_or_else(|| parent_type.content_match());
    let mut replacements = Vec::new();
    let mut cur = pos + 1;
    for child in node.content() {
      let end = cur + child.node_size();
      match matched.match_type(child.ty()) {
        None => replacements.push(ReplaceStep::new(cur, end, Slice::empty())),
        Some(next) => {
          matched = next;
          for mark in child.marks() {
            if !parent_type.allows_mark_type(mark.ty()) {
              self.step(RemoveMarkStep::new(cur, end, mark.clone()))?;
            }
          }
          if let Some(text) = child.text().filter(|_| clear_newlines && parent_type.whitespace() != Whitespace::Pre) {
            let space = parent_type
              .schema()
              .text(" ", &parent_type.allowed_marks(child.marks()));
            let slice = Slice::new(Fragment::from(space), 0, 0);
            for (offset, len) in newlines(text) {
              replacements.push(ReplaceStep::new(cur + offset, cur + offset + len, slice.clone()));
            }
          }
        },
      }
      cur = end;
    }
    if !matched.valid_end() {
      if let Some(fill) = matched.fill_before(&Fragment::empty(), true, 0) {
        self.replace(cur, cur, &Slice::new(fill, 0, 0))?;
      }
    }
    for step in replacements.into_iter().rev() {
      self.step(step)?;
    }
    Ok(self)
  }
}

#[cfg(test)]
mod test {
  use the_model::test_utils::*;

  use super::*;

  fn mark_type(name: &str) -> MarkType {
    schema().mark_type(name).unwrap()
  }

  fn node_type(name: &str) -> NodeType {
    schema().node_type(name).unwrap()
  }

  #[test]
  fn adds_a_mark_to_part_of_a_text() {
    let mut tr = Transform::new(doc([p([text("hello")])]));
    tr.add_mark(2, 4, mark("strong")).unwrap();
    assert_eq!(
      tr.doc().to_string(),
      "doc(paragraph(\"h\", strong(\"el\"), \"lo\"))"
    );
  }

  #[test]
  fn adjacent_nodes_share_one_step() {
    let mut tr = Transform::new(doc([p([text("a"), em("b"), text("c")])]));
    tr.add_mark(1, 4, mark("strong")).unwrap();
    assert_eq!(tr.steps().len(), 1);
    assert_eq!(
      tr.doc().to_string(),
      "doc(paragraph(strong(\"a\"), strong(em(\"b\")), strong(\"c\")))"
    );
  }

  #[test]
  fn excluded_marks_are_removed_first() {
    let mut tr = Transform::new(doc([p([em("ab")])]));
    tr.add_mark(1, 3, mark("code")).unwrap();
    assert_eq!(tr.steps().len(), 2);
    assert_eq!(tr.steps()[0].step_type(), "removeMark");
    assert_eq!(tr.doc().to_string(), "doc(paragraph(code(\"ab\")))");
  }

  #[test]
  fn skips_parents_that_disallow_the_mark() {
    let mut tr = Transform::new(doc([pre([text("ab")])]));
    tr.add_mark(1, 3, mark("strong")).unwrap();
    assert!(!tr.doc_changed());
  }

  #[test]
  fn removes_marks_by_type() {
    let start = doc([p([
      marked("ab", &[link("https://a.example")]),
      marked("cd", &[link("https://b.example")]),
    ])]);
    let mut tr = Transform::new(start);
    tr.remove_mark(1, 5, mark_type("link")).unwrap();
    assert_eq!(tr.steps().len(), 2);
    assert_eq!(tr.doc().to_string(), "doc(paragraph(\"abcd\"))");
  }

  #[test]
  fn removes_every_mark() {
    let mut tr = Transform::new(doc([p([marked("ab", &[mark("em"), mark("strong")])])]));
    tr.remove_mark(1, 3, MarkFilter::All).unwrap();
    assert_eq!(tr.steps().len(), 2);
    assert_eq!(tr.doc().to_string(), "doc(paragraph(\"ab\"))");
  }

  #[test]
  fn removal_spans_adjacent_nodes() {
    let mut tr = Transform::new(doc([p([
      em("a"),
      marked("b", &[mark("em"), mark("strong")]),
    ])]));
    tr.remove_mark(1, 3, mark("em")).unwrap();
    assert_eq!(tr.steps().len(), 1);
    assert_eq!(tr.doc().to_string(), "doc(paragraph(\"a\", strong(\"b\")))");

    tr.remove_mark(1, 3, mark("em")).unwrap();
    assert_eq!(tr.steps().len(), 1);
  }

  #[test]
  fn clears_nodes_and_marks_a_type_rejects() {
    let mut tr = Transform::new(doc([p([strong("a"), img(), text("b\nc")])]));
    tr.clear_incompatible(0, &node_type("code_block"), None, true)
      .unwrap();
    assert_eq!(tr.doc().to_string(), "doc(paragraph(\"ab\\nc\"))");
  }

  #[test]
  fn turns_newlines_into_spaces() {
    let mut tr = Transform::new(doc([p([text("a\nb")])]));
    tr.clear_incompatible(0, &node_type("heading"), None, false)
      .unwrap();
    assert!(!tr.doc_changed());
    tr.clear_incompatible(0, &node_type("heading"), None, true)
      .unwrap();
    assert_eq!(tr.doc().to_string(), "doc(paragraph(\"a b\"))");
  }

  #[test]
  fn fills_required_content() {
    let mut tr = Transform::new(doc([blockquote([hr()])]));
    tr.clear_incompatible(0, &node_type("list_item"), None, true)
      .unwrap();
    assert_eq!(tr.doc().to_string(), "doc(blockquote(paragraph))");
    assert!(matches!(
      tr.clear_incompatible(40, &node_type("list_item"), None, true),
      Err(TransformError::NoNode { pos: 40 })
    ));
  }
}
