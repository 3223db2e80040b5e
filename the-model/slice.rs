//! Slices: fragments that may be open at either end.

use std::fmt;

use serde::{
  Serialize,
  Serializer,
};
use serde_json::Value;

use crate::{
  error::{
    ContentError,
    ReplaceError,
  },
  fragment::Fragment,
  json::SliceJson,
  node::Node,
  schema::Schema,
};

/// A piece of a document. `open_start` and `open_end` count how many
/// levels of nodes at the start and end of the content were cut through,
/// and so will be joined with the surrounding content when the slice is
/// inserted.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Slice {
  pub(crate) content:    Fragment,
  pub(crate) open_start: usize,
  pub(crate) open_end:   usize,
}

impl Slice {
  pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
    Self {
      content,
      open_start,
      open_end,
    }
  }

  pub fn empty() -> Self {
    Self::default()
  }

  pub fn content(&self) -> &Fragment {
    &self.content
  }

  pub fn open_start(&self) -> usize {
    self.open_start
  }

  pub fn open_end(&self) -> usize {
    self.open_end
  }

  /// The number of positions the slice adds when inserted.
  pub fn size(&self) -> usize {
    self.content.size() - self.open_start - self.open_end
  }

  /// Insert `fragment` at `pos` (relative to the slice's open start), or
  /// `None` when it isn't valid content there.
  pub fn insert_at(&self, pos: usize, fragment: &Fragment) -> Option<Slice> {
    let content = insert_into(&self.content, pos + self.open_start, fragment, None)?;
    Some(Slice::new(content, self.open_start, self.open_end))
  }

  /// Remove the range `from..to`, which must not cross node boundaries.
  pub fn remove_between(&self, from: usize, to: usize) -> Result<Slice, ReplaceError> {
    let content = remove_range(&self.content, from + self.open_start, to + self.open_start)?;
    Ok(Slice::new(content, self.open_start, self.open_end))
  }

  /// A slice of `fragment` opened as deep as possible at both ends. Nodes
  /// marked isolating are not opened unless `open_isolating` is set.
  pub fn max_open(fragment: Fragment, open_isolating: bool) -> Slice {
    let opens = |node: &Node| !node.is_leaf() && (open_isolating || !node.ty().is_isolating());
    let mut open_start = 0;
    let mut node = fragment.first_child();
    while let Some(n) = node.filter(|n| opens(n)) {
      open_start += 1;
      node = n.first_child();
    }
    let mut open_end = 0;
    let mut node = fragment.last_child();
    while let Some(n) = node.filter(|n| opens(n)) {
      open_end += 1;
      node = n.last_child();
    }
    Slice::new(fragment, open_start, open_end)
  }

  pub fn to_json(&self) -> Option<Value> {
    let content = self.content.to_json()?;
    let mut obj = serde_json::Map::new();
    obj.insert("content".into(), content);
    if self.open_start > 0 {
      obj.insert("openStart".into(), Value::from(self.open_start));
    }
    if self.open_end > 0 {
      obj.insert("openEnd".into(), Value::from(self.open_end));
    }
    Some(Value::Object(obj))
  }

  pub fn from_json(schema: &Schema, json: Option<&Value>) -> Result<Slice, ContentError> {
    match json {
      None | Some(Value::Null) => Ok(Slice::empty()),
      Some(json) => SliceJson::from_value(json)?.into_slice(schema),
    }
  }
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> Result<Fragment, ReplaceError> {
  let (index, offset) = content.find_index(from);
  let child = content.maybe_child(index);
  let (index_to, offset_to) = content.find_index(to);
  match child {
    Some(child) if offset != from && !child.is_text() => {
      if index != index_to {
        return Err(ReplaceError::NonFlatRange);
      }
      let inner = remove_range(child.content(), from - offset - 1, to - offset - 1)?;
      Ok(content.replace_child(index, child.copy(inner)))
    },
    _ => {
      if offset_to != to && !content.child(index_to).is_text() {
        return Err(ReplaceError::NonFlatRange);
      }
      Ok(content.cut(0, from).append(&content.cut(to, content.size())))
    },
  }
}

fn insert_into(content: &Fragment, dist: usize, insert: &Fragment, parent: Option<&Node>) -> Option<Fragment> {
  let (index, offset) = content.find_index(dist);
  match content.maybe_child(index) {
    Some(child) if offset != dist && !child.is_text() => {
      let inner = insert_into(child.content(), dist - offset - 1, insert, Some(child))?;
      Some(content.replace_child(index, child.copy(inner)))
    },
    _ => {
      if parent.is_some_and(|parent| !parent.can_replace(index, index, insert)) {
        return None;
      }
      Some(
        content
          .cut(0, dist)
          .append(insert)
          .append(&content.cut(dist, content.size())),
      )
    },
  }
}

impl Serialize for Slice {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.to_json().serialize(serializer)
  }
}

impl fmt::Display for Slice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({},{})", self.content, self.open_start, self.open_end)
  }
}

impl fmt::Debug for Slice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

#[cfg(test)]
mod test {
  use serde_json::json;

  use super::*;
  use crate::test_utils::*;

  #[test]
  fn size_excludes_open_boundaries() {
    let doc = doc([p([text("abc")]), p([text("def")])]);
    let slice = doc.slice(2, 7, false).unwrap();
    assert_eq!((slice.open_start(), slice.open_end()), (1, 1));
    assert_eq!(slice.size(), 5);
    assert_eq!(slice.to_string(), "<paragraph(\"bc\"), paragraph(\"d\")>(1,1)");
  }

  #[test]
  fn max_open_respects_isolating() {
    let frag = Fragment::from_vec(vec![blockquote([p([text("a")])]), p([text("b")])]);
    let slice = Slice::max_open(frag.clone(), true);
    assert_eq!((slice.open_start(), slice.open_end()), (2, 1));

    let leafy = Fragment::from_vec(vec![hr()]);
    let slice = Slice::max_open(leafy, false);
    assert_eq!((slice.open_start(), slice.open_end()), (0, 0));
  }

  #[test]
  fn insert_and_remove() {
    let slice = Slice::new(Fragment::from_vec(vec![p([text("ab")]), p([text("cd")])]), 1, 1);
    let inserted = slice.insert_at(1, &Fragment::from(text("X"))).unwrap();
    assert_eq!(inserted.content().to_string(), "<paragraph(\"aXb\"), paragraph(\"cd\")>");
    assert!(slice.insert_at(1, &Fragment::from(p([]))).is_none());

    let removed = slice.remove_between(0, 1).unwrap();
    assert_eq!(removed.content().to_string(), "<paragraph(\"b\"), paragraph(\"cd\")>");
    assert_eq!(slice.remove_between(1, 4), Err(ReplaceError::NonFlatRange));
  }

  #[test]
  fn json_omits_defaults() {
    assert_eq!(Slice::empty().to_json(), None);
    let slice = Slice::new(Fragment::from(p([text("x")])), 1, 0);
    let json = slice.to_json().unwrap();
    assert_eq!(json, json!({ "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "x" }] }], "openStart": 1 }));
    assert_eq!(Slice::from_json(schema(), Some(&json)).unwrap(), slice);
    assert_eq!(Slice::from_json(schema(), None).unwrap(), Slice::empty());
    assert!(Slice::from_json(schema(), Some(&json!({ "openStart": "x" }))).is_err());
  }
}
