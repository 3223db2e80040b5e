//! Document nodes.
//!
//! A [`Node`] is a cheap, reference counted handle. Text nodes carry their
//! text and count one position per `char`; other leaves count one position;
//! every other node counts two positions for its boundaries plus the size
//! of its content.

use std::{
  fmt,
  sync::Arc,
};

use serde::{
  Serialize,
  Serializer,
};
use serde_json::Value;

use crate::{
  Attrs,
  Tendril,
  content::ContentMatch,
  error::{
    ContentError,
    RangeError,
    ReplaceError,
  },
  fragment::Fragment,
  json::NodeJson,
  mark::{
    Mark,
    MarkSet,
  },
  replace,
  resolved_pos::ResolvedPos,
  schema::{
    MarkType,
    NodeType,
    Schema,
  },
  slice::Slice,
};

/// Slice `text` by `char` offsets, clamping both ends to its length.
pub(crate) fn char_slice(text: &str, from: usize, to: usize) -> &str {
  if text.is_ascii() {
    let end = to.min(text.len());
    return &text[from.min(end)..end];
  }
  let mut indices = text
    .char_indices()
    .map(|(i, _)| i)
    .chain(std::iter::once(text.len()));
  let start = indices.nth(from).unwrap_or(text.len());
  let end = if to > from {
    indices.nth(to - from - 1).unwrap_or(text.len())
  } else {
    start
  };
  &text[start..end]
}

struct NodeInner {
  ty:       NodeType,
  attrs:    Attrs,
  content:  Fragment,
  marks:    MarkSet,
  text:     Option<Tendril>,
  text_len: usize,
}

/// A child lookup result: the child (if any), its index and its offset in
/// the parent's content.
#[derive(Debug, Clone, Copy)]
pub struct ChildInfo<'a> {
  pub node:   Option<&'a Node>,
  pub index:  usize,
  pub offset: usize,
}

#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

impl Node {
  pub(crate) fn new(ty: NodeType, attrs: Attrs, content: Fragment, marks: MarkSet) -> Self {
    Self(Arc::new(NodeInner {
      ty,
      attrs,
      content,
      marks,
      text: None,
      text_len: 0,
    }))
  }

  /// # Panics
  ///
  /// Panics when `text` is empty.
  pub(crate) fn new_text(ty: NodeType, text: Tendril, marks: MarkSet) -> Self {
    assert!(!text.is_empty(), "empty text nodes are not allowed");
    let text_len = text.chars().count();
    Self(Arc::new(NodeInner {
      ty,
      attrs: Attrs::new(),
      content: Fragment::empty(),
      marks,
      text: Some(text),
      text_len,
    }))
  }

  pub fn ty(&self) -> &NodeType {
    &self.0.ty
  }

  pub fn attrs(&self) -> &Attrs {
    &self.0.attrs
  }

  pub fn content(&self) -> &Fragment {
    &self.0.content
  }

  pub fn marks(&self) -> &[Mark] {
    &self.0.marks
  }

  /// The text of a text node.
  pub fn text(&self) -> Option<&str> {
    self.0.text.as_deref()
  }

  /// Length of a text node's text in `char`s, zero for other nodes.
  pub fn text_len(&self) -> usize {
    self.0.text_len
  }

  pub fn node_size(&self) -> usize {
    if self.0.text.is_some() {
      self.0.text_len
    } else if self.is_leaf() {
      1
    } else {
      2 + self.0.content.size()
    }
  }

  pub fn child_count(&self) -> usize {
    self.0.content.child_count()
  }

  /// # Panics
  ///
  /// Panics when `index` is out of range.
  pub fn child(&self, index: usize) -> &Node {
    self.0.content.child(index)
  }

  pub fn maybe_child(&self, index: usize) -> Option<&Node> {
    self.0.content.maybe_child(index)
  }

  pub fn first_child(&self) -> Option<&Node> {
    self.0.content.first_child()
  }

  pub fn last_child(&self) -> Option<&Node> {
    self.0.content.last_child()
  }

  pub fn for_each(&self, f: impl FnMut(&Node, usize, usize)) {
    self.0.content.for_each(f)
  }

  pub fn is_block(&self) -> bool {
    self.ty().is_block()
  }

  pub fn is_inline(&self) -> bool {
    self.ty().is_inline()
  }

  pub fn is_text(&self) -> bool {
    self.0.text.is_some()
  }

  pub fn is_textblock(&self) -> bool {
    self.ty().is_textblock()
  }

  pub fn inline_content(&self) -> bool {
    self.ty().inline_content()
  }

  pub fn is_leaf(&self) -> bool {
    self.ty().is_leaf()
  }

  pub fn is_atom(&self) -> bool {
    self.ty().is_atom()
  }

  /// Whether both handles point at the same allocation.
  pub fn ptr_eq(&self, other: &Node) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }

  /// Invoke `f` for every descendant overlapping `from..to` (relative to the
  /// start of this node's content).
  pub fn nodes_between<F>(&self, from: usize, to: usize, mut f: F)
  where
    F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
  {
    self.0.content.nodes_between_inner(from, to, &mut f, 0, Some(self));
  }

  pub fn descendants<F>(&self, f: F)
  where
    F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
  {
    self.nodes_between(0, self.0.content.size(), f);
  }

  pub fn text_content(&self) -> String {
    match self.text() {
      Some(text) => text.to_string(),
      None => self.0.content.text_between(0, self.0.content.size(), Some(""), None),
    }
  }

  pub fn text_between(&self, from: usize, to: usize, block_separator: Option<&str>, leaf_text: Option<&str>) -> String {
    match self.text() {
      Some(text) => char_slice(text, from, to).to_string(),
      None => self.0.content.text_between(from, to, block_separator, leaf_text),
    }
  }

  /// Whether `other` has the same type, attributes and marks.
  pub fn same_markup(&self, other: &Node) -> bool {
    self.has_markup(other.ty(), Some(other.attrs()), other.marks())
  }

  pub fn has_markup(&self, ty: &NodeType, attrs: Option<&Attrs>, marks: &[Mark]) -> bool {
    let empty = Attrs::new();
    let attrs = attrs.or(ty.default_attrs()).unwrap_or(&empty);
    self.ty() == ty && self.attrs() == attrs && Mark::same_set(self.marks(), marks)
  }

  /// A node with the same markup and the given content.
  pub fn copy(&self, content: Fragment) -> Node {
    if self.is_text() || content.ptr_eq(&self.0.content) {
      return self.clone();
    }
    Node::new(self.ty().clone(), self.attrs().clone(), content, self.0.marks.clone())
  }

  /// A copy of this node with the given marks.
  pub fn mark(&self, marks: &[Mark]) -> Node {
    if Mark::same_set(marks, self.marks()) {
      return self.clone();
    }
    let marks: MarkSet = marks.iter().cloned().collect();
    match &self.0.text {
      Some(text) => Node::new_text(self.ty().clone(), text.clone(), marks),
      None => Node::new(self.ty().clone(), self.attrs().clone(), self.0.content.clone(), marks),
    }
  }

  /// A text node with the same marks and the given text.
  ///
  /// # Panics
  ///
  /// Panics when called on a non-text node or with empty text.
  pub fn with_text(&self, text: &str) -> Node {
    assert!(self.is_text(), "with_text called on {}", self.ty().name());
    if self.text() == Some(text) {
      return self.clone();
    }
    Node::new_text(self.ty().clone(), text.into(), self.0.marks.clone())
  }

  /// A copy holding only the content between `from` and `to`.
  pub fn cut(&self, from: usize, to: usize) -> Node {
    match self.text() {
      Some(text) => {
        if from == 0 && to >= self.0.text_len {
          return self.clone();
        }
        self.with_text(char_slice(text, from, to))
      },
      None => {
        if from == 0 && to == self.0.content.size() {
          return self.clone();
        }
        self.copy(self.0.content.cut(from, to))
      },
    }
  }

  /// The slice of this node's content between `from` and `to`. When
  /// `include_parents` is set, the slice is opened all the way up to this
  /// node.
  pub fn slice(&self, from: usize, to: usize, include_parents: bool) -> Result<Slice, RangeError> {
    if from == to {
      return Ok(Slice::empty());
    }
    if from > to {
      return Err(RangeError::Inverted { from, to });
    }
    let start_pos = self.resolve(from)?;
    let end_pos = self.resolve(to)?;
    let depth = if include_parents {
      0
    } else {
      start_pos.shared_depth(to)
    };
    let start = start_pos.start(depth);
    let node = start_pos.node(depth);
    let content = node.content().cut(start_pos.pos() - start, end_pos.pos() - start);
    Ok(Slice::new(content, start_pos.depth() - depth, end_pos.depth() - depth))
  }

  /// Replace the range `from..to` with `slice`, which must fit the open
  /// nodes around the range.
  pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ReplaceError> {
    if from > to {
      return Err(RangeError::Inverted { from, to }.into());
    }
    replace::replace(&self.resolve(from)?, &self.resolve(to)?, slice)
  }

  /// The node directly after `pos`, if any.
  pub fn node_at(&self, pos: usize) -> Option<&Node> {
    if pos > self.0.content.size() {
      return None;
    }
    let mut node = self;
    let mut pos = pos;
    loop {
      let (index, offset) = node.content().find_index(pos);
      node = node.maybe_child(index)?;
      if offset == pos || node.is_text() {
        return Some(node);
      }
      pos -= offset + 1;
    }
  }

  /// The direct child starting at or containing `pos`.
  ///
  /// # Panics
  ///
  /// Panics when `pos` lies outside the content.
  pub fn child_after(&self, pos: usize) -> ChildInfo<'_> {
    let (index, offset) = self.0.content.find_index(pos);
    ChildInfo {
      node: self.maybe_child(index),
      index,
      offset,
    }
  }

  /// The direct child ending at or containing `pos`.
  ///
  /// # Panics
  ///
  /// Panics when `pos` lies outside the content.
  pub fn child_before(&self, pos: usize) -> ChildInfo<'_> {
    if pos == 0 {
      return ChildInfo {
        node:   None,
        index:  0,
        offset: 0,
      };
    }
    let (index, offset) = self.0.content.find_index(pos);
    if offset < pos {
      return ChildInfo {
        node: Some(self.child(index)),
        index,
        offset,
      };
    }
    let node = self.child(index - 1);
    ChildInfo {
      node: Some(node),
      index: index - 1,
      offset: offset - node.node_size(),
    }
  }

  /// Whether any node in `from..to` carries a mark of type `ty`.
  pub fn range_has_mark(&self, from: usize, to: usize, ty: &MarkType) -> bool {
    let mut found = false;
    if to > from {
      self.nodes_between(from, to, |node, _, _, _| {
        if ty.is_in_set(node.marks()).is_some() {
          found = true;
        }
        !found
      });
    }
    found
  }

  /// Resolve `pos` in this node.
  pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, RangeError> {
    ResolvedPos::resolve(self, pos)
  }

  /// The content match state after the first `index` children, or `None`
  /// when those children are not valid content.
  pub fn content_match_at(&self, index: usize) -> Option<ContentMatch> {
    self
      .ty()
      .content_match()
      .match_fragment_range(&self.0.content, 0, index)
  }

  /// Whether replacing the children `from..to` (by index) with
  /// `replacement` yields valid content.
  pub fn can_replace(&self, from: usize, to: usize, replacement: &Fragment) -> bool {
    self.can_replace_range(from, to, replacement, 0, replacement.child_count())
  }

  /// Like [`Node::can_replace`], using only the children `start..end` of
  /// `replacement`.
  pub fn can_replace_range(&self, from: usize, to: usize, replacement: &Fragment, start: usize, end: usize) -> bool {
    let Some(one) = self
      .content_match_at(from)
      .and_then(|m| m.match_fragment_range(replacement, start, end))
    else {
      return false;
    };
    let Some(two) = one.match_fragment_range(&self.0.content, to, self.child_count()) else {
      return false;
    };
    two.valid_end()
      && replacement.children()[start..end]
        .iter()
        .all(|child| self.ty().allows_marks(child.marks()))
  }

  /// Whether replacing the children `from..to` with a node of type `ty`
  /// yields valid content.
  pub fn can_replace_with(&self, from: usize, to: usize, ty: &NodeType, marks: Option<&[Mark]>) -> bool {
    if marks.is_some_and(|marks| !self.ty().allows_marks(marks)) {
      return false;
    }
    self
      .content_match_at(from)
      .and_then(|m| m.match_type(ty))
      .and_then(|m| m.match_fragment_range(&self.0.content, to, self.child_count()))
      .is_some_and(|m| m.valid_end())
  }

  /// Whether `other`'s content can be appended to this node's content.
  pub fn can_append(&self, other: &Node) -> bool {
    if other.content().size() > 0 {
      let count = self.child_count();
      self.can_replace(count, count, other.content())
    } else {
      self.ty().compatible_content(other.ty())
    }
  }

  /// Check this node and all its descendants against the schema.
  pub fn check(&self) -> Result<(), ContentError> {
    self.ty().check_content(&self.0.content)?;
    self.ty().check_attrs(self.attrs())?;
    let mut copy = MarkSet::new();
    for mark in self.marks() {
      mark.ty().check_attrs(mark.attrs())?;
      copy = mark.add_to_set(&copy);
    }
    if !Mark::same_set(&copy, self.marks()) {
      return Err(ContentError::InvalidMarks {
        node:  self.ty().name().to_string(),
        marks: self
          .marks()
          .iter()
          .map(|m| m.ty().name())
          .collect::<Vec<_>>()
          .join(","),
      });
    }
    self.0.content.iter().try_for_each(Node::check)
  }

  pub fn to_json(&self) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("type".into(), Value::String(self.ty().name().to_string()));
    if !self.attrs().is_empty() {
      obj.insert("attrs".into(), Value::Object(self.attrs().clone()));
    }
    if let Some(content) = self.0.content.to_json() {
      obj.insert("content".into(), content);
    }
    if !self.marks().is_empty() {
      obj.insert(
        "marks".into(),
        Value::Array(self.marks().iter().map(Mark::to_json).collect()),
      );
    }
    if let Some(text) = self.text() {
      obj.insert("text".into(), Value::String(text.to_string()));
    }
    Value::Object(obj)
  }

  pub fn from_json(schema: &Schema, json: &Value) -> Result<Node, ContentError> {
    NodeJson::from_value(json)?.into_node(schema)
  }
}

impl PartialEq for Node {
  fn eq(&self, other: &Self) -> bool {
    self.ptr_eq(other)
      || (self.same_markup(other) && self.text() == other.text() && self.content() == other.content())
  }
}

impl Eq for Node {}

impl Serialize for Node {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.to_json().serialize(serializer)
  }
}

impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for mark in self.marks().iter().rev() {
      write!(f, "{}(", mark.ty().name())?;
    }
    match self.text() {
      Some(text) => write!(f, "{text:?}")?,
      None => {
        f.write_str(self.ty().name())?;
        if self.0.content.size() > 0 {
          f.write_str("(")?;
          self.0.content.fmt_inner(f)?;
          f.write_str(")")?;
        }
      },
    }
    for _ in self.marks() {
      f.write_str(")")?;
    }
    Ok(())
  }
}

impl fmt::Debug for Node {
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
  fn sizes_count_chars_and_boundaries() {
    let doc = doc([p([text("héllo")]), hr(), p([])]);
    assert_eq!(doc.child(0).node_size(), 7);
    assert_eq!(doc.child(1).node_size(), 1);
    assert_eq!(doc.child(2).node_size(), 2);
    assert_eq!(doc.content().size(), 10);
    assert_eq!(doc.node_size(), 12);
  }

  #[test]
  fn displays_as_nested_calls() {
    let doc = doc([p([text("hi "), strong("there")]), blockquote([p([])])]);
    assert_eq!(
      doc.to_string(),
      "doc(paragraph(\"hi \", strong(\"there\")), blockquote(paragraph))"
    );
  }

  #[test]
  fn cut_and_slice_text() {
    let doc = doc([p([text("hello"), em("world")])]);
    assert_eq!(doc.cut(3, 9).to_string(), "doc(paragraph(\"llo\", em(\"wor\")))");
    let slice = doc.slice(3, 9, false).unwrap();
    assert_eq!(slice.content().to_string(), "<\"llo\", em(\"wor\")>");
    assert_eq!(slice.size(), 6);
    let slice = doc.slice(3, 9, true).unwrap();
    assert_eq!((slice.open_start(), slice.open_end()), (1, 1));
    assert_eq!(doc.slice(0, doc.content().size(), false).unwrap().size(), doc.content().size());
    assert!(doc.slice(50, 60, false).is_err());
  }

  #[test]
  fn node_at_and_children() {
    let doc = doc([p([text("ab")]), blockquote([p([img()])])]);
    assert_eq!(doc.node_at(0).unwrap().ty().name(), "paragraph");
    assert_eq!(doc.node_at(1).unwrap().text(), Some("ab"));
    assert_eq!(doc.node_at(2).unwrap().text(), Some("ab"));
    assert_eq!(doc.node_at(4).unwrap().ty().name(), "blockquote");
    assert_eq!(doc.node_at(6).unwrap().ty().name(), "image");
    assert!(doc.node_at(3).is_none());
    assert!(doc.node_at(100).is_none());

    let after = doc.child_after(4);
    assert_eq!((after.index, after.offset), (1, 4));
    let before = doc.child_before(4);
    assert_eq!((before.index, before.offset), (0, 0));
    assert!(doc.child_before(0).node.is_none());
  }

  #[test]
  fn range_has_mark_and_text() {
    let doc = doc([p([text("ab"), em("cd"), text("ef")])]);
    let em = schema().mark_type("em").unwrap();
    assert!(doc.range_has_mark(2, 4, &em));
    assert!(!doc.range_has_mark(1, 3, &em));
    assert!(!doc.range_has_mark(5, 7, &em));
    assert_eq!(doc.text_content(), "abcdef");
    assert_eq!(doc.text_between(2, 6, None, None), "bcde");
  }

  #[test]
  fn replace_queries() {
    let doc = doc([p([text("a")]), hr()]);
    let paragraph = schema().node_type("paragraph").unwrap();
    let text_type = schema().text_type();
    assert!(doc.can_replace_with(1, 1, &paragraph, None));
    assert!(!doc.can_replace_with(0, 2, &text_type, None));
    assert!(!doc.can_replace(0, 2, &Fragment::empty()));
    assert!(doc.can_replace(0, 1, &Fragment::empty()));
    assert!(doc.can_append(&doc));
    assert!(doc.content_match_at(2).unwrap().valid_end());
  }

  #[test]
  fn check_reports_invalid_trees() {
    let valid = doc([p([text("x")])]);
    assert!(valid.check().is_ok());

    let doc_type = schema().top_node_type();
    let bogus = doc_type
      .create(None, Fragment::from(schema().text("loose", &[])), &[])
      .unwrap();
    assert!(matches!(bogus.check(), Err(ContentError::InvalidContent { .. })));

    let code = schema().node_type("code_block").unwrap();
    let marked = code
      .create(None, Fragment::from(em("x")), &[])
      .unwrap();
    assert!(marked.check().is_err());
  }

  #[test]
  fn same_markup_and_equality() {
    let a = doc([h1([text("x")])]);
    let b = doc([h1([text("x")])]);
    let c = doc([h2([text("x")])]);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(a.child(0).same_markup(b.child(0)));
    assert!(!a.child(0).same_markup(c.child(0)));
    let heading = schema().node_type("heading").unwrap();
    assert!(a.child(0).has_markup(&heading, Some(&json!({ "level": 1 }).as_object().unwrap().clone()), &[]));
  }

  #[test]
  fn json_round_trip() {
    let doc = doc([p([text("a"), marked("b", &[link("x")])]), h2([text("c")]), pre([text("d\ne")])]);
    let json = doc.to_json();
    assert_eq!(json["content"][0]["content"][1]["marks"][0]["type"], json!("link"));
    assert_eq!(json["content"][1]["attrs"]["level"], json!(2));
    let back = Node::from_json(schema(), &json).unwrap();
    assert_eq!(back, doc);
    assert_eq!(serde_json::to_value(&doc).unwrap(), json);
  }

  #[test]
  fn from_json_rejects_bad_input() {
    let schema = schema();
    let err = Node::from_json(schema, &json!({ "type": "nope" })).unwrap_err();
    assert_eq!(err, ContentError::UnknownNodeType("nope".into()));
    let err = Node::from_json(schema, &json!({ "type": "text", "text": "" })).unwrap_err();
    assert_eq!(err, ContentError::EmptyText);
    let err = Node::from_json(schema, &json!({ "content": [] })).unwrap_err();
    assert!(matches!(err, ContentError::InvalidJson { .. }));
  }

  #[test]
  #[should_panic(expected = "empty text nodes are not allowed")]
  fn empty_text_panics() {
    schema().text("", &[]);
  }

  #[test]
  fn char_slice_handles_multibyte() {
    assert_eq!(char_slice("héllo", 1, 3), "él");
    assert_eq!(char_slice("héllo", 3, 100), "lo");
    assert_eq!(char_slice("abc", 2, 1), "");
    assert_eq!(char_slice("abc", 5, 9), "");
  }
}
