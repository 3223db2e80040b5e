//! Fragments: immutable, size-annotated sequences of child nodes.

use std::{
  fmt,
  sync::Arc,
};

use serde_json::Value;

use crate::{
  diff,
  error::ContentError,
  node::Node,
  schema::Schema,
};

/// An ordered sequence of nodes with a cached total size.
///
/// Adjacent text nodes with the same marks are always joined, so a fragment
/// never holds two mergeable text nodes next to each other.
#[derive(Clone)]
pub struct Fragment {
  content: Arc<[Node]>,
  size:    usize,
}

impl Default for Fragment {
  fn default() -> Self {
    Self::empty()
  }
}

impl Fragment {
  pub fn empty() -> Self {
    Self {
      content: Arc::from([]),
      size:    0,
    }
  }

  fn from_parts(content: Vec<Node>, size: usize) -> Self {
    Self {
      content: Arc::from(content),
      size,
    }
  }

  /// Build a fragment from a list of nodes, joining adjacent text nodes
  /// that share their marks.
  pub fn from_vec(nodes: Vec<Node>) -> Self {
    if nodes.is_empty() {
      return Self::empty();
    }
    let mut joined: Option<Vec<Node>> = None;
    let mut size = 0;
    for (i, node) in nodes.iter().enumerate() {
      size += node.node_size();
      if i > 0 && node.is_text() && nodes[i - 1].same_markup(node) {
        let out = joined.get_or_insert_with(|| nodes[..i].to_vec());
        if let Some(last) = out.last_mut() {
          *last = last.with_text(&format!("{}{}", last.text().unwrap_or(""), node.text().unwrap_or("")));
        }
      } else if let Some(out) = joined.as_mut() {
        out.push(node.clone());
      }
    }
    Self::from_parts(joined.unwrap_or(nodes), size)
  }

  pub fn size(&self) -> usize {
    self.size
  }

  pub fn child_count(&self) -> usize {
    self.content.len()
  }

  pub fn children(&self) -> &[Node] {
    &self.content
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Node> {
    self.content.iter()
  }

  /// # Panics
  ///
  /// Panics when `index` is out of range.
  pub fn child(&self, index: usize) -> &Node {
    &self.content[index]
  }

  pub fn maybe_child(&self, index: usize) -> Option<&Node> {
    self.content.get(index)
  }

  pub fn first_child(&self) -> Option<&Node> {
    self.content.first()
  }

  pub fn last_child(&self) -> Option<&Node> {
    self.content.last()
  }

  /// Call `f` with every child and its offset and index.
  pub fn for_each(&self, mut f: impl FnMut(&Node, usize, usize)) {
    let mut pos = 0;
    for (i, child) in self.content.iter().enumerate() {
      f(child, pos, i);
      pos += child.node_size();
    }
  }

  /// Invoke `f` for every descendant overlapping `from..to`, with its
  /// absolute position, parent and index. Returning false from `f` skips
  /// the node's children.
  pub fn nodes_between<F>(&self, from: usize, to: usize, mut f: F)
  where
    F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
  {
    self.nodes_between_inner(from, to, &mut f, 0, None);
  }

  pub(crate) fn nodes_between_inner<F>(
    &self,
    from: usize,
    to: usize,
    f: &mut F,
    node_start: usize,
    parent: Option<&Node>,
  ) where
    F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
  {
    let mut pos = 0;
    for (i, child) in self.content.iter().enumerate() {
      if pos >= to {
        break;
      }
      let end = pos + child.node_size();
      if end > from && f(child, node_start + pos, parent, i) && child.content().size() > 0 {
        let start = pos + 1;
        child.content().nodes_between_inner(
          from.saturating_sub(start),
          child.content().size().min(to - start),
          f,
          node_start + start,
          Some(child),
        );
      }
      pos = end;
    }
  }

  /// Call `f` for every descendant node.
  pub fn descendants<F>(&self, f: F)
  where
    F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
  {
    self.nodes_between(0, self.size, f);
  }

  /// Text between `from` and `to`. `block_separator` is inserted between
  /// block nodes, `leaf_text` stands in for non-text leaf nodes.
  pub fn text_between(&self, from: usize, to: usize, block_separator: Option<&str>, leaf_text: Option<&str>) -> String {
    let mut text = String::new();
    let mut first = true;
    self.nodes_between(from, to, |node, pos, _, _| {
      let piece = if let Some(content) = node.text() {
        crate::node::char_slice(content, from.max(pos) - pos, to.saturating_sub(pos))
      } else if node.is_leaf() {
        leaf_text.unwrap_or("")
      } else {
        ""
      };
      if node.is_block() && (node.is_leaf() && !piece.is_empty() || node.is_textblock()) {
        if let Some(separator) = block_separator {
          if first {
            first = false;
          } else {
            text.push_str(separator);
          }
        }
      }
      text.push_str(piece);
      true
    });
    text
  }

  /// Concatenate two fragments, joining text at the seam.
  pub fn append(&self, other: &Fragment) -> Fragment {
    if other.size == 0 {
      return self.clone();
    }
    if self.size == 0 {
      return other.clone();
    }
    let mut content = self.content.to_vec();
    let mut rest = other.content.iter();
    if let (Some(last), Some(first)) = (content.last_mut(), other.first_child()) {
      if first.is_text() && last.same_markup(first) {
        *last = last.with_text(&format!("{}{}", last.text().unwrap_or(""), first.text().unwrap_or("")));
        rest.next();
      }
    }
    content.extend(rest.cloned());
    Self::from_parts(content, self.size + other.size)
  }

  /// The part of the fragment between `from` and `to`.
  pub fn cut(&self, from: usize, to: usize) -> Fragment {
    if from == 0 && to == self.size {
      return self.clone();
    }
    let mut result = Vec::new();
    let mut size = 0;
    if to > from {
      let mut pos = 0;
      for child in self.content.iter() {
        if pos >= to {
          break;
        }
        let end = pos + child.node_size();
        if end > from {
          let child = if pos < from || end > to {
            if child.is_text() {
              child.cut(from.saturating_sub(pos), child.text_len().min(to - pos))
            } else {
              child.cut(from.saturating_sub(pos + 1), child.content().size().min(to - pos - 1))
            }
          } else {
            child.clone()
          };
          size += child.node_size();
          result.push(child);
        }
        pos = end;
      }
    }
    Self::from_parts(result, size)
  }

  pub fn cut_by_index(&self, from: usize, to: usize) -> Fragment {
    if from == to {
      return Fragment::empty();
    }
    if from == 0 && to == self.content.len() {
      return self.clone();
    }
    let content = self.content[from..to].to_vec();
    let size = content.iter().map(Node::node_size).sum();
    Self::from_parts(content, size)
  }

  /// A copy with the child at `index` replaced by `node`. Text landing
  /// next to text with the same marks is joined with it.
  ///
  /// # Panics
  ///
  /// Panics when `index` is out of bounds.
  pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
    let current = &self.content[index];
    if current.ptr_eq(&node) {
      return self.clone();
    }
    let mut content = self.content.to_vec();
    content[index] = node;
    Self::from_vec(content)
  }

  pub fn add_to_start(&self, node: Node) -> Fragment {
    Fragment::from(node).append(self)
  }

  pub fn add_to_end(&self, node: Node) -> Fragment {
    self.append(&Fragment::from(node))
  }

  /// First position at which this fragment and `other` differ, or `None`
  /// when they are the same.
  pub fn find_diff_start(&self, other: &Fragment, pos: usize) -> Option<usize> {
    diff::find_diff_start(self, other, pos)
  }

  /// Last positions, in this fragment and in `other`, at which the two
  /// differ, scanning backwards from `pos` and `other_pos`.
  pub fn find_diff_end(&self, other: &Fragment, pos: usize, other_pos: usize) -> Option<(usize, usize)> {
    diff::find_diff_end(self, other, pos, other_pos)
  }

  /// Index of the child containing `pos` and that child's start offset.
  ///
  /// # Panics
  ///
  /// Panics when `pos` lies outside the fragment.
  pub fn find_index(&self, pos: usize) -> (usize, usize) {
    self.find_index_round(pos, false)
  }

  /// Like [`Fragment::find_index`], but a position inside a child rounds to
  /// the child after it when `round_up` is set.
  pub fn find_index_round(&self, pos: usize, round_up: bool) -> (usize, usize) {
    if pos == 0 {
      return (0, pos);
    }
    if pos == self.size {
      return (self.content.len(), pos);
    }
    assert!(pos < self.size, "position {pos} outside of fragment ({self})");
    let mut cur_pos = 0;
    for (i, child) in self.content.iter().enumerate() {
      let end = cur_pos + child.node_size();
      if end >= pos {
        if end == pos || round_up {
          return (i + 1, end);
        }
        return (i, cur_pos);
      }
      cur_pos = end;
    }
    (self.content.len(), self.size)
  }

  pub fn to_json(&self) -> Option<Value> {
    if self.content.is_empty() {
      return None;
    }
    Some(Value::Array(self.content.iter().map(Node::to_json).collect()))
  }

  pub fn from_json(schema: &Schema, json: Option<&Value>) -> Result<Fragment, ContentError> {
    let Some(json) = json else {
      return Ok(Fragment::empty());
    };
    let Value::Array(items) = json else {
      return Err(ContentError::InvalidJson {
        what:    "Fragment",
        message: "expected an array of nodes".into(),
      });
    };
    let nodes = items
      .iter()
      .map(|item| schema.node_from_json(item))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Fragment::from_vec(nodes))
  }

  pub(crate) fn ptr_eq(&self, other: &Fragment) -> bool {
    Arc::ptr_eq(&self.content, &other.content)
  }

  pub(crate) fn fmt_inner(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, child) in self.content.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{child}")?;
    }
    Ok(())
  }
}

impl PartialEq for Fragment {
  fn eq(&self, other: &Self) -> bool {
    self.ptr_eq(other)
      || (self.size == other.size
        && self.content.len() == other.content.len()
        && self.content.iter().zip(other.content.iter()).all(|(a, b)| a == b))
  }
}

impl Eq for Fragment {}

impl From<Node> for Fragment {
  fn from(node: Node) -> Self {
    let size = node.node_size();
    Self::from_parts(vec![node], size)
  }
}

impl From<Vec<Node>> for Fragment {
  fn from(nodes: Vec<Node>) -> Self {
    Self::from_vec(nodes)
  }
}

impl From<Option<Node>> for Fragment {
  fn from(node: Option<Node>) -> Self {
    node.map_or_else(Fragment::empty, Fragment::from)
  }
}

impl FromIterator<Node> for Fragment {
  fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
    Self::from_vec(iter.into_iter().collect())
  }
}

impl<'a> IntoIterator for &'a Fragment {
  type IntoIter = std::slice::Iter<'a, Node>;
  type Item = &'a Node;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

impl fmt::Display for Fragment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("<")?;
    self.fmt_inner(f)?;
    f.write_str(">")
  }
}

impl fmt::Debug for Fragment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::test_utils::*;

  #[test]
  fn joins_adjacent_text() {
    let frag = Fragment::from_vec(vec![text("foo"), text("bar"), em("baz")]);
    assert_eq!(frag.child_count(), 2);
    assert_eq!(frag.size(), 9);
    assert_eq!(frag.to_string(), "<\"foobar\", em(\"baz\")>");

    let appended = Fragment::from(text("ab")).append(&Fragment::from(text("cd")));
    assert_eq!(appended.child_count(), 1);
    assert_eq!(appended.first_child().unwrap().text(), Some("abcd"));
  }

  #[test]
  fn cut_shares_and_slices() {
    let doc = doc([p([text("hello")]), p([text("world")])]);
    let content = doc.content();
    assert_eq!(content.cut(0, content.size()), *content);
    assert!(content.cut(0, content.size()).ptr_eq(content));
    let cut = content.cut(3, 10);
    assert_eq!(cut.to_string(), "<paragraph(\"llo\"), paragraph(\"wo\")>");
    assert_eq!(cut.size(), 9);
    assert_eq!(content.cut(4, 4).size(), 0);
  }

  #[test]
  fn find_index_locates_children() {
    let frag = Fragment::from_vec(vec![p([text("ab")]), hr(), p([])]);
    assert_eq!(frag.find_index(0), (0, 0));
    assert_eq!(frag.find_index(2), (0, 0));
    assert_eq!(frag.find_index(4), (1, 4));
    assert_eq!(frag.find_index(5), (2, 5));
    assert_eq!(frag.find_index(7), (3, 7));
    assert_eq!(frag.find_index_round(2, true), (1, 4));
  }

  #[test]
  fn replace_child_and_edges() {
    let frag = Fragment::from_vec(vec![p([text("a")]), p([text("b")])]);
    let replaced = frag.replace_child(1, hr());
    assert_eq!(replaced.size(), 4);
    assert_eq!(replaced.child(0), frag.child(0));
    assert!(replaced.child(0).ptr_eq(frag.child(0)));
    assert_eq!(frag.add_to_start(hr()).child_count(), 3);
    assert_eq!(frag.add_to_end(hr()).size(), 7);
    assert_eq!(frag.cut_by_index(1, 2).to_string(), "<paragraph(\"b\")>");
  }

  #[test]
  fn edits_join_text_at_the_seam() {
    let frag = Fragment::from_vec(vec![text("b"), img(), em("d")]);
    let start = frag.add_to_start(text("a"));
    assert_eq!(start.child_count(), 3);
    assert_eq!(start.to_string(), "<\"ab\", image, em(\"d\")>");

    let end = frag.add_to_end(em("e"));
    assert_eq!(end.child_count(), 3);
    assert_eq!(end.size(), 4);

    let replaced = frag.replace_child(1, text("c"));
    assert_eq!(replaced.child_count(), 2);
    assert_eq!(replaced.to_string(), "<\"bc\", em(\"d\")>");
    assert_eq!(replaced.size(), 3);

    let merged = frag.replace_child(2, text("c"));
    assert_eq!(merged.to_string(), "<\"b\", image, \"c\">");
  }

  #[test]
  fn text_between_with_separators() {
    let doc = doc([p([text("one")]), p([text("two"), img()]), hr()]);
    let content = doc.content();
    assert_eq!(content.text_between(0, content.size(), None, None), "onetwo");
    assert_eq!(
      content.text_between(0, content.size(), Some("\n"), Some("*")),
      "one\ntwo*\n*"
    );
    assert_eq!(content.text_between(2, 8, Some("|"), None), "ne|tw");
  }

  #[test]
  fn nodes_between_reports_positions() {
    let doc = doc([p([text("ab")]), blockquote([p([text("cd")])])]);
    let mut seen = Vec::new();
    doc.content().nodes_between(5, 7, |node, pos, _, _| {
      seen.push((node.ty().name().to_string(), pos));
      true
    });
    assert_eq!(seen, [
      ("blockquote".to_string(), 4),
      ("paragraph".to_string(), 5),
      ("text".to_string(), 6),
    ]);
  }

  quickcheck::quickcheck! {
    fn size_is_sum_of_children(words: Vec<String>) -> bool {
      let nodes: Vec<Node> = words
        .iter()
        .filter(|w| !w.is_empty())
        .enumerate()
        .map(|(i, w)| if i % 2 == 0 { p([text(w)]) } else { hr() })
        .collect();
      let frag = Fragment::from_vec(nodes);
      frag.size() == frag.iter().map(Node::node_size).sum::<usize>()
    }
  }
}
