//! Resolved positions.
//!
//! A [`ResolvedPos`] records the path from the document root down to the
//! node that directly contains a position, so depth-relative questions
//! (which node, which index, where does it start) are answered without
//! walking the tree again.

use std::fmt;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::{
  error::RangeError,
  mark::{
    Mark,
    MarkSet,
  },
  node::Node,
};

#[derive(Clone)]
struct PathEntry {
  node:   Node,
  index:  usize,
  /// Absolute position at which child `index` starts.
  offset: usize,
}

#[derive(Clone)]
pub struct ResolvedPos {
  pos:           usize,
  path:          SmallVec<[PathEntry; 4]>,
  parent_offset: usize,
}

impl ResolvedPos {
  /// Resolve `pos` in `doc`.
  pub fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos, RangeError> {
    let size = doc.content().size();
    if pos > size {
      return Err(RangeError::OutOfRange { pos, size });
    }
    let mut path = SmallVec::new();
    let mut start = 0;
    let mut parent_offset = pos;
    let mut node = doc.clone();
    loop {
      let (index, offset) = node.content().find_index(parent_offset);
      let rem = parent_offset - offset;
      path.push(PathEntry {
        node: node.clone(),
        index,
        offset: start + offset,
      });
      if rem == 0 {
        break;
      }
      let child = node.child(index).clone();
      if child.is_text() {
        break;
      }
      parent_offset = rem - 1;
      start += offset + 1;
      node = child;
    }
    Ok(ResolvedPos {
      pos,
      path,
      parent_offset,
    })
  }

  pub fn pos(&self) -> usize {
    self.pos
  }

  /// Number of levels the parent node is from the root.
  pub fn depth(&self) -> usize {
    self.path.len() - 1
  }

  /// Offset of this position into its parent node.
  pub fn parent_offset(&self) -> usize {
    self.parent_offset
  }

  /// The innermost node containing the position.
  pub fn parent(&self) -> &Node {
    self.node(self.depth())
  }

  pub fn doc(&self) -> &Node {
    self.node(0)
  }

  /// The ancestor at `depth`.
  pub fn node(&self, depth: usize) -> &Node {
    &self.path[depth].node
  }

  /// Index into the ancestor at `depth`.
  pub fn index(&self, depth: usize) -> usize {
    self.path[depth].index
  }

  /// Index pointing after this position into the ancestor at `depth`.
  pub fn index_after(&self, depth: usize) -> usize {
    let bump = !(depth == self.depth() && self.text_offset() == 0);
    self.index(depth) + usize::from(bump)
  }

  /// Absolute position at which the content of the ancestor at `depth`
  /// starts.
  pub fn start(&self, depth: usize) -> usize {
    if depth == 0 {
      0
    } else {
      self.path[depth - 1].offset + 1
    }
  }

  /// Absolute position at which the content of the ancestor at `depth`
  /// ends.
  pub fn end(&self, depth: usize) -> usize {
    self.start(depth) + self.node(depth).content().size()
  }

  /// Absolute position before the ancestor at `depth`, or the position
  /// itself when `depth` is one deeper than this position.
  ///
  /// # Panics
  ///
  /// Panics for depth 0, since there is no position before the top node.
  pub fn before(&self, depth: usize) -> usize {
    assert!(depth > 0, "there is no position before the top-level node");
    if depth == self.depth() + 1 {
      self.pos
    } else {
      self.path[depth - 1].offset
    }
  }

  /// Absolute position after the ancestor at `depth`.
  ///
  /// # Panics
  ///
  /// Panics for depth 0, since there is no position after the top node.
  pub fn after(&self, depth: usize) -> usize {
    assert!(depth > 0, "there is no position after the top-level node");
    if depth == self.depth() + 1 {
      self.pos
    } else {
      self.path[depth - 1].offset + self.path[depth].node.node_size()
    }
  }

  /// Offset into the text node the position points into, zero when it
  /// points between nodes.
  pub fn text_offset(&self) -> usize {
    self.pos - self.path[self.depth()].offset
  }

  /// The node directly after the position, cut when the position is inside
  /// a text node.
  pub fn node_after(&self) -> Option<Node> {
    let parent = self.parent();
    let index = self.index(self.depth());
    if index == parent.child_count() {
      return None;
    }
    let child = parent.child(index);
    match self.text_offset() {
      0 => Some(child.clone()),
      offset => Some(child.cut(offset, child.text_len())),
    }
  }

  /// The node directly before the position, cut when the position is inside
  /// a text node.
  pub fn node_before(&self) -> Option<Node> {
    let index = self.index(self.depth());
    match self.text_offset() {
      0 if index == 0 => None,
      0 => Some(self.parent().child(index - 1).clone()),
      offset => Some(self.parent().child(index).cut(0, offset)),
    }
  }

  /// Absolute position of child `index` of the ancestor at `depth`.
  pub fn pos_at_index(&self, index: usize, depth: usize) -> usize {
    let node = self.node(depth);
    let mut pos = self.start(depth);
    for i in 0..index {
      pos += node.child(i).node_size();
    }
    pos
  }

  /// The marks that text inserted here would get: those of the node before
  /// (or after, at the start of the parent) minus non-inclusive marks that
  /// end here.
  pub fn marks(&self) -> MarkSet {
    let parent = self.parent();
    let index = self.index(self.depth());
    if parent.content().size() == 0 {
      return MarkSet::new();
    }
    if self.text_offset() > 0 {
      return parent.child(index).marks().iter().cloned().collect();
    }
    let before = index.checked_sub(1).and_then(|i| parent.maybe_child(i));
    let after = parent.maybe_child(index);
    let (main, other) = match before {
      Some(before) => (Some(before), after),
      None => (after, None),
    };
    let Some(main) = main else {
      return MarkSet::new();
    };
    drop_exclusive_marks(main.marks(), other)
  }

  /// The marks after this position that continue up to `end`, or `None`
  /// when the position isn't before an inline node.
  pub fn marks_across(&self, end: &ResolvedPos) -> Option<MarkSet> {
    let after = self.parent().maybe_child(self.index(self.depth()))?;
    if !after.is_inline() {
      return None;
    }
    let next = end.parent().maybe_child(end.index(end.depth()));
    Some(drop_exclusive_marks(after.marks(), next))
  }

  /// The depth up to which this position and `pos` share ancestors.
  pub fn shared_depth(&self, pos: usize) -> usize {
    (1..=self.depth())
      .rev()
      .find(|&depth| self.start(depth) <= pos && self.end(depth) >= pos)
      .unwrap_or(0)
  }

  /// The range of sibling nodes around this position and `other` at the
  /// deepest depth where `pred` (if any) holds for the parent and the range
  /// covers the content of a block node.
  pub fn block_range(&self, other: &ResolvedPos, pred: Option<&dyn Fn(&Node) -> bool>) -> Option<NodeRange> {
    if other.pos < self.pos {
      return other.block_range(self, pred);
    }
    let skip = usize::from(self.parent().inline_content() || self.pos == other.pos);
    let top = self.depth().checked_sub(skip)?;
    (0..=top).rev().find_map(|depth| {
      (other.pos <= self.end(depth) && pred.is_none_or(|pred| pred(self.node(depth))))
        .then(|| NodeRange::new(self.clone(), other.clone(), depth))
    })
  }

  pub fn same_parent(&self, other: &ResolvedPos) -> bool {
    self.pos - self.parent_offset == other.pos - other.parent_offset
  }

  pub fn max<'a>(&'a self, other: &'a ResolvedPos) -> &'a ResolvedPos {
    if other.pos > self.pos { other } else { self }
  }

  pub fn min<'a>(&'a self, other: &'a ResolvedPos) -> &'a ResolvedPos {
    if other.pos < self.pos { other } else { self }
  }
}

fn drop_exclusive_marks(marks: &[Mark], other: Option<&Node>) -> MarkSet {
  marks
    .iter()
    .filter(|mark| {
      mark.ty().is_inclusive() || other.is_some_and(|other| mark.is_in_set(other.marks()))
    })
    .cloned()
    .collect()
}

impl fmt::Display for ResolvedPos {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for depth in 1..=self.depth() {
      if depth > 1 {
        f.write_str("/")?;
      }
      write!(f, "{}_{}", self.node(depth).ty().name(), self.index(depth - 1))?;
    }
    write!(f, ":{}", self.parent_offset)
  }
}

impl fmt::Debug for ResolvedPos {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ResolvedPos({} {self})", self.pos)
  }
}

/// A flat range of siblings inside the node at `depth`.
#[derive(Debug, Clone)]
pub struct NodeRange {
  from:  ResolvedPos,
  to:    ResolvedPos,
  depth: usize,
}

impl NodeRange {
  pub fn new(from: ResolvedPos, to: ResolvedPos, depth: usize) -> Self {
    Self { from, to, depth }
  }

  pub fn from(&self) -> &ResolvedPos {
    &self.from
  }

  pub fn to(&self) -> &ResolvedPos {
    &self.to
  }

  pub fn depth(&self) -> usize {
    self.depth
  }

  /// Position before the first node in the range.
  pub fn start(&self) -> usize {
    self.from.before(self.depth + 1)
  }

  /// Position after the last node in the range.
  pub fn end(&self) -> usize {
    self.to.after(self.depth + 1)
  }

  pub fn parent(&self) -> &Node {
    self.from.node(self.depth)
  }

  pub fn start_index(&self) -> usize {
    self.from.index(self.depth)
  }

  pub fn end_index(&self) -> usize {
    self.to.index_after(self.depth)
  }
}

struct CacheRing {
  entries:  Vec<ResolvedPos>,
  next:     usize,
  capacity: usize,
}

/// A small ring of recently resolved positions, keyed by document identity
/// and position. Owned by whoever holds the documents being resolved.
pub struct ResolveCache {
  ring: Mutex<CacheRing>,
}

impl Default for ResolveCache {
  fn default() -> Self {
    Self::new()
  }
}

impl ResolveCache {
  pub const DEFAULT_CAPACITY: usize = 12;

  pub fn new() -> Self {
    Self::with_capacity(Self::DEFAULT_CAPACITY)
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      ring: Mutex::new(CacheRing {
        entries: Vec::with_capacity(capacity),
        next: 0,
        capacity: capacity.max(1),
      }),
    }
  }

  /// Resolve `pos` in `doc`, reusing a cached result for the same document
  /// instance.
  pub fn resolve(&self, doc: &Node, pos: usize) -> Result<ResolvedPos, RangeError> {
    if let Some(hit) = self
      .ring
      .lock()
      .entries
      .iter()
      .find(|entry| entry.pos == pos && entry.doc().ptr_eq(doc))
    {
      return Ok(hit.clone());
    }
    let resolved = ResolvedPos::resolve(doc, pos)?;
    let mut ring = self.ring.lock();
    if ring.entries.len() < ring.capacity {
      ring.entries.push(resolved.clone());
    } else {
      let slot = ring.next;
      ring.entries[slot] = resolved.clone();
    }
    ring.next = (ring.next + 1) % ring.capacity;
    Ok(resolved)
  }

  pub fn clear(&self) {
    let mut ring = self.ring.lock();
    ring.entries.clear();
    ring.next = 0;
  }

  pub fn len(&self) -> usize {
    self.ring.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl fmt::Debug for ResolveCache {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let ring = self.ring.lock();
    f.debug_struct("ResolveCache")
      .field("len", &ring.entries.len())
      .field("capacity", &ring.capacity)
      .finish()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::test_utils::*;

  #[test]
  fn resolves_every_position() {
    // doc(blockquote(paragraph("ab")), paragraph(img))
    let doc = doc([blockquote([p([text("ab")])]), p([img()])]);
    let expected: &[(usize, usize, usize)] = &[
      (0, 0, 0),
      (1, 1, 0),
      (2, 2, 0),
      (3, 2, 1),
      (4, 2, 2),
      (5, 1, 4),
      (6, 0, 6),
      (7, 1, 0),
      (8, 1, 1),
      (9, 0, 9),
    ];
    for &(pos, depth, parent_offset) in expected {
      let rp = doc.resolve(pos).unwrap();
      assert_eq!(rp.depth(), depth, "depth at {pos}");
      assert_eq!(rp.parent_offset(), parent_offset, "parent offset at {pos}");
      assert_eq!(rp.pos(), pos);
    }
    assert!(matches!(doc.resolve(10), Err(RangeError::OutOfRange { pos: 10, size: 9 })));
  }

  #[test]
  fn depth_accessors() {
    let doc = doc([blockquote([p([text("ab")])]), p([img()])]);
    let rp = doc.resolve(3).unwrap();
    assert_eq!(rp.parent().ty().name(), "paragraph");
    assert_eq!(rp.node(1).ty().name(), "blockquote");
    assert_eq!((rp.start(2), rp.end(2)), (2, 4));
    assert_eq!((rp.start(1), rp.end(1)), (1, 5));
    assert_eq!((rp.before(1), rp.after(1)), (0, 6));
    assert_eq!((rp.before(2), rp.after(2)), (1, 5));
    assert_eq!(rp.text_offset(), 1);
    assert_eq!(rp.index(2), 0);
    assert_eq!(rp.index_after(2), 1);
    assert_eq!(rp.node_before().unwrap().text(), Some("a"));
    assert_eq!(rp.node_after().unwrap().text(), Some("b"));
    assert_eq!(rp.to_string(), "blockquote_0/paragraph_0:1");
    assert_eq!(rp.pos_at_index(1, 0), 6);
    assert_eq!(rp.shared_depth(8), 0);
    assert_eq!(rp.shared_depth(4), 2);

    let end = doc.resolve(9).unwrap();
    assert!(end.node_after().is_none());
    assert_eq!(end.node_before().unwrap().ty().name(), "paragraph");
    assert!(!rp.same_parent(&end));
    assert_eq!(rp.max(&end).pos(), 9);
    assert_eq!(rp.min(&end).pos(), 3);
  }

  #[test]
  #[should_panic(expected = "no position before the top-level node")]
  fn before_top_level_panics() {
    let doc = doc([p([])]);
    doc.resolve(1).unwrap().before(0);
  }

  #[test]
  fn marks_skip_non_inclusive_ends() {
    let doc = doc([p([text("a"), marked("b", &[link("x"), mark("em")]), text("c")])]);
    let inside = doc.resolve(2).unwrap();
    assert_eq!(inside.marks().len(), 0);
    let after_link = doc.resolve(3).unwrap();
    let marks = after_link.marks();
    assert_eq!(marks.len(), 1);
    assert_eq!(marks[0].ty().name(), "em");
    let start = doc.resolve(1).unwrap();
    assert!(start.marks().is_empty());
    let empty = crate::test_utils::doc([p([])]).resolve(1).unwrap();
    assert!(empty.marks().is_empty());
  }

  #[test]
  fn marks_across_ranges() {
    let doc = doc([p([em("ab"), text("c")])]);
    let from = doc.resolve(1).unwrap();
    let to = doc.resolve(3).unwrap();
    let marks = from.marks_across(&to).unwrap();
    assert_eq!(marks.len(), 1);
    let end = doc.resolve(4).unwrap();
    assert!(end.marks_across(&end).is_none());
  }

  #[test]
  fn block_range_finds_siblings() {
    let doc = doc([blockquote([p([text("a")]), p([text("b")])])]);
    let from = doc.resolve(2).unwrap();
    let to = doc.resolve(5).unwrap();
    let range = from.block_range(&to, None).unwrap();
    assert_eq!(range.depth(), 1);
    assert_eq!((range.start(), range.end()), (1, 7));
    assert_eq!((range.start_index(), range.end_index()), (0, 2));
    assert_eq!(range.parent().ty().name(), "blockquote");

    let only_doc = |node: &Node| node.ty().name() == "doc";
    let range = from.block_range(&to, Some(&only_doc)).unwrap();
    assert_eq!(range.depth(), 0);

    let single = from.block_range(&from, None).unwrap();
    assert_eq!((single.start(), single.end()), (1, 4));
  }

  #[test]
  fn cache_reuses_entries_per_document() {
    let cache = ResolveCache::with_capacity(2);
    let a = doc([p([text("abc")])]);
    let b = doc([p([text("abc")])]);
    cache.resolve(&a, 1).unwrap();
    cache.resolve(&a, 1).unwrap();
    assert_eq!(cache.len(), 1);
    cache.resolve(&b, 1).unwrap();
    assert_eq!(cache.len(), 2);
    let hit = cache.resolve(&b, 2).unwrap();
    assert!(hit.doc().ptr_eq(&b));
    assert_eq!(cache.len(), 2);
    assert!(cache.resolve(&a, 40).is_err());
    cache.clear();
    assert!(cache.is_empty());
  }
}
