//! Structural edits: lifting, wrapping, splitting, joining and retyping
//! blocks, along with the predicates that tell whether they are possible.

use the_model::{
  Attrs,
  Fragment,
  Mark,
  Node,
  NodeRange,
  NodeType,
  Slice,
  Whitespace,
};
use tracing::debug;

use crate::{
  error::{
    Result,
    TransformError,
  },
  map::{
    Assoc,
    Mappable,
  },
  replace_step::{
    ReplaceAroundStep,
    ReplaceStep,
  },
  transform::Transform,
};

/// A node type with the attributes to create it with.
#[derive(Debug, Clone, PartialEq)]
pub struct Wrapper {
  pub ty:    NodeType,
  pub attrs: Option<Attrs>,
}

impl Wrapper {
  pub fn new(ty: NodeType, attrs: Option<Attrs>) -> Self {
    Self { ty, attrs }
  }
}

impl From<NodeType> for Wrapper {
  fn from(ty: NodeType) -> Self {
    Self::new(ty, None)
  }
}

fn can_cut(node: &Node, start: usize, end: usize) -> bool {
  (start == 0 || node.can_replace(start, node.child_count(), &Fragment::empty()))
    && (end == node.child_count() || node.can_replace(0, end, &Fragment::empty()))
}

/// The depth the content of `range` can be lifted to, if any.
pub fn lift_target(range: &NodeRange) -> Option<usize> {
  let content = range
    .parent()
    .content()
    .cut_by_index(range.start_index(), range.end_index());
  let mut depth = range.depth();
  loop {
    let node = range.from().node(depth);
    let index = range.from().index(depth);
    let end_index = range.to().index_after(depth);
    if depth < range.depth() && node.can_replace(index, end_index, &content) {
      return Some(depth);
    }
    if depth == 0 || node.ty().is_isolating() || !can_cut(node, index, end_index) {
      return None;
    }
    depth -= 1;
  }
}

/// The wrappers needed to wrap `range` in a node of type `ty`: the nodes
/// around it, `ty` itself, and the nodes between it and the content of
/// `inner_range` (which defaults to `range`).
pub fn find_wrapping(
  range: &NodeRange,
  ty: &NodeType,
  attrs: Option<&Attrs>,
  inner_range: Option<&NodeRange>,
) -> Option<Vec<Wrapper>> {
  let around = find_wrapping_outside(range, ty)?;
  let inner = find_wrapping_inside(inner_range.unwrap_or(range), ty)?;
  let mut wrappers: Vec<Wrapper> = around.into_iter().map(Wrapper::from).collect();
  wrappers.push(Wrapper::new(ty.clone(), attrs.cloned()));
  wrappers.extend(inner.into_iter().map(Wrapper::from));
  Some(wrappers)
}

fn find_wrapping_outside(range: &NodeRange, ty: &NodeType) -> Option<Vec<NodeType>> {
  let parent = range.parent();
  let around = parent
    .content_match_at(range.start_index())?
    .find_wrapping(ty)?;
  let outer = around.first().unwrap_or(ty);
  parent
    .can_replace_with(range.start_index(), range.end_index(), outer, None)
    .then_some(around)
}

fn find_wrapping_inside(range: &NodeRange, ty: &NodeType) -> Option<Vec<NodeType>> {
  let parent = range.parent();
  let inner = parent.maybe_child(range.start_index())?;
  let inside = ty.content_match().find_wrapping(inner.ty())?;
  let last = inside.last().unwrap_or(ty);
  let mut matched = Some(last.content_match());
  for index in range.start_index()..range.end_index() {
    matched = matched.and_then(|m| m.match_type(parent.child(index).ty()));
  }
  matched.filter(|m| m.valid_end()).map(|_| inside)
}

/// Whether splitting at `pos` with `depth` levels works, optionally giving
/// the split-off nodes new types (innermost last).
pub fn can_split(doc: &Node, pos: usize, depth: usize, types_after: &[Option<Wrapper>]) -> bool {
  let Ok(rpos) = doc.resolve(pos) else {
    return false;
  };
  let Some(base) = rpos.depth().checked_sub(depth) else {
    return false;
  };
  let parent = rpos.parent();
  let index = rpos.index(rpos.depth());
  let inner_type = match types_after.last() {
    Some(Some(wrapper)) => &wrapper.ty,
    _ => parent.ty(),
  };
  if parent.ty().is_isolating()
    || !parent.can_replace(index, parent.child_count(), &Fragment::empty())
    || !inner_type.valid_content(&parent.content().cut_by_index(index, parent.child_count()))
  {
    return false;
  }
  // `i` indexes `types_after` for depth `d`; it runs from `depth - 2` down.
  let mut i = depth as isize - 2;
  for d in (base + 1..rpos.depth()).rev() {
    let node = rpos.node(d);
    let index = rpos.index(d);
    if node.ty().is_isolating() {
      return false;
    }
    let mut rest = node.content().cut_by_index(index, node.child_count());
    if let Some(Some(child)) = type_at(types_after, i + 1) {
      match child.ty.create(child.attrs.as_ref(), Fragment::empty(), &[]) {
        Ok(replacement) => rest = rest.replace_child(0, replacement),
        Err(_) => return false,
      }
    }
    let after = match type_at(types_after, i) {
      Some(Some(wrapper)) => &wrapper.ty,
      _ => node.ty(),
    };
    if !node.can_replace(index + 1, node.child_count(), &Fragment::empty()) || !after.valid_content(&rest) {
      return false;
    }
    i -= 1;
  }
  let index = rpos.index_after(base);
  let base_type = match types_after.first() {
    Some(Some(wrapper)) => &wrapper.ty,
    _ => rpos.node(base + 1).ty(),
  };
  rpos.node(base).can_replace_with(index, index, base_type, None)
}

fn type_at(types: &[Option<Wrapper>], i: isize) -> Option<&Option<Wrapper>> {
  usize::try_from(i).ok().and_then(|i| types.get(i))
}

/// Whether the nodes before and after `pos` can be joined.
pub fn can_join(doc: &Node, pos: usize) -> bool {
  let Ok(rpos) = doc.resolve(pos) else {
    return false;
  };
  let index = rpos.index(rpos.depth());
  joinable(rpos.node_before().as_ref(), rpos.node_after().as_ref())
    && rpos.parent().can_replace(index, index + 1, &Fragment::empty())
}

fn can_append_with_substituted_linebreaks(a: &Node, b: &Node) -> bool {
  if b.content().size() == 0 {
    return a.ty().compatible_content(b.ty());
  }
  let Some(mut matched) = a.content_match_at(a.child_count()) else {
    return false;
  };
  let schema = a.ty().schema();
  let linebreak = schema.linebreak_replacement();
  for child in b.content() {
    let ty = if linebreak.as_ref() == Some(child.ty()) {
      schema.text_type()
    } else {
      child.ty().clone()
    };
    let Some(next) = matched.match_type(&ty) else {
      return false;
    };
    if !a.ty().allows_marks(child.marks()) {
      return false;
    }
    matched = next;
  }
  matched.valid_end()
}

/// Whether `b`'s content can be appended to `a`, treating linebreak
/// replacement nodes as newlines.
pub fn joinable(a: Option<&Node>, b: Option<&Node>) -> bool {
  match (a, b) {
    (Some(a), Some(b)) => !a.is_leaf() && can_append_with_substituted_linebreaks(a, b),
    _ => false,
  }
}

/// Find a position around `pos` where two blocks can be joined, searching
/// upwards through the ancestors. `backward` searches before the ancestors,
/// otherwise after them.
pub fn join_point(doc: &Node, pos: usize, backward: bool) -> Option<usize> {
  let rpos = doc.resolve(pos).ok()?;
  let mut pos = pos;
  let mut depth = rpos.depth();
  loop {
    let mut index = rpos.index(depth);
    let (before, after) = if depth == rpos.depth() {
      (rpos.node_before(), rpos.node_after())
    } else if !backward {
      index += 1;
      (
        Some(rpos.node(depth + 1).clone()),
        rpos.node(depth).maybe_child(index).cloned(),
      )
    } else {
      (
        index.checked_sub(1).and_then(|i| rpos.node(depth).maybe_child(i)).cloned(),
        Some(rpos.node(depth + 1).clone()),
      )
    };
    if before.as_ref().is_some_and(|node| !node.is_textblock())
      && joinable(before.as_ref(), after.as_ref())
      && rpos.node(depth).can_replace(index, index + 1, &Fragment::empty())
    {
      return Some(pos);
    }
    if depth == 0 {
      return None;
    }
    pos = if backward {
      rpos.before(depth)
    } else {
      rpos.after(depth)
    };
    depth -= 1;
  }
}

/// A position near `pos` where a node of type `ty` can be inserted, moving
/// out of the parent when `pos` sits at its start or end.
pub fn insert_point(doc: &Node, pos: usize, ty: &NodeType) -> Option<usize> {
  let rpos = doc.resolve(pos).ok()?;
  let index = rpos.index(rpos.depth());
  if rpos.parent().can_replace_with(index, index, ty, None) {
    return Some(pos);
  }
  if rpos.parent_offset() == 0 {
    for depth in (0..rpos.depth()).rev() {
      let index = rpos.index(depth);
      if rpos.node(depth).can_replace_with(index, index, ty, None) {
        return Some(rpos.before(depth + 1));
      }
      if index > 0 {
        return None;
      }
    }
  }
  if rpos.parent_offset() == rpos.parent().content().size() {
    for depth in (0..rpos.depth()).rev() {
      let index = rpos.index_after(depth);
      if rpos.node(depth).can_replace_with(index, index, ty, None) {
        return Some(rpos.after(depth + 1));
      }
      if index < rpos.node(depth).child_count() {
        return None;
      }
    }
  }
  None
}

/// A position near `pos` where `slice` can be dropped, wrapping its content
/// when that is the only way it fits.
pub fn drop_point(doc: &Node, pos: usize, slice: &Slice) -> Option<usize> {
  let rpos = doc.resolve(pos).ok()?;
  if slice.content().size() == 0 {
    return Some(pos);
  }
  let mut content = slice.content().clone();
  for _ in 0..slice.open_start() {
    content = content.first_child()?.content().clone();
  }
  let passes = if slice.open_start() == 0 && slice.size() > 0 {
    2
  } else {
    1
  };
  for pass in 1..=passes {
    for depth in (0..=rpos.depth()).rev() {
      let bias = if depth == rpos.depth() {
        0
      } else if rpos.pos() * 2 <= rpos.start(depth + 1) + rpos.end(depth + 1) {
        -1
      } else {
        1
      };
      let insert_pos = rpos.index(depth) + usize::from(bias > 0);
      let parent = rpos.node(depth);
      let fits = if pass == 1 {
        parent.can_replace(insert_pos, insert_pos, &content)
      } else {
        content
          .first_child()
          .and_then(|first| parent.content_match_at(insert_pos)?.find_wrapping(first.ty()))
          .and_then(|wrapping| wrapping.first().cloned())
          .is_some_and(|outer| parent.can_replace_with(insert_pos, insert_pos, &outer, None))
      };
      if fits {
        return Some(match bias {
          0 => rpos.pos(),
          b if b < 0 => rpos.before(depth + 1),
          _ => rpos.after(depth + 1),
        });
      }
    }
  }
  None
}

/// Which way line breaks in a textblock have to be converted when it takes
/// on type `ty`: `Some(true)` turns newlines into linebreak nodes,
/// `Some(false)` the other way around.
fn linebreak_conversion(ty: &NodeType) -> Option<bool> {
  let linebreak = ty.schema().linebreak_replacement()?;
  let pre = ty.whitespace() == Whitespace::Pre;
  let supports_linebreak = ty.content_match().match_type(&linebreak).is_some();
  match (pre, supports_linebreak) {
    (true, false) => Some(false),
    (false, true) => Some(true),
    _ => None,
  }
}

/// Char offsets and lengths of the line breaks in `text`.
pub(crate) fn newlines(text: &str) -> Vec<(usize, usize)> {
  let mut found = Vec::new();
  let mut chars = text.chars().enumerate().peekable();
  while let Some((offset, ch)) = chars.next() {
    match ch {
      '\r' if chars.peek().is_some_and(|&(_, next)| next == '\n') => {
        chars.next();
        found.push((offset, 2));
      },
      '\r' | '\n' => found.push((offset, 1)),
      _ => {},
    }
  }
  found
}

impl Transform {
  /// Lift the content of `range` out of its parent, to depth `target`.
  pub fn lift(&mut self, range: &NodeRange, target: usize) -> Result<&mut Self> {
    let from = range.from();
    let to = range.to();
    let depth = range.depth();
    let gap_start = from.before(depth + 1);
    let gap_end = to.after(depth + 1);
    let mut start = gap_start;
    let mut end = gap_end;

    let mut before = Fragment::empty();
    let mut open_start = 0;
    let mut splitting = false;
    for d in (target + 1..=depth).rev() {
      if splitting || from.index(d) > 0 {
        splitting = true;
        before = Fragment::from(from.node(d).copy(before));
        open_start += 1;
      } else {
        start -= 1;
      }
    }
    let mut after = Fragment::empty();
    let mut open_end = 0;
    let mut splitting = false;
    for d in (target + 1..=depth).rev() {
      if splitting || to.after(d + 1) < to.end(d) {
        splitting = true;
        after = Fragment::from(to.node(d).copy(after));
        open_end += 1;
      } else {
        end += 1;
      }
    }

    let insert = before.size() - open_start;
    let slice = Slice::new(before.append(&after), open_start, open_end);
    self.step(ReplaceAroundStep::new(start, end, gap_start, gap_end, slice, insert, true))
  }

  /// Wrap the content of `range` in `wrappers`, outermost first.
  pub fn wrap(&mut self, range: &NodeRange, wrappers: &[Wrapper]) -> Result<&mut Self> {
    let mut content = Fragment::empty();
    for wrapper in wrappers.iter().rev() {
      if content.size() > 0 {
        let matched = wrapper.ty.content_match().match_fragment(&content);
        if !matched.is_some_and(|m| m.valid_end()) {
          return Err(TransformError::InvalidWrapper {
            name: wrapper.ty.name().to_string(),
          });
        }
      }
      content = Fragment::from(wrapper.ty.create(wrapper.attrs.as_ref(), content, &[])?);
    }
    let (start, end) = (range.start(), range.end());
    let slice = Slice::new(content, 0, 0);
    self.step(ReplaceAroundStep::new(start, end, start, end, slice, wrappers.len(), true))
  }

  /// Give every textblock between `from` and `to` the type `ty` with the
  /// given attributes.
  pub fn set_block_type(&mut self, from: usize, to: usize, ty: &NodeType, attrs: Option<&Attrs>) -> Result<&mut Self> {
    self.set_block_type_with(from, to, ty, |_| attrs.cloned())
  }

  /// Like [`Transform::set_block_type`], computing the attributes from each
  /// node being changed.
  pub fn set_block_type_with(
    &mut self,
    from: usize,
    to: usize,
    ty: &NodeType,
    attrs: impl Fn(&Node) -> Option<Attrs>,
  ) -> Result<&mut Self> {
    if !ty.is_textblock() {
      return Err(TransformError::NotTextblock {
        name: ty.name().to_string(),
      });
    }
    let map_from = self.steps().len();
    let mut targets = Vec::new();
    self.doc().nodes_between(from, to, |node, pos, _, _| {
      if !node.is_textblock() {
        return true;
      }
      let attrs_here = attrs(node);
      if !node.has_markup(ty, attrs_here.as_ref(), &[]) {
        targets.push((node.clone(), pos, attrs_here));
      }
      false
    });

    let convert_newlines = linebreak_conversion(ty);
    for (node, pos, attrs_here) in targets {
      let mapped = self.mapping().slice_from(map_from).map(pos, Assoc::After);
      if !self.can_change_type(mapped, ty)? {
        continue;
      }
      debug!(pos, from = node.ty().name(), to = ty.name(), "changing block type");
      if convert_newlines == Some(false) {
        self.replace_linebreaks(&node, pos, map_from)?;
      }
      let mapped = self.mapping().slice_from(map_from).map(pos, Assoc::After);
      self.clear_incompatible(mapped, ty, None, convert_newlines.is_none())?;
      let mapping = self.mapping().slice_from(map_from);
      let start = mapping.map(pos, Assoc::After);
      let end = mapping.map(pos + node.node_size(), Assoc::After);
      let replacement = ty.create(attrs_here.as_ref(), Fragment::empty(), node.marks())?;
      self.step(ReplaceAroundStep::new(
        start,
        end,
        start + 1,
        end - 1,
        Slice::new(Fragment::from(replacement), 0, 0),
        1,
        true,
      ))?;
      if convert_newlines == Some(true) {
        self.replace_newlines(&node, pos, map_from)?;
      }
    }
    Ok(self)
  }

  fn can_change_type(&self, pos: usize, ty: &NodeType) -> Result<bool> {
    let rpos = self.resolve(pos)?;
    let index = rpos.index(rpos.depth());
    Ok(rpos.parent().can_replace_with(index, index + 1, ty, None))
  }

  /// Replace newlines in the text of `node`, which sat at `pos` before the
  /// steps from `map_from` on, with linebreak replacement nodes.
  fn replace_newlines(&mut self, node: &Node, pos: usize, map_from: usize) -> Result<()> {
    let Some(linebreak) = node.ty().schema().linebreak_replacement() else {
      return Ok(());
    };
    let mut found = Vec::new();
    node.for_each(|child, offset, _| {
      if let Some(text) = child.text() {
        for (index, len) in newlines(text) {
          found.push((pos + 1 + offset + index, len));
        }
      }
    });
    for (at, len) in found {
      let start = self.mapping().slice_from(map_from).map(at, Assoc::After);
      let replacement = linebreak.create(None, Fragment::empty(), &[])?;
      self.replace_with(start, start + len, replacement)?;
    }
    Ok(())
  }

  /// Replace the linebreak replacement nodes in `node` with newlines.
  fn replace_linebreaks(&mut self, node: &Node, pos: usize, map_from: usize) -> Result<()> {
    let schema = node.ty().schema();
    let Some(linebreak) = schema.linebreak_replacement() else {
      return Ok(());
    };
    let mut found = Vec::new();
    node.for_each(|child, offset, _| {
      if *child.ty() == linebreak {
        found.push(pos + 1 + offset);
      }
    });
    for at in found {
      let start = self.mapping().slice_from(map_from).map(at, Assoc::After);
      self.replace_with(start, start + 1, schema.text("\n", &[]))?;
    }
    Ok(())
  }

  /// Change the type, attributes and/or marks of the node at `pos`.
  pub fn set_node_markup(
    &mut self,
    pos: usize,
    ty: Option<&NodeType>,
    attrs: Option<&Attrs>,
    marks: Option<&[Mark]>,
  ) -> Result<&mut Self> {
    let node = self
      .doc()
      .node_at(pos)
      .cloned()
      .ok_or(TransformError::NoNode { pos })?;
    let ty = ty.unwrap_or(node.ty());
    let updated = ty.create(attrs, Fragment::empty(), marks.unwrap_or(node.marks()))?;
    if node.is_leaf() {
      return self.replace_with(pos, pos + node.node_size(), updated);
    }
    if !ty.valid_content(node.content()) {
      return Err(TransformError::InvalidContent {
        name: ty.name().to_string(),
      });
    }
    self.step(ReplaceAroundStep::new(
      pos,
      pos + node.node_size(),
      pos + 1,
      pos + node.node_size() - 1,
      Slice::new(Fragment::from(updated), 0, 0),
      1,
      true,
    ))
  }

  /// Split the node at `pos`, `depth` levels deep. `types_after` optionally
  /// gives the split-off nodes a type, outermost first.
  pub fn split(&mut self, pos: usize, depth: usize, types_after: &[Option<Wrapper>]) -> Result<&mut Self> {
    let rpos = self.resolve(pos)?;
    let mut before = Fragment::empty();
    let mut after = Fragment::empty();
    let base = rpos.depth().saturating_sub(depth);
    for (i, d) in (base + 1..=rpos.depth()).rev().enumerate() {
      let i = depth - 1 - i;
      before = Fragment::from(rpos.node(d).copy(before));
      after = match types_after.get(i) {
        Some(Some(wrapper)) => Fragment::from(wrapper.ty.create(wrapper.attrs.as_ref(), after, &[])?),
        _ => Fragment::from(rpos.node(d).copy(after)),
      };
    }
    let slice = Slice::new(before.append(&after), depth, depth);
    self.step(ReplaceStep::structural(pos, pos, slice))
  }

  /// Join the blocks around `pos`, `depth` levels deep.
  ///
  /// # Panics
  ///
  /// Panics when `depth` is larger than `pos`.
  pub fn join(&mut self, pos: usize, depth: usize) -> Result<&mut Self> {
    let before = self.resolve(pos - depth)?;
    let before_parent = before.parent().clone();
    let before_type = before_parent.ty().clone();
    let convert_newlines = if before_type.inline_content() {
      linebreak_conversion(&before_type)
    } else {
      None
    };
    let map_from = self.steps().len();
    if convert_newlines == Some(false) {
      let after = self.resolve(pos + depth)?;
      let node = after.parent().clone();
      self.replace_linebreaks(&node, after.before(after.depth()), map_from)?;
    }
    if before_type.inline_content() {
      let matched = before_parent.content_match_at(before.index(before.depth()));
      self.clear_incompatible(pos + depth - 1, &before_type, matched, convert_newlines.is_none())?;
    }
    let mapping = self.mapping().slice_from(map_from);
    let start = mapping.map(pos - depth, Assoc::After);
    let end = mapping.map(pos + depth, Assoc::Before);
    self.step(ReplaceStep::structural(start, end, Slice::empty()))?;
    if convert_newlines == Some(true) {
      let full = self.resolve(start)?;
      let node = full.parent().clone();
      let map_from = self.steps().len();
      self.replace_newlines(&node, full.before(full.depth()), map_from)?;
    }
    Ok(self)
  }
}

#[cfg(test)]
mod test {
  use quickcheck::quickcheck;
  use the_model::{
    Schema,
    test_utils::*,
  };

  use super::*;

  fn range(doc: &Node, from: usize, to: usize) -> NodeRange {
    let from = doc.resolve(from).unwrap();
    let to = doc.resolve(to).unwrap();
    from.block_range(&to, None).unwrap()
  }

  fn node_type(name: &str) -> NodeType {
    schema().node_type(name).unwrap()
  }

  #[test]
  fn lifts_out_of_a_blockquote() {
    let doc = doc([blockquote([p([text("a")]), p([text("b")]), p([text("c")])])]);
    let range = range(&doc, 5, 6);
    assert_eq!(lift_target(&range), Some(0));
    let mut tr = Transform::new(doc);
    tr.lift(&range, 0).unwrap();
    assert_eq!(
      tr.doc().to_string(),
      "doc(blockquote(paragraph(\"a\")), paragraph(\"b\"), blockquote(paragraph(\"c\")))"
    );
  }

  #[test]
  fn no_lift_target_at_the_top() {
    let doc = doc([p([text("a")])]);
    assert_eq!(lift_target(&range(&doc, 1, 2)), None);
  }

  #[test]
  fn wraps_paragraphs_in_a_list() {
    let doc = doc([p([text("a")]), p([text("b")])]);
    let range = range(&doc, 1, 2);
    let wrapping = find_wrapping(&range, &node_type("bullet_list"), None, None).unwrap();
    let names: Vec<_> = wrapping.iter().map(|w| w.ty.name().to_string()).collect();
    assert_eq!(names, ["bullet_list", "list_item"]);

    let mut tr = Transform::new(doc);
    tr.wrap(&range, &wrapping).unwrap();
    assert_eq!(
      tr.doc().to_string(),
      "doc(bullet_list(list_item(paragraph(\"a\"))), paragraph(\"b\"))"
    );
  }

  #[test]
  fn rejects_wrappers_that_dont_nest() {
    let doc = doc([p([text("a")])]);
    let range = range(&doc, 1, 2);
    let wrappers = [Wrapper::from(node_type("bullet_list")), Wrapper::from(node_type("paragraph"))];
    let mut tr = Transform::new(doc);
    assert!(matches!(
      tr.wrap(&range, &wrappers),
      Err(TransformError::InvalidWrapper { .. })
    ));
    assert!(find_wrapping(&range, &node_type("horizontal_rule"), None, None).is_none());
  }

  #[test]
  fn sets_block_types() {
    let doc = doc([p([text("a")]), p([text("b")]), pre([text("c")])]);
    let mut tr = Transform::new(doc);
    let mut attrs = Attrs::new();
    attrs.insert("level".into(), 2.into());
    tr.set_block_type(1, 5, &node_type("heading"), Some(&attrs)).unwrap();
    assert_eq!(
      tr.doc().to_string(),
      "doc(heading(\"a\"), heading(\"b\"), code_block(\"c\"))"
    );
    assert_eq!(tr.doc().child(1).attrs()["level"], 2);
    assert!(matches!(
      tr.set_block_type(1, 1, &node_type("blockquote"), None),
      Err(TransformError::NotTextblock { .. })
    ));
  }

  #[test]
  fn set_block_type_clears_disallowed_marks() {
    let doc = doc([p([text("a"), marked("b", &[mark("em")])])]);
    let mut tr = Transform::new(doc);
    tr.set_block_type(1, 1, &node_type("code_block"), None).unwrap();
    assert_eq!(tr.doc().to_string(), "doc(code_block(\"ab\"))");
  }

  #[test]
  fn converts_linebreaks_when_changing_whitespace() {
    let doc = doc([p([text("a"), br(), text("b")])]);
    let mut tr = Transform::new(doc);
    tr.set_block_type(1, 1, &node_type("code_block"), None).unwrap();
    assert_eq!(tr.doc().to_string(), "doc(code_block(\"a\\nb\"))");

    tr.set_block_type(1, 1, &node_type("paragraph"), None).unwrap();
    assert_eq!(tr.doc().to_string(), "doc(paragraph(\"a\", hard_break, \"b\"))");
  }

  #[test]
  fn sets_node_markup() {
    let doc = doc([p([text("a")]), p([img()])]);
    let mut tr = Transform::new(doc);
    tr.set_node_markup(0, Some(&node_type("heading")), None, None).unwrap();
    assert_eq!(tr.doc().child(0).ty().name(), "heading");

    let mut attrs = Attrs::new();
    attrs.insert("src".into(), "other.png".into());
    tr.set_node_markup(4, None, Some(&attrs), None).unwrap();
    assert_eq!(tr.doc().node_at(4).unwrap().attrs()["src"], "other.png");

    assert!(matches!(
      tr.set_node_markup(0, Some(&node_type("bullet_list")), None, None),
      Err(TransformError::InvalidContent { .. })
    ));
    assert!(matches!(
      tr.set_node_markup(99, None, None, None),
      Err(TransformError::NoNode { pos: 99 })
    ));
  }

  #[test]
  fn splits_and_joins() {
    let doc = doc([blockquote([p([text("abcd")])])]);
    assert!(can_split(&doc, 4, 1, &[]));
    assert!(can_split(&doc, 4, 2, &[]));
    assert!(!can_split(&doc, 4, 3, &[]));

    let mut tr = Transform::new(doc.clone());
    tr.split(4, 2, &[]).unwrap();
    assert_eq!(
      tr.doc().to_string(),
      "doc(blockquote(paragraph(\"ab\")), blockquote(paragraph(\"cd\")))"
    );
    let split = tr.doc().clone();
    assert!(can_join(&split, 6));
    assert_eq!(join_point(&split, 4, true), None);
    assert_eq!(join_point(&split, 8, true), Some(6));

    tr.join(6, 2).unwrap();
    assert_eq!(tr.doc(), &doc);
  }

  #[test]
  fn splits_into_a_different_type() {
    let doc = doc([h1([text("title")])]);
    let after = [Some(Wrapper::from(node_type("paragraph")))];
    assert!(can_split(&doc, 6, 1, &after));
    let mut tr = Transform::new(doc);
    tr.split(6, 1, &after).unwrap();
    assert_eq!(tr.doc().to_string(), "doc(heading(\"title\"), paragraph)");
  }

  #[test]
  fn joins_textblocks_and_clears_incompatible_content() {
    let doc = doc([pre([text("x")]), p([text("a"), img()])]);
    assert!(!can_join(&doc, 3));
    let mut tr = Transform::new(doc);
    tr.join(3, 1).unwrap();
    assert_eq!(tr.doc().to_string(), "doc(code_block(\"xa\"))");
  }

  #[test]
  fn finds_insert_and_drop_points() {
    let doc = doc([p([text("ab")]), p([text("cd")])]);
    let hr_type = node_type("horizontal_rule");
    assert_eq!(insert_point(&doc, 1, &hr_type), Some(0));
    assert_eq!(insert_point(&doc, 3, &hr_type), Some(4));
    assert_eq!(insert_point(&doc, 2, &hr_type), None);
    assert_eq!(insert_point(&doc, 4, &hr_type), Some(4));

    let block = Slice::new(Fragment::from(hr()), 0, 0);
    assert_eq!(drop_point(&doc, 2, &block), Some(0));
    assert_eq!(drop_point(&doc, 7, &block), Some(8));
    let inline = Slice::new(Fragment::from(text("x")), 0, 0);
    assert_eq!(drop_point(&doc, 2, &inline), Some(2));
    assert_eq!(drop_point(&doc, 2, &Slice::empty()), Some(2));
  }

  #[test]
  fn joinable_needs_compatible_content() {
    let a = p([text("a")]);
    let b = p([text("b")]);
    assert!(joinable(Some(&a), Some(&b)));
    assert!(!joinable(Some(&a), Some(&hr())));
    assert!(!joinable(Some(&hr()), Some(&a)));
    assert!(!joinable(Some(&a), None));
    assert!(joinable(Some(&pre([text("x")])), Some(&p([text("a"), br()]))));

    let schema = Schema::from_json(
      r#"{ "nodes": { "doc": { "content": "block+" }, "para": { "content": "text*", "group": "block" }, "text": {} } }"#,
    )
    .unwrap();
    let para = schema.node_type("para").unwrap();
    let empty = para.create(None, Fragment::empty(), &[]).unwrap();
    assert!(joinable(Some(&empty), Some(&empty)));
  }

  quickcheck! {
    fn newline_offsets_are_char_based(prefix: String, suffix: String) -> bool {
      let prefix: String = prefix.chars().filter(|c| *c != '\r' && *c != '\n').collect();
      let suffix: String = suffix.chars().filter(|c| *c != '\r' && *c != '\n').collect();
      let text = format!("{prefix}\r\n{suffix}\n");
      let len = prefix.chars().count();
      newlines(&text) == vec![(len, 2), (len + 2 + suffix.chars().count(), 1)]
    }
  }
}
