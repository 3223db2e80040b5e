//! Replacing a range of a document with a slice.
//!
//! The range is described by two resolved positions. The slice's open start
//! is joined onto the node at `from`, its open end onto the node at `to`,
//! and every node that gets new content along the way is checked against
//! its type.

use crate::{
  error::ReplaceError,
  fragment::Fragment,
  node::Node,
  resolved_pos::ResolvedPos,
  slice::Slice,
};

type Result<T> = std::result::Result<T, ReplaceError>;

pub(crate) fn replace(from: &ResolvedPos, to: &ResolvedPos, slice: &Slice) -> Result<Node> {
  if slice.open_start > from.depth() {
    return Err(ReplaceError::TooDeep);
  }
  if from.depth() - slice.open_start + slice.open_end != to.depth() {
    return Err(ReplaceError::InconsistentOpenDepths);
  }
  replace_outer(from, to, slice, 0)
}

fn replace_outer(from: &ResolvedPos, to: &ResolvedPos, slice: &Slice, depth: usize) -> Result<Node> {
  let index = from.index(depth);
  let node = from.node(depth);
  if index == to.index(depth) && depth < from.depth() - slice.open_start {
    let inner = replace_outer(from, to, slice, depth + 1)?;
    Ok(node.copy(node.content().replace_child(index, inner)))
  } else if slice.content.size() == 0 {
    close(node, replace_two_way(from, to, depth)?)
  } else if slice.open_start == 0 && slice.open_end == 0 && from.depth() == depth && to.depth() == depth {
    let parent = from.parent();
    let content = parent.content();
    close(
      parent,
      content
        .cut(0, from.parent_offset())
        .append(&slice.content)
        .append(&content.cut(to.parent_offset(), content.size())),
    )
  } else {
    let (start, end) = prepare_slice_for_replace(slice, from)?;
    close(node, replace_three_way(from, &start, &end, to, depth)?)
  }
}

fn check_join(main: &Node, sub: &Node) -> Result<()> {
  if !sub.ty().compatible_content(main.ty()) {
    return Err(ReplaceError::CannotJoin {
      sub:  sub.ty().name().to_string(),
      main: main.ty().name().to_string(),
    });
  }
  Ok(())
}

fn joinable(before: &ResolvedPos, after: &ResolvedPos, depth: usize) -> Result<Node> {
  let node = before.node(depth).clone();
  check_join(&node, after.node(depth))?;
  Ok(node)
}

fn add_node(child: Node, target: &mut Vec<Node>) {
  if let Some(last) = target.last_mut() {
    if child.is_text() && child.same_markup(last) {
      let joined = format!("{}{}", last.text().unwrap_or(""), child.text().unwrap_or(""));
      *last = last.with_text(&joined);
      return;
    }
  }
  target.push(child);
}

fn add_range(start: Option<&ResolvedPos>, end: Option<&ResolvedPos>, depth: usize, target: &mut Vec<Node>) {
  let Some(node) = end.or(start).map(|pos| pos.node(depth)) else {
    return;
  };
  let mut start_index = 0;
  let end_index = end.map_or(node.child_count(), |end| end.index(depth));
  if let Some(start) = start {
    start_index = start.index(depth);
    if start.depth() > depth {
      start_index += 1;
    } else if start.text_offset() > 0 {
      if let Some(after) = start.node_after() {
        add_node(after, target);
      }
      start_index += 1;
    }
  }
  for i in start_index..end_index {
    add_node(node.child(i).clone(), target);
  }
  if let Some(end) = end {
    if end.depth() == depth && end.text_offset() > 0 {
      if let Some(before) = end.node_before() {
        add_node(before, target);
      }
    }
  }
}

fn close(node: &Node, content: Fragment) -> Result<Node> {
  node.ty().check_content(&content)?;
  Ok(node.copy(content))
}

fn replace_three_way(
  from: &ResolvedPos,
  start: &ResolvedPos,
  end: &ResolvedPos,
  to: &ResolvedPos,
  depth: usize,
) -> Result<Fragment> {
  let open_start = if from.depth() > depth {
    Some(joinable(from, start, depth + 1)?)
  } else {
    None
  };
  let open_end = if to.depth() > depth {
    Some(joinable(end, to, depth + 1)?)
  } else {
    None
  };

  let mut content = Vec::new();
  add_range(None, Some(from), depth, &mut content);
  match (&open_start, &open_end) {
    (Some(open_start), Some(open_end)) if start.index(depth) == end.index(depth) => {
      check_join(open_start, open_end)?;
      let inner = replace_three_way(from, start, end, to, depth + 1)?;
      add_node(close(open_start, inner)?, &mut content);
    },
    _ => {
      if let Some(open_start) = &open_start {
        let inner = replace_two_way(from, start, depth + 1)?;
        add_node(close(open_start, inner)?, &mut content);
      }
      add_range(Some(start), Some(end), depth, &mut content);
      if let Some(open_end) = &open_end {
        let inner = replace_two_way(end, to, depth + 1)?;
        add_node(close(open_end, inner)?, &mut content);
      }
    },
  }
  add_range(Some(to), None, depth, &mut content);
  Ok(Fragment::from_vec(content))
}

fn replace_two_way(from: &ResolvedPos, to: &ResolvedPos, depth: usize) -> Result<Fragment> {
  let mut content = Vec::new();
  add_range(None, Some(from), depth, &mut content);
  if from.depth() > depth {
    let ty = joinable(from, to, depth + 1)?;
    let inner = replace_two_way(from, to, depth + 1)?;
    add_node(close(&ty, inner)?, &mut content);
  }
  add_range(Some(to), None, depth, &mut content);
  Ok(Fragment::from_vec(content))
}

fn prepare_slice_for_replace(slice: &Slice, along: &ResolvedPos) -> Result<(ResolvedPos, ResolvedPos)> {
  let extra = along.depth() - slice.open_start;
  let parent = along.node(extra);
  if parent.is_text() {
    return Err(ReplaceError::InsertIntoLeaf);
  }
  let mut node = parent.copy(slice.content.clone());
  for depth in (0..extra).rev() {
    node = along.node(depth).copy(Fragment::from(node));
  }
  let start = node.resolve(slice.open_start + extra)?;
  let end = node.resolve(node.content().size() - slice.open_end - extra)?;
  Ok((start, end))
}
