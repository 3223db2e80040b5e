//! Fitting a slice into a document.
//!
//! A replace can't always put a slice in place verbatim: the open sides of
//! the slice may not match the nodes around the range, or the content may
//! not be valid at the insertion point. The [`Fitter`] works out a step that
//! places as much of the slice as possible, wrapping, opening or dropping
//! nodes where the schema requires it.

use the_model::{
  Attrs,
  ContentMatch,
  Fragment,
  Node,
  NodeType,
  ResolvedPos,
  Slice,
};
use tracing::trace;

use crate::{
  error::Result,
  replace_step::{
    ReplaceAroundStep,
    ReplaceStep,
  },
  step::Step,
  structure::insert_point,
  transform::Transform,
};

/// Compute a step that replaces `from..to` in `doc` with `slice`, fitting
/// the slice into the surrounding structure. Returns `None` when the replace
/// would be a no-op or no fitting exists.
pub fn replace_step(doc: &Node, from: usize, to: usize, slice: &Slice) -> Result<Option<Step>> {
  if from == to && slice.size() == 0 {
    return Ok(None);
  }
  let from_pos = doc.resolve(from)?;
  let to_pos = doc.resolve(to)?;
  if fits_trivially(&from_pos, &to_pos, slice) {
    return Ok(Some(ReplaceStep::new(from, to, slice.clone()).into()));
  }
  Ok(Fitter::new(from_pos, to_pos, slice.clone()).and_then(Fitter::fit))
}

fn fits_trivially(from: &ResolvedPos, to: &ResolvedPos, slice: &Slice) -> bool {
  slice.open_start() == 0
    && slice.open_end() == 0
    && from.start(from.depth()) == to.start(to.depth())
    && from
      .parent()
      .can_replace(from.index(from.depth()), to.index(to.depth()), slice.content())
}

#[derive(Debug, Clone)]
struct FrontierEntry {
  ty:      NodeType,
  matched: ContentMatch,
}

/// Where the next piece of the unplaced slice can go.
#[derive(Debug)]
struct Fittable {
  slice_depth:    usize,
  frontier_depth: usize,
  parent:         Option<Node>,
  inject:         Option<Fragment>,
  wrap:           Option<Vec<NodeType>>,
}

#[derive(Debug)]
struct CloseLevel {
  depth:   usize,
  fit:     Fragment,
  move_to: ResolvedPos,
}

/// Incrementally moves content from `unplaced` into `placed`.
///
/// `frontier` holds the open nodes along the right edge of `placed`, with
/// the content match at their end. `placed` starts as the chain of nodes
/// around `from`.
struct Fitter {
  from:     ResolvedPos,
  to:       ResolvedPos,
  unplaced: Slice,
  frontier: Vec<FrontierEntry>,
  placed:   Fragment,
}

impl Fitter {
  fn new(from: ResolvedPos, to: ResolvedPos, unplaced: Slice) -> Option<Self> {
    let mut frontier = Vec::with_capacity(from.depth() + 1);
    for depth in 0..=from.depth() {
      let node = from.node(depth);
      frontier.push(FrontierEntry {
        ty:      node.ty().clone(),
        matched: node.content_match_at(from.index_after(depth))?,
      });
    }
    let mut placed = Fragment::empty();
    for depth in (1..=from.depth()).rev() {
      placed = Fragment::from(from.node(depth).copy(placed));
    }
    Some(Self {
      from,
      to,
      unplaced,
      frontier,
      placed,
    })
  }

  fn depth(&self) -> usize {
    self.frontier.len() - 1
  }

  fn fit(mut self) -> Option<Step> {
    while self.unplaced.size() > 0 {
      match self.find_fittable() {
        Some(fittable) => self.place_nodes(fittable)?,
        None => {
          if !self.open_more() {
            self.drop_node();
          }
        },
      }
    }

    let move_inline = self.must_move_inline();
    let placed_size = self
      .placed
      .size()
      .saturating_sub(self.depth() + self.from.depth());
    let target = match move_inline {
      Some(pos) => self.from.doc().resolve(pos).ok()?,
      None => self.to.clone(),
    };
    let to = self.close(target)?;

    let mut content = self.placed.clone();
    let mut open_start = self.from.depth();
    let mut open_end = to.depth();
    while open_start > 0 && open_end > 0 && content.child_count() == 1 {
      content = content.child(0).content().clone();
      open_start -= 1;
      open_end -= 1;
    }
    let slice = Slice::new(content, open_start, open_end);
    if let Some(move_inline) = move_inline {
      trace!(from = self.from.pos(), to = move_inline, "moving inline content after the range");
      return Some(
        ReplaceAroundStep::new(
          self.from.pos(),
          move_inline,
          self.to.pos(),
          self.to.end(self.to.depth()),
          slice,
          placed_size,
          false,
        )
        .into(),
      );
    }
    if slice.size() > 0 || self.from.pos() != self.to.pos() {
      return Some(ReplaceStep::new(self.from.pos(), to.pos(), slice).into());
    }
    None
  }

  /// Find a position on the frontier where the start of the unplaced
  /// content fits. The first pass only accepts direct fits (possibly after
  /// injecting filler nodes), the second also tries wrapping.
  fn find_fittable(&self) -> Option<Fittable> {
    let mut start_depth = self.unplaced.open_start();
    let mut cur = self.unplaced.content().clone();
    let mut open_end = self.unplaced.open_end();
    for depth in 0..start_depth {
      let Some(node) = cur.first_child().cloned() else {
        break;
      };
      if cur.child_count() > 1 {
        open_end = 0;
      }
      if node.ty().is_isolating() && open_end <= depth {
        start_depth = depth;
        break;
      }
      cur = node.content().clone();
    }

    for pass in 1..=2 {
      let top = if pass == 1 {
        start_depth
      } else {
        self.unplaced.open_start()
      };
      for slice_depth in (0..=top).rev() {
        let (fragment, parent) = if slice_depth > 0 {
          let parent = content_at(self.unplaced.content(), slice_depth - 1)
            .first_child()
            .cloned();
          let fragment = parent.as_ref().map(|node| node.content().clone()).unwrap_or_default();
          (fragment, parent)
        } else {
          (self.unplaced.content().clone(), None)
        };
        let first = fragment.first_child();
        for frontier_depth in (0..=self.depth()).rev() {
          let FrontierEntry { ty, matched } = &self.frontier[frontier_depth];
          if pass == 1 {
            let inject = match first {
              Some(first) if matched.match_type(first.ty()).is_some() => Some(None),
              Some(first) => matched
                .fill_before(&Fragment::from(first.clone()), false, 0)
                .map(Some),
              None => parent
                .as_ref()
                .filter(|parent| ty.compatible_content(parent.ty()))
                .map(|_| None),
            };
            if let Some(inject) = inject {
              return Some(Fittable {
                slice_depth,
                frontier_depth,
                parent,
                inject,
                wrap: None,
              });
            }
          } else if let Some(wrap) = first.and_then(|first| matched.find_wrapping(first.ty())) {
            return Some(Fittable {
              slice_depth,
              frontier_depth,
              parent,
              inject: None,
              wrap: Some(wrap),
            });
          }
          // Stop looking further up when the parent itself would fit here.
          if parent
            .as_ref()
            .is_some_and(|parent| matched.match_type(parent.ty()).is_some())
          {
            break;
          }
        }
      }
    }
    None
  }

  fn open_more(&mut self) -> bool {
    let content = self.unplaced.content();
    let open_start = self.unplaced.open_start();
    let open_end = self.unplaced.open_end();
    let inner = content_at(content, open_start);
    match inner.first_child() {
      Some(first) if !first.is_leaf() => {},
      _ => return false,
    }
    let open_end = if inner.size() + open_start >= content.size().saturating_sub(open_end) {
      open_end.max(open_start + 1)
    } else {
      open_end
    };
    trace!(depth = open_start + 1, "opening unplaced content");
    self.unplaced = Slice::new(content.clone(), open_start + 1, open_end);
    true
  }

  fn drop_node(&mut self) {
    let content = self.unplaced.content();
    let open_start = self.unplaced.open_start();
    let open_end = self.unplaced.open_end();
    let inner = content_at(content, open_start);
    trace!(depth = open_start, "dropping unplaceable node");
    self.unplaced = if inner.child_count() <= 1 && open_start > 0 {
      let open_at_end = content.size().saturating_sub(open_start) <= open_start + inner.size();
      Slice::new(
        drop_from_fragment(content, open_start - 1, 1),
        open_start - 1,
        if open_at_end { open_start - 1 } else { open_end },
      )
    } else {
      Slice::new(drop_from_fragment(content, open_start, 1), open_start, open_end)
    };
  }

  /// Move content from the unplaced slice at `slice_depth` into the frontier
  /// node at `frontier_depth`.
  fn place_nodes(&mut self, fittable: Fittable) -> Option<()> {
    let Fittable {
      slice_depth,
      mut frontier_depth,
      parent,
      inject,
      wrap,
    } = fittable;
    while self.depth() > frontier_depth {
      self.close_frontier_node();
    }
    if let Some(wrap) = wrap {
      for ty in wrap {
        self.open_frontier_node(ty, None, Fragment::empty())?;
      }
      frontier_depth = self.depth();
    }

    let slice = self.unplaced.clone();
    let fragment = match &parent {
      Some(parent) => parent.content().clone(),
      None => slice.content().clone(),
    };
    let open_start = slice.open_start() - slice_depth;
    let FrontierEntry { ty, mut matched } = self.frontier[frontier_depth].clone();
    let mut add = Vec::new();
    if let Some(inject) = &inject {
      add.extend(inject.iter().cloned());
      matched = matched.match_fragment(inject)?;
    }
    // Number of open nodes at the end of the fragment. Zero means only the
    // parent is open, negative that nothing is.
    let mut open_end_count = (fragment.size() + slice_depth) as isize
      - slice.content().size().saturating_sub(slice.open_end()) as isize;
    let mut taken = 0;
    while taken < fragment.child_count() {
      let next = fragment.child(taken);
      let Some(matches) = matched.match_type(next.ty()) else {
        break;
      };
      taken += 1;
      // Empty open nodes are dropped.
      if taken > 1 || open_start == 0 || next.content().size() > 0 {
        matched = matches;
        let node_open_end = if taken == fragment.child_count() {
          open_end_count
        } else {
          -1
        };
        let marked = next.mark(&ty.allowed_marks(next.marks()));
        add.push(close_node_start(
          &marked,
          if taken == 1 { open_start } else { 0 },
          node_open_end,
        ));
      }
    }
    let to_end = taken == fragment.child_count();
    if !to_end {
      open_end_count = -1;
    }
    trace!(taken, slice_depth, frontier_depth, "placing nodes");

    self.placed = add_to_fragment(&self.placed, frontier_depth, &Fragment::from_vec(add));
    self.frontier[frontier_depth].matched = matched;

    // A fully placed, closed node of the same type as the frontier top
    // closes that frontier node right away.
    if to_end
      && open_end_count < 0
      && parent
        .as_ref()
        .is_some_and(|parent| *parent.ty() == self.frontier[self.depth()].ty)
      && self.frontier.len() > 1
    {
      self.close_frontier_node();
    }

    let mut cur = fragment;
    for _ in 0..open_end_count.max(0) {
      let Some(node) = cur.last_child().cloned() else {
        break;
      };
      let matched = node.content_match_at(node.child_count())?;
      self.frontier.push(FrontierEntry {
        ty: node.ty().clone(),
        matched,
      });
      cur = node.content().clone();
    }

    self.unplaced = if !to_end {
      Slice::new(
        drop_from_fragment(slice.content(), slice_depth, taken),
        slice.open_start(),
        slice.open_end(),
      )
    } else if slice_depth == 0 {
      Slice::empty()
    } else {
      Slice::new(
        drop_from_fragment(slice.content(), slice_depth - 1, 1),
        slice_depth - 1,
        if open_end_count < 0 {
          slice.open_end()
        } else {
          slice_depth - 1
        },
      )
    };
    Some(())
  }

  /// When the range ends inside a textblock and the placed content ends in
  /// one, the inline content after `to` must move into the placed
  /// textblock. Returns the end of the content to move.
  fn must_move_inline(&self) -> Option<usize> {
    if self.to.depth() == 0 || !self.to.parent().is_textblock() {
      return None;
    }
    let top = &self.frontier[self.depth()];
    if !top.ty.is_textblock()
      || content_after_fits(&self.to, self.to.depth(), &top.ty, &top.matched, false).is_none()
    {
      return None;
    }
    if self.to.depth() == self.depth()
      && self
        .find_close_level(&self.to)
        .is_some_and(|level| level.depth == self.depth())
    {
      return None;
    }
    let mut depth = self.to.depth();
    let mut after = self.to.after(depth);
    while depth > 1 {
      depth -= 1;
      if after != self.to.end(depth) {
        break;
      }
      after += 1;
    }
    Some(after)
  }

  fn find_close_level(&self, to: &ResolvedPos) -> Option<CloseLevel> {
    'scan: for depth in (0..=self.depth().min(to.depth())).rev() {
      let FrontierEntry { ty, matched } = &self.frontier[depth];
      let drop_inner = depth < to.depth() && to.end(depth + 1) == to.pos() + (to.depth() - (depth + 1));
      let Some(fit) = content_after_fits(to, depth, ty, matched, drop_inner) else {
        continue;
      };
      for outer in (0..depth).rev() {
        let FrontierEntry { ty, matched } = &self.frontier[outer];
        match content_after_fits(to, outer, ty, matched, true) {
          Some(rest) if rest.child_count() == 0 => {},
          _ => continue 'scan,
        }
      }
      let move_to = if drop_inner {
        to.doc().resolve(to.after(depth + 1)).ok()?
      } else {
        to.clone()
      };
      return Some(CloseLevel {
        depth,
        fit,
        move_to,
      });
    }
    None
  }

  fn close(&mut self, to: ResolvedPos) -> Option<ResolvedPos> {
    let close = self.find_close_level(&to)?;
    trace!(depth = close.depth, "closing fitter");
    while self.depth() > close.depth {
      self.close_frontier_node();
    }
    if close.fit.child_count() > 0 {
      self.placed = add_to_fragment(&self.placed, close.depth, &close.fit);
    }
    let to = close.move_to;
    for depth in close.depth + 1..=to.depth() {
      let node = to.node(depth);
      let add = node
        .ty()
        .content_match()
        .fill_before(node.content(), true, to.index(depth))?;
      self.open_frontier_node(node.ty().clone(), Some(node.attrs()), add)?;
    }
    Some(to)
  }

  fn open_frontier_node(&mut self, ty: NodeType, attrs: Option<&Attrs>, content: Fragment) -> Option<()> {
    let depth = self.depth();
    let top = &mut self.frontier[depth];
    top.matched = top.matched.match_type(&ty)?;
    let node = ty.create(attrs, content, &[]).ok()?;
    self.placed = add_to_fragment(&self.placed, depth, &Fragment::from(node));
    self.frontier.push(FrontierEntry {
      matched: ty.content_match(),
      ty,
    });
    Some(())
  }

  fn close_frontier_node(&mut self) {
    let Some(open) = self.frontier.pop() else {
      return;
    };
    if let Some(add) = open.matched.fill_before(&Fragment::empty(), true, 0) {
      if add.child_count() > 0 {
        self.placed = add_to_fragment(&self.placed, self.frontier.len(), &add);
      }
    }
  }
}

fn drop_from_fragment(fragment: &Fragment, depth: usize, count: usize) -> Fragment {
  if depth == 0 {
    return fragment.cut_by_index(count.min(fragment.child_count()), fragment.child_count());
  }
  match fragment.first_child() {
    Some(first) => fragment.replace_child(0, first.copy(drop_from_fragment(first.content(), depth - 1, count))),
    None => fragment.clone(),
  }
}

fn add_to_fragment(fragment: &Fragment, depth: usize, content: &Fragment) -> Fragment {
  if depth == 0 {
    return fragment.append(content);
  }
  match fragment.last_child() {
    Some(last) => fragment.replace_child(
      fragment.child_count() - 1,
      last.copy(add_to_fragment(last.content(), depth - 1, content)),
    ),
    None => fragment.clone(),
  }
}

fn content_at(fragment: &Fragment, depth: usize) -> Fragment {
  let mut fragment = fragment.clone();
  for _ in 0..depth {
    let Some(first) = fragment.first_child().cloned() else {
      break;
    };
    fragment = first.content().clone();
  }
  fragment
}

/// Complete the start of an open node by filling in required content before
/// its children, and after them when the node isn't open at its end.
fn close_node_start(node: &Node, open_start: usize, open_end: isize) -> Node {
  if open_start == 0 {
    return node.clone();
  }
  let mut content = node.content().clone();
  if open_start > 1 {
    if let Some(first) = content.first_child().cloned() {
      let inner_end = if content.child_count() == 1 { open_end - 1 } else { 0 };
      content = content.replace_child(0, close_node_start(&first, open_start - 1, inner_end));
    }
  }
  let start = node.ty().content_match();
  if let Some(before) = start.fill_before(&content, false, 0) {
    content = before.append(&content);
  }
  if open_end <= 0 {
    let after = start
      .match_fragment(&content)
      .and_then(|matched| matched.fill_before(&Fragment::empty(), true, 0));
    if let Some(after) = after {
      content = content.append(&after);
    }
  }
  node.copy(content)
}

/// The filler needed so the content after `to` at `depth` can follow a node
/// of type `ty` in state `matched`.
fn content_after_fits(
  to: &ResolvedPos,
  depth: usize,
  ty: &NodeType,
  matched: &ContentMatch,
  open: bool,
) -> Option<Fragment> {
  let node = to.node(depth);
  let index = if open {
    to.index_after(depth)
  } else {
    to.index(depth)
  };
  if index == node.child_count() && !ty.compatible_content(node.ty()) {
    return None;
  }
  let fit = matched.fill_before(node.content(), true, index)?;
  (!invalid_marks(ty, node.content(), index)).then_some(fit)
}

fn invalid_marks(ty: &NodeType, fragment: &Fragment, start: usize) -> bool {
  fragment
    .iter()
    .skip(start)
    .any(|child| !ty.allows_marks(child.marks()))
}

fn defines_content(ty: &NodeType) -> bool {
  ty.spec().defining || ty.is_defining_for_content()
}

/// Depths at which `from..to` spans the whole content of the node.
fn covered_depths(from: &ResolvedPos, to: &ResolvedPos) -> Vec<usize> {
  let mut result = Vec::new();
  for depth in (0..=from.depth().min(to.depth())).rev() {
    let start = from.start(depth);
    if start + (from.depth() - depth) < from.pos()
      || to.end(depth) > to.pos() + (to.depth() - depth)
      || from.node(depth).ty().is_isolating()
      || to.node(depth).ty().is_isolating()
    {
      break;
    }
    if start == to.start(depth)
      || (depth == from.depth()
        && depth == to.depth()
        && depth > 0
        && from.parent().inline_content()
        && to.parent().inline_content()
        && to.start(depth - 1) + 1 == start)
    {
      result.push(depth);
    }
  }
  result
}

/// Close the open start of `fragment` from `old_open` down to `new_open`
/// levels.
fn close_fragment(fragment: &Fragment, depth: usize, old_open: usize, new_open: usize, parent: Option<&Node>) -> Fragment {
  let mut fragment = fragment.clone();
  if depth < old_open {
    if let Some(first) = fragment.first_child().cloned() {
      let inner = close_fragment(first.content(), depth + 1, old_open, new_open, Some(&first));
      fragment = fragment.replace_child(0, first.copy(inner));
    }
  }
  if depth > new_open {
    if let Some(matched) = parent.and_then(|parent| parent.content_match_at(0)) {
      let start = match matched.fill_before(&fragment, false, 0) {
        Some(before) => before.append(&fragment),
        None => fragment.clone(),
      };
      let end = matched
        .match_fragment(&start)
        .and_then(|end| end.fill_before(&Fragment::empty(), true, 0));
      fragment = match end {
        Some(end) => start.append(&end),
        None => start,
      };
    }
  }
  fragment
}

impl Transform {
  /// Replace `from..to` with `slice`, expanding the range to cover whole
  /// nodes when the slice's open sides fit better that way.
  pub fn replace_range(&mut self, from: usize, to: usize, slice: &Slice) -> Result<&mut Self> {
    if slice.size() == 0 {
      return self.delete_range(from, to);
    }
    let from_pos = self.resolve(from)?;
    let to_pos = self.resolve(to)?;
    if fits_trivially(&from_pos, &to_pos, slice) {
      return self.step(ReplaceStep::new(from, to, slice.clone()));
    }

    let mut target_depths: Vec<isize> = covered_depths(&from_pos, &to_pos)
      .into_iter()
      .map(|depth| depth as isize)
      .collect();
    // The document itself can't be replaced.
    if target_depths.last() == Some(&0) {
      target_depths.pop();
    }
    // Negative depths mean replacing from before the node at that depth up
    // to `to`, rather than the whole node.
    let mut preferred_target = -(from_pos.depth() as isize + 1);
    target_depths.insert(0, preferred_target);
    let mut pos = from_pos.pos();
    for depth in (1..=from_pos.depth()).rev() {
      let ty = from_pos.node(depth).ty();
      if ty.spec().defining || ty.is_defining_as_context() || ty.is_isolating() {
        break;
      }
      pos -= 1;
      if target_depths.contains(&(depth as isize)) {
        preferred_target = depth as isize;
      } else if from_pos.before(depth) == pos {
        target_depths.insert(1, -(depth as isize));
      }
    }
    let preferred_target_index = target_depths
      .iter()
      .position(|&depth| depth == preferred_target)
      .unwrap_or(0);

    let mut left_nodes = Vec::new();
    let mut content = slice.content().clone();
    for depth in 0..=slice.open_start() {
      let Some(node) = content.first_child().cloned() else {
        break;
      };
      content = node.content().clone();
      left_nodes.push(node);
      if depth == slice.open_start() {
        break;
      }
    }

    // Back up the preferred depth to cover defining textblocks directly
    // above it, possibly skipping a non-defining textblock.
    let mut preferred_depth = slice.open_start();
    for depth in (0..slice.open_start()).rev() {
      let Some(left) = left_nodes.get(depth) else {
        continue;
      };
      let defining = defines_content(left.ty());
      let context = from_pos.node(preferred_target.unsigned_abs() - 1);
      if defining && !left.same_markup(context) {
        preferred_depth = depth;
      } else if defining || !left.ty().is_textblock() {
        break;
      }
    }

    let open_start = slice.open_start();
    for j in (0..=open_start).rev() {
      let open_depth = (j + preferred_depth + 1) % (open_start + 1);
      let Some(insert) = left_nodes.get(open_depth) else {
        continue;
      };
      for i in 0..target_depths.len() {
        let target = target_depths[(i + preferred_target_index) % target_depths.len()];
        let expand = target >= 0;
        let target_depth = target.unsigned_abs();
        if target_depth == 0 {
          continue;
        }
        let parent = from_pos.node(target_depth - 1);
        let index = from_pos.index(target_depth - 1);
        if parent.can_replace_with(index, index, insert.ty(), Some(insert.marks())) {
          let end = if expand { to_pos.after(target_depth) } else { to };
          let closed = close_fragment(slice.content(), 0, open_start, open_depth, None);
          let slice = Slice::new(closed, open_depth, slice.open_end());
          return self.replace(from_pos.before(target_depth), end, &slice);
        }
      }
    }

    let start_steps = self.steps().len();
    let (mut from, mut to) = (from, to);
    for &depth in target_depths.iter().rev() {
      self.replace(from, to, slice)?;
      if self.steps().len() > start_steps {
        break;
      }
      if depth < 0 {
        continue;
      }
      from = from_pos.before(depth as usize);
      to = to_pos.after(depth as usize);
    }
    Ok(self)
  }

  /// Replace `from..to` with `node`. An empty range in a non-empty parent
  /// that can't hold a block node is moved to a nearby position that can.
  pub fn replace_range_with(&mut self, from: usize, to: usize, node: Node) -> Result<&mut Self> {
    let (mut from, mut to) = (from, to);
    if !node.is_inline() && from == to && self.resolve(from)?.parent().content().size() > 0 {
      if let Some(point) = insert_point(self.doc(), from, node.ty()) {
        from = point;
        to = point;
      }
    }
    self.replace_range(from, to, &Slice::new(Fragment::from(node), 0, 0))
  }

  /// Delete `from..to`, widening the range to whole nodes when it covers
  /// their entire content.
  pub fn delete_range(&mut self, from: usize, to: usize) -> Result<&mut Self> {
    let from_pos = self.resolve(from)?;
    let to_pos = self.resolve(to)?;
    let covered = covered_depths(&from_pos, &to_pos);
    for (i, &depth) in covered.iter().enumerate() {
      let last = i + 1 == covered.len();
      if (last && depth == 0) || from_pos.node(depth).ty().content_match().valid_end() {
        return self.delete(from_pos.start(depth), to_pos.end(depth));
      }
      if depth > 0
        && (last
          || from_pos.node(depth - 1).can_replace(
            from_pos.index(depth - 1),
            to_pos.index_after(depth - 1),
            &Fragment::empty(),
          ))
      {
        return self.delete(from_pos.before(depth), to_pos.after(depth));
      }
    }
    for depth in 1..=from_pos.depth().min(to_pos.depth()) {
      if from - from_pos.start(depth) == from_pos.depth() - depth
        && to > from_pos.end(depth)
        && to_pos.end(depth) - to != to_pos.depth() - depth
        && from_pos.start(depth - 1) == to_pos.start(depth - 1)
        && from_pos.node(depth - 1).can_replace(
          from_pos.index(depth - 1),
          to_pos.index(depth - 1),
          &Fragment::empty(),
        )
      {
        return self.delete(from_pos.before(depth), to);
      }
    }
    self.delete(from, to)
  }
}
