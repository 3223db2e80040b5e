//! Position mapping.
//!
//! Every step produces a [`StepMap`] describing which ranges of the old
//! document were replaced by ranges of which size in the new one. Positions
//! held outside the document (cursors, decorations, collaborator carets) are
//! moved through these maps to stay pointed at the same content.
//!
//! A [`Mapping`] chains step maps. It can record that one map is the inverse
//! of an earlier one (a mirror), which lets positions inside content that
//! was deleted and then restored come back to exactly where they were.
//!
//! ```ignore
//! // Two characters inserted at 1, then the range 1..3 deleted again.
//! let mut mapping = Mapping::new();
//! mapping.append_map(StepMap::new(vec![MapRange::new(1, 0, 2)]), None);
//! mapping.append_map(StepMap::new(vec![MapRange::new(1, 2, 0)]), None);
//! assert_eq!(mapping.map(5, Assoc::After), 5);
//! ```

use std::sync::Arc;

use bitflags::bitflags;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Assoc {
  /// Stay before content inserted at the position.
  Before,
  /// Move after content inserted at the position.
  #[default]
  After,
}

impl Assoc {
  fn is_before(self) -> bool {
    self == Assoc::Before
  }
}

bitflags! {
  /// Which side(s) of a mapped position had content deleted.
  #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
  pub struct DelInfo: u8 {
    /// The token before the position was deleted.
    const BEFORE = 1;
    /// The token after the position was deleted.
    const AFTER  = 2;
    /// A range around the position was deleted.
    const ACROSS = 4;
    /// The token on the associated side was deleted.
    const SIDE   = 8;
  }
}

/// Identifies the range a position fell into and its offset inside it, so
/// that a mirrored map can put it back in the same place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Recover {
  pub index:  usize,
  pub offset: usize,
}

/// The outcome of mapping a position, including deletion information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
  pub pos:      usize,
  pub del_info: DelInfo,
  pub recover:  Option<Recover>,
}

impl MapResult {
  fn new(pos: usize, del_info: DelInfo, recover: Option<Recover>) -> Self {
    Self {
      pos,
      del_info,
      recover,
    }
  }

  /// The content on the side the position associates with was deleted.
  pub fn deleted(&self) -> bool {
    self.del_info.contains(DelInfo::SIDE)
  }

  pub fn deleted_before(&self) -> bool {
    self.del_info.intersects(DelInfo::BEFORE | DelInfo::SIDE)
  }

  pub fn deleted_after(&self) -> bool {
    self.del_info.intersects(DelInfo::AFTER | DelInfo::SIDE)
  }

  /// The position sat strictly inside a deleted range.
  pub fn deleted_across(&self) -> bool {
    self.del_info.contains(DelInfo::ACROSS)
  }
}

/// Something positions can be mapped through.
pub trait Mappable {
  fn map(&self, pos: usize, assoc: Assoc) -> usize;
  fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult;
}

/// A replaced range: `old_size` tokens at `start` became `new_size` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapRange {
  pub start:    usize,
  pub old_size: usize,
  pub new_size: usize,
}

impl MapRange {
  pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
    Self {
      start,
      old_size,
      new_size,
    }
  }

  fn sizes(&self, inverted: bool) -> (usize, usize) {
    if inverted {
      (self.new_size, self.old_size)
    } else {
      (self.old_size, self.new_size)
    }
  }
}

/// The position changes made by a single step: a list of replaced ranges,
/// sorted by start, in the coordinates of the document before the step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepMap {
  ranges:   Arc<[MapRange]>,
  inverted: bool,
}

impl StepMap {
  pub fn new(ranges: Vec<MapRange>) -> Self {
    Self {
      ranges:   ranges.into(),
      inverted: false,
    }
  }

  /// A map that changes nothing.
  pub fn empty() -> Self {
    Self::default()
  }

  /// A map that shifts every position by `n`: an insertion of `n` tokens at
  /// the start of the document for positive `n`, a deletion otherwise.
  pub fn offset(n: isize) -> Self {
    match n {
      0 => Self::empty(),
      n if n < 0 => Self::new(vec![MapRange::new(0, n.unsigned_abs(), 0)]),
      n => Self::new(vec![MapRange::new(0, 0, n.unsigned_abs())]),
    }
  }

  pub fn ranges(&self) -> &[MapRange] {
    &self.ranges
  }

  pub fn is_inverted(&self) -> bool {
    self.inverted
  }

  /// The inverse map, mapping positions in the new document back to the
  /// old one. Shares its ranges with `self`.
  pub fn invert(&self) -> StepMap {
    StepMap {
      ranges:   Arc::clone(&self.ranges),
      inverted: !self.inverted,
    }
  }

  /// Map a position produced by a [`Recover`] token of this map.
  pub fn recover(&self, recover: Recover) -> usize {
    let mut diff: isize = 0;
    if !self.inverted {
      for range in &self.ranges[..recover.index] {
        diff += range.new_size as isize - range.old_size as isize;
      }
    }
    (self.ranges[recover.index].start as isize + diff) as usize + recover.offset
  }

  /// Whether the range identified by `recover` touches `pos`.
  pub fn touches(&self, pos: usize, recover: Recover) -> bool {
    let mut diff: isize = 0;
    for (i, range) in self.ranges.iter().enumerate() {
      let start = self.start_of(range, diff);
      if start > pos as isize {
        break;
      }
      let (old_size, new_size) = range.sizes(self.inverted);
      let end = start + old_size as isize;
      if pos as isize <= end && i == recover.index {
        return true;
      }
      diff += new_size as isize - old_size as isize;
    }
    false
  }

  /// Call `f(old_start, old_end, new_start, new_end)` for every changed
  /// range.
  pub fn for_each(&self, mut f: impl FnMut(usize, usize, usize, usize)) {
    let mut diff: isize = 0;
    for range in self.ranges.iter() {
      let old_start = self.start_of(range, diff);
      let new_start = if self.inverted {
        range.start as isize
      } else {
        range.start as isize + diff
      };
      let (old_size, new_size) = range.sizes(self.inverted);
      f(
        old_start as usize,
        old_start as usize + old_size,
        new_start as usize,
        new_start as usize + new_size,
      );
      diff += new_size as isize - old_size as isize;
    }
  }

  fn start_of(&self, range: &MapRange, diff: isize) -> isize {
    if self.inverted {
      range.start as isize - diff
    } else {
      range.start as isize
    }
  }

  fn map_inner(&self, pos: usize, assoc: Assoc) -> MapResult {
    let mut diff: isize = 0;
    let at = pos as isize;
    for (i, range) in self.ranges.iter().enumerate() {
      let start = self.start_of(range, diff);
      if start > at {
        break;
      }
      let (old_size, new_size) = range.sizes(self.inverted);
      let end = start + old_size as isize;
      if at <= end {
        let before = if old_size == 0 {
          assoc.is_before()
        } else if at == start {
          true
        } else if at == end {
          false
        } else {
          assoc.is_before()
        };
        let result = start + diff + if before { 0 } else { new_size as isize };
        let edge = if assoc.is_before() { start } else { end };
        let recover = (at != edge).then(|| {
          Recover {
            index:  i,
            offset: (at - start) as usize,
          }
        });
        let mut del = if at == start {
          DelInfo::AFTER
        } else if at == end {
          DelInfo::BEFORE
        } else {
          DelInfo::ACROSS
        };
        if at != edge {
          del |= DelInfo::SIDE;
        }
        return MapResult::new(result as usize, del, recover);
      }
      diff += new_size as isize - old_size as isize;
    }
    MapResult::new((at + diff) as usize, DelInfo::empty(), None)
  }
}

impl Mappable for StepMap {
  fn map(&self, pos: usize, assoc: Assoc) -> usize {
    self.map_inner(pos, assoc).pos
  }

  fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
    self.map_inner(pos, assoc)
  }
}

/// A pipeline of step maps, with an optional window (`from..to`) selecting
/// the maps that are actually applied and mirror pairs linking a map to its
/// inverse.
///
/// Clones and slices share the map list until one of them appends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
  maps:    Arc<Vec<StepMap>>,
  mirrors: Arc<Vec<(usize, usize)>>,
  from:    usize,
  to:      usize,
}

impl Mapping {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_maps(maps: Vec<StepMap>) -> Self {
    let to = maps.len();
    Self {
      maps: Arc::new(maps),
      mirrors: Arc::default(),
      from: 0,
      to,
    }
  }

  /// Every map in the pipeline, including those outside the window.
  pub fn maps(&self) -> &[StepMap] {
    &self.maps
  }

  pub fn from(&self) -> usize {
    self.from
  }

  pub fn to(&self) -> usize {
    self.to
  }

  /// A mapping applying only the maps in `from..to`, keeping mirror
  /// information.
  pub fn slice(&self, from: usize, to: usize) -> Mapping {
    Mapping {
      maps: self.maps.clone(),
      mirrors: self.mirrors.clone(),
      from,
      to,
    }
  }

  /// Shorthand for `slice(from, maps().len())`.
  pub fn slice_from(&self, from: usize) -> Mapping {
    self.slice(from, self.maps.len())
  }

  /// Add a map at the end. When `mirrors` is given it names the index of
  /// the map this one inverts.
  pub fn append_map(&mut self, map: StepMap, mirrors: Option<usize>) {
    Arc::make_mut(&mut self.maps).push(map);
    self.to = self.maps.len();
    if let Some(mirror) = mirrors {
      self.set_mirror(self.maps.len() - 1, mirror);
    }
  }

  /// Append every map of `mapping`, preserving its mirror pairs.
  pub fn append_mapping(&mut self, mapping: &Mapping) {
    let start = self.maps.len();
    for (i, map) in mapping.maps.iter().enumerate() {
      let mirror = mapping.get_mirror(i).filter(|&m| m < i).map(|m| start + m);
      self.append_map(map.clone(), mirror);
    }
  }

  /// Append the inverse of `mapping`, last map first.
  pub fn append_mapping_inverted(&mut self, mapping: &Mapping) {
    let total = self.maps.len() + mapping.maps.len();
    for i in (0..mapping.maps.len()).rev() {
      let mirror = mapping.get_mirror(i).filter(|&m| m > i).map(|m| total - m - 1);
      self.append_map(mapping.maps[i].invert(), mirror);
    }
  }

  /// The mapping that undoes this one.
  pub fn invert(&self) -> Mapping {
    let mut inverse = Mapping::new();
    inverse.append_mapping_inverted(self);
    inverse
  }

  /// The index of the map mirroring map `n`, if any.
  pub fn get_mirror(&self, n: usize) -> Option<usize> {
    self.mirrors.iter().find_map(|&(a, b)| {
      if a == n {
        Some(b)
      } else if b == n {
        Some(a)
      } else {
        None
      }
    })
  }

  /// Record that maps `n` and `m` invert each other.
  pub fn set_mirror(&mut self, n: usize, m: usize) {
    Arc::make_mut(&mut self.mirrors).push((n, m));
  }

  fn map_inner(&self, mut pos: usize, assoc: Assoc) -> MapResult {
    let mut del_info = DelInfo::empty();
    let mut i = self.from;
    while i < self.to {
      let result = self.maps[i].map_result(pos, assoc);
      if let Some(recover) = result.recover {
        if let Some(corr) = self.get_mirror(i).filter(|&c| c > i && c < self.to) {
          pos = self.maps[corr].recover(recover);
          i = corr + 1;
          continue;
        }
      }
      del_info |= result.del_info;
      pos = result.pos;
      i += 1;
    }
    MapResult::new(pos, del_info, None)
  }
}

impl Mappable for Mapping {
  fn map(&self, pos: usize, assoc: Assoc) -> usize {
    if !self.mirrors.is_empty() {
      return self.map_inner(pos, assoc).pos;
    }
    self.maps[self.from..self.to]
      .iter()
      .fold(pos, |pos, map| map.map(pos, assoc))
  }

  fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
    self.map_inner(pos, assoc)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn insert(at: usize, size: usize) -> StepMap {
    StepMap::new(vec![MapRange::new(at, 0, size)])
  }

  fn delete(from: usize, to: usize) -> StepMap {
    StepMap::new(vec![MapRange::new(from, to - from, 0)])
  }

  #[test]
  fn maps_around_insertions() {
    let map = insert(2, 4);
    assert_eq!(map.map(0, Assoc::After), 0);
    assert_eq!(map.map(2, Assoc::Before), 2);
    assert_eq!(map.map(2, Assoc::After), 6);
    assert_eq!(map.map(3, Assoc::After), 7);
  }

  #[test]
  fn reports_deletions() {
    let map = delete(2, 6);
    let inside = map.map_result(4, Assoc::After);
    assert_eq!(inside.pos, 2);
    assert!(inside.deleted() && inside.deleted_across());
    assert_eq!(inside.recover, Some(Recover { index: 0, offset: 2 }));

    let start = map.map_result(2, Assoc::Before);
    assert!(!start.deleted() && start.deleted_after() && !start.deleted_before());
    let start_after = map.map_result(2, Assoc::After);
    assert!(start_after.deleted());

    let end = map.map_result(6, Assoc::After);
    assert_eq!(end.pos, 2);
    assert!(end.deleted_before() && !end.deleted());
    assert_eq!(map.map(8, Assoc::After), 4);
  }

  #[test]
  fn inverts_in_constant_time() {
    let map = StepMap::new(vec![MapRange::new(2, 4, 1), MapRange::new(10, 0, 3)]);
    let inverse = map.invert();
    assert!(Arc::ptr_eq(&map.ranges, &inverse.ranges));
    for pos in [0, 1, 7, 9, 20] {
      assert_eq!(inverse.map(map.map(pos, Assoc::After), Assoc::After), pos);
    }
    assert_eq!(inverse.invert(), map);
  }

  #[test]
  fn for_each_reports_both_coordinates() {
    let map = StepMap::new(vec![MapRange::new(2, 4, 1), MapRange::new(10, 0, 3)]);
    let mut seen = Vec::new();
    map.for_each(|a, b, c, d| seen.push((a, b, c, d)));
    assert_eq!(seen, [(2, 6, 2, 3), (10, 10, 7, 10)]);

    let mut seen = Vec::new();
    map.invert().for_each(|a, b, c, d| seen.push((a, b, c, d)));
    assert_eq!(seen, [(2, 3, 2, 6), (7, 10, 10, 10)]);
  }

  #[test]
  fn offset_maps() {
    assert_eq!(StepMap::offset(3).map(5, Assoc::After), 8);
    assert_eq!(StepMap::offset(-2).map(5, Assoc::After), 3);
    assert_eq!(StepMap::offset(0), StepMap::empty());
  }

  #[test]
  fn touches_and_recover() {
    let map = delete(2, 6);
    let result = map.map_result(4, Assoc::After);
    let recover = result.recover.unwrap();
    assert!(map.touches(2, recover));
    assert!(!map.touches(8, recover));
    assert_eq!(map.invert().recover(recover), 4);
  }

  #[test]
  fn mirrored_maps_restore_positions() {
    let mut mapping = Mapping::new();
    let del = delete(2, 6);
    mapping.append_map(del.clone(), None);
    mapping.append_map(del.invert(), Some(0));
    assert_eq!(mapping.map(4, Assoc::After), 4);
    assert_eq!(mapping.map(4, Assoc::Before), 4);
    assert_eq!(mapping.get_mirror(1), Some(0));

    let mut plain = Mapping::new();
    plain.append_map(del.clone(), None);
    plain.append_map(del.invert(), None);
    assert_eq!(plain.map(4, Assoc::After), 6);
  }

  #[test]
  fn slices_and_inverts_mappings() {
    let mapping = Mapping::from_maps(vec![insert(0, 2), delete(4, 6), insert(1, 1)]);
    assert_eq!(mapping.slice(1, 2).map(8, Assoc::After), 6);
    assert_eq!(mapping.slice_from(2).map(3, Assoc::After), 4);

    let inverse = mapping.invert();
    for pos in [0, 1, 10] {
      assert_eq!(inverse.map(mapping.map(pos, Assoc::After), Assoc::After), pos);
    }

    let mut joined = Mapping::new();
    joined.append_mapping(&mapping);
    assert_eq!(joined.map(7, Assoc::After), mapping.map(7, Assoc::After));
  }

  #[test]
  fn slices_share_maps_until_appended() {
    let mut mapping = Mapping::new();
    mapping.append_map(insert(0, 2), None);
    mapping.append_map(insert(0, 2).invert(), Some(0));
    let slice = mapping.slice_from(1);
    assert!(Arc::ptr_eq(&slice.maps, &mapping.maps));
    assert!(Arc::ptr_eq(&slice.mirrors, &mapping.mirrors));

    mapping.append_map(insert(5, 1), None);
    assert!(!Arc::ptr_eq(&slice.maps, &mapping.maps));
    assert_eq!(slice.maps().len(), 2);
    assert_eq!(slice.map(4, Assoc::After), 2);
    assert_eq!(mapping.map(1, Assoc::After), 1);
  }

  quickcheck::quickcheck! {
    fn mapping_equals_sequential_maps(edits: Vec<(u8, u8, u8)>, pos: u8) -> bool {
      let maps: Vec<StepMap> = edits
        .iter()
        .map(|&(start, old, new)| {
          StepMap::new(vec![MapRange::new(start as usize % 16, old as usize % 8, new as usize % 8)])
        })
        .collect();
      let mapping = Mapping::from_maps(maps.clone());
      let pos = pos as usize;
      let sequential = maps.iter().fold(pos, |pos, map| map.map(pos, Assoc::After));
      mapping.map(pos, Assoc::After) == sequential
        && mapping.map_result(pos, Assoc::After).pos == sequential
    }
  }
}
