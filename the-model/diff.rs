//! Structural diffing of fragments from either end.

use crate::fragment::Fragment;

pub(crate) fn find_diff_start(a: &Fragment, b: &Fragment, mut pos: usize) -> Option<usize> {
  let mut i = 0;
  loop {
    if i == a.child_count() || i == b.child_count() {
      return (a.child_count() != b.child_count()).then_some(pos);
    }
    let (child_a, child_b) = (a.child(i), b.child(i));
    i += 1;
    if child_a.ptr_eq(child_b) {
      pos += child_a.node_size();
      continue;
    }
    if !child_a.same_markup(child_b) {
      return Some(pos);
    }
    if let (Some(text_a), Some(text_b)) = (child_a.text(), child_b.text()) {
      if text_a != text_b {
        let same = text_a
          .chars()
          .zip(text_b.chars())
          .take_while(|(x, y)| x == y)
          .count();
        return Some(pos + same);
      }
    }
    if child_a.content().size() > 0 || child_b.content().size() > 0 {
      if let Some(inner) = find_diff_start(child_a.content(), child_b.content(), pos + 1) {
        return Some(inner);
      }
    }
    pos += child_a.node_size();
  }
}

pub(crate) fn find_diff_end(
  a: &Fragment,
  b: &Fragment,
  mut pos_a: usize,
  mut pos_b: usize,
) -> Option<(usize, usize)> {
  let (mut i_a, mut i_b) = (a.child_count(), b.child_count());
  loop {
    if i_a == 0 || i_b == 0 {
      return (i_a != i_b).then_some((pos_a, pos_b));
    }
    i_a -= 1;
    i_b -= 1;
    let (child_a, child_b) = (a.child(i_a), b.child(i_b));
    let size = child_a.node_size();
    if child_a.ptr_eq(child_b) {
      pos_a -= size;
      pos_b -= size;
      continue;
    }
    if !child_a.same_markup(child_b) {
      return Some((pos_a, pos_b));
    }
    if let (Some(text_a), Some(text_b)) = (child_a.text(), child_b.text()) {
      if text_a != text_b {
        let same = text_a
          .chars()
          .rev()
          .zip(text_b.chars().rev())
          .take_while(|(x, y)| x == y)
          .count();
        return Some((pos_a - same, pos_b - same));
      }
    }
    if child_a.content().size() > 0 || child_b.content().size() > 0 {
      if let Some(inner) = find_diff_end(child_a.content(), child_b.content(), pos_a - 1, pos_b - 1) {
        return Some(inner);
      }
    }
    pos_a -= size;
    pos_b -= size;
  }
}

#[cfg(test)]
mod test {
  use crate::test_utils::*;

  #[test]
  fn diff_start_finds_first_change() {
    let a = doc([p([text("abc")]), p([text("def")])]);
    let b = doc([p([text("abc")]), p([text("dxf")])]);
    assert_eq!(a.content().find_diff_start(b.content(), 0), Some(7));
    assert_eq!(a.content().find_diff_start(a.content(), 0), None);

    let c = doc([p([text("abc")]), p([text("def")]), p([])]);
    assert_eq!(a.content().find_diff_start(c.content(), 0), Some(10));

    let d = doc([p([text("abc")]), h1([text("def")])]);
    assert_eq!(a.content().find_diff_start(d.content(), 0), Some(5));
  }

  #[test]
  fn diff_start_sees_mark_changes() {
    let a = doc([p([text("ab"), em("cd")])]);
    let b = doc([p([text("abcd")])]);
    assert_eq!(a.content().find_diff_start(b.content(), 0), Some(3));
  }

  #[test]
  fn diff_end_finds_last_change() {
    let a = doc([p([text("abc")]), p([text("def")])]);
    let b = doc([p([text("abc")]), p([text("dxf")])]);
    let size_a = a.content().size();
    let size_b = b.content().size();
    assert_eq!(a.content().find_diff_end(b.content(), size_a, size_b), Some((8, 8)));
    assert_eq!(a.content().find_diff_end(a.content(), size_a, size_a), None);

    let c = doc([p([]), p([text("abc")]), p([text("def")])]);
    assert_eq!(
      a.content().find_diff_end(c.content(), size_a, c.content().size()),
      Some((0, 2))
    );
  }
}
