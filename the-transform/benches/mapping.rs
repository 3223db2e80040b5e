//! Benchmarks for position mapping and replace fitting in the-transform.
//!
//! Run with: `cargo bench -p the-transform --bench mapping`

use divan::{
  Bencher,
  black_box,
};
use the_model::{
  Fragment,
  Node,
  Slice,
  test_utils::*,
};
use the_transform::{
  Assoc,
  MapRange,
  Mappable,
  Mapping,
  StepMap,
  Transform,
};

fn main() {
  divan::main();
}

fn make_doc(paragraphs: usize) -> Node {
  let line = "The quick brown fox jumps over the lazy dog.";
  doc((0..paragraphs).map(|i| {
    if i % 3 == 0 {
      p([text(line), em(" emphasized"), text(" tail")])
    } else {
      p([text(line)])
    }
  }))
}

fn make_mapping(count: usize) -> Mapping {
  let maps = (0..count)
    .map(|i| {
      if i % 2 == 0 {
        StepMap::new(vec![MapRange::new(i * 7, 0, 3)])
      } else {
        StepMap::new(vec![MapRange::new(i * 5, 2, 0)])
      }
    })
    .collect();
  Mapping::from_maps(maps)
}

// `Mapping::map` benchmarks.

mod map {
  use super::*;

  #[divan::bench(args = [1, 16, 256])]
  fn through_maps(bencher: Bencher, count: usize) {
    let mapping = make_mapping(count);
    bencher.bench(|| {
      for pos in (0..1024).step_by(17) {
        black_box(mapping.map(black_box(pos), Assoc::After));
      }
    });
  }

  #[divan::bench(args = [16, 256])]
  fn mirrored(bencher: Bencher, count: usize) {
    let mut mapping = Mapping::new();
    for i in 0..count {
      let map = StepMap::new(vec![MapRange::new(i, 4, 0)]);
      mapping.append_map(map.clone(), None);
      let n = mapping.maps().len() - 1;
      mapping.append_map(map.invert(), Some(n));
    }
    bencher.bench(|| black_box(mapping.map_result(black_box(2), Assoc::After)));
  }
}

// `Transform` benchmarks.

mod transform {
  use super::*;

  #[divan::bench(args = [10, 100, 1000])]
  fn insert_text(bencher: Bencher, paragraphs: usize) {
    let doc = make_doc(paragraphs);
    let mid = doc.content().size() / 2;
    let pos = doc.resolve(mid).map(|pos| pos.start(pos.depth())).unwrap_or(1);
    bencher.bench(|| {
      let mut tr = Transform::new(doc.clone());
      tr.insert(black_box(pos), text("xyz")).unwrap();
      black_box(tr);
    });
  }

  #[divan::bench(args = [10, 100, 1000])]
  fn replace_across_blocks(bencher: Bencher, paragraphs: usize) {
    let doc = make_doc(paragraphs);
    let to = doc.content().size() - 3;
    let slice = Slice::new(Fragment::from_vec(vec![p([text("a")]), p([text("b")])]), 1, 1);
    bencher.bench(|| {
      let mut tr = Transform::new(doc.clone());
      tr.replace(black_box(3), black_box(to), &slice).unwrap();
      black_box(tr);
    });
  }

  #[divan::bench(args = [10, 100, 1000])]
  fn add_mark(bencher: Bencher, paragraphs: usize) {
    let doc = make_doc(paragraphs);
    let to = doc.content().size() - 1;
    bencher.bench(|| {
      let mut tr = Transform::new(doc.clone());
      tr.add_mark(1, black_box(to), mark("strong")).unwrap();
      black_box(tr);
    });
  }
}
