use quickcheck::{
  TestResult,
  quickcheck,
};
use the_model::{
  Fragment,
  Mark,
  Node,
  Slice,
  test_utils::*,
};
use the_transform::{
  AddMarkStep,
  Assoc,
  Mappable,
  RemoveMarkStep,
  ReplaceStep,
  Step,
  StepKind,
  Transform,
  can_join,
  find_wrapping,
  lift_target,
};

/// Text split into runs of three chars, cycling through plain, em, strong
/// and em+strong.
fn runs(text: &str) -> Vec<Node> {
  let chars: Vec<char> = text.chars().take(12).collect();
  chars
    .chunks(3)
    .enumerate()
    .map(|(i, chunk)| {
      let run: String = chunk.iter().collect();
      let marks: Vec<Mark> = match i % 4 {
        0 => vec![],
        1 => vec![mark("em")],
        2 => vec![mark("strong")],
        _ => vec![mark("em"), mark("strong")],
      };
      marked(&run, &marks)
    })
    .collect()
}

/// Top-level paragraphs, with every third block quoted and every third
/// one inside a bullet list.
fn build_doc(texts: &[String]) -> Node {
  let blocks: Vec<Node> = texts
    .iter()
    .take(6)
    .enumerate()
    .map(|(i, text)| {
      let para = p(runs(text));
      match i % 3 {
        1 => blockquote([para]),
        2 => ul([li([para])]),
        _ => para,
      }
    })
    .collect();
  if blocks.is_empty() {
    doc([p([])])
  } else {
    doc(blocks)
  }
}

/// Wrap, lift or join around `from..to`, when the document allows it.
fn restructure(doc: &Node, op: usize, from: usize, to: usize) -> Option<Transform> {
  let mut tr = Transform::new(doc.clone());
  let range = doc.resolve(from).ok()?.block_range(&doc.resolve(to).ok()?, None);
  match op % 3 {
    0 => {
      let range = range?;
      let quote = schema().node_type("blockquote")?;
      let wrappers = find_wrapping(&range, &quote, None, None)?;
      tr.wrap(&range, &wrappers).ok()?;
    },
    1 => {
      let range = range?;
      let target = lift_target(&range)?;
      tr.lift(&range, target).ok()?;
    },
    _ => {
      if from == 0 || !can_join(doc, from) {
        return None;
      }
      tr.join(from, 1).ok()?;
    },
  }
  Some(tr)
}

fn build_step(doc: &Node, kind: u8, a: usize, b: usize, c: usize) -> Option<Step> {
  let size = doc.content().size() + 1;
  let (a, b, c) = (a % size, b % size, c % size);
  let (from, to) = (a.min(b), a.max(b));
  let step = match kind % 8 {
    0 => ReplaceStep::new(from, to, Slice::empty()).into(),
    1 => ReplaceStep::new(from, from, Slice::new(Fragment::from(text("xy")), 0, 0)).into(),
    2 => AddMarkStep::new(from, to, mark("strong")).into(),
    3 => AddMarkStep::new(from, to, mark("code")).into(),
    4 => RemoveMarkStep::new(from, to, mark("em")).into(),
    5 => RemoveMarkStep::new(from, to, mark("strong")).into(),
    6 => ReplaceStep::new(c, c, doc.slice(from, to, false).ok()?).into(),
    _ => restructure(doc, c, from, to)?.steps().first()?.clone(),
  };
  Some(step)
}

quickcheck! {
  fn inverted_steps_restore_the_document(texts: Vec<String>, kind: u8, a: usize, b: usize, c: usize) -> TestResult {
    let doc = build_doc(&texts);
    let Some(step) = build_step(&doc, kind, a, b, c) else {
      return TestResult::discard();
    };
    let Ok(changed) = step.apply(&doc) else {
      return TestResult::discard();
    };
    let restored = step.invert(&doc).apply(&changed);
    TestResult::from_bool(restored.as_ref() == Ok(&doc))
  }

  fn restructuring_steps_invert_one_by_one(texts: Vec<String>, op: usize, a: usize, b: usize) -> TestResult {
    let doc = build_doc(&texts);
    let size = doc.content().size() + 1;
    let (a, b) = (a % size, b % size);
    let Some(tr) = restructure(&doc, op, a.min(b), a.max(b)) else {
      return TestResult::discard();
    };
    let afters = tr.docs().iter().skip(1).chain([tr.doc()]);
    let restored = tr
      .steps()
      .iter()
      .zip(tr.docs())
      .zip(afters)
      .all(|((step, before), after)| step.invert(before).apply(after).as_ref() == Ok(before));
    TestResult::from_bool(restored)
  }

  fn step_maps_carry_the_document_end(texts: Vec<String>, kind: u8, a: usize, b: usize, c: usize) -> TestResult {
    let doc = build_doc(&texts);
    let Some(step) = build_step(&doc, kind, a, b, c) else {
      return TestResult::discard();
    };
    let Ok(changed) = step.apply(&doc) else {
      return TestResult::discard();
    };
    let end = step.get_map().map(doc.content().size(), Assoc::After);
    TestResult::from_bool(end == changed.content().size())
  }

  fn transform_mapping_matches_its_steps(texts: Vec<String>, edits: Vec<(u8, usize, usize, usize)>, pos: usize) -> bool {
    let doc = build_doc(&texts);
    let mut tr = Transform::new(doc.clone());
    for (kind, a, b, c) in edits.into_iter().take(8) {
      if let Some(step) = build_step(tr.doc(), kind, a, b, c) {
        let _ = tr.maybe_step(step);
      }
    }
    let pos = pos % (doc.content().size() + 1);
    let sequential = tr
      .steps()
      .iter()
      .fold(pos, |pos, step| step.get_map().map(pos, Assoc::After));
    tr.mapping().map(pos, Assoc::After) == sequential
  }

  fn slices_span_exactly_their_range(texts: Vec<String>) -> bool {
    let doc = build_doc(&texts);
    let size = doc.content().size();
    (0..=size).all(|from| {
      (from..=size).all(|to| {
        [false, true]
          .into_iter()
          .all(|include_parents| doc.slice(from, to, include_parents).map(|slice| slice.size()).ok() == Some(to - from))
      })
    })
  }
}
