//! Replaying unconfirmed local steps on top of steps from elsewhere.

use the_model::Node;
use tracing::trace;

use crate::{
  error::Result,
  step::{
    Step,
    StepKind,
  },
  transform::Transform,
};

/// A local step together with its inverse against the document it was
/// applied to.
#[derive(Debug, Clone, PartialEq)]
pub struct Rebaseable {
  pub step:     Step,
  pub inverted: Step,
}

impl Rebaseable {
  /// Pair `step` with its inverse, `before` being the document `step`
  /// applies to.
  pub fn new(step: Step, before: &Node) -> Self {
    let inverted = step.invert(before);
    Self { step, inverted }
  }
}

/// Move `pending` (already applied to `transform`'s document) behind `over`.
///
/// The pending steps are undone, `over` is applied, and every pending step
/// is mapped through everything after its own inverse and re-applied, with
/// the inverse and the re-applied step registered as mirrors. Steps that no
/// longer apply are dropped from the result.
pub fn rebase_steps(pending: &[Rebaseable], over: &[Step], transform: &mut Transform) -> Result<Vec<Rebaseable>> {
  for rebaseable in pending.iter().rev() {
    transform.step(rebaseable.inverted.clone())?;
  }
  for step in over {
    transform.step(step.clone())?;
  }
  let mut rebased = Vec::with_capacity(pending.len());
  let mut map_from = pending.len();
  for rebaseable in pending {
    let mapped = rebaseable
      .step
      .map(&transform.mapping().slice_from(map_from));
    map_from -= 1;
    let Some(mapped) = mapped else {
      trace!(step = %rebaseable.step, "pending step deleted by rebase");
      continue;
    };
    let before = transform.doc().clone();
    if transform.maybe_step(mapped.clone()).is_err() {
      trace!(step = %mapped, "pending step no longer applies");
      continue;
    }
    let last = transform.steps().len() - 1;
    transform.mapping_mut().set_mirror(map_from, last);
    rebased.push(Rebaseable::new(mapped, &before));
  }
  Ok(rebased)
}
