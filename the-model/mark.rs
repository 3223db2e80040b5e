//! Marks: inline annotations such as emphasis or links.
//!
//! Mark sets are plain slices kept sorted by mark rank. The set algebra
//! below maintains that order and drops marks excluded by a newly added
//! one.

use std::{
  fmt,
  sync::Arc,
};

use serde::{
  Serialize,
  Serializer,
};
use serde_json::Value;
use smallvec::SmallVec;

use crate::{
  Attrs,
  error::ContentError,
  json::MarkJson,
  schema::{
    MarkType,
    Schema,
  },
};

pub type MarkSet = SmallVec<[Mark; 2]>;

struct MarkInner {
  ty:    MarkType,
  attrs: Attrs,
}

/// An immutable mark: a mark type plus its attribute values.
#[derive(Clone)]
pub struct Mark(Arc<MarkInner>);

impl Mark {
  pub(crate) fn new(ty: MarkType, attrs: Attrs) -> Self {
    Self(Arc::new(MarkInner { ty, attrs }))
  }

  pub fn ty(&self) -> &MarkType {
    &self.0.ty
  }

  pub fn attrs(&self) -> &Attrs {
    &self.0.attrs
  }

  /// Add this mark to `set`, replacing marks it excludes. When the set holds
  /// a mark that excludes this one, it is returned unchanged.
  pub fn add_to_set(&self, set: &[Mark]) -> MarkSet {
    let mut copy: Option<MarkSet> = None;
    let mut placed = false;
    for (i, other) in set.iter().enumerate() {
      if self == other {
        return set.iter().cloned().collect();
      }
      if self.ty().excludes(other.ty()) {
        if copy.is_none() {
          copy = Some(set[..i].iter().cloned().collect());
        }
      } else if other.ty().excludes(self.ty()) {
        return set.iter().cloned().collect();
      } else {
        if !placed && other.ty().rank() > self.ty().rank() {
          copy
            .get_or_insert_with(|| set[..i].iter().cloned().collect())
            .push(self.clone());
          placed = true;
        }
        if let Some(copy) = copy.as_mut() {
          copy.push(other.clone());
        }
      }
    }
    let mut copy = copy.unwrap_or_else(|| set.iter().cloned().collect());
    if !placed {
      copy.push(self.clone());
    }
    copy
  }

  /// Remove this exact mark from `set`.
  pub fn remove_from_set(&self, set: &[Mark]) -> MarkSet {
    set.iter().filter(|other| *other != self).cloned().collect()
  }

  pub fn is_in_set(&self, set: &[Mark]) -> bool {
    set.iter().any(|other| other == self)
  }

  pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a == b)
  }

  /// Build a sorted, exclusion-free set out of arbitrary marks.
  pub fn set_from(marks: impl IntoIterator<Item = Mark>) -> MarkSet {
    let mut set = MarkSet::new();
    for mark in marks {
      set = mark.add_to_set(&set);
    }
    set
  }

  pub fn to_json(&self) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("type".into(), Value::String(self.ty().name().to_string()));
    if !self.attrs().is_empty() {
      obj.insert("attrs".into(), Value::Object(self.attrs().clone()));
    }
    Value::Object(obj)
  }

  pub fn from_json(schema: &Schema, json: &Value) -> Result<Mark, ContentError> {
    let wire = MarkJson::from_value(json)?;
    wire.into_mark(schema)
  }
}

impl PartialEq for Mark {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0) || (self.ty() == other.ty() && self.attrs() == other.attrs())
  }
}

impl Eq for Mark {}

impl Serialize for Mark {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.to_json().serialize(serializer)
  }
}

impl fmt::Debug for Mark {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.attrs().is_empty() {
      write!(f, "{}", self.ty().name())
    } else {
      write!(f, "{}({})", self.ty().name(), Value::Object(self.attrs().clone()))
    }
  }
}

impl fmt::Display for Mark {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.ty().name())
  }
}
