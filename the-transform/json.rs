//! Decoding steps from their JSON representation.
//!
//! Encoding lives on the steps themselves ([`StepKind::to_json`]). Decoding
//! goes through a [`StepCodec`], a table from `stepType` ids to decoder
//! functions owned by whoever sits at the serialization boundary.

use std::collections::HashMap;

use serde::{
  Deserialize,
  de::DeserializeOwned,
};
use serde_json::Value;
use the_model::{
  Schema,
  Slice,
};
use tracing::trace;

use crate::{
  attr_step::{
    AttrStep,
    DocAttrStep,
  },
  error::{
    Result,
    TransformError,
  },
  mark_step::{
    AddMarkStep,
    AddNodeMarkStep,
    RemoveMarkStep,
    RemoveNodeMarkStep,
  },
  replace_step::{
    ReplaceAroundStep,
    ReplaceStep,
  },
  step::{
    Step,
    StepKind,
  },
};

/// Turns step JSON with a known `stepType` into a [`Step`].
pub type StepDecoder = fn(&Schema, &Value) -> Result<Step>;

/// Table of step decoders keyed by `stepType`.
#[derive(Debug, Clone)]
pub struct StepCodec {
  decoders: HashMap<String, StepDecoder>,
}

impl Default for StepCodec {
  fn default() -> Self {
    Self::new()
  }
}

impl StepCodec {
  /// A codec that knows every built-in step type.
  pub fn new() -> Self {
    let mut codec = Self::empty();
    let builtins: [(&str, StepDecoder); 8] = [
      ("replace", decode_replace),
      ("replaceAround", decode_replace_around),
      ("addMark", decode_add_mark),
      ("removeMark", decode_remove_mark),
      ("addNodeMark", decode_add_node_mark),
      ("removeNodeMark", decode_remove_node_mark),
      ("attr", decode_attr),
      ("docAttr", decode_doc_attr),
    ];
    for (id, decoder) in builtins {
      codec.decoders.insert(id.to_string(), decoder);
    }
    codec
  }

  /// A codec with no decoders at all.
  pub fn empty() -> Self {
    Self {
      decoders: HashMap::new(),
    }
  }

  /// Register `decoder` for `id`. Fails if `id` is taken.
  pub fn register(&mut self, id: impl Into<String>, decoder: StepDecoder) -> Result<()> {
    let id = id.into();
    if self.decoders.contains_key(&id) {
      return Err(TransformError::DuplicateStepType(id));
    }
    self.decoders.insert(id, decoder);
    Ok(())
  }

  /// Decode `alias` the same way as the already registered `id`.
  pub fn alias(&mut self, alias: impl Into<String>, id: &str) -> Result<()> {
    let decoder = *self
      .decoders
      .get(id)
      .ok_or_else(|| TransformError::UnknownStepType(id.to_string()))?;
    self.register(alias, decoder)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.decoders.contains_key(id)
  }

  /// Registered ids, in no particular order.
  pub fn ids(&self) -> impl Iterator<Item = &str> {
    self.decoders.keys().map(String::as_str)
  }

  pub fn decode(&self, schema: &Schema, json: &Value) -> Result<Step> {
    let id = json
      .get("stepType")
      .and_then(Value::as_str)
      .ok_or_else(|| invalid("step", "missing stepType"))?;
    let decoder = self
      .decoders
      .get(id)
      .ok_or_else(|| TransformError::UnknownStepType(id.to_string()))?;
    trace!(step_type = id, "decoding step");
    decoder(schema, json)
  }

  pub fn encode(&self, step: &Step) -> Value {
    step.to_json()
  }
}

fn invalid(step_type: &str, message: impl ToString) -> TransformError {
  TransformError::InvalidStepJson {
    step_type: step_type.to_string(),
    message:   message.to_string(),
  }
}

fn parse<T: DeserializeOwned>(step_type: &str, json: &Value) -> Result<T> {
  T::deserialize(json).map_err(|err| invalid(step_type, err))
}

fn slice(schema: &Schema, json: Option<&Value>) -> Result<Slice> {
  Ok(Slice::from_json(schema, json)?)
}

#[derive(Deserialize)]
struct ReplaceJson {
  from:      usize,
  to:        usize,
  slice:     Option<Value>,
  #[serde(default)]
  structure: bool,
}

fn decode_replace(schema: &Schema, json: &Value) -> Result<Step> {
  let data: ReplaceJson = parse("replace", json)?;
  if data.from > data.to {
    return Err(invalid("replace", "from is after to"));
  }
  let slice = slice(schema, data.slice.as_ref())?;
  let step = if data.structure {
    ReplaceStep::structural(data.from, data.to, slice)
  } else {
    ReplaceStep::new(data.from, data.to, slice)
  };
  Ok(step.into())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceAroundJson {
  from:      usize,
  to:        usize,
  gap_from:  usize,
  gap_to:    usize,
  slice:     Option<Value>,
  insert:    usize,
  #[serde(default)]
  structure: bool,
}

fn decode_replace_around(schema: &Schema, json: &Value) -> Result<Step> {
  let data: ReplaceAroundJson = parse("replaceAround", json)?;
  if data.from > data.gap_from || data.gap_from > data.gap_to || data.gap_to > data.to {
    return Err(invalid("replaceAround", "positions out of order"));
  }
  let slice = slice(schema, data.slice.as_ref())?;
  if data.insert > slice.size() {
    return Err(invalid("replaceAround", "insert is past the end of the slice"));
  }
  Ok(
    ReplaceAroundStep::new(
      data.from,
      data.to,
      data.gap_from,
      data.gap_to,
      slice,
      data.insert,
      data.structure,
    )
    .into(),
  )
}

#[derive(Deserialize)]
struct MarkRangeJson {
  mark: Value,
  from: usize,
  to:   usize,
}

fn mark_range(step_type: &str, schema: &Schema, json: &Value) -> Result<(usize, usize, the_model::Mark)> {
  let data: MarkRangeJson = parse(step_type, json)?;
  if data.from > data.to {
    return Err(invalid(step_type, "from is after to"));
  }
  Ok((data.from, data.to, schema.mark_from_json(&data.mark)?))
}

fn decode_add_mark(schema: &Schema, json: &Value) -> Result<Step> {
  let (from, to, mark) = mark_range("addMark", schema, json)?;
  Ok(AddMarkStep::new(from, to, mark).into())
}

fn decode_remove_mark(schema: &Schema, json: &Value) -> Result<Step> {
  let (from, to, mark) = mark_range("removeMark", schema, json)?;
  Ok(RemoveMarkStep::new(from, to, mark).into())
}

#[derive(Deserialize)]
struct NodeMarkJson {
  pos:  usize,
  mark: Value,
}

fn decode_add_node_mark(schema: &Schema, json: &Value) -> Result<Step> {
  let data: NodeMarkJson = parse("addNodeMark", json)?;
  Ok(AddNodeMarkStep::new(data.pos, schema.mark_from_json(&data.mark)?).into())
}

fn decode_remove_node_mark(schema: &Schema, json: &Value) -> Result<Step> {
  let data: NodeMarkJson = parse("removeNodeMark", json)?;
  Ok(RemoveNodeMarkStep::new(data.pos, schema.mark_from_json(&data.mark)?).into())
}

#[derive(Deserialize)]
struct AttrJson {
  pos:   usize,
  attr:  String,
  #[serde(default)]
  value: Value,
}

fn decode_attr(_schema: &Schema, json: &Value) -> Result<Step> {
  let data: AttrJson = parse("attr", json)?;
  Ok(AttrStep::new(data.pos, data.attr, data.value).into())
}

#[derive(Deserialize)]
struct DocAttrJson {
  attr:  String,
  #[serde(default)]
  value: Value,
}

fn decode_doc_attr(_schema: &Schema, json: &Value) -> Result<Step> {
  let data: DocAttrJson = parse("docAttr", json)?;
  Ok(DocAttrStep::new(data.attr, data.value).into())
}
