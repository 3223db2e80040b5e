//! Wire shapes of the JSON document format.
//!
//! Nodes serialize as `{ "type", "attrs"?, "content"?, "marks"?, "text"? }`,
//! marks as `{ "type", "attrs"? }` and slices as
//! `{ "content"?, "openStart"?, "openEnd"? }`. Absent members take their
//! defaults. The shapes here only describe the syntax; turning them into
//! model values goes through the schema, which checks types and attributes.

use serde::{
  Deserialize,
  Serialize,
};
use serde_json::Value;

use crate::{
  Attrs,
  error::ContentError,
  fragment::Fragment,
  mark::Mark,
  node::Node,
  schema::Schema,
  slice::Slice,
};

type Result<T> = std::result::Result<T, ContentError>;

fn parse<'a, T: Deserialize<'a>>(what: &'static str, json: &'a Value) -> Result<T> {
  T::deserialize(json).map_err(|err| {
    ContentError::InvalidJson {
      what,
      message: err.to_string(),
    }
  })
}

/// The computed attributes plus any undeclared ones the input carried, so
/// that checking them reports unsupported names instead of dropping them.
fn with_extras(computed: &Attrs, given: Option<&Attrs>) -> Attrs {
  let mut all = computed.clone();
  for (name, value) in given.into_iter().flatten() {
    all.entry(name.clone()).or_insert_with(|| value.clone());
  }
  all
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeJson {
  #[serde(rename = "type")]
  pub ty:      String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub attrs:   Option<Attrs>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content: Option<Vec<NodeJson>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub marks:   Option<Vec<MarkJson>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub text:    Option<String>,
}

impl NodeJson {
  pub fn from_value(json: &Value) -> Result<Self> {
    parse("Node", json)
  }

  pub fn into_node(self, schema: &Schema) -> Result<Node> {
    let marks = self
      .marks
      .unwrap_or_default()
      .into_iter()
      .map(|mark| mark.into_mark(schema))
      .collect::<Result<Vec<_>>>()?;

    if self.ty == schema.text_type().name() {
      let text = self.text.ok_or_else(|| {
        ContentError::InvalidJson {
          what:    "Node",
          message: "text node without text".into(),
        }
      })?;
      if text.is_empty() {
        return Err(ContentError::EmptyText);
      }
      return Ok(schema.text(text, &marks));
    }

    let ty = schema
      .node_type(&self.ty)
      .ok_or_else(|| ContentError::UnknownNodeType(self.ty.clone()))?;
    let content = self
      .content
      .unwrap_or_default()
      .into_iter()
      .map(|child| child.into_node(schema))
      .collect::<Result<Vec<_>>>()?;
    let node = ty.create(self.attrs.as_ref(), Fragment::from_vec(content), &marks)?;
    ty.check_attrs(&with_extras(node.attrs(), self.attrs.as_ref()))?;
    Ok(node)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkJson {
  #[serde(rename = "type")]
  pub ty:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub attrs: Option<Attrs>,
}

impl MarkJson {
  pub fn from_value(json: &Value) -> Result<Self> {
    parse("Mark", json)
  }

  pub fn into_mark(self, schema: &Schema) -> Result<Mark> {
    let ty = schema
      .mark_type(&self.ty)
      .ok_or_else(|| ContentError::UnknownMarkType(self.ty.clone()))?;
    let mark = ty.create(self.attrs.as_ref())?;
    ty.check_attrs(&with_extras(mark.attrs(), self.attrs.as_ref()))?;
    Ok(mark)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceJson {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content:    Option<Vec<NodeJson>>,
  #[serde(default)]
  pub open_start: usize,
  #[serde(default)]
  pub open_end:   usize,
}

impl SliceJson {
  pub fn from_value(json: &Value) -> Result<Self> {
    parse("Slice", json)
  }

  pub fn into_slice(self, schema: &Schema) -> Result<Slice> {
    let content = self
      .content
      .unwrap_or_default()
      .into_iter()
      .map(|node| node.into_node(schema))
      .collect::<Result<Vec<_>>>()?;
    let content = Fragment::from_vec(content);
    if self.open_start + self.open_end > content.size() {
      return Err(ContentError::InvalidJson {
        what:    "Slice",
        message: format!(
          "open depths {} and {} exceed content size {}",
          self.open_start,
          self.open_end,
          content.size()
        ),
      });
    }
    Ok(Slice::new(content, self.open_start, self.open_end))
  }
}

#[cfg(test)]
mod test {
  use serde_json::json;

  use super::*;
  use crate::test_utils::*;

  #[test]
  fn node_json_keeps_absent_members_out() {
    let wire = NodeJson::from_value(&json!({ "type": "paragraph" })).unwrap();
    assert_eq!(wire.content, None);
    assert_eq!(serde_json::to_value(&wire).unwrap(), json!({ "type": "paragraph" }));
  }

  #[test]
  fn text_without_text_is_rejected() {
    let err = NodeJson::from_value(&json!({ "type": "text" }))
      .unwrap()
      .into_node(schema())
      .unwrap_err();
    assert!(matches!(err, ContentError::InvalidJson { what: "Node", .. }));
  }

  #[test]
  fn attrs_are_filled_and_checked() {
    let node = NodeJson::from_value(&json!({ "type": "heading" }))
      .unwrap()
      .into_node(schema())
      .unwrap();
    assert_eq!(node.attrs()["level"], json!(1));

    let err = NodeJson::from_value(&json!({ "type": "heading", "attrs": { "level": 1, "color": "red" } }))
      .unwrap()
      .into_node(schema())
      .unwrap_err();
    assert!(matches!(err, ContentError::UnsupportedAttr { .. }));
  }

  #[test]
  fn slice_open_depths_must_fit() {
    let err = SliceJson::from_value(&json!({ "content": [{ "type": "paragraph" }], "openStart": 2, "openEnd": 1 }))
      .unwrap()
      .into_slice(schema())
      .unwrap_err();
    assert!(matches!(err, ContentError::InvalidJson { what: "Slice", .. }));

    let slice = SliceJson::from_value(&json!({ "content": [{ "type": "paragraph" }], "openStart": 1, "openEnd": 1 }))
      .unwrap()
      .into_slice(schema())
      .unwrap();
    assert_eq!(slice, Slice::new(Fragment::from(p([])), 1, 1));
  }
}
