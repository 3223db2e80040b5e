//! Steps that change a single attribute of a node or of the document.

use serde_json::{
  Map,
  Value,
};
use the_model::{
  Fragment,
  Node,
};

use crate::{
  error::StepError,
  map::{
    Assoc,
    Mappable,
  },
  mark_step::replace_markup,
  step::{
    Step,
    StepKind,
    StepResult,
  },
};

/// Set attribute `attr` of the node at `pos` to `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrStep {
  pub pos:   usize,
  pub attr:  String,
  pub value: Value,
}

impl AttrStep {
  pub fn new(pos: usize, attr: impl Into<String>, value: Value) -> Self {
    Self {
      pos,
      attr: attr.into(),
      value,
    }
  }
}

impl StepKind for AttrStep {
  fn apply(&self, doc: &Node) -> StepResult {
    let node = doc
      .node_at(self.pos)
      .filter(|node| !node.is_text())
      .ok_or(StepError::NoNode { pos: self.pos })?;
    let mut attrs = node.attrs().clone();
    attrs.insert(self.attr.clone(), self.value.clone());
    node.ty().check_attrs(&attrs)?;
    let updated = node.ty().create(Some(&attrs), Fragment::empty(), node.marks())?;
    replace_markup(doc, self.pos, node, updated)
  }

  fn invert(&self, doc: &Node) -> Step {
    let old = doc
      .node_at(self.pos)
      .and_then(|node| node.attrs().get(&self.attr).cloned())
      .unwrap_or(Value::Null);
    AttrStep::new(self.pos, self.attr.clone(), old).into()
  }

  fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
    let pos = mapping.map_result(self.pos, Assoc::After);
    (!pos.deleted_after()).then(|| AttrStep::new(pos.pos, self.attr.clone(), self.value.clone()).into())
  }

  fn to_json(&self) -> Value {
    let mut json = Map::new();
    json.insert("stepType".into(), "attr".into());
    json.insert("pos".into(), self.pos.into());
    json.insert("attr".into(), self.attr.clone().into());
    json.insert("value".into(), self.value.clone());
    Value::Object(json)
  }
}

/// Set attribute `attr` of the document node itself.
#[derive(Debug, Clone, PartialEq)]
pub struct DocAttrStep {
  pub attr:  String,
  pub value: Value,
}

impl DocAttrStep {
  pub fn new(attr: impl Into<String>, value: Value) -> Self {
    Self {
      attr: attr.into(),
      value,
    }
  }
}

impl StepKind for DocAttrStep {
  fn apply(&self, doc: &Node) -> StepResult {
    let mut attrs = doc.attrs().clone();
    attrs.insert(self.attr.clone(), self.value.clone());
    doc.ty().check_attrs(&attrs)?;
    Ok(doc.ty().create(Some(&attrs), doc.content().clone(), doc.marks())?)
  }

  fn invert(&self, doc: &Node) -> Step {
    let old = doc.attrs().get(&self.attr).cloned().unwrap_or(Value::Null);
    DocAttrStep::new(self.attr.clone(), old).into()
  }

  fn map(&self, _mapping: &dyn Mappable) -> Option<Step> {
    Some(self.clone().into())
  }

  fn to_json(&self) -> Value {
    let mut json = Map::new();
    json.insert("stepType".into(), "docAttr".into());
    json.insert("attr".into(), self.attr.clone().into());
    json.insert("value".into(), self.value.clone());
    Value::Object(json)
  }
}

#[cfg(test)]
mod test {
  use serde_json::json;
  use the_model::{
    ContentError,
    Schema,
  };
  use the_model::test_utils::*;

  use super::*;
  use crate::map::{
    MapRange,
    StepMap,
  };

  #[test]
  fn sets_and_restores_an_attribute() {
    let doc = doc([h1([text("title")]), p([text("x")])]);
    let step = AttrStep::new(0, "level", json!(3));
    let changed = step.apply(&doc).unwrap();
    assert_eq!(changed.child(0).attrs()["level"], json!(3));
    assert_eq!(changed.child(0).text_content(), "title");
    assert!(changed.child(1).ptr_eq(doc.child(1)));

    let undo = step.invert(&doc);
    assert_eq!(undo, AttrStep::new(0, "level", json!(1)).into());
    assert_eq!(undo.apply(&changed).unwrap(), doc);
  }

  #[test]
  fn rejects_invalid_values() {
    let doc = doc([h1([text("t")])]);
    let bad_type = AttrStep::new(0, "level", json!("three"));
    assert!(matches!(bad_type.apply(&doc), Err(StepError::Content(_))));
    let unknown = AttrStep::new(0, "color", json!("red"));
    assert!(matches!(
      unknown.apply(&doc),
      Err(StepError::Content(ContentError::UnsupportedAttr { .. }))
    ));
    let nowhere = AttrStep::new(2, "level", json!(2));
    assert_eq!(nowhere.apply(&doc), Err(StepError::NoNode { pos: 2 }));
  }

  #[test]
  fn attributes_on_leaves() {
    let doc = doc([p([text("a"), img()])]);
    let step = AttrStep::new(2, "alt", json!("picture"));
    let changed = step.apply(&doc).unwrap();
    assert_eq!(changed.node_at(2).unwrap().attrs()["alt"], json!("picture"));
    assert_eq!(changed.content().size(), doc.content().size());
  }

  #[test]
  fn attr_steps_follow_their_node() {
    let step = AttrStep::new(4, "level", json!(2));
    let insert = StepMap::new(vec![MapRange::new(0, 0, 2)]);
    assert_eq!(step.map(&insert), Some(AttrStep::new(6, "level", json!(2)).into()));
    let delete = StepMap::new(vec![MapRange::new(3, 3, 0)]);
    assert_eq!(step.map(&delete), None);
  }

  #[test]
  fn document_attributes() {
    let schema = Schema::from_json(
      r#"{
        "nodes": {
          "doc": { "content": "text*", "attrs": { "lang": { "default": "en" } } },
          "text": {}
        }
      }"#,
    )
    .unwrap();
    let doc = schema
      .top_node_type()
      .create(None, Fragment::from(schema.text("hi", &[])), &[])
      .unwrap();
    let step = DocAttrStep::new("lang", json!("fr"));
    let changed = step.apply(&doc).unwrap();
    assert_eq!(changed.attrs()["lang"], json!("fr"));
    assert_eq!(changed.text_content(), "hi");
    assert_eq!(step.invert(&doc).apply(&changed).unwrap(), doc);
    assert_eq!(
      step.to_json(),
      json!({ "stepType": "docAttr", "attr": "lang", "value": "fr" })
    );
  }
}
