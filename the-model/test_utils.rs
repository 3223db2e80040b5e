//! A small rich-text schema and node builders for tests.

use once_cell::sync::Lazy;
use serde_json::json;

use crate::{
  Attrs,
  fragment::Fragment,
  mark::Mark,
  node::Node,
  schema::{
    Schema,
    SchemaSpec,
  },
};

const SCHEMA: &str = r#"{
  "nodes": {
    "doc": { "content": "block+" },
    "paragraph": { "content": "inline*", "group": "block" },
    "blockquote": { "content": "block+", "group": "block", "defining": true },
    "horizontal_rule": { "group": "block" },
    "heading": {
      "content": "inline*",
      "group": "block",
      "defining": true,
      "attrs": { "level": { "default": 1, "validate": "number" } }
    },
    "code_block": {
      "content": "text*",
      "marks": "",
      "group": "block",
      "code": true,
      "defining": true,
      "attrs": { "language": { "default": null } }
    },
    "ordered_list": {
      "content": "list_item+",
      "group": "block",
      "attrs": { "order": { "default": 1, "validate": "number" } }
    },
    "bullet_list": { "content": "list_item+", "group": "block" },
    "list_item": { "content": "paragraph block*", "defining": true },
    "text": { "group": "inline" },
    "image": {
      "inline": true,
      "group": "inline",
      "draggable": true,
      "attrs": {
        "src": { "validate": "string" },
        "alt": { "default": null },
        "title": { "default": null }
      }
    },
    "hard_break": {
      "inline": true,
      "group": "inline",
      "selectable": false,
      "linebreakReplacement": true
    }
  },
  "marks": {
    "link": {
      "inclusive": false,
      "attrs": { "href": { "validate": "string" }, "title": { "default": null } }
    },
    "em": {},
    "strong": {},
    "code": { "excludes": "_" }
  }
}"#;

static TEST_SCHEMA: Lazy<Schema> = Lazy::new(|| {
  let spec = SchemaSpec::from_json(SCHEMA).expect("test schema parses");
  Schema::new(spec).expect("test schema compiles")
});

pub fn schema() -> &'static Schema {
  &TEST_SCHEMA
}

fn attrs(value: serde_json::Value) -> Attrs {
  match value {
    serde_json::Value::Object(map) => map,
    _ => Attrs::new(),
  }
}

fn build(name: &str, attrs: Option<&Attrs>, content: impl IntoIterator<Item = Node>) -> Node {
  let content = Fragment::from_vec(content.into_iter().collect());
  schema()
    .node(name, attrs, content, &[])
    .unwrap_or_else(|err| panic!("invalid {name} in test document: {err}"))
}

pub fn doc(content: impl IntoIterator<Item = Node>) -> Node {
  build("doc", None, content)
}

pub fn p(content: impl IntoIterator<Item = Node>) -> Node {
  build("paragraph", None, content)
}

pub fn blockquote(content: impl IntoIterator<Item = Node>) -> Node {
  build("blockquote", None, content)
}

pub fn h1(content: impl IntoIterator<Item = Node>) -> Node {
  build("heading", Some(&attrs(json!({ "level": 1 }))), content)
}

pub fn h2(content: impl IntoIterator<Item = Node>) -> Node {
  build("heading", Some(&attrs(json!({ "level": 2 }))), content)
}

pub fn pre(content: impl IntoIterator<Item = Node>) -> Node {
  build("code_block", None, content)
}

pub fn ul(content: impl IntoIterator<Item = Node>) -> Node {
  build("bullet_list", None, content)
}

pub fn ol(content: impl IntoIterator<Item = Node>) -> Node {
  build("ordered_list", None, content)
}

pub fn li(content: impl IntoIterator<Item = Node>) -> Node {
  build("list_item", None, content)
}

pub fn hr() -> Node {
  build("horizontal_rule", None, [])
}

pub fn img() -> Node {
  build("image", Some(&attrs(json!({ "src": "img.png" }))), [])
}

pub fn br() -> Node {
  build("hard_break", None, [])
}

pub fn text(text: &str) -> Node {
  schema().text(text, &[])
}

pub fn marked(text: &str, marks: &[Mark]) -> Node {
  schema().text(text, marks)
}

pub fn em(text: &str) -> Node {
  marked(text, &[mark("em")])
}

pub fn strong(text: &str) -> Node {
  marked(text, &[mark("strong")])
}

pub fn code(text: &str) -> Node {
  marked(text, &[mark("code")])
}

/// A mark of a type without required attributes.
pub fn mark(name: &str) -> Mark {
  schema()
    .mark(name, None)
    .unwrap_or_else(|err| panic!("invalid {name} mark: {err}"))
}

pub fn link(href: &str) -> Mark {
  schema()
    .mark("link", Some(&attrs(json!({ "href": href }))))
    .unwrap_or_else(|err| panic!("invalid link mark: {err}"))
}
