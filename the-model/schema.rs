//! Schema declaration and compilation.
//!
//! A [`SchemaSpec`] describes node and mark types declaratively and can be
//! deserialized from JSON or TOML. [`Schema::new`] compiles it into a
//! [`Schema`]: every node type gets its content expression compiled into a
//! [`ContentMatch`] automaton, its attribute descriptors resolved and its set
//! of allowed marks computed.
//!
//! # Example
//!
//! ```ignore
//! let spec = SchemaSpec::from_toml(r#"
//!   [nodes.doc]
//!   content = "paragraph+"
//!   [nodes.paragraph]
//!   content = "text*"
//!   [nodes.text]
//! "#)?;
//! let schema = Schema::new(spec)?;
//! ```
//!
//! [`NodeType`] and [`MarkType`] are cheap handles into a compiled schema.
//! Two handles are equal when they point at the same type of the same
//! schema instance.

use std::{
  collections::HashMap,
  fmt,
  sync::Arc,
};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{
  Deserialize,
  Deserializer,
};
use serde_json::Value;

use crate::{
  Attrs,
  Tendril,
  content::{
    self,
    ContentMatch,
    MatchState,
  },
  error::{
    ContentError,
    SchemaError,
  },
  fragment::Fragment,
  mark::{
    Mark,
    MarkSet,
  },
  node::Node,
};

pub type Result<T> = std::result::Result<T, SchemaError>;

/// Declaration of a single attribute.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributeSpec {
  /// Value used when none is given. An attribute without a default is
  /// required. An explicit `null` counts as a default.
  #[serde(deserialize_with = "deserialize_present")]
  pub default:  Option<Value>,
  /// `|` separated list of accepted JSON type names, such as
  /// `"string|null"`.
  pub validate: Option<String>,
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
  D: Deserializer<'de>,
{
  Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Whitespace {
  Pre,
  Normal,
}

/// Declaration of a node type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeSpec {
  /// Content expression. Leaf types leave this empty.
  pub content:               Option<String>,
  /// Space separated mark names or groups allowed inside this node. `"_"`
  /// allows every mark, `""` none. Unset means all marks for inline content
  /// and none otherwise.
  pub marks:                 Option<String>,
  /// Space separated group names.
  pub group:                 Option<String>,
  pub inline:                bool,
  pub atom:                  bool,
  pub attrs:                 IndexMap<String, AttributeSpec>,
  pub selectable:            Option<bool>,
  pub draggable:             bool,
  pub code:                  bool,
  pub whitespace:            Option<Whitespace>,
  pub defining_as_context:   Option<bool>,
  pub defining_for_content:  Option<bool>,
  pub defining:              bool,
  pub isolating:             bool,
  pub linebreak_replacement: bool,
}

/// Declaration of a mark type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkSpec {
  pub attrs:     IndexMap<String, AttributeSpec>,
  /// Whether the mark extends to text typed at its end. Defaults to true.
  pub inclusive: Option<bool>,
  /// Space separated mark names or groups this mark excludes. Unset means
  /// the mark only excludes itself, `""` that marks of this type can be
  /// stacked.
  pub excludes:  Option<String>,
  pub group:     Option<String>,
  pub spanning:  Option<bool>,
}

/// Declarative description of a schema. Node and mark order is significant:
/// it decides group resolution order and mark ranks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSpec {
  pub nodes:    IndexMap<String, NodeSpec>,
  #[serde(default)]
  pub marks:    IndexMap<String, MarkSpec>,
  #[serde(default)]
  pub top_node: Option<String>,
}

impl SchemaSpec {
  pub fn from_json(input: &str) -> Result<Self> {
    serde_json::from_str(input).map_err(|err| SchemaError::InvalidSpec(err.to_string()))
  }

  pub fn from_toml(input: &str) -> Result<Self> {
    toml::from_str(input).map_err(|err| SchemaError::InvalidSpec(err.to_string()))
  }
}

#[derive(Debug, Clone)]
pub(crate) struct Attribute {
  pub(crate) default:  Option<Value>,
  pub(crate) validate: Option<Vec<String>>,
}

impl Attribute {
  fn new(spec: &AttributeSpec) -> Self {
    Self {
      default:  spec.default.clone(),
      validate: spec.validate.as_ref().map(|types| {
        types
          .split('|')
          .map(|ty| ty.trim().to_string())
          .filter(|ty| !ty.is_empty())
          .collect()
      }),
    }
  }

  fn is_required(&self) -> bool {
    self.default.is_none()
  }
}

fn init_attrs(specs: &IndexMap<String, AttributeSpec>) -> IndexMap<String, Attribute> {
  specs
    .iter()
    .map(|(name, spec)| (name.clone(), Attribute::new(spec)))
    .collect()
}

fn default_attrs(attrs: &IndexMap<String, Attribute>) -> Option<Attrs> {
  let mut defaults = Attrs::new();
  for (name, attr) in attrs {
    defaults.insert(name.clone(), attr.default.clone()?);
  }
  Some(defaults)
}

fn compute_attrs(
  owner: &str,
  attrs: &IndexMap<String, Attribute>,
  given: Option<&Attrs>,
) -> std::result::Result<Attrs, ContentError> {
  let mut built = Attrs::new();
  for (name, attr) in attrs {
    let value = match given.and_then(|given| given.get(name)) {
      Some(value) => value.clone(),
      None => {
        match &attr.default {
          Some(default) => default.clone(),
          None => {
            return Err(ContentError::MissingAttr {
              owner: owner.to_string(),
              attr:  name.clone(),
            });
          },
        }
      },
    };
    built.insert(name.clone(), value);
  }
  Ok(built)
}

fn check_attrs(
  owner: &str,
  attrs: &IndexMap<String, Attribute>,
  values: &Attrs,
) -> std::result::Result<(), ContentError> {
  for name in values.keys() {
    if !attrs.contains_key(name) {
      return Err(ContentError::UnsupportedAttr {
        owner: owner.to_string(),
        attr:  name.clone(),
      });
    }
  }
  for (name, attr) in attrs {
    let Some(types) = &attr.validate else {
      continue;
    };
    let actual = json_type_name(values.get(name).unwrap_or(&Value::Null));
    if !types.iter().any(|ty| ty == actual) {
      return Err(ContentError::InvalidAttr {
        owner: owner.to_string(),
        attr: name.clone(),
        expected: types.join("|"),
        actual,
      });
    }
  }
  Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

fn split_names(names: &str) -> impl Iterator<Item = &str> {
  names.split(' ').filter(|name| !name.is_empty())
}

#[derive(Debug)]
pub(crate) struct NodeTypeData {
  pub(crate) name:           String,
  pub(crate) spec:           NodeSpec,
  pub(crate) groups:         Vec<String>,
  pub(crate) attrs:          IndexMap<String, Attribute>,
  pub(crate) default_attrs:  Option<Attrs>,
  pub(crate) content:        usize,
  pub(crate) inline_content: bool,
  pub(crate) mark_set:       Option<Vec<usize>>,
  pub(crate) is_block:       bool,
  pub(crate) is_text:        bool,
}

impl NodeTypeData {
  pub(crate) fn has_required_attrs(&self) -> bool {
    self.attrs.values().any(Attribute::is_required)
  }

  pub(crate) fn is_leaf(&self) -> bool {
    self.content == content::EMPTY
  }

  pub(crate) fn is_in_group(&self, group: &str) -> bool {
    self.groups.iter().any(|g| g == group)
  }
}

#[derive(Debug)]
pub(crate) struct MarkTypeData {
  pub(crate) name:          String,
  pub(crate) spec:          MarkSpec,
  pub(crate) groups:        Vec<String>,
  pub(crate) attrs:         IndexMap<String, Attribute>,
  pub(crate) default_attrs: Option<Attrs>,
  pub(crate) excluded:      Vec<usize>,
}

struct SchemaInner {
  spec:       SchemaSpec,
  nodes:      Vec<NodeTypeData>,
  marks:      Vec<MarkTypeData>,
  node_names: HashMap<String, usize>,
  mark_names: HashMap<String, usize>,
  top:        usize,
  text:       usize,
  linebreak:  Option<usize>,
  states:     Vec<MatchState>,
  wrappings:  Mutex<HashMap<(usize, usize), Option<Vec<usize>>>>,
}

/// A compiled document schema.
#[derive(Clone)]
pub struct Schema {
  inner: Arc<SchemaInner>,
}

impl Schema {
  /// Compile a schema from its declaration.
  pub fn new(spec: SchemaSpec) -> Result<Self> {
    for name in spec.nodes.keys() {
      if spec.marks.contains_key(name) {
        return Err(SchemaError::NodeAndMark(name.clone()));
      }
    }

    let top_name = spec.top_node.clone().unwrap_or_else(|| "doc".to_string());
    let mut node_names = HashMap::with_capacity(spec.nodes.len());
    let mut nodes = Vec::with_capacity(spec.nodes.len());
    for (index, (name, node_spec)) in spec.nodes.iter().enumerate() {
      node_names.insert(name.clone(), index);
      let attrs = init_attrs(&node_spec.attrs);
      nodes.push(NodeTypeData {
        name: name.clone(),
        spec: node_spec.clone(),
        groups: node_spec
          .group
          .as_deref()
          .map(|groups| split_names(groups).map(String::from).collect())
          .unwrap_or_default(),
        default_attrs: default_attrs(&attrs),
        attrs,
        content: content::EMPTY,
        inline_content: false,
        mark_set: None,
        is_block: !(node_spec.inline || name == "text"),
        is_text: name == "text",
      });
    }

    let top = *node_names
      .get(&top_name)
      .ok_or_else(|| SchemaError::MissingTopNode(top_name.clone()))?;
    let text = *node_names.get("text").ok_or(SchemaError::MissingText)?;
    if !nodes[text].attrs.is_empty() {
      return Err(SchemaError::TextHasAttrs);
    }

    let mut mark_names = HashMap::with_capacity(spec.marks.len());
    let mut marks = Vec::with_capacity(spec.marks.len());
    for (index, (name, mark_spec)) in spec.marks.iter().enumerate() {
      mark_names.insert(name.clone(), index);
      let attrs = init_attrs(&mark_spec.attrs);
      marks.push(MarkTypeData {
        name: name.clone(),
        spec: mark_spec.clone(),
        groups: mark_spec
          .group
          .as_deref()
          .map(|groups| split_names(groups).map(String::from).collect())
          .unwrap_or_default(),
        default_attrs: default_attrs(&attrs),
        attrs,
        excluded: Vec::new(),
      });
    }

    let mut states = vec![MatchState::empty()];
    let mut compiled: HashMap<String, usize> = HashMap::new();
    for index in 0..nodes.len() {
      let expr = nodes[index].spec.content.clone().unwrap_or_default();
      let start = match compiled.get(&expr) {
        Some(&start) => start,
        None => {
          let start = content::compile(&expr, &nodes, &node_names, &mut states)?;
          compiled.insert(expr, start);
          start
        },
      };
      nodes[index].content = start;
    }

    let mut linebreak = None;
    for index in 0..nodes.len() {
      let inline_content = states[nodes[index].content]
        .next
        .first()
        .is_some_and(|&(ty, _)| !nodes[ty].is_block);
      nodes[index].inline_content = inline_content;

      if nodes[index].spec.linebreak_replacement {
        if linebreak.is_some() {
          return Err(SchemaError::MultipleLinebreaks);
        }
        if nodes[index].is_block || !nodes[index].is_leaf() {
          return Err(SchemaError::InvalidLinebreak);
        }
        linebreak = Some(index);
      }

      let mark_set = match nodes[index].spec.marks.as_deref() {
        Some("_") => None,
        Some("") => Some(Vec::new()),
        Some(expr) => Some(gather_marks(&marks, &mark_names, expr)?),
        None if inline_content => None,
        None => Some(Vec::new()),
      };
      nodes[index].mark_set = mark_set;
    }

    for index in 0..marks.len() {
      let excluded = match marks[index].spec.excludes.as_deref() {
        None => vec![index],
        Some("") => Vec::new(),
        Some(expr) => gather_marks(&marks, &mark_names, expr)?,
      };
      marks[index].excluded = excluded;
    }

    tracing::debug!(
      nodes = nodes.len(),
      marks = marks.len(),
      states = states.len(),
      "compiled schema"
    );

    Ok(Self {
      inner: Arc::new(SchemaInner {
        spec,
        nodes,
        marks,
        node_names,
        mark_names,
        top,
        text,
        linebreak,
        states,
        wrappings: Mutex::new(HashMap::new()),
      }),
    })
  }

  /// Compile a schema straight from a JSON declaration.
  pub fn from_json(input: &str) -> Result<Self> {
    Self::new(SchemaSpec::from_json(input)?)
  }

  /// Compile a schema straight from a TOML declaration.
  pub fn from_toml(input: &str) -> Result<Self> {
    Self::new(SchemaSpec::from_toml(input)?)
  }

  pub fn spec(&self) -> &SchemaSpec {
    &self.inner.spec
  }

  pub fn node_type(&self, name: &str) -> Option<NodeType> {
    self.inner.node_names.get(name).map(|&index| self.node_type_at(index))
  }

  pub fn mark_type(&self, name: &str) -> Option<MarkType> {
    self.inner.mark_names.get(name).map(|&index| self.mark_type_at(index))
  }

  /// Node types in declaration order.
  pub fn node_types(&self) -> impl Iterator<Item = NodeType> + '_ {
    (0..self.inner.nodes.len()).map(|index| self.node_type_at(index))
  }

  /// Mark types in rank order.
  pub fn mark_types(&self) -> impl Iterator<Item = MarkType> + '_ {
    (0..self.inner.marks.len()).map(|index| self.mark_type_at(index))
  }

  pub fn top_node_type(&self) -> NodeType {
    self.node_type_at(self.inner.top)
  }

  pub fn text_type(&self) -> NodeType {
    self.node_type_at(self.inner.text)
  }

  /// The inline leaf type standing in for `"\n"` in textblocks that don't
  /// preserve whitespace, if the schema declares one.
  pub fn linebreak_replacement(&self) -> Option<NodeType> {
    self.inner.linebreak.map(|index| self.node_type_at(index))
  }

  /// Create a node of the named type, checking its content.
  pub fn node(
    &self,
    name: &str,
    attrs: Option<&Attrs>,
    content: Fragment,
    marks: &[Mark],
  ) -> std::result::Result<Node, ContentError> {
    self
      .node_type(name)
      .ok_or_else(|| ContentError::UnknownNodeType(name.to_string()))?
      .create_checked(attrs, content, marks)
  }

  /// Create a text node.
  ///
  /// # Panics
  ///
  /// Panics when `text` is empty.
  pub fn text(&self, text: impl Into<Tendril>, marks: &[Mark]) -> Node {
    Node::new_text(self.text_type(), text.into(), Mark::set_from(marks.iter().cloned()))
  }

  pub fn mark(&self, name: &str, attrs: Option<&Attrs>) -> std::result::Result<Mark, ContentError> {
    self
      .mark_type(name)
      .ok_or_else(|| ContentError::UnknownMarkType(name.to_string()))?
      .create(attrs)
  }

  pub fn node_from_json(&self, json: &Value) -> std::result::Result<Node, ContentError> {
    Node::from_json(self, json)
  }

  pub fn mark_from_json(&self, json: &Value) -> std::result::Result<Mark, ContentError> {
    Mark::from_json(self, json)
  }

  pub fn ptr_eq(&self, other: &Schema) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  pub(crate) fn node_type_at(&self, index: usize) -> NodeType {
    NodeType {
      schema: self.clone(),
      index,
    }
  }

  pub(crate) fn mark_type_at(&self, index: usize) -> MarkType {
    MarkType {
      schema: self.clone(),
      index,
    }
  }

  pub(crate) fn node_data(&self, index: usize) -> &NodeTypeData {
    &self.inner.nodes[index]
  }

  pub(crate) fn state(&self, id: usize) -> &MatchState {
    &self.inner.states[id]
  }

  pub(crate) fn state_count(&self) -> usize {
    self.inner.states.len()
  }

  pub(crate) fn cached_wrapping(&self, key: (usize, usize)) -> Option<Option<Vec<usize>>> {
    self.inner.wrappings.lock().get(&key).cloned()
  }

  pub(crate) fn cache_wrapping(&self, key: (usize, usize), wrapping: Option<Vec<usize>>) {
    self.inner.wrappings.lock().insert(key, wrapping);
  }
}

impl fmt::Debug for Schema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Schema")
      .field(
        "nodes",
        &self.inner.nodes.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
      )
      .field(
        "marks",
        &self.inner.marks.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
      )
      .finish()
  }
}

fn gather_marks(
  marks: &[MarkTypeData],
  names: &HashMap<String, usize>,
  expr: &str,
) -> Result<Vec<usize>> {
  let mut found = Vec::new();
  for name in split_names(expr) {
    if let Some(&index) = names.get(name) {
      found.push(index);
      continue;
    }
    let before = found.len();
    for (index, mark) in marks.iter().enumerate() {
      if name == "_" || mark.groups.iter().any(|g| g == name) {
        found.push(index);
      }
    }
    if found.len() == before {
      return Err(SchemaError::UnknownMark(name.to_string()));
    }
  }
  Ok(found)
}

/// Handle to a node type of a compiled [`Schema`].
#[derive(Clone)]
pub struct NodeType {
  schema: Schema,
  index:  usize,
}

impl NodeType {
  fn data(&self) -> &NodeTypeData {
    self.schema.node_data(self.index)
  }

  pub(crate) fn index(&self) -> usize {
    self.index
  }

  pub fn name(&self) -> &str {
    &self.data().name
  }

  pub fn schema(&self) -> &Schema {
    &self.schema
  }

  pub fn spec(&self) -> &NodeSpec {
    &self.data().spec
  }

  pub fn groups(&self) -> &[String] {
    &self.data().groups
  }

  pub fn is_in_group(&self, group: &str) -> bool {
    self.data().is_in_group(group)
  }

  pub fn is_block(&self) -> bool {
    self.data().is_block
  }

  pub fn is_inline(&self) -> bool {
    !self.data().is_block
  }

  pub fn is_text(&self) -> bool {
    self.data().is_text
  }

  /// True for block types whose content is inline.
  pub fn is_textblock(&self) -> bool {
    self.data().is_block && self.data().inline_content
  }

  pub fn inline_content(&self) -> bool {
    self.data().inline_content
  }

  pub fn is_leaf(&self) -> bool {
    self.data().is_leaf()
  }

  pub fn is_atom(&self) -> bool {
    self.is_leaf() || self.data().spec.atom
  }

  pub fn whitespace(&self) -> Whitespace {
    let spec = &self.data().spec;
    spec.whitespace.unwrap_or(if spec.code {
      Whitespace::Pre
    } else {
      Whitespace::Normal
    })
  }

  pub fn is_defining_as_context(&self) -> bool {
    let spec = &self.data().spec;
    spec.defining_as_context.unwrap_or(spec.defining)
  }

  pub fn is_defining_for_content(&self) -> bool {
    let spec = &self.data().spec;
    spec.defining_for_content.unwrap_or(spec.defining)
  }

  pub fn is_isolating(&self) -> bool {
    self.data().spec.isolating
  }

  pub fn has_required_attrs(&self) -> bool {
    self.data().has_required_attrs()
  }

  pub fn content_match(&self) -> ContentMatch {
    ContentMatch::new(self.schema.clone(), self.data().content)
  }

  /// Attribute values to use when none are given, if every attribute has a
  /// default.
  pub fn default_attrs(&self) -> Option<&Attrs> {
    self.data().default_attrs.as_ref()
  }

  /// Fill in defaults for attributes not present in `attrs`.
  pub fn compute_attrs(&self, attrs: Option<&Attrs>) -> std::result::Result<Attrs, ContentError> {
    if attrs.is_none() {
      if let Some(defaults) = &self.data().default_attrs {
        return Ok(defaults.clone());
      }
    }
    compute_attrs(self.name(), &self.data().attrs, attrs)
  }

  /// Check that every value in `attrs` is declared and passes its validator.
  pub fn check_attrs(&self, attrs: &Attrs) -> std::result::Result<(), ContentError> {
    check_attrs(&format!("node {}", self.name()), &self.data().attrs, attrs)
  }

  /// Create a node of this type without checking its content.
  pub fn create(
    &self,
    attrs: Option<&Attrs>,
    content: Fragment,
    marks: &[Mark],
  ) -> std::result::Result<Node, ContentError> {
    if self.is_text() {
      return Err(ContentError::TextViaCreate);
    }
    Ok(Node::new(
      self.clone(),
      self.compute_attrs(attrs)?,
      content,
      Mark::set_from(marks.iter().cloned()),
    ))
  }

  /// Like [`NodeType::create`], but fails when `content` doesn't match the
  /// type's content expression.
  pub fn create_checked(
    &self,
    attrs: Option<&Attrs>,
    content: Fragment,
    marks: &[Mark],
  ) -> std::result::Result<Node, ContentError> {
    self.check_content(&content)?;
    self.create(attrs, content, marks)
  }

  /// Create a node, adding whatever nodes are needed at the start and end
  /// of `content` to make it valid. Returns `None` when that is impossible.
  pub fn create_and_fill(&self, attrs: Option<&Attrs>, content: Fragment, marks: &[Mark]) -> Option<Node> {
    let attrs = self.compute_attrs(attrs).ok()?;
    let mut content = content;
    if content.size() > 0 {
      let before = self.content_match().fill_before(&content, false, 0)?;
      content = before.append(&content);
    }
    let matched = self.content_match().match_fragment(&content)?;
    let after = matched.fill_before(&Fragment::empty(), true, 0)?;
    Some(Node::new(
      self.clone(),
      attrs,
      content.append(&after),
      Mark::set_from(marks.iter().cloned()),
    ))
  }

  /// Whether `content` is a valid sequence of children for this type.
  pub fn valid_content(&self, content: &Fragment) -> bool {
    match self.content_match().match_fragment(content) {
      Some(end) if end.valid_end() => content.iter().all(|child| self.allows_marks(child.marks())),
      _ => false,
    }
  }

  pub fn check_content(&self, content: &Fragment) -> std::result::Result<(), ContentError> {
    if self.valid_content(content) {
      return Ok(());
    }
    let mut shown = content.to_string();
    if let Some((cut, _)) = shown.char_indices().nth(50) {
      shown.truncate(cut);
    }
    Err(ContentError::InvalidContent {
      node:    self.name().to_string(),
      content: shown,
    })
  }

  pub fn allows_mark_type(&self, mark_type: &MarkType) -> bool {
    match &self.data().mark_set {
      None => true,
      Some(set) => set.contains(&mark_type.index),
    }
  }

  pub fn allows_marks(&self, marks: &[Mark]) -> bool {
    match &self.data().mark_set {
      None => true,
      Some(_) => marks.iter().all(|mark| self.allows_mark_type(mark.ty())),
    }
  }

  /// The subset of `marks` allowed in this type.
  pub fn allowed_marks(&self, marks: &[Mark]) -> MarkSet {
    marks
      .iter()
      .filter(|mark| self.allows_mark_type(mark.ty()))
      .cloned()
      .collect()
  }

  /// Whether this type's content and `other`'s share at least one child
  /// type, so that content can be moved between them.
  pub fn compatible_content(&self, other: &NodeType) -> bool {
    self == other || self.content_match().compatible(&other.content_match())
  }
}

impl PartialEq for NodeType {
  fn eq(&self, other: &Self) -> bool {
    self.index == other.index && self.schema.ptr_eq(&other.schema)
  }
}

impl Eq for NodeType {}

impl fmt::Debug for NodeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "NodeType({})", self.name())
  }
}

impl fmt::Display for NodeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Handle to a mark type of a compiled [`Schema`].
#[derive(Clone)]
pub struct MarkType {
  schema: Schema,
  index:  usize,
}

impl MarkType {
  fn data(&self) -> &MarkTypeData {
    &self.schema.inner.marks[self.index]
  }

  pub fn name(&self) -> &str {
    &self.data().name
  }

  pub fn schema(&self) -> &Schema {
    &self.schema
  }

  pub fn spec(&self) -> &MarkSpec {
    &self.data().spec
  }

  /// Declaration order. Mark sets are sorted by rank.
  pub fn rank(&self) -> usize {
    self.index
  }

  pub fn is_inclusive(&self) -> bool {
    self.data().spec.inclusive.unwrap_or(true)
  }

  pub fn is_spanning(&self) -> bool {
    self.data().spec.spanning.unwrap_or(true)
  }

  pub fn is_in_group(&self, group: &str) -> bool {
    self.data().groups.iter().any(|g| g == group)
  }

  pub fn create(&self, attrs: Option<&Attrs>) -> std::result::Result<Mark, ContentError> {
    let attrs = match (attrs, &self.data().default_attrs) {
      (None, Some(defaults)) => defaults.clone(),
      _ => compute_attrs(self.name(), &self.data().attrs, attrs)?,
    };
    Ok(Mark::new(self.clone(), attrs))
  }

  pub fn check_attrs(&self, attrs: &Attrs) -> std::result::Result<(), ContentError> {
    check_attrs(&format!("mark {}", self.name()), &self.data().attrs, attrs)
  }

  /// Remove every mark of this type from `set`.
  pub fn remove_from_set(&self, set: &[Mark]) -> MarkSet {
    set.iter().filter(|mark| mark.ty() != self).cloned().collect()
  }

  /// The mark of this type in `set`, if any.
  pub fn is_in_set(&self, set: &[Mark]) -> Option<Mark> {
    set.iter().find(|mark| mark.ty() == self).cloned()
  }

  /// Whether marks of this type exclude marks of `other`.
  pub fn excludes(&self, other: &MarkType) -> bool {
    self.schema.ptr_eq(&other.schema) && self.data().excluded.contains(&other.index)
  }
}

impl PartialEq for MarkType {
  fn eq(&self, other: &Self) -> bool {
    self.index == other.index && self.schema.ptr_eq(&other.schema)
  }
}

impl Eq for MarkType {}

impl fmt::Debug for MarkType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "MarkType({})", self.name())
  }
}

impl fmt::Display for MarkType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}
