//! Error types shared by the document model.

use thiserror::Error;

/// Raised while compiling a [`SchemaSpec`](crate::SchemaSpec).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
  #[error("schema is missing its top node type ({0})")]
  MissingTopNode(String),
  #[error("every schema needs a 'text' type")]
  MissingText,
  #[error("the text node type should not have attributes")]
  TextHasAttrs,
  #[error("{0} can not be both a node and a mark")]
  NodeAndMark(String),
  #[error("multiple linebreak nodes defined")]
  MultipleLinebreaks,
  #[error("linebreak replacement nodes must be inline leaf nodes")]
  InvalidLinebreak,
  #[error("unknown mark type or group: '{0}'")]
  UnknownMark(String),
  #[error("{message} (in content expression '{expr}')")]
  Syntax { expr: String, message: String },
  #[error("invalid schema spec: {0}")]
  InvalidSpec(String),
}

/// Raised when nodes, marks or attributes don't fit the schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
  #[error("invalid content for node {node}: {content}")]
  InvalidContent { node: String, content: String },
  #[error("invalid collection of marks for node {node}: {marks}")]
  InvalidMarks { node: String, marks: String },
  #[error("no value supplied for attribute {attr} on {owner}")]
  MissingAttr { owner: String, attr: String },
  #[error("unsupported attribute {attr} for {owner}")]
  UnsupportedAttr { owner: String, attr: String },
  #[error("expected value of type {expected} for attribute {attr} on {owner}, got {actual}")]
  InvalidAttr {
    owner:    String,
    attr:     String,
    expected: String,
    actual:   &'static str,
  },
  #[error("unknown node type: {0}")]
  UnknownNodeType(String),
  #[error("there is no mark type {0} in this schema")]
  UnknownMarkType(String),
  #[error("text nodes can't be created through NodeType::create")]
  TextViaCreate,
  #[error("empty text nodes are not allowed")]
  EmptyText,
  #[error("invalid input for {what}: {message}")]
  InvalidJson { what: &'static str, message: String },
}

/// Raised when a position falls outside of a document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RangeError {
  #[error("position {pos} out of range (document size {size})")]
  OutOfRange { pos: usize, size: usize },
  #[error("invalid range {from}..{to}")]
  Inverted { from: usize, to: usize },
}

/// Raised by [`Node::replace`](crate::Node::replace) when a slice can't be
/// placed at the given range.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReplaceError {
  #[error("inserted content deeper than insertion position")]
  TooDeep,
  #[error("inconsistent open depths")]
  InconsistentOpenDepths,
  #[error("cannot join {sub} onto {main}")]
  CannotJoin { sub: String, main: String },
  #[error("removing non-flat range")]
  NonFlatRange,
  #[error("inserting into a leaf or text node")]
  InsertIntoLeaf,
  #[error(transparent)]
  Content(#[from] ContentError),
  #[error(transparent)]
  Range(#[from] RangeError),
}
