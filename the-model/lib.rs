//! Immutable document model for structured rich-text documents.
//!
//! A document is a tree of [`Node`]s. Every node has a [`NodeType`] taken
//! from a [`Schema`], a set of attributes, a [`Fragment`] of children and a
//! set of [`Mark`]s. Text lives in leaf text nodes.
//!
//! # Positions
//!
//! Positions are flat integer offsets into the document. Entering or leaving
//! a non-leaf node counts as one position, a leaf node counts as one position
//! and a text node counts one position per character. [`ResolvedPos`]
//! translates a flat position back into its path through the tree.
//!
//! # Sharing
//!
//! Nodes, fragments and marks are reference counted and never mutated after
//! construction. Every editing operation returns a new tree that shares all
//! untouched subtrees with its input.
//!
//! # Replacing
//!
//! [`Node::replace`] substitutes a [`Slice`] for a range of the document,
//! joining the open sides of the slice onto the nodes around the range and
//! failing with [`ReplaceError`] when the result would violate the schema.

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod content;
mod diff;
pub mod error;
pub mod fragment;
pub mod json;
pub mod mark;
pub mod node;
mod replace;
pub mod resolved_pos;
pub mod schema;
pub mod slice;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use content::ContentMatch;
pub use error::{
  ContentError,
  RangeError,
  ReplaceError,
  SchemaError,
};
pub use fragment::Fragment;
pub use mark::{
  Mark,
  MarkSet,
};
pub use node::Node;
pub use resolved_pos::{
  NodeRange,
  ResolveCache,
  ResolvedPos,
};
pub use schema::{
  AttributeSpec,
  MarkSpec,
  MarkType,
  NodeSpec,
  NodeType,
  Schema,
  SchemaSpec,
  Whitespace,
};
pub use slice::Slice;

pub type Tendril = SmartString<LazyCompact>;

/// Attribute values of a node or mark, keyed by attribute name.
pub type Attrs = serde_json::Map<String, serde_json::Value>;
