//! Content expressions and the automata that match them.
//!
//! A node type's `content` expression, such as `"paragraph (heading |
//! blockquote)*"` or `"inline{1,3}"`, is parsed into an expression tree,
//! lowered to an NFA and then turned into a DFA by subset construction. The
//! DFA states of every type in a schema live in one arena owned by the
//! [`Schema`], and a [`ContentMatch`] is a handle to one of those states.
//!
//! State [`EMPTY`] is shared by all types with an empty expression; a type is
//! a leaf exactly when its content starts there.

use std::{
  collections::{
    HashMap,
    HashSet,
    VecDeque,
  },
  fmt,
};

use crate::{
  error::SchemaError,
  fragment::Fragment,
  node::Node,
  schema::{
    NodeType,
    NodeTypeData,
    Schema,
  },
};

pub(crate) const EMPTY: usize = 0;

type Result<T> = std::result::Result<T, SchemaError>;

#[derive(Debug, Clone)]
pub(crate) struct MatchState {
  pub(crate) valid_end: bool,
  pub(crate) next:      Vec<(usize, usize)>,
}

impl MatchState {
  pub(crate) fn empty() -> Self {
    Self {
      valid_end: true,
      next:      Vec::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
  Choice(Vec<Expr>),
  Seq(Vec<Expr>),
  Plus(Box<Expr>),
  Star(Box<Expr>),
  Opt(Box<Expr>),
  Range {
    min:  usize,
    max:  Option<usize>,
    expr: Box<Expr>,
  },
  Name(usize),
}

fn is_word(ch: char) -> bool {
  ch.is_alphanumeric() || ch == '_'
}

fn tokenize(expr: &str) -> Vec<&str> {
  let mut tokens = Vec::new();
  let mut chars = expr.char_indices().peekable();
  while let Some((start, ch)) = chars.next() {
    if ch.is_whitespace() {
      continue;
    }
    let mut end = start + ch.len_utf8();
    if is_word(ch) {
      while let Some(&(i, next)) = chars.peek() {
        if !is_word(next) {
          break;
        }
        end = i + next.len_utf8();
        chars.next();
      }
    }
    tokens.push(&expr[start..end]);
  }
  tokens
}

struct TokenStream<'a> {
  expr:   &'a str,
  tokens: Vec<&'a str>,
  pos:    usize,
  inline: Option<bool>,
  nodes:  &'a [NodeTypeData],
  names:  &'a HashMap<String, usize>,
}

impl<'a> TokenStream<'a> {
  fn peek(&self) -> Option<&'a str> {
    self.tokens.get(self.pos).copied()
  }

  fn eat(&mut self, tok: &str) -> bool {
    if self.peek() == Some(tok) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn err(&self, message: impl Into<String>) -> SchemaError {
    SchemaError::Syntax {
      expr:    self.expr.to_string(),
      message: message.into(),
    }
  }

  fn parse_expr(&mut self) -> Result<Expr> {
    let mut exprs = Vec::new();
    loop {
      exprs.push(self.parse_seq()?);
      if !self.eat("|") {
        break;
      }
    }
    Ok(if exprs.len() == 1 {
      exprs.remove(0)
    } else {
      Expr::Choice(exprs)
    })
  }

  fn parse_seq(&mut self) -> Result<Expr> {
    let mut exprs = vec![self.parse_subscript()?];
    while let Some(tok) = self.peek() {
      if tok == ")" || tok == "|" {
        break;
      }
      exprs.push(self.parse_subscript()?);
    }
    Ok(if exprs.len() == 1 {
      exprs.remove(0)
    } else {
      Expr::Seq(exprs)
    })
  }

  fn parse_subscript(&mut self) -> Result<Expr> {
    let mut expr = self.parse_atom()?;
    loop {
      if self.eat("+") {
        expr = Expr::Plus(Box::new(expr));
      } else if self.eat("*") {
        expr = Expr::Star(Box::new(expr));
      } else if self.eat("?") {
        expr = Expr::Opt(Box::new(expr));
      } else if self.eat("{") {
        expr = self.parse_range(expr)?;
      } else {
        break;
      }
    }
    Ok(expr)
  }

  fn parse_num(&mut self) -> Result<usize> {
    let tok = self.peek().unwrap_or("");
    let num = tok
      .parse::<usize>()
      .map_err(|_| self.err(format!("expected number, got '{tok}'")))?;
    self.pos += 1;
    Ok(num)
  }

  fn parse_range(&mut self, expr: Expr) -> Result<Expr> {
    let min = self.parse_num()?;
    let mut max = Some(min);
    if self.eat(",") {
      max = if self.peek() != Some("}") {
        Some(self.parse_num()?)
      } else {
        None
      };
    }
    if !self.eat("}") {
      return Err(self.err("unclosed braced range"));
    }
    if max.is_some_and(|max| max < min) {
      return Err(self.err(format!("range maximum below minimum {min}")));
    }
    Ok(Expr::Range {
      min,
      max,
      expr: Box::new(expr),
    })
  }

  fn parse_atom(&mut self) -> Result<Expr> {
    if self.eat("(") {
      let expr = self.parse_expr()?;
      if !self.eat(")") {
        return Err(self.err("missing closing paren"));
      }
      return Ok(expr);
    }
    let Some(tok) = self.peek() else {
      return Err(self.err("unexpected end of expression"));
    };
    if !tok.chars().next().is_some_and(is_word) {
      return Err(self.err(format!("unexpected token '{tok}'")));
    }
    let types = self.resolve_name(tok)?;
    let mut exprs = Vec::with_capacity(types.len());
    for ty in types {
      let inline = !self.nodes[ty].is_block;
      match self.inline {
        None => self.inline = Some(inline),
        Some(seen) if seen != inline => {
          return Err(self.err("mixing inline and block content"));
        },
        Some(_) => {},
      }
      exprs.push(Expr::Name(ty));
    }
    self.pos += 1;
    Ok(if exprs.len() == 1 {
      exprs.remove(0)
    } else {
      Expr::Choice(exprs)
    })
  }

  fn resolve_name(&self, name: &str) -> Result<Vec<usize>> {
    if let Some(&index) = self.names.get(name) {
      return Ok(vec![index]);
    }
    let found: Vec<usize> = self
      .nodes
      .iter()
      .enumerate()
      .filter(|(_, node)| node.is_in_group(name))
      .map(|(index, _)| index)
      .collect();
    if found.is_empty() {
      return Err(self.err(format!("no node type or group '{name}' found")));
    }
    Ok(found)
  }
}

type EdgeRef = (usize, usize);

#[derive(Debug, Clone, Copy)]
struct NfaEdge {
  term: Option<usize>,
  to:   Option<usize>,
}

#[derive(Debug, Default)]
struct Nfa {
  nodes: Vec<Vec<NfaEdge>>,
}

impl Nfa {
  fn node(&mut self) -> usize {
    self.nodes.push(Vec::new());
    self.nodes.len() - 1
  }

  fn edge(&mut self, from: usize, to: Option<usize>, term: Option<usize>) -> EdgeRef {
    self.nodes[from].push(NfaEdge { term, to });
    (from, self.nodes[from].len() - 1)
  }

  fn connect(&mut self, edges: &[EdgeRef], to: usize) {
    for &(node, edge) in edges {
      self.nodes[node][edge].to = Some(to);
    }
  }

  fn compile(&mut self, expr: &Expr, from: usize) -> Vec<EdgeRef> {
    match expr {
      Expr::Choice(exprs) => {
        let mut out = Vec::new();
        for expr in exprs {
          out.extend(self.compile(expr, from));
        }
        out
      },
      Expr::Seq(exprs) => {
        let mut from = from;
        for (i, expr) in exprs.iter().enumerate() {
          let next = self.compile(expr, from);
          if i == exprs.len() - 1 {
            return next;
          }
          from = self.node();
          self.connect(&next, from);
        }
        vec![self.edge(from, None, None)]
      },
      Expr::Star(expr) => {
        let lp = self.node();
        self.edge(from, Some(lp), None);
        let inner = self.compile(expr, lp);
        self.connect(&inner, lp);
        vec![self.edge(lp, None, None)]
      },
      Expr::Plus(expr) => {
        let lp = self.node();
        let first = self.compile(expr, from);
        self.connect(&first, lp);
        let inner = self.compile(expr, lp);
        self.connect(&inner, lp);
        vec![self.edge(lp, None, None)]
      },
      Expr::Opt(expr) => {
        let mut out = vec![self.edge(from, None, None)];
        out.extend(self.compile(expr, from));
        out
      },
      Expr::Range { min, max, expr } => {
        let mut cur = from;
        for _ in 0..*min {
          let next = self.node();
          let edges = self.compile(expr, cur);
          self.connect(&edges, next);
          cur = next;
        }
        match max {
          None => {
            let edges = self.compile(expr, cur);
            self.connect(&edges, cur);
          },
          Some(max) => {
            for _ in *min..*max {
              let next = self.node();
              self.edge(cur, Some(next), None);
              let edges = self.compile(expr, cur);
              self.connect(&edges, next);
              cur = next;
            }
          },
        }
        vec![self.edge(cur, None, None)]
      },
      Expr::Name(ty) => vec![self.edge(from, None, Some(*ty))],
    }
  }

  /// The set of NFA nodes reachable from `node` through epsilon edges.
  fn null_from(&self, node: usize) -> Vec<usize> {
    let mut result = Vec::new();
    self.scan(node, &mut result);
    result.sort_unstable();
    result
  }

  fn scan(&self, node: usize, result: &mut Vec<usize>) {
    let edges = &self.nodes[node];
    if let [NfaEdge {
      term: None,
      to: Some(to),
    }] = edges.as_slice()
    {
      return self.scan(*to, result);
    }
    result.push(node);
    for edge in edges {
      if let NfaEdge {
        term: None,
        to: Some(to),
      } = edge
      {
        if !result.contains(to) {
          self.scan(*to, result);
        }
      }
    }
  }

  fn explore(
    &self,
    set: Vec<usize>,
    states: &mut Vec<MatchState>,
    labeled: &mut HashMap<Vec<usize>, usize>,
  ) -> usize {
    let mut out: Vec<(usize, Vec<usize>)> = Vec::new();
    for &node in &set {
      for edge in &self.nodes[node] {
        let (Some(term), Some(to)) = (edge.term, edge.to) else {
          continue;
        };
        let slot = match out.iter().position(|(t, _)| *t == term) {
          Some(slot) => slot,
          None => {
            out.push((term, Vec::new()));
            out.len() - 1
          },
        };
        for reached in self.null_from(to) {
          if !out[slot].1.contains(&reached) {
            out[slot].1.push(reached);
          }
        }
      }
    }

    let accept = self.nodes.len() - 1;
    let id = states.len();
    states.push(MatchState {
      valid_end: set.contains(&accept),
      next:      Vec::with_capacity(out.len()),
    });
    labeled.insert(set, id);

    for (term, mut target) in out {
      target.sort_unstable();
      let next = match labeled.get(&target) {
        Some(&next) => next,
        None => self.explore(target, states, labeled),
      };
      states[id].next.push((term, next));
    }
    id
  }
}

/// Compile `expr` into the state arena, returning its start state.
pub(crate) fn compile(
  expr: &str,
  nodes: &[NodeTypeData],
  names: &HashMap<String, usize>,
  states: &mut Vec<MatchState>,
) -> Result<usize> {
  let mut stream = TokenStream {
    expr,
    tokens: tokenize(expr),
    pos: 0,
    inline: None,
    nodes,
    names,
  };
  if stream.peek().is_none() {
    return Ok(EMPTY);
  }
  let parsed = stream.parse_expr()?;
  if let Some(tok) = stream.peek() {
    return Err(stream.err(format!("unexpected trailing text '{tok}'")));
  }

  let mut nfa = Nfa::default();
  nfa.node();
  let out = nfa.compile(&parsed, 0);
  let accept = nfa.node();
  nfa.connect(&out, accept);

  let start = nfa.explore(nfa.null_from(0), states, &mut HashMap::new());
  check_dead_ends(start, states, nodes, &stream)?;
  tracing::trace!(expr, start, states = states.len() - start, "compiled content expression");
  Ok(start)
}

fn check_dead_ends(
  start: usize,
  states: &[MatchState],
  nodes: &[NodeTypeData],
  stream: &TokenStream<'_>,
) -> Result<()> {
  let mut work = vec![start];
  let mut i = 0;
  while i < work.len() {
    let state = &states[work[i]];
    let mut dead = !state.valid_end;
    let mut names = Vec::new();
    for &(ty, next) in &state.next {
      names.push(nodes[ty].name.as_str());
      if dead && !(nodes[ty].is_text || nodes[ty].has_required_attrs()) {
        dead = false;
      }
      if !work.contains(&next) {
        work.push(next);
      }
    }
    if dead {
      return Err(stream.err(format!(
        "only non-generatable nodes ({}) in a required position",
        names.join(", ")
      )));
    }
    i += 1;
  }
  Ok(())
}

/// A state in the automaton compiled from a content expression. Walking it
/// with the types of a node's children tells whether they form valid
/// content.
#[derive(Clone)]
pub struct ContentMatch {
  schema: Schema,
  state:  usize,
}

/// An outgoing edge of a [`ContentMatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEdge {
  pub ty:   NodeType,
  pub next: ContentMatch,
}

impl ContentMatch {
  pub(crate) fn new(schema: Schema, state: usize) -> Self {
    Self { schema, state }
  }

  fn at(&self, state: usize) -> Self {
    Self::new(self.schema.clone(), state)
  }

  fn data(&self) -> &MatchState {
    self.schema.state(self.state)
  }

  /// True when the content matched so far may end here.
  pub fn valid_end(&self) -> bool {
    self.data().valid_end
  }

  /// The state reached after a node of type `ty`, if it is allowed here.
  pub fn match_type(&self, ty: &NodeType) -> Option<ContentMatch> {
    if !ty.schema().ptr_eq(&self.schema) {
      return None;
    }
    self
      .data()
      .next
      .iter()
      .find(|(t, _)| *t == ty.index())
      .map(|&(_, next)| self.at(next))
  }

  /// Match all children of `fragment`.
  pub fn match_fragment(&self, fragment: &Fragment) -> Option<ContentMatch> {
    self.match_fragment_range(fragment, 0, fragment.child_count())
  }

  /// Match the children of `fragment` in `start..end`, returning `None` on
  /// the first child that isn't allowed.
  pub fn match_fragment_range(&self, fragment: &Fragment, start: usize, end: usize) -> Option<ContentMatch> {
    let mut cur = self.clone();
    for child in &fragment.children()[start..end] {
      cur = cur.match_type(child.ty())?;
    }
    Some(cur)
  }

  /// True when the next node must be inline.
  pub fn inline_content(&self) -> bool {
    self
      .data()
      .next
      .first()
      .is_some_and(|&(ty, _)| !self.schema.node_data(ty).is_block)
  }

  /// The first type allowed here that can be generated without extra
  /// information.
  pub fn default_type(&self) -> Option<NodeType> {
    self
      .data()
      .next
      .iter()
      .find(|&&(ty, _)| {
        let data = self.schema.node_data(ty);
        !(data.is_text || data.has_required_attrs())
      })
      .map(|&(ty, _)| self.schema.node_type_at(ty))
  }

  /// Whether this state and `other` accept at least one common type.
  pub fn compatible(&self, other: &ContentMatch) -> bool {
    if !self.schema.ptr_eq(&other.schema) {
      return false;
    }
    let theirs = &other.data().next;
    self
      .data()
      .next
      .iter()
      .any(|(ty, _)| theirs.iter().any(|(other_ty, _)| other_ty == ty))
  }

  pub fn edge_count(&self) -> usize {
    self.data().next.len()
  }

  pub fn edge(&self, n: usize) -> Option<MatchEdge> {
    self.data().next.get(n).map(|&(ty, next)| {
      MatchEdge {
        ty:   self.schema.node_type_at(ty),
        next: self.at(next),
      }
    })
  }

  /// Find the shortest sequence of generatable nodes that, inserted here,
  /// makes the children of `after` from `start_index` on match. When
  /// `to_end` is set the resulting state must also be a valid end.
  pub fn fill_before(&self, after: &Fragment, to_end: bool, start_index: usize) -> Option<Fragment> {
    let mut seen = HashSet::from([self.state]);
    let mut queue = VecDeque::from([(self.state, Vec::<usize>::new())]);
    while let Some((state, types)) = queue.pop_front() {
      let here = self.at(state);
      if let Some(finished) = here.match_fragment_range(after, start_index, after.child_count()) {
        if !to_end || finished.valid_end() {
          let nodes: Option<Vec<Node>> = types
            .iter()
            .map(|&ty| {
              self
                .schema
                .node_type_at(ty)
                .create_and_fill(None, Fragment::empty(), &[])
            })
            .collect();
          if let Some(nodes) = nodes {
            return Some(Fragment::from_vec(nodes));
          }
        }
      }
      for &(ty, next) in &self.schema.state(state).next {
        let data = self.schema.node_data(ty);
        if !(data.is_text || data.has_required_attrs()) && seen.insert(next) {
          let mut path = types.clone();
          path.push(ty);
          queue.push_back((next, path));
        }
      }
    }
    None
  }

  /// Find the wrapper types needed to allow a node of `target` here, an
  /// empty vector when it is allowed as is.
  pub fn find_wrapping(&self, target: &NodeType) -> Option<Vec<NodeType>> {
    if !target.schema().ptr_eq(&self.schema) {
      return None;
    }
    let key = (self.state, target.index());
    let wrapping = match self.schema.cached_wrapping(key) {
      Some(cached) => cached,
      None => {
        let computed = self.compute_wrapping(target.index());
        self.schema.cache_wrapping(key, computed.clone());
        computed
      },
    };
    wrapping.map(|types| {
      types
        .into_iter()
        .map(|ty| self.schema.node_type_at(ty))
        .collect()
    })
  }

  fn compute_wrapping(&self, target: usize) -> Option<Vec<usize>> {
    struct Active {
      state: usize,
      ty:    Option<usize>,
      via:   Option<usize>,
    }

    let mut seen = HashSet::new();
    let mut active = vec![Active {
      state: self.state,
      ty:    None,
      via:   None,
    }];
    let mut head = 0;
    while head < active.len() {
      let current = head;
      head += 1;
      let state = self.schema.state(active[current].state);
      if state.next.iter().any(|&(ty, _)| ty == target) {
        let mut result = Vec::new();
        let mut at = Some(current);
        while let Some(i) = at {
          let Some(ty) = active[i].ty else {
            break;
          };
          result.push(ty);
          at = active[i].via;
        }
        result.reverse();
        return Some(result);
      }
      for &(ty, next) in &state.next {
        let data = self.schema.node_data(ty);
        if !data.is_leaf()
          && !data.has_required_attrs()
          && !seen.contains(&ty)
          && (active[current].ty.is_none() || self.schema.state(next).valid_end)
        {
          seen.insert(ty);
          active.push(Active {
            state: data.content,
            ty:    Some(ty),
            via:   Some(current),
          });
        }
      }
    }
    None
  }
}

impl PartialEq for ContentMatch {
  fn eq(&self, other: &Self) -> bool {
    self.state == other.state && self.schema.ptr_eq(&other.schema)
  }
}

impl Eq for ContentMatch {}

impl fmt::Debug for ContentMatch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut seen = vec![self.state];
    let mut i = 0;
    while i < seen.len() {
      let id = seen[i];
      let state = self.schema.state(id);
      write!(f, "{}{}", if state.valid_end { "*" } else { "" }, id)?;
      for (n, &(ty, next)) in state.next.iter().enumerate() {
        let sep = if n == 0 { " " } else { ", " };
        write!(f, "{sep}{}->{next}", self.schema.node_data(ty).name)?;
        if !seen.contains(&next) {
          seen.push(next);
        }
      }
      if i + 1 < seen.len() {
        writeln!(f)?;
      }
      i += 1;
    }
    Ok(())
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    schema::SchemaSpec,
    test_utils::{
      self,
      schema,
    },
  };

  fn accepts(expr: &str, types: &str) -> bool {
    let schema = expr_schema(expr).expect("expression compiles");
    let mut cur = schema.node_type("doc").unwrap().content_match();
    for name in types.split(' ').filter(|t| !t.is_empty()) {
      match cur.match_type(&schema.node_type(name).unwrap()) {
        Some(next) => cur = next,
        None => return false,
      }
    }
    cur.valid_end()
  }

  fn expr_schema(expr: &str) -> std::result::Result<Schema, SchemaError> {
    let json = format!(
      r#"{{
        "nodes": {{
          "doc": {{ "content": "{expr}" }},
          "paragraph": {{ "content": "text*", "group": "block" }},
          "heading": {{ "content": "text*", "group": "block" }},
          "image": {{ "inline": true, "group": "inline", "attrs": {{ "src": {{}} }} }},
          "hard_break": {{ "inline": true, "group": "inline" }},
          "text": {{ "group": "inline" }}
        }}
      }}"#
    );
    Schema::new(SchemaSpec::from_json(&json)?)
  }

  #[test]
  fn matches_sequences_and_repetition() {
    assert!(accepts("", ""));
    assert!(!accepts("", "paragraph"));
    assert!(accepts("paragraph", "paragraph"));
    assert!(!accepts("paragraph", ""));
    assert!(accepts("paragraph*", ""));
    assert!(accepts("paragraph*", "paragraph paragraph paragraph"));
    assert!(!accepts("paragraph+", ""));
    assert!(accepts("paragraph+", "paragraph paragraph"));
    assert!(accepts("heading paragraph?", "heading"));
    assert!(accepts("heading paragraph?", "heading paragraph"));
    assert!(!accepts("heading paragraph?", "heading paragraph paragraph"));
    assert!(accepts("(heading | paragraph)+", "paragraph heading paragraph"));
    assert!(accepts("block+", "heading paragraph"));
    assert!(!accepts("heading block*", "paragraph heading"));
  }

  #[test]
  fn matches_counted_ranges() {
    assert!(!accepts("paragraph{2}", "paragraph"));
    assert!(accepts("paragraph{2}", "paragraph paragraph"));
    assert!(!accepts("paragraph{2}", "paragraph paragraph paragraph"));
    assert!(accepts("paragraph{1,3}", "paragraph paragraph paragraph"));
    assert!(!accepts("paragraph{1,3}", "paragraph paragraph paragraph paragraph"));
    assert!(accepts("paragraph{2,}", "paragraph paragraph paragraph paragraph"));
    assert!(!accepts("paragraph{2,}", "paragraph"));
    assert!(accepts("heading{0,1} paragraph", "paragraph"));
  }

  #[test]
  fn rejects_malformed_expressions() {
    let syntax = |expr: &str| matches!(expr_schema(expr), Err(SchemaError::Syntax { .. }));
    assert!(syntax("paragraph |"));
    assert!(syntax("()"));
    assert!(syntax("(|paragraph)"));
    assert!(syntax("paragraph | | heading"));
    assert!(syntax("(paragraph"));
    assert!(syntax("paragraph{2"));
    assert!(syntax("paragraph{x}"));
    assert!(syntax("nothing"));
    assert!(syntax("paragraph text"));
    assert!(syntax("paragraph)"));
    assert!(syntax("image"));
    assert!(!syntax("image?"));
  }

  #[test]
  fn compiles_deterministically() {
    let a = expr_schema("(heading | paragraph) block*").unwrap();
    let b = expr_schema("(heading | paragraph) block*").unwrap();
    let start_a = a.node_type("doc").unwrap().content_match();
    let start_b = b.node_type("doc").unwrap().content_match();
    assert_eq!(format!("{start_a:?}"), format!("{start_b:?}"));
    assert_eq!(a.state_count(), b.state_count());
  }

  #[test]
  fn shares_identical_expressions() {
    let schema = schema();
    let paragraph = schema.node_type("paragraph").unwrap();
    let heading = schema.node_type("heading").unwrap();
    assert_eq!(paragraph.content_match(), heading.content_match());
  }

  #[test]
  fn fill_before_finds_shortest_bridge() {
    let schema = schema();
    let doc = schema.top_node_type().content_match();
    let filled = doc.fill_before(&Fragment::empty(), true, 0).unwrap();
    assert_eq!(filled.to_string(), "<paragraph>");

    let li = schema.node_type("list_item").unwrap().content_match();
    let after = Fragment::from(test_utils::blockquote([test_utils::p([])]));
    assert_eq!(li.fill_before(&after, false, 0).unwrap().to_string(), "<paragraph>");

    let paragraph = schema.node_type("paragraph").unwrap().content_match();
    assert!(paragraph.fill_before(&Fragment::from(test_utils::p([])), false, 0).is_none());
  }

  #[test]
  fn find_wrapping_uses_cache() {
    let schema = schema();
    let doc = schema.top_node_type().content_match();
    let li = schema.node_type("list_item").unwrap();
    let wrapping = doc.find_wrapping(&li).unwrap();
    let names: Vec<_> = wrapping.iter().map(|t| t.name().to_string()).collect();
    assert_eq!(names, ["ordered_list"]);
    assert_eq!(doc.find_wrapping(&li), Some(wrapping));

    let paragraph = schema.node_type("paragraph").unwrap();
    assert_eq!(doc.find_wrapping(&paragraph), Some(Vec::new()));
    let text = schema.text_type();
    assert!(doc.find_wrapping(&text).is_some_and(|w| w.len() == 1));
  }

  #[test]
  fn default_type_and_edges() {
    let schema = schema();
    let doc = schema.top_node_type().content_match();
    assert_eq!(doc.default_type().unwrap().name(), "paragraph");
    assert!(doc.edge_count() > 3);
    assert_eq!(doc.edge(0).unwrap().ty.name(), "paragraph");
    assert!(doc.edge(100).is_none());
    let paragraph = schema.node_type("paragraph").unwrap().content_match();
    assert!(paragraph.inline_content());
    assert!(!doc.inline_content());
  }
}
