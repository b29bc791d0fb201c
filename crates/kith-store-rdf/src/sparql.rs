//! A small typed builder for the SPARQL dialect spoken by the triple store.
//!
//! Only what the assembler and the filter translator need is modelled:
//! triple patterns, `OPTIONAL`/`GRAPH` groups, filters, scalar
//! sub-selects, `GROUP_CONCAT` aggregates and function calls (including the
//! store's property functions, rendered as `<iri>(?x)`). Rendering happens
//! through [`std::fmt::Display`].

use std::fmt::{self, Display, Formatter, Write as _};

use oxrdf::{Literal, NamedNode, NamedNodeRef, Variable};

use crate::vocab::{fun, tracker};

// ─── Variables ───────────────────────────────────────────────────────────────

/// Hands out fresh, query-unique variable names.
#[derive(Debug, Default)]
pub struct VariableFactory {
  next: usize,
}

impl VariableFactory {
  pub fn fresh(&mut self) -> Variable {
    self.next += 1;
    Variable::new_unchecked(format!("_{}", self.next))
  }
}

pub fn var(name: &str) -> Variable { Variable::new_unchecked(name) }

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
  Eq,
  NotEq,
  Less,
  LessOrEq,
  GreaterOrEq,
  And,
  Or,
}

impl Operator {
  fn symbol(self) -> &'static str {
    match self {
      Self::Eq => "=",
      Self::NotEq => "!=",
      Self::Less => "<",
      Self::LessOrEq => "<=",
      Self::GreaterOrEq => ">=",
      Self::And => "&&",
      Self::Or => "||",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Var(Variable),
  Iri(NamedNode),
  Literal(Literal),
  Integer(i64),
  Bool(bool),
  /// `<iri>(args...)`: functions and property functions alike.
  Call(NamedNode, Vec<Expr>),
  Str(Box<Expr>),
  Bound(Variable),
  If(Box<Expr>, Box<Expr>, Box<Expr>),
  Binary(Box<Expr>, Operator, Box<Expr>),
  In(Box<Expr>, Vec<Expr>),
  Exists(Group),
  GroupConcat(Box<Expr>, String),
  SubSelect(Box<Select>),
}

impl Expr {
  pub fn string(value: impl Into<String>) -> Self {
    Self::Literal(Literal::new_simple_literal(value))
  }

  pub fn typed(value: impl Into<String>, datatype: NamedNodeRef<'_>) -> Self {
    Self::Literal(Literal::new_typed_literal(value, datatype))
  }

  pub fn call(function: NamedNodeRef<'_>, args: Vec<Expr>) -> Self {
    Self::Call(function.into_owned(), args)
  }

  /// `tracker:id(x)`
  pub fn id_of(self) -> Self { Self::call(tracker::ID, vec![self]) }

  /// `tracker:coalesce(x, "")`
  pub fn or_empty(self) -> Self {
    Self::call(tracker::COALESCE, vec![self, Self::string("")])
  }

  pub fn lower_case(self) -> Self { Self::call(fun::LOWER_CASE, vec![self]) }

  pub fn concat(parts: Vec<Expr>) -> Self { Self::call(fun::CONCAT, parts) }

  pub fn str(self) -> Self { Self::Str(Box::new(self)) }

  pub fn group_concat(self, separator: impl Into<String>) -> Self {
    Self::GroupConcat(Box::new(self), separator.into())
  }

  pub fn binary(self, op: Operator, rhs: Expr) -> Self {
    Self::Binary(Box::new(self), op, Box::new(rhs))
  }

  pub fn eq(self, rhs: Expr) -> Self { self.binary(Operator::Eq, rhs) }

  pub fn is_in(self, items: Vec<Expr>) -> Self { Self::In(Box::new(self), items) }

  pub fn sub_select(select: Select) -> Self { Self::SubSelect(Box::new(select)) }

  pub fn if_else(condition: Expr, then: Expr, otherwise: Expr) -> Self {
    Self::If(Box::new(condition), Box::new(then), Box::new(otherwise))
  }

  /// Conjunction of all `parts`; `true` when empty.
  pub fn all(parts: Vec<Expr>) -> Self { Self::fold(parts, Operator::And, true) }

  /// Disjunction of all `parts`; `false` when empty.
  pub fn any(parts: Vec<Expr>) -> Self { Self::fold(parts, Operator::Or, false) }

  fn fold(parts: Vec<Expr>, op: Operator, identity: bool) -> Self {
    let mut parts = parts.into_iter();
    match parts.next() {
      None => Self::Bool(identity),
      Some(first) => parts.fold(first, |acc, next| acc.binary(op, next)),
    }
  }
}

impl From<Variable> for Expr {
  fn from(v: Variable) -> Self { Self::Var(v) }
}

impl From<&Variable> for Expr {
  fn from(v: &Variable) -> Self { Self::Var(v.clone()) }
}

impl From<NamedNodeRef<'_>> for Expr {
  fn from(iri: NamedNodeRef<'_>) -> Self { Self::Iri(iri.into_owned()) }
}

impl From<NamedNode> for Expr {
  fn from(iri: NamedNode) -> Self { Self::Iri(iri) }
}

impl Display for Expr {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Self::Var(v) => write!(f, "{v}"),
      Self::Iri(iri) => write!(f, "{iri}"),
      Self::Literal(l) => write!(f, "{l}"),
      Self::Integer(i) => write!(f, "{i}"),
      Self::Bool(b) => write!(f, "{b}"),
      Self::Call(function, args) => {
        write!(f, "{function}(")?;
        write_list(f, args, ", ")?;
        f.write_char(')')
      }
      Self::Str(e) => write!(f, "str({e})"),
      Self::Bound(v) => write!(f, "BOUND({v})"),
      Self::If(c, t, e) => write!(f, "IF({c}, {t}, {e})"),
      Self::Binary(l, op, r) => write!(f, "({l} {} {r})", op.symbol()),
      Self::In(e, items) => {
        write!(f, "{e} IN (")?;
        write_list(f, items, ", ")?;
        f.write_char(')')
      }
      Self::Exists(group) => write!(f, "EXISTS {group}"),
      Self::GroupConcat(e, separator) => {
        write!(f, "GROUP_CONCAT({e}, {})", Literal::new_simple_literal(separator))
      }
      Self::SubSelect(select) => write!(f, "({select})"),
    }
  }
}

fn write_list(f: &mut Formatter<'_>, items: &[Expr], separator: &str) -> fmt::Result {
  for (i, item) in items.iter().enumerate() {
    if i > 0 {
      f.write_str(separator)?;
    }
    write!(f, "{item}")?;
  }
  Ok(())
}

// ─── Patterns ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
  Triple { subject: Expr, predicate: NamedNode, object: Expr },
  Optional(Group),
  Graph(Variable, Group),
  Filter(Expr),
}

impl Pattern {
  pub fn triple(
    subject: impl Into<Expr>,
    predicate: NamedNodeRef<'_>,
    object: impl Into<Expr>,
  ) -> Self {
    Self::Triple {
      subject:   subject.into(),
      predicate: predicate.into_owned(),
      object:    object.into(),
    }
  }
}

impl Display for Pattern {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Self::Triple { subject, predicate, object } => {
        write!(f, "{subject} {predicate} {object} .")
      }
      Self::Optional(group) => write!(f, "OPTIONAL {group}"),
      Self::Graph(graph, group) => write!(f, "GRAPH {graph} {group}"),
      Self::Filter(e) => write!(f, "FILTER({e})"),
    }
  }
}

/// A `{ ... }` group graph pattern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group(pub Vec<Pattern>);

impl Group {
  pub fn new() -> Self { Self::default() }

  pub fn push(&mut self, pattern: Pattern) { self.0.push(pattern); }

  pub fn with(mut self, pattern: Pattern) -> Self {
    self.0.push(pattern);
    self
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl Display for Group {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.write_str("{ ")?;
    for pattern in &self.0 {
      write!(f, "{pattern} ")?;
    }
    f.write_char('}')
  }
}

// ─── Select ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct OrderCondition {
  pub expr:       Expr,
  pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
  pub projections: Vec<Expr>,
  pub pattern:     Group,
  pub order_by:    Vec<OrderCondition>,
  pub limit:       Option<usize>,
}

impl Select {
  pub fn new() -> Self { Self::default() }

  /// Add a projection and return its zero-based column index.
  pub fn project(&mut self, expr: Expr) -> usize {
    self.projections.push(expr);
    self.projections.len() - 1
  }

  pub fn restrict(&mut self, pattern: Pattern) { self.pattern.push(pattern); }

  pub fn filter(&mut self, expr: Expr) { self.pattern.push(Pattern::Filter(expr)); }

  pub fn is_empty(&self) -> bool {
    self.projections.is_empty() && self.pattern.is_empty()
  }

  /// One-projection scalar sub-select.
  pub fn scalar(expr: Expr, pattern: Group) -> Self {
    Self { projections: vec![expr], pattern, ..Self::default() }
  }
}

impl Display for Select {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.write_str("SELECT ")?;
    write_list(f, &self.projections, " ")?;
    write!(f, " WHERE {}", self.pattern)?;

    if !self.order_by.is_empty() {
      f.write_str(" ORDER BY")?;
      for condition in &self.order_by {
        let direction = if condition.descending { "DESC" } else { "ASC" };
        write!(f, " {direction}({})", condition.expr)?;
      }
    }

    if let Some(limit) = self.limit {
      write!(f, " LIMIT {limit}")?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::vocab::nco;

  #[test]
  fn renders_select_with_pattern_order_and_limit() {
    let contact = var("contact");
    let mut select = Select::new();
    assert_eq!(select.project(contact.clone().into()), 0);
    assert_eq!(select.project(Expr::from(&contact).id_of()), 1);
    let person = Pattern::triple(&contact, oxrdf::vocab::rdf::TYPE, nco::PERSON_CONTACT);
    select.restrict(person);
    select.order_by.push(OrderCondition {
      expr:       Expr::call(nco::NAME_GIVEN, vec![contact.into()]),
      descending: true,
    });
    select.limit = Some(3);

    let text = select.to_string();
    assert!(text.starts_with("SELECT ?contact <http://www.tracker-project.org/"));
    assert!(text.contains("tracker#id>(?contact) WHERE { "));
    assert!(text.contains("rdf-syntax-ns#type> <http://www.semanticdesktop.org/"));
    assert!(text.contains("nco#PersonContact> ."));
    assert!(text.contains(" ORDER BY DESC(<"));
    assert!(text.contains("nco#nameGiven>(?contact))"));
    assert!(text.ends_with(" LIMIT 3"));
  }

  #[test]
  fn folds_boolean_lists() {
    assert_eq!(Expr::all(vec![]).to_string(), "true");
    assert_eq!(Expr::any(vec![]).to_string(), "false");
    let a = Expr::Var(var("a"));
    let b = Expr::Var(var("b"));
    assert_eq!(Expr::any(vec![a, b]).to_string(), "(?a || ?b)");
  }

  #[test]
  fn fresh_variables_are_unique() {
    let mut vars = VariableFactory::default();
    assert_ne!(vars.fresh(), vars.fresh());
  }
}
