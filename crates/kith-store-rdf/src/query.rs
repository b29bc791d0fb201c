//! Query assembly.
//!
//! [`QueryBuilder::build`] turns a contact type's schema, a filter, sort
//! orders and a fetch hint into one wide projection query. Every projected
//! column is allocated through [`Select::project`], and the indices are kept
//! in a [`DetailLayout`] per bound detail. The decoder reads those layouts
//! instead of re-walking the schema.
//!
//! Base columns come first:
//!
//! | column | content                       |
//! |--------|-------------------------------|
//! | 0      | contact IRI                   |
//! | 1      | numeric contact id            |
//! | 2      | affiliation IRI (may be unset)|
//! | 3      | affiliation label             |

use std::collections::BTreeSet;

use kith_core::{
  contact::{ContactType, HAS_MEMBER, LocalId},
  filter::Filter,
  hint::FetchHint,
  sort::SortOrder,
  store::ContactQuery,
};
use oxrdf::Variable;

use crate::{
  Error, Result,
  cache::ResourceCache,
  config::EngineConfig,
  packing::{self, separator},
  schema::{DetailDefinition, FieldDefinition, Property, Schema, SchemaProvider},
  sparql::{Expr, Group, Operator, Pattern, Select, VariableFactory, var},
  vocab::{nao, nco, rdf, rdfs},
};

pub const COLUMN_CONTACT: usize = 0;
pub const COLUMN_ID: usize = 1;
pub const COLUMN_CONTEXT: usize = 2;
pub const COLUMN_CONTEXT_LABEL: usize = 3;

// ─── Column layout ───────────────────────────────────────────────────────────

/// One `<FIELD>`-separated slot of a multi-valued detail item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
  DetailUri,
  /// Typed value of the field at this index.
  Value { field: usize },
  /// Custom payload of the field at this index.
  CustomValues { field: usize },
  /// Class ids of the detail resource, mapped to the field's sub-types.
  ClassSubTypes { field: usize },
}

/// A column of a unique detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueSlot {
  pub field:  usize,
  pub column: usize,
  /// The column holds custom values rather than the typed value.
  pub custom: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailUriSource {
  /// The affiliation IRI from the base columns.
  Affiliation,
  Column(usize),
}

/// Values reached through one sub-type property, in place of the last
/// step of the detail's chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubTypeColumn {
  pub column: usize,
  pub label:  String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailLayout {
  Unique {
    slots:            Vec<UniqueSlot>,
    detail_uri:       Option<DetailUriSource>,
    /// Field taking the labels of the non-empty sub-type columns.
    sub_type_field:   Option<usize>,
    sub_type_columns: Vec<SubTypeColumn>,
  },
  Multi {
    /// Aggregate over every instance, keyed by the empty sub-type.
    main:             usize,
    tokens:           Vec<Token>,
    /// Field whose sub-type is given by the column an instance shows up in.
    sub_type_field:   Option<usize>,
    sub_type_columns: Vec<SubTypeColumn>,
  },
}

/// Columns `[first_column, last_column)` belong to `detail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailBinding {
  pub detail:       usize,
  pub first_column: usize,
  pub last_column:  usize,
  pub layout:       DetailLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipColumns {
  /// Ids of the groups this contact belongs to.
  pub groups:  usize,
  /// Ids of this group's members; only for groups.
  pub members: Option<usize>,
}

// ─── Query context ───────────────────────────────────────────────────────────

/// Everything the decoder needs to know about one assembled query.
#[derive(Debug, Clone)]
pub struct QueryContext<'a> {
  pub schema:               &'a Schema,
  pub query:                Select,
  pub bindings:             Vec<DetailBinding>,
  /// Requested and implied detail names.
  pub detail_names:         BTreeSet<String>,
  /// Requested names unknown to the schema; fetched as custom details.
  pub custom_detail_hints:  BTreeSet<String>,
  /// Contact ids in the order their first row appeared.
  pub contact_ids:          Vec<LocalId>,
  pub custom_detail_column: Option<usize>,
  pub relationship_columns: Option<RelationshipColumns>,
  /// Results come back in the requested order.
  pub sorted:               bool,
  pub fetch_all_details:    bool,
}

impl QueryContext<'_> {
  pub fn contact_type(&self) -> ContactType { self.schema.contact_type }

  pub fn detail(&self, binding: &DetailBinding) -> &DetailDefinition {
    &self.schema.details[binding.detail]
  }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

pub struct QueryBuilder<'a> {
  pub(crate) schema:  &'a Schema,
  pub(crate) config:  &'a EngineConfig,
  pub(crate) cache:   &'a ResourceCache,
  pub(crate) vars:    VariableFactory,
  pub(crate) contact: Variable,
  pub(crate) context: Variable,
}

impl<'a> QueryBuilder<'a> {
  pub fn new(
    schema: &'a Schema,
    config: &'a EngineConfig,
    cache: &'a ResourceCache,
  ) -> Self {
    Self {
      schema,
      config,
      cache,
      vars: VariableFactory::default(),
      contact: var("contact"),
      context: var("context"),
    }
  }

  /// Restrictions every query of this contact type carries.
  fn base_patterns(&self) -> Vec<Pattern> {
    let mut patterns: Vec<Pattern> = self
      .schema
      .classes
      .iter()
      .map(|class| Pattern::triple(&self.contact, rdf::TYPE, class.clone()))
      .collect();

    if !self.config.include_self_contact {
      patterns.push(Pattern::Filter(
        Expr::from(&self.contact).binary(Operator::NotEq, nco::DEFAULT_CONTACT_ME.into()),
      ));
    }

    patterns
  }

  /// The four base columns plus the contact type restrictions.
  pub fn base_query(&mut self) -> Select {
    let mut query = Select::new();
    query.project(Expr::from(&self.contact));
    query.project(Expr::from(&self.contact).id_of());
    query.project(Expr::from(&self.context));
    query.project(Expr::call(rdfs::LABEL, vec![Expr::from(&self.context)]));

    for pattern in self.base_patterns() {
      query.restrict(pattern);
    }
    query.restrict(Pattern::Optional(Group::new().with(Pattern::triple(
      &self.contact,
      nco::HAS_AFFILIATION,
      &self.context,
    ))));

    query
  }

  /// Assemble the full fetch query.
  pub fn build(
    mut self,
    filter: &Filter,
    sorting: &[SortOrder],
    hint: &FetchHint,
  ) -> Result<QueryContext<'a>> {
    let schema = self.schema;
    let mut context = QueryContext {
      schema,
      query: self.base_query(),
      bindings: Vec::new(),
      detail_names: BTreeSet::new(),
      custom_detail_hints: BTreeSet::new(),
      contact_ids: Vec::new(),
      custom_detail_column: None,
      relationship_columns: None,
      sorted: false,
      fetch_all_details: hint.detail_names.is_empty(),
    };

    if context.fetch_all_details {
      context.detail_names = schema.details.iter().map(|d| d.name.clone()).collect();
    } else {
      let requested = hint
        .detail_names
        .iter()
        .chain(sorting.iter().map(|order| &order.detail));
      for name in requested {
        match schema.detail(name) {
          Some(detail) => {
            context.detail_names.extend(detail.dependencies.iter().cloned());
          }
          None => {
            context.custom_detail_hints.insert(name.clone());
          }
        }
      }
    }

    self.bind_details(&mut context);

    if !context.custom_detail_hints.is_empty() || context.fetch_all_details {
      let hints = &context.custom_detail_hints;
      let column = self.bind_custom_details(&mut context.query, hints);
      context.custom_detail_column = Some(column);
    }

    for relationship_type in &hint.relationship_types {
      if relationship_type != HAS_MEMBER {
        tracing::warn!(%relationship_type, "unsupported relationship type requested");
      }
    }
    if hint.wants_relationship(HAS_MEMBER) {
      context.relationship_columns = Some(self.bind_relationships(&mut context.query));
    }

    let restriction = self.bind_filter(filter)?;
    if restriction != Expr::Bool(true) {
      context.query.filter(restriction);
    }

    context.sorted = match self.bind_sorting(sorting) {
      Some(conditions) => {
        context.query.order_by = conditions;
        true
      }
      None => false,
    };

    if context.query.is_empty() {
      return Err(Error::unspecified("assembled query is empty"));
    }

    Ok(context)
  }

  /// Assemble an id-only query: contact IRI, id, then one column per sort
  /// key. Fails when a sort order cannot be expressed in the query.
  pub fn build_id_query(
    mut self,
    filter: &Filter,
    sorting: &[SortOrder],
    limit: Option<usize>,
  ) -> Result<Select> {
    let mut query = Select::new();
    query.project(Expr::from(&self.contact));
    query.project(Expr::from(&self.contact).id_of());
    for pattern in self.base_patterns() {
      query.restrict(pattern);
    }

    let restriction = self.bind_filter(filter)?;
    if restriction != Expr::Bool(true) {
      query.filter(restriction);
    }

    let conditions = self.bind_sorting(sorting).ok_or_else(|| {
      Error::not_supported("sort order cannot be evaluated by the store")
    })?;
    for condition in &conditions {
      query.project(condition.expr.clone());
    }
    query.order_by = conditions;
    query.limit = limit;

    Ok(query)
  }

  // ── Details ───────────────────────────────────────────────────────────

  fn bind_details(&mut self, context: &mut QueryContext<'a>) {
    let schema = self.schema;
    for (index, detail) in schema.details.iter().enumerate() {
      if detail.synthesized || !context.detail_names.contains(&detail.name) {
        continue;
      }
      if detail.fields.is_empty() {
        tracing::warn!(detail = %detail.name, "detail has no fields, skipping");
        continue;
      }

      let first_column = context.query.projections.len();
      let layout = if detail.unique {
        self.bind_unique_detail(detail, &mut context.query)
      } else {
        self.bind_multi_detail(detail, &mut context.query)
      };
      let last_column = context.query.projections.len();

      context.bindings.push(DetailBinding {
        detail: index,
        first_column,
        last_column,
        layout,
      });
    }
  }

  /// Columns of details read through the affiliation are blank on rows
  /// without one.
  fn guarded(&self, detail: &DetailDefinition, expr: Expr) -> Expr {
    if detail.has_context {
      Expr::if_else(Expr::Bound(self.context.clone()), expr, Expr::string(""))
    } else {
      expr
    }
  }

  pub(crate) fn subject_of(&self, detail: &DetailDefinition) -> Variable {
    if detail.has_context { self.context.clone() } else { self.contact.clone() }
  }

  fn bind_unique_detail(
    &mut self,
    detail: &DetailDefinition,
    query: &mut Select,
  ) -> DetailLayout {
    let subject = self.subject_of(detail);
    let resource = detail.resource_from_subject();
    let mut slots = Vec::new();

    for (index, field) in detail.fields.iter().enumerate() {
      if field.synthesized || field.has_sub_types_by_property() {
        continue;
      }

      if !field.without_mapping {
        let simple = resource.is_empty()
          && !detail.has_owner
          && field.instances.is_empty()
          && matches!(field.chain.as_slice(), [p] if !p.inverse);

        let expr = if simple {
          Expr::Call(field.chain[0].iri.clone(), vec![Expr::from(&subject)])
        } else {
          let chain: Vec<Property> =
            resource.iter().chain(&field.chain).cloned().collect();
          let value = self.list_of(&subject, &chain, field);
          match chain.first() {
            Some(owner) if detail.has_owner => {
              let graph = self.graph_of(&subject, owner, None);
              with_graph(value, graph)
            }
            _ => value,
          }
        };

        let column = query.project(self.guarded(detail, expr));
        slots.push(UniqueSlot { field: index, column, custom: false });
      }

      if field.permits_custom_values {
        let expr = self.custom_values_of(&subject, resource, &field.name);
        let column = query.project(self.guarded(detail, expr));
        slots.push(UniqueSlot { field: index, column, custom: true });
      }
    }

    // One column per sub-type property, walking the field's chain with its
    // last step swapped for the sub-type property.
    let mut sub_type_field = None;
    let mut sub_type_columns = Vec::new();
    if let Some((index, properties)) = detail.property_sub_types() {
      sub_type_field = Some(index);
      let field = &detail.fields[index];
      for sub_type in properties {
        let mut chain: Vec<Property> =
          resource.iter().chain(&field.chain).cloned().collect();
        if let Some(last) = chain.last_mut() {
          last.iri = sub_type.property.clone();
        }
        let expr = self.list_of(&subject, &chain, field);
        sub_type_columns.push(SubTypeColumn {
          column: query.project(self.guarded(detail, expr)),
          label:  sub_type.label.clone(),
        });
      }
    }

    let detail_uri = if detail.detail_uri_from_affiliation() {
      Some(DetailUriSource::Affiliation)
    } else if detail.has_detail_uri() {
      let mut group = Group::new();
      let res = self.walk(&subject, resource, &mut group);
      let uris = Expr::from(&res).str().group_concat(separator(packing::LIST));
      let expr = Expr::sub_select(Select::scalar(uris, group)).or_empty();
      let expr = self.guarded(detail, expr);
      Some(DetailUriSource::Column(query.project(expr)))
    } else {
      None
    };

    DetailLayout::Unique { slots, detail_uri, sub_type_field, sub_type_columns }
  }

  fn bind_multi_detail(
    &mut self,
    detail: &DetailDefinition,
    query: &mut Select,
  ) -> DetailLayout {
    let subject = self.subject_of(detail);
    let resource = detail.resource_from_subject();

    let mut tokens = Vec::new();
    if detail.has_detail_uri() {
      tokens.push(Token::DetailUri);
    }

    // Fields walking inverse properties go last.
    let (forward, inverse): (Vec<_>, Vec<_>) = detail
      .fields
      .iter()
      .enumerate()
      .partition(|(_, f)| !f.has_inverse_property());

    for (index, field) in forward.into_iter().chain(inverse) {
      if field.synthesized || field.has_sub_types_by_property() {
        continue;
      }
      if field.has_sub_types_by_class() {
        tokens.push(Token::ClassSubTypes { field: index });
        continue;
      }
      if !field.without_mapping {
        tokens.push(Token::Value { field: index });
      }
      if field.permits_custom_values {
        tokens.push(Token::CustomValues { field: index });
      }
    }

    let main_expr = self.aggregate(detail, &subject, resource, &tokens);
    let main = query.project(self.guarded(detail, main_expr));

    let mut sub_type_field = None;
    let mut sub_type_columns = Vec::new();

    if let Some((index, properties)) = detail.property_sub_types() {
      sub_type_field = Some(index);
      for sub_type in properties {
        let mut chain = resource.to_vec();
        if let Some(last) = chain.last_mut() {
          last.iri = sub_type.property.clone();
        }
        let expr = self.aggregate(detail, &subject, &chain, &tokens);
        sub_type_columns.push(SubTypeColumn {
          column: query.project(self.guarded(detail, expr)),
          label:  sub_type.label.clone(),
        });
      }
    }

    DetailLayout::Multi { main, tokens, sub_type_field, sub_type_columns }
  }

  /// `GROUP_CONCAT` over every detail resource reached through `chain`, one
  /// `<FIELD>`-joined item per resource.
  fn aggregate(
    &mut self,
    detail: &DetailDefinition,
    subject: &Variable,
    chain: &[Property],
    tokens: &[Token],
  ) -> Expr {
    let mut group = Group::new();
    let mut previous = subject.clone();
    let res = self.walk_with(&mut previous, chain, &mut group);

    let graph = match chain.last() {
      Some(owner) if detail.has_owner => {
        Some(self.graph_of(&previous, owner, Some(&res)))
      }
      _ => None,
    };

    let mut parts = Vec::with_capacity(tokens.len() * 2);
    for (i, token) in tokens.iter().enumerate() {
      if i > 0 {
        parts.push(Expr::string(separator(packing::FIELD)));
      }
      let part = match *token {
        Token::DetailUri => Expr::from(&res).str(),
        Token::Value { field } => {
          let field = &detail.fields[field];
          let value = if field.chain.is_empty() {
            value_of(field, &res)
          } else {
            self.list_of(&res, &field.chain, field)
          };
          match &graph {
            Some(graph) => with_graph(value, graph.clone()),
            None => value,
          }
        }
        Token::CustomValues { field } => {
          self.custom_values_of(&res, &[], &detail.fields[field].name)
        }
        Token::ClassSubTypes { .. } => self.class_ids_of(&res),
      };
      parts.push(part);
    }

    let item = if parts.len() == 1 {
      parts.remove(0)
    } else {
      Expr::concat(parts)
    };

    let select = Select::scalar(item.group_concat(separator(packing::DETAIL)), group);
    Expr::sub_select(select).or_empty()
  }

  // ── Custom details and relationships ──────────────────────────────────

  fn bind_custom_details(
    &mut self,
    query: &mut Select,
    hints: &BTreeSet<String>,
  ) -> usize {
    let detail = self.vars.fresh();
    let field = self.vars.fresh();
    let value = self.vars.fresh();

    let values = Select::scalar(
      Expr::concat(vec![
        Expr::from(&field).id_of().str(),
        Expr::string(":"),
        Expr::from(&value).str(),
      ])
      .group_concat(separator(packing::LIST)),
      Group::new().with(Pattern::triple(&field, nao::PROPERTY_VALUE, &value)),
    );

    let fields = Select::scalar(
      Expr::concat(vec![
        Expr::call(nao::PROPERTY_NAME, vec![Expr::from(&field)]),
        Expr::string(separator(packing::FIELD)),
        Expr::sub_select(values).or_empty(),
      ])
      .group_concat(separator(packing::FIELD)),
      Group::new().with(Pattern::triple(&detail, nao::HAS_PROPERTY, &field)),
    );

    let detail_name = Expr::call(nao::PROPERTY_NAME, vec![Expr::from(&detail)]);
    let mut group =
      Group::new().with(Pattern::triple(&self.contact, nao::HAS_PROPERTY, &detail));
    if !hints.is_empty() {
      let names = hints.iter().map(|h| Expr::string(h.as_str())).collect();
      group.push(Pattern::Filter(detail_name.clone().is_in(names)));
    }

    let details = Select::scalar(
      Expr::concat(vec![
        detail_name,
        Expr::string(separator(packing::FIELD)),
        Expr::sub_select(fields).or_empty(),
      ])
      .group_concat(separator(packing::DETAIL)),
      group,
    );

    query.project(Expr::sub_select(details).or_empty())
  }

  fn bind_relationships(&mut self, query: &mut Select) -> RelationshipColumns {
    let group = self.vars.fresh();
    let groups = Select::scalar(
      Expr::from(&group).id_of().str().group_concat(separator(packing::LIST)),
      Group::new().with(Pattern::triple(&self.contact, nco::BELONGS_TO_GROUP, &group)),
    );
    let groups = query.project(Expr::sub_select(groups).or_empty());

    let members = (self.schema.contact_type == ContactType::Group).then(|| {
      let member = self.vars.fresh();
      let members = Select::scalar(
        Expr::from(&member).id_of().str().group_concat(separator(packing::LIST)),
        Group::new().with(Pattern::triple(&member, nco::BELONGS_TO_GROUP, &self.contact)),
      );
      query.project(Expr::sub_select(members).or_empty())
    });

    RelationshipColumns { groups, members }
  }

  // ── Pattern helpers ───────────────────────────────────────────────────

  /// Push patterns walking `chain` from `subject` and return the variable
  /// bound to its end.
  pub(crate) fn walk(
    &mut self,
    subject: &Variable,
    chain: &[Property],
    group: &mut Group,
  ) -> Variable {
    let mut previous = subject.clone();
    self.walk_with(&mut previous, chain, group)
  }

  /// Like [`Self::walk`]; `previous` ends up bound to the subject of the last
  /// step.
  fn walk_with(
    &mut self,
    previous: &mut Variable,
    chain: &[Property],
    group: &mut Group,
  ) -> Variable {
    let mut current = previous.clone();
    for property in chain {
      let next = self.vars.fresh();
      group.push(step(&current, property, &next));
      *previous = std::mem::replace(&mut current, next);
    }
    current
  }

  /// `<LIST>`-joined values at the end of `chain`, or `""`.
  fn list_of(
    &mut self,
    subject: &Variable,
    chain: &[Property],
    field: &FieldDefinition,
  ) -> Expr {
    let mut group = Group::new();
    let end = self.walk(subject, chain, &mut group);
    let values = value_of(field, &end).group_concat(separator(packing::LIST));
    Expr::sub_select(Select::scalar(values, group)).or_empty()
  }

  /// `<LIST>`-joined custom values named `name` hanging off the resource at
  /// the end of `prefix`.
  fn custom_values_of(
    &mut self,
    subject: &Variable,
    prefix: &[Property],
    name: &str,
  ) -> Expr {
    let mut group = Group::new();
    let resource = self.walk(subject, prefix, &mut group);
    let property = self.vars.fresh();
    let value = self.vars.fresh();
    group.push(Pattern::triple(&resource, nao::HAS_PROPERTY, &property));
    group.push(Pattern::triple(&property, nao::PROPERTY_NAME, Expr::string(name)));
    group.push(Pattern::triple(&property, nao::PROPERTY_VALUE, &value));

    let values = Expr::from(&value).str().group_concat(separator(packing::LIST));
    Expr::sub_select(Select::scalar(values, group)).or_empty()
  }

  fn class_ids_of(&mut self, resource: &Variable) -> Expr {
    let class = self.vars.fresh();
    let select = Select::scalar(
      Expr::from(&class).id_of().str().group_concat(separator(packing::LIST)),
      Group::new().with(Pattern::triple(resource, rdf::TYPE, &class)),
    );
    Expr::sub_select(select).or_empty()
  }

  /// IRI of the graph holding the `subject property object` triple, or `""`.
  fn graph_of(
    &mut self,
    subject: &Variable,
    property: &Property,
    object: Option<&Variable>,
  ) -> Expr {
    let graph = self.vars.fresh();
    let object = object.cloned().unwrap_or_else(|| self.vars.fresh());
    let mut select = Select::scalar(
      Expr::from(&graph),
      Group::new().with(Pattern::Graph(
        graph,
        Group::new().with(step(subject, property, &object)),
      )),
    );
    select.limit = Some(1);
    Expr::sub_select(select).or_empty()
  }
}

pub(crate) fn step(
  subject: &Variable,
  property: &Property,
  object: &Variable,
) -> Pattern {
  if property.inverse {
    Pattern::triple(object, property.iri.as_ref(), subject)
  } else {
    Pattern::triple(subject, property.iri.as_ref(), object)
  }
}

/// Textual value of `field` bound to `end`; instances are projected as ids.
fn value_of(field: &FieldDefinition, end: &Variable) -> Expr {
  if field.instances.is_empty() {
    Expr::from(end).str()
  } else {
    Expr::from(end).id_of().str()
  }
}

fn with_graph(value: Expr, graph: Expr) -> Expr {
  Expr::concat(vec![value, Expr::string(separator(packing::GRAPH)), graph])
}

// ─── Tooling entry point ─────────────────────────────────────────────────────

fn schema_for(
  schemas: &dyn SchemaProvider,
  contact_type: ContactType,
) -> Result<&Schema> {
  schemas.schema(contact_type).ok_or_else(|| {
    Error::bad_argument(format!("no schema for contact type {contact_type}"))
  })
}

/// The exact query text a fetch of `contact_type` would execute.
pub fn assemble_query(
  schemas: &dyn SchemaProvider,
  config: &EngineConfig,
  cache: &ResourceCache,
  contact_type: ContactType,
  query: &ContactQuery,
) -> Result<String> {
  let schema = schema_for(schemas, contact_type)?;

  let context = QueryBuilder::new(schema, config, cache).build(
    &query.filter,
    &query.sorting,
    &query.fetch_hint,
  )?;

  Ok(context.query.to_string())
}

/// The id-only query for `contact_type`.
pub fn assemble_id_query(
  schemas: &dyn SchemaProvider,
  config: &EngineConfig,
  cache: &ResourceCache,
  contact_type: ContactType,
  query: &ContactQuery,
) -> Result<String> {
  let schema = schema_for(schemas, contact_type)?;

  let select = QueryBuilder::new(schema, config, cache).build_id_query(
    &query.filter,
    &query.sorting,
    query.fetch_hint.max_count,
  )?;

  Ok(select.to_string())
}
