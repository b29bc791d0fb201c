//! Filter and sort-order translation.
//!
//! Filters become one boolean [`Expr`] bound into the outer query with
//! `FILTER(...)`. Leaf filters on detail values turn into `EXISTS` groups
//! walking the detail's property chains from `?contact`, so they are
//! independent of which columns the query projects.

use kith_core::{
  contact::HAS_MEMBER,
  detail::{FieldValue, names},
  filter::{
    ChangeLogEvent, ChangeLogFilter, DetailFilter, DetailRangeFilter, Filter, MatchFlags,
    MatchMode, RelationshipFilter, RelationshipRole,
  },
  sort::{BlankPolicy, SortDirection, SortOrder},
};
use oxrdf::Variable;

use crate::{
  Error, Result, phone,
  query::QueryBuilder,
  schema::{DetailDefinition, FieldDefinition, Property, SubTypes, ValueType},
  sparql::{Expr, Group, Operator, OrderCondition, Pattern, Select},
  vocab::{fun, maemo, nao, nco, nie, rdf, rdfs, xsd},
};

impl QueryBuilder<'_> {
  /// Translate `filter` into a boolean expression over `?contact`.
  pub(crate) fn bind_filter(&mut self, filter: &Filter) -> Result<Expr> {
    match filter {
      Filter::Default => Ok(Expr::Bool(true)),
      Filter::Invalid => Ok(Expr::Bool(false)),
      Filter::LocalId { ids } => {
        if ids.is_empty() {
          return Err(Error::bad_argument("local id filter without ids"));
        }
        let ids = ids.iter().map(|id| Expr::Integer(i64::from(*id))).collect();
        Ok(Expr::from(&self.contact).id_of().is_in(ids))
      }
      Filter::Intersection { filters } => {
        let parts = filters.iter().map(|f| self.bind_filter(f)).collect::<Result<_>>()?;
        Ok(Expr::all(parts))
      }
      Filter::Union { filters } => {
        let parts = filters.iter().map(|f| self.bind_filter(f)).collect::<Result<_>>()?;
        Ok(Expr::any(parts))
      }
      Filter::Detail(filter) => self.bind_detail_filter(filter),
      Filter::DetailRange(filter) => self.bind_range_filter(filter),
      Filter::ChangeLog(filter) => self.bind_change_log_filter(filter),
      Filter::Relationship(filter) => Ok(self.bind_relationship_filter(filter)),
    }
  }

  // ── Detail filters ────────────────────────────────────────────────────

  fn bind_detail_filter(&mut self, filter: &DetailFilter) -> Result<Expr> {
    if filter.detail == names::TYPE {
      return Ok(self.bind_type_filter(filter));
    }

    let schema = self.schema;
    let Some(detail) = schema.detail(&filter.detail) else {
      return Ok(self.bind_custom_detail_filter(filter));
    };

    if detail.synthesized {
      return Err(Error::bad_argument(format!(
        "cannot filter on computed detail {}",
        detail.name
      )));
    }

    let Some(field_name) = &filter.field else {
      return match &filter.value {
        None => Ok(self.detail_exists(detail)),
        Some(value) => {
          let mut parts = Vec::new();
          for field in &detail.fields {
            if field.synthesized || field.sub_types.is_some() {
              continue;
            }
            parts.push(self.bind_field_match(detail, field, value, filter.flags)?);
          }
          Ok(Expr::any(parts))
        }
      };
    };

    if field_name == names::FIELD_CONTEXT {
      if !detail.has_context {
        return Err(Error::bad_argument(format!("{} has no context", detail.name)));
      }
      return Ok(self.bind_context_filter(detail, filter.value.as_ref()));
    }

    let field = detail.field_named(field_name).ok_or_else(|| {
      Error::bad_argument(format!("{} has no field {field_name}", detail.name))
    })?;
    if field.synthesized {
      return Err(Error::bad_argument(format!(
        "cannot filter on computed field {}.{}",
        detail.name, field.name
      )));
    }

    match &filter.value {
      None => Ok(self.field_exists(detail, field)),
      Some(value) if field.sub_types.is_some() => {
        Ok(self.bind_sub_type_filter(detail, field, value, filter.flags))
      }
      Some(value) => self.bind_field_match(detail, field, value, filter.flags),
    }
  }

  /// The contact type is known per query, so the filter folds to a constant.
  fn bind_type_filter(&self, filter: &DetailFilter) -> Expr {
    match &filter.value {
      None => Expr::Bool(true),
      Some(value) => {
        let wanted = value.to_text();
        Expr::Bool(wanted.eq_ignore_ascii_case(&self.schema.contact_type.to_string()))
      }
    }
  }

  fn detail_exists(&mut self, detail: &DetailDefinition) -> Expr {
    if detail.resource.is_empty() {
      let parts = detail
        .fields
        .iter()
        .filter(|f| !f.synthesized && f.sub_types.is_none())
        .map(|f| self.field_exists(detail, f))
        .collect();
      return Expr::any(parts);
    }

    let mut group = Group::new();
    let contact = self.contact.clone();
    self.walk(&contact, &detail.resource, &mut group);
    Expr::Exists(group)
  }

  fn field_exists(&mut self, detail: &DetailDefinition, field: &FieldDefinition) -> Expr {
    let (group, _) = self.field_pattern(detail, field);
    Expr::Exists(group)
  }

  /// Patterns reaching the value of `field` from `?contact`.
  fn field_pattern(
    &mut self,
    detail: &DetailDefinition,
    field: &FieldDefinition,
  ) -> (Group, Variable) {
    let mut group = Group::new();
    let contact = self.contact.clone();
    let resource = self.walk(&contact, &detail.resource, &mut group);

    if field.without_mapping {
      let property = self.vars.fresh();
      let value = self.vars.fresh();
      group.push(Pattern::triple(&resource, nao::HAS_PROPERTY, &property));
      let name = Expr::string(&field.name);
      group.push(Pattern::triple(&property, nao::PROPERTY_NAME, name));
      group.push(Pattern::triple(&property, nao::PROPERTY_VALUE, &value));
      return (group, value);
    }

    let value = self.walk(&resource, &field.chain, &mut group);
    (group, value)
  }

  fn bind_field_match(
    &mut self,
    detail: &DetailDefinition,
    field: &FieldDefinition,
    value: &FieldValue,
    flags: MatchFlags,
  ) -> Result<Expr> {
    if flags.mode == MatchMode::PhoneNumber && detail.name == names::PHONE_NUMBER {
      return Ok(self.bind_phone_number_match(detail, value));
    }

    // Nothing outside the allowable set is ever stored.
    if !field.allowable_values.is_empty() {
      let wanted = wanted_texts(value);
      let possible = field
        .allowable_values
        .iter()
        .any(|allowed| wanted.iter().any(|w| text_matches(allowed, w, flags)));
      if !possible {
        return Ok(Expr::Bool(false));
      }
    }

    let (mut group, end) = self.field_pattern(detail, field);

    let condition = if field.instances.is_empty() {
      value_match(&end, value, flags)
    } else {
      let wanted = value.to_text();
      let ids: Vec<Expr> = field
        .instances
        .iter()
        .filter(|instance| text_matches(&instance.value, &wanted, flags))
        .filter_map(|instance| self.cache.id(instance.iri.as_str()))
        .map(|id| Expr::Integer(i64::from(id)))
        .collect();
      if ids.is_empty() {
        return Ok(Expr::Bool(false));
      }
      Expr::from(&end).id_of().is_in(ids)
    };

    group.push(Pattern::Filter(condition));
    Ok(Expr::Exists(group))
  }

  /// Match on the store-maintained local number of the phone resource.
  fn bind_phone_number_match(
    &mut self,
    detail: &DetailDefinition,
    value: &FieldValue,
  ) -> Expr {
    let length = self.config.local_phone_number_length;
    let local = phone::local_number(&value.to_text(), length);

    let mut group = Group::new();
    let contact = self.contact.clone();
    let resource = self.walk(&contact, &detail.resource, &mut group);
    let number = self.vars.fresh();
    group.push(Pattern::triple(&resource, maemo::LOCAL_PHONE_NUMBER, &number));

    let mode = if local.chars().count() >= length {
      MatchMode::EndsWith
    } else {
      MatchMode::Exactly
    };
    let flags = MatchFlags { mode, case_sensitive: true };
    group.push(Pattern::Filter(string_match(Expr::from(&number).str(), &local, flags)));

    Expr::Exists(group)
  }

  fn bind_sub_type_filter(
    &mut self,
    detail: &DetailDefinition,
    field: &FieldDefinition,
    value: &FieldValue,
    flags: MatchFlags,
  ) -> Expr {
    let wanted = wanted_texts(value);
    let selected = |label: &str| wanted.iter().any(|w| text_matches(label, w, flags));
    let contact = self.contact.clone();

    match &field.sub_types {
      Some(SubTypes::ByClass(classes)) => {
        let classes: Vec<Expr> = classes
          .iter()
          .filter(|c| selected(&c.label))
          .map(|c| Expr::Iri(c.class.clone()))
          .collect();
        if classes.is_empty() {
          return Expr::Bool(false);
        }

        let mut group = Group::new();
        let resource = self.walk(&contact, &detail.resource, &mut group);
        let class = self.vars.fresh();
        group.push(Pattern::triple(&resource, rdf::TYPE, &class));
        group.push(Pattern::Filter(Expr::from(&class).is_in(classes)));
        Expr::Exists(group)
      }
      Some(SubTypes::ByProperty(properties)) => {
        let parts = properties
          .iter()
          .filter(|p| selected(&p.label))
          .map(|sub_type| {
            let mut chain: Vec<Property> =
              detail.resource.iter().chain(&field.chain).cloned().collect();
            if let Some(last) = chain.last_mut() {
              last.iri = sub_type.property.clone();
            }
            let mut group = Group::new();
            self.walk(&contact, &chain, &mut group);
            Expr::Exists(group)
          })
          .collect();
        Expr::any(parts)
      }
      None => Expr::Bool(false),
    }
  }

  fn bind_context_filter(
    &mut self,
    detail: &DetailDefinition,
    value: Option<&FieldValue>,
  ) -> Expr {
    let affiliation = self.vars.fresh();
    let mut group = Group::new().with(Pattern::triple(
      &self.contact,
      nco::HAS_AFFILIATION,
      &affiliation,
    ));
    self.walk(&affiliation, detail.resource_from_subject(), &mut group);

    if let Some(value) = value {
      let label = self.vars.fresh();
      group.push(Pattern::triple(&affiliation, rdfs::LABEL, &label));
      let flags = MatchFlags::new(MatchMode::Exactly);
      let condition = string_match(Expr::from(&label).str(), &value.to_text(), flags);
      group.push(Pattern::Filter(condition));
    }

    Expr::Exists(group)
  }

  /// Details unknown to the schema live as `nao:hasProperty` payload.
  fn custom_detail_pattern(
    &mut self,
    detail: &str,
    field: Option<&str>,
  ) -> (Group, Variable) {
    let node = self.vars.fresh();
    let property = self.vars.fresh();
    let value = self.vars.fresh();

    let mut group = Group::new()
      .with(Pattern::triple(&self.contact, nao::HAS_PROPERTY, &node))
      .with(Pattern::triple(&node, nao::PROPERTY_NAME, Expr::string(detail)))
      .with(Pattern::triple(&node, nao::HAS_PROPERTY, &property));
    if let Some(field) = field {
      group.push(Pattern::triple(&property, nao::PROPERTY_NAME, Expr::string(field)));
    }
    group.push(Pattern::triple(&property, nao::PROPERTY_VALUE, &value));

    (group, value)
  }

  fn bind_custom_detail_filter(&mut self, filter: &DetailFilter) -> Expr {
    let field = filter.field.as_deref();
    let (mut group, value) = self.custom_detail_pattern(&filter.detail, field);
    if let Some(wanted) = &filter.value {
      group.push(Pattern::Filter(value_match(&value, wanted, filter.flags)));
    }
    Expr::Exists(group)
  }

  // ── Range, change log and relationship filters ────────────────────────

  fn bind_range_filter(&mut self, filter: &DetailRangeFilter) -> Result<Expr> {
    let schema = self.schema;
    let (mut group, end, text) = match schema.detail(&filter.detail) {
      None => {
        let field = Some(filter.field.as_str());
        let (group, end) = self.custom_detail_pattern(&filter.detail, field);
        (group, end, true)
      }
      Some(detail) => {
        let field = detail
          .field_named(&filter.field)
          .filter(|f| !f.synthesized && f.sub_types.is_none() && f.instances.is_empty())
          .ok_or_else(|| {
            Error::bad_argument(format!(
              "cannot range-filter on {}.{}",
              filter.detail, filter.field
            ))
          })?;
        let (group, end) = self.field_pattern(detail, field);
        (group, end, is_text(field.value_type))
      }
    };

    let lower_case = text && !filter.flags.case_sensitive;
    let operand = |value: &FieldValue| {
      if lower_case {
        Expr::string(value.to_text().to_lowercase())
      } else {
        literal_of(value)
      }
    };
    let subject = if lower_case {
      Expr::from(&end).str().lower_case()
    } else {
      Expr::from(&end)
    };

    let mut conditions = Vec::new();
    if let Some(min) = &filter.min {
      let op =
        if filter.range.exclude_lower { Operator::Less } else { Operator::LessOrEq };
      conditions.push(operand(min).binary(op, subject.clone()));
    }
    if let Some(max) = &filter.max {
      let op =
        if filter.range.include_upper { Operator::LessOrEq } else { Operator::Less };
      conditions.push(subject.clone().binary(op, operand(max)));
    }
    if !conditions.is_empty() {
      group.push(Pattern::Filter(Expr::all(conditions)));
    }

    Ok(Expr::Exists(group))
  }

  fn bind_change_log_filter(&mut self, filter: &ChangeLogFilter) -> Result<Expr> {
    let property = match filter.event {
      ChangeLogEvent::Added => nie::CONTENT_CREATED,
      ChangeLogEvent::Changed => nie::CONTENT_LAST_MODIFIED,
      ChangeLogEvent::Removed => {
        return Err(Error::not_supported("removed contacts are not tracked"));
      }
    };

    let time = self.vars.fresh();
    let since = Expr::typed(filter.since.to_rfc3339(), xsd::DATE_TIME);
    let group = Group::new()
      .with(Pattern::triple(&self.contact, property, &time))
      .with(Pattern::Filter(Expr::from(&time).binary(Operator::GreaterOrEq, since)));

    Ok(Expr::Exists(group))
  }

  fn bind_relationship_filter(&mut self, filter: &RelationshipFilter) -> Expr {
    if filter.relationship_type != HAS_MEMBER {
      tracing::warn!(
        relationship_type = %filter.relationship_type,
        "unsupported relationship type in filter, matching nothing"
      );
      return Expr::Bool(false);
    }

    if filter
      .related_manager
      .as_ref()
      .is_some_and(|manager| *manager != self.config.manager_uri)
    {
      return Expr::Bool(false);
    }

    let related = Expr::Integer(i64::from(filter.related_contact));
    let mut parts = Vec::new();

    if matches!(filter.role, RelationshipRole::First | RelationshipRole::Either) {
      let group_var = self.vars.fresh();
      parts.push(Expr::Exists(
        Group::new()
          .with(Pattern::triple(&self.contact, nco::BELONGS_TO_GROUP, &group_var))
          .with(Pattern::Filter(Expr::from(&group_var).id_of().eq(related.clone()))),
      ));
    }

    if matches!(filter.role, RelationshipRole::Second | RelationshipRole::Either) {
      let member = self.vars.fresh();
      parts.push(Expr::Exists(
        Group::new()
          .with(Pattern::triple(&member, nco::BELONGS_TO_GROUP, &self.contact))
          .with(Pattern::Filter(Expr::from(&member).id_of().eq(related))),
      ));
    }

    Expr::any(parts)
  }

  // ── Sorting ───────────────────────────────────────────────────────────

  /// `ORDER BY` conditions for `orders`, or `None` when any order cannot be
  /// evaluated by the store and the caller has to sort in memory.
  pub(crate) fn bind_sorting(
    &mut self,
    orders: &[SortOrder],
  ) -> Option<Vec<OrderCondition>> {
    orders.iter().map(|order| self.bind_sort_order(order)).collect()
  }

  fn bind_sort_order(&mut self, order: &SortOrder) -> Option<OrderCondition> {
    // The store sorts unbound values first and compares lower-cased keys.
    if order.case_sensitive || order.blank_policy != BlankPolicy::First {
      tracing::debug!(
        detail = %order.detail,
        field = %order.field,
        "sort order needs in-memory sorting"
      );
      return None;
    }

    let schema = self.schema;
    let (group, end, text) = match schema.detail(&order.detail) {
      None => {
        let field = Some(order.field.as_str());
        let (group, end) = self.custom_detail_pattern(&order.detail, field);
        (group, end, true)
      }
      Some(detail) if detail.synthesized => return None,
      Some(detail) => {
        let field = detail.field_named(&order.field).filter(|f| {
          !f.synthesized && f.sub_types.is_none() && f.instances.is_empty()
        })?;
        let (group, end) = self.field_pattern(detail, field);
        (group, end, is_text(field.value_type))
      }
    };

    let mut select = Select::scalar(Expr::from(&end), group);
    select.limit = Some(1);
    let key = Expr::sub_select(select);

    Some(OrderCondition {
      expr:       if text { key.lower_case() } else { key },
      descending: order.direction == SortDirection::Descending,
    })
  }
}

// ─── Value matching ──────────────────────────────────────────────────────────

fn wanted_texts(value: &FieldValue) -> Vec<String> {
  match value {
    FieldValue::StringList(items) => items.clone(),
    other => vec![other.to_text()],
  }
}

fn is_text(value_type: ValueType) -> bool {
  matches!(value_type, ValueType::String | ValueType::StringList | ValueType::Url)
}

fn literal_of(value: &FieldValue) -> Expr {
  match value {
    FieldValue::String(s) | FieldValue::Url(s) => Expr::string(s.as_str()),
    FieldValue::StringList(items) => Expr::string(items.join(", ")),
    FieldValue::DateTime(dt) => Expr::typed(dt.to_rfc3339(), xsd::DATE_TIME),
    FieldValue::Integer(i) => Expr::typed(i.to_string(), xsd::INTEGER),
    FieldValue::Double(d) => Expr::typed(d.to_string(), xsd::DOUBLE),
    FieldValue::Bool(b) => Expr::typed(b.to_string(), xsd::BOOLEAN),
  }
}

fn string_match(subject: Expr, value: &str, flags: MatchFlags) -> Expr {
  let fold = !flags.case_sensitive && flags.mode != MatchMode::FixedString;
  let (subject, value) = if fold {
    (subject.lower_case(), Expr::string(value.to_lowercase()))
  } else {
    (subject, Expr::string(value))
  };

  match flags.mode {
    MatchMode::Contains => Expr::call(fun::CONTAINS, vec![subject, value]),
    MatchMode::StartsWith => Expr::call(fun::STARTS_WITH, vec![subject, value]),
    MatchMode::EndsWith => Expr::call(fun::ENDS_WITH, vec![subject, value]),
    MatchMode::Exactly | MatchMode::FixedString | MatchMode::PhoneNumber => {
      subject.eq(value)
    }
  }
}

fn value_match(end: &Variable, value: &FieldValue, flags: MatchFlags) -> Expr {
  match value {
    FieldValue::String(s) | FieldValue::Url(s) => {
      string_match(Expr::from(end).str(), s, flags)
    }
    FieldValue::StringList(items) => Expr::any(
      items
        .iter()
        .map(|item| string_match(Expr::from(end).str(), item, flags))
        .collect(),
    ),
    other => Expr::from(end).eq(literal_of(other)),
  }
}

/// In-memory counterpart of [`string_match`], used for instance labels.
fn text_matches(candidate: &str, wanted: &str, flags: MatchFlags) -> bool {
  let fold = !flags.case_sensitive && flags.mode != MatchMode::FixedString;
  let (candidate, wanted) = if fold {
    (candidate.to_lowercase(), wanted.to_lowercase())
  } else {
    (candidate.to_owned(), wanted.to_owned())
  };

  match flags.mode {
    MatchMode::Contains => candidate.contains(&wanted),
    MatchMode::StartsWith => candidate.starts_with(&wanted),
    MatchMode::EndsWith => candidate.ends_with(&wanted),
    MatchMode::Exactly | MatchMode::FixedString | MatchMode::PhoneNumber => {
      candidate == wanted
    }
  }
}

#[cfg(test)]
mod tests {
  use kith_core::{contact::ContactType, filter::RangeFlags};

  use super::*;
  use crate::{cache::ResourceCache, config::EngineConfig, schema::SchemaSet};

  fn translate(contact_type: ContactType, filter: &Filter) -> Result<String> {
    let schemas = SchemaSet::builtin();
    let schema = crate::schema::SchemaProvider::schema(&schemas, contact_type).unwrap();
    let config = EngineConfig::default();
    let mut cache = ResourceCache::new();
    cache.insert(nco::PRESENCE_STATUS_AVAILABLE.as_str(), 41);
    cache.insert(nco::PRESENCE_STATUS_AWAY.as_str(), 42);
    let mut builder = QueryBuilder::new(schema, &config, &cache);
    builder.bind_filter(filter).map(|e| e.to_string())
  }

  #[test]
  fn empty_id_filter_is_rejected() {
    let err = translate(ContactType::Person, &Filter::ids([])).unwrap_err();
    assert!(matches!(err, Error::Core(kith_core::Error::BadArgument(_))));
  }

  #[test]
  fn id_filter_uses_contact_ids() {
    let text = translate(ContactType::Person, &Filter::ids([3, 9])).unwrap();
    assert!(text.ends_with("(?contact) IN (3, 9)"));
  }

  #[test]
  fn type_filter_folds_to_constant() {
    let filter = Filter::detail(names::TYPE, names::FIELD_TYPE, "Group", MatchFlags::default());
    assert_eq!(translate(ContactType::Person, &filter).unwrap(), "false");
    assert_eq!(translate(ContactType::Group, &filter).unwrap(), "true");
  }

  #[test]
  fn case_insensitive_contains_lowers_both_sides() {
    let filter = Filter::detail(
      names::NAME,
      names::FIELD_FIRST_NAME,
      "ANN",
      MatchFlags::new(MatchMode::Contains),
    );
    let text = translate(ContactType::Person, &filter).unwrap();
    assert!(text.starts_with("EXISTS { ?contact <"));
    assert!(text.contains("nco#nameGiven> ?_1 ."));
    assert!(text.contains("#contains>(<http://www.w3.org/2005/xpath-functions#lower-case>"));
    assert!(text.contains("(str(?_1)), \"ann\")"));
  }

  #[test]
  fn unknown_field_of_known_detail_is_rejected() {
    let filter = Filter::detail(names::NAME, "Shoe", "x", MatchFlags::default());
    let err = translate(ContactType::Person, &filter).unwrap_err();
    assert!(matches!(err, Error::Core(kith_core::Error::BadArgument(_))));
  }

  #[test]
  fn unknown_detail_goes_to_custom_properties() {
    let filter = Filter::detail("Hobby2", "Title", "Chess", MatchFlags::default());
    let text = translate(ContactType::Person, &filter).unwrap();
    assert!(text.contains("#propertyName> \"Hobby2\" ."));
    assert!(text.contains("#propertyName> \"Title\" ."));
  }

  #[test]
  fn union_with_unsupported_relationship_keeps_other_branch() {
    let filter = Filter::detail(names::NAME, names::FIELD_FIRST_NAME, "Ann", MatchFlags::default())
      .or(Filter::Relationship(RelationshipFilter {
        relationship_type: "IsSameAs".to_owned(),
        related_contact:   1,
        related_manager:   None,
        role:              RelationshipRole::Either,
      }));
    let text = translate(ContactType::Person, &filter).unwrap();
    assert!(text.starts_with("(EXISTS"));
    assert!(text.ends_with(" || false)"));
  }

  #[test]
  fn membership_of_foreign_manager_matches_nothing() {
    let filter = Filter::Relationship(RelationshipFilter {
      relationship_type: HAS_MEMBER.to_owned(),
      related_contact:   5,
      related_manager:   Some("org.example.other".to_owned()),
      role:              RelationshipRole::First,
    });
    assert_eq!(translate(ContactType::Person, &filter).unwrap(), "false");
  }

  #[test]
  fn membership_in_group_checks_group_id() {
    let filter = Filter::has_member(5, RelationshipRole::First);
    let text = translate(ContactType::Person, &filter).unwrap();
    assert!(text.contains("#belongsToGroup> ?_1 ."));
    assert!(text.contains("(?_1) = 5)"));
  }

  #[test]
  fn instance_values_resolve_to_cached_ids() {
    let filter = Filter::detail(
      names::PRESENCE,
      names::FIELD_PRESENCE_STATE,
      "a",
      MatchFlags::new(MatchMode::StartsWith),
    );
    let text = translate(ContactType::Person, &filter).unwrap();
    assert!(text.contains("IN (41, 42)"));

    let none = Filter::detail(
      names::PRESENCE,
      names::FIELD_PRESENCE_STATE,
      "Busy",
      MatchFlags::default(),
    );
    assert_eq!(translate(ContactType::Person, &none).unwrap(), "false");
  }

  #[test]
  fn phone_numbers_match_on_local_number() {
    let filter = Filter::detail(
      names::PHONE_NUMBER,
      names::FIELD_PHONE_NUMBER,
      "+358 40 123 4567",
      MatchFlags::new(MatchMode::PhoneNumber),
    );
    let text = translate(ContactType::Person, &filter).unwrap();
    assert!(text.contains("localPhoneNumber>"));
    assert!(text.contains("#ends-with>(str("));
    assert!(text.contains("\"1234567\""));

    let short = Filter::detail(
      names::PHONE_NUMBER,
      names::FIELD_PHONE_NUMBER,
      "555p12",
      MatchFlags::new(MatchMode::PhoneNumber),
    );
    let text = translate(ContactType::Person, &short).unwrap();
    assert!(text.contains(" = \"555\")"));
  }

  #[test]
  fn range_bounds_follow_flags() {
    let filter = Filter::DetailRange(DetailRangeFilter {
      detail: names::NAME.to_owned(),
      field:  names::FIELD_LAST_NAME.to_owned(),
      min:    Some("a".into()),
      max:    Some("m".into()),
      range:  RangeFlags { exclude_lower: true, include_upper: true },
      flags:  MatchFlags::default(),
    });
    let text = translate(ContactType::Person, &filter).unwrap();
    assert!(text.contains("(\"a\" < "));
    assert!(text.contains(" <= \"m\")"));
  }

  #[test]
  fn removed_change_log_is_not_supported() {
    let filter = Filter::ChangeLog(ChangeLogFilter {
      event: ChangeLogEvent::Removed,
      since: chrono::Utc::now(),
    });
    let err = translate(ContactType::Person, &filter).unwrap_err();
    assert!(matches!(err, Error::Core(kith_core::Error::NotSupported(_))));
  }

  #[test]
  fn sub_type_filter_targets_discriminator() {
    let filter = Filter::detail("Url", "SubType", "Blog", MatchFlags::default());
    let text = translate(ContactType::Person, &filter).unwrap();
    assert!(text.contains("#blogUrl>"));
    assert!(!text.contains("#websiteUrl>"));
  }

  #[test]
  fn case_sensitive_sorting_is_left_to_the_caller() {
    let schemas = SchemaSet::builtin();
    let schema = crate::schema::SchemaProvider::schema(&schemas, ContactType::Person).unwrap();
    let config = EngineConfig::default();
    let cache = ResourceCache::new();
    let mut builder = QueryBuilder::new(schema, &config, &cache);

    let by_last_name = SortOrder::new(names::NAME, names::FIELD_LAST_NAME);
    let sortable = by_last_name.clone().case_insensitive().blanks_first();
    assert_eq!(builder.bind_sorting(&[sortable.clone()]).map(|c| c.len()), Some(1));
    assert!(builder.bind_sorting(&[by_last_name]).is_none());

    let synthesized = SortOrder::new(names::DISPLAY_LABEL, names::FIELD_LABEL)
      .case_insensitive()
      .blanks_first();
    assert!(builder.bind_sorting(&[sortable, synthesized]).is_none());
  }
}
