//! Row decoding.
//!
//! One result row per (contact, affiliation) pair. Rows of the same contact
//! are folded into a single [`Contact`]; contacts keep the order in which
//! their first row appeared, which is the sort order whenever the store
//! sorted.

use std::collections::{BTreeMap, HashMap};

use kith_core::{
  contact::{Contact, ContactId, LocalId, Relationship},
  detail::{Detail, FieldValue},
  store::CancelFlag,
};

use crate::{
  Error, Result,
  cache::ResourceCache,
  config::EngineConfig,
  packing::{self, separator},
  query::{
    COLUMN_CONTEXT, COLUMN_CONTEXT_LABEL, COLUMN_ID, DetailLayout, DetailUriSource,
    QueryContext, RelationshipColumns, SubTypeColumn, Token, UniqueSlot,
  },
  schema::{DetailDefinition, FieldDefinition, SubTypes, ValueType},
  service::{QueryResult, Row},
};

/// Affiliation columns of the current row.
#[derive(Debug, Clone, Copy)]
struct Affiliation<'r> {
  iri:   Option<&'r str>,
  label: &'r str,
}

pub struct ResultDecoder<'a> {
  config: &'a EngineConfig,
  cache:  &'a ResourceCache,
  cancel: &'a CancelFlag,
}

impl<'a> ResultDecoder<'a> {
  pub fn new(
    config: &'a EngineConfig,
    cache: &'a ResourceCache,
    cancel: &'a CancelFlag,
  ) -> Self {
    Self { config, cache, cancel }
  }

  /// Decode `result` into contacts.
  ///
  /// With a `limit`, decoding stops before the first row of the contact that
  /// would exceed it.
  pub fn decode(
    &self,
    context: &mut QueryContext<'_>,
    result: &QueryResult,
    limit: Option<usize>,
  ) -> Result<Vec<Contact>> {
    let contact_type = context.contact_type();
    let mut contacts: Vec<Contact> = Vec::new();
    let mut positions: HashMap<LocalId, usize> = HashMap::new();

    for row in result.rows() {
      if self.cancel.is_canceled() {
        return Err(Error::canceled());
      }

      let Some(local_id) = row.uint_value(COLUMN_ID) else {
        let value = row.value(COLUMN_ID);
        tracing::warn!(?value, "row without a valid contact id, skipping");
        continue;
      };

      let position = match positions.get(&local_id) {
        Some(position) => *position,
        None => {
          if limit.is_some_and(|max| contacts.len() >= max) {
            tracing::debug!(?limit, "contact limit reached, ignoring remaining rows");
            break;
          }
          positions.insert(local_id, contacts.len());
          context.contact_ids.push(local_id);
          contacts.push(Contact::new(ContactId { contact_type, local_id }));
          contacts.len() - 1
        }
      };

      self.decode_row(context, row, &mut contacts[position]);
    }

    Ok(contacts)
  }

  fn decode_row(&self, context: &QueryContext<'_>, row: Row<'_>, contact: &mut Contact) {
    let affiliation = Affiliation {
      iri:   row.url_value(COLUMN_CONTEXT),
      label: row.string_value(COLUMN_CONTEXT_LABEL),
    };

    for binding in &context.bindings {
      let definition = context.detail(binding);
      if binding.last_column > row.column_count() {
        tracing::warn!(
          detail = %definition.name,
          columns = row.column_count(),
          expected = binding.last_column,
          "row is shorter than the detail's columns"
        );
        continue;
      }
      if definition.has_context && affiliation.iri.is_none() {
        continue;
      }

      match &binding.layout {
        DetailLayout::Unique { slots, detail_uri, sub_type_field, sub_type_columns } => {
          let sub_types =
            sub_type_field.map(|field| (field, sub_type_columns.as_slice()));
          let detail = self.decode_unique(
            definition,
            slots,
            *detail_uri,
            sub_types,
            row,
            affiliation,
          );
          if let Some(detail) = detail
            && let Err(error) = contact.save_unique_detail(detail)
          {
            tracing::warn!(%error, "dropping conflicting unique detail");
          }
        }
        DetailLayout::Multi { main, tokens, sub_type_field, sub_type_columns } => {
          let details = self.decode_multi(
            definition,
            row,
            *main,
            tokens,
            *sub_type_field,
            sub_type_columns,
            affiliation,
          );
          for detail in details {
            contact.save_detail(detail);
          }
        }
      }
    }

    if let Some(column) = context.custom_detail_column {
      self.decode_custom_details(row.string_value(column), contact);
    }

    if let Some(columns) = context.relationship_columns {
      decode_relationships(columns, row, contact);
    }
  }

  // ── Unique details ────────────────────────────────────────────────────

  /// Decode a unique detail from its columns; `None` when no field has a
  /// value.
  fn decode_unique(
    &self,
    definition: &DetailDefinition,
    slots: &[UniqueSlot],
    detail_uri: Option<DetailUriSource>,
    sub_types: Option<(usize, &[SubTypeColumn])>,
    row: Row<'_>,
    affiliation: Affiliation<'_>,
  ) -> Option<Detail> {
    let mut detail = Detail::new(&definition.name);
    let mut graphs = Vec::new();

    for slot in slots {
      let field = &definition.fields[slot.field];
      let raw = row.string_value(slot.column);
      if slot.custom {
        self.merge_custom_values(&mut detail, field, raw);
      } else {
        let raw = self.strip_graph(definition, raw, &mut graphs);
        if let Some(value) = self.field_value(field, raw) {
          detail.set_value(&field.name, value);
        }
      }
    }

    if detail.is_empty() {
      return None;
    }

    if let Some((index, columns)) = sub_types {
      let field = &definition.fields[index];
      let labels = columns
        .iter()
        .filter(|c| !row.string_value(c.column).is_empty())
        .map(|c| c.label.clone())
        .collect();
      if let Some(value) = sub_type_value(field, labels) {
        detail.set_value(&field.name, value);
      }
    }

    detail.detail_uri = match detail_uri {
      Some(DetailUriSource::Affiliation) => affiliation.iri.map(str::to_owned),
      Some(DetailUriSource::Column(column)) => {
        packing::list_items(row.string_value(column)).next().map(str::to_owned)
      }
      None => None,
    };

    self.finish_detail(definition, &mut detail, &graphs, affiliation);
    Some(detail)
  }

  // ── Multi-valued details ──────────────────────────────────────────────

  #[allow(clippy::too_many_arguments)]
  fn decode_multi(
    &self,
    definition: &DetailDefinition,
    row: Row<'_>,
    main: usize,
    tokens: &[Token],
    sub_type_field: Option<usize>,
    sub_type_columns: &[SubTypeColumn],
    affiliation: Affiliation<'_>,
  ) -> Vec<Detail> {
    let items = self.decode_items(definition, tokens, row.string_value(main));

    let by_sub_type: Vec<(&str, Vec<Detail>)> = sub_type_columns
      .iter()
      .map(|column| {
        let raw = row.string_value(column.column);
        let items = self.decode_items(definition, tokens, raw);
        let details = items.into_iter().map(|(detail, _)| detail).collect();
        (column.label.as_str(), details)
      })
      .collect();

    let mut details = Vec::with_capacity(items.len());
    for (mut detail, graphs) in items {
      if let Some(index) = sub_type_field {
        let field = &definition.fields[index];
        let labels: Vec<String> = by_sub_type
          .iter()
          .filter(|(_, details)| details.contains(&detail))
          .map(|(label, _)| (*label).to_owned())
          .collect();
        if let Some(value) = sub_type_value(field, labels) {
          detail.set_value(&field.name, value);
        }
      }

      self.finish_detail(definition, &mut detail, &graphs, affiliation);
      details.push(detail);
    }

    details
  }

  /// Unpack one aggregate column. Items without any field data are dropped.
  fn decode_items(
    &self,
    definition: &DetailDefinition,
    tokens: &[Token],
    raw: &str,
  ) -> Vec<(Detail, Vec<String>)> {
    let mut items = Vec::new();

    for item in packing::detail_items(raw) {
      let mut values = packing::fields(item);
      let mut detail = Detail::new(&definition.name);
      let mut graphs = Vec::new();
      let mut has_data = false;

      for token in tokens {
        let Some(value) = values.next() else {
          let detail = &definition.name;
          tracing::warn!(%detail, "detail item has fewer fields than expected");
          break;
        };

        match *token {
          Token::DetailUri => {
            if !value.is_empty() {
              detail.detail_uri = Some(value.to_owned());
            }
          }
          Token::Value { field } => {
            let field = &definition.fields[field];
            let value = self.strip_graph(definition, value, &mut graphs);
            if let Some(value) = self.field_value(field, value) {
              has_data = true;
              detail.set_value(&field.name, value);
            }
          }
          Token::CustomValues { field } => {
            let field = &definition.fields[field];
            has_data |= self.merge_custom_values(&mut detail, field, value);
          }
          Token::ClassSubTypes { field } => {
            let field = &definition.fields[field];
            if let Some(value) = self.class_sub_types(field, value) {
              detail.set_value(&field.name, value);
            }
          }
        }
      }

      if has_data {
        items.push((detail, graphs));
      }
    }

    items
  }

  fn class_sub_types(&self, field: &FieldDefinition, raw: &str) -> Option<FieldValue> {
    let Some(SubTypes::ByClass(classes)) = &field.sub_types else {
      return None;
    };

    let labels = packing::list_items(raw)
      .filter_map(|id| id.parse::<u32>().ok())
      .filter_map(|id| self.cache.iri(id))
      .filter_map(|iri| classes.iter().find(|c| c.class.as_str() == iri))
      .map(|c| c.label.clone())
      .collect();

    sub_type_value(field, labels)
  }

  // ── Field values ──────────────────────────────────────────────────────

  fn field_value(&self, field: &FieldDefinition, raw: &str) -> Option<FieldValue> {
    if raw.is_empty() {
      return None;
    }

    if !field.instances.is_empty() {
      let values: Vec<String> = packing::list_items(raw)
        .filter_map(|id| id.parse::<u32>().ok())
        .filter_map(|id| self.cache.iri(id))
        .filter_map(|iri| field.instance_value(iri))
        .map(str::to_owned)
        .collect();

      return match field.value_type {
        _ if values.is_empty() => field.default_value.clone(),
        ValueType::StringList => Some(FieldValue::StringList(values)),
        _ => values.into_iter().next().map(FieldValue::String),
      };
    }

    match field.value_type.decode(raw) {
      Ok(value) => allowed_value(field, value),
      Err(error) => {
        tracing::warn!(field = %field.name, %error, "cannot decode field value");
        None
      }
    }
  }

  /// Add custom payload to `field`. Returns `true` when anything was added.
  fn merge_custom_values(
    &self,
    detail: &mut Detail,
    field: &FieldDefinition,
    raw: &str,
  ) -> bool {
    let values: Vec<String> = packing::list_items(raw).map(str::to_owned).collect();
    if values.is_empty() {
      return false;
    }

    match detail.values.get_mut(&field.name) {
      Some(FieldValue::StringList(items)) => items.extend(values),
      // The typed value wins.
      Some(_) => return false,
      None => match field.value_type.coerce(&FieldValue::StringList(values)) {
        Ok(value) => detail.set_value(&field.name, value),
        Err(error) => {
          tracing::warn!(field = %field.name, %error, "cannot decode custom value");
          return false;
        }
      },
    }

    true
  }

  /// Split off the graph suffix of an owned detail's value.
  fn strip_graph<'r>(
    &self,
    definition: &DetailDefinition,
    raw: &'r str,
    graphs: &mut Vec<String>,
  ) -> &'r str {
    if !definition.has_owner {
      return raw;
    }

    match packing::split_graph(raw) {
      Some((value, graph)) => {
        if !graph.is_empty() && !graphs.iter().any(|g| g == graph) {
          graphs.push(graph.to_owned());
        }
        value
      }
      None => {
        tracing::warn!(detail = %definition.name, "value without graph separator");
        raw
      }
    }
  }

  /// Provenance, detail URI scheme and context.
  fn finish_detail(
    &self,
    definition: &DetailDefinition,
    detail: &mut Detail,
    graphs: &[String],
    affiliation: Affiliation<'_>,
  ) {
    for graph in graphs {
      if *graph != self.config.default_graph {
        detail.read_only = true;
      }
      if graph.starts_with(&self.config.telepathy_graph_prefix)
        && detail.detail_uri.as_deref() != Some(graph.as_str())
      {
        detail.add_linked_uri(graph.as_str());
      }
    }

    let scheme = definition.detail_uri_scheme.as_ref();
    if let (Some(scheme), Some(uri)) = (scheme, detail.detail_uri.clone()) {
      let prefix = format!("{scheme}:");
      if !uri.starts_with(&prefix) {
        let rest = uri.split_once(':').map_or(uri.as_str(), |(_, rest)| rest);
        detail.detail_uri = Some(format!("{prefix}{rest}"));
        detail.add_linked_uri(uri);
      }
    }

    if definition.has_context && !affiliation.label.is_empty() {
      detail.context = Some(capitalize(affiliation.label));
    }
  }

  // ── Custom details ────────────────────────────────────────────────────

  fn decode_custom_details(&self, raw: &str, contact: &mut Contact) {
    for item in packing::detail_items(raw) {
      let tokens: Vec<&str> = packing::fields(item).collect();
      if tokens.len() < 3 {
        tracing::debug!(item, "custom detail without fields, skipping");
        continue;
      }

      let name = tokens[0];
      let mut raw_values: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
      for pair in tokens[1..].chunks(2) {
        if let [field, values] = pair
          && !field.is_empty()
        {
          raw_values.entry(*field).or_default().push(*values);
        }
      }

      let mut detail = Detail::new(name);
      for (field, parts) in raw_values {
        let joined = parts.join(&separator(packing::LIST));
        let mut values = packing::ordered_values(&joined);
        let value = match values.len() {
          0 => continue,
          1 => FieldValue::String(values.remove(0)),
          _ => FieldValue::StringList(values),
        };

        let value = match self.config.custom_field_type(name, field) {
          Some(value_type) => value_type.coerce(&value).unwrap_or_else(|error| {
            tracing::warn!(detail = name, field, %error, "keeping custom value as text");
            value
          }),
          None => value,
        };
        detail.set_value(field, value);
      }

      if !detail.is_empty() {
        contact.save_detail(detail);
      }
    }
  }
}

/// Drop values outside the field's allowable set. The default stands in
/// when nothing is left.
fn allowed_value(field: &FieldDefinition, value: FieldValue) -> Option<FieldValue> {
  if field.allowable_values.is_empty() {
    return Some(value);
  }

  let allowed = match value {
    FieldValue::StringList(items) => {
      let items: Vec<String> = items.into_iter().filter(|i| field.allows(i)).collect();
      (!items.is_empty()).then_some(FieldValue::StringList(items))
    }
    other => field.allows(&other.to_text()).then_some(other),
  };
  if allowed.is_none() {
    tracing::warn!(field = %field.name, "value outside the allowable set");
  }
  allowed.or_else(|| field.default_value.clone())
}

/// Sub-type value from the labels an instance matched; the field's default
/// when none matched.
fn sub_type_value(field: &FieldDefinition, labels: Vec<String>) -> Option<FieldValue> {
  if labels.is_empty() {
    return match (&field.default_value, field.value_type) {
      (Some(default), _) => Some(default.clone()),
      (None, ValueType::StringList) => Some(FieldValue::StringList(Vec::new())),
      (None, _) => None,
    };
  }

  match field.value_type {
    ValueType::StringList => Some(FieldValue::StringList(labels)),
    _ => labels.into_iter().next().map(FieldValue::String),
  }
}

fn decode_relationships(
  columns: RelationshipColumns,
  row: Row<'_>,
  contact: &mut Contact,
) {
  let this = contact.local_id();

  for id in packing::list_items(row.string_value(columns.groups)) {
    match id.parse::<LocalId>() {
      Ok(group) => contact.add_relationship(Relationship::has_member(group, this)),
      Err(_) => tracing::warn!(id, "invalid group id"),
    }
  }

  if let Some(column) = columns.members {
    for id in packing::list_items(row.string_value(column)) {
      match id.parse::<LocalId>() {
        Ok(member) => contact.add_relationship(Relationship::has_member(this, member)),
        Err(_) => tracing::warn!(id, "invalid member id"),
      }
    }
  }
}

/// `home` becomes `Home`.
fn capitalize(label: &str) -> String {
  let mut chars = label.chars();
  match chars.next() {
    Some(first) => {
      first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    }
    None => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn capitalizes_affiliation_labels() {
    assert_eq!(capitalize("home"), "Home");
    assert_eq!(capitalize("WORK"), "Work");
    assert_eq!(capitalize(""), "");
  }

  #[test]
  fn sub_type_falls_back_to_default_or_empty_set() {
    let with_default =
      FieldDefinition::new("SubType", ValueType::String).default_value("Favourite");
    assert_eq!(sub_type_value(&with_default, vec![]), Some(FieldValue::from("Favourite")));
    assert_eq!(
      sub_type_value(&with_default, vec!["Blog".into(), "HomePage".into()]),
      Some(FieldValue::from("Blog"))
    );

    let list = FieldDefinition::new("SubTypes", ValueType::StringList);
    assert_eq!(sub_type_value(&list, vec![]), Some(FieldValue::StringList(vec![])));
  }

  #[test]
  fn values_outside_the_allowable_set_fall_back() {
    let kind = FieldDefinition::new("Kind", ValueType::String)
      .allowable_values(["Wedding", "Memorial"])
      .default_value("Memorial");
    assert_eq!(
      allowed_value(&kind, FieldValue::from("Wedding")),
      Some(FieldValue::from("Wedding"))
    );
    assert_eq!(
      allowed_value(&kind, FieldValue::from("Party")),
      Some(FieldValue::from("Memorial"))
    );

    let kinds = FieldDefinition::new("Kinds", ValueType::StringList)
      .allowable_values(["Wedding", "Memorial"]);
    let mixed = FieldValue::StringList(vec!["Party".into(), "Wedding".into()]);
    assert_eq!(
      allowed_value(&kinds, mixed),
      Some(FieldValue::StringList(vec!["Wedding".into()]))
    );
    assert_eq!(allowed_value(&kinds, FieldValue::StringList(vec!["Party".into()])), None);
  }
}
