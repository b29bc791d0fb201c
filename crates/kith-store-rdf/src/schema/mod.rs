//! The detail schema: which details a contact type has, and which RDF
//! property chains hold their field values.
//!
//! Schemas are built once when the engine starts and are immutable
//! afterwards; every in-flight request reads the same [`SchemaSet`].

mod builtin;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use kith_core::{contact::ContactType, detail::FieldValue};
use oxrdf::{NamedNode, NamedNodeRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{packing, vocab::nco};

// ─── Value types ─────────────────────────────────────────────────────────────

/// Declared type of a field. Each variant has its own decoder in
/// [`ValueType::decode`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValueType {
  String,
  StringList,
  DateTime,
  Integer,
  Double,
  Bool,
  Url,
}

#[derive(Debug, Error)]
#[error("cannot read {raw:?} as {value_type}")]
pub struct ValueError {
  pub raw:        String,
  pub value_type: ValueType,
}

impl ValueType {
  pub fn decode(self, raw: &str) -> Result<FieldValue, ValueError> {
    let decoded = match self {
      Self::String => Some(decode_string(raw)),
      Self::StringList => Some(decode_string_list(raw)),
      Self::DateTime => decode_date_time(raw),
      Self::Integer => raw.trim().parse().ok().map(FieldValue::Integer),
      Self::Double => raw.trim().parse().ok().map(FieldValue::Double),
      Self::Bool => decode_bool(raw),
      Self::Url => Some(FieldValue::Url(raw.to_owned())),
    };

    decoded.ok_or_else(|| ValueError { raw: raw.to_owned(), value_type: self })
  }

  /// Coerce an already textual value; lists are decoded item by item and
  /// collapse into the first item for scalar types.
  pub fn coerce(self, value: &FieldValue) -> Result<FieldValue, ValueError> {
    match (self, value) {
      (Self::StringList, FieldValue::StringList(_)) => Ok(value.clone()),
      (Self::StringList, other) => Ok(FieldValue::StringList(vec![other.to_text()])),
      (_, FieldValue::StringList(items)) => {
        self.decode(items.first().map(String::as_str).unwrap_or_default())
      }
      (_, other) => self.decode(&other.to_text()),
    }
  }
}

fn decode_string(raw: &str) -> FieldValue {
  // Scalar fields may arrive list-packed when the property is multi-valued.
  let first = packing::list_items(raw).next().unwrap_or_default();
  FieldValue::String(first.to_owned())
}

fn decode_string_list(raw: &str) -> FieldValue {
  FieldValue::StringList(packing::list_items(raw).map(str::to_owned).collect())
}

fn decode_date_time(raw: &str) -> Option<FieldValue> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(FieldValue::DateTime(dt.with_timezone(&Utc)));
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|date| date.and_hms_opt(0, 0, 0))
    .map(|naive| FieldValue::DateTime(naive.and_utc()))
}

fn decode_bool(raw: &str) -> Option<FieldValue> {
  match raw.trim() {
    "true" | "1" => Some(FieldValue::Bool(true)),
    "false" | "0" => Some(FieldValue::Bool(false)),
    _ => None,
  }
}

// ─── Properties ──────────────────────────────────────────────────────────────

/// One step of a property chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
  pub iri:        NamedNode,
  /// Walk the property from object to subject.
  pub inverse:    bool,
  /// The object of this property identifies a detail instance.
  pub detail_uri: bool,
}

impl Property {
  pub fn new(iri: NamedNodeRef<'_>) -> Self {
    Self { iri: iri.into_owned(), inverse: false, detail_uri: false }
  }

  pub fn inverse(iri: NamedNodeRef<'_>) -> Self {
    Self { inverse: true, ..Self::new(iri) }
  }

  pub fn with_detail_uri(iri: NamedNodeRef<'_>) -> Self {
    Self { detail_uri: true, ..Self::new(iri) }
  }
}

/// An RDF resource standing for a field value, e.g. `nco:gender-male`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
  pub iri:   NamedNode,
  pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSubType {
  pub class: NamedNode,
  pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySubType {
  pub property: NamedNode,
  pub label:    String,
}

/// How a sub-type discriminator is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubTypes {
  /// The detail resource is an instance of the sub-type's class.
  ByClass(Vec<ClassSubType>),
  /// The detail resource hangs off the sub-type's property.
  ByProperty(Vec<PropertySubType>),
}

// ─── Fields ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
  pub name:                  String,
  pub value_type:            ValueType,
  /// Path from the detail resource to the value. Empty means the resource is
  /// the value.
  pub chain:                 Vec<Property>,
  pub default_value:         Option<FieldValue>,
  pub allowable_values:      Vec<String>,
  pub instances:             Vec<Instance>,
  pub sub_types:             Option<SubTypes>,
  /// Values outside the typed mapping are kept as `nao:hasProperty` payload.
  pub permits_custom_values: bool,
  /// No RDF mapping; only custom values are stored.
  pub without_mapping:       bool,
  pub synthesized:           bool,
}

impl FieldDefinition {
  pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
    Self {
      name: name.into(),
      value_type,
      chain: Vec::new(),
      default_value: None,
      allowable_values: Vec::new(),
      instances: Vec::new(),
      sub_types: None,
      permits_custom_values: false,
      without_mapping: false,
      synthesized: false,
    }
  }

  pub fn string(name: impl Into<String>, property: NamedNodeRef<'_>) -> Self {
    Self::new(name, ValueType::String).chain([Property::new(property)])
  }

  pub fn chain(mut self, chain: impl IntoIterator<Item = Property>) -> Self {
    self.chain = chain.into_iter().collect();
    self
  }

  pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
    self.default_value = Some(value.into());
    self
  }

  pub fn allowable_values<S: Into<String>>(
    mut self,
    values: impl IntoIterator<Item = S>,
  ) -> Self {
    self.allowable_values = values.into_iter().map(Into::into).collect();
    self
  }

  pub fn instances<'a>(
    mut self,
    instances: impl IntoIterator<Item = (NamedNodeRef<'a>, &'a str)>,
  ) -> Self {
    self.instances = instances
      .into_iter()
      .map(|(iri, value)| Instance { iri: iri.into_owned(), value: value.to_owned() })
      .collect();
    self
  }

  pub fn sub_types_by_class<'a>(
    mut self,
    classes: impl IntoIterator<Item = (NamedNodeRef<'a>, &'a str)>,
  ) -> Self {
    self.sub_types = Some(SubTypes::ByClass(
      classes
        .into_iter()
        .map(|(class, label)| ClassSubType {
          class: class.into_owned(),
          label: label.to_owned(),
        })
        .collect(),
    ));
    self
  }

  pub fn sub_types_by_property<'a>(
    mut self,
    properties: impl IntoIterator<Item = (NamedNodeRef<'a>, &'a str)>,
  ) -> Self {
    self.sub_types = Some(SubTypes::ByProperty(
      properties
        .into_iter()
        .map(|(property, label)| PropertySubType {
          property: property.into_owned(),
          label:    label.to_owned(),
        })
        .collect(),
    ));
    self
  }

  pub fn permits_custom_values(mut self) -> Self {
    self.permits_custom_values = true;
    self
  }

  pub fn without_mapping(mut self) -> Self {
    self.without_mapping = true;
    self.permits_custom_values = true;
    self
  }

  pub fn synthesized(mut self) -> Self {
    self.synthesized = true;
    self
  }

  pub fn has_sub_types_by_property(&self) -> bool {
    matches!(self.sub_types, Some(SubTypes::ByProperty(_)))
  }

  pub fn has_sub_types_by_class(&self) -> bool {
    matches!(self.sub_types, Some(SubTypes::ByClass(_)))
  }

  /// `false` when the field restricts its values and `value` is not one of
  /// them.
  pub fn allows(&self, value: &str) -> bool {
    self.allowable_values.is_empty() || self.allowable_values.iter().any(|v| v == value)
  }

  /// `true` when one of the chain steps walks backwards.
  pub fn has_inverse_property(&self) -> bool { self.chain.iter().any(|p| p.inverse) }

  pub fn instance_value(&self, iri: &str) -> Option<&str> {
    self
      .instances
      .iter()
      .find(|i| i.iri.as_str() == iri)
      .map(|i| i.value.as_str())
  }
}

// ─── Details ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct DetailDefinition {
  pub name:              String,
  pub unique:            bool,
  /// Instances are read through the affiliation and tagged with its label.
  pub has_context:       bool,
  /// Values may come from foreign graphs and are then read-only.
  pub has_owner:         bool,
  /// Computed after fetching from `dependencies`; never queried.
  pub synthesized:       bool,
  pub dependencies:      Vec<String>,
  /// Path from the contact (or the affiliation, for details with context)
  /// to the resource standing for one detail instance.
  pub resource:          Vec<Property>,
  pub fields:            Vec<FieldDefinition>,
  /// URI scheme detail URIs are rewritten into, e.g. `presence`.
  pub detail_uri_scheme: Option<String>,
}

impl DetailDefinition {
  fn new(name: impl Into<String>, unique: bool) -> Self {
    let name = name.into();
    Self {
      dependencies: vec![name.clone()],
      name,
      unique,
      has_context: false,
      has_owner: false,
      synthesized: false,
      resource: Vec::new(),
      fields: Vec::new(),
      detail_uri_scheme: None,
    }
  }

  pub fn unique(name: impl Into<String>) -> Self { Self::new(name, true) }

  pub fn multi(name: impl Into<String>) -> Self { Self::new(name, false) }

  /// A detail computed from others after the fetch.
  pub fn synthesized<S: Into<String>>(
    name: impl Into<String>,
    dependencies: impl IntoIterator<Item = S>,
  ) -> Self {
    let mut detail = Self::new(name, true);
    detail.synthesized = true;
    detail.dependencies.extend(dependencies.into_iter().map(Into::into));
    detail
  }

  pub fn resource(mut self, chain: impl IntoIterator<Item = Property>) -> Self {
    let affiliation = self.has_context.then(|| self.resource[0].clone());
    self.resource = affiliation.into_iter().chain(chain).collect();
    self
  }

  /// Read instances through the affiliation; prepends `nco:hasAffiliation`.
  pub fn with_context(mut self) -> Self {
    if !self.has_context {
      self.has_context = true;
      self.resource.insert(0, Property::new(nco::HAS_AFFILIATION));
    }
    self
  }

  pub fn owned(mut self) -> Self {
    self.has_owner = true;
    self
  }

  pub fn detail_uri_scheme(mut self, scheme: impl Into<String>) -> Self {
    self.detail_uri_scheme = Some(scheme.into());
    self
  }

  pub fn field(mut self, field: FieldDefinition) -> Self {
    self.fields.push(field);
    self
  }

  pub fn field_named(&self, name: &str) -> Option<&FieldDefinition> {
    self.fields.iter().find(|f| f.name == name)
  }

  /// The field discriminated by property, with its index and sub-types.
  pub fn property_sub_types(&self) -> Option<(usize, &[PropertySubType])> {
    self.fields.iter().enumerate().find_map(|(index, field)| match &field.sub_types {
      Some(SubTypes::ByProperty(properties)) => Some((index, properties.as_slice())),
      _ => None,
    })
  }

  /// Resource chain walked from the query subject: the affiliation step is
  /// implied by the subject for details with context.
  pub fn resource_from_subject(&self) -> &[Property] {
    if self.has_context { &self.resource[1..] } else { &self.resource }
  }

  /// The resource chain ends in a property whose objects identify detail
  /// instances.
  pub fn has_detail_uri(&self) -> bool {
    self.resource.last().is_some_and(|p| p.detail_uri)
  }

  /// The affiliation itself is the detail resource.
  pub fn detail_uri_from_affiliation(&self) -> bool {
    self.has_context && self.resource.len() == 1
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
  pub contact_type: ContactType,
  /// RDF classes every contact of this type is an instance of.
  pub classes:      Vec<NamedNode>,
  pub details:      Vec<DetailDefinition>,
}

impl Schema {
  pub fn detail(&self, name: &str) -> Option<&DetailDefinition> {
    self.details.iter().find(|d| d.name == name)
  }

  /// Every resource the id resolver must know for decoding.
  pub fn resource_iris(&self) -> Vec<NamedNode> {
    let mut iris = self.classes.clone();
    for field in self.details.iter().flat_map(|d| &d.fields) {
      iris.extend(field.instances.iter().map(|i| i.iri.clone()));
      if let Some(SubTypes::ByClass(classes)) = &field.sub_types {
        iris.extend(classes.iter().map(|c| c.class.clone()));
      }
    }
    iris.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    iris.dedup();
    iris
  }

  pub fn validate(&self) -> crate::Result<()> {
    for detail in &self.details {
      if detail.unique {
        validate_unique(detail)?;
      }
      let stored = !detail.unique && !detail.synthesized;
      if stored && detail.resource_from_subject().is_empty() {
        return Err(crate::Error::bad_argument(format!(
          "multi-valued detail {} needs a resource chain",
          detail.name
        )));
      }
    }
    Ok(())
  }

  pub fn summary(&self) -> SchemaSummary {
    SchemaSummary {
      contact_type: self.contact_type,
      classes:      self.classes.iter().map(|c| c.as_str().to_owned()).collect(),
      details:      self
        .details
        .iter()
        .map(|d| DetailSummary {
          name:        d.name.clone(),
          unique:      d.unique,
          has_context: d.has_context,
          synthesized: d.synthesized,
          fields:      d
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.value_type))
            .collect(),
        })
        .collect(),
    }
  }
}

fn validate_unique(detail: &DetailDefinition) -> crate::Result<()> {
  for field in &detail.fields {
    match &field.sub_types {
      Some(SubTypes::ByClass(_)) => {
        return Err(crate::Error::not_supported(format!(
          "unique detail {} cannot carry class sub-types",
          detail.name
        )));
      }
      Some(SubTypes::ByProperty(_))
        if detail.resource_from_subject().is_empty() && field.chain.is_empty() =>
      {
        return Err(crate::Error::bad_argument(format!(
          "property sub-types of {}.{} need a property chain",
          detail.name, field.name
        )));
      }
      _ => {}
    }
  }
  Ok(())
}

/// Serializable overview of a schema, for tooling.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaSummary {
  pub contact_type: ContactType,
  pub classes:      Vec<String>,
  pub details:      Vec<DetailSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailSummary {
  pub name:        String,
  pub unique:      bool,
  pub has_context: bool,
  pub synthesized: bool,
  pub fields:      BTreeMap<String, ValueType>,
}

// ─── Provider ────────────────────────────────────────────────────────────────

/// Looks up the schema of a contact type.
pub trait SchemaProvider: Send + Sync {
  fn schema(&self, contact_type: ContactType) -> Option<&Schema>;

  fn schemas(&self) -> Vec<&Schema>;
}

/// Schemas keyed by contact type.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
  schemas: BTreeMap<ContactType, Schema>,
}

impl SchemaSet {
  pub fn new(schemas: impl IntoIterator<Item = Schema>) -> crate::Result<Self> {
    let mut set = Self::default();
    for schema in schemas {
      schema.validate()?;
      set.schemas.insert(schema.contact_type, schema);
    }
    Ok(set)
  }

  /// The person and group schemas the engine ships with.
  pub fn builtin() -> Self {
    let schemas = [builtin::person(), builtin::group()];
    Self {
      schemas: schemas.into_iter().map(|s| (s.contact_type, s)).collect(),
    }
  }
}

impl SchemaProvider for SchemaSet {
  fn schema(&self, contact_type: ContactType) -> Option<&Schema> {
    self.schemas.get(&contact_type)
  }

  fn schemas(&self) -> Vec<&Schema> { self.schemas.values().collect() }
}
