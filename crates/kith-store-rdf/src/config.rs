//! Engine configuration.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{Error, Result, schema::ValueType};

/// How display labels order the parts of a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameOrder {
  #[default]
  FirstLast,
  LastFirst,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Name under which contacts of this engine are addressed by other
  /// managers.
  pub manager_uri:               String,
  /// Graph holding data written by this engine. Values from any other graph
  /// are read-only.
  pub default_graph:             String,
  /// Number of trailing digits compared when matching phone numbers.
  pub local_phone_number_length: usize,
  pub name_order:                NameOrder,
  pub prefer_nickname:           bool,
  /// Graphs starting with this prefix are co-referenced by the linked URIs of
  /// details they own.
  pub telepathy_graph_prefix:    String,
  pub include_self_contact:      bool,
  /// `"Detail.Field"` to value type, used to coerce custom detail values.
  pub custom_field_types:        BTreeMap<String, ValueType>,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      manager_uri:               "org.kith.rdf".to_owned(),
      default_graph:             "urn:uuid:08070f5c-a334-4d19-a8b0-12a3071bfab9"
        .to_owned(),
      local_phone_number_length: 7,
      name_order:                NameOrder::default(),
      prefer_nickname:           false,
      telepathy_graph_prefix:    "telepathy:".to_owned(),
      include_self_contact:      false,
      custom_field_types:        BTreeMap::new(),
    }
  }
}

impl EngineConfig {
  pub fn validate(&self) -> Result<()> {
    if self.local_phone_number_length == 0 {
      return Err(Error::Config(
        "local_phone_number_length must be at least 1".to_owned(),
      ));
    }
    if self.default_graph.is_empty() {
      return Err(Error::Config("default_graph must not be empty".to_owned()));
    }
    Ok(())
  }

  pub fn custom_field_type(&self, detail: &str, field: &str) -> Option<ValueType> {
    self.custom_field_types.get(&format!("{detail}.{field}")).copied()
  }
}
