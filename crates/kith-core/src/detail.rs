//! Detail instances: named bags of typed field values attached to a contact.
//!
//! A detail is the unit the backends decode: one phone number, one postal
//! address, one presence record. Every instance may carry a detail URI that
//! identifies it for linking, a list of linked URIs, a context tag and a
//! read-only marker set when the data came from a foreign source.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Well-known names ────────────────────────────────────────────────────────

/// Detail and field names the engine itself reasons about.
pub mod names {
  pub const TYPE: &str = "Type";
  pub const FIELD_TYPE: &str = "Type";
  pub const FIELD_CONTEXT: &str = "Context";
  pub const FIELD_SUB_TYPES: &str = "SubTypes";

  pub const NAME: &str = "Name";
  pub const FIELD_FIRST_NAME: &str = "FirstName";
  pub const FIELD_MIDDLE_NAME: &str = "MiddleName";
  pub const FIELD_LAST_NAME: &str = "LastName";
  pub const FIELD_CUSTOM_LABEL: &str = "CustomLabel";

  pub const NICKNAME: &str = "Nickname";
  pub const FIELD_NICKNAME: &str = "Nickname";

  pub const DISPLAY_LABEL: &str = "DisplayLabel";
  pub const FIELD_LABEL: &str = "Label";

  pub const ORGANIZATION: &str = "Organization";
  pub const FIELD_ORGANIZATION_NAME: &str = "Name";

  pub const EMAIL_ADDRESS: &str = "EmailAddress";
  pub const FIELD_EMAIL_ADDRESS: &str = "EmailAddress";

  pub const PHONE_NUMBER: &str = "PhoneNumber";
  pub const FIELD_PHONE_NUMBER: &str = "PhoneNumber";

  pub const ONLINE_ACCOUNT: &str = "OnlineAccount";
  pub const FIELD_ACCOUNT_URI: &str = "AccountUri";

  pub const PRESENCE: &str = "Presence";
  pub const GLOBAL_PRESENCE: &str = "GlobalPresence";
  pub const FIELD_TIMESTAMP: &str = "Timestamp";
  pub const FIELD_PRESENCE_STATE: &str = "PresenceState";
  pub const FIELD_PRESENCE_STATE_TEXT: &str = "PresenceStateText";
  pub const FIELD_PRESENCE_STATE_IMAGE_URL: &str = "PresenceStateImageUrl";
  pub const FIELD_CUSTOM_MESSAGE: &str = "CustomMessage";

  pub const AVATAR: &str = "Avatar";
  pub const PERSONAL_AVATAR: &str = "PersonalAvatar";
  pub const ONLINE_AVATAR: &str = "OnlineAvatar";
  pub const FIELD_IMAGE_URL: &str = "ImageUrl";
}

// ─── Field values ────────────────────────────────────────────────────────────

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
  String(String),
  StringList(Vec<String>),
  DateTime(DateTime<Utc>),
  Integer(i64),
  Double(f64),
  Bool(bool),
  Url(String),
}

impl FieldValue {
  pub fn is_empty(&self) -> bool {
    match self {
      Self::String(s) | Self::Url(s) => s.is_empty(),
      Self::StringList(items) => items.is_empty(),
      Self::DateTime(_) | Self::Integer(_) | Self::Double(_) | Self::Bool(_) => {
        false
      }
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::String(s) | Self::Url(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_string_list(&self) -> Option<&[String]> {
    match self {
      Self::StringList(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_date_time(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::DateTime(dt) => Some(*dt),
      _ => None,
    }
  }

  /// Textual rendering used for matching and display-label generation.
  pub fn to_text(&self) -> String {
    match self {
      Self::String(s) | Self::Url(s) => s.clone(),
      Self::StringList(items) => items.join(", "),
      Self::DateTime(dt) => dt.to_rfc3339(),
      Self::Integer(i) => i.to_string(),
      Self::Double(d) => d.to_string(),
      Self::Bool(b) => b.to_string(),
    }
  }
}

impl From<&str> for FieldValue {
  fn from(s: &str) -> Self { Self::String(s.to_owned()) }
}

impl From<String> for FieldValue {
  fn from(s: String) -> Self { Self::String(s) }
}

impl From<Vec<String>> for FieldValue {
  fn from(items: Vec<String>) -> Self { Self::StringList(items) }
}

impl From<DateTime<Utc>> for FieldValue {
  fn from(dt: DateTime<Utc>) -> Self { Self::DateTime(dt) }
}

impl From<i64> for FieldValue {
  fn from(i: i64) -> Self { Self::Integer(i) }
}

impl From<bool> for FieldValue {
  fn from(b: bool) -> Self { Self::Bool(b) }
}

// ─── Detail ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Detail {
  pub name:        String,
  pub values:      BTreeMap<String, FieldValue>,
  pub detail_uri:  Option<String>,
  pub linked_uris: Vec<String>,
  /// Context tag such as `Home` or `Work`.
  pub context:     Option<String>,
  pub read_only:   bool,
}

impl Detail {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }

  pub fn with_value(
    mut self,
    field: impl Into<String>,
    value: impl Into<FieldValue>,
  ) -> Self {
    self.set_value(field, value);
    self
  }

  pub fn value(&self, field: &str) -> Option<&FieldValue> {
    self.values.get(field)
  }

  /// The field rendered as text; empty when unset.
  pub fn text(&self, field: &str) -> String {
    self.values.get(field).map(FieldValue::to_text).unwrap_or_default()
  }

  pub fn set_value(
    &mut self,
    field: impl Into<String>,
    value: impl Into<FieldValue>,
  ) {
    self.values.insert(field.into(), value.into());
  }

  pub fn remove_value(&mut self, field: &str) -> Option<FieldValue> {
    self.values.remove(field)
  }

  /// `true` when no field carries a non-empty value. The detail URI and the
  /// linked URIs do not count.
  pub fn is_empty(&self) -> bool { self.values.values().all(FieldValue::is_empty) }

  pub fn add_linked_uri(&mut self, uri: impl Into<String>) {
    let uri = uri.into();
    if !self.linked_uris.contains(&uri) {
      self.linked_uris.push(uri);
    }
  }
}
