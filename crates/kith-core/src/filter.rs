//! The filter expression tree callers hand to a fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{contact::LocalId, detail::FieldValue};

// ─── Match flags ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
  #[default]
  Exactly,
  Contains,
  StartsWith,
  EndsWith,
  /// Compare the raw value without any string function.
  FixedString,
  /// Compare canonicalised local phone numbers.
  PhoneNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchFlags {
  pub mode:           MatchMode,
  pub case_sensitive: bool,
}

impl MatchFlags {
  pub fn new(mode: MatchMode) -> Self { Self { mode, case_sensitive: false } }

  pub fn case_sensitive(mut self) -> Self {
    self.case_sensitive = true;
    self
  }
}

// ─── Leaf filters ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailFilter {
  pub detail: String,
  /// `None` matches the value against every field of the detail.
  pub field:  Option<String>,
  /// `None` matches contacts having the detail at all.
  pub value:  Option<FieldValue>,
  pub flags:  MatchFlags,
}

/// Bound handling for [`DetailRangeFilter`]. The default includes the lower
/// bound and excludes the upper one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RangeFlags {
  pub exclude_lower: bool,
  pub include_upper: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRangeFilter {
  pub detail: String,
  pub field:  String,
  pub min:    Option<FieldValue>,
  pub max:    Option<FieldValue>,
  pub range:  RangeFlags,
  pub flags:  MatchFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeLogEvent {
  Added,
  Changed,
  Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogFilter {
  pub event: ChangeLogEvent,
  pub since: DateTime<Utc>,
}

/// Which end of the relationship the related contact sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipRole {
  First,
  Second,
  #[default]
  Either,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipFilter {
  pub relationship_type: String,
  pub related_contact:   LocalId,
  /// Manager that owns the related contact; `None` means this manager.
  pub related_manager:   Option<String>,
  pub role:              RelationshipRole,
}

// ─── Tree ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
  /// Match everything.
  #[default]
  Default,
  /// Match nothing.
  Invalid,
  LocalId { ids: Vec<LocalId> },
  Detail(DetailFilter),
  DetailRange(DetailRangeFilter),
  ChangeLog(ChangeLogFilter),
  Relationship(RelationshipFilter),
  Intersection { filters: Vec<Filter> },
  Union { filters: Vec<Filter> },
}

impl Filter {
  pub fn ids(ids: impl IntoIterator<Item = LocalId>) -> Self {
    Self::LocalId { ids: ids.into_iter().collect() }
  }

  pub fn detail(
    detail: impl Into<String>,
    field: impl Into<String>,
    value: impl Into<FieldValue>,
    flags: MatchFlags,
  ) -> Self {
    Self::Detail(DetailFilter {
      detail: detail.into(),
      field: Some(field.into()),
      value: Some(value.into()),
      flags,
    })
  }

  /// Contacts having at least one instance of `detail`.
  pub fn has_detail(detail: impl Into<String>) -> Self {
    Self::Detail(DetailFilter {
      detail: detail.into(),
      field:  None,
      value:  None,
      flags:  MatchFlags::default(),
    })
  }

  pub fn has_member(group: LocalId, role: RelationshipRole) -> Self {
    Self::Relationship(RelationshipFilter {
      relationship_type: crate::contact::HAS_MEMBER.to_owned(),
      related_contact: group,
      related_manager: None,
      role,
    })
  }

  pub fn and(self, other: Filter) -> Self {
    match self {
      Self::Intersection { mut filters } => {
        filters.push(other);
        Self::Intersection { filters }
      }
      first => Self::Intersection { filters: vec![first, other] },
    }
  }

  pub fn or(self, other: Filter) -> Self {
    match self {
      Self::Union { mut filters } => {
        filters.push(other);
        Self::Union { filters }
      }
      first => Self::Union { filters: vec![first, other] },
    }
  }

  pub fn is_default(&self) -> bool { matches!(self, Self::Default) }
}
