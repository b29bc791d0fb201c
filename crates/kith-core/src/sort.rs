//! Sort orders and the multi-key contact comparator.
//!
//! Backends try to push sorting down into their query language; when they
//! cannot, they fall back to [`sort_contacts`]. Result lists from several
//! contact types are combined with [`merge_sorted`].

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
  contact::Contact,
  detail::FieldValue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  #[default]
  Ascending,
  Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlankPolicy {
  First,
  #[default]
  Last,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
  pub detail:         String,
  pub field:          String,
  pub direction:      SortDirection,
  pub case_sensitive: bool,
  pub blank_policy:   BlankPolicy,
}

impl SortOrder {
  /// Ascending, case-sensitive, blanks last.
  pub fn new(detail: impl Into<String>, field: impl Into<String>) -> Self {
    Self {
      detail:         detail.into(),
      field:          field.into(),
      direction:      SortDirection::default(),
      case_sensitive: true,
      blank_policy:   BlankPolicy::default(),
    }
  }

  pub fn descending(mut self) -> Self {
    self.direction = SortDirection::Descending;
    self
  }

  pub fn case_insensitive(mut self) -> Self {
    self.case_sensitive = false;
    self
  }

  pub fn blanks_first(mut self) -> Self {
    self.blank_policy = BlankPolicy::First;
    self
  }
}

// ─── Comparator ──────────────────────────────────────────────────────────────

fn sort_value<'a>(contact: &'a Contact, order: &'a SortOrder) -> Option<&'a FieldValue> {
  contact
    .details_named(&order.detail)
    .find_map(|d| d.value(&order.field))
    .filter(|v| !v.is_empty())
}

fn compare_values(a: &FieldValue, b: &FieldValue, case_sensitive: bool) -> Ordering {
  match (a, b) {
    (FieldValue::Integer(x), FieldValue::Integer(y)) => x.cmp(y),
    (FieldValue::Double(x), FieldValue::Double(y)) => x.total_cmp(y),
    (FieldValue::DateTime(x), FieldValue::DateTime(y)) => x.cmp(y),
    (FieldValue::Bool(x), FieldValue::Bool(y)) => x.cmp(y),
    _ => {
      let (a, b) = (a.to_text(), b.to_text());
      if case_sensitive {
        a.cmp(&b)
      } else {
        a.to_lowercase().cmp(&b.to_lowercase())
      }
    }
  }
}

/// Compare two contacts by an ordered list of sort orders.
///
/// Blank values are placed according to each order's blank policy, whatever
/// the direction. Contacts equal on every key compare equal.
pub fn compare_contacts(a: &Contact, b: &Contact, orders: &[SortOrder]) -> Ordering {
  for order in orders {
    let ordering = match (sort_value(a, order), sort_value(b, order)) {
      (None, None) => Ordering::Equal,
      (None, Some(_)) => match order.blank_policy {
        BlankPolicy::First => Ordering::Less,
        BlankPolicy::Last => Ordering::Greater,
      },
      (Some(_), None) => match order.blank_policy {
        BlankPolicy::First => Ordering::Greater,
        BlankPolicy::Last => Ordering::Less,
      },
      (Some(x), Some(y)) => {
        let ordering = compare_values(x, y, order.case_sensitive);
        match order.direction {
          SortDirection::Ascending => ordering,
          SortDirection::Descending => ordering.reverse(),
        }
      }
    };

    if ordering != Ordering::Equal {
      return ordering;
    }
  }

  Ordering::Equal
}

/// Stable in-place sort.
pub fn sort_contacts(contacts: &mut [Contact], orders: &[SortOrder]) {
  if !orders.is_empty() {
    contacts.sort_by(|a, b| compare_contacts(a, b, orders));
  }
}

/// Stable merge of two individually sorted lists. On ties, contacts from
/// `left` come first.
pub fn merge_sorted(
  left: Vec<Contact>,
  right: Vec<Contact>,
  orders: &[SortOrder],
) -> Vec<Contact> {
  let mut merged = Vec::with_capacity(left.len() + right.len());
  let mut left = left.into_iter().peekable();
  let mut right = right.into_iter().peekable();

  loop {
    let take_left = match (left.peek(), right.peek()) {
      (Some(l), Some(r)) => compare_contacts(l, r, orders) != Ordering::Greater,
      (Some(_), None) => true,
      (None, Some(_)) => false,
      (None, None) => break,
    };

    let next = if take_left { left.next() } else { right.next() };
    merged.extend(next);
  }

  merged
}
