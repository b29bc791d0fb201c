//! Fetch requests.
//!
//! A [`ContactFetchRequest`] runs one assembled query per contact type,
//! decodes and post-processes the rows, and merges the per-type lists into
//! one sorted result. A bounded, sorted fetch first asks
//! [`ContactIdFetchRequest`] for the ids of the winning contacts so that the
//! limit is applied across contact types.

use std::{borrow::Cow, cmp::Ordering, collections::HashMap};

use chrono::{DateTime, Utc};
use kith_core::{
  contact::{Contact, ContactId, ContactType, LocalId},
  detail::FieldValue,
  filter::Filter,
  sort::{SortDirection, SortOrder, merge_sorted, sort_contacts},
  store::ContactQuery,
};

use crate::{
  Error, ErrorKind, Result,
  decode::ResultDecoder,
  query::{self, COLUMN_ID, QueryBuilder},
  schema::{Schema, ValueType},
  service::{IdResolver, QueryService},
  store::RdfStore,
};

// ─── Contacts ────────────────────────────────────────────────────────────────

pub struct ContactFetchRequest<'a, S> {
  store: &'a RdfStore<S>,
  query: &'a ContactQuery,
}

impl<'a, S> ContactFetchRequest<'a, S>
where
  S: QueryService + IdResolver,
{
  pub fn new(store: &'a RdfStore<S>, query: &'a ContactQuery) -> Self {
    Self { store, query }
  }

  /// The exact query text this request executes for `contact_type`.
  pub fn query(&self, contact_type: ContactType) -> Result<String> {
    let text = query::assemble_query(
      self.store.schemas(),
      self.store.config(),
      self.store.cache(),
      contact_type,
      self.query,
    )?;
    if text.is_empty() {
      return Err(Error::unspecified(format!("empty query for {contact_type}")));
    }
    Ok(text)
  }

  pub async fn run(self) -> Result<Vec<Contact>> {
    let hint = &self.query.fetch_hint;
    let mut filter = Cow::Borrowed(&self.query.filter);
    let mut sorting: &[SortOrder] = &self.query.sorting;
    let mut order: Option<Vec<LocalId>> = None;

    if hint.max_count.is_some() && !sorting.is_empty() {
      match ContactIdFetchRequest::new(self.store, self.query).run().await {
        Ok(ids) if ids.is_empty() => return Ok(Vec::new()),
        Ok(ids) => {
          let ids: Vec<LocalId> = ids.into_iter().map(|id| id.local_id).collect();
          filter = Cow::Owned(Filter::ids(ids.iter().copied()));
          sorting = &[];
          order = Some(ids);
        }
        Err(error) if error.kind() == ErrorKind::Canceled => return Err(error),
        Err(error) => {
          tracing::debug!(%error, "id prefetch failed, limiting after the fetch");
        }
      }
    }

    let mut contacts = Vec::new();
    for schema in self.store.schemas().schemas() {
      if self.query.cancel.is_canceled() {
        return Err(Error::canceled());
      }

      let limit = match (&order, hint.max_count) {
        (None, Some(max)) => Some(max.saturating_sub(contacts.len())),
        _ => None,
      };
      if limit == Some(0) {
        break;
      }

      let fetched = self.fetch_type(schema, &filter, sorting, limit).await?;
      contacts = merge_sorted(contacts, fetched, sorting);
    }

    if let Some(order) = order {
      let positions: HashMap<LocalId, usize> =
        order.iter().enumerate().map(|(position, id)| (*id, position)).collect();
      contacts.sort_by_key(|c| {
        positions.get(&c.local_id()).copied().unwrap_or(usize::MAX)
      });
    }

    Ok(contacts)
  }

  async fn fetch_type(
    &self,
    schema: &Schema,
    filter: &Filter,
    sorting: &[SortOrder],
    limit: Option<usize>,
  ) -> Result<Vec<Contact>> {
    let store = self.store;
    let mut context = QueryBuilder::new(schema, store.config(), store.cache()).build(
      filter,
      sorting,
      &self.query.fetch_hint,
    )?;

    let contact_type = schema.contact_type;
    let text = context.query.to_string();
    tracing::debug!(%contact_type, query = %text, "fetching contacts");

    let result = store
      .service()
      .select(&text)
      .await
      .map_err(|e| Error::Execution(Box::new(e)))?;

    let decoder =
      ResultDecoder::new(store.config(), store.cache(), &self.query.cancel);
    let mut contacts = decoder.decode(&mut context, &result, limit)?;

    for contact in &mut contacts {
      store.pipeline().run(contact, &context.detail_names);
    }
    if !context.sorted {
      sort_contacts(&mut contacts, sorting);
    }

    tracing::debug!(
      %contact_type,
      rows = result.len(),
      contacts = contacts.len(),
      "decoded contacts"
    );

    Ok(contacts)
  }
}

// ─── Ids ─────────────────────────────────────────────────────────────────────

/// Fetches only ids, sorted by the store. Fails with `NotSupported` when a
/// sort order cannot be evaluated by the store.
pub struct ContactIdFetchRequest<'a, S> {
  store: &'a RdfStore<S>,
  query: &'a ContactQuery,
}

impl<'a, S> ContactIdFetchRequest<'a, S>
where
  S: QueryService + IdResolver,
{
  pub fn new(store: &'a RdfStore<S>, query: &'a ContactQuery) -> Self {
    Self { store, query }
  }

  pub async fn run(self) -> Result<Vec<ContactId>> {
    let store = self.store;
    let sorting = &self.query.sorting;
    let limit = self.query.fetch_hint.max_count;
    let mut entries: Vec<(ContactId, Vec<SortKey>)> = Vec::new();

    for schema in store.schemas().schemas() {
      if self.query.cancel.is_canceled() {
        return Err(Error::canceled());
      }

      let contact_type = schema.contact_type;
      let builder = QueryBuilder::new(schema, store.config(), store.cache());
      let select = builder.build_id_query(&self.query.filter, sorting, limit)?;
      let text = select.to_string();
      tracing::debug!(%contact_type, query = %text, "fetching contact ids");

      let result = store
        .service()
        .select(&text)
        .await
        .map_err(|e| Error::Execution(Box::new(e)))?;

      let key_types: Vec<ValueType> =
        sorting.iter().map(|order| key_type(schema, order)).collect();
      for row in result.rows() {
        let Some(local_id) = row.uint_value(COLUMN_ID) else {
          let value = row.value(COLUMN_ID);
          tracing::warn!(?value, "row without a valid contact id, skipping");
          continue;
        };
        let keys = key_types
          .iter()
          .enumerate()
          .map(|(i, value_type)| SortKey::read(row.value(COLUMN_ID + 1 + i), *value_type))
          .collect();
        entries.push((ContactId { contact_type, local_id }, keys));
      }
    }

    // Each type's ids are already sorted; a stable sort merges them.
    entries.sort_by(|(_, a), (_, b)| compare_keys(a, b, sorting));
    if let Some(max) = limit {
      entries.truncate(max);
    }

    Ok(entries.into_iter().map(|(id, _)| id).collect())
  }
}

/// Declared type of the field `order` sorts on. Custom details are text.
fn key_type(schema: &Schema, order: &SortOrder) -> ValueType {
  schema
    .detail(&order.detail)
    .and_then(|detail| detail.field_named(&order.field))
    .map_or(ValueType::String, |field| field.value_type)
}

/// A sort key read back from the id query, typed by its field.
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
  Blank,
  Number(f64),
  Time(DateTime<Utc>),
  Text(String),
}

impl SortKey {
  fn read(raw: Option<&str>, value_type: ValueType) -> Self {
    let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
      return Self::Blank;
    };

    let typed = match value_type {
      ValueType::Integer | ValueType::Double | ValueType::DateTime => {
        value_type.decode(raw).ok()
      }
      _ => None,
    };
    match typed {
      Some(FieldValue::Integer(i)) => Self::Number(i as f64),
      Some(FieldValue::Double(d)) => Self::Number(d),
      Some(FieldValue::DateTime(dt)) => Self::Time(dt),
      _ => Self::Text(raw.to_owned()),
    }
  }

  fn rank(&self) -> u8 {
    match self {
      Self::Blank => 0,
      Self::Number(_) => 1,
      Self::Time(_) => 2,
      Self::Text(_) => 3,
    }
  }

  fn compare(&self, other: &Self) -> Ordering {
    match (self, other) {
      (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
      (Self::Time(a), Self::Time(b)) => a.cmp(b),
      (Self::Text(a), Self::Text(b)) => a.cmp(b),
      _ => self.rank().cmp(&other.rank()),
    }
  }
}

/// Compare sort keys the way the store does: blanks lowest, then reversed
/// for descending orders.
fn compare_keys(a: &[SortKey], b: &[SortKey], orders: &[SortOrder]) -> Ordering {
  for (i, order) in orders.iter().enumerate() {
    let ordering = match (a.get(i), b.get(i)) {
      (Some(a), Some(b)) => a.compare(b),
      _ => Ordering::Equal,
    };
    let ordering = match order.direction {
      SortDirection::Ascending => ordering,
      SortDirection::Descending => ordering.reverse(),
    };
    if ordering != Ordering::Equal {
      return ordering;
    }
  }
  Ordering::Equal
}
