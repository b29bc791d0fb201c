//! The `ContactReader` trait and supporting request types.
//!
//! The trait is implemented by storage backends (e.g. `kith-store-rdf`).
//! Higher layers depend on this abstraction, not on any concrete backend.

use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use crate::{
  contact::{Contact, ContactId, LocalId},
  filter::Filter,
  hint::FetchHint,
  sort::SortOrder,
};

// ─── Cancellation ────────────────────────────────────────────────────────────

/// Cooperative cancellation shared between a request and whoever may abort
/// it. Backends poll it between result rows.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
  pub fn new() -> Self { Self::default() }

  pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed); }

  pub fn is_canceled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`ContactReader::fetch_contacts`].
#[derive(Debug, Clone, Default)]
pub struct ContactQuery {
  pub filter:     Filter,
  pub sorting:    Vec<SortOrder>,
  pub fetch_hint: FetchHint,
  pub cancel:     CancelFlag,
}

impl ContactQuery {
  pub fn new(filter: Filter) -> Self { Self { filter, ..Self::default() } }

  pub fn sorted_by(mut self, order: SortOrder) -> Self {
    self.sorting.push(order);
    self
  }

  pub fn with_hint(mut self, fetch_hint: FetchHint) -> Self {
    self.fetch_hint = fetch_hint;
    self
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Read access to a contact store backend.
///
/// A fetch is all-or-nothing: on error no contacts are returned.
pub trait ContactReader: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch every contact matching `query`, in sort order.
  fn fetch_contacts<'a>(
    &'a self,
    query: &'a ContactQuery,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + 'a;

  /// Fetch only the ids of the matching contacts, in sort order.
  fn fetch_contact_ids<'a>(
    &'a self,
    query: &'a ContactQuery,
  ) -> impl Future<Output = Result<Vec<ContactId>, Self::Error>> + Send + 'a;

  /// Fetch a single contact. Fails with a "does not exist" error when no
  /// contact has `id`.
  fn contact(
    &self,
    id: LocalId,
    fetch_hint: FetchHint,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;
}
