//! Contact records: the output of every fetch.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, detail::Detail};

// ─── Identity ────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContactType {
  Person,
  Group,
}

/// The store's internal numeric id for a contact resource.
pub type LocalId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId {
  pub contact_type: ContactType,
  pub local_id:     LocalId,
}

// ─── Relationships ───────────────────────────────────────────────────────────

/// The one supported relationship type: a group has a member.
pub const HAS_MEMBER: &str = "HasMember";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
  /// The group.
  pub first:             LocalId,
  /// The member.
  pub second:            LocalId,
  pub relationship_type: String,
}

impl Relationship {
  pub fn has_member(group: LocalId, member: LocalId) -> Self {
    Self {
      first:             group,
      second:            member,
      relationship_type: HAS_MEMBER.to_owned(),
    }
  }
}

// ─── Contact ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
  pub id:            ContactId,
  pub details:       Vec<Detail>,
  pub relationships: Vec<Relationship>,
}

impl Contact {
  pub fn new(id: ContactId) -> Self {
    Self { id, details: Vec::new(), relationships: Vec::new() }
  }

  pub fn local_id(&self) -> LocalId { self.id.local_id }

  /// First detail with the given name.
  pub fn detail(&self, name: &str) -> Option<&Detail> {
    self.details.iter().find(|d| d.name == name)
  }

  pub fn details_named<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Iterator<Item = &'a Detail> + 'a {
    self.details.iter().filter(move |d| d.name == name)
  }

  pub fn save_detail(&mut self, detail: Detail) { self.details.push(detail); }

  /// Save a detail whose definition allows at most one instance.
  ///
  /// Saving an identical instance again is a no-op; saving a different one is
  /// rejected so that conflicting rows never yield two instances.
  pub fn save_unique_detail(&mut self, detail: Detail) -> Result<()> {
    match self.detail(&detail.name) {
      None => {
        self.details.push(detail);
        Ok(())
      }
      Some(existing) if *existing == detail => Ok(()),
      Some(_) => Err(Error::DuplicateUniqueDetail {
        contact: self.id.local_id,
        detail:  detail.name,
      }),
    }
  }

  /// Remove and return every detail with the given name.
  pub fn take_details(&mut self, name: &str) -> Vec<Detail> {
    let (taken, kept) = std::mem::take(&mut self.details)
      .into_iter()
      .partition(|d| d.name == name);
    self.details = kept;
    taken
  }

  /// Drop exact duplicates, keeping the first occurrence.
  pub fn remove_duplicate_details(&mut self) {
    let mut unique: Vec<Detail> = Vec::with_capacity(self.details.len());
    for detail in std::mem::take(&mut self.details) {
      if !unique.contains(&detail) {
        unique.push(detail);
      }
    }
    self.details = unique;
  }

  /// Make detail links symmetric: if A links to B's URI, B links back to A.
  pub fn close_detail_links(&mut self) {
    let mut back_links: Vec<(usize, String)> = Vec::new();

    for source in &self.details {
      let Some(source_uri) = &source.detail_uri else { continue };
      for linked in &source.linked_uris {
        for (index, target) in self.details.iter().enumerate() {
          if target.detail_uri.as_ref() == Some(linked)
            && !target.linked_uris.contains(source_uri)
          {
            back_links.push((index, source_uri.clone()));
          }
        }
      }
    }

    for (index, uri) in back_links {
      self.details[index].add_linked_uri(uri);
    }
  }

  pub fn add_relationship(&mut self, relationship: Relationship) {
    if !self.relationships.contains(&relationship) {
      self.relationships.push(relationship);
    }
  }
}
