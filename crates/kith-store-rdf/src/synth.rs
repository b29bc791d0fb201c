//! Post-processing of decoded contacts.
//!
//! Computed details (global presence, display label, avatar) are produced
//! by [`PostProcessor`] steps run in a fixed order after every contact of a
//! query has been decoded.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use kith_core::{
  contact::Contact,
  detail::{Detail, FieldValue, names},
};

use crate::config::{EngineConfig, NameOrder};

// ─── Trait ───────────────────────────────────────────────────────────────────

pub trait PostProcessor: Send + Sync {
  /// The computed detail this step produces; `None` for steps that always
  /// run.
  fn produces(&self) -> Option<&str> { None }

  /// Details the step reads.
  fn dependencies(&self) -> &[&'static str] { &[] }

  fn apply(&self, contact: &mut Contact);
}

/// Ordered post-processing steps.
pub struct Pipeline {
  steps: Vec<Box<dyn PostProcessor>>,
}

impl Pipeline {
  pub fn new(steps: Vec<Box<dyn PostProcessor>>) -> Self { Self { steps } }

  /// Duplicate removal, global presence, display label, avatar, link
  /// closure.
  pub fn standard(config: &EngineConfig) -> Self {
    Self::new(vec![
      Box::new(RemoveDuplicates),
      Box::new(GlobalPresence),
      Box::new(DisplayLabel {
        name_order:      config.name_order,
        prefer_nickname: config.prefer_nickname,
      }),
      Box::new(AvatarSelection),
      Box::new(CloseDetailLinks),
    ])
  }

  /// Dependencies of the step producing `name`.
  pub fn dependencies_of(&self, name: &str) -> Option<&[&'static str]> {
    self
      .steps
      .iter()
      .find(|step| step.produces() == Some(name))
      .map(|step| step.dependencies())
  }

  /// Run every step whose computed detail is in `wanted`.
  pub fn run(&self, contact: &mut Contact, wanted: &BTreeSet<String>) {
    for step in &self.steps {
      if step.produces().is_none_or(|name| wanted.contains(name)) {
        step.apply(contact);
      }
    }
  }
}

// ─── Steps ───────────────────────────────────────────────────────────────────

pub struct RemoveDuplicates;

impl PostProcessor for RemoveDuplicates {
  fn apply(&self, contact: &mut Contact) { contact.remove_duplicate_details(); }
}

pub struct CloseDetailLinks;

impl PostProcessor for CloseDetailLinks {
  fn apply(&self, contact: &mut Contact) { contact.close_detail_links(); }
}

// ── Global presence ──────────────────────────────────────────────────────

/// Presence states, least available first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::Display)]
pub enum PresenceState {
  #[default]
  Unknown,
  Hidden,
  Offline,
  Away,
  ExtendedAway,
  Busy,
  Available,
}

impl PresenceState {
  pub fn rank(self) -> u8 {
    match self {
      Self::Unknown => 0,
      Self::Hidden | Self::Offline => 1,
      Self::Away | Self::ExtendedAway => 2,
      Self::Busy => 3,
      Self::Available => 4,
    }
  }

  pub fn of(detail: &Detail) -> Self {
    detail
      .value(names::FIELD_PRESENCE_STATE)
      .and_then(FieldValue::as_str)
      .and_then(|state| state.parse().ok())
      .unwrap_or_default()
  }
}

fn timestamp(detail: &Detail) -> Option<DateTime<Utc>> {
  detail.value(names::FIELD_TIMESTAMP).and_then(FieldValue::as_date_time)
}

/// Aggregates every presence into one: state from the most available,
/// message and nickname from the most recent.
pub struct GlobalPresence;

impl GlobalPresence {
  const FROM_MOST_RECENT: [&'static str; 3] =
    [names::FIELD_NICKNAME, names::FIELD_TIMESTAMP, names::FIELD_CUSTOM_MESSAGE];
  const FROM_MOST_AVAILABLE: [&'static str; 3] = [
    names::FIELD_PRESENCE_STATE,
    names::FIELD_PRESENCE_STATE_TEXT,
    names::FIELD_PRESENCE_STATE_IMAGE_URL,
  ];
}

impl PostProcessor for GlobalPresence {
  fn produces(&self) -> Option<&str> { Some(names::GLOBAL_PRESENCE) }

  fn dependencies(&self) -> &[&'static str] { &[names::PRESENCE] }

  fn apply(&self, contact: &mut Contact) {
    contact.take_details(names::GLOBAL_PRESENCE);

    let presences: Vec<&Detail> = contact.details_named(names::PRESENCE).collect();
    let Some(first) = presences.first() else { return };

    let mut most_available = *first;
    let mut most_recent = *first;
    for presence in presences.iter().copied() {
      if PresenceState::of(presence).rank() > PresenceState::of(most_available).rank() {
        if timestamp(presence) == timestamp(most_recent) {
          most_recent = presence;
        }
        most_available = presence;
      }
      if timestamp(presence) > timestamp(most_recent) {
        most_recent = presence;
      }
    }

    let mut global = Detail::new(names::GLOBAL_PRESENCE);
    for field in Self::FROM_MOST_RECENT {
      if let Some(value) = most_recent.value(field) {
        global.set_value(field, value.clone());
      }
    }
    for field in Self::FROM_MOST_AVAILABLE {
      if let Some(value) = most_available.value(field) {
        global.set_value(field, value.clone());
      }
    }
    let uris = [&most_recent.detail_uri, &most_available.detail_uri];
    for uri in uris.into_iter().flatten() {
      global.add_linked_uri(uri.as_str());
    }

    contact.save_detail(global);
  }
}

// ── Display label ────────────────────────────────────────────────────────

/// Picks the first non-empty label from a fixed list of generators.
pub struct DisplayLabel {
  pub name_order:      NameOrder,
  pub prefer_nickname: bool,
}

fn first_text(contact: &Contact, detail: &str, field: &str) -> String {
  contact
    .details_named(detail)
    .map(|d| d.text(field))
    .find(|text| !text.is_empty())
    .unwrap_or_default()
}

impl DisplayLabel {
  fn full_name(&self, contact: &Contact) -> String {
    let first = first_text(contact, names::NAME, names::FIELD_FIRST_NAME);
    let last = first_text(contact, names::NAME, names::FIELD_LAST_NAME);
    let parts = match self.name_order {
      NameOrder::FirstLast => [first, last],
      NameOrder::LastFirst => [last, first],
    };
    parts.into_iter().filter(|p| !p.is_empty()).collect::<Vec<_>>().join(" ")
  }

  pub fn label(&self, contact: &Contact) -> String {
    let nickname = || first_text(contact, names::NICKNAME, names::FIELD_NICKNAME);

    let generators: [&dyn Fn() -> String; 9] = [
      &|| if self.prefer_nickname { nickname() } else { String::new() },
      &|| self.full_name(contact),
      &|| first_text(contact, names::NAME, names::FIELD_CUSTOM_LABEL),
      &nickname,
      &|| first_text(contact, names::NAME, names::FIELD_MIDDLE_NAME),
      &|| first_text(contact, names::ORGANIZATION, names::FIELD_ORGANIZATION_NAME),
      &|| first_text(contact, names::EMAIL_ADDRESS, names::FIELD_EMAIL_ADDRESS),
      &|| first_text(contact, names::ONLINE_ACCOUNT, names::FIELD_ACCOUNT_URI),
      &|| first_text(contact, names::PHONE_NUMBER, names::FIELD_PHONE_NUMBER),
    ];

    generators
      .iter()
      .map(|generate| generate())
      .find(|label| !label.is_empty())
      .unwrap_or_default()
  }
}

impl PostProcessor for DisplayLabel {
  fn produces(&self) -> Option<&str> { Some(names::DISPLAY_LABEL) }

  fn dependencies(&self) -> &[&'static str] {
    &[
      names::NAME,
      names::NICKNAME,
      names::ORGANIZATION,
      names::EMAIL_ADDRESS,
      names::ONLINE_ACCOUNT,
      names::PHONE_NUMBER,
    ]
  }

  fn apply(&self, contact: &mut Contact) {
    contact.take_details(names::DISPLAY_LABEL);
    let label = self.label(contact);
    if !label.is_empty() {
      contact.save_detail(
        Detail::new(names::DISPLAY_LABEL).with_value(names::FIELD_LABEL, label),
      );
    }
  }
}

// ── Avatar ───────────────────────────────────────────────────────────────

/// Personal avatars first, then online avatars by their account's
/// availability.
pub struct AvatarSelection;

impl PostProcessor for AvatarSelection {
  fn produces(&self) -> Option<&str> { Some(names::AVATAR) }

  fn dependencies(&self) -> &[&'static str] {
    &[names::PERSONAL_AVATAR, names::ONLINE_AVATAR, names::PRESENCE]
  }

  fn apply(&self, contact: &mut Contact) {
    contact.take_details(names::AVATAR);
    let personal = contact.take_details(names::PERSONAL_AVATAR);
    let mut online = contact.take_details(names::ONLINE_AVATAR);

    let availability = |avatar: &Detail| {
      avatar
        .detail_uri
        .as_ref()
        .and_then(|uri| {
          contact
            .details_named(names::PRESENCE)
            .find(|presence| presence.linked_uris.contains(uri))
        })
        .map(|presence| PresenceState::of(presence).rank())
        .unwrap_or_default()
    };
    online.sort_by_key(|avatar| std::cmp::Reverse(availability(avatar)));

    let avatars: Vec<Detail> = personal
      .into_iter()
      .map(|source| avatar_from(source, false))
      .chain(online.into_iter().map(|source| avatar_from(source, true)))
      .collect();

    for avatar in avatars {
      contact.save_detail(avatar);
    }
  }
}

fn avatar_from(source: Detail, link: bool) -> Detail {
  let mut avatar = Detail::new(names::AVATAR);
  if let Some(url) = source.value(names::FIELD_IMAGE_URL) {
    avatar.set_value(names::FIELD_IMAGE_URL, url.clone());
  }
  if link && let Some(uri) = &source.detail_uri {
    avatar.add_linked_uri(uri.as_str());
  }
  avatar.context = source.context;
  avatar.read_only = source.read_only;
  avatar
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use kith_core::contact::{ContactId, ContactType};

  use super::*;

  fn contact() -> Contact {
    Contact::new(ContactId { contact_type: ContactType::Person, local_id: 1 })
  }

  fn with_uri(mut detail: Detail, uri: &str) -> Detail {
    detail.detail_uri = Some(uri.to_owned());
    detail
  }

  fn presence(uri: &str, state: &str, minute: u32, message: &str) -> Detail {
    let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap();
    let detail = Detail::new(names::PRESENCE)
      .with_value(names::FIELD_PRESENCE_STATE, state)
      .with_value(names::FIELD_TIMESTAMP, timestamp)
      .with_value(names::FIELD_CUSTOM_MESSAGE, message);
    with_uri(detail, uri)
  }

  #[test]
  fn global_presence_combines_most_available_and_most_recent() {
    let mut c = contact();
    c.save_detail(presence("presence:a", "Away", 30, "lunch"));
    c.save_detail(presence("presence:b", "Available", 10, "working"));

    GlobalPresence.apply(&mut c);

    let global = c.detail(names::GLOBAL_PRESENCE).unwrap();
    assert_eq!(global.text(names::FIELD_PRESENCE_STATE), "Available");
    assert_eq!(global.text(names::FIELD_CUSTOM_MESSAGE), "lunch");
    assert_eq!(global.linked_uris, vec!["presence:a", "presence:b"]);
  }

  #[test]
  fn global_presence_is_removed_without_presences() {
    let mut c = contact();
    c.save_detail(
      Detail::new(names::GLOBAL_PRESENCE).with_value(names::FIELD_PRESENCE_STATE, "Busy"),
    );
    GlobalPresence.apply(&mut c);
    assert!(c.detail(names::GLOBAL_PRESENCE).is_none());
  }

  #[test]
  fn display_label_prefers_full_name_then_falls_back() {
    let step = DisplayLabel { name_order: NameOrder::LastFirst, prefer_nickname: false };
    let mut c = contact();
    c.save_detail(
      Detail::new(names::NAME)
        .with_value(names::FIELD_FIRST_NAME, "Ann")
        .with_value(names::FIELD_LAST_NAME, "Lee"),
    );
    c.save_detail(Detail::new(names::NICKNAME).with_value(names::FIELD_NICKNAME, "annie"));
    assert_eq!(step.label(&c), "Lee Ann");

    let nickname_first =
      DisplayLabel { name_order: NameOrder::FirstLast, prefer_nickname: true };
    assert_eq!(nickname_first.label(&c), "annie");

    let mut phone_only = contact();
    phone_only.save_detail(
      Detail::new(names::PHONE_NUMBER).with_value(names::FIELD_PHONE_NUMBER, "12345"),
    );
    assert_eq!(step.label(&phone_only), "12345");
  }

  #[test]
  fn avatars_order_personal_then_by_availability() {
    let mut c = contact();
    let online = |url: &str, uri: &str| {
      let avatar = Detail::new(names::ONLINE_AVATAR)
        .with_value(names::FIELD_IMAGE_URL, FieldValue::Url(url.into()));
      with_uri(avatar, uri)
    };
    c.save_detail(online("file:///away.png", "telepathy:/acct!away"));
    c.save_detail(online("file:///busy.png", "telepathy:/acct!busy"));
    c.save_detail(
      Detail::new(names::PERSONAL_AVATAR)
        .with_value(names::FIELD_IMAGE_URL, FieldValue::Url("file:///me.png".into())),
    );
    let mut away = presence("presence:/acct!away", "Away", 0, "");
    away.add_linked_uri("telepathy:/acct!away");
    let mut busy = presence("presence:/acct!busy", "Busy", 0, "");
    busy.add_linked_uri("telepathy:/acct!busy");
    c.save_detail(away);
    c.save_detail(busy);

    AvatarSelection.apply(&mut c);

    let urls: Vec<String> = c
      .details_named(names::AVATAR)
      .map(|d| d.text(names::FIELD_IMAGE_URL))
      .collect();
    assert_eq!(urls, vec!["file:///me.png", "file:///busy.png", "file:///away.png"]);
    assert!(c.detail(names::ONLINE_AVATAR).is_none());
  }

  #[test]
  fn pipeline_skips_unwanted_computed_details() {
    let pipeline = Pipeline::standard(&EngineConfig::default());
    let mut c = contact();
    c.save_detail(Detail::new(names::NICKNAME).with_value(names::FIELD_NICKNAME, "annie"));
    c.save_detail(Detail::new(names::NICKNAME).with_value(names::FIELD_NICKNAME, "annie"));

    pipeline.run(&mut c, &BTreeSet::from([names::NICKNAME.to_owned()]));
    assert_eq!(c.details_named(names::NICKNAME).count(), 1);
    assert!(c.detail(names::DISPLAY_LABEL).is_none());

    pipeline.run(&mut c, &BTreeSet::from([names::DISPLAY_LABEL.to_owned()]));
    assert_eq!(c.detail(names::DISPLAY_LABEL).unwrap().text(names::FIELD_LABEL), "annie");
  }
}
