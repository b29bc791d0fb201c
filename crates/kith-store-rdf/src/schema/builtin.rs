//! Detail definitions for the person and group contact types.

use kith_core::{
  contact::ContactType,
  detail::{FieldValue, names},
};

use super::{DetailDefinition, FieldDefinition, Property, Schema, ValueType};
use crate::vocab::{nao, nco, nie};

fn field(name: &str, value_type: ValueType, chain: &[Property]) -> FieldDefinition {
  FieldDefinition::new(name, value_type).chain(chain.iter().cloned())
}

fn p(iri: oxrdf::NamedNodeRef<'_>) -> Property { Property::new(iri) }

fn uri(iri: oxrdf::NamedNodeRef<'_>) -> Property { Property::with_detail_uri(iri) }

// ─── Shared ──────────────────────────────────────────────────────────────────

fn guid() -> DetailDefinition {
  DetailDefinition::unique("Guid")
    .field(FieldDefinition::string("Guid", nco::CONTACT_UID))
}

fn timestamp() -> DetailDefinition {
  DetailDefinition::unique("Timestamp")
    .field(field("CreationTimestamp", ValueType::DateTime, &[p(nie::CONTENT_CREATED)]))
    .field(field(
      "LastModified",
      ValueType::DateTime,
      &[p(nie::CONTENT_LAST_MODIFIED)],
    ))
}

fn note() -> DetailDefinition {
  DetailDefinition::multi("Note")
    .resource([p(nco::NOTE)])
    .field(FieldDefinition::new("Note", ValueType::String))
}

fn tag() -> DetailDefinition {
  DetailDefinition::multi("Tag")
    .resource([uri(nao::HAS_TAG)])
    .field(FieldDefinition::string("Tag", nao::PREF_LABEL))
}

fn personal_avatar() -> DetailDefinition {
  DetailDefinition::multi(names::PERSONAL_AVATAR)
    .resource([uri(nco::PHOTO)])
    .field(field(names::FIELD_IMAGE_URL, ValueType::Url, &[p(nie::URL)]))
}

fn display_label(dependencies: &[&str]) -> DetailDefinition {
  DetailDefinition::synthesized(names::DISPLAY_LABEL, dependencies.iter().copied())
    .field(FieldDefinition::new(names::FIELD_LABEL, ValueType::String).synthesized())
}

fn avatar(dependencies: &[&str]) -> DetailDefinition {
  DetailDefinition::synthesized(names::AVATAR, dependencies.iter().copied())
    .field(FieldDefinition::new(names::FIELD_IMAGE_URL, ValueType::Url).synthesized())
}

// ─── Person ──────────────────────────────────────────────────────────────────

fn name() -> DetailDefinition {
  DetailDefinition::unique(names::NAME)
    .field(FieldDefinition::string("Prefix", nco::NAME_HONORIFIC_PREFIX))
    .field(FieldDefinition::string(names::FIELD_FIRST_NAME, nco::NAME_GIVEN))
    .field(FieldDefinition::string(names::FIELD_MIDDLE_NAME, nco::NAME_ADDITIONAL))
    .field(FieldDefinition::string(names::FIELD_LAST_NAME, nco::NAME_FAMILY))
    .field(FieldDefinition::string("Suffix", nco::NAME_HONORIFIC_SUFFIX))
    .field(FieldDefinition::string(names::FIELD_CUSTOM_LABEL, nco::FULLNAME))
}

fn nickname(property: oxrdf::NamedNodeRef<'_>) -> DetailDefinition {
  DetailDefinition::multi(names::NICKNAME)
    .resource([p(property)])
    .field(FieldDefinition::new(names::FIELD_NICKNAME, ValueType::String))
}

fn phone_number() -> DetailDefinition {
  DetailDefinition::multi(names::PHONE_NUMBER)
    .with_context()
    .owned()
    .resource([uri(nco::HAS_PHONE_NUMBER)])
    .field(FieldDefinition::string(names::FIELD_PHONE_NUMBER, nco::PHONE_NUMBER))
    .field(
      FieldDefinition::new(names::FIELD_SUB_TYPES, ValueType::StringList)
        .sub_types_by_class([
          (nco::VOICE_PHONE_NUMBER, "Voice"),
          (nco::CELL_PHONE_NUMBER, "Mobile"),
          (nco::FAX_NUMBER, "Fax"),
          (nco::PAGER_NUMBER, "Pager"),
          (nco::MODEM_NUMBER, "Modem"),
          (nco::VIDEO_TELEPHONE_NUMBER, "Video"),
          (nco::BBS_NUMBER, "BulletinBoardSystem"),
          (nco::CAR_PHONE_NUMBER, "Car"),
          (nco::MESSAGING_NUMBER, "MessagingCapable"),
        ])
        .default_value(FieldValue::StringList(vec!["Voice".to_owned()])),
    )
}

fn email_address() -> DetailDefinition {
  DetailDefinition::multi(names::EMAIL_ADDRESS)
    .with_context()
    .owned()
    .resource([uri(nco::HAS_EMAIL_ADDRESS)])
    .field(FieldDefinition::string(names::FIELD_EMAIL_ADDRESS, nco::EMAIL_ADDRESS))
}

fn address() -> DetailDefinition {
  DetailDefinition::multi("Address")
    .with_context()
    .resource([uri(nco::HAS_POSTAL_ADDRESS)])
    .field(FieldDefinition::string("Street", nco::STREET_ADDRESS))
    .field(FieldDefinition::string("ExtendedAddress", nco::EXTENDED_ADDRESS))
    .field(FieldDefinition::string("PostOfficeBox", nco::POBOX))
    .field(FieldDefinition::string("Locality", nco::LOCALITY))
    .field(FieldDefinition::string("Region", nco::REGION))
    .field(FieldDefinition::string("PostCode", nco::POSTALCODE))
    .field(FieldDefinition::string("Country", nco::COUNTRY))
}

fn url() -> DetailDefinition {
  DetailDefinition::multi("Url")
    .with_context()
    .resource([p(nco::URL)])
    .field(FieldDefinition::new("Url", ValueType::Url))
    .field(
      FieldDefinition::new("SubType", ValueType::String)
        .sub_types_by_property([(nco::WEBSITE_URL, "HomePage"), (nco::BLOG_URL, "Blog")])
        .default_value("Favourite"),
    )
}

fn online_account() -> DetailDefinition {
  DetailDefinition::multi(names::ONLINE_ACCOUNT)
    .with_context()
    .owned()
    .resource([uri(nco::HAS_IM_ADDRESS)])
    .field(FieldDefinition::string(names::FIELD_ACCOUNT_URI, nco::IM_ID))
    .field(FieldDefinition::string("Protocol", nco::IM_PROTOCOL))
}

fn presence() -> DetailDefinition {
  DetailDefinition::multi(names::PRESENCE)
    .with_context()
    .owned()
    .detail_uri_scheme("presence")
    .resource([uri(nco::HAS_IM_ADDRESS)])
    .field(FieldDefinition::string(names::FIELD_NICKNAME, nco::IM_NICKNAME))
    .field(
      field(names::FIELD_PRESENCE_STATE, ValueType::String, &[p(nco::IM_PRESENCE)])
        .instances([
          (nco::PRESENCE_STATUS_UNKNOWN, "Unknown"),
          (nco::PRESENCE_STATUS_AVAILABLE, "Available"),
          (nco::PRESENCE_STATUS_HIDDEN, "Hidden"),
          (nco::PRESENCE_STATUS_BUSY, "Busy"),
          (nco::PRESENCE_STATUS_AWAY, "Away"),
          (nco::PRESENCE_STATUS_EXTENDED_AWAY, "ExtendedAway"),
          (nco::PRESENCE_STATUS_OFFLINE, "Offline"),
        ])
        .default_value("Unknown"),
    )
    .field(field(
      names::FIELD_TIMESTAMP,
      ValueType::DateTime,
      &[p(nco::PRESENCE_LAST_MODIFIED)],
    ))
    .field(FieldDefinition::string(names::FIELD_CUSTOM_MESSAGE, nco::IM_STATUS_MESSAGE))
}

fn global_presence() -> DetailDefinition {
  let mut detail =
    DetailDefinition::synthesized(names::GLOBAL_PRESENCE, [names::PRESENCE]);
  for (name, value_type) in [
    (names::FIELD_NICKNAME, ValueType::String),
    (names::FIELD_PRESENCE_STATE, ValueType::String),
    (names::FIELD_TIMESTAMP, ValueType::DateTime),
    (names::FIELD_CUSTOM_MESSAGE, ValueType::String),
    (names::FIELD_PRESENCE_STATE_TEXT, ValueType::String),
    (names::FIELD_PRESENCE_STATE_IMAGE_URL, ValueType::Url),
  ] {
    detail = detail.field(FieldDefinition::new(name, value_type).synthesized());
  }
  detail
}

fn online_avatar() -> DetailDefinition {
  DetailDefinition::multi(names::ONLINE_AVATAR)
    .with_context()
    .owned()
    .resource([uri(nco::HAS_IM_ADDRESS)])
    .field(field(
      names::FIELD_IMAGE_URL,
      ValueType::Url,
      &[p(nco::IM_AVATAR), p(nie::URL)],
    ))
}

fn birthday() -> DetailDefinition {
  DetailDefinition::unique("Birthday")
    .field(field("Birthday", ValueType::DateTime, &[p(nco::BIRTH_DATE)]))
}

fn gender() -> DetailDefinition {
  DetailDefinition::unique("Gender").field(
    field("Gender", ValueType::String, &[p(nco::GENDER)])
      .instances([
        (nco::GENDER_MALE, "Male"),
        (nco::GENDER_FEMALE, "Female"),
        (nco::GENDER_OTHER, "Unspecified"),
      ])
      .default_value("Unspecified"),
  )
}

fn hobby() -> DetailDefinition {
  DetailDefinition::multi("Hobby")
    .resource([p(nco::HOBBY)])
    .field(FieldDefinition::new("Hobby", ValueType::String))
}

fn organization() -> DetailDefinition {
  DetailDefinition::multi(names::ORGANIZATION)
    .resource([uri(nco::HAS_AFFILIATION)])
    .field(field(
      names::FIELD_ORGANIZATION_NAME,
      ValueType::String,
      &[p(nco::ORG), p(nco::FULLNAME)],
    ))
    .field(FieldDefinition::string("Title", nco::TITLE))
    .field(FieldDefinition::string("Role", nco::ROLE))
    .field(field("Department", ValueType::StringList, &[p(nco::DEPARTMENT)]))
    .field(FieldDefinition::new("Location", ValueType::String).without_mapping())
}

pub fn person() -> Schema {
  Schema {
    contact_type: ContactType::Person,
    classes:      vec![nco::PERSON_CONTACT.into_owned()],
    details:      vec![
      name(),
      nickname(nco::NICKNAME),
      phone_number(),
      email_address(),
      address(),
      url(),
      online_account(),
      presence(),
      global_presence(),
      personal_avatar(),
      online_avatar(),
      avatar(&[names::PERSONAL_AVATAR, names::ONLINE_AVATAR, names::PRESENCE]),
      birthday(),
      gender(),
      note(),
      hobby(),
      tag(),
      organization(),
      guid(),
      timestamp(),
      display_label(&[
        names::NAME,
        names::NICKNAME,
        names::ORGANIZATION,
        names::EMAIL_ADDRESS,
        names::ONLINE_ACCOUNT,
        names::PHONE_NUMBER,
      ]),
    ],
  }
}

// ─── Group ───────────────────────────────────────────────────────────────────

pub fn group() -> Schema {
  Schema {
    contact_type: ContactType::Group,
    classes:      vec![nco::CONTACT_GROUP.into_owned()],
    details:      vec![
      nickname(nco::CONTACT_GROUP_NAME),
      note(),
      tag(),
      personal_avatar(),
      avatar(&[names::PERSONAL_AVATAR]),
      guid(),
      timestamp(),
      display_label(&[names::NICKNAME]),
    ],
  }
}
