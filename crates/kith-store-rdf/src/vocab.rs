//! RDF vocabulary used by the built-in schemas and the query assembler.

use oxrdf::NamedNodeRef;

pub use oxrdf::vocab::{rdf, rdfs, xsd};

macro_rules! terms {
  ($ns:literal { $($name:ident = $local:literal),* $(,)? }) => {
    $(pub const $name: NamedNodeRef<'static> =
      NamedNodeRef::new_unchecked(concat!($ns, $local));)*
  };
}

/// Contact ontology.
pub mod nco {
  use super::*;

  terms!("http://www.semanticdesktop.org/ontologies/2007/03/22/nco#" {
    PERSON_CONTACT = "PersonContact",
    CONTACT_GROUP = "ContactGroup",
    AFFILIATION = "Affiliation",
    DEFAULT_CONTACT_ME = "default-contact-me",

    HAS_AFFILIATION = "hasAffiliation",
    BELONGS_TO_GROUP = "belongsToGroup",
    CONTACT_GROUP_NAME = "contactGroupName",
    CONTACT_UID = "contactUID",

    NAME_GIVEN = "nameGiven",
    NAME_ADDITIONAL = "nameAdditional",
    NAME_FAMILY = "nameFamily",
    NAME_HONORIFIC_PREFIX = "nameHonorificPrefix",
    NAME_HONORIFIC_SUFFIX = "nameHonorificSuffix",
    FULLNAME = "fullname",
    NICKNAME = "nickname",

    HAS_PHONE_NUMBER = "hasPhoneNumber",
    PHONE_NUMBER = "phoneNumber",
    VOICE_PHONE_NUMBER = "VoicePhoneNumber",
    CELL_PHONE_NUMBER = "CellPhoneNumber",
    FAX_NUMBER = "FaxNumber",
    PAGER_NUMBER = "PagerNumber",
    MODEM_NUMBER = "ModemNumber",
    VIDEO_TELEPHONE_NUMBER = "VideoTelephoneNumber",
    BBS_NUMBER = "BbsNumber",
    CAR_PHONE_NUMBER = "CarPhoneNumber",
    MESSAGING_NUMBER = "MessagingNumber",

    HAS_EMAIL_ADDRESS = "hasEmailAddress",
    EMAIL_ADDRESS = "emailAddress",

    HAS_POSTAL_ADDRESS = "hasPostalAddress",
    STREET_ADDRESS = "streetAddress",
    EXTENDED_ADDRESS = "extendedAddress",
    POBOX = "pobox",
    LOCALITY = "locality",
    REGION = "region",
    POSTALCODE = "postalcode",
    COUNTRY = "country",

    URL = "url",
    WEBSITE_URL = "websiteUrl",
    BLOG_URL = "blogUrl",

    HAS_IM_ADDRESS = "hasIMAddress",
    IM_ID = "imID",
    IM_PROTOCOL = "imProtocol",
    IM_NICKNAME = "imNickname",
    IM_PRESENCE = "imPresence",
    IM_STATUS_MESSAGE = "imStatusMessage",
    IM_AVATAR = "imAvatar",
    PRESENCE_LAST_MODIFIED = "presenceLastModified",

    PRESENCE_STATUS_UNKNOWN = "presence-status-unknown",
    PRESENCE_STATUS_OFFLINE = "presence-status-offline",
    PRESENCE_STATUS_AVAILABLE = "presence-status-available",
    PRESENCE_STATUS_AWAY = "presence-status-away",
    PRESENCE_STATUS_EXTENDED_AWAY = "presence-status-extended-away",
    PRESENCE_STATUS_HIDDEN = "presence-status-hidden",
    PRESENCE_STATUS_BUSY = "presence-status-busy",

    BIRTH_DATE = "birthDate",
    GENDER = "gender",
    GENDER_MALE = "gender-male",
    GENDER_FEMALE = "gender-female",
    GENDER_OTHER = "gender-other",
    NOTE = "note",
    HOBBY = "hobby",
    PHOTO = "photo",

    ORG = "org",
    ROLE = "role",
    TITLE = "title",
    DEPARTMENT = "department",
  });
}

/// Information element ontology.
pub mod nie {
  use super::*;

  terms!("http://www.semanticdesktop.org/ontologies/2007/01/19/nie#" {
    CONTENT_CREATED = "contentCreated",
    CONTENT_LAST_MODIFIED = "contentLastModified",
    URL = "url",
  });
}

/// Annotation ontology; carries tags and untyped custom properties.
pub mod nao {
  use super::*;

  terms!("http://www.semanticdesktop.org/ontologies/2007/08/15/nao#" {
    HAS_TAG = "hasTag",
    PREF_LABEL = "prefLabel",
    HAS_PROPERTY = "hasProperty",
    PROPERTY_NAME = "propertyName",
    PROPERTY_VALUE = "propertyValue",
  });
}

pub mod maemo {
  use super::*;

  terms!("http://maemo.org/ontologies/tracker#" {
    LOCAL_PHONE_NUMBER = "localPhoneNumber",
  });
}

/// Store-specific functions.
pub mod tracker {
  use super::*;

  terms!("http://www.tracker-project.org/ontologies/tracker#" {
    ID = "id",
    COALESCE = "coalesce",
  });
}

/// XPath functions.
pub mod fun {
  use super::*;

  terms!("http://www.w3.org/2005/xpath-functions#" {
    CONCAT = "concat",
    LOWER_CASE = "lower-case",
    CONTAINS = "contains",
    STARTS_WITH = "starts-with",
    ENDS_WITH = "ends-with",
  });
}
