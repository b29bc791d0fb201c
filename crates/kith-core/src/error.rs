//! Error types for `kith-core`.
//!
//! The variants double as the error taxonomy every backend reports through:
//! a fetch operation ends in exactly one of these codes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Unsupported filter/field combination, missing schema, empty id filter.
  #[error("bad argument: {0}")]
  BadArgument(String),

  #[error("contact {0} does not exist")]
  DoesNotExist(u32),

  /// Decode-time type mismatch or unknown field.
  #[error("invalid detail: {0}")]
  InvalidDetail(String),

  /// A unique detail was saved twice with conflicting values.
  #[error("contact {contact} already has a {detail} detail")]
  DuplicateUniqueDetail { contact: u32, detail: String },

  /// Internal invariant violation.
  #[error("unspecified error: {0}")]
  Unspecified(String),

  #[error("not supported: {0}")]
  NotSupported(String),

  #[error("request canceled")]
  Canceled,

  #[error("unknown contact type: {0:?}")]
  UnknownContactType(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
