//! Error type for `kith-store-rdf`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] kith_core::Error),

  /// The query service failed to execute a query.
  #[error("query execution failed: {0}")]
  Execution(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The id resolver failed.
  #[error("id resolution failed: {0}")]
  Resolution(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("invalid configuration: {0}")]
  Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn bad_argument(message: impl Into<String>) -> Self {
    Self::Core(kith_core::Error::BadArgument(message.into()))
  }

  pub fn not_supported(message: impl Into<String>) -> Self {
    Self::Core(kith_core::Error::NotSupported(message.into()))
  }

  pub fn unspecified(message: impl Into<String>) -> Self {
    Self::Core(kith_core::Error::Unspecified(message.into()))
  }

  pub fn canceled() -> Self { Self::Core(kith_core::Error::Canceled) }

  /// The taxonomy code reported to callers for this error.
  pub fn kind(&self) -> ErrorKind {
    use kith_core::Error as Core;
    match self {
      Self::Core(Core::BadArgument(_) | Core::UnknownContactType(_)) => {
        ErrorKind::BadArgument
      }
      Self::Core(Core::DoesNotExist(_)) => ErrorKind::DoesNotExist,
      Self::Core(
        Core::InvalidDetail(_) | Core::DuplicateUniqueDetail { .. },
      ) => ErrorKind::InvalidDetail,
      Self::Core(Core::NotSupported(_)) => ErrorKind::NotSupported,
      Self::Core(Core::Canceled) => ErrorKind::Canceled,
      Self::Config(_) => ErrorKind::BadArgument,
      Self::Core(Core::Unspecified(_) | Core::Serialization(_))
      | Self::Execution(_)
      | Self::Resolution(_) => ErrorKind::Unspecified,
    }
  }
}

/// Terminal error code of a fetch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
  BadArgument,
  DoesNotExist,
  InvalidDetail,
  Unspecified,
  NotSupported,
  Canceled,
}
