use std::fmt;

use crate::container::ServiceError;

/// Encryption or decryption failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptError {
    /// The key has the wrong length
    InvalidKey,
    /// The cipher refused the plaintext
    Encrypt,
    /// The payload is not valid base64
    Encoding(String),
    /// Authentication failed or the payload is truncated
    Decrypt,
    /// The plaintext is not UTF-8
    Utf8,
}

impl fmt::Display for CryptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptError::InvalidKey => write!(f, "Encryption key must be 32 bytes"),
            CryptError::Encrypt => write!(f, "Encryption failed"),
            CryptError::Encoding(msg) => write!(f, "Invalid base64 payload: {msg}"),
            CryptError::Decrypt => write!(f, "Decryption failed"),
            CryptError::Utf8 => write!(f, "Decrypted value is not valid UTF-8"),
        }
    }
}

impl std::error::Error for CryptError {}

/// Unknown sanitisation filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterError {
    pub filter: String,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sanitize filter '{}' is not supported", self.filter)
    }
}

impl std::error::Error for FilterError {}

/// Cookie operation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieError {
    /// Bad constructor or setter input; nothing was changed
    InvalidArgument(String),
    /// A collaborator is missing or is not of the expected type
    MissingService {
        /// Service key, e.g. `crypt`
        service: &'static str,
        /// Underlying lookup failure
        reason: String,
    },
    /// Encrypting or decrypting the value failed
    Crypt(CryptError),
    /// The filter service rejected the filter list
    Filter(FilterError),
}

impl CookieError {
    pub(crate) fn missing(service: &'static str, err: &ServiceError) -> Self {
        CookieError::MissingService {
            service,
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for CookieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookieError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            CookieError::MissingService { service, reason } => {
                write!(f, "Wrong {service} service: {reason}")
            }
            CookieError::Crypt(err) => write!(f, "Cookie encryption failed: {err}"),
            CookieError::Filter(err) => write!(f, "Cookie filtering failed: {err}"),
        }
    }
}

impl std::error::Error for CookieError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CookieError::Crypt(err) => Some(err),
            CookieError::Filter(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CryptError> for CookieError {
    fn from(err: CryptError) -> Self {
        CookieError::Crypt(err)
    }
}

impl From<FilterError> for CookieError {
    fn from(err: FilterError) -> Self {
        CookieError::Filter(err)
    }
}
