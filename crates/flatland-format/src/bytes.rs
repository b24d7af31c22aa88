//! Byte buffers, carried as base64 text in the common format

use crate::error::FormatResult;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::ops::{Deref, DerefMut};

/// Opaque byte buffer persisted as a standard base64 string
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Base64 text form
    #[must_use]
    pub fn encode(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Parse base64 text
    ///
    /// # Errors
    /// Returns [`crate::FormatError::Base64`] for invalid input.
    pub fn decode(text: &str) -> FormatResult<Self> {
        Ok(Self(STANDARD.decode(text)?))
    }
}

impl Deref for Bytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Bytes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for Bytes {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}
