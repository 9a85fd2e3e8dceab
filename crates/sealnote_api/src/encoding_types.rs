//! Byte containers shared by the codecs and stores.

use crate::*;
use base64::prelude::BASE64_URL_SAFE_NO_PAD as B64;
use base64::Engine;
use std::sync::Arc;

/// An immutable, cheaply cloned byte sequence.
///
/// This is the unit that crosses the persistence and export boundaries.
/// Its text form (Display / FromStr) is url-safe base64 without padding.
/// Indexing goes through `Deref<Target = [u8]>`, so it is bounds checked.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinData(pub Arc<[u8]>);

impl BinData {
    /// Decode the url-safe base64 text form. Surrounding whitespace,
    /// such as a trailing newline, is ignored.
    pub fn decode_text(text: &str) -> SealResult<Self> {
        let raw = B64.decode(text.trim()).map_err(SealError::format)?;
        Ok(raw.into())
    }

    /// Encode to the url-safe base64 text form.
    pub fn encode_text(&self) -> String {
        B64.encode(&self.0)
    }
}

impl std::fmt::Debug for BinData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BinData({}; {})", self.0.len(), self.encode_text())
    }
}

impl std::fmt::Display for BinData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode_text())
    }
}

impl std::str::FromStr for BinData {
    type Err = SealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode_text(s)
    }
}

macro_rules! bin_data_from {
    ($($t:ty),*) => {$(
        impl From<$t> for BinData {
            fn from(b: $t) -> Self {
                Self(b.into())
            }
        }
    )*};
}

bin_data_from!(Arc<[u8]>, Box<[u8]>, Vec<u8>, &[u8]);

impl std::ops::Deref for BinData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for BinData {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl serde::Serialize for BinData {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for BinData {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let text = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Self::decode_text(&text).map_err(serde::de::Error::custom)
    }
}
