//! Composite element identifiers
//!
//! Element ids are `<dataSourceId>_<sanitizedNativeId>`. Each backend picks an
//! [`IdScheme`] that knows how to sanitize its native ids and how to undo it.

use crate::error::{Error, Result};

/// How a backend's native ids are embedded in composite ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdScheme {
    /// Native id kept as is
    #[default]
    Verbatim,
    /// `#cluster:position` record ids: sigil dropped, `:` becomes `_`
    RecordId,
}

impl IdScheme {
    /// Sanitize a native id for embedding
    pub fn sanitize(self, native: &str) -> String {
        match self {
            IdScheme::Verbatim => native.to_string(),
            IdScheme::RecordId => native.strip_prefix('#').unwrap_or(native).replace(':', "_"),
        }
    }

    /// Undo [`sanitize`](Self::sanitize)
    pub fn restore(self, sanitized: &str) -> String {
        match self {
            IdScheme::Verbatim => sanitized.to_string(),
            IdScheme::RecordId => format!("#{}", sanitized.replacen('_', ":", 1)),
        }
    }

    /// Build the composite id of a native element
    pub fn encode(self, data_source_id: i64, native: &str) -> String {
        format!("{data_source_id}_{}", self.sanitize(native))
    }

    /// Recover the native id from a composite id
    pub fn decode(self, data_source_id: i64, id: &str) -> Result<String> {
        let prefix = format!("{data_source_id}_");
        id.strip_prefix(&prefix)
            .filter(|rest| !rest.is_empty())
            .map(|rest| self.restore(rest))
            .ok_or_else(|| Error::InvalidId {
                id: id.to_string(),
                data_source_id,
            })
    }

    /// Decode a batch of composite ids, failing on the first malformed one
    pub fn decode_all<S: AsRef<str>>(self, data_source_id: i64, ids: &[S]) -> Result<Vec<String>> {
        ids.iter()
            .map(|id| self.decode(data_source_id, id.as_ref()))
            .collect()
    }
}
