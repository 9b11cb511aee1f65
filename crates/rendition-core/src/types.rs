//! Core data types for the Rendition pipeline.
//!
//! These types represent the output of processing an image: the encoded
//! renditions, the image info mapping, and timing statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::pipeline::hash::Checksum;

/// Longest info value kept, in characters.
pub const MAX_INFO_VALUE_LEN: usize = 1024;

/// Sanitized string metadata about an image.
///
/// Keys are case-insensitive (stored lower-case). Values have NUL bytes
/// stripped and are at most [`MAX_INFO_VALUE_LEN`] characters; anything else is
/// refused by [`ImageInfo::insert`]. After persistence the blob keys are
/// recorded alongside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(flatten)]
    entries: BTreeMap<String, String>,

    /// Key of the stored info JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_info_name: Option<String>,

    /// Size name to stored rendition key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blob_names: BTreeMap<String, String>,
}

impl ImageInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value after sanitizing it. Returns `false` (and stores
    /// nothing) when the value is too long once NUL bytes are removed.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> bool {
        let mut value = value.into();
        value.retain(|c| c != '\0');
        if value.chars().count() > MAX_INFO_VALUE_LEN {
            return false;
        }
        self.entries.insert(key.to_lowercase(), value);
        true
    }

    /// Insert raw bytes, refusing values that are not valid UTF-8.
    pub fn insert_bytes(&mut self, key: &str, value: &[u8]) -> bool {
        match std::str::from_utf8(value) {
            Ok(text) => self.insert(key, text),
            Err(_) => false,
        }
    }

    /// Look a key up case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_lowercase())
    }

    /// Iterate entries in key order. Blob names are not included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Time spent in each step of one rendition.
#[derive(Debug, Clone, Default)]
pub struct RenditionTimings {
    /// Set when the task had to decode its own image
    pub decode: Option<Duration>,
    pub crop: Duration,
    pub resize: Duration,
    pub transpose: Duration,
    pub convert: Duration,
    pub encode: Duration,
}

/// Per-stage timings and sizes for one processed image.
#[derive(Debug, Clone, Default)]
pub struct ProcessingStats {
    /// Byte length of the input
    pub original_size: usize,

    /// Byte length of the re-encoded input, when the fallback codec ran
    pub recovered_size: Option<usize>,

    /// Probe, metadata, validation, aspect-fit and first decode
    pub load: Duration,

    /// Per-size transform timings
    pub renditions: BTreeMap<String, RenditionTimings>,

    /// Blob upload, when persistence ran
    pub persist: Option<Duration>,

    /// Wall time of the whole job
    pub total: Duration,
}

/// Everything a finished job hands back to the caller.
#[derive(Debug, Clone)]
pub struct Processed {
    /// Size name to encoded JPEG bytes
    pub results: BTreeMap<String, Vec<u8>>,

    /// Image info, including blob keys when persisted
    pub info: ImageInfo,

    /// Checksum of the original bytes
    pub checksum: Checksum,

    pub stats: ProcessingStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut info = ImageInfo::new();
        assert!(info.insert("Format", "JPEG"));
        assert_eq!(info.get("format"), Some("JPEG"));
        assert_eq!(info.get("FORMAT"), Some("JPEG"));
        assert!(info.insert("FORMAT", "PNG"));
        assert_eq!(info.len(), 1);
        assert_eq!(info.get("format"), Some("PNG"));
    }

    #[test]
    fn test_nul_bytes_are_stripped() {
        let mut info = ImageInfo::new();
        assert!(info.insert("exif_make", "Canon\0\0"));
        assert_eq!(info.get("exif_make"), Some("Canon"));
    }

    #[test]
    fn test_long_values_are_refused() {
        let mut info = ImageInfo::new();
        assert!(info.insert("ok", "x".repeat(MAX_INFO_VALUE_LEN)));
        assert!(!info.insert("long", "x".repeat(MAX_INFO_VALUE_LEN + 1)));
        assert!(!info.contains_key("long"));
        // NULs do not count against the limit
        let padded = format!("{}\0", "x".repeat(MAX_INFO_VALUE_LEN));
        assert!(info.insert("padded", padded));
    }

    #[test]
    fn test_invalid_utf8_is_refused() {
        let mut info = ImageInfo::new();
        assert!(!info.insert_bytes("bad", &[0xff, 0xfe]));
        assert!(info.insert_bytes("good", b"caf\xc3\xa9"));
        assert_eq!(info.get("good"), Some("café"));
        assert!(!info.contains_key("bad"));
    }

    #[test]
    fn test_json_omits_blob_fields_until_set() {
        let mut info = ImageInfo::new();
        info.insert("checksum", "abc");
        let json: serde_json::Value = serde_json::from_slice(&info.to_json().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"checksum": "abc"}));

        info.blob_info_name = Some("k.json".into());
        info.blob_names.insert("50x50c".into(), "k_50x50c.jpg".into());
        let json: serde_json::Value = serde_json::from_slice(&info.to_json().unwrap()).unwrap();
        assert_eq!(json["blob_info_name"], "k.json");
        assert_eq!(json["blob_names"]["50x50c"], "k_50x50c.jpg");
    }
}
