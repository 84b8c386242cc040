use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An immutable encoded audio blob tagged with its media type.
///
/// Cloning shares the underlying bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Arc<[u8]>,
    mime_type: String,
}

impl Payload {
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Native file extension for the media type, ignoring codec parameters.
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }

    /// SHA-256 hex digest of the bytes.
    pub fn checksum(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        hex_encode(&digest)
    }
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let essence = mime_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
        "audio/wav" | "audio/wave" | "audio/x-wav" => "wav",
        "audio/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        _ => "bin",
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A finalized session: the payload plus the elapsed-time snapshot taken
/// when it was stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Take {
    pub payload: Payload,
    pub duration_secs: u32,
}

/// A persisted recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub id: i64,
    pub title: String,
    pub payload: Payload,
    pub duration_secs: u32,
    pub size: u64,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

impl Recording {
    pub fn metadata(&self) -> RecordingMetadata {
        RecordingMetadata {
            id: self.id,
            title: self.title.clone(),
            mime_type: self.payload.mime_type().to_string(),
            duration_secs: self.duration_secs,
            size: self.size,
            checksum: self.checksum.clone(),
            created_at: format_timestamp(&self.created_at),
        }
    }
}

/// Serializable description of a recording, without the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: i64,
    pub title: String,
    pub mime_type: String,
    pub duration_secs: u32,
    pub size: u64,
    pub checksum: String,
    pub created_at: String,
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_ignores_codec_parameters() {
        assert_eq!(extension_for_mime("audio/webm;codecs=opus"), "webm");
        assert_eq!(extension_for_mime("audio/wav"), "wav");
        assert_eq!(extension_for_mime("AUDIO/X-WAV"), "wav");
        assert_eq!(extension_for_mime("application/octet-stream"), "bin");
    }

    #[test]
    fn checksum_is_sha256_hex() {
        let payload = Payload::new(b"abc".to_vec(), "audio/wav");
        assert_eq!(
            payload.checksum(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(payload.size(), 3);
    }

    #[test]
    fn clones_share_bytes() {
        let payload = Payload::new(vec![1u8, 2, 3], "audio/wav");
        let copy = payload.clone();
        assert_eq!(payload.bytes().as_ptr(), copy.bytes().as_ptr());
    }

    #[test]
    fn timestamps_have_fixed_width() {
        let a = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let b = DateTime::parse_from_rfc3339("2024-01-01T00:00:00.5Z").unwrap().with_timezone(&Utc);
        assert_eq!(format_timestamp(&a), "2024-01-01T00:00:00.000000Z");
        assert_eq!(format_timestamp(&a).len(), format_timestamp(&b).len());
        assert!(format_timestamp(&a) < format_timestamp(&b));
    }

    #[test]
    fn metadata_omits_payload() {
        let recording = Recording {
            id: 3,
            title: "Morning check".into(),
            payload: Payload::new(vec![9u8; 10], "audio/wav"),
            duration_secs: 12,
            size: 10,
            checksum: "x".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&recording.metadata()).unwrap();
        assert!(json.contains("\"title\":\"Morning check\""));
        assert!(json.contains("\"mime_type\":\"audio/wav\""));
    }
}
