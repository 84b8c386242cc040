use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::StoreError;
use crate::models::recording::{Recording, RecordingMetadata};

/// Turn a title into a file stem: keep alphanumerics, spaces, `-` and `_`,
/// collapse whitespace runs into `-`, lowercase.
///
/// Returns `recording-<id>` when nothing usable is left.
pub fn sanitize_filename(title: &str, id: i64) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();
    let stem = kept
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();

    if stem.is_empty() {
        format!("recording-{}", id)
    } else {
        stem
    }
}

/// File name for a recording: sanitized title plus the payload's native
/// extension.
pub fn export_file_name(recording: &Recording) -> String {
    format!(
        "{}.{}",
        sanitize_filename(&recording.title, recording.id),
        recording.payload.extension()
    )
}

/// Write the recording's payload into `dir`, optionally with a
/// `<name>.metadata.json` sidecar. Returns the payload path.
pub fn export(recording: &Recording, dir: &Path, with_metadata: bool) -> Result<PathBuf, StoreError> {
    fs::create_dir_all(dir)
        .map_err(|e| StoreError::StorageUnavailable(format!("failed to create export directory: {}", e)))?;

    let path = dir.join(export_file_name(recording));
    fs::write(&path, recording.payload.bytes())
        .map_err(|e| StoreError::StorageUnavailable(format!("failed to write recording: {}", e)))?;

    if with_metadata {
        write_metadata(&recording.metadata(), &path)?;
    }

    log::info!("Exported recording {} to {}", recording.id, path.display());
    Ok(path)
}

/// Write recording metadata as a JSON sidecar next to `recording_path`.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| StoreError::StorageUnavailable(format!("failed to serialize metadata: {}", e)))?;
    fs::write(metadata_path(recording_path), json)
        .map_err(|e| StoreError::StorageUnavailable(format!("failed to write metadata: {}", e)))?;
    Ok(())
}

/// Read recording metadata from the JSON sidecar next to `recording_path`.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, StoreError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| StoreError::StorageUnavailable(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json)
        .map_err(|e| StoreError::StorageUnavailable(format!("failed to parse metadata: {}", e)))
}

fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recording::Payload;
    use chrono::{TimeZone, Utc};

    fn recording(id: i64, title: &str) -> Recording {
        let payload = Payload::new(b"RIFF....WAVE".to_vec(), "audio/wav");
        Recording {
            id,
            title: title.to_string(),
            size: payload.size(),
            checksum: payload.checksum(),
            payload,
            duration_secs: 9,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        }
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("soundcheck-export-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn sanitize_keeps_words_and_dashes() {
        assert_eq!(sanitize_filename("Team Sync: Q3 / Plans!", 1), "team-sync-q3-plans");
        assert_eq!(sanitize_filename("  lots   of\tspace ", 1), "lots-of-space");
        assert_eq!(sanitize_filename("keep_under-score", 1), "keep_under-score");
    }

    #[test]
    fn sanitize_falls_back_to_id() {
        assert_eq!(sanitize_filename("?!/*", 42), "recording-42");
        assert_eq!(sanitize_filename("", 7), "recording-7");
    }

    #[test]
    fn export_writes_payload_and_sidecar() {
        let dir = scratch_dir();
        let rec = recording(3, "Morning Notes");

        let path = export(&rec, &dir, true).unwrap();
        assert_eq!(path.file_name().unwrap(), "morning-notes.wav");
        assert_eq!(fs::read(&path).unwrap(), rec.payload.bytes());

        let metadata = read_metadata(&path).unwrap();
        assert_eq!(metadata, rec.metadata());
        assert_eq!(metadata.created_at, "2024-03-01T09:30:00.000000Z");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn export_without_sidecar() {
        let dir = scratch_dir();
        let path = export(&recording(5, "Plain"), &dir, false).unwrap();

        assert!(path.exists());
        assert!(read_metadata(&path).is_err());

        let _ = fs::remove_dir_all(&dir);
    }
}
