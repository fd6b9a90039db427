use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::chunker::Chunk;

/// A single timestamped span of transcript text, as segmented by the
/// transcript downloader. `start` and `duration` are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// One video's worth of downloader output: the timestamped transcript plus
/// whatever metadata the YouTube API returned for the video. Metadata keys
/// are kept as-is in a pass-through map so fields we never look at survive
/// the round trip to the chunked files and the JSON Lines records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub transcript: Vec<Fragment>,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl VideoRecord {
    /// The normalized video identifier, present after [`VideoRecord::normalize`].
    pub fn video_id(&self) -> Option<&str> {
        self.metadata.get("video_id").and_then(Value::as_str)
    }

    /// Clean up raw API metadata: pick one thumbnail URL, hoist the video id
    /// out of `resourceId`, and drop channel-owner noise we never index.
    pub fn normalize(&mut self) {
        if let Some(thumbnails) = self.metadata.get("thumbnails") {
            if let Some(url) = best_thumbnail_url(thumbnails) {
                self.metadata
                    .insert("thumbnail".to_string(), Value::String(url));
            }
        }

        if let Some(video_id) = self
            .metadata
            .get("resourceId")
            .and_then(|r| r.get("videoId"))
            .and_then(Value::as_str)
            .map(str::to_owned)
        {
            self.metadata
                .insert("video_id".to_string(), Value::String(video_id));
        }

        self.metadata.remove("thumbnails");
        self.metadata.remove("resourceId");
        self.metadata.remove("videoOwnerChannelTitle");
        self.metadata.remove("videoOwnerChannelId");
    }
}

/// Pick the best available thumbnail URL, largest first.
fn best_thumbnail_url(thumbnails: &Value) -> Option<String> {
    for size in ["maxres", "standard", "default"] {
        if let Some(url) = thumbnails
            .get(size)
            .and_then(|t| t.get("url"))
            .and_then(Value::as_str)
        {
            return Some(url.to_string());
        }
    }
    None
}

/// Load a single per-video JSON file.
pub fn load_video(path: &Path) -> Result<VideoRecord> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse transcript file: {}", path.display()))
}

/// Collect every parseable per-video JSON file under `input_dir`.
///
/// Files that are not JSON, fail to parse, or lack a `transcript` key are
/// skipped with a warning so one bad video cannot kill a batch run.
pub fn load_dir(input_dir: &Path) -> Result<Vec<(PathBuf, VideoRecord)>> {
    let mut videos = Vec::new();

    for entry in WalkDir::new(input_dir).follow_links(false) {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        match load_video(path) {
            Ok(video) => videos.push((path.to_path_buf(), video)),
            Err(e) => {
                warn!("Skipping {}: {e:#}", path.display());
            }
        }
    }

    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_video(thumbnails: Value) -> VideoRecord {
        serde_json::from_value(json!({
            "title": "Test Video",
            "publishedAt": "2023-05-01T12:00:00Z",
            "thumbnails": thumbnails,
            "resourceId": { "kind": "youtube#video", "videoId": "abc123" },
            "videoOwnerChannelTitle": "Some Channel",
            "videoOwnerChannelId": "UC123",
            "transcript": [
                { "text": "hello there", "start": 0.0, "duration": 2.5 }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn normalize_prefers_maxres_thumbnail() {
        let mut video = raw_video(json!({
            "default": { "url": "http://img/default.jpg" },
            "standard": { "url": "http://img/standard.jpg" },
            "maxres": { "url": "http://img/maxres.jpg" }
        }));
        video.normalize();

        assert_eq!(video.metadata["thumbnail"], "http://img/maxres.jpg");
    }

    #[test]
    fn normalize_falls_back_to_standard_then_default() {
        let mut video = raw_video(json!({
            "default": { "url": "http://img/default.jpg" },
            "standard": { "url": "http://img/standard.jpg" }
        }));
        video.normalize();
        assert_eq!(video.metadata["thumbnail"], "http://img/standard.jpg");

        let mut video = raw_video(json!({
            "default": { "url": "http://img/default.jpg" }
        }));
        video.normalize();
        assert_eq!(video.metadata["thumbnail"], "http://img/default.jpg");
    }

    #[test]
    fn normalize_hoists_video_id_and_drops_noise() {
        let mut video = raw_video(json!({
            "default": { "url": "http://img/default.jpg" }
        }));
        video.normalize();

        assert_eq!(video.video_id(), Some("abc123"));
        assert!(!video.metadata.contains_key("thumbnails"));
        assert!(!video.metadata.contains_key("resourceId"));
        assert!(!video.metadata.contains_key("videoOwnerChannelTitle"));
        assert!(!video.metadata.contains_key("videoOwnerChannelId"));
        // Untouched fields survive
        assert_eq!(video.metadata["title"], "Test Video");
    }

    #[test]
    fn missing_transcript_key_is_an_error() {
        let result: std::result::Result<VideoRecord, _> =
            serde_json::from_value(json!({ "title": "No transcript here" }));
        assert!(result.is_err());
    }

    #[test]
    fn load_dir_skips_bad_files_and_keeps_good_ones() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("good.json"),
            r#"{"title":"ok","transcript":[{"text":"hi","start":0.0,"duration":1.0}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        fs::write(dir.path().join("no_transcript.json"), r#"{"title":"nope"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a transcript").unwrap();

        let videos = load_dir(dir.path()).unwrap();

        assert_eq!(videos.len(), 1);
        assert!(videos[0].0.ends_with("good.json"));
        assert_eq!(videos[0].1.transcript[0].text, "hi");
    }

    #[test]
    fn fragments_round_trip() {
        let video = raw_video(json!({}));
        assert_eq!(video.transcript.len(), 1);
        assert_eq!(video.transcript[0].text, "hello there");
        assert_eq!(video.transcript[0].start, 0.0);
        assert_eq!(video.transcript[0].duration, 2.5);
        assert!(video.chunks.is_empty());
    }
}
