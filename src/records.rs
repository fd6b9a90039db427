use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;

use crate::transcript::VideoRecord;

/// One self-contained line of the chunk JSON Lines file: the boundary
/// contract with the embedding and indexing stages. Field names are fixed;
/// downstream consumers match on them byte-for-byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// `{video_id}-{n}`, 1-indexed per video.
    pub id: String,
    pub text: String,
    /// Video metadata merged with the chunk's `start`/`end`/`duration`.
    pub metadata: Map<String, Value>,
}

/// Flatten a chunked video into one record per chunk.
///
/// Metadata is the video's (normalized) metadata with the transcript and
/// chunk list stripped and the chunk's own time range merged in.
pub fn to_records(video: &VideoRecord) -> Result<Vec<ChunkRecord>> {
    let video_id = video
        .video_id()
        .context("video metadata has no video_id; was it normalized?")?
        .to_string();

    let records = video
        .chunks
        .iter()
        .enumerate()
        .map(|(idx, chunk)| {
            let mut metadata = video.metadata.clone();
            metadata.insert("start".to_string(), json_f64(chunk.start));
            metadata.insert("end".to_string(), json_f64(chunk.end));
            metadata.insert("duration".to_string(), json_f64(chunk.duration));

            ChunkRecord {
                id: format!("{}-{}", video_id, idx + 1),
                text: chunk.text.clone(),
                metadata,
            }
        })
        .collect();

    Ok(records)
}

/// Write records as JSON Lines, one object per line.
pub fn write_lines<W: Write>(writer: &mut W, records: &[ChunkRecord]) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut *writer, record).context("Failed to serialize chunk record")?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

fn json_f64(value: f64) -> Value {
    // f64 seconds are always finite here; fall back to null rather than panic
    // if a caller ever feeds NaN through.
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunked_video() -> VideoRecord {
        serde_json::from_value(json!({
            "title": "Filters 101",
            "video_id": "vid42",
            "url": "https://youtube.com/watch?v=vid42",
            "transcript": [
                { "text": "a b c", "start": 0.0, "duration": 3.0 }
            ],
            "chunks": [
                { "text": "a b c", "start": 0.0, "end": 3.0, "duration": 3.0 },
                { "text": "c d", "start": 3.0, "end": 5.0, "duration": 2.0 }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn ids_are_video_scoped_and_one_indexed() {
        let records = to_records(&chunked_video()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "vid42-1");
        assert_eq!(records[1].id, "vid42-2");
    }

    #[test]
    fn metadata_merges_chunk_timing_over_video_fields() {
        let records = to_records(&chunked_video()).unwrap();

        let meta = &records[1].metadata;
        assert_eq!(meta["title"], "Filters 101");
        assert_eq!(meta["start"], 3.0);
        assert_eq!(meta["end"], 5.0);
        assert_eq!(meta["duration"], 2.0);
        assert!(!meta.contains_key("transcript"));
        assert!(!meta.contains_key("chunks"));
    }

    #[test]
    fn missing_video_id_is_an_error() {
        let video: VideoRecord = serde_json::from_value(json!({
            "title": "no id",
            "transcript": [],
            "chunks": []
        }))
        .unwrap();

        assert!(to_records(&video).is_err());
    }

    #[test]
    fn lines_are_one_object_each_with_contract_fields() {
        let records = to_records(&chunked_video()).unwrap();

        let mut out = Vec::new();
        write_lines(&mut out, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: Value = serde_json::from_str(line).unwrap();
            assert!(value.get("id").is_some());
            assert!(value.get("text").is_some());
            assert!(value.get("metadata").is_some());
        }
    }

    #[test]
    fn chunk_serialization_uses_contract_field_names() {
        let video = chunked_video();
        let value = serde_json::to_value(&video.chunks[0]).unwrap();

        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        for key in ["text", "start", "end", "duration"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
    }
}
