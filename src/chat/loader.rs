//! Chat export parsing and time normalization
//!
//! Accepts line-delimited JSON records as well as the document shapes older
//! exports use (a JSON array, a `{"messages": [...]}` wrapper, or a single
//! message object). Individual records that fail to parse are skipped and
//! counted; only an empty or structurally unreadable input fails the load.

use crate::chat::model::{format_time_text, Author, ChatMessage};
use crate::error::{ReplayError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Unit of the absolute `timestamp` field in an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampUnit {
    #[default]
    Milliseconds,
    Seconds,
}

impl TimestampUnit {
    fn per_second(&self) -> f64 {
        match self {
            TimestampUnit::Milliseconds => 1000.0,
            TimestampUnit::Seconds => 1.0,
        }
    }
}

/// Options controlling time normalization
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Unit of absolute timestamps
    pub timestamp_unit: TimestampUnit,

    /// Absolute stream start; the earliest record timestamp when unset
    pub stream_start: Option<i64>,
}

/// Outcome of loading one export
#[derive(Debug, Clone)]
pub struct LoadedChat {
    /// Usable messages in export order
    pub messages: Vec<ChatMessage>,

    /// Records that could not be parsed
    pub skipped: usize,
}

/// Export record as found on disk, before normalization
#[derive(Debug, Deserialize)]
struct ChatRecord {
    message_id: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    message_type: String,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    time_in_seconds: Option<f64>,
    #[serde(default)]
    time_text: Option<String>,
    author: Author,
    #[serde(default)]
    raw_data: Option<String>,
    #[serde(default)]
    received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    tip_amount: Option<i64>,
}

/// Parses chat exports into [`ChatMessage`]s
#[derive(Debug, Clone, Default)]
pub struct ChatLoader {
    options: LoadOptions,
}

impl ChatLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Load an export from disk
    pub async fn load_file(&self, path: &Path) -> Result<LoadedChat> {
        if !path.exists() {
            return Err(ReplayError::NotFound(path.to_path_buf()));
        }

        let bytes = tokio::fs::read(path).await?;
        let loaded = self.load_bytes(&bytes)?;

        info!(
            "💬 Loaded {} chat messages from {} ({} skipped)",
            loaded.messages.len(),
            path.display(),
            loaded.skipped
        );

        Ok(loaded)
    }

    /// Load an export from raw bytes
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<LoadedChat> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ReplayError::format(format!("export is not valid UTF-8: {}", e)))?;
        self.load_str(text)
    }

    /// Load an export from text
    pub fn load_str(&self, input: &str) -> Result<LoadedChat> {
        let input = input.trim_start_matches('\u{feff}').trim();
        if input.is_empty() {
            return Err(ReplayError::format("chat export is empty"));
        }

        let (values, mut skipped) = split_records(input)?;

        let mut records = Vec::with_capacity(values.len());
        for (position, value) in values.into_iter().enumerate() {
            match serde_json::from_value::<ChatRecord>(value) {
                Ok(record) if record.timestamp.is_some() || record.time_in_seconds.is_some() => {
                    records.push(record)
                }
                Ok(record) => {
                    debug!("Record {} ({}) has no time information", position + 1, record.message_id);
                    skipped += 1;
                }
                Err(e) => {
                    debug!("Skipping malformed record {}: {}", position + 1, e);
                    skipped += 1;
                }
            }
        }

        let (messages, out_of_range) = self.normalize(records);
        skipped += out_of_range;

        if messages.is_empty() {
            return Err(ReplayError::format(format!(
                "no usable chat messages ({} malformed records)",
                skipped
            )));
        }

        if skipped > 0 {
            warn!("Skipped {} malformed chat records", skipped);
        }

        Ok(LoadedChat { messages, skipped })
    }

    /// Resolve playback offsets, derived text and tip amounts.
    ///
    /// Records whose offset from the stream start does not fit in an `i64`
    /// are dropped and counted.
    fn normalize(&self, records: Vec<ChatRecord>) -> (Vec<ChatMessage>, usize) {
        let stream_start = self
            .options
            .stream_start
            .or_else(|| records.iter().filter_map(|r| r.timestamp).min())
            .unwrap_or(0);
        let per_second = self.options.timestamp_unit.per_second();

        let mut out_of_range = 0;
        let messages = records
            .into_iter()
            .filter_map(|record| {
                let time_in_seconds = match (record.time_in_seconds, record.timestamp) {
                    (Some(offset), _) => offset,
                    (None, Some(ts)) => match ts.checked_sub(stream_start) {
                        Some(delta) => delta as f64 / per_second,
                        None => {
                            debug!("Record {} timestamp {} is out of range", record.message_id, ts);
                            out_of_range += 1;
                            return None;
                        }
                    },
                    (None, None) => 0.0,
                };
                let raw_data = record.raw_data.filter(|raw| !raw.is_empty());
                let tip_amount = record
                    .tip_amount
                    .or_else(|| raw_data.as_deref().and_then(extract_tip_amount));

                Some(ChatMessage {
                    message_id: record.message_id,
                    message: record.message,
                    message_type: record.message_type,
                    timestamp: record.timestamp.unwrap_or(0),
                    time_in_seconds,
                    time_text: record
                        .time_text
                        .unwrap_or_else(|| format_time_text(time_in_seconds)),
                    author: record.author,
                    raw_data,
                    received_at: record.received_at,
                    tip_amount,
                })
            })
            .collect();

        (messages, out_of_range)
    }
}

/// Split an export into candidate record values plus a count of unreadable lines
fn split_records(input: &str) -> Result<(Vec<Value>, usize)> {
    if input.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(input)
            .map_err(|e| ReplayError::format(format!("invalid JSON array: {}", e)))?;
        return Ok((values, 0));
    }

    if input.starts_with('{') {
        if let Ok(document) = serde_json::from_str::<Value>(input) {
            return match document {
                Value::Object(mut map) if map.contains_key("messages") => {
                    match map.remove("messages") {
                        Some(Value::Array(values)) => Ok((values, 0)),
                        _ => Err(ReplayError::format("`messages` is not an array")),
                    }
                }
                single => Ok((vec![single], 0)),
            };
        }
    }

    let mut values = Vec::new();
    let mut skipped = 0;
    for (line_number, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => values.push(value),
            Err(e) => {
                debug!("Unreadable line {}: {}", line_number + 1, e);
                skipped += 1;
            }
        }
    }

    Ok((values, skipped))
}

/// Pull a tip amount out of a raw platform event payload.
///
/// The payload nests JSON inside strings twice: `event` holds an encoded
/// event whose `chatRoomMessage.attachments[].metadata` holds an encoded
/// object with `amount`.
pub fn extract_tip_amount(raw_data: &str) -> Option<i64> {
    let raw: Value = serde_json::from_str(raw_data).ok()?;
    let event: Value = serde_json::from_str(raw.get("event")?.as_str()?).ok()?;
    let attachments = event.get("chatRoomMessage")?.get("attachments")?.as_array()?;

    attachments.iter().find_map(|attachment| {
        let metadata: Value = serde_json::from_str(attachment.get("metadata")?.as_str()?).ok()?;
        metadata.get("amount")?.as_f64().map(|amount| amount as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, seconds: f64) -> String {
        format!(
            r#"{{"message_id":"{}","message":"hi","message_type":"chat","timestamp":0,"time_in_seconds":{},"time_text":"","author":{{"id":"u-{}","name":"n"}}}}"#,
            id, seconds, id
        )
    }

    #[test]
    fn test_malformed_lines_are_skipped_and_counted() {
        let mut lines: Vec<String> = (0..100).map(|i| line(&i.to_string(), i as f64)).collect();
        lines.insert(10, "{not json".to_string());
        lines.insert(50, r#"{"message":"missing id"}"#.to_string());
        lines.push("garbage".to_string());

        let loaded = ChatLoader::default().load_str(&lines.join("\n")).unwrap();
        assert_eq!(loaded.messages.len(), 100);
        assert_eq!(loaded.skipped, 3);
    }

    #[test]
    fn test_empty_input_is_format_error() {
        let err = ChatLoader::default().load_str("  \n ").unwrap_err();
        assert!(matches!(err, ReplayError::Format(_)));
    }

    #[test]
    fn test_all_lines_malformed_is_format_error() {
        let err = ChatLoader::default().load_str("foo\nbar\n").unwrap_err();
        assert!(matches!(err, ReplayError::Format(_)));
    }

    #[test]
    fn test_truncated_array_is_format_error() {
        let err = ChatLoader::default().load_str(r#"[{"message_id":"1""#).unwrap_err();
        assert!(matches!(err, ReplayError::Format(_)));
    }

    #[test]
    fn test_document_shapes() {
        let array = format!("[{},{}]", line("a", 1.0), line("b", 2.0));
        let wrapped = format!(r#"{{"messages":[{},{},{{"bad":true}}]}}"#, line("a", 1.0), line("b", 2.0));
        let single = line("a", 1.0);

        let loader = ChatLoader::default();
        assert_eq!(loader.load_str(&array).unwrap().messages.len(), 2);

        let loaded = loader.load_str(&wrapped).unwrap();
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.skipped, 1);

        assert_eq!(loader.load_str(&single).unwrap().messages[0].message_id, "a");
    }

    #[test]
    fn test_offsets_derived_from_absolute_timestamps() {
        let input = r#"
{"message_id":"1","timestamp":1700000002500,"author":{"id":"x"}}
{"message_id":"2","timestamp":1700000000000,"author":{"id":"y"}}
{"message_id":"3","timestamp":1700000009000,"time_in_seconds":42.0,"author":{"id":"z"}}
"#;
        let loaded = ChatLoader::default().load_str(input).unwrap();
        let offsets: Vec<f64> = loaded.messages.iter().map(|m| m.time_in_seconds).collect();
        assert_eq!(offsets, vec![2.5, 0.0, 42.0]);
        assert_eq!(loaded.messages[0].time_text, "0:02");

        let explicit = ChatLoader::new(LoadOptions {
            timestamp_unit: TimestampUnit::Milliseconds,
            stream_start: Some(1_699_999_990_000),
        });
        let loaded = explicit.load_str(input).unwrap();
        assert_eq!(loaded.messages[1].time_in_seconds, 10.0);
    }

    #[test]
    fn test_out_of_range_timestamps_are_skipped() {
        let input = format!(
            "{}\n{}\n{}",
            r#"{"message_id":"low","timestamp":-9223372036854775808,"author":{"id":"x"}}"#,
            r#"{"message_id":"high","timestamp":9223372036854775807,"author":{"id":"y"}}"#,
            r#"{"message_id":"offset","timestamp":9223372036854775807,"time_in_seconds":3.0,"author":{"id":"z"}}"#,
        );
        let loaded = ChatLoader::default().load_str(&input).unwrap();
        let ids: Vec<&str> = loaded.messages.iter().map(|m| m.message_id.as_str()).collect();
        assert_eq!(ids, vec!["low", "offset"]);
        assert_eq!(loaded.skipped, 1);
        assert_eq!(loaded.messages[0].time_in_seconds, 0.0);

        let far_start = ChatLoader::new(LoadOptions {
            timestamp_unit: TimestampUnit::Milliseconds,
            stream_start: Some(i64::MIN),
        });
        let only_absolute = r#"{"message_id":"1","timestamp":1700000000000,"author":{"id":"x"}}"#;
        assert!(matches!(far_start.load_str(only_absolute), Err(ReplayError::Format(_))));
    }

    #[test]
    fn test_tip_amount_extracted_from_raw_data() {
        let metadata = serde_json::json!({ "amount": 2500.0 }).to_string();
        let event = serde_json::json!({
            "chatRoomMessage": { "attachments": [ { "metadata": "not json" }, { "metadata": metadata } ] }
        })
        .to_string();
        let raw = serde_json::json!({ "event": event }).to_string();

        assert_eq!(extract_tip_amount(&raw), Some(2500));
        assert_eq!(extract_tip_amount("{}"), None);
        assert_eq!(extract_tip_amount("not json"), None);

        let record = serde_json::json!({
            "message_id": "t1",
            "time_in_seconds": 3.0,
            "author": { "id": "a" },
            "raw_data": raw,
        });
        let loaded = ChatLoader::default().load_str(&record.to_string()).unwrap();
        assert_eq!(loaded.messages[0].tip_amount, Some(2500));
        assert!(loaded.messages[0].is_tip());
    }
}
