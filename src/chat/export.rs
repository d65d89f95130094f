//! Chat slice serialization in the line-delimited format the loader reads

use crate::chat::model::ChatMessage;
use crate::error::{ReplayError, Result};
use std::path::Path;
use tracing::debug;

/// Render messages as one JSON record per line, in the given order.
///
/// Field order and number formatting come from serde, so identical input
/// always produces identical bytes.
pub fn to_ndjson(messages: &[ChatMessage]) -> Result<String> {
    let mut output = String::new();
    for message in messages {
        let line = serde_json::to_string(message)
            .map_err(|e| ReplayError::Serialization(format!("message {}: {}", message.message_id, e)))?;
        output.push_str(&line);
        output.push('\n');
    }
    Ok(output)
}

/// Write a chat slice artifact to `path`
pub async fn write_chat_slice(messages: &[ChatMessage], path: &Path) -> Result<()> {
    let content = to_ndjson(messages)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ReplayError::Serialization(format!("{}: {}", parent.display(), e)))?;
    }

    tokio::fs::write(path, content)
        .await
        .map_err(|e| ReplayError::Serialization(format!("{}: {}", path.display(), e)))?;

    debug!("Wrote {} chat messages to {}", messages.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::loader::ChatLoader;
    use crate::chat::model::{Author, TierInfo};
    use tempfile::TempDir;

    fn sample() -> Vec<ChatMessage> {
        let mut author = Author::new("42", "member");
        author.badges = vec!["founder".to_string()];
        author.tier_info = Some(TierInfo {
            tier_id: "t1".to_string(),
            tier_color: "#ff00ff".to_string(),
            tier_name: "Gold".to_string(),
        });

        vec![
            ChatMessage {
                message_id: "100".to_string(),
                message: "first".to_string(),
                message_type: "chat".to_string(),
                timestamp: 1_700_000_005_000,
                time_in_seconds: 5.0,
                time_text: "0:05".to_string(),
                author: author.clone(),
                raw_data: Some("{\"k\":1}".to_string()),
                received_at: None,
                tip_amount: None,
            },
            ChatMessage {
                message_id: "101".to_string(),
                message: "thanks!".to_string(),
                message_type: "tip".to_string(),
                timestamp: 1_700_000_009_500,
                time_in_seconds: 9.5,
                time_text: "0:09".to_string(),
                author,
                raw_data: None,
                received_at: None,
                tip_amount: Some(300),
            },
        ]
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let messages = sample();
        assert_eq!(to_ndjson(&messages).unwrap(), to_ndjson(&messages).unwrap());
        assert_eq!(to_ndjson(&messages).unwrap().lines().count(), 2);
        assert_eq!(to_ndjson(&[]).unwrap(), "");
    }

    #[tokio::test]
    async fn test_written_slice_reloads_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("clip_chat.json");
        let messages = sample();

        write_chat_slice(&messages, &path).await.unwrap();
        let reloaded = ChatLoader::default().load_file(&path).await.unwrap();

        assert_eq!(reloaded.skipped, 0);
        assert_eq!(reloaded.messages, messages);
    }
}
