use anyhow::{Context, Result};
use std::sync::Arc;

use crate::telegram::ChatApi;
use crate::types::PodObservation;

pub const ALERT_HEADER: &str = "⚠️ *Problematic pods:*";

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

// Room kept for the "…and N more" line.
const TAIL_RESERVE: usize = 32;

/// Renders one message for the whole batch, one line per pod. Lines that do not
/// fit under [`MAX_MESSAGE_CHARS`] are replaced by a final `…and N more` line.
pub fn build_alert_message(batch: &[PodObservation]) -> String {
    let mut text = ALERT_HEADER.to_string();
    let mut len = text.chars().count();
    for (i, o) in batch.iter().enumerate() {
        let line = format!("\n- `{}/{}`: `{}`", o.namespace, o.pod, o.phase);
        let line_len = line.chars().count();
        let budget = if i + 1 == batch.len() {
            MAX_MESSAGE_CHARS
        } else {
            MAX_MESSAGE_CHARS - TAIL_RESERVE
        };
        if len + line_len > budget {
            text.push_str(&format!("\n…and {} more", batch.len() - i));
            return text;
        }
        text.push_str(&line);
        len += line_len;
    }
    text
}

/// Delivers alert batches to the configured chat.
#[derive(Clone)]
pub struct Notifier {
    chat: Arc<dyn ChatApi>,
    chat_id: String,
}

impl Notifier {
    pub fn new(chat: Arc<dyn ChatApi>, chat_id: impl Into<String>) -> Self {
        Self { chat, chat_id: chat_id.into() }
    }

    pub async fn send(&self, batch: &[PodObservation]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let text = build_alert_message(batch);
        self.chat
            .send_message(&self.chat_id, &text, None)
            .await
            .context("Failed to deliver pod alert")
    }
}
