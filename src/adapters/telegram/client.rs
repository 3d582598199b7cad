use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ports::{Chart, Command, NotifyError, Notifier};

const API_BASE: &str = "https://api.telegram.org";

/// Telegram caps photo/document captions at this many characters
const MAX_CAPTION_CHARS: usize = 1024;

/// Envelope shared by every Bot API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Chat {
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Notifier speaking the Telegram Bot API
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    chat_id: i64,
    poll_timeout: Duration,
    next_offset: AtomicI64,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: i64) -> Result<Self, NotifyError> {
        Self::with_base_url(API_BASE, token, chat_id)
    }

    pub fn with_base_url(base_url: &str, token: &str, chat_id: i64) -> Result<Self, NotifyError> {
        let poll_timeout = Duration::from_secs(30);
        let client = reqwest::Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", base_url.trim_end_matches('/'), token),
            chat_id,
            poll_timeout,
            next_offset: AtomicI64::new(0),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessage {
                chat_id: self.chat_id,
                text,
            })
            .send()
            .await?
            .json::<ApiResponse<serde_json::Value>>()
            .await?;

        into_result(response).map(|_| ())
    }

    async fn send_document(&self, caption: Option<&str>, chart: Chart) -> Result<(), NotifyError> {
        let part = Part::bytes(chart.bytes)
            .file_name(chart.file_name)
            .mime_str(chart.mime_type)?;

        let mut form = Form::new()
            .text("chat_id", self.chat_id.to_string())
            .part("document", part);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?
            .json::<ApiResponse<serde_json::Value>>()
            .await?;

        into_result(response).map(|_| ())
    }
}

fn into_result<T>(response: ApiResponse<T>) -> Result<Option<T>, NotifyError> {
    if response.ok {
        Ok(response.result)
    } else {
        Err(NotifyError::Api(
            response
                .description
                .unwrap_or_else(|| "request rejected".to_string()),
        ))
    }
}

/// Pull recognised commands addressed from `chat_id` out of an update batch.
/// Also returns the offset that acknowledges the whole batch.
pub(crate) fn extract_commands(updates: &[Update], chat_id: i64) -> (Vec<Command>, Option<i64>) {
    let next_offset = updates.iter().map(|u| u.update_id + 1).max();

    let commands = updates
        .iter()
        .filter_map(|update| update.message.as_ref())
        .filter(|message| {
            if message.chat.id != chat_id {
                debug!(chat_id = message.chat.id, "Ignoring message from foreign chat");
                return false;
            }
            true
        })
        .filter_map(|message| {
            let text = message.text.as_deref()?;
            let command = Command::parse(text);
            if command.is_none() {
                debug!(text, "Ignoring unrecognized command");
            }
            command
        })
        .collect();

    (commands, next_offset)
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str, image: Option<Chart>) -> Result<(), NotifyError> {
        match image {
            None => self.send_text(text).await,
            Some(chart) if text.chars().count() <= MAX_CAPTION_CHARS => {
                self.send_document(Some(text), chart).await
            }
            Some(chart) => {
                self.send_text(text).await?;
                self.send_document(None, chart).await
            }
        }
    }

    async fn next_commands(&self) -> Result<Vec<Command>, NotifyError> {
        let offset = self.next_offset.load(Ordering::SeqCst);
        let timeout = self.poll_timeout.as_secs().to_string();
        let offset_param = offset.to_string();

        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset_param.as_str()),
                ("timeout", timeout.as_str()),
                ("allowed_updates", r#"["message"]"#),
            ])
            .send()
            .await?
            .json::<ApiResponse<Vec<Update>>>()
            .await?;

        let updates = into_result(response)?.unwrap_or_default();
        let (commands, next_offset) = extract_commands(&updates, self.chat_id);

        if let Some(next) = next_offset {
            self.next_offset.store(next, Ordering::SeqCst);
        }

        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MetricColumn;

    const CHAT: i64 = 4242;

    fn updates(json: &str) -> Vec<Update> {
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        into_result(response).unwrap().unwrap()
    }

    #[test]
    fn test_extract_commands_from_own_chat() {
        let batch = updates(
            r#"{"ok":true,"result":[
                {"update_id":10,"message":{"chat":{"id":4242},"text":"/report"}},
                {"update_id":11,"message":{"chat":{"id":4242},"text":"/chart disk"}},
                {"update_id":12,"message":{"chat":{"id":4242}}}
            ]}"#,
        );

        let (commands, offset) = extract_commands(&batch, CHAT);
        assert_eq!(
            commands,
            vec![Command::Report, Command::Chart(MetricColumn::Disk)]
        );
        assert_eq!(offset, Some(13));
    }

    #[test]
    fn test_extract_commands_ignores_foreign_chats_and_noise() {
        let batch = updates(
            r#"{"ok":true,"result":[
                {"update_id":20,"message":{"chat":{"id":1},"text":"/stats"}},
                {"update_id":21,"message":{"chat":{"id":4242},"text":"what's up?"}},
                {"update_id":22}
            ]}"#,
        );

        let (commands, offset) = extract_commands(&batch, CHAT);
        assert!(commands.is_empty());
        assert_eq!(offset, Some(23));
    }

    #[test]
    fn test_empty_batch_keeps_offset() {
        let (commands, offset) = extract_commands(&[], CHAT);
        assert!(commands.is_empty());
        assert_eq!(offset, None);
    }

    #[test]
    fn test_api_error_is_surfaced() {
        let response: ApiResponse<Vec<Update>> =
            serde_json::from_str(r#"{"ok":false,"description":"Unauthorized"}"#).unwrap();
        match into_result(response) {
            Err(NotifyError::Api(msg)) => assert_eq!(msg, "Unauthorized"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_method_url() {
        let notifier = TelegramNotifier::with_base_url("http://localhost:8081/", "abc:123", CHAT).unwrap();
        assert_eq!(
            notifier.method_url("getUpdates"),
            "http://localhost:8081/botabc:123/getUpdates"
        );
    }
}
