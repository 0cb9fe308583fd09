use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use concat_string::concat_string;
use serde::Serialize;

use crate::{bot::Notifier, config::SETTINGS, logging, util::http};

/// 訊息使用 HTML 格式，可用 <b>、<i> 等標籤
const PARSE_MODE: &str = "HTML";

pub struct Telegram {
    send_message_url: String,
    chat_id: String,
    timeout: Duration,
}

impl Telegram {
    pub fn new(api_url: &str, token: &str, chat_id: &str) -> Self {
        Self {
            send_message_url: concat_string!(api_url, "/bot", token, "/sendMessage"),
            chat_id: chat_id.to_string(),
            timeout: Duration::from_secs(SETTINGS.monitor.request_timeout_secs),
        }
    }

    /// 覆寫單次請求的逾時時間
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_settings() -> Self {
        let telegram = &SETTINGS.bot.telegram;
        Self::new(&telegram.api_url, &telegram.token, &telegram.chat_id)
    }

    async fn send_message(&self, payload: SendMessageRequest<'_>) -> Result<()> {
        http::post_json(&self.send_message_url, &payload, self.timeout)
            .await
            .map_err(|err| anyhow!("Failed to send_message because: {:?}", err))?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for Telegram {
    async fn send(&self, message: &str) -> bool {
        match self
            .send_message(SendMessageRequest::new(&self.chat_id, message))
            .await
        {
            Ok(_) => true,
            Err(why) => {
                let msg = format!("Error sending message to Telegram: {:?}", why);
                logging::error_console(msg.clone());
                logging::error_file_async(msg);
                false
            }
        }
    }

    fn destination(&self) -> &str {
        &self.chat_id
    }
}

#[derive(Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    pub parse_mode: &'static str,
}

impl<'a> SendMessageRequest<'a> {
    pub fn new(chat_id: &'a str, text: &'a str) -> SendMessageRequest<'a> {
        SendMessageRequest {
            chat_id,
            text,
            parse_mode: PARSE_MODE,
        }
    }
}
