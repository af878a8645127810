//! Error notification side channel

use crate::config::{NotificationSettings, TELEGRAM_BOT_TOKEN_ENV};
use crate::{Error, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

const TELEGRAM_API: &str = "https://api.telegram.org/";

/// Sends messages through a Telegram bot
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
    chat_id: String,
    script_name: String,
}

impl TelegramNotifier {
    pub fn new(token: SecretString, chat_id: impl Into<String>, script_name: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: TELEGRAM_API.to_string(),
            token,
            chat_id: chat_id.into(),
            script_name: script_name.into(),
        }
    }

    /// Notifier configured from settings and `TELEGRAM_BOT_TOKEN`, if both are present
    pub fn from_env(settings: &NotificationSettings) -> Option<Self> {
        let chat_id = settings.telegram_chat_id.as_ref()?;
        let token = std::env::var(TELEGRAM_BOT_TOKEN_ENV).ok()?;
        if token.is_empty() || chat_id.is_empty() {
            return None;
        }
        Some(Self::new(
            SecretString::from(token),
            chat_id.clone(),
            settings.script_name.clone(),
        ))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("chat_id", &self.chat_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let url = format!(
            "{}bot{}/sendMessage",
            self.base_url,
            self.token.expose_secret()
        );
        let text = format!("Script: {}. {}", self.script_name, message);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("chat_id", self.chat_id.as_str()),
                ("parse_mode", "Markdown"),
                ("text", text.as_str()),
            ])
            .send()
            .await
            // the URL carries the bot token
            .map_err(|e| Error::Notification(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Notification(format!(
                "Telegram responded with {}",
                response.status()
            )));
        }
        Ok(())
    }
}
