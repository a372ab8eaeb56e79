use crate::app_error::AppError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

// The chat endpoint is stateless for our purposes; both ids are fixed.
pub const CONVERSATION_ID: &str = "usability-eval";
pub const USER_ID: &str = "usability-eval";

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub conversation_id: &'a str,
    pub bot_id: &'a str,
    pub user: &'a str,
    pub query: &'a str,
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Unparsed response body, kept for operator-facing logs.
    pub raw_body: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatResponse {
    pub fn first_answer(&self) -> Option<&str> {
        self.answers().next()
    }

    pub fn answers(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .filter(|m| m.message_type == "answer")
            .map(|m| m.content.as_str())
    }
}

pub struct ChatClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(api_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(180))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_url,
            api_key,
        }
    }

    // Single attempt. No retries here; higher-level logic decides retries.
    async fn send_once(&self, bot_id: &str, query: &str) -> Result<ChatResponse, AppError> {
        let body = ChatRequest {
            conversation_id: CONVERSATION_ID,
            bot_id,
            user: USER_ID,
            query,
            stream: false,
        };

        let resp = self
            .client
            .post(&self.api_url)
            .header("Authorization", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Network(censor_api_key(&e.to_string(), &self.api_key)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AppError::Network(censor_api_key(&e.to_string(), &self.api_key)))?;

        if !status.is_success() {
            return Err(AppError::Network(format!(
                "HTTP {status} with body:\n{}",
                censor_api_key(&text, &self.api_key)
            )));
        }

        parse_chat_body(text)
    }
}

pub trait ChatApi: Send + Sync {
    fn send<'a>(
        &'a self,
        bot_id: &'a str,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ChatResponse, AppError>> + Send + 'a>>;
}

impl ChatApi for ChatClient {
    fn send<'a>(
        &'a self,
        bot_id: &'a str,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ChatResponse, AppError>> + Send + 'a>> {
        Box::pin(self.send_once(bot_id, query))
    }
}

pub(crate) fn parse_chat_body(raw_body: String) -> Result<ChatResponse, AppError> {
    let value: serde_json::Value = serde_json::from_str(&raw_body)
        .map_err(|e| AppError::Protocol(format!("response body is not valid JSON: {e}")))?;

    let messages_value = value
        .get("messages")
        .cloned()
        .ok_or_else(|| AppError::Protocol("response JSON has no 'messages' array".to_string()))?;

    let messages: Vec<ChatMessage> = serde_json::from_value(messages_value)
        .map_err(|e| AppError::Protocol(format!("malformed 'messages' array: {e}")))?;

    Ok(ChatResponse { raw_body, messages })
}

pub(crate) fn censor_api_key(text: &str, api_key: &str) -> String {
    if api_key.is_empty() {
        return text.to_string();
    }
    // Only censor things that look like keys. Very short strings are unlikely to be keys.
    let censored_key = if api_key.len() > 8 {
        format!("...{}", &api_key[api_key.len() - 4..])
    } else {
        "...".to_string()
    };
    text.replace(api_key, &censored_key)
}
