use std::{env, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    config::TranslationConfig,
    error::{Error, Result},
};

/// A chat-style language model: one system prompt, one user prompt, free-form text back.
pub trait ChatClient {
    fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// API credential. `Debug` never prints the secret.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    #[cfg(test)]
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    pub fn from_env(var: &str) -> Result<Self> {
        match env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(ApiKey(key)),
            _ => Err(Error::MissingCredential(var.to_string())),
        }
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Everything needed to talk to the API, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: ApiKey,
    pub endpoint: Url,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ClientSettings {
    pub fn new(config: &TranslationConfig, api_key: ApiKey) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| Error::Config(format!("translation.endpoint: {e}")))?;
        Ok(ClientSettings {
            api_key,
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Read the key from the variable named in the config.
    pub fn from_env(config: &TranslationConfig) -> Result<Self> {
        ClientSettings::new(config, ApiKey::from_env(&config.api_key_env)?)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for OpenAI-compatible chat completion endpoints.
pub struct OpenAiClient {
    agent: ureq::Agent,
    settings: ClientSettings,
}

impl OpenAiClient {
    pub fn new(settings: ClientSettings) -> Self {
        let cfg = ureq::Agent::config_builder()
            .timeout_connect(Some(Duration::from_secs(10)))
            .timeout_global(Some(settings.timeout))
            .build();
        OpenAiClient {
            agent: ureq::Agent::new_with_config(cfg),
            settings,
        }
    }

    fn request_body(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        serde_json::to_string(&request).map_err(|e| Error::Api(format!("encoding request: {e}")))
    }
}

impl ChatClient for OpenAiClient {
    fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = self.request_body(system, user)?;
        let raw = self
            .agent
            .post(self.settings.endpoint.as_str())
            .header(
                "Authorization",
                &format!("Bearer {}", self.settings.api_key.expose()),
            )
            .header("Content-Type", "application/json")
            .send(body)?
            .into_body()
            .read_to_string()?;
        parse_completion(&raw)
    }
}

/// Pull the first choice's text out of a chat completion response.
fn parse_completion(raw: &str) -> Result<String> {
    let response: ChatResponse =
        serde_json::from_str(raw).map_err(|e| Error::Api(format!("unexpected response: {e}")))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| Error::Api("response contained no message".into()))
}
