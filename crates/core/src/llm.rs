use crate::models::Answer;
use crate::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.1;

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const HF_CHAT_URL: &str = "https://router.huggingface.co/v1/chat/completions";
const HF_TEXT_URL_BASE: &str = "https://router.huggingface.co/hf-inference/models";

/// Built-in model fallback lists, iterated in order when no model is
/// configured explicitly.
const GROQ_MODELS: [&str; 2] = ["mixtral-8x7b-32768", "llama2-70b-4096"];
const OPENAI_MODELS: [&str; 2] = ["gpt-4-1106-preview", "gpt-3.5-turbo"];
const HF_CHAT_MODELS: [&str; 2] = [
    "meta-llama/Llama-2-70b-chat-hf",
    "HuggingFaceH4/zephyr-7b-beta",
];
const HF_TEXT_MODELS: [&str; 1] = ["mistralai/Mistral-7B-Instruct-v0.3"];

const SYSTEM_PROMPT: &str = "You are a precise and helpful AI assistant. Answer the question \
based ONLY on the provided context. If the answer is not in the context, say 'I cannot answer \
this based on the provided documents.'";

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One answer backend in the fallback chain. Implementations swallow and log
/// their own failures: a missing key, a refused request, or an empty
/// completion all come back as `None` so the chain moves on.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn try_generate(&self, messages: &[ChatMessage]) -> Option<String>;
}

/// Provider speaking the OpenAI chat-completions wire format; covers both
/// Groq and OpenAI.
pub struct ChatCompletionProvider {
    name: &'static str,
    endpoint: &'static str,
    api_key: Option<String>,
    fallback_models: &'static [&'static str],
    configured_model: Option<String>,
    client: Client,
}

impl ChatCompletionProvider {
    pub fn groq(api_key: Option<String>, configured_model: Option<String>) -> Self {
        Self {
            name: "groq",
            endpoint: GROQ_CHAT_URL,
            api_key,
            fallback_models: &GROQ_MODELS,
            configured_model,
            client: Client::new(),
        }
    }

    pub fn openai(api_key: Option<String>, configured_model: Option<String>) -> Self {
        Self {
            name: "openai",
            endpoint: OPENAI_CHAT_URL,
            api_key,
            fallback_models: &OPENAI_MODELS,
            configured_model,
            client: Client::new(),
        }
    }

    pub(crate) fn candidate_models(&self) -> Vec<String> {
        match &self.configured_model {
            Some(model) => vec![model.clone()],
            None => self
                .fallback_models
                .iter()
                .map(|model| model.to_string())
                .collect(),
        }
    }

    async fn call_model(
        &self,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, SearchError> {
        chat_completion(&self.client, self.endpoint, api_key, model, messages, self.name).await
    }
}

#[async_trait]
impl AnswerProvider for ChatCompletionProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn try_generate(&self, messages: &[ChatMessage]) -> Option<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!(provider = self.name, "api key not configured");
            return None;
        };

        for model in self.candidate_models() {
            match self.call_model(api_key, &model, messages).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(provider = self.name, model = %model, "model produced an answer");
                    return Some(text);
                }
                Ok(_) => warn!(provider = self.name, model = %model, "model returned an empty answer"),
                Err(e) => warn!(provider = self.name, model = %model, error = %e, "model call failed"),
            }
        }
        None
    }
}

/// HuggingFace inference provider. Chat-capable models go through the
/// router's chat-completions endpoint; plain text-generation models get a
/// flattened prompt against the model inference URL.
pub struct HuggingFaceProvider {
    api_key: Option<String>,
    configured_model: Option<String>,
    client: Client,
}

impl HuggingFaceProvider {
    pub fn new(api_key: Option<String>, configured_model: Option<String>) -> Self {
        Self {
            api_key,
            configured_model,
            client: Client::new(),
        }
    }

    pub(crate) fn candidate_models(&self) -> Vec<String> {
        match &self.configured_model {
            Some(model) => vec![model.clone()],
            None => HF_CHAT_MODELS
                .iter()
                .chain(HF_TEXT_MODELS.iter())
                .map(|model| model.to_string())
                .collect(),
        }
    }

    fn is_chat_model(model: &str) -> bool {
        model.contains("chat") || model.contains("zephyr") || model.contains("llama")
    }

    async fn call_text_model(
        &self,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, SearchError> {
        let prompt = messages
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let response = self
            .client
            .post(format!("{HF_TEXT_URL_BASE}/{model}"))
            .bearer_auth(api_key)
            .json(&json!({
                "inputs": prompt,
                "parameters": {
                    "max_new_tokens": MAX_TOKENS,
                    "temperature": TEMPERATURE,
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "hf".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let text = parsed
            .pointer("/0/generated_text")
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::BackendResponse {
                backend: "hf".to_string(),
                details: "response carries no generated_text".to_string(),
            })?;

        Ok(text.to_string())
    }
}

#[async_trait]
impl AnswerProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "hf"
    }

    async fn try_generate(&self, messages: &[ChatMessage]) -> Option<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!(provider = "hf", "api key not configured");
            return None;
        };

        for model in self.candidate_models() {
            let result = if Self::is_chat_model(&model) {
                chat_completion(&self.client, HF_CHAT_URL, api_key, &model, messages, "hf").await
            } else {
                self.call_text_model(api_key, &model, messages).await
            };

            match result {
                Ok(text) if !text.trim().is_empty() => {
                    info!(provider = "hf", model = %model, "model produced an answer");
                    return Some(text);
                }
                Ok(_) => warn!(provider = "hf", model = %model, "model returned an empty answer"),
                Err(e) => warn!(provider = "hf", model = %model, error = %e, "model call failed"),
            }
        }
        None
    }
}

async fn chat_completion(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    model: &str,
    messages: &[ChatMessage],
    backend: &str,
) -> Result<String, SearchError> {
    let response = client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(&json!({
            "model": model,
            "messages": messages,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(SearchError::BackendResponse {
            backend: backend.to_string(),
            details: response.status().to_string(),
        });
    }

    let parsed: Value = response.json().await?;
    let content = parsed
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(content.to_string())
}

/// Ordered provider fallback: the configured default provider is tried
/// first, then the remaining providers keep their declared relative order.
/// The first non-empty answer wins immediately; exhausting the whole chain
/// is a structured `Answer` value, never an error.
pub struct AnswerChain {
    providers: Vec<Box<dyn AnswerProvider>>,
    default_provider: Option<String>,
}

impl AnswerChain {
    pub fn new(providers: Vec<Box<dyn AnswerProvider>>, default_provider: Option<String>) -> Self {
        Self {
            providers,
            default_provider,
        }
    }

    pub fn build_messages(question: &str, context: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("Context:\n{context}\n\nQuestion: {question}")),
        ]
    }

    /// The provider the caller asked for, falling back to the head of the
    /// declared list when nothing (or something unknown) is configured.
    fn default_name(&self) -> Option<&str> {
        if let Some(name) = self.default_provider.as_deref() {
            if self.providers.iter().any(|p| p.name() == name) {
                return Some(name);
            }
            warn!(provider = name, "configured default provider is unknown");
        }
        self.providers.first().map(|p| p.name())
    }

    fn priority_order(&self) -> Vec<&dyn AnswerProvider> {
        let default = self.default_name();
        let mut ordered: Vec<&dyn AnswerProvider> = Vec::with_capacity(self.providers.len());
        if let Some(name) = default {
            if let Some(first) = self.providers.iter().find(|p| p.name() == name) {
                ordered.push(first.as_ref());
            }
        }
        for provider in &self.providers {
            if !ordered.iter().any(|seen| seen.name() == provider.name()) {
                ordered.push(provider.as_ref());
            }
        }
        ordered
    }

    pub async fn generate_answer(&self, question: &str, context: &str) -> Answer {
        let messages = Self::build_messages(question, context);
        let default = self.default_name().map(|name| name.to_string());

        for provider in self.priority_order() {
            let Some(text) = provider.try_generate(&messages).await else {
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }
            return Answer {
                fallback_used: default.as_deref() != Some(provider.name()),
                text: Some(text),
                error: None,
            };
        }

        error!("all answer providers failed");
        Answer {
            text: None,
            error: Some("All providers failed".to_string()),
            fallback_used: true,
        }
    }
}
