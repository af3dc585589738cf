//! Summarization collaborator.
//!
//! A summarizer looks at one or more images together with a prompt and
//! returns prose. Calls may fail for many reasons (model not pulled, server
//! down, timeouts); callers go through [`summarize_or_degrade`], which turns
//! a failure into a [`SummaryOutcome::Failed`] instead of aborting the run.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Outcome of one summarization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Ok(String),
    Failed(String),
}

impl SummaryOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, SummaryOutcome::Ok(_))
    }

    /// Text to place in a result entry; failures become an error marker.
    pub fn into_content(self) -> String {
        match self {
            SummaryOutcome::Ok(text) => text,
            SummaryOutcome::Failed(reason) => format!("[summary failed: {}]", reason),
        }
    }
}

/// Describes images given a prompt.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, images: &[PathBuf], prompt: &str) -> Result<String>;
}

/// Call `summarizer` and convert any error into [`SummaryOutcome::Failed`].
pub fn summarize_or_degrade(
    summarizer: &dyn Summarizer,
    images: &[PathBuf],
    prompt: &str,
) -> SummaryOutcome {
    match summarizer.summarize(images, prompt) {
        Ok(text) => SummaryOutcome::Ok(text.trim().to_string()),
        Err(e) => {
            log::warn!("Summary over {} image(s) failed: {}", images.len(), e);
            SummaryOutcome::Failed(e.to_string())
        }
    }
}

/// Summarizer that always fails; used when no model is configured.
#[derive(Debug, Clone, Default)]
pub struct DisabledSummarizer;

impl Summarizer for DisabledSummarizer {
    fn summarize(&self, _images: &[PathBuf], _prompt: &str) -> Result<String> {
        Err(Error::Summarize("summarization is disabled".to_string()))
    }
}

#[cfg(feature = "ollama")]
pub use ollama::OllamaSummarizer;

#[cfg(feature = "ollama")]
mod ollama {
    use std::path::PathBuf;
    use std::time::Duration;

    use base64::Engine;
    use serde::{Deserialize, Serialize};

    use super::Summarizer;
    use crate::error::{Error, Result};
    use crate::extract::SYSTEM_PROMPT;

    /// Summarizer backed by an Ollama server's `/api/chat` endpoint.
    #[derive(Debug, Clone)]
    pub struct OllamaSummarizer {
        host: String,
        model: String,
        system_prompt: String,
        client: reqwest::blocking::Client,
    }

    #[derive(Serialize)]
    struct ChatRequest<'a> {
        model: &'a str,
        messages: Vec<ChatMessage>,
        stream: bool,
    }

    #[derive(Serialize)]
    struct ChatMessage {
        role: &'static str,
        content: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        images: Vec<String>,
    }

    #[derive(Deserialize)]
    struct ChatResponse {
        message: ResponseMessage,
    }

    #[derive(Deserialize)]
    struct ResponseMessage {
        content: String,
    }

    impl OllamaSummarizer {
        pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

        pub fn new(host: impl Into<String>, model: impl Into<String>) -> Result<Self> {
            Self::with_timeout(host, model, Self::DEFAULT_TIMEOUT)
        }

        pub fn with_timeout(
            host: impl Into<String>,
            model: impl Into<String>,
            timeout: Duration,
        ) -> Result<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
            Ok(Self {
                host: host.into().trim_end_matches('/').to_string(),
                model: model.into(),
                system_prompt: SYSTEM_PROMPT.to_string(),
                client,
            })
        }

        pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
            self.system_prompt = prompt.into();
            self
        }

        pub fn model(&self) -> &str {
            &self.model
        }
    }

    impl Summarizer for OllamaSummarizer {
        fn summarize(&self, images: &[PathBuf], prompt: &str) -> Result<String> {
            let encoded = images
                .iter()
                .map(|path| {
                    std::fs::read(path)
                        .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
                })
                .collect::<std::io::Result<Vec<_>>>()?;

            let request = ChatRequest {
                model: &self.model,
                stream: false,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: self.system_prompt.clone(),
                        images: Vec::new(),
                    },
                    ChatMessage {
                        role: "user",
                        content: prompt.to_string(),
                        images: encoded,
                    },
                ],
            };

            log::debug!(
                "POST {}/api/chat model={} images={}",
                self.host,
                self.model,
                images.len()
            );
            let response: ChatResponse = self
                .client
                .post(format!("{}/api/chat", self.host))
                .json(&request)
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.json())
                .map_err(|e| Error::Summarize(e.to_string()))?;

            Ok(response.message.content)
        }
    }
}
