//! AI topic-expansion collaborator: provider abstraction + factory.
//!
//! Contract: prompt in, at most [`MAX_TOPICS`] short phrases out, and the
//! call can never fail the caller. Provider errors, malformed output, and a
//! missing key all degrade to an empty expansion.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const MAX_TOPICS: usize = 5;

/// Profile-derived seed the expansion prompt is built from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TopicSeed {
    pub categories: Vec<String>,
    pub keywords: Vec<String>,
    pub interests: Vec<String>,
}

/// Trait object used by the recommender (and tests).
pub trait TopicExpander: Send + Sync {
    /// Expand the seed into at most [`MAX_TOPICS`] related-topic phrases.
    fn expand<'a>(
        &'a self,
        seed: &'a TopicSeed,
    ) -> Pin<Box<dyn Future<Output = Vec<String>> + Send + 'a>>;

    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type SharedExpander = Arc<dyn TopicExpander>;

/// Factory: mock under `AI_TEST_MODE=mock`, OpenAI when a key is present,
/// disabled otherwise.
pub fn build_expander(timeout: Duration) -> SharedExpander {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockExpander {
            fixed: vec!["mock topic".to_string()],
        });
    }

    let provider = OpenAiExpander::from_env(timeout);
    if provider.configured() {
        Arc::new(provider)
    } else {
        Arc::new(DisabledExpander)
    }
}

// ------------------------------------------------------------
// Providers
// ------------------------------------------------------------

/// OpenAI provider (Chat Completions API). Requires `OPENAI_API_KEY`.
pub struct OpenAiExpander {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiExpander {
    pub fn from_env(timeout: Duration) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("newscast-engine/0.1 (+https://github.com/newscast/newscast-engine)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        let model = std::env::var("OPENAI_TOPIC_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Self {
            http,
            api_key,
            model,
        }
    }

    pub fn configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn expand_impl(&self, seed: &TopicSeed) -> Vec<String> {
        if self.api_key.is_empty() {
            return Vec::new();
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let sys = "You suggest related news topics. Return ONLY a JSON array of at most 5 short topic phrases (2-4 words each), ASCII, no commentary.";
        let user = format!(
            "Listener signal. Categories: {}. Title keywords: {}. Declared interests: {}.",
            seed.categories.join(", "),
            seed.keywords.join(", "),
            seed.interests.join(", ")
        );
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: sys,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.3,
            max_tokens: 120,
        };

        let resp = match self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(status = %r.status(), "topic expansion got error status");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = ?e, "topic expansion request failed");
                return Vec::new();
            }
        };

        let body: Resp = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = ?e, "topic expansion body unreadable");
                return Vec::new();
            }
        };

        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");
        parse_topic_array(content)
    }
}

impl TopicExpander for OpenAiExpander {
    fn expand<'a>(
        &'a self,
        seed: &'a TopicSeed,
    ) -> Pin<Box<dyn Future<Output = Vec<String>> + Send + 'a>> {
        Box::pin(self.expand_impl(seed))
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Returns no topics, always; used when AI is unavailable.
pub struct DisabledExpander;

impl TopicExpander for DisabledExpander {
    fn expand<'a>(
        &'a self,
        _seed: &'a TopicSeed,
    ) -> Pin<Box<dyn Future<Output = Vec<String>> + Send + 'a>> {
        Box::pin(async { Vec::new() })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed-output provider for tests/local runs.
#[derive(Clone)]
pub struct MockExpander {
    pub fixed: Vec<String>,
}

impl TopicExpander for MockExpander {
    fn expand<'a>(
        &'a self,
        _seed: &'a TopicSeed,
    ) -> Pin<Box<dyn Future<Output = Vec<String>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { out })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Output parsing / sanitization
// ------------------------------------------------------------

/// Parse a model reply into topic phrases. Accepts a bare JSON array or an
/// array embedded in surrounding prose; anything else is an empty expansion.
pub fn parse_topic_array(content: &str) -> Vec<String> {
    let candidate = match serde_json::from_str::<Vec<String>>(content.trim()) {
        Ok(v) => v,
        Err(_) => {
            let embedded = content
                .find('[')
                .and_then(|start| content.rfind(']').map(|end| (start, end)))
                .filter(|(start, end)| start < end)
                .map(|(start, end)| &content[start..=end]);
            match embedded.and_then(|s| serde_json::from_str::<Vec<String>>(s).ok()) {
                Some(v) => v,
                None => return Vec::new(),
            }
        }
    };

    candidate
        .into_iter()
        .map(|t| sanitize_topic(&t))
        .filter(|t| !t.is_empty())
        .take(MAX_TOPICS)
        .collect()
}

/// ASCII-only, single line, <=60 chars, collapsed whitespace.
fn sanitize_topic(input: &str) -> String {
    let mut out = String::with_capacity(60);
    let mut prev_space = false;
    for ch in input.chars() {
        let c = match ch {
            '\r' | '\n' | '\t' => ' ',
            c if c.is_ascii() => c,
            _ => ' ',
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.len() >= 60 {
            break;
        }
    }
    out.trim().to_string()
}
