use crate::phrase::LocalGenerator;
use anyhow::{anyhow, Result};
use log::warn;
use serde_json::{json, Value};

pub const DEFAULT_RESPONSES_ENDPOINT: &str = "https://api.openai.com/v1/responses";
pub const CHAT_COMPLETIONS_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const MAX_OUTPUT_TOKENS: u32 = 100;
const TEMPERATURE: f64 = 0.7;

/// One strategy for producing the next target sentence. Strategies are
/// tried in order by [`PromptSupplier`]; a failure only means "try the
/// next one".
pub trait PromptSource {
    fn label(&self) -> &'static str;
    fn fetch(&self) -> Result<String>;
}

/// "responses"-style generation endpoint. The payload is treated as opaque
/// JSON and the generated text probed at the known nesting variants; any
/// shape mismatch is a fetch failure.
pub struct ResponsesSource {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub instruction: String,
    pub theme_hint: String,
}

impl PromptSource for ResponsesSource {
    fn label(&self) -> &'static str {
        "responses api"
    }

    fn fetch(&self) -> Result<String> {
        let body = json!({
            "model": self.model,
            "input": [
                { "role": "system", "content": self.instruction },
                { "role": "user", "content": self.theme_hint },
            ],
            "max_output_tokens": MAX_OUTPUT_TOKENS,
        });

        let payload: Value = ureq::post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body)?
            .into_json()?;

        let text = extract_responses_text(&payload)
            .ok_or_else(|| anyhow!("unrecognized responses payload shape"))?;
        sanitize_one_line(text).ok_or_else(|| anyhow!("responses payload held no sentence"))
    }
}

/// Legacy "chat completions" endpoint, tried when the responses call fails.
/// Its location is fixed; only the responses endpoint is configurable.
pub struct ChatCompletionsSource {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub instruction: String,
    pub theme_hint: String,
}

impl PromptSource for ChatCompletionsSource {
    fn label(&self) -> &'static str {
        "chat completions api"
    }

    fn fetch(&self) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.instruction },
                { "role": "user", "content": self.theme_hint },
            ],
            "max_tokens": MAX_OUTPUT_TOKENS,
            "temperature": TEMPERATURE,
        });

        let payload: Value = ureq::post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body)?
            .into_json()?;

        let text = extract_chat_text(&payload)
            .ok_or_else(|| anyhow!("unrecognized chat payload shape"))?;
        sanitize_one_line(text).ok_or_else(|| anyhow!("chat payload held no sentence"))
    }
}

/// Generated text has shown up at several spots across server versions;
/// probe them in order.
fn extract_responses_text(payload: &Value) -> Option<&str> {
    payload
        .pointer("/output/0/content/0/text")
        .and_then(Value::as_str)
        .or_else(|| payload.get("output_text").and_then(Value::as_str))
        .or_else(|| {
            payload
                .pointer("/response/output_text")
                .and_then(Value::as_str)
        })
}

fn extract_chat_text(payload: &Value) -> Option<&str> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
}

const LEADING_QUOTES: &[char] = &['"', '“', '”', '\'', '『', '「'];
const TRAILING_QUOTES: &[char] = &['"', '“', '”', '\'', '』', '」'];

/// Reduce a remote completion to one clean sentence: first non-empty line,
/// trimmed, one surrounding quote character stripped per side, control
/// characters removed. None when nothing survives.
pub fn sanitize_one_line(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line: String = line.chars().filter(|c| !c.is_control()).collect();

    let mut s = line.as_str();
    if let Some(c) = s.chars().next() {
        if LEADING_QUOTES.contains(&c) {
            s = &s[c.len_utf8()..];
        }
    }
    if let Some(c) = s.chars().last() {
        if TRAILING_QUOTES.contains(&c) {
            s = &s[..s.len() - c.len_utf8()];
        }
    }

    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Ordered fallback chain over prompt sources. The local generator sits at
/// the end and cannot fail, so resolving a prompt never fails either:
/// remote errors are logged and swallowed.
pub struct PromptSupplier {
    remotes: Vec<Box<dyn PromptSource>>,
    local: LocalGenerator,
}

impl PromptSupplier {
    pub fn local_only(local: LocalGenerator) -> Self {
        Self {
            remotes: Vec::new(),
            local,
        }
    }

    pub fn with_remotes(remotes: Vec<Box<dyn PromptSource>>, local: LocalGenerator) -> Self {
        Self { remotes, local }
    }

    pub fn is_remote(&self) -> bool {
        !self.remotes.is_empty()
    }

    pub fn next_prompt(&self) -> String {
        for source in &self.remotes {
            match source.fetch() {
                Ok(sentence) => return sentence,
                Err(err) => warn!("{} failed, falling back: {err:#}", source.label()),
            }
        }
        self.local.sentence()
    }
}

/// Build the chain for one request. Remote sources are only included when
/// remote mode is on and a credential is present; otherwise the chain is
/// local-only and no network access is ever attempted.
pub fn build_supplier(
    use_remote: bool,
    api_key: Option<&str>,
    endpoint: &str,
    model: &str,
    local: LocalGenerator,
) -> PromptSupplier {
    let key = match api_key {
        Some(k) if use_remote && !k.is_empty() => k,
        _ => return PromptSupplier::local_only(local),
    };

    let set = local.set();
    let remotes: Vec<Box<dyn PromptSource>> = vec![
        Box::new(ResponsesSource {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: key.to_string(),
            instruction: set.instruction.clone(),
            theme_hint: set.theme_hint.clone(),
        }),
        Box::new(ChatCompletionsSource {
            endpoint: CHAT_COMPLETIONS_ENDPOINT.to_string(),
            model: model.to_string(),
            api_key: key.to_string(),
            instruction: set.instruction.clone(),
            theme_hint: set.theme_hint.clone(),
        }),
    ];
    PromptSupplier::with_remotes(remotes, local)
}
