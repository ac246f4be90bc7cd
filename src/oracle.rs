use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const INSTRUCTION: &str = "Analyze this HTML and identify the product price. \
    Return the price and also how to select the element containing it with a \
    browser driver. Use the most reliable option for this case: css selector, \
    class, id, or xpath.";

/// How a proposed selector should be resolved against the live page.
///
/// Closed set: the oracle's output schema restricts `select_by` to these four
/// values, and anything else is rejected at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SelectorKind {
    Css,
    Class,
    Id,
    XPath,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported selector kind {0:?}, expected one of: css, class, id, xpath")]
pub struct UnsupportedSelectorKind(pub String);

impl FromStr for SelectorKind {
    type Err = UnsupportedSelectorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "css" => Ok(SelectorKind::Css),
            "class" => Ok(SelectorKind::Class),
            "id" => Ok(SelectorKind::Id),
            "xpath" => Ok(SelectorKind::XPath),
            other => Err(UnsupportedSelectorKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for SelectorKind {
    type Error = UnsupportedSelectorKind;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl SelectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorKind::Css => "css",
            SelectorKind::Class => "class",
            SelectorKind::Id => "id",
            SelectorKind::XPath => "xpath",
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One locator candidate from the oracle: the price it claims to have read,
/// and the selector it believes will find that element again.
///
/// Field names are the oracle wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorProposal {
    pub price: String,
    pub select_by: SelectorKind,
    pub selector: String,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("oracle returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("oracle response violates the proposal schema: {0}")]
    SchemaViolation(String),

    #[error("oracle proposal has an empty {0}")]
    EmptyResult(&'static str),
}

/// The proposal side of the pipeline. The oracle is never trusted to assert
/// ground truth; its output is verified separately by the resolver.
#[async_trait]
pub trait Oracle {
    async fn propose(&self, reduced_html: &str) -> Result<LocatorProposal, OracleError>;
}

/// Chat-completions client for locator proposals.
pub struct OracleClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

impl OracleClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Oracle for OracleClient {
    async fn propose(&self, reduced_html: &str) -> Result<LocatorProposal, OracleError> {
        info!(model = %self.model, "Requesting locator proposal from oracle");

        let resp = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&build_request(&self.model, reduced_html))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let completion: ChatCompletion = serde_json::from_str(&body)
            .map_err(|e| OracleError::SchemaViolation(format!("malformed completion payload: {e}")))?;

        if let Some(usage) = &completion.usage {
            debug!(
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                total_tokens = ?usage.total_tokens,
                "Oracle token usage"
            );
        }

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                OracleError::SchemaViolation("completion carries no message content".into())
            })?;

        parse_proposal(&content)
    }
}

/// Build the single chat-completions request: fixed instruction, reduced HTML
/// as context, and a strict output schema with `select_by` limited to the
/// closed kind set. All three fields are required.
fn build_request(model: &str, reduced_html: &str) -> serde_json::Value {
    json!({
        "model": model,
        "messages": [{
            "role": "user",
            "content": format!("{INSTRUCTION} Here is the HTML: {reduced_html}"),
        }],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": "price_extraction_schema",
                "strict": true,
                "schema": {
                    "type": "object",
                    "properties": {
                        "price": {
                            "description": "The extracted price as a string.",
                            "type": "string",
                        },
                        "select_by": {
                            "description": "The selector type to use to select the element.",
                            "type": "string",
                            "enum": ["css", "class", "id", "xpath"],
                        },
                        "selector": {
                            "description": "How to identify the element containing the price.",
                            "type": "string",
                        },
                    },
                    "required": ["price", "select_by", "selector"],
                    "additionalProperties": false,
                },
            },
        },
    })
}

/// Validate the oracle's message content against the proposal contract.
pub fn parse_proposal(content: &str) -> Result<LocatorProposal, OracleError> {
    let proposal: LocatorProposal =
        serde_json::from_str(content).map_err(|e| OracleError::SchemaViolation(e.to_string()))?;

    if proposal.price.trim().is_empty() {
        return Err(OracleError::EmptyResult("price"));
    }
    if proposal.selector.trim().is_empty() {
        return Err(OracleError::EmptyResult("selector"));
    }
    Ok(proposal)
}

// ── Tests ──
