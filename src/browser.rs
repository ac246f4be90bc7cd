use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::oracle::SelectorKind;
use crate::resolve::ResolveError;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Launch flags passed to Chrome for every session.
pub const DEFAULT_CHROME_ARGS: &[&str] = &[
    "--disable-popups",
    "--window-size=1920,1080",
    "--start-maximized",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-extensions",
    "--disable-search-engine-choice-screen",
];

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub webdriver_url: String,
    pub args: Vec<String>,
    pub headless: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            args: DEFAULT_CHROME_ARGS.iter().map(|s| s.to_string()).collect(),
            headless: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to open WebDriver session at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: fantoccini::error::NewSessionError,
    },

    #[error("navigation to {url} failed: {source}")]
    Navigate {
        url: String,
        #[source]
        source: fantoccini::error::CmdError,
    },

    #[error("failed to close browser session: {0}")]
    Close(#[source] fantoccini::error::CmdError),
}

/// One live rendered page, exclusively owned by a single pipeline invocation.
///
/// The capability set the pipeline needs from any browser engine: navigate,
/// the four query primitives (via [`SelectorKind`]), element text, and close.
#[async_trait]
pub trait PageSession: Send {
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// Query the live page, returning all matches in document order.
    async fn query(
        &self,
        kind: SelectorKind,
        value: &str,
    ) -> Result<Vec<Self::Element>, ResolveError>;

    async fn text_of(&self, element: &Self::Element) -> Result<String, ResolveError>;

    async fn close(self) -> Result<(), SessionError>;
}

/// Session factory. One invocation opens exactly one session and must not
/// share it with another invocation.
#[async_trait]
pub trait Browser {
    type Session: PageSession;

    async fn open(&self) -> Result<Self::Session, SessionError>;
}

/// WebDriver-backed session talking to a chromedriver endpoint.
pub struct WebDriverSession {
    client: Client,
}

#[async_trait]
impl Browser for BrowserOptions {
    type Session = WebDriverSession;

    async fn open(&self) -> Result<WebDriverSession, SessionError> {
        let mut args = self.args.clone();
        if self.headless {
            args.push("--headless=new".to_string());
        }

        let mut caps = serde_json::Map::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        info!("Opening WebDriver session at {}", self.webdriver_url);
        let client = ClientBuilder::rustls()
            .capabilities(caps)
            .connect(&self.webdriver_url)
            .await
            .map_err(|source| SessionError::Connect {
                url: self.webdriver_url.clone(),
                source,
            })?;

        Ok(WebDriverSession { client })
    }
}

#[async_trait]
impl PageSession for WebDriverSession {
    type Element = fantoccini::elements::Element;

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        info!("Navigating to {}", url);
        self.client
            .goto(url)
            .await
            .map_err(|source| SessionError::Navigate {
                url: url.to_string(),
                source,
            })
    }

    async fn query(
        &self,
        kind: SelectorKind,
        value: &str,
    ) -> Result<Vec<Self::Element>, ResolveError> {
        debug!("Querying page by {} selector: {}", kind, value);

        // Class queries have no WebDriver primitive of their own; a class name
        // maps onto a css class selector.
        let class_css;
        let locator = match kind {
            SelectorKind::Css => Locator::Css(value),
            SelectorKind::Class => {
                class_css = format!(".{}", value.trim_start_matches('.'));
                Locator::Css(&class_css)
            }
            SelectorKind::Id => Locator::Id(value),
            SelectorKind::XPath => Locator::XPath(value),
        };

        self.client
            .find_all(locator)
            .await
            .map_err(|e| classify_query_error(kind, value, e))
    }

    async fn text_of(&self, element: &Self::Element) -> Result<String, ResolveError> {
        element
            .text()
            .await
            .map_err(|e| ResolveError::Page(e.to_string()))
    }

    async fn close(self) -> Result<(), SessionError> {
        self.client.close().await.map_err(SessionError::Close)
    }
}

fn classify_query_error(
    kind: SelectorKind,
    value: &str,
    e: fantoccini::error::CmdError,
) -> ResolveError {
    let message = e.to_string();
    if message.to_ascii_lowercase().contains("invalid selector") {
        ResolveError::Syntax {
            kind,
            value: value.to_string(),
            message,
        }
    } else {
        ResolveError::Page(message)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_point_at_local_chromedriver() {
        let opts = BrowserOptions::default();
        assert_eq!(opts.webdriver_url, DEFAULT_WEBDRIVER_URL);
        assert!(!opts.headless);
        assert!(opts.args.iter().any(|a| a == "--no-sandbox"));
        // Headless is opt-in; the flag is only added at open().
        assert!(opts.args.iter().all(|a| a != "--headless=new"));
    }
}
