use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::browser::{Browser, PageSession, SessionError};
use crate::fetch::{FetchError, RawDocument};
use crate::oracle::{LocatorProposal, Oracle, OracleError, SelectorKind};
use crate::reduce::{self, ReduceError};
use crate::resolve::{self, Resolved, ResolveError, ResolveWarning};

/// Every failure of one invocation, classified into exactly one kind. Raw
/// transport and driver errors are always wrapped, never surfaced bare.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("page fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("markup reduction failed: {0}")]
    Reduce(#[from] ReduceError),

    #[error("locator proposal failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("browser session failed: {0}")]
    Session(#[from] SessionError),

    #[error("locator resolution failed: {0}")]
    Resolve(#[from] ResolveError),
}

/// Verified extraction: the oracle's claim alongside what the live page
/// actually rendered. Whether a mismatch is acceptable is caller policy.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub extracted_price: String,
    pub selector_kind: SelectorKind,
    pub selector_value: String,
    pub rendered_text: String,
    pub warning: Option<ResolveWarning>,
}

impl Extraction {
    /// Does the oracle's claimed price agree with the rendered text?
    pub fn price_matches(&self) -> bool {
        self.extracted_price.trim() == self.rendered_text.trim()
    }

    /// Scraper action plan for downstream configuration: select the verified
    /// locator.
    pub fn actions(&self) -> Vec<ScraperAction> {
        vec![ScraperAction {
            action: "select",
            select_by: self.selector_kind,
            selector: self.selector_value.clone(),
        }]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScraperAction {
    #[serde(rename = "type")]
    pub action: &'static str,
    pub select_by: SelectorKind,
    pub selector: String,
}

/// Run one invocation: reduce → propose → page load → resolve.
///
/// Stages are strictly sequential with no retry; re-invoke the whole pipeline
/// if retries are wanted. The browser session is opened only once a valid
/// proposal exists and is released on every exit path.
pub async fn run<O, B>(
    doc: &RawDocument,
    oracle: &O,
    browser: &B,
) -> Result<Extraction, PipelineError>
where
    O: Oracle + Sync,
    B: Browser + Sync,
{
    info!("Reducing markup for {}", doc.url);
    let reduced = reduce::reduce(&doc.html)?;
    debug!(
        "Reduced markup from {} to {} bytes",
        doc.html.len(),
        reduced.len()
    );

    let proposal = oracle.propose(&reduced).await?;
    info!(
        "Oracle proposed {} selector {:?} for price {:?}",
        proposal.select_by, proposal.selector, proposal.price
    );

    let session = browser.open().await?;
    let outcome = verify(&session, &doc.url, &proposal).await;

    // Released on success and on every failure; a close failure is logged and
    // never masks the verification outcome.
    if let Err(e) = session.close().await {
        warn!("Session close failed: {}", e);
    }

    let resolved = outcome?;
    if let Some(ResolveWarning::AmbiguousMatch { matches }) = resolved.warning {
        info!("Locator matched {} elements; result uses the first", matches);
    }

    Ok(Extraction {
        extracted_price: proposal.price,
        selector_kind: proposal.select_by,
        selector_value: proposal.selector,
        rendered_text: resolved.text,
        warning: resolved.warning,
    })
}

async fn verify<S: PageSession>(
    session: &S,
    url: &str,
    proposal: &LocatorProposal,
) -> Result<Resolved, PipelineError> {
    session.navigate(url).await?;
    let resolved = resolve::resolve(session, proposal.select_by, &proposal.selector).await?;
    Ok(resolved)
}

// ── Tests ──
