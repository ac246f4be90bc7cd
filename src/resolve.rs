use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::browser::PageSession;
use crate::oracle::SelectorKind;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no element matches {kind} selector {value:?}")]
    NotFound { kind: SelectorKind, value: String },

    #[error("invalid {kind} selector {value:?}: {message}")]
    Syntax {
        kind: SelectorKind,
        value: String,
        message: String,
    },

    #[error("page query failed: {0}")]
    Page(String),
}

/// Non-fatal condition attached to an otherwise successful resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResolveWarning {
    /// The selector matched more than one element; the first in document
    /// order was used.
    AmbiguousMatch { matches: usize },
}

/// Rendered text read from the resolved element. Valid only for the current
/// page load.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub text: String,
    pub warning: Option<ResolveWarning>,
}

/// Resolve a proposed locator against the live page and read the element's
/// rendered text.
///
/// Expects exactly one match. Zero matches fail; multiple matches succeed on
/// the first element but carry an [`ResolveWarning::AmbiguousMatch`] so the
/// caller sees the ambiguity instead of a silent guess.
pub async fn resolve<P: PageSession>(
    page: &P,
    kind: SelectorKind,
    value: &str,
) -> Result<Resolved, ResolveError> {
    let matches = page.query(kind, value).await?;

    let first = match matches.first() {
        Some(el) => el,
        None => {
            return Err(ResolveError::NotFound {
                kind,
                value: value.to_string(),
            })
        }
    };

    let warning = if matches.len() > 1 {
        warn!(
            "{} selector {:?} matched {} elements, using the first",
            kind,
            value,
            matches.len()
        );
        Some(ResolveWarning::AmbiguousMatch {
            matches: matches.len(),
        })
    } else {
        None
    };

    let text = page.text_of(first).await?;
    debug!("Resolved element text: {:?}", text);

    Ok(Resolved { text, warning })
}

// ── Tests ──
