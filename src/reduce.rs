use std::sync::LazyLock;

use scraper::{Html, Selector};
use thiserror::Error;

/// Element categories that carry no visible price-relevant content.
const EXCLUDED_ELEMENTS: &str = "script, style, iframe, img, svg, link, meta, noscript";

static EXCLUDED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(EXCLUDED_ELEMENTS).unwrap());
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("markup could not be parsed into a document: {0}")]
    MalformedInput(String),
}

/// Strip non-semantic elements from raw HTML and return the body's inner HTML.
///
/// Shrinks oracle input size only; attributes and whitespace are left alone.
/// Parsing is best-effort, so malformed markup still reduces to whatever tree
/// the parser recovers. Idempotent: reducing a reduced document is a no-op.
pub fn reduce(html: &str) -> Result<String, ReduceError> {
    let mut document = Html::parse_document(html);

    let excluded: Vec<_> = document.select(&EXCLUDED).map(|el| el.id()).collect();
    for id in excluded {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    let body = document
        .select(&BODY)
        .next()
        .ok_or_else(|| ReduceError::MalformedInput("no body element recovered".into()))?;

    Ok(body.inner_html())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_every_excluded_category() {
        let samples = [
            ("script", "<script>var x = 1;</script>"),
            ("style", "<style>.a { color: red; }</style>"),
            ("iframe", "<iframe src=\"https://ads.example.com\"></iframe>"),
            ("img", "<img src=\"/product.jpg\" alt=\"product\">"),
            ("svg", "<svg><circle r=\"4\"/></svg>"),
            ("link", "<link rel=\"stylesheet\" href=\"/main.css\">"),
            ("meta", "<meta name=\"description\" content=\"x\">"),
            ("noscript", "<noscript>enable js</noscript>"),
        ];
        for (tag, snippet) in samples {
            let html = format!("<html><body><p>keep</p>{snippet}</body></html>");
            let reduced = reduce(&html).unwrap();
            assert!(
                !reduced.contains(&format!("<{tag}")),
                "{tag} survived reduction: {reduced}"
            );
            assert!(reduced.contains("<p>keep</p>"));
        }
    }

    #[test]
    fn removes_nested_excluded_elements() {
        let html = "<body><div><p>price here</p><script>a</script><div><img src=\"x\"></div></div></body>";
        let reduced = reduce(html).unwrap();
        assert!(!reduced.contains("<script"));
        assert!(!reduced.contains("<img"));
        assert!(reduced.contains("price here"));
    }

    #[test]
    fn idempotent() {
        let html = r#"<html><head><meta charset="utf-8"></head>
            <body><script>x</script><span id="price">€19.99</span><img src="p.png"></body></html>"#;
        let once = reduce(html).unwrap();
        let twice = reduce(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn keeps_attributes_untouched() {
        let html = r#"<body><span id="price" class="product-price" data-sku="123">€19.99</span></body>"#;
        let reduced = reduce(html).unwrap();
        assert!(reduced.contains(r#"id="price""#));
        assert!(reduced.contains(r#"class="product-price""#));
        assert!(reduced.contains(r#"data-sku="123""#));
    }

    #[test]
    fn tolerates_malformed_markup() {
        let html = "<div><span>€9.99<script>x</div></span>";
        let reduced = reduce(html).unwrap();
        assert!(reduced.contains("€9.99"));
        assert!(!reduced.contains("<script"));
    }

    #[test]
    fn strips_script_and_keeps_price_span() {
        let html = r#"<html><body><script>x</script><span id="price">€19.99</span></body></html>"#;
        let reduced = reduce(html).unwrap();
        assert!(!reduced.contains("<script"));
        assert!(reduced.contains(r#"<span id="price">€19.99</span>"#));
    }
}
