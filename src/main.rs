mod browser;
mod fetch;
mod oracle;
mod pipeline;
mod reduce;
mod resolve;

use anyhow::Context;
use clap::Parser;
use tracing::warn;

use browser::{BrowserOptions, DEFAULT_WEBDRIVER_URL};
use oracle::OracleClient;

#[derive(Parser)]
#[command(
    name = "price_locator",
    about = "Infer and verify a price-element locator for a product page"
)]
struct Cli {
    /// Product page URL
    url: String,

    /// Model used for locator proposals
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// WebDriver endpoint (chromedriver)
    #[arg(long, default_value = DEFAULT_WEBDRIVER_URL)]
    webdriver: String,

    /// Run the browser headless
    #[arg(long)]
    headless: bool,

    /// Extra Chrome launch flag (repeatable, added to the defaults)
    #[arg(long = "browser-arg")]
    browser_args: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let api_key = std::env::var("OPENAI_API_KEY")
        .context("OPENAI_API_KEY environment variable must be set")?;
    let oracle = OracleClient::new(api_key, cli.model);

    let mut opts = BrowserOptions {
        webdriver_url: cli.webdriver,
        headless: cli.headless,
        ..Default::default()
    };
    opts.args.extend(cli.browser_args);

    let raw = fetch::fetch(&cli.url)
        .await
        .map_err(pipeline::PipelineError::Fetch)?;
    let extraction = pipeline::run(&raw, &oracle, &opts).await?;

    println!("Extracted price: {}", extraction.extracted_price);
    println!("Rendered text:   {}", extraction.rendered_text);
    println!(
        "Locator:         {} {:?}",
        extraction.selector_kind, extraction.selector_value
    );

    if !extraction.price_matches() {
        warn!(
            "Oracle price {:?} does not match rendered text {:?}",
            extraction.extracted_price, extraction.rendered_text
        );
    }

    println!(
        "Scraper actions: {}",
        serde_json::to_string_pretty(&extraction.actions())?
    );

    Ok(())
}
