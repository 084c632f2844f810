use crate::browser::Browser;
use crate::config::TimingConfig;
use crate::model::BrowserError;
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tracing::debug;

const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";
const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Scrolls to the bottom until the page height stops changing, so lazily loaded cards are rendered.
/// Returns the number of scroll rounds. Fails once `max_scroll_rounds` or `scroll_budget` is used up.
pub async fn scroll_until_settled<B: Browser + ?Sized>(
    browser: &B,
    timing: &TimingConfig,
) -> Result<u32, BrowserError> {
    let started = Instant::now();
    let mut last_height = page_height(browser).await?;
    let mut rounds = 0;

    loop {
        if rounds >= timing.max_scroll_rounds || started.elapsed() >= timing.scroll_budget() {
            return Err(BrowserError::ScrollBudgetExceeded { rounds });
        }
        rounds += 1;

        browser.run_script(SCROLL_SCRIPT).await?;
        sleep(timing.scroll_interval()).await;

        let height = page_height(browser).await?;
        debug!("Scroll round {}: height {} -> {}", rounds, last_height, height);
        if height == last_height {
            return Ok(rounds);
        }
        last_height = height;
    }
}

async fn page_height<B: Browser + ?Sized>(browser: &B) -> Result<u64, BrowserError> {
    match browser.run_script(HEIGHT_SCRIPT).await? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f as u64))
            .ok_or_else(|| BrowserError::ScriptResult(n.to_string())),
        other => Err(BrowserError::ScriptResult(other.to_string())),
    }
}
