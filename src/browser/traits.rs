use crate::model::BrowserError;
use std::time::Duration;

/// The operations the scrape loop needs from a live browser tab.
#[async_trait::async_trait]
pub trait Browser: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Waits until `selector` matches an element, or fails after `timeout`.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Clears the matched input and types `text` into it.
    async fn send_keys(&self, selector: &str, text: &str) -> Result<(), BrowserError>;

    async fn press_key(&self, key: &str) -> Result<(), BrowserError>;

    /// Evaluates a JavaScript expression and returns its value (`Null` when it has none).
    async fn run_script(&self, script: &str) -> Result<serde_json::Value, BrowserError>;

    /// Serialized rendered DOM of the current page.
    async fn page_source(&self) -> Result<String, BrowserError>;
}
