use crate::browser::Browser;
use crate::config::BrowserConfig;
use crate::model::BrowserError;
use headless_chrome::{Browser as ChromeBrowser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A Chrome process with the single tab the scraper drives.
/// Dropping the session kills the browser process, so every exit path releases it.
pub struct ChromeSession {
    _browser: ChromeBrowser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Starts Chrome. `navigation_timeout` bounds every page load on the tab.
    pub fn launch(config: &BrowserConfig, navigation_timeout: Duration) -> Result<Self, BrowserError> {
        let mut args = Vec::new();
        if config.start_maximized {
            args.push(OsStr::new("--start-maximized"));
        }

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(config.window_size)
            .idle_browser_timeout(Duration::from_secs(config.idle_timeout_secs))
            .args(args)
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let browser = ChromeBrowser::new(options).map_err(|e| BrowserError::Launch(e.to_string()))?;
        let tab = browser
            .wait_for_initial_tab()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        tab.set_default_timeout(navigation_timeout);

        info!("🌐 Browser launched (headless: {})", config.headless);
        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    pub fn close(self) {
        if let Err(e) = self.tab.close(true) {
            warn!("Closing tab failed: {}", e);
        }
        info!("🌐 Browser closed");
    }

    /// Runs a blocking tab call off the async runtime.
    async fn on_tab<T, F>(&self, op: F) -> Result<T, BrowserError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T, BrowserError> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || op(&tab)).await?
    }
}

#[async_trait::async_trait]
impl Browser for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let url = url.to_string();
        debug!("Navigating to {}", url);
        self.on_tab(move |tab| {
            match tab.navigate_to(&url).and_then(|tab| tab.wait_until_navigated()) {
                Ok(_) => Ok(()),
                Err(e) => Err(BrowserError::Navigation {
                    url,
                    reason: e.to_string(),
                }),
            }
        })
        .await
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let selector = selector.to_string();
        self.on_tab(move |tab| {
            match tab.wait_for_element_with_custom_timeout(&selector, timeout) {
                Ok(_) => Ok(()),
                Err(e) => {
                    debug!("Waiting for `{}` failed: {}", selector, e);
                    Err(BrowserError::ElementNotFound { selector, timeout })
                }
            }
        })
        .await
    }

    async fn send_keys(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let selector = selector.to_string();
        let text = text.to_string();
        self.on_tab(move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|e| BrowserError::Driver(e.to_string()))?;
            element
                .call_js_fn("function() { this.value = ''; }", vec![], false)
                .map_err(|e| BrowserError::Driver(e.to_string()))?;
            element
                .click()
                .map_err(|e| BrowserError::Driver(e.to_string()))?;
            element
                .type_into(&text)
                .map_err(|e| BrowserError::Driver(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        let key = key.to_string();
        self.on_tab(move |tab| {
            tab.press_key(&key)
                .map(|_| ())
                .map_err(|e| BrowserError::Driver(e.to_string()))
        })
        .await
    }

    async fn run_script(&self, script: &str) -> Result<Value, BrowserError> {
        let script = script.to_string();
        self.on_tab(move |tab| {
            tab.evaluate(&script, false)
                .map(|result| result.value.unwrap_or(Value::Null))
                .map_err(|e| BrowserError::Script(e.to_string()))
        })
        .await
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        self.on_tab(|tab| {
            tab.get_content()
                .map_err(|e| BrowserError::Driver(e.to_string()))
        })
        .await
    }
}
