// City-by-city scrape loop
use crate::browser::{scroll_until_settled, Browser};
use crate::config::AppConfig;
use crate::model::{CityOutcome, StorageError};
use crate::normalizer::normalize_city;
use crate::parser::Parser;
use crate::storage::{CsvStore, ResumeState};
use std::collections::HashSet;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Counters logged at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub resumed: usize,
    pub duplicates: usize,
    pub succeeded: usize,
    pub no_results: usize,
    pub no_complete_records: usize,
    pub failed: usize,
    pub rows_written: usize,
}

pub struct Runner<'a, B: Browser, P: Parser> {
    browser: &'a B,
    parser: &'a P,
    config: &'a AppConfig,
    resume: ResumeState,
    seen_records: HashSet<String>,
    summary: RunSummary,
}

impl<'a, B: Browser, P: Parser> Runner<'a, B, P> {
    pub fn new(browser: &'a B, parser: &'a P, config: &'a AppConfig, resume: ResumeState) -> Self {
        let seen_records = if config.dedupe_records {
            resume.records.clone()
        } else {
            HashSet::new()
        };
        Self {
            browser,
            parser,
            config,
            resume,
            seen_records,
            summary: RunSummary::default(),
        }
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Walks the city list from the configured offset. Only storage failures abort the run.
    pub async fn run(&mut self, cities: &[String], store: &mut CsvStore) -> Result<(), StorageError> {
        let start = self.config.start_offset;
        match cities.get(start) {
            Some(first) => info!("🚀 Starting from city index {} ({})", start, first),
            None => {
                warn!("⚠️ Start index {} is past the end of {} cities, nothing to do", start, cities.len());
                return Ok(());
            }
        }

        let mut attempted = HashSet::new();
        for city in &cities[start..] {
            let normalized = normalize_city(city);

            if self.resume.contains_city(&normalized) {
                info!("⏭️ Skipping {} (already done)", city);
                self.summary.resumed += 1;
                continue;
            }
            if !attempted.insert(normalized) {
                info!("⏭️ Skipping {} (already attempted this run)", city);
                self.summary.duplicates += 1;
                continue;
            }

            self.summary.attempted += 1;
            match self.scrape_city(city, store).await? {
                CityOutcome::Saved(count) => {
                    self.summary.succeeded += 1;
                    self.summary.rows_written += count;
                }
                CityOutcome::NoResults => self.summary.no_results += 1,
                CityOutcome::NoCompleteRecords => self.summary.no_complete_records += 1,
                CityOutcome::Failed(reason) => {
                    debug!("{} counted as failed: {}", city, reason);
                    self.summary.failed += 1;
                }
            }
        }

        Ok(())
    }

    /// Searches one city and writes its complete listings.
    pub async fn scrape_city(&mut self, city: &str, store: &mut CsvStore) -> Result<CityOutcome, StorageError> {
        info!("🔍 Searching for: {}", city);
        let timing = &self.config.timing;
        let selectors = &self.config.selectors;

        if let Err(e) = self.browser.navigate(&self.config.site_url).await {
            warn!("❌ Failed to open search page for {}: {}", city, e);
            return Ok(CityOutcome::Failed(e.to_string()));
        }

        let search = async {
            self.browser
                .wait_for(&selectors.search_input, timing.element_timeout())
                .await?;
            self.browser.send_keys(&selectors.search_input, city).await?;
            self.browser.press_key("Enter").await
        };
        if let Err(e) = search.await {
            warn!("❌ Failed search for {}: {}", city, e);
            return Ok(CityOutcome::Failed(e.to_string()));
        }
        sleep(timing.settle()).await;

        if let Err(e) = scroll_until_settled(self.browser, timing).await {
            warn!("❌ Results for {} did not finish loading: {}", city, e);
            return Ok(CityOutcome::Failed(e.to_string()));
        }

        if self
            .browser
            .wait_for(&selectors.card, timing.element_timeout())
            .await
            .is_err()
        {
            warn!("⚠️ No results for {}", city);
            return Ok(CityOutcome::NoResults);
        }

        let html = match self.browser.page_source().await {
            Ok(html) => html,
            Err(e) => {
                warn!("❌ Could not read results for {}: {}", city, e);
                return Ok(CityOutcome::Failed(e.to_string()));
            }
        };

        let mut count = 0;
        for (idx, record) in self.parser.parse(&html).into_iter().enumerate() {
            if !record.is_complete() {
                info!("⏭️ Skipping incomplete row: {:?}", record.as_row());
                continue;
            }
            if self.config.dedupe_records && !self.seen_records.insert(record.dedupe_key()) {
                info!("⏭️ Skipping row already in output: {:?}", record.as_row());
                continue;
            }

            store.append(&record)?;
            count += 1;
            info!("{}. {:?}", idx + 1, record.as_row());
        }

        if count > 0 {
            info!("✅ Saved {} records for {}", count, city);
            Ok(CityOutcome::Saved(count))
        } else {
            warn!("⚠️ No complete records found for {}", city);
            Ok(CityOutcome::NoCompleteRecords)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SelectorMap, TimingConfig};
    use crate::model::BrowserError;
    use crate::parser::CardParser;
    use crate::storage::{load_resume_state, prior_progress};
    use async_trait::async_trait;
    use scraper::{Html, Selector};
    use serde_json::Value;
    use std::collections::{HashMap, HashSet};
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    const HOME_PAGE: &str = r#"<html><body><input id="ctl00_txtsearch"></body></html>"#;
    const EMPTY_RESULTS: &str = r#"<html><body><p>No facilities found</p></body></html>"#;

    /// Serves canned result pages keyed by the typed search term.
    #[derive(Default)]
    struct FakeSite {
        results: HashMap<String, String>,
        home: Option<&'static str>,
        /// Search terms whose result page keeps growing on every scroll.
        growing: HashSet<String>,
        height: Mutex<u64>,
        current: Mutex<String>,
        typed: Mutex<String>,
        searches: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn new() -> Self {
            Self {
                home: Some(HOME_PAGE),
                ..Self::default()
            }
        }

        fn with_results(mut self, term: &str, html: String) -> Self {
            self.results.insert(term.to_string(), html);
            self
        }

        fn growing_for(mut self, term: &str) -> Self {
            self.growing.insert(term.to_string());
            self
        }

        fn searches(&self) -> Vec<String> {
            self.searches.lock().unwrap().clone()
        }
    }

    fn has_match(html: &str, selector: &str) -> bool {
        let selector = Selector::parse(selector).unwrap();
        Html::parse_document(html).select(&selector).next().is_some()
    }

    #[async_trait]
    impl Browser for FakeSite {
        async fn navigate(&self, _url: &str) -> Result<(), BrowserError> {
            *self.current.lock().unwrap() = self.home.unwrap_or(EMPTY_RESULTS).to_string();
            Ok(())
        }

        async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
            let current = self.current.lock().unwrap().clone();
            if has_match(&current, selector) {
                Ok(())
            } else {
                Err(BrowserError::ElementNotFound {
                    selector: selector.to_string(),
                    timeout,
                })
            }
        }

        async fn send_keys(&self, _selector: &str, text: &str) -> Result<(), BrowserError> {
            *self.typed.lock().unwrap() = text.to_string();
            Ok(())
        }

        async fn press_key(&self, _key: &str) -> Result<(), BrowserError> {
            let term = self.typed.lock().unwrap().clone();
            let page = self.results.get(&term).cloned().unwrap_or_else(|| EMPTY_RESULTS.to_string());
            *self.current.lock().unwrap() = page;
            self.searches.lock().unwrap().push(term);
            Ok(())
        }

        async fn run_script(&self, _script: &str) -> Result<Value, BrowserError> {
            if !self.growing.contains(&*self.typed.lock().unwrap()) {
                return Ok(Value::from(1200));
            }
            let mut height = self.height.lock().unwrap();
            *height += 400;
            Ok(Value::from(*height))
        }

        async fn page_source(&self) -> Result<String, BrowserError> {
            Ok(self.current.lock().unwrap().clone())
        }
    }

    fn card(title: &str, street: &str, city: &str, zipcode: &str, phone: &str) -> String {
        format!(
            r#"<div class="fleamarketrow shadow border">
                 <div class="row mb-3">{title}</div>
                 <span id="r_ADDRESS1">{street}</span>
                 <span id="r_CITY">{city}</span>
                 <span id="r_STATE">TX</span>
                 <span id="r_Label3">{zipcode}</span>
                 <span id="r_MERCHANDISE">{phone}</span>
               </div>"#
        )
    }

    fn page(cards: &[String]) -> String {
        format!("<html><body>{}</body></html>", cards.join("\n"))
    }

    fn test_config(output: &Path) -> AppConfig {
        AppConfig {
            output_path: output.to_path_buf(),
            timing: TimingConfig {
                settle_ms: 0,
                scroll_interval_ms: 0,
                ..TimingConfig::default()
            },
            selectors: SelectorMap::default(),
            ..AppConfig::default()
        }
    }

    fn dallas_site() -> FakeSite {
        FakeSite::new().with_results(
            "Dallas, TX",
            page(&[
                card("Big D Storage", "1 Elm St", "Dallas, TX", "75201", "(214) 555-0100"),
                card("", "2 Elm St", "Dallas, TX", "75202", ""),
                card("Trinity Units", "3 Elm St", "Dallas, TX", "75203", ""),
            ]),
        )
    }

    fn cities(names: &[&str]) -> Vec<String> {
        names.iter().map(|c| c.to_string()).collect()
    }

    fn data_rows(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip(1)
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn resumed_cities_are_skipped_by_normalized_name() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        fs::write(
            &output,
            "title,street,city,state,zipcode,phone,email\nOld Storage,9 Oak St,\"austin, tx\",TX,78701,,\n",
        )
        .unwrap();

        let site = dallas_site();
        let config = test_config(&output);
        let parser = CardParser::new(&config.selectors).unwrap();
        let mut store = CsvStore::open(&output).unwrap();

        let mut runner = Runner::new(&site, &parser, &config, load_resume_state(&output));
        runner
            .run(&cities(&["Austin, TX", "austin, tx ", "Dallas, TX"]), &mut store)
            .await
            .unwrap();
        store.close().unwrap();

        assert_eq!(site.searches(), vec!["Dallas, TX"]);
        assert_eq!(runner.summary().resumed, 2);
        assert_eq!(runner.summary().attempted, 1);
        assert_eq!(
            data_rows(&output),
            vec![
                "Old Storage,9 Oak St,\"austin, tx\",TX,78701,,",
                "Big D Storage,1 Elm St,\"Dallas, TX\",TX,75201,2145550100,",
                "Trinity Units,3 Elm St,\"Dallas, TX\",TX,75203,,",
            ]
        );
    }

    #[tokio::test]
    async fn second_run_adds_no_duplicate_rows() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        let site = dallas_site();
        let config = test_config(&output);
        let parser = CardParser::new(&config.selectors).unwrap();
        let input = cities(&["Dallas, TX"]);

        for _ in 0..2 {
            let mut store = CsvStore::open(&output).unwrap();
            let mut runner = Runner::new(&site, &parser, &config, load_resume_state(&output));
            runner.run(&input, &mut store).await.unwrap();
            store.close().unwrap();
        }

        assert_eq!(data_rows(&output).len(), 2);
        assert_eq!(site.searches(), vec!["Dallas, TX"]);
    }

    #[tokio::test]
    async fn dedupe_holds_with_resume_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        fs::write(
            &output,
            "title,street,city,state,zipcode,phone,email\nBig D Storage,1 Elm St,\"Dallas, TX\",TX,75201,2145550100,\n",
        )
        .unwrap();

        let site = dallas_site();
        let config = AppConfig {
            resume: false,
            ..test_config(&output)
        };
        let parser = CardParser::new(&config.selectors).unwrap();
        let resume = prior_progress(&output, config.resume, config.dedupe_records);
        let mut store = CsvStore::open(&output).unwrap();

        let mut runner = Runner::new(&site, &parser, &config, resume);
        runner.run(&cities(&["Dallas, TX"]), &mut store).await.unwrap();
        store.close().unwrap();

        assert_eq!(site.searches(), vec!["Dallas, TX"]);
        assert_eq!(runner.summary().rows_written, 1);
        assert_eq!(
            data_rows(&output),
            vec![
                "Big D Storage,1 Elm St,\"Dallas, TX\",TX,75201,2145550100,",
                "Trinity Units,3 Elm St,\"Dallas, TX\",TX,75203,,",
            ]
        );
    }

    #[tokio::test]
    async fn endless_results_page_fails_city_and_loop_continues() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        let site = dallas_site()
            .with_results("Austin", page(&[card("Lone Star", "1 Congress Ave", "Austin", "78701", "")]))
            .growing_for("Austin");
        let base = test_config(&output);
        let config = AppConfig {
            timing: TimingConfig {
                scroll_interval_ms: 20,
                scroll_budget_ms: 50,
                max_scroll_rounds: 1000,
                ..base.timing.clone()
            },
            ..base
        };
        let parser = CardParser::new(&config.selectors).unwrap();
        let mut store = CsvStore::open(&output).unwrap();

        let mut runner = Runner::new(&site, &parser, &config, ResumeState::default());
        runner.run(&cities(&["Austin", "Dallas, TX"]), &mut store).await.unwrap();
        store.close().unwrap();

        assert_eq!(site.searches(), vec!["Austin", "Dallas, TX"]);
        assert_eq!(runner.summary().failed, 1);
        assert_eq!(runner.summary().succeeded, 1);
        assert_eq!(data_rows(&output).len(), 2);
    }

    #[tokio::test]
    async fn interrupted_city_is_completed_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        // A previous run wrote the first Dallas card before dying; cards carry a city
        // spelling the resume set does not match, so the city is searched again.
        fs::write(
            &output,
            "title,street,city,state,zipcode,phone,email\nBig D Storage,1 Elm St,Dallas,TX,75201,2145550100,\n",
        )
        .unwrap();
        let site = FakeSite::new().with_results(
            "Dallas, TX",
            page(&[
                card("Big D Storage", "1 Elm St", "Dallas", "75201", "(214) 555-0100"),
                card("Trinity Units", "3 Elm St", "Dallas", "75203", ""),
            ]),
        );
        let config = test_config(&output);
        let parser = CardParser::new(&config.selectors).unwrap();
        let mut store = CsvStore::open(&output).unwrap();

        let mut runner = Runner::new(&site, &parser, &config, load_resume_state(&output));
        let outcome = runner.scrape_city("Dallas, TX", &mut store).await.unwrap();
        store.close().unwrap();

        assert_eq!(outcome, CityOutcome::Saved(1));
        assert_eq!(data_rows(&output).len(), 2);
    }

    #[tokio::test]
    async fn city_without_cards_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        let site = FakeSite::new();
        let config = test_config(&output);
        let parser = CardParser::new(&config.selectors).unwrap();
        let mut store = CsvStore::open(&output).unwrap();

        let mut runner = Runner::new(&site, &parser, &config, ResumeState::default());
        let outcome = runner.scrape_city("Nowhere, TX", &mut store).await.unwrap();
        store.close().unwrap();

        assert_eq!(outcome, CityOutcome::NoResults);
        assert!(!outcome.is_success());
        assert!(data_rows(&output).is_empty());
    }

    #[tokio::test]
    async fn missing_search_box_fails_city_and_loop_continues() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        let site = FakeSite {
            home: None,
            ..FakeSite::new()
        };
        let config = test_config(&output);
        let parser = CardParser::new(&config.selectors).unwrap();
        let mut store = CsvStore::open(&output).unwrap();

        let mut runner = Runner::new(&site, &parser, &config, ResumeState::default());
        runner.run(&cities(&["Austin", "Dallas"]), &mut store).await.unwrap();

        assert_eq!(runner.summary().attempted, 2);
        assert_eq!(runner.summary().failed, 2);
        assert!(site.searches().is_empty());
    }

    #[tokio::test]
    async fn only_complete_cards_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        let site = FakeSite::new().with_results(
            "Waco",
            page(&[card("Half Listing", "", "Waco", "76701", "")]),
        );
        let config = test_config(&output);
        let parser = CardParser::new(&config.selectors).unwrap();
        let mut store = CsvStore::open(&output).unwrap();

        let mut runner = Runner::new(&site, &parser, &config, ResumeState::default());
        let outcome = runner.scrape_city("Waco", &mut store).await.unwrap();

        assert_eq!(outcome, CityOutcome::NoCompleteRecords);
        assert_eq!(store.written(), 0);
    }

    #[tokio::test]
    async fn empty_and_incomplete_cities_are_counted_apart() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        let site = FakeSite::new().with_results(
            "Waco",
            page(&[card("Half Listing", "", "Waco", "76701", "")]),
        );
        let config = test_config(&output);
        let parser = CardParser::new(&config.selectors).unwrap();
        let mut store = CsvStore::open(&output).unwrap();

        let mut runner = Runner::new(&site, &parser, &config, ResumeState::default());
        runner.run(&cities(&["Waco", "Nowhere"]), &mut store).await.unwrap();

        assert_eq!(
            runner.summary(),
            &RunSummary {
                attempted: 2,
                no_results: 1,
                no_complete_records: 1,
                ..RunSummary::default()
            }
        );
    }

    #[tokio::test]
    async fn start_offset_and_repeated_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        let site = dallas_site();
        let config = AppConfig {
            start_offset: 1,
            ..test_config(&output)
        };
        let parser = CardParser::new(&config.selectors).unwrap();
        let mut store = CsvStore::open(&output).unwrap();

        let mut runner = Runner::new(&site, &parser, &config, ResumeState::default());
        runner
            .run(&cities(&["Austin, TX", "Dallas, TX", "DALLAS, tx"]), &mut store)
            .await
            .unwrap();

        assert_eq!(site.searches(), vec!["Dallas, TX"]);
        assert_eq!(
            runner.summary(),
            &RunSummary {
                attempted: 1,
                duplicates: 1,
                succeeded: 1,
                rows_written: 2,
                ..RunSummary::default()
            }
        );
    }

    #[tokio::test]
    async fn offset_past_end_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        let site = dallas_site();
        let config = AppConfig {
            start_offset: 5,
            ..test_config(&output)
        };
        let parser = CardParser::new(&config.selectors).unwrap();
        let mut store = CsvStore::open(&output).unwrap();

        let mut runner = Runner::new(&site, &parser, &config, ResumeState::default());
        runner.run(&cities(&["Dallas, TX"]), &mut store).await.unwrap();

        assert!(site.searches().is_empty());
        assert_eq!(runner.summary(), &RunSummary::default());
    }
}
