// Core structs: ListingRecord, CityOutcome, error types
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::normalizer::normalize_city;

/// Column order of the output file.
pub const OUTPUT_HEADER: [&str; 7] = ["title", "street", "city", "state", "zipcode", "phone", "email"];

/// One facility listing read from a result card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingRecord {
    pub title: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub phone: String,
    pub email: String,
}

impl ListingRecord {
    /// A record is complete when title, street, city, state and zipcode are all present.
    /// Phone and email may be empty.
    pub fn is_complete(&self) -> bool {
        [&self.title, &self.street, &self.city, &self.state, &self.zipcode]
            .iter()
            .all(|field| !field.is_empty())
    }

    pub fn as_row(&self) -> [&str; 7] {
        [
            self.title.as_str(),
            self.street.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.zipcode.as_str(),
            self.phone.as_str(),
            self.email.as_str(),
        ]
    }

    /// Identity used to avoid writing the same listing twice.
    pub fn dedupe_key(&self) -> String {
        [&self.title, &self.street, &self.city, &self.state, &self.zipcode]
            .iter()
            .map(|field| normalize_city(field))
            .collect::<Vec<_>>()
            .join("\u{1f}")
    }
}

/// What happened to a single city search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CityOutcome {
    Saved(usize),
    NoResults,
    NoCompleteRecords,
    Failed(String),
}

impl CityOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CityOutcome::Saved(n) if *n > 0)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot open input file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed input file: {0}")]
    Csv(#[from] csv::Error),
    #[error("input file {path} has no second column")]
    MissingColumn { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("output file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("output file CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("element `{selector}` not found within {timeout:?}")]
    ElementNotFound { selector: String, timeout: Duration },
    #[error("script failed: {0}")]
    Script(String),
    #[error("unexpected script result: {0}")]
    ScriptResult(String),
    #[error("page still growing after {rounds} scroll rounds")]
    ScrollBudgetExceeded { rounds: u32 },
    #[error("browser call failed: {0}")]
    Driver(String),
    #[error("browser task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("invalid selector for {field} (`{selector}`): {reason}")]
    InvalidSelector {
        field: &'static str,
        selector: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error(transparent)]
    Parser(#[from] ParserError),
}
