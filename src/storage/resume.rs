use crate::model::{ListingRecord, StorageError};
use crate::normalizer::normalize_city;
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Progress recovered from a previous run's output file.
#[derive(Debug, Default)]
pub struct ResumeState {
    /// Normalized values of the output's `city` column.
    pub cities: HashSet<String>,
    /// Dedupe keys of every complete row already in the output.
    pub records: HashSet<String>,
}

impl ResumeState {
    pub fn contains_city(&self, normalized: &str) -> bool {
        self.cities.contains(normalized)
    }
}

/// Loads resume state from `path`. Never fails: a missing or unreadable file means no progress.
pub fn load_resume_state(path: &Path) -> ResumeState {
    if !path.exists() {
        info!("No previous output at {}. Starting fresh.", path.display());
        return ResumeState::default();
    }

    match read_state(path) {
        Ok(state) => {
            info!("✅ Found {} cities already scraped", state.cities.len());
            state
        }
        Err(e) => {
            warn!("⚠️ Could not read output file {}: {}", path.display(), e);
            ResumeState::default()
        }
    }
}

/// Prior progress the run starts from. Resumed cities are kept only when `resume` is on,
/// known rows only when `dedupe` is on; the output is read whenever either needs it.
pub fn prior_progress(path: &Path, resume: bool, dedupe: bool) -> ResumeState {
    if !resume && !dedupe {
        info!("Resume and dedupe disabled, output file not consulted");
        return ResumeState::default();
    }

    let mut state = load_resume_state(path);
    if !resume {
        info!("Resume disabled, every city will be searched");
        state.cities.clear();
    }
    if !dedupe {
        state.records.clear();
    }
    state
}

struct Columns {
    title: Option<usize>,
    street: Option<usize>,
    city: Option<usize>,
    state: Option<usize>,
    zipcode: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        Self {
            title: find("title"),
            street: find("street"),
            city: find("city"),
            state: find("state"),
            zipcode: find("zipcode"),
        }
    }

    fn record(&self, row: &StringRecord) -> Option<ListingRecord> {
        let field = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(str::to_string);
        let record = ListingRecord {
            title: field(self.title)?,
            street: field(self.street)?,
            city: field(self.city)?,
            state: field(self.state)?,
            zipcode: field(self.zipcode)?,
            ..ListingRecord::default()
        };
        record.is_complete().then_some(record)
    }
}

fn read_state(path: &Path) -> Result<ResumeState, StorageError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns = Columns::from_headers(reader.headers()?);
    if columns.city.is_none() {
        warn!("⚠️ Output file {} has no city column", path.display());
    }

    let mut state = ResumeState::default();
    for row in reader.records() {
        let row = row?;
        if let Some(city) = columns.city.and_then(|i| row.get(i)) {
            let normalized = normalize_city(city);
            if !normalized.is_empty() {
                state.cities.insert(normalized);
            }
        }
        if let Some(record) = columns.record(&row) {
            state.records.insert(record.dedupe_key());
        }
    }

    Ok(state)
}
