use crate::model::InputError;
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Column holding the city names in the input table.
const CITY_COLUMN: usize = 1;

/// Reads the city list from the second column of a CSV file with a header row.
/// Blank entries are dropped, source order is kept.
pub fn load_cities(path: &Path) -> Result<Vec<String>, InputError> {
    let file = File::open(path).map_err(|source| InputError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);
    if reader.headers()?.len() <= CITY_COLUMN {
        return Err(InputError::MissingColumn {
            path: path.to_path_buf(),
        });
    }

    let mut cities = Vec::new();
    for row in reader.records() {
        let row = row?;
        match row.get(CITY_COLUMN) {
            Some(city) if !city.trim().is_empty() => cities.push(city.to_string()),
            _ => {}
        }
    }

    info!("📄 Loaded {} cities from {}", cities.len(), path.display());
    Ok(cities)
}
