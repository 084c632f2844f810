// Storage module: the city list input, the CSV output and resume state derived from it.

pub mod cities;
pub mod csv_store;
pub mod resume;

pub use cities::load_cities;
pub use csv_store::CsvStore;
pub use resume::{load_resume_state, prior_progress, ResumeState};
