use crate::model::{ListingRecord, StorageError, OUTPUT_HEADER};
use csv::{Writer, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Append-only CSV sink. Every appended row is on disk before `append` returns.
pub struct CsvStore {
    writer: Writer<File>,
    path: PathBuf,
    written: usize,
}

impl CsvStore {
    /// Opens the output for appending, writing the header if the file is new or empty.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let is_new = match fs::metadata(path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let writer = WriterBuilder::new().has_headers(false).from_writer(file);

        let mut store = Self {
            writer,
            path: path.to_path_buf(),
            written: 0,
        };

        if is_new {
            store.writer.write_record(OUTPUT_HEADER)?;
            store.sync()?;
            info!("📝 Created {} with header", path.display());
        }

        Ok(store)
    }

    /// Writes one row and syncs it to disk.
    pub fn append(&mut self, record: &ListingRecord) -> Result<(), StorageError> {
        self.writer.write_record(record.as_row())?;
        self.sync()?;
        self.written += 1;
        Ok(())
    }

    /// Rows appended through this handle.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn close(mut self) -> Result<(), StorageError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        info!("💾 Closed {} ({} new rows)", self.path.display(), self.written);
        Ok(())
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }
}
