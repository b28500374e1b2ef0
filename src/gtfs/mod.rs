//! Convenience ingestion boundary: turns a `.zip` archive or a directory of GTFS
//! text files into an in-memory [`GtfsData`]. This module is intentionally the only
//! place in the crate that knows about zip archives or CSV parsing — per spec, the
//! RAPTOR core and its repository never see a file path, only already-parsed rows.

mod config;
pub mod models;

pub use config::FeedConfig;
pub use models::GtfsData;

use serde::de::DeserializeOwned;
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;
use zip::{ZipArchive, read::ZipFile};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("CSV error in {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
    #[error("could not find file `{0}` in the feed")]
    FileNotFound(String),
}

enum Source {
    Zip(ZipArchive<File>),
    Directory(PathBuf),
}

/// Streams tables out of a GTFS feed, one row at a time, regardless of whether the
/// feed is a `.zip` archive or an already-extracted directory.
pub struct Gtfs {
    config: FeedConfig,
    source: Source,
}

impl Gtfs {
    pub fn from_zip<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_zip_with_config(path, FeedConfig::default())
    }

    pub fn from_zip_with_config<P: AsRef<Path>>(path: P, config: FeedConfig) -> Result<Self, Error> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)?;
        Ok(Self {
            config,
            source: Source::Zip(archive),
        })
    }

    pub fn from_directory<P: AsRef<Path>>(path: P) -> Self {
        Self::from_directory_with_config(path, FeedConfig::default())
    }

    pub fn from_directory_with_config<P: AsRef<Path>>(path: P, config: FeedConfig) -> Self {
        Self {
            config,
            source: Source::Directory(path.as_ref().to_path_buf()),
        }
    }

    /// Reads every required and optional table into memory. `transfers.txt`,
    /// `calendar.txt`, and `calendar_dates.txt` are optional per the GTFS spec and
    /// are simply left empty when absent.
    pub fn load(mut self) -> Result<GtfsData, Error> {
        debug!("loading GTFS feed");
        let mut data = GtfsData::default();
        data.stops = self.read_table(&self.config.stops_path.clone())?;
        data.routes = self.read_table(&self.config.routes_path.clone())?;
        data.trips = self.read_table(&self.config.trips_path.clone())?;
        data.stop_times = self.read_table(&self.config.stop_times_path.clone())?;
        data.transfers = self
            .read_table(&self.config.transfers_path.clone())
            .unwrap_or_default();
        data.calendar = self
            .read_table(&self.config.calendar_path.clone())
            .unwrap_or_default();
        data.calendar_dates = self
            .read_table(&self.config.calendar_dates_path.clone())
            .unwrap_or_default();
        debug!(
            stops = data.stops.len(),
            trips = data.trips.len(),
            stop_times = data.stop_times.len(),
            "GTFS feed loaded"
        );
        Ok(data)
    }

    fn read_table<T: DeserializeOwned>(&mut self, file_name: &str) -> Result<Vec<T>, Error> {
        match &mut self.source {
            Source::Zip(archive) => {
                let file = get_file_from_zip(archive, file_name)?;
                read_csv(file, file_name)
            }
            Source::Directory(dir) => {
                let path = dir.join(file_name);
                if !path.exists() {
                    return Err(Error::FileNotFound(file_name.to_string()));
                }
                let file = File::open(path)?;
                let reader = io::BufReader::with_capacity(128 * 1024, file);
                read_csv(reader, file_name)
            }
        }
    }
}

fn read_csv<T: DeserializeOwned, R: io::Read>(reader: R, file_name: &str) -> Result<Vec<T>, Error> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    csv_reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|source| Error::Csv {
            file: file_name.to_string(),
            source,
        })
}

fn get_file_from_zip<'a>(
    archive: &'a mut ZipArchive<File>,
    name: &'a str,
) -> Result<ZipFile<'a, File>, Error> {
    let index = archive
        .index_for_name(name)
        .ok_or_else(|| Error::FileNotFound(name.to_string()))?;
    Ok(archive.by_index(index)?)
}

#[allow(dead_code)]
fn ensure_directory(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}
