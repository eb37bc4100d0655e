//! Blocking client that turns a [`DataSource`] into a [`Dataset`]

use super::california::{self, ARCHIVE_MEMBER, ARCHIVE_NAME, ARCHIVE_SHA256, CALIFORNIA_HOUSING_URL};
use super::locator::DataSource;
use crate::config::SourceConfig;
use crate::data::Dataset;
use crate::error::{PipelineError, Result};
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tar::Archive as TarArchive;
use tracing::{debug, info, warn};

/// Fetches raw tables over HTTP or from disk
pub struct DatasetClient {
    client: Client,
    data_home: PathBuf,
    target_column: String,
}

impl DatasetClient {
    /// Create a client from the source section of the config
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            data_home: config.data_home(),
            target_column: config.target_column.clone(),
        })
    }

    /// Load the table behind `source`
    pub fn fetch(&self, source: &DataSource) -> Result<Dataset> {
        info!("Fetching data from {}", source);

        let dataset = match source {
            DataSource::CaliforniaHousing => self.fetch_california_housing()?,
            DataSource::RemoteCsv(url) => {
                let bytes = self.download(url)?;
                Dataset::from_reader(bytes.as_slice(), &self.target_column)?
            }
            DataSource::RemoteArchive(url) => {
                let bytes = self.download(url)?;
                let (member, csv) = read_archive_member(Cursor::new(bytes), is_csv_member)?;
                debug!("Using archive member {}", member);
                Dataset::from_reader(csv.as_slice(), &self.target_column)?
            }
            DataSource::LocalCsv(path) => Dataset::load_csv(path, &self.target_column)?,
            DataSource::LocalArchive(path) => {
                let (member, csv) = read_archive_member(fs::File::open(path)?, is_csv_member)?;
                debug!("Using archive member {}", member);
                Dataset::from_reader(csv.as_slice(), &self.target_column)?
            }
        };

        if dataset.is_empty() {
            return Err(PipelineError::InsufficientData(format!(
                "source {} yielded no records",
                source
            )));
        }

        info!(
            "Loaded {} records with {} features",
            dataset.n_samples(),
            dataset.n_features()
        );
        Ok(dataset)
    }

    /// California housing from the local cache, downloading on a miss
    pub fn fetch_california_housing(&self) -> Result<Dataset> {
        let archive = self.cached_california_archive()?;
        let (_, data) = read_archive_member(fs::File::open(&archive)?, |p| p == ARCHIVE_MEMBER)?;
        california::parse_cal_housing(data.as_slice())
    }

    fn cached_california_archive(&self) -> Result<PathBuf> {
        let path = self.data_home.join(ARCHIVE_NAME);

        if path.exists() {
            match verify_checksum(&path, ARCHIVE_SHA256) {
                Ok(()) => {
                    debug!("Cache hit: {:?}", path);
                    return Ok(path);
                }
                Err(e) => warn!("Discarding cached archive: {}", e),
            }
        }

        fs::create_dir_all(&self.data_home)?;
        let bytes = self.download(CALIFORNIA_HOUSING_URL)?;

        // Write under a temporary name so an interrupted download never looks cached
        let partial = path.with_extension("part");
        fs::write(&partial, &bytes)?;
        if let Err(e) = verify_checksum(&partial, ARCHIVE_SHA256) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, &path)?;

        info!("Cached {} bytes at {:?}", bytes.len(), path);
        Ok(path)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET {}", url);
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

fn is_csv_member(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".csv")
}

/// Return the first regular file in a gzip tarball whose path satisfies `pred`
pub fn read_archive_member<R: Read>(
    reader: R,
    pred: impl Fn(&str) -> bool,
) -> Result<(String, Vec<u8>)> {
    let mut archive = TarArchive::new(GzDecoder::new(reader));

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let entry_path = entry.path()?.to_string_lossy().to_string();
        if pred(&entry_path) {
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut buf)?;
            return Ok((entry_path, buf));
        }
    }

    Err(PipelineError::DataSource(
        "archive has no matching member".into(),
    ))
}

/// Compare a file's SHA-256 against the expected hex digest
pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let bytes = fs::read(path)?;
    let actual = format!("{:x}", Sha256::digest(&bytes));

    if actual != expected {
        return Err(PipelineError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, contents.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn client(dir: &Path) -> DatasetClient {
        DatasetClient::new(&SourceConfig {
            data_home: Some(dir.join("cache")),
            target_column: "price".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_first_csv_member_is_used() {
        let bytes = tarball(&[
            ("housing/README.txt", "not a table"),
            ("housing/housing.csv", "a,price\n1,2\n"),
            ("housing/other.csv", "b,price\n3,4\n"),
        ]);

        let (member, data) = read_archive_member(Cursor::new(bytes), is_csv_member).unwrap();
        assert_eq!(member, "housing/housing.csv");
        assert_eq!(data, b"a,price\n1,2\n");
    }

    #[test]
    fn test_archive_without_match() {
        let bytes = tarball(&[("notes.txt", "hello")]);
        assert!(read_archive_member(Cursor::new(bytes), is_csv_member).is_err());
    }

    #[test]
    fn test_fetch_local_csv_and_archive() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("raw.csv");
        fs::write(&csv_path, "price,rooms,age\n3.5,4,10\n2.0,,20\n").unwrap();

        let tgz_path = dir.path().join("raw.tgz");
        fs::write(&tgz_path, tarball(&[("raw.csv", "price,rooms,age\n3.5,4,10\n")])).unwrap();

        let client = client(dir.path());

        let from_csv = client.fetch(&DataSource::LocalCsv(csv_path)).unwrap();
        assert_eq!(from_csv.column_names(), vec!["rooms", "age", "target"]);
        assert_eq!(from_csv.n_samples(), 2);

        let from_tgz = client.fetch(&DataSource::LocalArchive(tgz_path)).unwrap();
        assert_eq!(from_tgz.column_names(), from_csv.column_names());
        assert_eq!(from_tgz.n_samples(), 1);
    }

    #[test]
    fn test_fetch_rejects_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("empty.csv");
        fs::write(&csv_path, "rooms,price\n").unwrap();

        let err = client(dir.path())
            .fetch(&DataSource::LocalCsv(csv_path))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(_)));
    }

    #[test]
    fn test_checksum_and_member_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache");
        fs::create_dir_all(&cache).unwrap();

        let row = "-122.23,37.88,41.0,880.0,129.0,322.0,126.0,8.3252,452600.0\n";
        let archive = tarball(&[(ARCHIVE_MEMBER, row)]);
        let archive_path = cache.join(ARCHIVE_NAME);
        fs::write(&archive_path, &archive).unwrap();

        // The real digest won't match a synthetic archive
        let err = verify_checksum(&archive_path, ARCHIVE_SHA256).unwrap_err();
        assert!(matches!(err, PipelineError::ChecksumMismatch { .. }));

        let actual = format!("{:x}", Sha256::digest(&archive));
        assert!(verify_checksum(&archive_path, &actual).is_ok());

        let (_, data) =
            read_archive_member(fs::File::open(&archive_path).unwrap(), |p| p == ARCHIVE_MEMBER)
                .unwrap();
        let dataset = california::parse_cal_housing(data.as_slice()).unwrap();
        assert_eq!(dataset.n_samples(), 1);
    }
}
