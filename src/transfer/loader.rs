//! Loading of downloaded segment files into timestamp-indexed tables.
//!
//! [`SegmentLoader`] is the parsing seam; the shipped [`CsvSegmentLoader`]
//! reads plain or gzip-compressed CSV with a `"time"` column. NetCDF decoding
//! is out of scope for this crate; callers downloading NetCDF supply their
//! own loader.

use crate::assembly::TIME_COLUMN;
use crate::transfer::error::TransferError;
use async_compression::tokio::bufread::GzipDecoder;
use async_trait::async_trait;
use log::debug;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::{fs, task};

/// Parses one downloaded file into a table indexed by the `"time"` column.
#[async_trait]
pub trait SegmentLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<DataFrame, TransferError>;
}

/// Loads CSV segments, transparently decompressing gzip (sniffed by magic
/// bytes, independent of the file extension).
pub struct CsvSegmentLoader;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[async_trait]
impl SegmentLoader for CsvSegmentLoader {
    async fn load(&self, path: &Path) -> Result<DataFrame, TransferError> {
        let raw = fs::read(path)
            .await
            .map_err(|e| TransferError::SegmentRead(path.to_path_buf(), e))?;

        let bytes = if raw.starts_with(&GZIP_MAGIC) {
            debug!("Decompressing gzip segment {path:?}");
            let mut decoder = GzipDecoder::new(BufReader::new(raw.as_slice()));
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .await
                .map_err(|e| TransferError::SegmentRead(path.to_path_buf(), e))?;
            decompressed
        } else {
            raw
        };

        let path_owned = path.to_path_buf();
        task::spawn_blocking(move || {
            let frame = CsvReadOptions::default()
                .with_has_header(true)
                .map_parse_options(|opts| opts.with_try_parse_dates(true))
                .into_reader_with_file_handle(Cursor::new(bytes))
                .finish()
                .map_err(|e| TransferError::SegmentParse(path_owned.clone(), e))?;

            // the merge step needs a timestamp index; fail here with the
            // offending path rather than later without it
            frame
                .column(TIME_COLUMN)
                .map_err(|e| TransferError::SegmentParse(path_owned.clone(), e))?;
            Ok(frame)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "time,2m_temperature\n\
        2021-01-01T00:00:00,250.5\n\
        2021-01-01T01:00:00,251.0\n\
        2021-01-01T02:00:00,251.5\n";

    #[tokio::test]
    async fn test_load_plain_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment.nc");
        std::fs::write(&path, SAMPLE).unwrap();

        let frame = CsvSegmentLoader.load(&path).await.unwrap();
        assert_eq!(frame.height(), 3);
        assert!(matches!(
            frame.column(TIME_COLUMN).unwrap().dtype(),
            DataType::Datetime(_, _)
        ));
        let temps: Vec<f64> = frame
            .column("2m_temperature")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(temps, vec![250.5, 251.0, 251.5]);
    }

    #[tokio::test]
    async fn test_load_gzipped_csv() {
        use async_compression::tokio::bufread::GzipEncoder;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment.nc");
        let mut encoder = GzipEncoder::new(BufReader::new(SAMPLE.as_bytes()));
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).await.unwrap();
        std::fs::write(&path, &compressed).unwrap();

        let frame = CsvSegmentLoader.load(&path).await.unwrap();
        assert_eq!(frame.height(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_is_a_read_error() {
        let err = CsvSegmentLoader
            .load(Path::new("/nonexistent/segment.nc"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::SegmentRead(_, _)));
    }

    #[tokio::test]
    async fn test_missing_time_column_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment.nc");
        std::fs::write(&path, "t2m\n1.0\n").unwrap();

        let err = CsvSegmentLoader.load(&path).await.unwrap_err();
        assert!(matches!(err, TransferError::SegmentParse(_, _)));
    }
}
