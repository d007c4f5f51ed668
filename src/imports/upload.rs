use std::path::Path;

use anyhow::Context;
use axum::extract::Multipart;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::CsvTable;
use crate::error::{AppError, AppResult};

const FILE_FIELD: &str = "file";

/// An uploaded CSV written to a temp file. The file is removed when this
/// value is dropped, whatever the outcome of the import.
#[derive(Debug)]
pub struct SpooledUpload {
    file: NamedTempFile,
    size: u64,
}

impl SpooledUpload {
    /// Streams the `file` field of a multipart body into `dir`.
    pub async fn from_multipart(
        mut mp: Multipart,
        dir: &Path,
        max_bytes: usize,
    ) -> AppResult<Self> {
        while let Some(mut field) = mp
            .next_field()
            .await
            .map_err(|e| AppError::validation(format!("Malformed multipart body: {e}")))?
        {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }

            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create upload dir {}", dir.display()))?;
            let file = tempfile::Builder::new()
                .prefix("upload-")
                .suffix(".csv")
                .tempfile_in(dir)
                .context("create temp upload file")?;
            let mut out = tokio::fs::File::from_std(
                file.reopen().context("open temp upload file")?,
            );

            let mut size: u64 = 0;
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| AppError::validation(format!("Malformed multipart body: {e}")))?
            {
                size += chunk.len() as u64;
                if size > max_bytes as u64 {
                    return Err(AppError::validation(format!(
                        "Upload exceeds {max_bytes} bytes"
                    )));
                }
                out.write_all(&chunk).await.context("write temp upload file")?;
            }
            out.flush().await.context("flush temp upload file")?;

            debug!(path = %file.path().display(), size, "upload spooled");
            return Ok(Self { file, size });
        }
        Err(AppError::validation("file is required"))
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Parses the spooled file on the blocking pool. Hands the upload back so
    /// the caller decides when the file goes away.
    pub async fn read_table(self, required: &'static [&'static str]) -> AppResult<(Self, CsvTable)> {
        tokio::task::spawn_blocking(move || -> AppResult<(Self, CsvTable)> {
            let reader = self.file.reopen().context("Error reading CSV file")?;
            let table = CsvTable::read(std::io::BufReader::new(reader), required)?;
            Ok((self, table))
        })
        .await
        .context("csv reader task")?
    }
}

#[cfg(test)]
impl SpooledUpload {
    /// Writes `contents` to a temp file in `dir`, bypassing multipart.
    pub fn from_bytes(dir: &Path, contents: &[u8]) -> anyhow::Result<Self> {
        use std::io::Write;
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".csv")
            .tempfile_in(dir)?;
        file.write_all(contents)?;
        file.flush()?;
        Ok(Self {
            file,
            size: contents.len() as u64,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn temp_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let upload =
            SpooledUpload::from_bytes(dir.path(), b"CampaignName,PAN\nA,ABCDE1234F\n").unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.exists());

        let (upload, table) = upload.read_table(&["CampaignName", "PAN"]).await.unwrap();
        assert_eq!(table.len(), 1);
        assert!(path.exists());

        drop(upload);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn temp_file_is_removed_when_headers_fail() {
        let dir = tempfile::tempdir().unwrap();
        let upload = SpooledUpload::from_bytes(dir.path(), b"Nope\n1\n").unwrap();
        let path = upload.path().to_path_buf();

        let err = upload.read_table(&["CampaignName"]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!path.exists());
    }
}
