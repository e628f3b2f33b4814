use async_trait::async_trait;
use log::{debug, info};
use std::path::PathBuf;
use tokio::fs;

use crate::collage_error::{CollageError, CollageResult};

/// Where generated images are persisted and served from.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Stores `bytes` under `filename` and returns the public URL.
    async fn put(&self, bytes: Vec<u8>, filename: &str) -> CollageResult<String>;

    async fn get(&self, filename: &str) -> CollageResult<Vec<u8>>;
}

/// Random UUIDv4 filename with the given extension
pub fn new_result_filename(extension: &str) -> String {
    let mut bytes: [u8; 16] = rand::random();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}-{}-{}-{}-{}.{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32],
        extension
    )
}

/// Accepts only `<uuid>.<jpg|png>` so lookups never leave the results dir.
pub fn is_valid_result_filename(filename: &str) -> bool {
    let Some((stem, extension)) = filename.rsplit_once('.') else {
        return false;
    };
    if !matches!(extension, "jpg" | "png") || stem.len() != 36 {
        return false;
    }

    stem.char_indices().all(|(i, c)| match i {
        8 | 13 | 18 | 23 => c == '-',
        _ => c.is_ascii_hexdigit(),
    })
}

#[derive(Clone)]
pub struct LocalResultStore {
    results_dir: PathBuf,
    public_base_url: String,
}

impl LocalResultStore {
    pub fn new(results_dir: PathBuf, public_base_url: String) -> CollageResult<Self> {
        std::fs::create_dir_all(&results_dir).map_err(|e| {
            CollageError::StorageFailure(format!(
                "Cannot create results directory {}: {}",
                results_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            results_dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/results/{}", self.public_base_url, filename)
    }
}

#[async_trait]
impl ResultStore for LocalResultStore {
    async fn put(&self, bytes: Vec<u8>, filename: &str) -> CollageResult<String> {
        if !is_valid_result_filename(filename) {
            return Err(CollageError::StorageFailure(format!(
                "Refusing to store invalid filename: {}",
                filename
            )));
        }

        let final_path = self.results_dir.join(filename);
        // Hidden temp file, renamed into place so a failed write is never servable
        let temp_path = self.results_dir.join(format!(".{}.tmp", filename));

        if let Err(e) = fs::write(&temp_path, &bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CollageError::StorageFailure(format!(
                "Failed to write {}: {}",
                temp_path.display(),
                e
            )));
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CollageError::StorageFailure(format!(
                "Failed to move result into place at {}: {}",
                final_path.display(),
                e
            )));
        }

        info!("Stored result {} ({} bytes)", filename, bytes.len());
        Ok(self.url_for(filename))
    }

    async fn get(&self, filename: &str) -> CollageResult<Vec<u8>> {
        if !is_valid_result_filename(filename) {
            debug!("Rejected result lookup for {:?}", filename);
            return Err(CollageError::NotFound);
        }

        match fs::read(self.results_dir.join(filename)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CollageError::NotFound),
            Err(e) => Err(CollageError::StorageFailure(format!(
                "Failed to read {}: {}",
                filename, e
            ))),
        }
    }
}
