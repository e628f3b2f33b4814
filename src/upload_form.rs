use bytes::BufMut;
use futures_util::TryStreamExt;
use std::collections::HashMap;
use warp::multipart::{FormData, Part};

use crate::collage_error::{CollageError, CollageResult};
use crate::image_codec;

/// Multipart field names that carry photo files
pub const PHOTO_FIELDS: &[&str] = &["photos[]", "photos", "photo", "image"];

/// A parsed multipart upload: photo files in arrival order plus text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub photos: Vec<Vec<u8>>,
    pub fields: HashMap<String, String>,
}

/// Where the request's photos come from
#[derive(Debug, PartialEq, Eq)]
pub enum PhotoSource {
    Uploaded(Vec<Vec<u8>>),
    Url(String),
}

impl UploadForm {
    pub async fn read(form: FormData, limit: u64) -> CollageResult<Self> {
        let mut form = Box::pin(form);
        let mut upload = UploadForm::default();
        let mut consumed: usize = 0;

        while let Some(part) = form
            .try_next()
            .await
            .map_err(|e| CollageError::InvalidField {
                field: "multipart".to_string(),
                value: e.to_string(),
            })?
        {
            let name = part.name().to_string();
            let is_file = part.filename().is_some();
            let data = read_part(part, consumed, limit).await?;
            consumed += data.len();

            if PHOTO_FIELDS.contains(&name.as_str()) {
                // Browsers send an empty file part when nothing was chosen
                if !data.is_empty() {
                    upload.photos.push(data);
                }
            } else if !is_file {
                let value = String::from_utf8_lossy(&data).trim().to_string();
                upload.fields.insert(name, value);
            }
        }

        log::debug!(
            "Parsed upload with {} photo(s) and fields {:?}",
            upload.photos.len(),
            upload.fields.keys().collect::<Vec<_>>()
        );
        Ok(upload)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Uploaded files win over `photo_url`; neither is `MissingInput`.
    pub fn into_source(mut self) -> CollageResult<PhotoSource> {
        if !self.photos.is_empty() {
            return Ok(PhotoSource::Uploaded(std::mem::take(&mut self.photos)));
        }
        match self.field("photo_url") {
            Some(url) => Ok(PhotoSource::Url(url.to_string())),
            None => Err(CollageError::MissingInput),
        }
    }

    pub fn parsed_field<T: std::str::FromStr>(&self, name: &str) -> CollageResult<Option<T>> {
        match self.field(name) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| CollageError::InvalidField {
                    field: name.to_string(),
                    value: value.to_string(),
                }),
        }
    }
}

/// Drains one part, failing as soon as the upload as a whole grows past
/// `limit`. `consumed` is what earlier parts already used.
async fn read_part(part: Part, consumed: usize, limit: u64) -> CollageResult<Vec<u8>> {
    let mut stream = Box::pin(part.stream());
    let mut data = Vec::new();

    while let Some(chunk) = stream
        .try_next()
        .await
        .map_err(|e| CollageError::InvalidField {
            field: "multipart".to_string(),
            value: e.to_string(),
        })?
    {
        data.put(chunk);
        image_codec::ensure_within_limit(consumed + data.len(), limit)?;
    }

    Ok(data)
}
