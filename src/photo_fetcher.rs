use log::{info, warn};
use std::time::Instant;

use crate::collage_error::{CollageError, CollageResult};

/// Downloads a photo referenced by `photo_url`. Blocking; run it on the
/// blocking pool. Non-success status or transport error fails immediately,
/// there are no retries.
pub fn fetch_photo(url: &str, limit: u64) -> CollageResult<Vec<u8>> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(CollageError::RemoteFetchFailure(format!(
            "unsupported URL scheme in {}",
            url
        )));
    }

    info!("Fetching photo from {}", url);
    let fetch_start = Instant::now();

    let mut response = ureq::get(url).call().map_err(|e| match e {
        ureq::Error::StatusCode(code) => {
            warn!("Photo download from {} returned {}", url, code);
            CollageError::RemoteFetchFailure(code.to_string())
        }
        other => {
            warn!("Photo download from {} failed: {}", url, other);
            CollageError::RemoteFetchFailure(other.to_string())
        }
    })?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(CollageError::RemoteFetchFailure(status.to_string()));
    }

    let bytes = response
        .body_mut()
        .with_config()
        .limit(limit)
        .read_to_vec()
        .map_err(|e| match e {
            ureq::Error::BodyExceedsLimit(_) => CollageError::PayloadTooLarge {
                size: limit + 1,
                limit,
            },
            other => CollageError::RemoteFetchFailure(other.to_string()),
        })?;

    info!(
        "Fetched {} bytes from {} in {:?}",
        bytes.len(),
        url,
        fetch_start.elapsed()
    );
    Ok(bytes)
}
