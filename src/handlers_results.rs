use std::convert::Infallible;
use warp::{Filter, Reply};

use crate::collage_error::{CollageError, CollageResult};
use crate::image_codec::OutputFormat;
use crate::storage::is_valid_result_filename;
use crate::warp_helpers::{into_reply, with_state, AppState, Success};

/// Looks up a persisted result. Anything but `<uuid>.jpg|png` is not found.
pub async fn fetch_result(filename: &str, state: &AppState) -> CollageResult<Success> {
    if !is_valid_result_filename(filename) {
        return Err(CollageError::NotFound);
    }
    let format = filename
        .rsplit_once('.')
        .and_then(|(_, extension)| OutputFormat::from_extension(extension))
        .ok_or(CollageError::NotFound)?;

    let bytes = state.store.get(filename).await?;
    Ok(Success::Image {
        bytes,
        format,
        cacheable: true,
    })
}

pub async fn get_result(filename: String, state: AppState) -> Result<impl Reply, Infallible> {
    Ok(into_reply(fetch_result(&filename, &state).await))
}

pub fn build_results_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let results = warp::path!("results" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_result);

    // Older clients link to /image/<filename>
    let image = warp::path!("image" / String)
        .and(warp::get())
        .and(with_state(state))
        .and_then(get_result);

    results.or(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collage_generator::RenderSettings;
    use crate::storage::{new_result_filename, LocalResultStore, ResultStore};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_state(temp_dir: &TempDir) -> AppState {
        let store = LocalResultStore::new(
            temp_dir.path().join("results"),
            "http://localhost:8080".to_string(),
        )
        .unwrap();

        AppState {
            settings: RenderSettings {
                assets_dir: temp_dir.path().join("assets"),
                logo_file: "logo.png".to_string(),
                signature_file: "signature.png".to_string(),
                max_upload_bytes: 1024,
                jpeg_quality: 90,
            },
            store: Arc::new(store),
        }
    }

    #[tokio::test]
    async fn test_fetch_stored_png() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);
        let filename = new_result_filename("png");
        state.store.put(vec![1, 2, 3], &filename).await.unwrap();

        let result = fetch_result(&filename, &state).await.unwrap();

        match result {
            Success::Image {
                bytes,
                format,
                cacheable,
            } => {
                assert_eq!(bytes, vec![1, 2, 3]);
                assert_eq!(format, OutputFormat::Png);
                assert!(cacheable);
            }
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_traversal_and_unknown_names_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);

        let unknown = new_result_filename("jpg");
        for name in ["../secret.jpg", "config.png", unknown.as_str()] {
            let result = fetch_result(name, &state).await;
            assert!(matches!(result, Err(CollageError::NotFound)), "{}", name);
        }
    }
}
