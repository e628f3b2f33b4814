use std::convert::Infallible;
use warp::{Filter, Reply};

use crate::collage_error::{CollageError, CollageResult};
use crate::collage_generator;
use crate::image_codec::OutputFormat;
use crate::layout::LayoutPreset;
use crate::photo_fetcher;
use crate::upload_form::{PhotoSource, UploadForm};
use crate::warp_helpers::{
    into_reply, respond_with_image, run_blocking, with_state, with_upload, AppState,
    ResponseQuery, Success,
};

/// Uploaded bytes as-is, or the single photo behind `photo_url`.
pub async fn load_photos(source: PhotoSource, limit: u64) -> CollageResult<Vec<Vec<u8>>> {
    match source {
        PhotoSource::Uploaded(photos) => Ok(photos),
        PhotoSource::Url(url) => {
            let bytes = run_blocking(move || photo_fetcher::fetch_photo(&url, limit)).await?;
            Ok(vec![bytes])
        }
    }
}

/// Renders a collage for `preset`. On `/collage` the form field `layout`
/// may pick another preset; `/mockup` is pinned to a single photo.
pub async fn process_collage(
    upload: UploadForm,
    preset: LayoutPreset,
    pinned: bool,
    query: &ResponseQuery,
    state: &AppState,
) -> CollageResult<Success> {
    let preset = if pinned {
        preset
    } else {
        upload.parsed_field::<LayoutPreset>("layout")?.unwrap_or(preset)
    };

    let photos = load_photos(upload.into_source()?, state.settings.max_upload_bytes).await?;
    if pinned && photos.len() != 1 {
        return Err(CollageError::InvalidPhotoCount {
            expected: "1".to_string(),
            actual: photos.len(),
        });
    }

    log::info!(
        "Generating {} collage from {} photo(s)",
        preset,
        photos.len()
    );

    let settings = state.settings.clone();
    let bytes = run_blocking(move || {
        collage_generator::render_collage(&photos, &preset.config(), &settings)
    })
    .await?;

    respond_with_image(bytes, OutputFormat::Jpeg, query, state.store.as_ref()).await
}

pub async fn create_collage(
    query: ResponseQuery,
    upload: CollageResult<UploadForm>,
    state: AppState,
) -> Result<impl Reply, Infallible> {
    let result = match upload {
        Ok(upload) => process_collage(upload, LayoutPreset::Collage, false, &query, &state).await,
        Err(e) => Err(e),
    };
    Ok(into_reply(result))
}

pub async fn create_mockup(
    query: ResponseQuery,
    upload: CollageResult<UploadForm>,
    state: AppState,
) -> Result<impl Reply, Infallible> {
    let result = match upload {
        Ok(upload) => process_collage(upload, LayoutPreset::Mockup, true, &query, &state).await,
        Err(e) => Err(e),
    };
    Ok(into_reply(result))
}

pub fn build_collage_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let limit = state.settings.max_upload_bytes;

    let collage = warp::path("collage")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::query::<ResponseQuery>())
        .and(with_upload(limit))
        .and(with_state(state.clone()))
        .and_then(create_collage);

    let mockup = warp::path("mockup")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::query::<ResponseQuery>())
        .and(with_upload(limit))
        .and(with_state(state))
        .and_then(create_mockup);

    collage.or(mockup)
}
