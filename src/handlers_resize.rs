use std::convert::Infallible;
use warp::{Filter, Reply};

use crate::collage_error::{CollageError, CollageResult};
use crate::collage_generator;
use crate::handlers_collage::load_photos;
use crate::image_codec::OutputFormat;
use crate::upload_form::UploadForm;
use crate::warp_helpers::{
    into_reply, respond_with_image, run_blocking, with_state, with_upload, AppState,
    ResponseQuery, Success,
};

/// Bounding box used when the request names no width or height
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

fn dimension_field(upload: &UploadForm, name: &str) -> CollageResult<u32> {
    match upload.parsed_field::<u32>(name)? {
        None => Ok(DEFAULT_MAX_DIMENSION),
        Some(0) => Err(CollageError::InvalidField {
            field: name.to_string(),
            value: "0".to_string(),
        }),
        Some(value) => Ok(value),
    }
}

pub async fn process_resize(
    upload: UploadForm,
    query: &ResponseQuery,
    state: &AppState,
) -> CollageResult<Success> {
    let max_width = dimension_field(&upload, "width")?;
    let max_height = dimension_field(&upload, "height")?;
    let format = upload
        .parsed_field::<OutputFormat>("format")?
        .unwrap_or_default();

    let mut photos = load_photos(upload.into_source()?, state.settings.max_upload_bytes).await?;
    if photos.len() != 1 {
        return Err(CollageError::InvalidPhotoCount {
            expected: "1".to_string(),
            actual: photos.len(),
        });
    }
    let photo = photos.remove(0);

    let settings = state.settings.clone();
    let bytes = run_blocking(move || {
        collage_generator::render_resize(&photo, max_width, max_height, format, &settings)
    })
    .await?;

    respond_with_image(bytes, format, query, state.store.as_ref()).await
}

pub async fn resize(
    query: ResponseQuery,
    upload: CollageResult<UploadForm>,
    state: AppState,
) -> Result<impl Reply, Infallible> {
    let result = match upload {
        Ok(upload) => process_resize(upload, &query, &state).await,
        Err(e) => Err(e),
    };
    Ok(into_reply(result))
}

pub fn build_resize_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("resize")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::query::<ResponseQuery>())
        .and(with_upload(state.settings.max_upload_bytes))
        .and(with_state(state))
        .and_then(resize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collage_generator::RenderSettings;
    use crate::storage::LocalResultStore;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;
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
                max_upload_bytes: 5 * 1024 * 1024,
                jpeg_quality: 90,
            },
            store: Arc::new(store),
        }
    }

    fn jpeg_photo(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([120, 60, 30])))
            .write_to(&mut buffer, ImageFormat::Jpeg)
            .unwrap();
        buffer.into_inner()
    }

    fn upload(photos: Vec<Vec<u8>>, fields: &[(&str, &str)]) -> UploadForm {
        UploadForm {
            photos,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_resize_defaults_to_1024_jpeg() {
        // GIVEN: A 2048x1024 photo and no size fields
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);

        // WHEN: Resizing
        let result = process_resize(
            upload(vec![jpeg_photo(2048, 1024)], &[]),
            &ResponseQuery::default(),
            &state,
        )
        .await
        .unwrap();

        // THEN: It fits the default box and stays JPEG
        let Success::Image { bytes, format, .. } = result else {
            panic!("expected image bytes");
        };
        assert_eq!(format, OutputFormat::Jpeg);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1024, 512));
    }

    #[tokio::test]
    async fn test_resize_honours_fields() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);

        let result = process_resize(
            upload(
                vec![jpeg_photo(400, 400)],
                &[("width", "100"), ("height", "50"), ("format", "png")],
            ),
            &ResponseQuery::default(),
            &state,
        )
        .await
        .unwrap();

        let Success::Image { bytes, format, .. } = result else {
            panic!("expected image bytes");
        };
        assert_eq!(format, OutputFormat::Png);
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (50, 50));
    }

    #[tokio::test]
    async fn test_resize_rejects_bad_fields() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);

        for fields in [[("width", "0")], [("height", "big")], [("format", "tiff")]] {
            let result = process_resize(
                upload(vec![jpeg_photo(10, 10)], &fields),
                &ResponseQuery::default(),
                &state,
            )
            .await;
            assert!(matches!(result, Err(CollageError::InvalidField { .. })));
        }
    }

    #[tokio::test]
    async fn test_resize_needs_one_photo() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);

        let missing = process_resize(upload(vec![], &[]), &ResponseQuery::default(), &state).await;
        assert!(matches!(missing, Err(CollageError::MissingInput)));

        let two = process_resize(
            upload(vec![jpeg_photo(10, 10), jpeg_photo(10, 10)], &[]),
            &ResponseQuery::default(),
            &state,
        )
        .await;
        assert!(matches!(
            two,
            Err(CollageError::InvalidPhotoCount { actual: 2, .. })
        ));
    }
}
