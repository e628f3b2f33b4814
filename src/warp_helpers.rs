use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use warp::http::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::{reject, Filter, Rejection, Reply};

use crate::collage_error::{CollageError, CollageResult};
use crate::collage_generator::RenderSettings;
use crate::image_codec::OutputFormat;
use crate::storage::{new_result_filename, ResultStore};
use crate::upload_form::UploadForm;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct StoredResponse {
    pub url: String,
    pub status: &'static str,
}

impl reject::Reject for CollageError {}

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub settings: RenderSettings,
    pub store: Arc<dyn ResultStore>,
}

/// Successful outcome of a handler, before it is put on the wire
#[derive(Debug)]
pub enum Success {
    Image {
        bytes: Vec<u8>,
        format: OutputFormat,
        cacheable: bool,
    },
    Stored {
        url: String,
    },
}

/// `?response=json` persists the result and answers with its URL
#[derive(Debug, Default, Deserialize)]
pub struct ResponseQuery {
    pub response: Option<String>,
}

impl ResponseQuery {
    pub fn wants_json(&self) -> bool {
        self.response.as_deref() == Some("json")
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Rejects bodies whose declared length exceeds `limit` before anything is
/// read.
pub fn with_body_limit(limit: u64) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and_then(move |length: Option<u64>| async move {
            match length {
                Some(size) if size > limit => {
                    Err(reject::custom(CollageError::PayloadTooLarge { size, limit }))
                }
                _ => Ok(()),
            }
        })
        .untuple_one()
}

/// How a POST body is read, decided by its content type alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Multipart,
    UrlEncoded,
    Other,
}

impl BodyKind {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let essence = content_type
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase());

        match essence.as_deref() {
            Some("multipart/form-data") => BodyKind::Multipart,
            Some("application/x-www-form-urlencoded") => BodyKind::UrlEncoded,
            _ => BodyKind::Other,
        }
    }
}

fn body_kind(kind: BodyKind) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::optional::<String>("content-type")
        .and_then(move |content_type: Option<String>| async move {
            if BodyKind::from_content_type(content_type.as_deref()) == kind {
                Ok(())
            } else {
                Err(reject::not_found())
            }
        })
        .untuple_one()
}

/// Multipart upload, url-encoded form, or no usable body at all. Exactly one
/// branch matches a request, so a multipart body that fails to parse never
/// turns into an empty form. Parse failures are carried to the handler so
/// they go through the same response path.
pub fn with_upload(
    limit: u64,
) -> impl Filter<Extract = (CollageResult<UploadForm>,), Error = Rejection> + Clone {
    // warp's own length gate needs a content-length header, which chunked
    // uploads lack; the size is enforced while the parts stream in instead.
    let multipart = body_kind(BodyKind::Multipart).and(
        warp::multipart::form()
            .max_length(None::<u64>)
            .and_then(move |form| async move {
                Ok::<_, Rejection>(UploadForm::read(form, limit).await)
            })
            .or_else(|rejection: Rejection| async move {
                log::debug!("Multipart body rejected: {:?}", rejection);
                Ok::<_, Rejection>((Err::<UploadForm, _>(CollageError::InvalidField {
                    field: "content-type".to_string(),
                    value: "malformed multipart/form-data".to_string(),
                }),))
            }),
    );

    let urlencoded = body_kind(BodyKind::UrlEncoded)
        .and(warp::body::content_length_limit(limit))
        .and(warp::body::form::<HashMap<String, String>>())
        .map(|fields| {
            Ok::<_, CollageError>(UploadForm {
                photos: Vec::new(),
                fields,
            })
        });

    let other = body_kind(BodyKind::Other).map(|| Ok::<_, CollageError>(UploadForm::default()));

    with_body_limit(limit).and(multipart.or(urlencoded).unify().or(other).unify())
}

/// Runs CPU-bound work on the blocking pool.
pub async fn run_blocking<T, F>(work: F) -> CollageResult<T>
where
    F: FnOnce() -> CollageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CollageError::Processing(format!("Worker task failed: {}", e)))?
}

/// Either hands the image back directly or persists it and answers with
/// its URL.
pub async fn respond_with_image(
    bytes: Vec<u8>,
    format: OutputFormat,
    query: &ResponseQuery,
    store: &dyn ResultStore,
) -> CollageResult<Success> {
    if !query.wants_json() {
        return Ok(Success::Image {
            bytes,
            format,
            cacheable: false,
        });
    }

    let filename = new_result_filename(format.extension());
    let url = store.put(bytes, &filename).await?;
    Ok(Success::Stored { url })
}

/// The one place a handler outcome becomes an HTTP response.
pub fn into_reply(result: CollageResult<Success>) -> warp::reply::Response {
    match result {
        Ok(Success::Image {
            bytes,
            format,
            cacheable,
        }) => {
            let mut response = bytes.into_response();
            let headers = response.headers_mut();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
            if cacheable {
                headers.insert(
                    CACHE_CONTROL,
                    HeaderValue::from_static("public, max-age=31536000"),
                );
            }
            response
        }
        Ok(Success::Stored { url }) => warp::reply::json(&StoredResponse {
            url,
            status: "success",
        })
        .into_response(),
        Err(e) => error_reply(&e),
    }
}

pub fn error_reply(error: &CollageError) -> warp::reply::Response {
    let code = error.status_code();
    if code.is_server_error() {
        log::error!("Request failed: {}", error);
    } else {
        log::warn!("Request rejected: {}", error);
    }
    json_error(error.to_string(), code)
}

fn json_error(message: String, code: StatusCode) -> warp::reply::Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse { error: message }),
        code,
    )
    .into_response()
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(collage_error) = err.find::<CollageError>() {
        return Ok(error_reply(collage_error));
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload too large".to_string();
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        code = StatusCode::LENGTH_REQUIRED;
        message = "Content-Length required".to_string();
    } else if err.find::<warp::body::BodyDeserializeError>().is_some() {
        code = StatusCode::BAD_REQUEST;
        message = "Malformed form body".to_string();
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        code = StatusCode::UNSUPPORTED_MEDIA_TYPE;
        message = "Unsupported media type".to_string();
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        code = StatusCode::BAD_REQUEST;
        message = "Invalid query string".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error".to_string();
    }

    Ok(json_error(message, code))
}

pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
}
