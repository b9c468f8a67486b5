//! Request handlers and rejection mapping

use super::AppState;
use crate::config::ServerMessages;
use crate::error::{CutoutError, Result};
use crate::tracing_config::spans;
use bytes::BufMut;
use futures_util::TryStreamExt;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::Instrument;
use warp::http::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::multipart::FormData;
use warp::reply::Response;
use warp::{Rejection, Reply};

/// Multipart field carrying the upload
pub const IMAGE_FIELD: &str = "image";

const OUTPUT_DISPOSITION: &str = "inline; filename=\"removed_bg.png\"";

#[derive(Serialize)]
struct HealthBody<'a> {
    status: &'a str,
    service: &'a str,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn error_response(status: StatusCode, error: &str, message: Option<String>) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody { error, message }), status)
        .into_response()
}

/// An `image` part read from the request
#[derive(Debug)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Pull the first `image` file part out of a multipart body
///
/// Parts named `image` without a filename are form fields, not files, and
/// are skipped.
///
/// # Errors
/// `CutoutError::Validation` carrying the client-facing message when the
/// part is missing, has an empty filename, exceeds `max_upload_bytes`, or the
/// body cannot be read
pub async fn read_image_part(
    form: FormData,
    max_upload_bytes: u64,
    messages: &ServerMessages,
) -> Result<ImageUpload> {
    let mut form = std::pin::pin!(form);

    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| CutoutError::validation(e.to_string()))?
    {
        if part.name() != IMAGE_FIELD {
            continue;
        }
        let Some(filename) = part.filename().map(str::to_string) else {
            continue;
        };
        if filename.is_empty() {
            return Err(CutoutError::validation(messages.empty_filename.as_str()));
        }

        let mut data = Vec::new();
        let mut stream = std::pin::pin!(part.stream());
        while let Some(chunk) = stream
            .try_next()
            .await
            .map_err(|e| CutoutError::validation(e.to_string()))?
        {
            data.put(chunk);
            if data.len() as u64 > max_upload_bytes {
                return Err(CutoutError::validation(messages.image_too_large.as_str()));
            }
        }

        return Ok(ImageUpload { filename, data });
    }

    Err(CutoutError::validation(messages.no_image.as_str()))
}

/// JSON response for a failed upload
///
/// Client errors answer 400 with their message as `error`; everything else
/// is a 500 carrying the error text.
fn cutout_error_response(error: &CutoutError, messages: &ServerMessages) -> Response {
    match error {
        CutoutError::Validation(reason) if error.is_client_error() => {
            error_response(StatusCode::BAD_REQUEST, reason, None)
        },
        _ => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &messages.processing_failed,
            Some(error.to_string()),
        ),
    }
}

/// `GET /health`
pub async fn health(state: Arc<AppState>) -> std::result::Result<Response, Infallible> {
    Ok(warp::reply::json(&HealthBody {
        status: "ok",
        service: &state.config.service_name,
    })
    .into_response())
}

/// `POST /remove-background`
pub async fn remove_background(
    state: Arc<AppState>,
    form: FormData,
) -> std::result::Result<Response, Infallible> {
    let request_id = uuid::Uuid::new_v4();
    Ok(handle_upload(state, form)
        .instrument(spans::upload(&request_id))
        .await)
}

async fn handle_upload(state: Arc<AppState>, form: FormData) -> Response {
    let messages = &state.config.messages;

    let upload = match read_image_part(form, state.config.max_upload_bytes, messages).await {
        Ok(upload) => upload,
        Err(e) => {
            tracing::info!(error = %e, "Rejected upload");
            return cutout_error_response(&e, messages);
        },
    };

    tracing::info!(
        filename = %upload.filename,
        bytes = upload.data.len(),
        "Received upload"
    );

    let processor = state.processor.clone();
    let data = upload.data;
    let span = tracing::Span::current();
    let outcome =
        tokio::task::spawn_blocking(move || span.in_scope(|| processor.process_bytes(&data)))
            .await;

    let processed = match outcome {
        Ok(Ok(processed)) => processed,
        Ok(Err(e)) => {
            tracing::error!(stage = ?e.stage(), error = %e, "Processing failed");
            return cutout_error_response(&e, messages);
        },
        Err(e) => {
            tracing::error!(error = %e, "Processing task failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &messages.processing_failed,
                Some(e.to_string()),
            );
        },
    };

    tracing::info!(
        output = %format!("{}x{}", processed.output_dimensions.0, processed.output_dimensions.1),
        size_kb = %format!("{:.1}", processed.size_kb()),
        total_ms = processed.timings.total_ms,
        "Responding with cutout"
    );

    let mut response = Response::new(processed.png.into());
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static(OUTPUT_DISPOSITION));

    response
}

/// Map rejections to JSON error responses
pub async fn handle_rejection(
    err: Rejection,
    messages: Arc<ServerMessages>,
) -> std::result::Result<Response, Infallible> {
    let response = if err.is_not_found() {
        error_response(StatusCode::NOT_FOUND, "Not Found", None)
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        error_response(StatusCode::PAYLOAD_TOO_LARGE, &messages.image_too_large, None)
    } else if err.find::<warp::reject::MissingHeader>().is_some()
        || err.find::<warp::reject::InvalidHeader>().is_some()
    {
        // Not a multipart request, so there is no image part
        error_response(StatusCode::BAD_REQUEST, &messages.no_image, None)
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        error_response(StatusCode::LENGTH_REQUIRED, "Length Required", None)
    } else if let Some(forbidden) = err.find::<warp::cors::CorsForbidden>() {
        tracing::info!(reason = %forbidden, "Rejected CORS request");
        error_response(StatusCode::FORBIDDEN, "Forbidden", Some(forbidden.to_string()))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed", None)
    } else {
        tracing::error!(rejection = ?err, "Unhandled rejection");
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &messages.processing_failed,
            Some(format!("{:?}", err)),
        )
    };

    Ok(response)
}
