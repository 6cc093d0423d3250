//! Upload and download handlers.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::header,
    response::{Redirect, Response},
};
use futures::TryStreamExt;
use std::io;
use std::sync::Arc;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::file::DownloadTarget;
use crate::FiledropError;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// Query parameters for downloads.
#[derive(Debug, serde::Deserialize)]
pub struct DownloadQuery {
    /// Name of the file or folder to download.
    pub path: Option<String>,
}

/// Generate a safe Content-Disposition header value for downloads.
///
/// Control characters are dropped and quotes/backslashes replaced in the
/// plain `filename` parameter; non-ASCII names also get an RFC 5987
/// `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let needs_encoding =
        !filename.is_ascii() || filename.chars().any(|c| c.is_control() || c == '"' || c == '\\');
    if !needs_encoding {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();
    let encoded = urlencoding::encode(filename);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

/// POST /upload - Upload a file or a zipped folder.
///
/// Request body: multipart/form-data with a "file" field. The field is
/// streamed to disk. Redirects to the listing on success.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    loop {
        let field = multipart.next_field().await.map_err(|e| {
            tracing::warn!("Failed to read multipart field: {}", e);
            ApiError::bad_request("Failed to parse form")
        })?;
        let Some(field) = field else {
            return Err(ApiError::bad_request("No file in form"));
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        if filename.trim().is_empty() {
            return Err(ApiError::bad_request("Empty filename"));
        }

        let reader =
            StreamReader::new(field.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)));
        tokio::pin!(reader);

        let target = state
            .uploads
            .upload(&filename, reader)
            .await
            .map_err(|e| match e {
                FiledropError::Io(ref err) if is_multipart_error(err) => {
                    tracing::warn!("Multipart body ended early: {}", err);
                    ApiError::bad_request("Failed to parse form")
                }
                other => other.into(),
            })?;
        tracing::info!(final_name = %target.final_name, "Stored upload");

        return Ok(Redirect::to("/"));
    }
}

/// Whether an I/O error came from the multipart body rather than the disk.
fn is_multipart_error(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<MultipartError>())
}

/// GET /download?path=<name> - Download a file, or a folder as zip.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response<Body>, ApiError> {
    let requested = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing path parameter"))?;

    let target = state.downloads.resolve(&requested)?;
    let disposition = content_disposition_header(target.suggested_name());

    let response = match target {
        DownloadTarget::Directory { path, .. } => {
            tracing::info!(path = %path.display(), "Downloading directory as zip");
            let reader = state.downloads.stream_archive(path);
            Response::builder()
                .header(header::CONTENT_TYPE, "application/zip")
                .header(header::CONTENT_DISPOSITION, disposition)
                .body(Body::from_stream(ReaderStream::new(reader)))
        }
        DownloadTarget::File {
            path,
            suggested_name,
            size,
        } => {
            tracing::info!(path = %path.display(), "Downloading file");
            let file = state.downloads.open_file(&path).await?;
            let content_type = mime_guess::from_path(&suggested_name)
                .first_or_octet_stream()
                .to_string();
            Response::builder()
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_DISPOSITION, disposition)
                .header(header::CONTENT_LENGTH, size)
                .body(Body::from_stream(ReaderStream::new(file)))
        }
    };

    response.map_err(|e| {
        tracing::error!("Failed to build response: {}", e);
        ApiError::internal("Failed to build response")
    })
}
