//! Listing handlers.

use axum::{extract::State, response::Html, Json};
use std::fmt::Write;
use std::sync::Arc;

use crate::file::DirectoryListing;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET / - HTML page with the upload form and the current listing.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let listing = read_listing(&state)?;
    Ok(Html(render_index(&listing, state.uploads.folder_marker())))
}

/// GET /api/entries - The current listing as JSON.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DirectoryListing>, ApiError> {
    Ok(Json(read_listing(&state)?))
}

fn read_listing(state: &AppState) -> Result<DirectoryListing, ApiError> {
    DirectoryListing::read(state.root.path()).map_err(|e| {
        tracing::error!("Failed to read directory: {}", e);
        ApiError::internal("Failed to read directory")
    })
}

/// Render the listing page.
pub fn render_index(listing: &DirectoryListing, folder_marker: &str) -> String {
    let mut page = String::new();
    page.push_str(
        "<!DOCTYPE html>\n<html>\n<head>\n    <title>File Manager</title>\n    \
         <meta charset=\"UTF-8\">\n</head>\n<body>\n    <h1>Files and Folders</h1>\n",
    );
    let _ = write!(
        page,
        "    <p>Upload a file directly. To upload a folder, zip it, rename the archive \
         to end in <code>.{}</code> and upload it; it will be extracted.</p>\n",
        escape_html(folder_marker)
    );
    page.push_str(
        "    <form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\n        \
         <input type=\"file\" name=\"file\" required>\n        \
         <input type=\"submit\" value=\"Upload\">\n    </form>\n",
    );

    page.push_str("    <h2>Folders</h2>\n    <ul>\n");
    for name in &listing.directories {
        let _ = writeln!(
            page,
            "        <li><a href=\"/download?path={}\">{}</a> (download as zip)</li>",
            urlencoding::encode(name),
            escape_html(name)
        );
    }
    page.push_str("    </ul>\n    <h2>Files</h2>\n    <ul>\n");
    for name in &listing.files {
        let _ = writeln!(
            page,
            "        <li><a href=\"/download?path={}\">{}</a></li>",
            urlencoding::encode(name),
            escape_html(name)
        );
    }
    page.push_str("    </ul>\n</body>\n</html>\n");
    page
}

/// Escape text for HTML element content and attribute values.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
