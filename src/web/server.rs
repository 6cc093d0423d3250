//! Web server for filedrop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::compression::predicate::{DefaultPredicate, NotForContentType, Predicate};
use tower_http::compression::CompressionLayer;

use crate::config::{Config, ServerConfig};
use crate::Result;

use super::handlers::AppState;
use super::router::{create_health_router, create_router};

/// Bind to the first free port in `base_port..base_port + attempts`.
///
/// Ports already in use are skipped; any other bind error is returned
/// immediately. Port 0 binds a single ephemeral port.
pub async fn bind_ascending(host: &str, base_port: u16, attempts: u16) -> io::Result<TcpListener> {
    if base_port == 0 {
        return TcpListener::bind((host, 0)).await;
    }

    let mut last_err = None;
    for offset in 0..attempts {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port in use, trying next");
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrInUse, "no port available")
    }))
}

/// Responses worth gzipping. Zip archives are already compressed.
fn compression_predicate() -> impl Predicate {
    DefaultPredicate::new().and(NotForContentType::const_new("application/zip"))
}

/// HTTP file server.
pub struct FileServer {
    /// Server configuration.
    server_config: ServerConfig,
    /// Application state.
    app_state: Arc<AppState>,
    /// Upload body limit in bytes.
    max_upload_size: u64,
}

impl FileServer {
    /// Create a new server. The serve root is created if missing.
    pub fn new(config: &Config) -> Result<Self> {
        let app_state = AppState::from_config(&config.files)?;
        tracing::info!("Serving directory: {}", app_state.root.path().display());

        Ok(Self {
            server_config: config.server.clone(),
            app_state: Arc::new(app_state),
            max_upload_size: config.files.max_upload_size_bytes(),
        })
    }

    /// Get the application state.
    pub fn app_state(&self) -> &Arc<AppState> {
        &self.app_state
    }

    async fn bind(&self) -> io::Result<(TcpListener, axum::Router)> {
        let router = create_router(self.app_state.clone(), self.max_upload_size)
            .merge(create_health_router())
            .layer(CompressionLayer::new().compress_when(compression_predicate()));

        let listener = bind_ascending(
            &self.server_config.host,
            self.server_config.port,
            self.server_config.port_attempts,
        )
        .await?;

        tracing::info!("Server listening on http://{}", listener.local_addr()?);
        Ok((listener, router))
    }

    /// Run the server.
    pub async fn run(self) -> io::Result<()> {
        let (listener, router) = self.bind().await?;
        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_bind_ascending_skips_used_port() {
        let taken = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let taken_port = taken.local_addr().unwrap().port();
        if taken_port == u16::MAX {
            return;
        }

        let listener = bind_ascending("127.0.0.1", taken_port, 20).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        assert_ne!(port, taken_port);
        assert!(port > taken_port);
    }

    #[tokio::test]
    async fn test_bind_ascending_exhausted() {
        let taken = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let taken_port = taken.local_addr().unwrap().port();

        let result = bind_ascending("127.0.0.1", taken_port, 1).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::AddrInUse);
    }

    #[tokio::test]
    async fn test_file_server_run() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.files.root = temp_dir.path().join("share").display().to_string();

        let server = FileServer::new(&config).unwrap();
        assert!(temp_dir.path().join("share").is_dir());

        let addr = server.run_with_addr().await.unwrap();
        assert_ne!(addr.port(), 0);

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        let (_, body) = response.split_once("\r\n\r\n").unwrap();
        // Chunked or not depending on the compression layer.
        assert!(body == "OK" || body.starts_with("2\r\nOK\r\n"), "{body:?}");
    }

    #[test]
    fn test_compression_skips_zip_archives() {
        let predicate = compression_predicate();
        let response = |content_type: &str| {
            axum::http::Response::builder()
                .header(axum::http::header::CONTENT_TYPE, content_type)
                .body(axum::body::Body::from("x".repeat(4096)))
                .unwrap()
        };

        assert!(!predicate.should_compress(&response("application/zip")));
        assert!(predicate.should_compress(&response("text/html; charset=utf-8")));
        assert!(predicate.should_compress(&response("application/json")));
    }
}
