use std::net::SocketAddr;

use anyhow::{Context, Result};
use log::info;
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{api, AppState};

/// A running HTTP server. Dropping the handle leaves the server running;
/// call [`ServerHandle::stop`] to drain in-flight requests and exit.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: Option<JoinHandle<Result<()>>>,
    cancel_token: CancellationToken,
}

impl ServerHandle {
    pub fn start(listener: TcpListener, state: AppState) -> Result<Self> {
        let addr = listener
            .local_addr()
            .context("failed to read listener address")?;

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let app = api::router(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token_clone.cancelled().await })
                .await
                .context("HTTP server failed")
        });

        info!("Listening on http://{addr}");

        Ok(Self {
            addr,
            handle: Some(handle),
            cancel_token,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn stop(mut self) -> Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.handle.take() {
            handle.await.context("server task failed to join")??;
        }
        info!("Server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::{db::Database, settings::SettingsStore};

    #[tokio::test]
    async fn serves_requests_until_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            db: Database::open_in_memory().unwrap(),
            settings: Arc::new(SettingsStore::new(dir.path().to_path_buf()).unwrap()),
            active_study_id: None,
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = ServerHandle::start(listener, state).unwrap();

        let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        assert!(response.ends_with("ok"));

        server.stop().await.unwrap();
    }
}
