//! ProxyServer struct and accept loop.

use std::net::SocketAddr;
use std::sync::Arc;

use super::handler::ProxyEngine;
use super::network::create_listener;
use crate::control;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info};

/// The proxy server: one engine, one listener, one task per connection.
pub struct ProxyServer {
    listener: TcpListener,
    engine: Arc<ProxyEngine>,
}

impl ProxyServer {
    /// Bind the listener eagerly so callers learn the effective address
    /// (useful with port 0) before the accept loop starts.
    pub fn bind(addr: SocketAddr, engine: ProxyEngine) -> Result<Self, anyhow::Error> {
        let listener = create_listener(addr)?;
        Ok(Self {
            listener,
            engine: Arc::new(engine),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Accept connections and handle requests until the process exits.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = self.listener.local_addr()?;
        info!("listening on http://{addr}");
        match self.engine.scenario_count() {
            Some(count) => info!("loaded {count} scenarios"),
            None => info!("no scenario configuration, forwarding all traffic"),
        }
        if let Some(path) = self.engine.recording_path() {
            info!("recording forwarded traffic to {}", path.display());
        }

        loop {
            let (stream, remote_addr) = self.listener.accept().await?;
            let engine = Arc::clone(&self.engine);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let engine = Arc::clone(&engine);
                    async move {
                        // Control-plane requests share the listener but never
                        // reach the mock-or-forward path.
                        if req.uri().path().starts_with(control::CONTROL_PREFIX) {
                            Ok(control::route_request(req, &engine).await)
                        } else {
                            engine.handle(req).await
                        }
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("error serving connection from {remote_addr}: {err}");
                }
            });
        }
    }
}
