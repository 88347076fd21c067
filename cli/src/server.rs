//! HTTP/1 endpoint serving the scrape.
//!
//! Every request to the metrics path runs a full describe + collect + render
//! cycle. Rendering failures answer 500 for that scrape only.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, warn};
use wrtmon_core::exposition;
use wrtmon_core::registry::CollectorRegistry;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Clone)]
pub struct MetricsServer {
    registry: Arc<CollectorRegistry>,
    metrics_path: Arc<str>,
}

impl MetricsServer {
    pub fn new(registry: CollectorRegistry, metrics_path: &str) -> Self {
        Self {
            registry: Arc::new(registry),
            metrics_path: Arc::from(metrics_path),
        }
    }

    pub async fn bind(listen_address: &str) -> anyhow::Result<TcpListener> {
        TcpListener::bind(listen_address)
            .await
            .with_context(|| format!("failed to bind {listen_address}"))
    }

    /// Accepts connections until the task is dropped.
    pub async fn run(self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("connection from {peer}");
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = server.serve_connection(stream).await {
                            debug!("connection from {peer} ended: {e}");
                        }
                    });
                }
                Err(e) => warn!("accept failed: {e}"),
            }
        }
    }

    async fn serve_connection(self, stream: TcpStream) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let service = service_fn(move |req: Request<Incoming>| {
            let server = self.clone();
            async move { Ok::<_, hyper::Error>(server.respond(req.uri().path()).await) }
        });
        http1::Builder::new().serve_connection(io, service).await
    }

    pub async fn respond(&self, path: &str) -> Response<Full<Bytes>> {
        if path == &*self.metrics_path {
            self.scrape().await
        } else if path == "/" {
            reply(StatusCode::OK, HTML_CONTENT_TYPE, home_page(&self.metrics_path))
        } else {
            reply(StatusCode::NOT_FOUND, "text/plain", "not found\n")
        }
    }

    async fn scrape(&self) -> Response<Full<Bytes>> {
        let start: Instant = Instant::now();
        let descriptors = self.registry.describe();
        let samples = self.registry.collect().await;

        match exposition::render(&descriptors, &samples) {
            Ok(body) => {
                debug!("scrape rendered {} sample(s) in {:?}", samples.len(), start.elapsed());
                reply(StatusCode::OK, exposition::content_type(), body)
            }
            Err(e) => {
                error!("scrape failed: {e}");
                reply(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "text/plain",
                    format!("error rendering metrics: {e}\n"),
                )
            }
        }
    }
}

fn home_page(metrics_path: &str) -> String {
    format!(
        "<html>\n\
         <head><title>OpenWRT Exporter</title></head>\n\
         <body>\n\
         <h1>OpenWRT Exporter</h1>\n\
         <p><a href=\"{metrics_path}\">Metrics</a></p>\n\
         </body>\n\
         </html>"
    )
}

fn reply(
    status: StatusCode,
    content_type: impl AsRef<str>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    if let Ok(value) = content_type.as_ref().parse() {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
