//! HTTP/1 accept loop.
//!
//! Runs the router on hyper directly instead of `axum::serve`, because an
//! Elixir transport failure must reach REMS as a dropped connection rather
//! than as a made-up status. Handlers mark such responses with
//! [`ConnectionFault`]; the connection service turns the marker into a
//! service error and hyper aborts the connection without writing a response.

use std::future::Future;
use std::io;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    response::IntoResponse,
    Router,
};
use hyper::{body::Incoming, server::conn::http1, service::service_fn};
use hyper_util::{rt::TokioIo, server::graceful::GracefulShutdown};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceExt;
use tracing::{debug, info, warn};

use crate::elixir::ForwardError;

/// How long in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Marks a response whose connection must be aborted instead of answered.
#[derive(Debug, Clone, Error)]
#[error("aborting connection: {0}")]
pub struct ConnectionFault(pub String);

impl IntoResponse for ForwardError {
    fn into_response(self) -> axum::response::Response {
        let mut response = StatusCode::BAD_GATEWAY.into_response();
        response
            .extensions_mut()
            .insert(ConnectionFault(self.to_string()));
        response
    }
}

/// Route one request, converting a [`ConnectionFault`] into a service error.
async fn relay(
    app: Router,
    request: Request<Incoming>,
) -> Result<Response<Body>, ConnectionFault> {
    let response = match app.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    match response.extensions().get::<ConnectionFault>() {
        Some(fault) => Err(fault.clone()),
        None => Ok(response),
    }
}

/// Accept connections until `shutdown` resolves, then drain in-flight ones.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()>,
{
    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "accept_failed");
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        let app = app.clone();
        let service = service_fn(move |request| relay(app.clone(), request));
        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        let conn = graceful.watch(conn);

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(remote = %remote, error = %e, "connection_closed_with_error");
            }
        });
    }

    drop(listener);

    tokio::select! {
        _ = graceful.shutdown() => info!("connections_drained"),
        _ = tokio::time::sleep(SHUTDOWN_GRACE) => warn!(
            grace_seconds = SHUTDOWN_GRACE.as_secs(),
            "connections_drain_timeout"
        ),
    }

    Ok(())
}
