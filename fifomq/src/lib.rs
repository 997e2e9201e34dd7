//! In-memory FIFO message queues served over HTTP.
//!
//! Producers put values into named queues, consumers get the oldest value and may wait for one
//! with a timeout. See [`queue::manager::QueueManager`] for the semantics and [`restapi`] for the
//! HTTP mapping.
pub mod config;
pub mod error;
pub mod queue;
pub mod restapi;
#[cfg(test)]
mod tests;

use error::Result;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use log::debug;
use queue::manager::QueueManager;
use tokio::net::TcpListener;

/// Everything a request handler needs. It is created once at startup and cloned into every
/// connection.
#[derive(Clone)]
pub struct Context {
    pub queue_manager: QueueManager,
}

#[macro_export]
macro_rules! logerr {
    ($val:expr) => {
        if let Err(e) = $val {
            log::error!("Error {:?}", e);
        }
    };
}

/// Accept connections and serve each of them in its own task until the listener fails.
pub async fn serve(listener: TcpListener, context: Context) -> Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        let ctx = context.clone();

        debug!("Client connected {}", peer);

        tokio::spawn(async move {
            let service = service_fn(move |req| restapi::route(req, ctx.clone()));

            logerr!(http1::Builder::new().serve_connection(TokioIo::new(socket), service).await);

            debug!("Client disconnected {}", peer);
        });
    }
}
