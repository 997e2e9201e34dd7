//! End-to-end tests which start the HTTP server on an ephemeral port and talk to it with a real
//! HTTP client.

use crate::{queue::manager::QueueManager, Context};
use anyhow::Result;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::{header::HOST, Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

/// A running server with a handle to its queue manager, so tests can look into the queues.
struct TestServer {
    addr: SocketAddr,
    qm: QueueManager,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let qm = QueueManager::new();
        let context = Context {
            queue_manager: qm.clone(),
        };

        tokio::spawn(async move {
            crate::logerr!(crate::serve(listener, context).await);
        });

        Self { addr, qm }
    }

    /// Send a request on a fresh connection and return the status and the body.
    async fn request(&self, method: Method, path_and_query: &str) -> Result<(StatusCode, String)> {
        let stream = TcpStream::connect(self.addr).await?;
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;

        tokio::spawn(async move {
            crate::logerr!(conn.await);
        });

        let req = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header(HOST, self.addr.to_string())
            .body(Empty::<Bytes>::new())?;

        let resp = sender.send_request(req).await?;
        let status = resp.status();
        let body = resp.into_body().collect().await?.to_bytes();

        Ok((status, String::from_utf8(body.to_vec())?))
    }

    async fn put(&self, queue: &str, value: &str) -> Result<StatusCode> {
        let (status, _) = self.request(Method::PUT, &format!("/{queue}?v={value}")).await?;

        Ok(status)
    }

    async fn get(&self, queue: &str) -> Result<(StatusCode, String)> {
        self.request(Method::GET, &format!("/{queue}")).await
    }

    async fn get_with_timeout(&self, queue: &str, seconds: u64) -> Result<(StatusCode, String)> {
        self.request(Method::GET, &format!("/{queue}?timeout={seconds}")).await
    }

    /// Yield until the given number of consumers are parked on the queue.
    async fn wait_for_waiters(&self, queue: &str, count: usize) {
        while self.qm.stats(queue).map(|s| s.waiters) != Some(count) {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }
}
