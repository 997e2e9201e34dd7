//! HTTP interface of the queues. The path of the request is the name of the queue.
//!
//! - `PUT /<queue>?v=<value>` puts the value into the queue.
//! - `GET /<queue>[?timeout=<seconds>]` gets the oldest message, waiting at most `timeout`
//!   seconds if the queue is empty. It responds with 404 if there is no message.
use crate::error::{ClientError, RequestError};
use crate::Context;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode, Uri};
use log::debug;
use std::borrow::Cow;
use std::convert::Infallible;
use std::time::Duration;
use url::form_urlencoded;

const PUT_VALUE_KEY: &str = "v";
const GET_TIMEOUT_KEY: &str = "timeout";

type HttpResult = std::result::Result<Response<Full<Bytes>>, RequestError>;

pub async fn route<B>(req: Request<B>, context: Context) -> Result<Response<Full<Bytes>>, Infallible> {
    // The body is never read, values come in the query string.
    let (req, _) = req.into_parts();

    let response = match handle(&req, &context).await {
        Ok(response) => response,
        Err(e) => {
            debug!("{} {} -> {}", req.method, req.uri, e);

            e.into()
        }
    };

    Ok(response)
}

async fn handle(req: &Parts, context: &Context) -> HttpResult {
    let queue_name = match queue_name(&req.uri) {
        Some(name) if !name.is_empty() => name,
        Some(_) => return ClientError::BadRequest.into_result("Queue name is missing"),
        None => return ClientError::BadRequest.into_result("Queue name is not valid UTF-8"),
    };

    match req.method {
        Method::PUT => {
            let value = match query_param(&req.uri, PUT_VALUE_KEY) {
                Some(value) if !value.is_empty() => value,
                _ => return ClientError::BadRequest.into_result("Value is missing"),
            };

            context.queue_manager.put(&queue_name, value);

            Ok(response(StatusCode::OK, Bytes::new()))
        }
        Method::GET => {
            let timeout = query_param(&req.uri, GET_TIMEOUT_KEY).and_then(|t| parse_timeout(&t));

            match context.queue_manager.get(&queue_name, timeout).await {
                Some(value) => {
                    let mut resp = response(StatusCode::OK, Bytes::from(value));

                    resp.headers_mut()
                        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));

                    Ok(resp)
                }
                None => ClientError::NotFound.into_result("No message"),
            }
        }
        _ => ClientError::BadRequest.into_result("Method is not supported"),
    }
}

fn response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(body));

    *resp.status_mut() = status;

    resp
}

/// The decoded path without the leading slash, `None` if it doesn't decode to UTF-8.
fn queue_name(uri: &Uri) -> Option<Cow<'_, str>> {
    let path = uri.path();

    urlencoding::decode(path.strip_prefix('/').unwrap_or(path)).ok()
}

/// The first value of the query parameter, decoded.
fn query_param(uri: &Uri, key: &str) -> Option<String> {
    let query = uri.query()?;

    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Timeout is in whole seconds, anything else means no timeout.
fn parse_timeout(value: &str) -> Option<Duration> {
    value.parse::<u64>().ok().map(Duration::from_secs)
}
