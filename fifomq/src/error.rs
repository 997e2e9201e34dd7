use std::fmt;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

/// The own result type where the error part is a async friendly error.
pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand of a boxed Send, Sync error.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Outcomes of a request which are reported to the client with a non-success status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientError {
    BadRequest = 400,
    NotFound = 404,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RequestError {
    pub code: ClientError,
    pub text: String,
}

impl ClientError {
    pub fn status(self) -> StatusCode {
        match self {
            ClientError::BadRequest => StatusCode::BAD_REQUEST,
            ClientError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn into_request_error(self, text: &str) -> RequestError {
        RequestError {
            code: self,
            text: text.to_owned(),
        }
    }

    pub fn into_result<T>(self, text: &str) -> std::result::Result<T, RequestError> {
        Err(self.into_request_error(text))
    }
}

/// The response of a failed request has only the status code, the body is empty.
impl From<RequestError> for Response<Full<Bytes>> {
    fn from(err: RequestError) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::new()));

        *response.status_mut() = err.code.status();

        response
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code as u16, self.text)
    }
}

impl std::error::Error for RequestError {}
