//! Errors raised by the request/response adapter and the AMP sanitizer.
//!
//! All of them are returned synchronously; the routing layer decides how to
//! map them onto an HTTP error response (see [`Error::code`]).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("header name is required")]
    MissingHeaderName,

    #[error("redirect url is required")]
    MissingRedirectUrl,

    #[error("could not parse request headers: {0}")]
    HeaderBlob(String),

    #[error("malformed host header: {0}")]
    MalformedHost(String),

    #[error("could not parse request body as {format}: {message}")]
    BodyParse {
        format: &'static str,
        message: String,
    },

    #[error("malformed upstream set-cookie map: {0}")]
    MalformedUpstreamCookies(&'static str),

    #[error("response has already been sent")]
    AlreadySent,

    #[error("invalid selector: {0}")]
    Selector(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Wraps a body parser failure, keeping the original message.
    pub fn body_parse(format: &'static str, err: impl std::fmt::Display) -> Self {
        Error::BodyParse {
            format,
            message: err.to_string(),
        }
    }

    /// HTTP status the routing layer should answer with.
    pub fn code(&self) -> u16 {
        match self {
            Self::BodyParse { .. } | Self::HeaderBlob(_) | Self::MalformedHost(_) => 400,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
