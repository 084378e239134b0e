//! The network boundary: one request in, one finished exchange out.
//!
//! Implementations must never fail outright. Connection errors, timeouts
//! and cancellation all come back as an [`Exchange`] whose state says what
//! happened, so the workflow can render them as ordinary replies.

mod http;

use std::time::Duration;

use crate::model::ParsedUrl;
use crate::reply::RequestState;

pub use http::HttpTransport;

/// An outgoing POST.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: ParsedUrl,
    pub content_type: String,
    pub body: Vec<u8>,
    pub timeout: Duration,

    /// Shown by progress surfaces while the request is outstanding.
    pub activity: String,
}

/// The raw outcome of a request.
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    pub state: RequestState,
    pub connected: bool,
    pub status_code: u16,
    pub body: String,
}

impl Exchange {
    /// The server could not be reached at all.
    pub fn unreachable() -> Self {
        Self {
            state: RequestState::Failed,
            ..Self::default()
        }
    }

    /// The user gave up waiting.
    pub fn cancelled() -> Self {
        Self {
            state: RequestState::Cancelled,
            ..Self::default()
        }
    }

    /// A response arrived with this status.
    pub fn response(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            state: state_for_status(status_code),
            connected: true,
            status_code,
            body: body.into(),
        }
    }
}

/// Map an HTTP status to the request state it implies.
pub fn state_for_status(code: u16) -> RequestState {
    match code {
        200..=299 => RequestState::Completed,
        401 | 403 => RequestState::Unauthorized,
        _ => RequestState::Failed,
    }
}

/// Sends requests for the workflow.
pub trait Transport {
    /// POST `request` and wait for the outcome.
    ///
    /// `progress` is called periodically while waiting; returning `false`
    /// abandons the request, which then reports [`RequestState::Cancelled`].
    fn exchange(&self, request: &Request, progress: &mut dyn FnMut(&str) -> bool) -> Exchange;

    /// Check that the server accepts connections at all.
    fn probe(&self, url: &ParsedUrl, timeout: Duration) -> bool;
}
