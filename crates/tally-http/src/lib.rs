//! HTTP tag helpers for tally
//!
//! Translates request/response pairs into the conventional `method`,
//! `status`, `exception`, `outcome` and `uri` tags, with fixed fallback
//! values when a request or response is not available.

mod outcome;
mod tags;

pub use outcome::Outcome;
pub use tags::HttpTags;

/// The parts of an HTTP request that tags are derived from
pub trait HttpRequest {
    /// Upper-case method, e.g. `GET`
    fn method(&self) -> &str;

    /// Matched route template, e.g. `/users/{id}`; `None` if no route matched
    fn route(&self) -> Option<&str>;
}

/// The parts of an HTTP response that tags are derived from
pub trait HttpResponse {
    fn status_code(&self) -> u16;
}
