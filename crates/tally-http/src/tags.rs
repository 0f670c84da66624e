//! Request/response to tag mapping

use tally_core::Tag;

use crate::{HttpRequest, HttpResponse, Outcome};

const UNKNOWN: &str = "UNKNOWN";
const NONE: &str = "None";

/// Builds conventional HTTP tags
pub struct HttpTags;

impl HttpTags {
    /// `method` tag, `UNKNOWN` without a request
    pub fn method<R: HttpRequest + ?Sized>(request: Option<&R>) -> Tag {
        Tag::new("method", request.map_or(UNKNOWN, |r| r.method()))
    }

    /// `status` tag with the numeric code, `UNKNOWN` without a response
    pub fn status<R: HttpResponse + ?Sized>(response: Option<&R>) -> Tag {
        match response {
            Some(response) => Tag::new("status", response.status_code().to_string()),
            None => Tag::new("status", UNKNOWN),
        }
    }

    /// `exception` tag with the error's type name, `None` without an error.
    ///
    /// The name comes from the static type `E`, so a `Box<dyn Error>` is
    /// tagged `Box` and a `&dyn Error` is tagged `Error`. Callers holding
    /// type-erased errors should use [`HttpTags::exception_named`].
    pub fn exception<E: ?Sized>(error: Option<&E>) -> Tag {
        match error {
            Some(_) => Tag::new("exception", simple_type_name::<E>()),
            None => Tag::new("exception", NONE),
        }
    }

    /// `exception` tag with a caller-supplied error name, `None` if absent or blank
    pub fn exception_named(name: Option<&str>) -> Tag {
        match name.map(str::trim) {
            Some(name) if !name.is_empty() => Tag::new("exception", name),
            _ => Tag::new("exception", NONE),
        }
    }

    /// `outcome` tag from the status class, `UNKNOWN` without a response
    pub fn outcome<R: HttpResponse + ?Sized>(response: Option<&R>) -> Tag {
        response.map_or(Outcome::Unknown, |r| Outcome::for_status(r.status_code())).as_tag()
    }

    /// `uri` tag with the matched route, `UNKNOWN` if nothing matched
    pub fn uri<R: HttpRequest + ?Sized>(request: &R) -> Tag {
        Tag::new("uri", request.route().unwrap_or(UNKNOWN))
    }
}

/// Last path segment of the type name, without generic arguments
fn simple_type_name<E: ?Sized>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    match base.rsplit("::").next() {
        Some(simple) if !simple.trim().is_empty() => simple,
        _ => full,
    }
}
