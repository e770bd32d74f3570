//! Transport seam between the client and an appNGizer endpoint.
//!
//! [`HttpBackend`] talks to a live instance. [`MockBackend`] keeps documents
//! in memory and imitates the server's path semantics for tests:
//!
//! ```
//! use appng::backend::{Backend, Method, MockBackend};
//!
//! let mock = MockBackend::new();
//! mock.insert_xml("/site/s1", r#"<site name="s1"><host>s1.local</host></site>"#).unwrap();
//!
//! let body = mock.request(Method::Get, "/site", None).unwrap().unwrap();
//! assert!(body.contains("s1.local"));
//! assert!(mock.request(Method::Get, "/site/s2", None).is_err());
//! ```

pub mod http;
pub mod mock;

pub use http::{HttpBackend, HttpOptions};
pub use mock::MockBackend;

use crate::error::Result;
use std::fmt;

/// HTTP verb of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Whether the request may change remote state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend trait for issuing requests.
///
/// Paths are absolute resource addresses such as `/site/s1`. A successful
/// response yields its body, or `None` when the body is empty. Non-success
/// statuses map to the typed errors of [`crate::Error`].
pub trait Backend: Send + Sync {
    /// Send one request with an optional XML body.
    fn request(&self, method: Method, path: &str, body: Option<&str>) -> Result<Option<String>>;
}
