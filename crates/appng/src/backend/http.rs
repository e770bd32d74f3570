//! Blocking HTTP backend.
//!
//! A session is established once by posting the shared secret to the base
//! URL; the agent's cookie jar carries it on every later request.

use crate::backend::{Backend, Method};
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use ureq::Agent;
use ureq::http::Response;

const XML: &str = "application/xml";

/// `<pre>` blocks of an HTML error page.
static PRE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<pre[^>]*>(.*?)</pre>").expect("PRE_BLOCK is a valid regex pattern")
});

/// Options for the HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Overall timeout per request.
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

/// appNGizer backend over HTTP.
pub struct HttpBackend {
    agent: Agent,
    base: String,
}

impl HttpBackend {
    /// Connect and authenticate with the shared secret.
    pub fn connect(url: &str, secret: &str, options: &HttpOptions) -> Result<Self> {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(options.timeout))
            .build()
            .into();
        let backend = Self {
            agent,
            base: url.trim_end_matches('/').to_string(),
        };
        backend.authenticate(secret)?;
        log::info!("Authenticated at {}", backend.base);
        Ok(backend)
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}/", self.base, path)
    }

    fn authenticate(&self, secret: &str) -> Result<()> {
        let response = self
            .agent
            .post(&self.url(""))
            .header("Content-Type", "text/plain")
            .send(secret)?;
        Self::finish("/", response).map(|_| ())
    }

    fn finish(path: &str, mut response: Response<ureq::Body>) -> Result<Option<String>> {
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        log::debug!("{status} from {path} ({} bytes)", body.len());

        if (200..300).contains(&status) {
            return Ok(Some(body).filter(|b| !b.trim().is_empty()));
        }
        let message = if status == 500 {
            extract_exception(&body)
        } else {
            None
        };
        Err(Error::from_status(status, path, message))
    }
}

impl Backend for HttpBackend {
    fn request(&self, method: Method, path: &str, body: Option<&str>) -> Result<Option<String>> {
        let url = self.url(path);
        log::debug!("{method} {url}");

        let response = match method {
            Method::Get => self.agent.get(&url).header("Accept", XML).call()?,
            Method::Delete => self.agent.delete(&url).header("Accept", XML).call()?,
            Method::Post => self
                .agent
                .post(&url)
                .header("Content-Type", XML)
                .header("Accept", XML)
                .send(body.unwrap_or_default())?,
            Method::Put => self
                .agent
                .put(&url)
                .header("Content-Type", XML)
                .header("Accept", XML)
                .send(body.unwrap_or_default())?,
        };
        Self::finish(path, response)
    }
}

/// Exception text from the `<pre>` blocks of a server error page.
pub fn extract_exception(page: &str) -> Option<String> {
    let texts: Vec<&str> = PRE_BLOCK
        .captures_iter(page)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|text| text.contains("Exception"))
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join(" "))
    }
}
