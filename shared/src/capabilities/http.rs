use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crux_http::Http;

use crate::event::Event;

pub type HttpCapability = Http<Event>;

pub const MAX_URL_LENGTH: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatedUrl {
    url: String,
    host: String,
}

impl ValidatedUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, HttpError> {
        let url = url.into();
        let parsed = Self::validate(&url)?;
        let host = parsed
            .host_str()
            .map(str::to_lowercase)
            .unwrap_or_default();

        Ok(Self {
            url: parsed.to_string(),
            host,
        })
    }

    pub fn from_url(url: &Url) -> Result<Self, HttpError> {
        Self::new(url.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn validate(url: &str) -> Result<Url, HttpError> {
        if url.trim().is_empty() {
            return Err(HttpError::InvalidUrl {
                url: String::new(),
                reason: "URL cannot be empty".to_string(),
            });
        }

        if url.len() > MAX_URL_LENGTH {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: format!("URL exceeds maximum length of {MAX_URL_LENGTH} bytes"),
            });
        }

        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl {
            url: Self::truncate_url(url),
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: format!("invalid scheme '{scheme}', only 'http' and 'https' are allowed"),
            });
        }

        if parsed.host_str().is_none() {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: "URL must have a host".to_string(),
            });
        }

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: "credentials in URL are not allowed".to_string(),
            });
        }

        Ok(parsed)
    }

    fn truncate_url(url: &str) -> String {
        if url.len() <= 100 {
            url.to_string()
        } else {
            let cut = (0..=100).rev().find(|i| url.is_char_boundary(*i)).unwrap_or(0);
            format!("{}...", &url[..cut])
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum HttpError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("serialization error: {message}")]
    Serialization { message: String },

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("HTTP error {status}")]
    Status { status: String },

    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },
}

impl HttpError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, HttpError::Status { status } if status.starts_with('4'))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, HttpError::Status { status } if status.starts_with('5'))
    }
}

/// Posts `body` as JSON and decodes a JSON response of type `T`.
///
/// Non-2xx statuses and missing bodies both surface as errors; the caller
/// never sees a partially decoded value.
pub fn post_json<B, T, F>(
    http: &HttpCapability,
    url: &ValidatedUrl,
    body: &B,
    make_event: F,
) -> Result<(), HttpError>
where
    B: Serialize,
    T: DeserializeOwned + Send + 'static,
    F: FnOnce(Result<T, HttpError>) -> Event + Send + 'static,
{
    tracing::debug!(host = url.host(), "POST {}", url.as_str());

    http.post(url.as_str())
        .header("Content-Type", "application/json")
        .body_json(body)
        .map_err(|e| HttpError::Serialization {
            message: e.to_string(),
        })?
        .expect_json::<T>()
        .send(move |result| make_event(decode_response(result)));

    Ok(())
}

fn decode_response<T, E: std::fmt::Display>(
    result: Result<crux_http::Response<T>, E>,
) -> Result<T, HttpError> {
    match result {
        Ok(mut response) => {
            let status = response.status();
            if !status.is_success() {
                return Err(HttpError::Status {
                    status: status.to_string(),
                });
            }
            response.take_body().ok_or_else(|| HttpError::InvalidResponse {
                reason: "empty response body".to_string(),
            })
        }
        Err(e) => Err(HttpError::Transport {
            message: e.to_string(),
        }),
    }
}
