//! HTTP image source.

use futures_util::{StreamExt, stream};
use reqwest::Url;
use tracing::debug;

use crate::domain::errors::{EngineError, FetchError};
use crate::domain::ports::ByteStream;

use super::FetchTimeouts;

const MAX_REDIRECTS: usize = 10;

/// Downloads images with a single GET, following redirects.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    timeouts: FetchTimeouts,
}

impl HttpSource {
    /// Creates a source whose client enforces `timeouts`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeouts: FetchTimeouts) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .read_timeout(timeouts.read)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("pixcache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EngineError::HttpClient {
                message: e.to_string(),
            })?;
        Ok(Self { client, timeouts })
    }

    /// Sends the request and streams the body chunk by chunk.
    ///
    /// # Errors
    /// Returns error if the URL is malformed, the connection fails or the
    /// server answers with a non-success status.
    pub async fn open(&self, url: &str) -> Result<ByteStream, FetchError> {
        let parsed =
            Url::parse(url).map_err(|e| FetchError::invalid_identifier(url, e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_identifier(
                url,
                format!("unsupported scheme {}", parsed.scheme()),
            ));
        }

        debug!(url = %parsed, "Downloading image");
        let timeouts = self.timeouts;
        let classify = move |e: reqwest::Error| {
            FetchError::from_http(&e, timeouts.connect, timeouts.read)
        };
        let response = self.client.get(parsed).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = stream::try_unfold(response, move |mut response| async move {
            let chunk = response.chunk().await.map_err(classify)?;
            Ok::<_, FetchError>(chunk.map(|bytes| (bytes, response)))
        });
        Ok(body.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    #[tokio::test]
    async fn test_rejects_malformed_url() {
        let source = HttpSource::new(FetchTimeouts::default()).unwrap();
        let err = source.open("not a url").await.err().unwrap();
        assert!(matches!(err, FetchError::InvalidIdentifier { .. }));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_scheme() {
        let source = HttpSource::new(FetchTimeouts::default()).unwrap();
        let err = source.open("ftp://example.com/a.png").await.err().unwrap();
        assert!(matches!(err, FetchError::InvalidIdentifier { .. }));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                std::thread::sleep(Duration::from_secs(5));
                drop(stream);
            }
        });

        let timeouts = FetchTimeouts {
            connect: Duration::from_secs(5),
            read: Duration::from_millis(200),
        };
        let source = HttpSource::new(timeouts).unwrap();
        let err = source
            .open(&format!("http://{addr}/a.png"))
            .await
            .err()
            .unwrap();

        assert!(err.is_timeout(), "unexpected error: {err}");
        assert!(matches!(err, FetchError::Timeout { after } if after == timeouts.read));
    }
}
