//! Loading of text resources from a local path or an HTTP(S) URL.
//!
//! Both the rendering configuration and delta files may live next to the
//! process or on a web server; callers pass the location string as given on
//! the command line.

use tracing::debug;
use url::Url;

use crate::error::FetchError;

/// Return true when `location` is an `http://` or `https://` URL.
pub fn is_remote(location: &str) -> bool {
    Url::parse(location)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Read the whole resource at `location` as UTF-8 text.
pub async fn fetch_text(location: &str) -> Result<String, FetchError> {
    if is_remote(location) {
        debug!(location = location, "Fetching remote resource");
        let http_err = |e: reqwest::Error| FetchError::Http {
            location: location.to_string(),
            message: e.to_string(),
        };
        reqwest::get(location)
            .await
            .and_then(|response| response.error_for_status())
            .map_err(http_err)?
            .text()
            .await
            .map_err(http_err)
    } else {
        debug!(location = location, "Reading local resource");
        tokio::fs::read_to_string(location)
            .await
            .map_err(|e| FetchError::Io {
                location: location.to_string(),
                message: e.to_string(),
            })
    }
}
