//! Thin JSON REST client for venue request/reply surfaces.
//!
//! Order gateway plug-ins and the connectivity check share this client; it
//! owns the timeout policy so callers never hang past their deadlines.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::core::domain::VenueId;
use crate::error::VenueError;

/// JSON REST client bound to one venue's API root.
pub struct RestClient {
    venue: VenueId,
    base: Url,
    http: reqwest::Client,
}

impl RestClient {
    /// Create a client with the given request timeout.
    pub fn new(
        venue: impl Into<VenueId>,
        base: Url,
        timeout: Duration,
    ) -> Result<Self, VenueError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VenueError::Transport(e.to_string()))?;
        Ok(Self {
            venue: venue.into(),
            base,
            http,
        })
    }

    /// The venue this client serves.
    #[must_use]
    pub const fn venue(&self) -> &VenueId {
        &self.venue
    }

    fn endpoint(&self, path: &str) -> Result<Url, VenueError> {
        self.base
            .join(path)
            .map_err(|e| VenueError::Transport(e.to_string()))
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, VenueError> {
        let url = self.endpoint(path)?;
        debug!(venue = %self.venue, %url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(classify_reqwest)?
            .error_for_status()
            .map_err(classify_reqwest)?;
        response.json().await.map_err(classify_reqwest)
    }

    /// POST a JSON body and decode the JSON reply.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, VenueError> {
        let url = self.endpoint(path)?;
        debug!(venue = %self.venue, %url, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(classify_reqwest)?
            .error_for_status()
            .map_err(classify_reqwest)?;
        response.json().await.map_err(classify_reqwest)
    }

    /// Probe the venue's health endpoint; any 2xx counts as reachable.
    pub async fn ping(&self, path: &str) -> Result<(), VenueError> {
        let url = self.endpoint(path)?;
        self.http
            .get(url)
            .send()
            .await
            .map_err(classify_reqwest)?
            .error_for_status()
            .map_err(classify_reqwest)?;
        Ok(())
    }
}

fn classify_reqwest(e: reqwest::Error) -> VenueError {
    if e.is_timeout() {
        VenueError::Timeout
    } else {
        VenueError::Transport(e.to_string())
    }
}
