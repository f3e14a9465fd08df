use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::ExplorerError;

pub trait DatasetClient: Send + Sync {
    fn download(&self, url: &str) -> Result<Vec<u8>, ExplorerError>;
}

#[derive(Clone)]
pub struct HttpDatasetClient {
    client: Client,
}

impl HttpDatasetClient {
    pub fn new(timeout: Duration) -> Result<Self, ExplorerError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("emissions-explorer/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ExplorerError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| ExplorerError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, ExplorerError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "request failed".to_string());
        Err(ExplorerError::HttpStatus { status, message })
    }
}

impl DatasetClient for HttpDatasetClient {
    fn download(&self, url: &str) -> Result<Vec<u8>, ExplorerError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ExplorerError::Http(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let bytes = response
            .bytes()
            .map_err(|err| ExplorerError::Http(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}
