//! HTTP smoke probes.

use std::time::Duration;

use super::HttpProbe;
use crate::error::{ProviderError, Result};

const TIMEOUT_SECS: u64 = 10;

/// Blocking `reqwest` client. Only the status code is read.
pub struct Reqwest {
    client: reqwest::blocking::Client,
}

impl Reqwest {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(concat!("bullpen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Http {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl HttpProbe for Reqwest {
    fn get(&self, url: &str) -> Result<u16> {
        let response = self.client.get(url).send().map_err(|e| http_error(url, e))?;
        Ok(response.status().as_u16())
    }

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<u16> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| http_error(url, e))?;
        Ok(response.status().as_u16())
    }
}

fn http_error(url: &str, err: reqwest::Error) -> ProviderError {
    ProviderError::Http {
        url: url.to_string(),
        reason: err.to_string(),
    }
}
