// REST boundary of the lighting backend.
//
// Unlike the WebSocket side, responses here are decoded strictly: a body
// that doesn't match the expected shape is an error for the caller, since
// a one-shot request has no later push to heal it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// A stored lighting script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub id: i64,
    pub name: String,
    pub script: String,
}

#[derive(Debug, Deserialize)]
struct ScriptList {
    scripts: Vec<Script>,
}

/// HTTP client for the backend's `rest/` endpoints.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self::with_client(transport.build_client()?, base_url))
    }

    /// Use a pre-built `reqwest::Client` (tests, shared pools).
    pub fn with_client(http: reqwest::Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET {base}rest/script/list`.
    pub async fn list_scripts(&self) -> Result<Vec<Script>, Error> {
        let list: ScriptList = self.get_json("rest/script/list").await?;
        Ok(list.scripts)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.base_url.join(path)?;
        tracing::debug!(url = %url, "GET");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}
