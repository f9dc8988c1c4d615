use std::future::Future;

use tracing::debug;

use crate::config::SourceConfig;
use crate::data::{RawCategory, parse_category};
use crate::error::FetchError;

/// Somewhere categories can be loaded from by numeric ID.
///
/// Implementations report every failure as a [`FetchError`] and never
/// retry; the assembler reacts by sampling a different ID.
pub trait CategorySource: Send + Sync {
    fn fetch(&self, id: u32) -> impl Future<Output = Result<RawCategory, FetchError>> + Send;
}

/// jService-compatible HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCategorySource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCategorySource {
    pub fn new(config: &SourceConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn category_url(&self, id: u32) -> String {
        format!("{}/category?id={id}", self.base_url)
    }
}

impl CategorySource for HttpCategorySource {
    async fn fetch(&self, id: u32) -> Result<RawCategory, FetchError> {
        let url = self.category_url(id);
        debug!(%url, "fetching category");
        let network = |err: reqwest::Error| FetchError::Network {
            id,
            message: err.to_string(),
        };
        let response = self.client.get(&url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                id,
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(network)?;
        parse_category(id, &body)
    }
}
