//! EdgeX system-management client
//!
//! Device-management commands are forwarded to the EdgeX system management
//! agent over HTTP. Each call returns the response body as text.

use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

#[async_trait]
pub trait EdgexClient: Send + Sync {
    /// Start/stop/restart services: `args[0]` is the action, the rest are
    /// service names.
    async fn push_operation(&self, args: &[String]) -> Result<String>;

    async fn fetch_config(&self, services: &[String]) -> Result<String>;

    async fn fetch_metrics(&self, services: &[String]) -> Result<String>;

    async fn ping(&self) -> Result<String>;
}

#[derive(Debug, Serialize, PartialEq)]
struct Operation<'a> {
    action: &'a str,
    services: &'a [String],
}

pub struct HttpEdgexClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpEdgexClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get(&self, url: String) -> Result<String> {
        debug!("EdgeX GET {}", url);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl EdgexClient for HttpEdgexClient {
    async fn push_operation(&self, args: &[String]) -> Result<String> {
        let (action, services) = args.split_first().ok_or(AgentError::InvalidCommand)?;
        let url = self.endpoint("operation");
        debug!("EdgeX POST {} ({} {:?})", url, action, services);

        let response = self
            .http
            .post(&url)
            .json(&Operation { action, services })
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    async fn fetch_config(&self, services: &[String]) -> Result<String> {
        self.get(self.endpoint(&format!("config/{}", services.join(","))))
            .await
    }

    async fn fetch_metrics(&self, services: &[String]) -> Result<String> {
        self.get(self.endpoint(&format!("metrics/{}", services.join(","))))
            .await
    }

    async fn ping(&self) -> Result<String> {
        self.get(self.endpoint("ping")).await
    }
}
