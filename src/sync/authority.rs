use anyhow::{Context, Result};
use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// The remote service holding the shared list of banned cover locations.
pub trait BanAuthority: Send + Sync {
    /// Full current list of banned locations.
    fn fetch_banned(&self) -> BoxFuture<'_, Result<Vec<String>>>;

    /// Reports a newly banned location. Callers treat this as advisory and
    /// ignore the outcome.
    fn report_ban(&self, location: &str) -> BoxFuture<'static, Result<()>>;
}

#[derive(Debug, Deserialize)]
struct CoversResponse {
    urls: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ReportBanRequest {
    url: String,
}

/// HTTP client for the cover-ban service.
#[derive(Clone)]
pub struct RemoteClient {
    http: Client,
    api_base: String,
}

impl RemoteClient {
    pub fn new(http: Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
        }
    }

    async fn get_covers(&self) -> Result<Vec<String>> {
        let response = self
            .http
            .get(format!("{}/v1/covers", self.api_base))
            .send()
            .await?
            .error_for_status()?;

        let body: CoversResponse = response
            .json()
            .await
            .context("covers response did not match the expected shape")?;
        Ok(body.urls)
    }

    async fn post_cover(&self, location: String) -> Result<()> {
        self.http
            .post(format!("{}/v1/cover", self.api_base))
            .json(&ReportBanRequest { url: location })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl BanAuthority for RemoteClient {
    fn fetch_banned(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(self.get_covers())
    }

    fn report_ban(&self, location: &str) -> BoxFuture<'static, Result<()>> {
        let client = self.clone();
        let location = location.to_string();
        Box::pin(async move { client.post_cover(location).await })
    }
}

/// Shared HTTP client with the crate-versioned user agent.
pub fn build_http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(Into::into)
}
