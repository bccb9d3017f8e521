///! Event listing fetcher
///!
///! One GET per call against the configured source. No retries: a failed
///! fetch means "no events this cycle".

use async_trait::async_trait;
use reqwest::Client;

use crate::config::SourceConfig;
use crate::error::FetchError;

/// Anything that can produce the raw event-listing document.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch(&self) -> Result<String, FetchError>;
}

/// Fetches the listing page over HTTP.
pub struct HttpEventSource {
    client: Client,
    url: String,
}

impl HttpEventSource {
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch(&self) -> Result<String, FetchError> {
        tracing::debug!("Fetching event listing from {}", self.url);

        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let html = response.text().await?;
        tracing::debug!("Fetched {} bytes from {}", html.len(), self.url);
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer, timeout_secs: u64) -> HttpEventSource {
        let config = SourceConfig {
            url: format!("{}/desktop/", server.uri()),
            timeout_secs,
            ..SourceConfig::default()
        };
        HttpEventSource::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/desktop/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<table id=\"sismos\"></table>"))
            .mount(&server)
            .await;

        let body = source_for(&server, 5).fetch().await.unwrap();
        assert!(body.contains("sismos"));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source_for(&server, 5).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 503));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3)))
            .mount(&server)
            .await;

        let err = source_for(&server, 1).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
    }
}
