// ThingSpeak provider - Live readings from a channel's read API
use crate::application::source_provider::{ProviderError, SourceProvider};
use crate::domain::device::DeviceKind;
use crate::domain::reading::Reading;
use crate::infrastructure::feed_mapper::{ChannelFeed, FeedEntry, feed_to_reading};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone)]
pub struct ThingSpeakProvider {
    client: reqwest::Client,
    kind: DeviceKind,
    base_url: String,
    channel_id: String,
    api_key: String,
}

impl ThingSpeakProvider {
    pub fn new(
        client: reqwest::Client,
        kind: DeviceKind,
        base_url: String,
        channel_id: String,
        api_key: String,
    ) -> Self {
        Self {
            client,
            kind,
            base_url: base_url.trim_end_matches('/').to_string(),
            channel_id,
            api_key,
        }
    }

    fn build_url(&self, resource: &str, params: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}/channels/{}/{}",
            self.base_url,
            urlencoding::encode(&self.channel_id),
            resource
        );
        let mut query: Vec<String> = Vec::new();
        if !self.api_key.is_empty() {
            query.push(format!("api_key={}", urlencoding::encode(&self.api_key)));
        }
        query.extend(
            params
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v))),
        );
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SourceProvider for ThingSpeakProvider {
    async fn fetch_latest(&self) -> Result<Reading, ProviderError> {
        let url = self.build_url("feeds/last.json", &[]);
        let entry: FeedEntry = self.get_json(&url).await?;
        tracing::debug!(
            device = %self.kind,
            channel = %self.channel_id,
            entry_id = ?entry.entry_id,
            "fetched latest entry"
        );
        Ok(feed_to_reading(self.kind, &entry, Utc::now()))
    }

    async fn fetch_history(&self, count: usize) -> Result<Vec<Reading>, ProviderError> {
        let url = self.build_url("feeds.json", &[("results", count.to_string())]);
        let feed: ChannelFeed = self.get_json(&url).await?;

        tracing::debug!(
            device = %self.kind,
            channel = feed.channel.as_ref().and_then(|c| c.name.as_deref()).unwrap_or(self.channel_id.as_str()),
            entries = feed.feeds.len(),
            "fetched channel feed"
        );

        let received_at = Utc::now();
        let skip = feed.feeds.len().saturating_sub(count);
        Ok(feed
            .feeds
            .iter()
            .skip(skip)
            .map(|entry| feed_to_reading(self.kind, entry, received_at))
            .collect())
    }
}
