use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Decision, Profile, ProfileId},
    protocol::{MatchesResponse, QueueItem, QueuePageQuery, UserResponse},
};
use tracing::debug;
use url::Url;

use crate::{config::QueueSettings, error::ServiceError, profiles::profile_from_backend};

/// Backend collaborator of the queue controller.
#[async_trait]
pub trait ProfileService: Send + Sync {
    /// Candidate ids for `viewer`, in server order.
    async fn profile_queue(
        &self,
        viewer: &ProfileId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ProfileId>>;

    async fn profile(&self, id: &ProfileId) -> Result<Profile>;

    async fn record_decision(
        &self,
        viewer: &ProfileId,
        target: &ProfileId,
        decision: Decision,
    ) -> Result<()>;
}

/// REST/JSON implementation of [`ProfileService`].
#[derive(Clone)]
pub struct HttpProfileService {
    http: Client,
    base_url: Url,
}

impl HttpProfileService {
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn from_settings(settings: &QueueSettings) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Self::with_client(http, &settings.api_base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, ServiceError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::Url(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn fetch_profile_queue(
        &self,
        viewer: &ProfileId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ProfileId>, ServiceError> {
        let url = self.endpoint(&["profile-queue", viewer.as_str()])?;
        debug!(%url, offset, limit, "profile-service: fetching queue page");
        let response = self
            .http
            .get(url)
            .query(&QueuePageQuery { offset, limit })
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let items: Vec<QueueItem> = decode_json(check_status(response).await?).await?;
        Ok(items.into_iter().map(QueueItem::into_id).collect())
    }

    pub async fn fetch_profile(&self, id: &ProfileId) -> Result<Profile, ServiceError> {
        let url = self.endpoint(&["user", id.as_str()])?;
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let body: UserResponse = decode_json(check_status(response).await?).await?;
        Ok(profile_from_backend(body.into_user()))
    }

    pub async fn post_decision(
        &self,
        viewer: &ProfileId,
        target: &ProfileId,
        decision: Decision,
    ) -> Result<(), ServiceError> {
        let url = self.endpoint(&[
            "users",
            viewer.as_str(),
            decision.as_path_segment(),
            target.as_str(),
        ])?;
        let response = self.http.post(url).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// Ids of mutual likes for `viewer`.
    pub async fn fetch_matches(&self, viewer: &ProfileId) -> Result<Vec<ProfileId>, ServiceError> {
        let url = self.endpoint(&["matches", viewer.as_str()])?;
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let body: MatchesResponse = decode_json(check_status(response).await?).await?;
        Ok(body.matches)
    }
}

#[async_trait]
impl ProfileService for HttpProfileService {
    async fn profile_queue(
        &self,
        viewer: &ProfileId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ProfileId>> {
        Ok(self.fetch_profile_queue(viewer, offset, limit).await?)
    }

    async fn profile(&self, id: &ProfileId) -> Result<Profile> {
        Ok(self.fetch_profile(id).await?)
    }

    async fn record_decision(
        &self,
        viewer: &ProfileId,
        target: &ProfileId,
        decision: Decision,
    ) -> Result<()> {
        Ok(self.post_decision(viewer, target, decision).await?)
    }
}

async fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body = if body.is_empty() {
        status.canonical_reason().unwrap_or_default().to_string()
    } else {
        body
    };
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| ServiceError::Decode(err.to_string()))
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
