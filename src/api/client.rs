use anyhow::Result;
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::envelope::{self, ListResponse};
use crate::api::transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport};
use crate::domain::bulk_upload::BulkUploadJob;
use crate::domain::call::CallSentimentAnalysis;
use crate::domain::constituency::{Constituency, District, StateInfo};
use crate::domain::feedback::{Feedback, FieldReport, NewFeedback, NewFieldReport};
use crate::services::error_handling::CanvassError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// The active session. Authenticated requests read the bearer token fresh
/// from here on every call; there is no other token cache.
#[derive(Default)]
pub struct Session {
    tokens: RwLock<Option<AuthTokens>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tokens(&self, tokens: AuthTokens) {
        *self.tokens.write() = Some(tokens);
    }

    pub fn clear(&self) {
        *self.tokens.write() = None;
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens.read().as_ref().map(|t| t.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens.read().as_ref().and_then(|t| t.refresh_token.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkUploadAccepted {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentSnapshot {
    pub date: NaiveDate,
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicCount {
    pub topic: String,
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentSummary {
    pub daily: Vec<SentimentSnapshot>,
    pub by_topic: Vec<TopicCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstituencyVoterCount {
    pub constituency_id: Uuid,
    pub constituency_name: String,
    pub total: u64,
    pub contacted: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoterStats {
    pub total_voters: u64,
    pub contacted: u64,
    pub by_constituency: Vec<ConstituencyVoterCount>,
}

/// Client for the campaign backend. One method per endpoint; non-2xx
/// responses become [`CanvassError::Api`] carrying the server's message
/// verbatim. Nothing here retries automatically.
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport,
            session: Arc::new(Session::new()),
        }
    }

    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> Arc<Session> {
        self.session.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: ApiRequest) -> Result<ApiRequest> {
        let token = self.session.access_token().ok_or_else(|| {
            anyhow::Error::new(CanvassError::Configuration {
                message: "not authenticated: no active session token".to_string(),
            })
        })?;
        Ok(request.with_header("Authorization", format!("Bearer {}", token)))
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(anyhow::Error::new(CanvassError::Api {
                status: response.status,
                message: envelope::error_message(response.status, &response.body),
            }));
        }
        Ok(response)
    }

    async fn send_authed(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.send(self.authorize(request)?).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        let request = ApiRequest::new(HttpMethod::Get, self.url(path)).with_query(query);
        let response = self.send_authed(request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<Vec<T>> {
        let request = ApiRequest::new(HttpMethod::Get, self.url(path)).with_query(query);
        let response = self.send_authed(request).await?;
        let list: ListResponse<T> = envelope::decode_list(&response.body)?;
        Ok(list.into_items())
    }

    // --- auth ---

    /// Unauthenticated; stores the returned tokens into the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens> {
        let request = ApiRequest::new(HttpMethod::Post, self.url("/auth/login/"))
            .with_header("Content-Type", "application/json")
            .with_json(serde_json::json!({ "email": email, "password": password }));
        let response = self.send(request).await?;
        let tokens: AuthTokens = serde_json::from_slice(&response.body)?;
        self.session.set_tokens(tokens.clone());
        Ok(tokens)
    }

    pub async fn refresh(&self) -> Result<AuthTokens> {
        let refresh = self.session.refresh_token().ok_or_else(|| {
            anyhow::Error::new(CanvassError::Configuration {
                message: "no refresh token in session".to_string(),
            })
        })?;
        let request = ApiRequest::new(HttpMethod::Post, self.url("/auth/refresh/"))
            .with_header("Content-Type", "application/json")
            .with_json(serde_json::json!({ "refresh": refresh }));
        let response = self.send(request).await?;
        let tokens: AuthTokens = serde_json::from_slice(&response.body)?;
        self.session.set_tokens(tokens.clone());
        Ok(tokens)
    }

    // --- master data ---

    pub async fn states(&self) -> Result<Vec<StateInfo>> {
        self.get_list("/master-data/states/", vec![]).await
    }

    pub async fn districts(&self, state_id: Uuid) -> Result<Vec<District>> {
        self.get_list(
            "/master-data/districts/",
            vec![("state".to_string(), state_id.to_string())],
        )
        .await
    }

    pub async fn constituencies(&self, district_id: Uuid) -> Result<Vec<Constituency>> {
        self.get_list(
            "/master-data/constituencies/",
            vec![("district".to_string(), district_id.to_string())],
        )
        .await
    }

    // --- feedback / field reports ---

    pub async fn submit_feedback(&self, feedback: &NewFeedback) -> Result<Feedback> {
        let request = ApiRequest::new(HttpMethod::Post, self.url("/feedback/"))
            .with_json(serde_json::to_value(feedback)?);
        let response = self.send_authed(request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    pub async fn list_feedback(&self, constituency_id: Option<Uuid>) -> Result<Vec<Feedback>> {
        let query = constituency_id
            .map(|id| vec![("constituency".to_string(), id.to_string())])
            .unwrap_or_default();
        self.get_list("/feedback/", query).await
    }

    pub async fn submit_field_report(&self, report: &NewFieldReport) -> Result<FieldReport> {
        let request = ApiRequest::new(HttpMethod::Post, self.url("/field-reports/"))
            .with_json(serde_json::to_value(report)?);
        let response = self.send_authed(request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    pub async fn list_field_reports(
        &self,
        constituency_id: Option<Uuid>,
    ) -> Result<Vec<FieldReport>> {
        let query = constituency_id
            .map(|id| vec![("constituency".to_string(), id.to_string())])
            .unwrap_or_default();
        self.get_list("/field-reports/", query).await
    }

    // --- analytics ---

    pub async fn sentiment_summary(
        &self,
        constituency_id: Option<Uuid>,
    ) -> Result<SentimentSummary> {
        let query = constituency_id
            .map(|id| vec![("constituency".to_string(), id.to_string())])
            .unwrap_or_default();
        self.get_json("/analytics/sentiment-summary/", query).await
    }

    pub async fn voter_stats(&self) -> Result<VoterStats> {
        self.get_json("/analytics/voter-stats/", vec![]).await
    }

    pub async fn analyze_transcript(
        &self,
        call_id: &str,
        transcript: &str,
    ) -> Result<CallSentimentAnalysis> {
        let request = ApiRequest::new(HttpMethod::Post, self.url("/analytics/call-sentiment/"))
            .with_json(serde_json::json!({
                "call_id": call_id,
                "transcript": transcript,
            }));
        let response = self.send_authed(request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    // --- bulk upload ---

    pub async fn start_bulk_upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<BulkUploadAccepted> {
        let request = ApiRequest::new(HttpMethod::Post, self.url("/users/bulk-upload/"))
            .with_file("file", file_name, bytes);
        let response = self.send_authed(request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// One status snapshot. Count invariants are enforced here, at the
    /// boundary; an impossible snapshot is indistinguishable from a corrupt
    /// response and is reported as such.
    pub async fn bulk_upload_status(&self, job_id: &str) -> Result<BulkUploadJob> {
        let path = format!("/users/bulk-upload/{}/status/", job_id);
        let request = ApiRequest::new(HttpMethod::Get, self.url(&path));
        let response = self.send_authed(request).await?;
        let job: BulkUploadJob = serde_json::from_slice(&response.body)?;
        job.check_consistency()
            .map_err(|reason| anyhow::Error::new(CanvassError::InvalidSnapshot { reason }))?;
        Ok(job)
    }

    /// CSV blob itemizing the rows the server skipped.
    pub async fn bulk_upload_errors(&self, job_id: &str) -> Result<Vec<u8>> {
        let path = format!("/users/bulk-upload/{}/errors/", job_id);
        let request = ApiRequest::new(HttpMethod::Get, self.url(&path));
        let response = self.send_authed(request).await?;
        Ok(response.body)
    }

    pub async fn bulk_upload_template(&self) -> Result<Vec<u8>> {
        let request = ApiRequest::new(HttpMethod::Get, self.url("/users/bulk-upload/template/"));
        let response = self.send_authed(request).await?;
        Ok(response.body)
    }

    pub async fn cancel_bulk_upload(&self, job_id: &str) -> Result<()> {
        let path = format!("/users/bulk-upload/{}/", job_id);
        let request = ApiRequest::new(HttpMethod::Delete, self.url(&path));
        self.send_authed(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::mock::MockTransport;

    fn authed_client(transport: &MockTransport) -> ApiClient {
        let client = ApiClient::new("http://backend", Arc::new(transport.clone()));
        client.session().set_tokens(AuthTokens {
            access_token: "tok-123".to_string(),
            refresh_token: None,
        });
        client
    }

    #[tokio::test]
    async fn test_bearer_token_injected_per_request() {
        let transport = MockTransport::new();
        transport.respond_json("/master-data/states/", 200, serde_json::json!([]));
        let client = authed_client(&transport);

        client.states().await.unwrap();
        assert!(transport.assert_header_sent("/master-data/states/", "Authorization", "Bearer tok-123"));
    }

    #[tokio::test]
    async fn test_unauthenticated_request_fails_before_network() {
        let transport = MockTransport::new();
        let client = ApiClient::new("http://backend", Arc::new(transport.clone()));

        let err = client.states().await.unwrap_err();
        assert!(err.downcast_ref::<CanvassError>().is_some());
        assert_eq!(transport.call_history().len(), 0);
    }

    #[tokio::test]
    async fn test_server_error_message_is_verbatim() {
        let transport = MockTransport::new();
        transport.respond_json(
            "/users/bulk-upload/",
            400,
            serde_json::json!({"error": "Maximum 10,000 rows per upload"}),
        );
        let client = authed_client(&transport);

        let err = client
            .start_bulk_upload("users.csv", b"name\n".to_vec())
            .await
            .unwrap_err();
        match err.downcast_ref::<CanvassError>() {
            Some(CanvassError::Api { status, message }) => {
                assert_eq!(*status, 400);
                assert_eq!(message, "Maximum 10,000 rows per upload");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_snapshot_consistency_enforced_at_boundary() {
        let transport = MockTransport::new();
        transport.respond_json(
            "/users/bulk-upload/j1/status/",
            200,
            serde_json::json!({
                "job_id": "j1",
                "status": "processing",
                "file_name": "users.csv",
                "total_rows": 5,
                "processed_rows": 9,
                "success_count": 0,
                "failed_count": 0,
                "progress_percentage": 50.0,
                "validation_errors": [],
                "started_at": null,
                "completed_at": null,
                "created_at": null
            }),
        );
        let client = authed_client(&transport);

        let err = client.bulk_upload_status("j1").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CanvassError>(),
            Some(CanvassError::InvalidSnapshot { .. })
        ));
    }

    #[tokio::test]
    async fn test_login_stores_tokens_in_session() {
        let transport = MockTransport::new();
        transport.respond_json(
            "/auth/login/",
            200,
            serde_json::json!({"access_token": "abc", "refresh_token": "def"}),
        );
        let client = ApiClient::new("http://backend", Arc::new(transport.clone()));

        client.login("a@example.com", "hunter2").await.unwrap();
        assert_eq!(client.session().access_token().as_deref(), Some("abc"));
    }
}
