use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Accepted call-initiation response from the voice provider.
#[derive(Debug, Clone)]
pub struct InitiatedCall {
    pub call_id: String,
    pub metadata: Option<serde_json::Value>,
}

/// Raw status snapshot for an in-flight call. Status strings are
/// provider-specific and classified by the workflow, never matched here.
#[derive(Debug, Clone)]
pub struct RemoteCallStatus {
    pub status: String,
    pub call_successful: Option<String>,
    pub duration_seconds: Option<u32>,
    pub metadata: Option<serde_json::Value>,
}

/// Trait for the third-party voice API - allows for mocking in tests.
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    async fn initiate_call(
        &self,
        phone_number: &str,
        voter_name: Option<&str>,
    ) -> Result<InitiatedCall>;

    async fn call_status(&self, call_id: &str) -> Result<RemoteCallStatus>;

    async fn fetch_transcript(&self, call_id: &str) -> Result<String>;
}

/// Real implementation against the ElevenLabs conversational API.
pub struct ElevenLabsClient {
    base_url: String,
    api_key: String,
    agent_id: String,
    agent_phone_number_id: String,
    client: reqwest::Client,
}

impl ElevenLabsClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        agent_id: impl Into<String>,
        agent_phone_number_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            agent_id: agent_id.into(),
            agent_phone_number_id: agent_phone_number_id.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct OutboundCallResponse {
    conversation_id: String,
    #[serde(flatten)]
    rest: serde_json::Value,
}

#[derive(Deserialize)]
struct ConversationResponse {
    status: String,
    call_successful: Option<String>,
    #[serde(default)]
    metadata: Option<ConversationMetadata>,
    #[serde(default)]
    transcript: Vec<TranscriptTurn>,
}

#[derive(Deserialize)]
struct ConversationMetadata {
    call_duration_secs: Option<u32>,
    #[serde(flatten)]
    rest: serde_json::Value,
}

#[derive(Deserialize)]
struct TranscriptTurn {
    role: String,
    message: Option<String>,
}

#[async_trait]
impl VoiceProvider for ElevenLabsClient {
    async fn initiate_call(
        &self,
        phone_number: &str,
        voter_name: Option<&str>,
    ) -> Result<InitiatedCall> {
        let mut payload = serde_json::json!({
            "agent_id": self.agent_id,
            "agent_phone_number_id": self.agent_phone_number_id,
            "to_number": phone_number,
        });
        if let Some(name) = voter_name {
            payload["conversation_initiation_client_data"] =
                serde_json::json!({ "dynamic_variables": { "voter_name": name } });
        }

        let response = self
            .client
            .post(format!("{}/v1/convai/twilio/outbound-call", self.base_url))
            .header("xi-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .context("call initiation request failed")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "voice provider rejected call initiation: {}",
                response.text().await.unwrap_or_default()
            );
        }

        let body: OutboundCallResponse = response.json().await?;
        Ok(InitiatedCall {
            call_id: body.conversation_id,
            metadata: Some(body.rest),
        })
    }

    async fn call_status(&self, call_id: &str) -> Result<RemoteCallStatus> {
        let response = self
            .client
            .get(format!("{}/v1/convai/conversations/{}", self.base_url, call_id))
            .header("xi-api-key", &self.api_key)
            .send()
            .await
            .context("call status request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("voice provider status fetch failed: {}", response.status());
        }

        let body: ConversationResponse = response.json().await?;
        let duration = body.metadata.as_ref().and_then(|m| m.call_duration_secs);
        let metadata = body.metadata.map(|m| m.rest);
        Ok(RemoteCallStatus {
            status: body.status,
            call_successful: body.call_successful,
            duration_seconds: duration,
            metadata,
        })
    }

    async fn fetch_transcript(&self, call_id: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/v1/convai/conversations/{}", self.base_url, call_id))
            .header("xi-api-key", &self.api_key)
            .send()
            .await
            .context("transcript request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("voice provider transcript fetch failed: {}", response.status());
        }

        let body: ConversationResponse = response.json().await?;
        let transcript = body
            .transcript
            .into_iter()
            .filter_map(|turn| turn.message.map(|m| format!("{}: {}", turn.role, m)))
            .collect::<Vec<_>>()
            .join("\n");

        if transcript.is_empty() {
            anyhow::bail!("transcript not yet available for call {}", call_id);
        }
        Ok(transcript)
    }
}

pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Scripted voice provider for tests. Status snapshots are served in
    /// order; once the queue is empty the last snapshot repeats forever,
    /// which is how a call that never progresses is modeled.
    #[derive(Clone)]
    pub struct MockVoiceProvider {
        call_id: String,
        statuses: Arc<Mutex<VecDeque<RemoteCallStatus>>>,
        last_served: Arc<Mutex<Option<RemoteCallStatus>>>,
        transcript: Arc<Mutex<Result<String, String>>>,
        initiate_calls: Arc<Mutex<usize>>,
        status_calls: Arc<Mutex<usize>>,
        transcript_calls: Arc<Mutex<usize>>,
        fail_initiate: Arc<Mutex<Option<String>>>,
    }

    impl MockVoiceProvider {
        pub fn new(call_id: &str) -> Self {
            Self {
                call_id: call_id.to_string(),
                statuses: Arc::new(Mutex::new(VecDeque::new())),
                last_served: Arc::new(Mutex::new(None)),
                transcript: Arc::new(Mutex::new(Ok("agent: hello\nvoter: hi".to_string()))),
                initiate_calls: Arc::new(Mutex::new(0)),
                status_calls: Arc::new(Mutex::new(0)),
                transcript_calls: Arc::new(Mutex::new(0)),
                fail_initiate: Arc::new(Mutex::new(None)),
            }
        }

        pub fn push_status(&self, status: &str, call_successful: Option<&str>) {
            self.statuses.lock().push_back(RemoteCallStatus {
                status: status.to_string(),
                call_successful: call_successful.map(|s| s.to_string()),
                duration_seconds: Some(31),
                metadata: None,
            });
        }

        /// Repeat the same status for `n` consecutive polls.
        pub fn push_status_n(&self, status: &str, n: usize) {
            for _ in 0..n {
                self.push_status(status, None);
            }
        }

        pub fn set_transcript(&self, transcript: &str) {
            *self.transcript.lock() = Ok(transcript.to_string());
        }

        pub fn fail_transcript(&self, message: &str) {
            *self.transcript.lock() = Err(message.to_string());
        }

        pub fn fail_initiate(&self, message: &str) {
            *self.fail_initiate.lock() = Some(message.to_string());
        }

        pub fn status_fetches(&self) -> usize {
            *self.status_calls.lock()
        }

        pub fn transcript_fetches(&self) -> usize {
            *self.transcript_calls.lock()
        }

        pub fn initiations(&self) -> usize {
            *self.initiate_calls.lock()
        }
    }

    #[async_trait]
    impl VoiceProvider for MockVoiceProvider {
        async fn initiate_call(
            &self,
            _phone_number: &str,
            _voter_name: Option<&str>,
        ) -> Result<InitiatedCall> {
            *self.initiate_calls.lock() += 1;
            if let Some(msg) = self.fail_initiate.lock().clone() {
                anyhow::bail!("{}", msg);
            }
            Ok(InitiatedCall {
                call_id: self.call_id.clone(),
                metadata: None,
            })
        }

        async fn call_status(&self, _call_id: &str) -> Result<RemoteCallStatus> {
            *self.status_calls.lock() += 1;
            let next = self.statuses.lock().pop_front();
            match next {
                Some(status) => {
                    *self.last_served.lock() = Some(status.clone());
                    Ok(status)
                }
                None => self
                    .last_served
                    .lock()
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("no scripted status")),
            }
        }

        async fn fetch_transcript(&self, _call_id: &str) -> Result<String> {
            *self.transcript_calls.lock() += 1;
            self.transcript
                .lock()
                .clone()
                .map_err(|msg| anyhow::anyhow!("{}", msg))
        }
    }
}
