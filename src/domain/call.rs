use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an outbound test call, normalized from whatever the
/// voice provider reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CallStatus {
    #[serde(rename = "initiated")]
    Initiated,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "no_answer")]
    NoAnswer,
    #[serde(rename = "busy")]
    Busy,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallStatus::Initiated | CallStatus::InProgress)
    }
}

/// One outbound test call. Created in memory immediately after the
/// initiation request succeeds; persisted only once a terminal status is
/// known. A transcript is only ever attached through [`VoterCall::complete`],
/// so a call that never reached an answered state never carries one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoterCall {
    pub call_id: String,
    pub organization_id: Uuid,
    pub phone_number: String,
    pub voter_name: Option<String>,
    pub status: CallStatus,
    pub duration_seconds: Option<u32>,
    pub call_started_at: Option<DateTime<Utc>>,
    pub call_ended_at: Option<DateTime<Utc>>,
    pub transcript: Option<String>,
    pub transcript_fetched_at: Option<DateTime<Utc>>,
    pub elevenlabs_metadata: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

impl VoterCall {
    pub fn initiated(
        call_id: String,
        organization_id: Uuid,
        phone_number: String,
        voter_name: Option<String>,
    ) -> Self {
        Self {
            call_id,
            organization_id,
            phone_number,
            voter_name,
            status: CallStatus::Initiated,
            duration_seconds: None,
            call_started_at: Some(Utc::now()),
            call_ended_at: None,
            transcript: None,
            transcript_fetched_at: None,
            elevenlabs_metadata: None,
            error_message: None,
        }
    }

    /// Success path: the call answered and ended normally.
    pub fn complete(&mut self, transcript: String, duration_seconds: Option<u32>) {
        self.status = CallStatus::Completed;
        self.duration_seconds = duration_seconds;
        self.call_ended_at = Some(Utc::now());
        self.transcript = Some(transcript);
        self.transcript_fetched_at = Some(Utc::now());
        self.error_message = None;
    }

    /// Failure path: the reduced record persisted for unanswered or failed
    /// calls. Clears any transcript fields rather than trusting the caller.
    pub fn fail(&mut self, status: CallStatus, error_message: String) {
        self.status = status;
        self.call_ended_at = Some(Utc::now());
        self.transcript = None;
        self.transcript_fetched_at = None;
        self.error_message = Some(error_message);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicSentiment {
    pub topic: String,
    pub sentiment: SentimentLabel,
    pub summary: String,
}

/// Derived from a completed call's transcript. Created at most once per
/// completed call, after transcript retrieval succeeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallSentimentAnalysis {
    pub id: Uuid,
    pub call_id: String,
    pub overall_sentiment: SentimentLabel,
    pub overall_summary: String,
    pub topics: Vec<TopicSentiment>,
    pub keywords: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}
