use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::call::SentimentLabel;

/// Voter feedback captured through the dashboard or field apps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub id: Uuid,
    pub voter_id: Option<Uuid>,
    pub constituency_id: Option<Uuid>,
    pub topic: String,
    pub message: String,
    pub sentiment: Option<SentimentLabel>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for submitting new feedback; the server assigns id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewFeedback {
    pub voter_id: Option<Uuid>,
    pub constituency_id: Option<Uuid>,
    pub topic: String,
    pub message: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldReport {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub constituency_id: Option<Uuid>,
    pub title: String,
    pub notes: String,
    pub location: Option<String>,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewFieldReport {
    pub constituency_id: Option<Uuid>,
    pub title: String,
    pub notes: String,
    pub location: Option<String>,
}
