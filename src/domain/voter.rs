use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SupportLevel {
    Strong,
    Leaning,
    Undecided,
    Opposed,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Voter {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub constituency_id: Option<Uuid>,
    pub ward: Option<String>,
    pub support_level: SupportLevel,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Voter {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            phone: None,
            email: None,
            constituency_id: None,
            ward: None,
            support_level: SupportLevel::Unknown,
            last_contacted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_contacted(&mut self) {
        let now = Utc::now();
        self.last_contacted_at = Some(now);
        self.updated_at = now;
    }
}
