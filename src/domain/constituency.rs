use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Master data: top-level state/region as served by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateInfo {
    pub id: Uuid,
    pub name: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct District {
    pub id: Uuid,
    pub state_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Constituency {
    pub id: Uuid,
    pub district_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub total_voters: Option<u64>,
}
