use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::voter::{SupportLevel, Voter};
use crate::repository::changes::{ChangeHub, Subscription};
use crate::repository::filters::{PagedResult, Pagination, QueryOptions};
use crate::repository::record::RecordService;
use crate::repository::store::RecordStore;

#[derive(Clone)]
pub struct VoterRepository {
    records: RecordService<Voter>,
}

impl VoterRepository {
    pub fn new(store: Arc<dyn RecordStore>, hub: Arc<ChangeHub>) -> Self {
        Self {
            records: RecordService::new(store, hub, "voters"),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Voter>> {
        self.records.get(&id.to_string()).await
    }

    pub async fn create(&self, voter: &Voter) -> Result<Voter> {
        self.records.create(voter).await
    }

    pub async fn list(&self, options: QueryOptions) -> Result<PagedResult<Voter>> {
        self.records.list(options).await
    }

    pub async fn by_constituency(
        &self,
        constituency_id: Uuid,
        pagination: Option<Pagination>,
    ) -> Result<PagedResult<Voter>> {
        let mut options =
            QueryOptions::new().filter_eq("constituency_id", constituency_id.to_string());
        options.pagination = pagination;
        self.records.list(options).await
    }

    pub async fn by_support_level(&self, level: SupportLevel) -> Result<Vec<Voter>> {
        let options = QueryOptions::new().filter_eq("support_level", serde_json::to_value(level)?);
        Ok(self.records.list(options).await?.items)
    }

    /// Name-or-phone lookup for the drill-down search box.
    pub async fn search(
        &self,
        term: &str,
        pagination: Option<Pagination>,
    ) -> Result<PagedResult<Voter>> {
        self.records.search(&["name", "phone"], term, pagination).await
    }

    pub async fn mark_contacted(&self, id: Uuid) -> Result<Voter> {
        self.records
            .update(
                &id.to_string(),
                json!({ "last_contacted_at": Utc::now().to_rfc3339() }),
            )
            .await
    }

    /// Live feed of voter changes, optionally narrowed to one constituency.
    pub fn subscribe(&self, constituency_id: Option<Uuid>) -> Subscription {
        let filter = constituency_id
            .map(|id| ("constituency_id".to_string(), json!(id.to_string())));
        self.records.subscribe(filter)
    }
}
