use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::call::{CallSentimentAnalysis, VoterCall};
use crate::repository::changes::ChangeHub;
use crate::repository::filters::{Pagination, QueryOptions, SortDirection};
use crate::repository::record::RecordService;
use crate::repository::store::RecordStore;

/// Persistence for test calls and their sentiment analyses. Calls are keyed
/// by the provider's `call_id`, not a local id, so lookups go through a
/// filter rather than the generic `get`.
#[derive(Clone)]
pub struct CallRepository {
    calls: RecordService<VoterCall>,
    analyses: RecordService<CallSentimentAnalysis>,
}

impl CallRepository {
    pub fn new(store: Arc<dyn RecordStore>, hub: Arc<ChangeHub>) -> Self {
        Self {
            calls: RecordService::new(store.clone(), hub.clone(), "voter_calls"),
            analyses: RecordService::new(store, hub, "call_sentiment_analysis"),
        }
    }

    /// Persist a terminal call record (completed with transcript, or the
    /// reduced failure record). Each write is an independent request; there
    /// is no cross-request atomicity with `save_analysis`.
    pub async fn save_call(&self, call: &VoterCall) -> Result<VoterCall> {
        self.calls.create(call).await
    }

    pub async fn find_call(&self, call_id: &str) -> Result<Option<VoterCall>> {
        let options = QueryOptions::new().filter_eq("call_id", call_id);
        Ok(self.calls.list(options).await?.items.into_iter().next())
    }

    pub async fn recent_for_organization(
        &self,
        organization_id: Uuid,
        pagination: Option<Pagination>,
    ) -> Result<Vec<VoterCall>> {
        let mut options = QueryOptions::new()
            .filter_eq("organization_id", organization_id.to_string())
            .sort("call_started_at", SortDirection::Desc);
        options.pagination = pagination;
        Ok(self.calls.list(options).await?.items)
    }

    pub async fn save_analysis(
        &self,
        analysis: &CallSentimentAnalysis,
    ) -> Result<CallSentimentAnalysis> {
        self.analyses.create(analysis).await
    }

    pub async fn find_analysis(&self, call_id: &str) -> Result<Option<CallSentimentAnalysis>> {
        let options = QueryOptions::new().filter_eq("call_id", call_id);
        Ok(self.analyses.list(options).await?.items.into_iter().next())
    }
}
