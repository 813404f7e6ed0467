use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::user::{Role, User};
use crate::repository::changes::{ChangeHub, Subscription};
use crate::repository::filters::{PagedResult, Pagination, QueryOptions, SortDirection};
use crate::repository::record::RecordService;
use crate::repository::store::RecordStore;

#[derive(Clone)]
pub struct UserRepository {
    records: RecordService<User>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn RecordStore>, hub: Arc<ChangeHub>) -> Self {
        Self {
            records: RecordService::new(store, hub, "users"),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<User>> {
        self.records.get(&id.to_string()).await
    }

    pub async fn create(&self, user: &User) -> Result<User> {
        self.records.create(user).await
    }

    pub async fn list(&self, options: QueryOptions) -> Result<PagedResult<User>> {
        self.records.list(options).await
    }

    pub async fn by_role(&self, role: Role) -> Result<Vec<User>> {
        let options = QueryOptions::new()
            .filter_eq("role", role.as_str())
            .sort("name", SortDirection::Asc);
        Ok(self.records.list(options).await?.items)
    }

    pub async fn by_constituency(&self, constituency_id: Uuid) -> Result<Vec<User>> {
        let options = QueryOptions::new().filter_eq("constituency_id", constituency_id.to_string());
        Ok(self.records.list(options).await?.items)
    }

    pub async fn active(&self, pagination: Option<Pagination>) -> Result<PagedResult<User>> {
        let mut options = QueryOptions::new().filter_eq("is_active", true);
        options.pagination = pagination;
        self.records.list(options).await
    }

    pub async fn search(
        &self,
        term: &str,
        pagination: Option<Pagination>,
    ) -> Result<PagedResult<User>> {
        self.records
            .search(&["name", "email", "city"], term, pagination)
            .await
    }

    pub async fn set_role(&self, id: Uuid, role: Role) -> Result<User> {
        self.records
            .update(&id.to_string(), json!({ "role": role.as_str() }))
            .await
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<User> {
        self.records
            .update(&id.to_string(), json!({ "is_active": false }))
            .await
    }

    pub fn subscribe(&self) -> Subscription {
        self.records.subscribe(None)
    }
}
