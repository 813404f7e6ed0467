use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::organization::Organization;
use crate::repository::changes::ChangeHub;
use crate::repository::filters::QueryOptions;
use crate::repository::record::RecordService;
use crate::repository::store::RecordStore;

#[derive(Clone)]
pub struct OrganizationRepository {
    records: RecordService<Organization>,
}

impl OrganizationRepository {
    pub fn new(store: Arc<dyn RecordStore>, hub: Arc<ChangeHub>) -> Self {
        Self {
            records: RecordService::new(store, hub, "organizations"),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Organization>> {
        self.records.get(&id.to_string()).await
    }

    pub async fn create(&self, organization: &Organization) -> Result<Organization> {
        self.records.create(organization).await
    }

    pub async fn active(&self) -> Result<Vec<Organization>> {
        let options = QueryOptions::new().filter_eq("is_active", true);
        Ok(self.records.list(options).await?.items)
    }
}
