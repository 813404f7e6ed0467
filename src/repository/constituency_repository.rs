use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::constituency::Constituency;
use crate::repository::changes::ChangeHub;
use crate::repository::filters::{QueryOptions, SortDirection};
use crate::repository::record::RecordService;
use crate::repository::store::RecordStore;

#[derive(Clone)]
pub struct ConstituencyRepository {
    records: RecordService<Constituency>,
}

impl ConstituencyRepository {
    pub fn new(store: Arc<dyn RecordStore>, hub: Arc<ChangeHub>) -> Self {
        Self {
            records: RecordService::new(store, hub, "constituencies"),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Constituency>> {
        self.records.get(&id.to_string()).await
    }

    pub async fn all(&self) -> Result<Vec<Constituency>> {
        let options = QueryOptions::new().sort("name", SortDirection::Asc);
        Ok(self.records.list(options).await?.items)
    }

    pub async fn by_district(&self, district_id: Uuid) -> Result<Vec<Constituency>> {
        let options = QueryOptions::new()
            .filter_eq("district_id", district_id.to_string())
            .sort("name", SortDirection::Asc);
        Ok(self.records.list(options).await?.items)
    }
}
