use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::repository::changes::{ChangeEvent, ChangeHub, ChangeKind, Subscription};
use crate::repository::filters::{PagedResult, Pagination, QueryOptions};
use crate::repository::store::RecordStore;

/// Typed handle over one named collection in the record store. Translates
/// declarative query options into store queries and publishes every mutation
/// to the change hub.
pub struct RecordService<T> {
    store: Arc<dyn RecordStore>,
    hub: Arc<ChangeHub>,
    table: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordService<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            hub: self.hub.clone(),
            table: self.table.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> RecordService<T> {
    pub fn new(store: Arc<dyn RecordStore>, hub: Arc<ChangeHub>, table: &str) -> Self {
        Self {
            store,
            hub,
            table: table.to_string(),
            _marker: PhantomData,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>> {
        let options = QueryOptions::new().filter_eq("id", id);
        let result = self.store.select(&self.table, &options).await?;
        match result.rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self, options: QueryOptions) -> Result<PagedResult<T>> {
        let pagination = options.pagination;
        let result = self.store.select(&self.table, &options).await?;
        let items = result
            .rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?;
        Ok(PagedResult::assemble(items, result.total, pagination))
    }

    pub async fn create(&self, record: &T) -> Result<T> {
        let row = self.store.insert(&self.table, serde_json::to_value(record)?).await?;
        self.publish(ChangeKind::Insert, row.clone());
        Ok(serde_json::from_value(row)?)
    }

    pub async fn update(&self, id: &str, patch: Value) -> Result<T> {
        let row = self.store.update(&self.table, id, patch).await?;
        self.publish(ChangeKind::Update, row.clone());
        Ok(serde_json::from_value(row)?)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(&self.table, id).await?;
        self.publish(ChangeKind::Delete, serde_json::json!({ "id": id }));
        Ok(())
    }

    /// Disjunctive case-insensitive substring search across the listed
    /// columns.
    pub async fn search(
        &self,
        columns: &[&str],
        term: &str,
        pagination: Option<Pagination>,
    ) -> Result<PagedResult<T>> {
        let mut options = QueryOptions::new().search(columns, term);
        options.pagination = pagination;
        self.list(options).await
    }

    pub fn subscribe(&self, filter: Option<(String, Value)>) -> Subscription {
        self.hub.subscribe(&self.table, filter)
    }

    fn publish(&self, kind: ChangeKind, row: Value) {
        self.hub.publish(ChangeEvent {
            table: self.table.clone(),
            kind,
            row,
        });
    }
}
