use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::repository::filters::{FilterValue, QueryOptions, SortDirection};

#[derive(Debug, Clone)]
pub struct StoreQueryResult {
    pub rows: Vec<Value>,
    /// Matching-row count before pagination was applied.
    pub total: u64,
}

/// Trait over the hosted record store - allows for mocking in tests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, table: &str, options: &QueryOptions) -> Result<StoreQueryResult>;
    async fn insert(&self, table: &str, row: Value) -> Result<Value>;
    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value>;
    async fn delete(&self, table: &str, id: &str) -> Result<()>;
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Translate a [`QueryOptions`] into PostgREST query parameters. Kept pure
/// so the translation itself is testable without a server.
pub fn postgrest_params(options: &QueryOptions) -> Vec<(String, String)> {
    let mut params = Vec::new();

    if let Some(select) = &options.select {
        params.push(("select".to_string(), select.clone()));
    }

    for filter in &options.filters {
        match &filter.value {
            FilterValue::Eq(Value::Null) => {
                params.push((filter.column.clone(), "is.null".to_string()));
            }
            FilterValue::Eq(value) => {
                params.push((filter.column.clone(), format!("eq.{}", render_scalar(value))));
            }
            FilterValue::In(values) => {
                let list = values.iter().map(render_scalar).collect::<Vec<_>>().join(",");
                params.push((filter.column.clone(), format!("in.({})", list)));
            }
            FilterValue::Compare { op, value } => {
                params.push((
                    filter.column.clone(),
                    format!("{}.{}", op.as_str(), render_scalar(value)),
                ));
            }
            FilterValue::Search(term) => {
                params.push((filter.column.clone(), format!("ilike.*{}*", term)));
            }
        }
    }

    if let Some(search) = &options.search {
        let clauses = search
            .columns
            .iter()
            .map(|c| format!("{}.ilike.*{}*", c, search.term))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("or".to_string(), format!("({})", clauses)));
    }

    if let Some(sort) = &options.sort {
        let direction = match sort.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        params.push(("order".to_string(), format!("{}.{}", sort.column, direction)));
    }

    if let Some(p) = &options.pagination {
        params.push(("limit".to_string(), p.limit().to_string()));
        params.push(("offset".to_string(), p.offset().to_string()));
    }

    params
}

/// Real implementation over a PostgREST-style endpoint.
pub struct PostgrestStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl PostgrestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    fn parse_total(content_range: Option<&str>, fallback: usize) -> u64 {
        // Content-Range: "0-24/57" or "*/0"
        content_range
            .and_then(|v| v.rsplit('/').next())
            .and_then(|total| total.parse::<u64>().ok())
            .unwrap_or(fallback as u64)
    }
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn select(&self, table: &str, options: &QueryOptions) -> Result<StoreQueryResult> {
        let response = self
            .authed(self.client.get(self.table_url(table)))
            .query(&postgrest_params(options))
            .header("Prefer", "count=exact")
            .send()
            .await
            .with_context(|| format!("select from {} failed", table))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "store select from {} failed with status {}",
                table,
                response.status()
            );
        }

        let content_range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let rows: Vec<Value> = response.json().await?;
        let total = Self::parse_total(content_range.as_deref(), rows.len());

        Ok(StoreQueryResult { rows, total })
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let response = self
            .authed(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .with_context(|| format!("insert into {} failed", table))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "store insert into {} failed with status {}",
                table,
                response.status()
            );
        }

        let mut rows: Vec<Value> = response.json().await?;
        rows.pop()
            .ok_or_else(|| anyhow::anyhow!("store insert into {} returned no row", table))
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value> {
        let response = self
            .authed(self.client.patch(self.table_url(table)))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await
            .with_context(|| format!("update of {} failed", table))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "store update of {} failed with status {}",
                table,
                response.status()
            );
        }

        let mut rows: Vec<Value> = response.json().await?;
        rows.pop()
            .ok_or_else(|| anyhow::anyhow!("no {} row with id {}", table, id))
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        let response = self
            .authed(self.client.delete(self.table_url(table)))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await
            .with_context(|| format!("delete from {} failed", table))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "store delete from {} failed with status {}",
                table,
                response.status()
            );
        }
        Ok(())
    }
}

pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use uuid::Uuid;

    /// In-memory store evaluating the same filter semantics as the real
    /// translation, for tests and offline wiring.
    #[derive(Clone, Default)]
    pub struct MockStore {
        tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn rows(&self, table: &str) -> Vec<Value> {
            self.tables.lock().get(table).cloned().unwrap_or_default()
        }

        fn row_id(row: &Value) -> Option<String> {
            row.get("id").map(render_scalar).or_else(|| {
                row.get("call_id").map(render_scalar)
            })
        }

        fn matches_filter(row: &Value, column: &str, filter: &FilterValue) -> bool {
            let cell = row.get(column).cloned().unwrap_or(Value::Null);
            match filter {
                FilterValue::Eq(expected) => &cell == expected,
                FilterValue::In(values) => values.contains(&cell),
                FilterValue::Compare { op, value } => {
                    use crate::repository::filters::CompareOp::*;
                    if let (Some(a), Some(b)) = (cell.as_f64(), value.as_f64()) {
                        match op {
                            Eq => a == b,
                            Neq => a != b,
                            Gt => a > b,
                            Gte => a >= b,
                            Lt => a < b,
                            Lte => a <= b,
                        }
                    } else {
                        let a = render_scalar(&cell);
                        let b = render_scalar(value);
                        match op {
                            Eq => a == b,
                            Neq => a != b,
                            Gt => a > b,
                            Gte => a >= b,
                            Lt => a < b,
                            Lte => a <= b,
                        }
                    }
                }
                FilterValue::Search(term) => cell
                    .as_str()
                    .map(|s| s.to_lowercase().contains(&term.to_lowercase()))
                    .unwrap_or(false),
            }
        }

        fn matches(row: &Value, options: &QueryOptions) -> bool {
            let conjunctive = options
                .filters
                .iter()
                .all(|f| Self::matches_filter(row, &f.column, &f.value));
            if !conjunctive {
                return false;
            }
            match &options.search {
                Some(spec) => spec.columns.iter().any(|column| {
                    Self::matches_filter(row, column, &FilterValue::Search(spec.term.clone()))
                }),
                None => true,
            }
        }
    }

    #[async_trait]
    impl RecordStore for MockStore {
        async fn select(&self, table: &str, options: &QueryOptions) -> Result<StoreQueryResult> {
            let tables = self.tables.lock();
            let mut rows: Vec<Value> = tables
                .get(table)
                .map(|rows| {
                    rows.iter()
                        .filter(|r| Self::matches(r, options))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            if let Some(sort) = &options.sort {
                rows.sort_by(|a, b| {
                    let a = render_scalar(&a.get(&sort.column).cloned().unwrap_or(Value::Null));
                    let b = render_scalar(&b.get(&sort.column).cloned().unwrap_or(Value::Null));
                    match sort.direction {
                        SortDirection::Asc => a.cmp(&b),
                        SortDirection::Desc => b.cmp(&a),
                    }
                });
            }

            let total = rows.len() as u64;
            if let Some(p) = &options.pagination {
                let start = (p.offset() as usize).min(rows.len());
                let end = (start + p.limit() as usize).min(rows.len());
                rows = rows[start..end].to_vec();
            }

            Ok(StoreQueryResult { rows, total })
        }

        async fn insert(&self, table: &str, mut row: Value) -> Result<Value> {
            if row.get("id").is_none() && row.get("call_id").is_none() {
                row["id"] = Value::String(Uuid::new_v4().to_string());
            }
            self.tables
                .lock()
                .entry(table.to_string())
                .or_default()
                .push(row.clone());
            Ok(row)
        }

        async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value> {
            let mut tables = self.tables.lock();
            let rows = tables
                .get_mut(table)
                .ok_or_else(|| anyhow::anyhow!("no such table: {}", table))?;
            let row = rows
                .iter_mut()
                .find(|r| Self::row_id(r).as_deref() == Some(id))
                .ok_or_else(|| anyhow::anyhow!("no {} row with id {}", table, id))?;

            if let (Some(target), Some(source)) = (row.as_object_mut(), patch.as_object()) {
                for (key, value) in source {
                    target.insert(key.clone(), value.clone());
                }
            }
            Ok(row.clone())
        }

        async fn delete(&self, table: &str, id: &str) -> Result<()> {
            let mut tables = self.tables.lock();
            if let Some(rows) = tables.get_mut(table) {
                rows.retain(|r| Self::row_id(r).as_deref() != Some(id));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::filters::{CompareOp, QueryOptions, SortDirection};
    use serde_json::json;

    #[test]
    fn test_postgrest_translation_of_each_filter_shape() {
        let options = QueryOptions::new()
            .filter_eq("city", "Springfield")
            .filter_in("role", vec![json!("admin"), json!("manager")])
            .filter_compare("age", CompareOp::Gte, 18)
            .sort("created_at", SortDirection::Desc)
            .paginate(2, 25);

        let params = postgrest_params(&options);
        assert!(params.contains(&("city".to_string(), "eq.Springfield".to_string())));
        assert!(params.contains(&("role".to_string(), "in.(admin,manager)".to_string())));
        assert!(params.contains(&("age".to_string(), "gte.18".to_string())));
        assert!(params.contains(&("order".to_string(), "created_at.desc".to_string())));
        assert!(params.contains(&("limit".to_string(), "25".to_string())));
        assert!(params.contains(&("offset".to_string(), "25".to_string())));
    }

    #[test]
    fn test_multi_column_search_is_disjunctive() {
        let options = QueryOptions::new().search(&["name", "phone"], "ada");
        let params = postgrest_params(&options);
        assert!(params.contains(&(
            "or".to_string(),
            "(name.ilike.*ada*,phone.ilike.*ada*)".to_string()
        )));
    }

    #[test]
    fn test_null_equality_uses_is() {
        let options = QueryOptions::new().filter_eq("deleted_at", Value::Null);
        let params = postgrest_params(&options);
        assert!(params.contains(&("deleted_at".to_string(), "is.null".to_string())));
    }

    #[test]
    fn test_content_range_parsing() {
        assert_eq!(PostgrestStore::parse_total(Some("0-24/57"), 25), 57);
        assert_eq!(PostgrestStore::parse_total(Some("*/0"), 0), 0);
        assert_eq!(PostgrestStore::parse_total(None, 10), 10);
    }

    #[tokio::test]
    async fn test_mock_store_filters_conjunctively() {
        let store = mock::MockStore::new();
        for (name, city, age) in [("Ada", "Springfield", 34), ("Ben", "Springfield", 17), ("Cal", "Shelbyville", 40)] {
            store
                .insert("voters", json!({"name": name, "city": city, "age": age}))
                .await
                .unwrap();
        }

        let options = QueryOptions::new()
            .filter_eq("city", "Springfield")
            .filter_compare("age", CompareOp::Gte, 18);
        let result = store.select("voters", &options).await.unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.rows[0]["name"], "Ada");
    }

    #[tokio::test]
    async fn test_mock_store_search_and_pagination() {
        let store = mock::MockStore::new();
        for i in 0..7 {
            store
                .insert("voters", json!({"name": format!("Voter {}", i)}))
                .await
                .unwrap();
        }

        let options = QueryOptions::new()
            .search(&["name"], "voter")
            .sort("name", SortDirection::Asc)
            .paginate(2, 3);
        let result = store.select("voters", &options).await.unwrap();
        assert_eq!(result.total, 7);
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.rows[0]["name"], "Voter 3");
    }
}
