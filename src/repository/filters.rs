use anyhow::{Result, bail};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Neq => "neq",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(CompareOp::Eq),
            "neq" => Some(CompareOp::Neq),
            "gt" => Some(CompareOp::Gt),
            "gte" => Some(CompareOp::Gte),
            "lt" => Some(CompareOp::Lt),
            "lte" => Some(CompareOp::Lte),
            _ => None,
        }
    }
}

/// One column predicate. Multiple filters are conjunctive.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Exact equality.
    Eq(Value),
    /// Column value is a member of the list.
    In(Vec<Value>),
    /// Explicit comparison operator.
    Compare { op: CompareOp, value: Value },
    /// Case-insensitive substring match.
    Search(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: FilterValue,
}

/// Disjunctive case-insensitive substring match across several columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpec {
    pub columns: Vec<String>,
    pub term: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub column: String,
    pub direction: SortDirection,
}

/// 1-indexed pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }
}

/// Declarative query against a named collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub filters: Vec<Filter>,
    pub search: Option<SearchSpec>,
    pub sort: Option<Sort>,
    pub pagination: Option<Pagination>,
    pub select: Option<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: FilterValue::Eq(value.into()),
        });
        self
    }

    pub fn filter_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: FilterValue::In(values),
        });
        self
    }

    pub fn filter_compare(mut self, column: &str, op: CompareOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: FilterValue::Compare {
                op,
                value: value.into(),
            },
        });
        self
    }

    pub fn search(mut self, columns: &[&str], term: &str) -> Self {
        self.search = Some(SearchSpec {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            term: term.to_string(),
        });
        self
    }

    pub fn sort(mut self, column: &str, direction: SortDirection) -> Self {
        self.sort = Some(Sort {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn paginate(mut self, page: u64, page_size: u64) -> Self {
        self.pagination = Some(Pagination::new(page, page_size));
        self
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    /// Build filters from a declarative JSON object: array value means
    /// membership, an object with an `operator` field means comparison, a
    /// key suffixed `_search` means substring match on the stripped column,
    /// anything else means equality.
    pub fn from_json(filters: &Value) -> Result<Self> {
        let Some(map) = filters.as_object() else {
            bail!("filter object must be a JSON object");
        };

        let mut options = QueryOptions::new();
        for (key, value) in map {
            let filter = if let Some(column) = key.strip_suffix("_search") {
                let Some(term) = value.as_str() else {
                    bail!("search filter {} must be a string", key);
                };
                Filter {
                    column: column.to_string(),
                    value: FilterValue::Search(term.to_string()),
                }
            } else if let Some(values) = value.as_array() {
                Filter {
                    column: key.clone(),
                    value: FilterValue::In(values.clone()),
                }
            } else if let Some(obj) = value.as_object() {
                let Some(op_name) = obj.get("operator").and_then(|o| o.as_str()) else {
                    bail!("object filter {} is missing an operator field", key);
                };
                let Some(op) = CompareOp::parse(op_name) else {
                    bail!("unknown comparison operator: {}", op_name);
                };
                Filter {
                    column: key.clone(),
                    value: FilterValue::Compare {
                        op,
                        value: obj.get("value").cloned().unwrap_or(Value::Null),
                    },
                }
            } else {
                Filter {
                    column: key.clone(),
                    value: FilterValue::Eq(value.clone()),
                }
            };
            options.filters.push(filter);
        }
        Ok(options)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub total_pages: u64,
}

impl<T> PagedResult<T> {
    /// `total_pages = ceil(total / page_size)`; an unpaginated query is a
    /// single page.
    pub fn assemble(items: Vec<T>, total: u64, pagination: Option<Pagination>) -> Self {
        match pagination {
            Some(p) => Self {
                items,
                total,
                page: p.page,
                total_pages: total.div_ceil(p.page_size).max(1),
            },
            None => Self {
                items,
                total,
                page: 1,
                total_pages: 1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_covers_all_filter_shapes() {
        let options = QueryOptions::from_json(&json!({
            "role": ["admin", "manager"],
            "age": {"operator": "gte", "value": 18},
            "name_search": "ada",
            "city": "Springfield",
        }))
        .unwrap();

        assert_eq!(options.filters.len(), 4);
        assert!(options.filters.contains(&Filter {
            column: "role".to_string(),
            value: FilterValue::In(vec![json!("admin"), json!("manager")]),
        }));
        assert!(options.filters.contains(&Filter {
            column: "age".to_string(),
            value: FilterValue::Compare {
                op: CompareOp::Gte,
                value: json!(18),
            },
        }));
        assert!(options.filters.contains(&Filter {
            column: "name".to_string(),
            value: FilterValue::Search("ada".to_string()),
        }));
        assert!(options.filters.contains(&Filter {
            column: "city".to_string(),
            value: FilterValue::Eq(json!("Springfield")),
        }));
    }

    #[test]
    fn test_from_json_rejects_unknown_operator() {
        assert!(QueryOptions::from_json(&json!({"age": {"operator": "between", "value": 1}})).is_err());
    }

    #[test]
    fn test_pagination_offsets_are_one_indexed() {
        let p = Pagination::new(1, 25);
        assert_eq!(p.offset(), 0);
        let p = Pagination::new(3, 25);
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let paged = PagedResult::<u32>::assemble(vec![], 101, Some(Pagination::new(1, 25)));
        assert_eq!(paged.total_pages, 5);

        let paged = PagedResult::<u32>::assemble(vec![], 100, Some(Pagination::new(1, 25)));
        assert_eq!(paged.total_pages, 4);

        let paged = PagedResult::<u32>::assemble(vec![], 0, Some(Pagination::new(1, 25)));
        assert_eq!(paged.total_pages, 1);
    }

    #[test]
    fn test_unpaginated_queries_are_one_page() {
        let paged = PagedResult::<u32>::assemble(vec![], 500, None);
        assert_eq!(paged.total_pages, 1);
        assert_eq!(paged.page, 1);
    }
}
