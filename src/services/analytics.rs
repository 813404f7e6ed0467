use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::client::{ApiClient, SentimentSnapshot, TopicCount, VoterStats};
use crate::domain::user::{ALL_ROLES, Role, User};
use crate::repository::Repository;
use crate::repository::filters::QueryOptions;

/// One point on the sentiment trend chart: per-day percentage stack.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub positive_pct: f64,
    pub neutral_pct: f64,
    pub negative_pct: f64,
    pub total: u64,
}

/// A named series of (label, value) pairs, ready for a chart component.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstituencyDrilldownRow {
    pub constituency_id: Uuid,
    pub constituency: String,
    pub total: u64,
    pub contacted: u64,
    pub contact_rate_pct: f64,
}

fn pct(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

/// Reshape daily counts into percentage stacks, sorted by date. Days with
/// no responses chart as zero rather than dividing by zero.
pub fn sentiment_trend(daily: &[SentimentSnapshot]) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = daily
        .iter()
        .map(|snapshot| {
            let total = snapshot.positive + snapshot.neutral + snapshot.negative;
            TrendPoint {
                date: snapshot.date,
                positive_pct: pct(snapshot.positive, total),
                neutral_pct: pct(snapshot.neutral, total),
                negative_pct: pct(snapshot.negative, total),
                total,
            }
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

/// One series per sentiment label, with topics as the category axis.
pub fn topic_breakdown(by_topic: &[TopicCount]) -> Vec<ChartSeries> {
    let series = |name: &str, value: fn(&TopicCount) -> u64| ChartSeries {
        name: name.to_string(),
        points: by_topic
            .iter()
            .map(|t| (t.topic.clone(), value(t) as f64))
            .collect(),
    };
    vec![
        series("positive", |t| t.positive),
        series("neutral", |t| t.neutral),
        series("negative", |t| t.negative),
    ]
}

/// Per-role headcount for the admin view, highest rank first. Roles with no
/// users still appear so the chart axis is stable.
pub fn role_distribution(users: &[User]) -> Vec<(Role, usize)> {
    let mut counts: HashMap<Role, usize> = HashMap::new();
    for user in users {
        *counts.entry(user.role).or_insert(0) += 1;
    }
    let mut rows: Vec<(Role, usize)> = ALL_ROLES
        .iter()
        .map(|role| (*role, counts.get(role).copied().unwrap_or(0)))
        .collect();
    rows.sort_by(|a, b| b.0.rank().cmp(&a.0.rank()));
    rows
}

pub fn constituency_drilldown(stats: &VoterStats) -> Vec<ConstituencyDrilldownRow> {
    let mut rows: Vec<ConstituencyDrilldownRow> = stats
        .by_constituency
        .iter()
        .map(|c| ConstituencyDrilldownRow {
            constituency_id: c.constituency_id,
            constituency: c.constituency_name.clone(),
            total: c.total,
            contacted: c.contacted,
            contact_rate_pct: pct(c.contacted, c.total),
        })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows
}

#[derive(Debug, Clone)]
pub struct SentimentOverview {
    pub trend: Vec<TrendPoint>,
    pub topics: Vec<ChartSeries>,
}

/// Page-level composition: fetch from the backend and the record store,
/// reshape into chart-ready data. Rendering is someone else's problem.
pub struct DashboardService {
    api: Arc<ApiClient>,
    repository: Repository,
}

impl DashboardService {
    pub fn new(api: Arc<ApiClient>, repository: Repository) -> Self {
        Self { api, repository }
    }

    pub async fn sentiment_overview(
        &self,
        constituency_id: Option<Uuid>,
    ) -> Result<SentimentOverview> {
        let summary = self.api.sentiment_summary(constituency_id).await?;
        Ok(SentimentOverview {
            trend: sentiment_trend(&summary.daily),
            topics: topic_breakdown(&summary.by_topic),
        })
    }

    pub async fn voter_drilldown(&self) -> Result<Vec<ConstituencyDrilldownRow>> {
        let stats = self.api.voter_stats().await?;
        Ok(constituency_drilldown(&stats))
    }

    pub async fn team_overview(&self) -> Result<Vec<(Role, usize)>> {
        let users = self.repository.users.list(QueryOptions::new()).await?;
        Ok(role_distribution(&users.items))
    }
}
