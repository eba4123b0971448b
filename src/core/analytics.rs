//! Aggregate statistics and dashboard data over saved conversations
//!
//! All functions take `now` explicitly so results are reproducible.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::conversation::{Conversation, ConversationType};

use super::store::sort_newest_first;

const RECENT_WINDOW_DAYS: i64 = 7;
const RECENT_TABLE_SIZE: usize = 10;
const TITLE_PREVIEW_CHARS: usize = 40;

/// Summary counts shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_conversations: usize,
    /// Sum of `message_count` snapshots
    pub total_messages: usize,
    pub type_distribution: BTreeMap<ConversationType, usize>,
    /// Conversations created within the last seven days
    pub recent_activity: usize,
    pub avg_messages_per_conversation: f64,
}

impl Statistics {
    pub fn compute(conversations: &[Conversation], now: DateTime<Utc>) -> Self {
        let total_conversations = conversations.len();
        let total_messages: usize = conversations.iter().map(|c| c.message_count).sum();

        let mut type_distribution = BTreeMap::new();
        for conv in conversations {
            *type_distribution.entry(conv.conversation_type).or_insert(0) += 1;
        }

        let week_ago = now - Duration::days(RECENT_WINDOW_DAYS);
        let recent_activity = conversations
            .iter()
            .filter(|c| c.created_at > week_ago)
            .count();

        Self {
            total_conversations,
            total_messages,
            type_distribution,
            recent_activity,
            avg_messages_per_conversation: round_to(
                total_messages as f64 / total_conversations.max(1) as f64,
                1,
            ),
        }
    }

    /// Most frequent type; ties go to the earlier enumeration entry
    pub fn most_active_type(&self) -> ConversationType {
        let mut best = ConversationType::General;
        let mut best_count = 0;
        for (kind, count) in &self.type_distribution {
            if *count > best_count {
                best = *kind;
                best_count = *count;
            }
        }
        best
    }
}

/// Conversations and messages created on one local calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub conversations: usize,
    pub messages: usize,
}

/// One row of the recent conversations table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentConversation {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub conversation_type: ConversationType,
    pub messages: usize,
    pub created: DateTime<Utc>,
    pub days_ago: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongestConversation {
    pub id: u64,
    pub title: String,
    pub message_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub avg_conversations_per_day: f64,
    pub most_active_type: ConversationType,
    pub longest_conversation: Option<LongestConversation>,
    pub total_days_active: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStyle {
    MoreEngaging,
    MoreConcise,
}

/// Week-over-week comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trends {
    pub recent_week: usize,
    pub previous_week: usize,
    pub growth: i64,
    pub direction: TrendDirection,
    pub recent_avg_messages: f64,
    pub style: ConversationStyle,
}

/// Everything the analytics dashboard renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub stats: Statistics,
    pub message_counts: Vec<usize>,
    pub timeline: Vec<TimelinePoint>,
    pub recent_conversations: Vec<RecentConversation>,
    pub insights: Insights,
    /// Only present once there are at least two conversations
    pub trends: Option<Trends>,
}

impl Dashboard {
    pub fn build(conversations: &[Conversation], now: DateTime<Utc>) -> Self {
        let stats = Statistics::compute(conversations, now);
        let insights = insights(conversations, &stats, now);
        let trends = trends(conversations, &stats, now);

        Self {
            message_counts: conversations.iter().map(|c| c.message_count).collect(),
            timeline: timeline(conversations),
            recent_conversations: recent_conversations(conversations, now),
            stats,
            insights,
            trends,
        }
    }
}

/// Downloadable analytics report
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub summary: Statistics,
    pub conversations: Vec<Conversation>,
    pub insights: Insights,
}

impl AnalyticsReport {
    pub fn build(conversations: Vec<Conversation>, now: DateTime<Utc>) -> Self {
        let summary = Statistics::compute(&conversations, now);
        let insights = insights(&conversations, &summary, now);
        Self {
            generated_at: now,
            summary,
            conversations,
            insights,
        }
    }
}

pub fn timeline(conversations: &[Conversation]) -> Vec<TimelinePoint> {
    let mut by_day: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for conv in conversations {
        let day = conv.created_at.with_timezone(&Local).date_naive();
        let entry = by_day.entry(day).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += conv.message_count;
    }

    by_day
        .into_iter()
        .map(|(date, (conversations, messages))| TimelinePoint {
            date,
            conversations,
            messages,
        })
        .collect()
}

pub fn recent_conversations(
    conversations: &[Conversation],
    now: DateTime<Utc>,
) -> Vec<RecentConversation> {
    let mut sorted = conversations.to_vec();
    sort_newest_first(&mut sorted);

    sorted
        .into_iter()
        .take(RECENT_TABLE_SIZE)
        .map(|c| RecentConversation {
            id: c.id,
            title: preview_title(&c.title),
            conversation_type: c.conversation_type,
            messages: c.message_count,
            created: c.created_at,
            days_ago: (now - c.created_at).num_days(),
        })
        .collect()
}

pub fn insights(conversations: &[Conversation], stats: &Statistics, now: DateTime<Utc>) -> Insights {
    // Measured from the first conversation in storage order
    let total_days = conversations
        .first()
        .map(|c| (now - c.created_at).num_days() + 1)
        .unwrap_or(1)
        .max(1);

    let longest_conversation = conversations
        .iter()
        .fold(None::<&Conversation>, |best, c| match best {
            Some(b) if b.message_count >= c.message_count => Some(b),
            _ => Some(c),
        })
        .map(|c| LongestConversation {
            id: c.id,
            title: c.title.clone(),
            message_count: c.message_count,
        });

    Insights {
        avg_conversations_per_day: round_to(conversations.len() as f64 / total_days as f64, 2),
        most_active_type: stats.most_active_type(),
        longest_conversation,
        total_days_active: total_days,
    }
}

pub fn trends(conversations: &[Conversation], stats: &Statistics, now: DateTime<Utc>) -> Option<Trends> {
    if conversations.len() < 2 {
        return None;
    }

    let age_days = |c: &Conversation| (now - c.created_at).num_days();
    let recent: Vec<&Conversation> = conversations
        .iter()
        .filter(|c| age_days(c) <= RECENT_WINDOW_DAYS)
        .collect();
    let previous_week = conversations
        .iter()
        .filter(|c| {
            let age = age_days(c);
            age > RECENT_WINDOW_DAYS && age <= 2 * RECENT_WINDOW_DAYS
        })
        .count();

    let growth = recent.len() as i64 - previous_week as i64;
    let direction = match growth {
        g if g > 0 => TrendDirection::Increasing,
        g if g < 0 => TrendDirection::Decreasing,
        _ => TrendDirection::Stable,
    };

    let recent_messages: usize = recent.iter().map(|c| c.message_count).sum();
    let recent_avg = recent_messages as f64 / recent.len().max(1) as f64;
    let style = if recent_avg > stats.avg_messages_per_conversation {
        ConversationStyle::MoreEngaging
    } else {
        ConversationStyle::MoreConcise
    };

    Some(Trends {
        recent_week: recent.len(),
        previous_week,
        growth,
        direction,
        recent_avg_messages: round_to(recent_avg, 1),
        style,
    })
}

fn preview_title(title: &str) -> String {
    if title.chars().count() > TITLE_PREVIEW_CHARS {
        let head: String = title.chars().take(TITLE_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
