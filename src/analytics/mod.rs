/// Inbox analytics: sender frequency, sentiment and topic clusters
pub mod sentiment;
pub mod summary;
pub mod topics;

use once_cell::sync::Lazy;
use regex::Regex;

pub use summary::{analyze, run_analytics, sender_counts, write_summary, AnalyticsReport, SenderSummary};
pub use topics::{cluster_topics, TopicModel};

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+(?:['\-][a-z0-9]+)*").unwrap());

/// Lowercased word tokens
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase().replace('\u{2019}', "'");
    WORD.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}
