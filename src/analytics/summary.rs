use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use super::sentiment;
use super::topics::cluster_topics;
use crate::config::AnalyticsOptions;
use crate::email::MailMessage;
use crate::graph_client::MessageQuery;
use crate::migration::MessageSource;

pub const SUMMARY_HEADERS: [&str; 4] = ["sender", "message_count", "avg_sentiment", "topic"];

/// One row of the summary table
#[derive(Debug, Clone, PartialEq)]
pub struct SenderSummary {
    pub sender: String,
    pub message_count: usize,
    pub avg_sentiment: f64,
    pub topic: String,
}

#[derive(Debug, Default)]
pub struct AnalyticsReport {
    pub message_count: usize,
    pub rows: Vec<SenderSummary>,
    pub topic_labels: Vec<String>,
    pub average_sentiment: f64,
}

impl AnalyticsReport {
    pub fn print_summary(&self, top_n: usize) {
        println!("{}", "=".repeat(80));
        println!(
            "📊 {} message(s) from {} sender(s), average sentiment {:.3}",
            self.message_count,
            self.rows.len(),
            self.average_sentiment
        );
        if !self.topic_labels.is_empty() {
            println!("🧩 Topics:");
            for (i, label) in self.topic_labels.iter().enumerate() {
                println!("   {}. {}", i + 1, label);
            }
        }
        if !self.rows.is_empty() {
            println!("🏆 Top senders:");
            for row in self.rows.iter().take(top_n) {
                println!(
                    "   {:<40} {:>5}  {:>6.3}  {}",
                    row.sender, row.message_count, row.avg_sentiment, row.topic
                );
            }
        }
        println!("{}", "=".repeat(80));
    }
}

/// Messages per sender, addresses compared case-insensitively
pub fn sender_counts(messages: &[MailMessage]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for message in messages {
        *counts.entry(message.sender.to_lowercase()).or_insert(0) += 1;
    }
    counts
}

#[derive(Default)]
struct SenderAccumulator {
    count: usize,
    sentiment_total: f64,
    topics: BTreeMap<String, usize>,
}

/// One row per sender: count, mean per-message sentiment, dominant topic.
/// Rows are sorted by count (descending) then sender.
pub fn analyze(messages: &[MailMessage], options: &AnalyticsOptions) -> AnalyticsReport {
    if messages.is_empty() {
        return AnalyticsReport::default();
    }

    let documents: Vec<String> = messages
        .iter()
        .map(|m| format!("{}\n{}", m.subject, m.body))
        .collect();
    let model = cluster_topics(&documents, options.topic_count);

    let mut by_sender: BTreeMap<String, SenderAccumulator> = BTreeMap::new();
    let mut sentiment_total = 0.0;

    for (index, message) in messages.iter().enumerate() {
        let score = sentiment::score(&message.body);
        sentiment_total += score;

        let entry = by_sender.entry(message.sender.to_lowercase()).or_default();
        entry.count += 1;
        entry.sentiment_total += score;
        *entry.topics.entry(model.label_of(index).to_string()).or_insert(0) += 1;
    }

    let mut rows: Vec<SenderSummary> = by_sender
        .into_iter()
        .map(|(sender, acc)| {
            // most frequent topic; BTreeMap order breaks ties alphabetically
            let topic = acc
                .topics
                .iter()
                .fold(None, |best: Option<(&String, usize)>, (label, &n)| match best {
                    Some((_, m)) if m >= n => best,
                    _ => Some((label, n)),
                })
                .map(|(label, _)| label.clone())
                .unwrap_or_default();

            SenderSummary {
                sender,
                message_count: acc.count,
                avg_sentiment: acc.sentiment_total / acc.count as f64,
                topic,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.message_count
            .cmp(&a.message_count)
            .then_with(|| a.sender.cmp(&b.sender))
    });

    AnalyticsReport {
        message_count: messages.len(),
        rows,
        topic_labels: model.labels,
        average_sentiment: sentiment_total / messages.len() as f64,
    }
}

/// CSV with a header line, even when there are no rows
pub fn write_summary<W: Write>(rows: &[SenderSummary], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

    csv_writer
        .write_record(SUMMARY_HEADERS)
        .context("Unable to write summary header")?;

    for row in rows {
        csv_writer
            .write_record([
                row.sender.clone(),
                row.message_count.to_string(),
                format!("{:.3}", row.avg_sentiment),
                row.topic.clone(),
            ])
            .with_context(|| format!("Unable to write summary row for {}", row.sender))?;
    }

    csv_writer.flush().context("Unable to flush summary file")?;
    Ok(())
}

pub fn write_summary_file(rows: &[SenderSummary], path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Unable to create summary file {}", path.display()))?;
    write_summary(rows, file)?;
    info!("💾 Summary written to {} ({} row(s))", path.display(), rows.len());
    Ok(())
}

/// Fetch, analyze, write the summary table. Full recompute on every run.
pub async fn run_analytics<S: MessageSource>(
    source: &S,
    query: &MessageQuery,
    options: &AnalyticsOptions,
) -> Result<AnalyticsReport> {
    info!("Starting analytics of folder '{}'", query.folder_label());

    let messages = source
        .fetch_messages(query)
        .await
        .context("Error fetching messages")?;

    let report = analyze(&messages, options);
    for row in report.rows.iter().take(options.top_n) {
        info!("Top sender {} ({} message(s))", row.sender, row.message_count);
    }
    write_summary_file(&report.rows, &options.output_path)?;

    Ok(report)
}
