use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use rapport_compute::{ClosenessReport, ClosenessRow};
use serde::Serialize;

/// One CSV line: ids, names, raw features, scaled features and the score.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    user1: &'a str,
    user2: &'a str,
    name1: &'a str,
    name2: &'a str,
    avg_response_time: f64,
    resp_time_1_to_2: f64,
    resp_time_2_to_1: f64,
    reply_count: usize,
    chat_frequency: f64,
    interaction_continuity: f64,
    reciprocity: f64,
    message_length: f64,
    avg_len_1: f64,
    avg_len_2: f64,
    dialogue_continuity: f64,
    count_1: usize,
    count_2: usize,
    norm_avg_response_time: f64,
    norm_chat_frequency: f64,
    norm_interaction_continuity: f64,
    norm_reciprocity: f64,
    norm_message_length: f64,
    norm_reply_count: f64,
    norm_dialogue_continuity: f64,
    closeness_score: f64,
}

impl<'a> From<&'a ClosenessRow> for CsvRow<'a> {
    fn from(row: &'a ClosenessRow) -> Self {
        let raw = &row.raw;
        let norm = &row.normalized;
        Self {
            user1: row.pair.a(),
            user2: row.pair.b(),
            name1: &row.name_a,
            name2: &row.name_b,
            avg_response_time: raw.avg_response_time,
            resp_time_1_to_2: raw.resp_time_a_to_b,
            resp_time_2_to_1: raw.resp_time_b_to_a,
            reply_count: raw.reply_count,
            chat_frequency: raw.chat_frequency,
            interaction_continuity: raw.interaction_continuity,
            reciprocity: raw.reciprocity,
            message_length: raw.message_length,
            avg_len_1: raw.avg_len_a,
            avg_len_2: raw.avg_len_b,
            dialogue_continuity: raw.dialogue_continuity,
            count_1: raw.count_a,
            count_2: raw.count_b,
            norm_avg_response_time: norm.avg_response_time,
            norm_chat_frequency: norm.chat_frequency,
            norm_interaction_continuity: norm.interaction_continuity,
            norm_reciprocity: norm.reciprocity,
            norm_message_length: norm.message_length,
            norm_reply_count: norm.reply_count,
            norm_dialogue_continuity: norm.dialogue_continuity,
            closeness_score: row.closeness_score,
        }
    }
}

/// Write every row of `report`, highest score first.
pub fn write_csv<W: io::Write>(writer: W, report: &ClosenessReport) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in &report.rows {
        csv.serialize(CsvRow::from(row))
            .with_context(|| format!("failed to write row for {}", row.pair))?;
    }
    csv.flush().context("failed to flush CSV output")?;
    Ok(())
}

pub fn write_csv_file(path: &Path, report: &ClosenessReport) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(io::BufWriter::new(file), report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rapport_compute::{AnalysisOptions, ClosenessEngine};
    use rapport_core::{ChatEvent, EventStore};

    fn make_event(sender: &str, nickname: &str, secs: i64) -> ChatEvent {
        let base = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        ChatEvent::new(sender, nickname, "hello, there", base + Duration::seconds(secs))
    }

    #[test]
    fn header_and_rows() {
        let store = EventStore::new(vec![
            make_event("1", "Alice", 0),
            make_event("2", "Bob", 20),
            make_event("1", "Alice", 45),
        ]);
        let report = ClosenessEngine::run(&store, &AnalysisOptions::default());

        let mut buf = Vec::new();
        write_csv(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("user1,user2,name1,name2,avg_response_time,"));
        assert!(header.ends_with(",closeness_score"));

        let row = lines.next().unwrap();
        assert!(row.starts_with("1,2,Alice,Bob,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_report_writes_nothing() {
        let report = ClosenessEngine::run(&EventStore::default(), &AnalysisOptions::default());
        let mut buf = Vec::new();
        write_csv(&mut buf, &report).unwrap();
        assert!(buf.is_empty());
    }
}
