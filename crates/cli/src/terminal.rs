use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use rapport_compute::ClosenessReport;

/// Color scheme for console output.
struct Colors;

impl Colors {
    const HEADER: Color = Color::Magenta;
    const RANK: Color = Color::Yellow;
    const SCORE: Color = Color::Cyan;
    const DIM: Color = Color::DarkGrey;
    const WARN: Color = Color::Red;
    const DONE: Color = Color::Green;
}

const NAME_WIDTH: usize = 18;

/// Console summary of a run. Diagnostics go through `tracing`; this is the
/// human-facing result.
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    /// Ranked table of the first `top_n` pairs.
    pub fn print_top_pairs(&self, report: &ClosenessReport, top_n: usize) -> Result<()> {
        let mut stdout = io::stdout();
        let rows = report.top(top_n);

        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print(format!("Top {} of {} pairs", rows.len(), report.len())),
            ResetColor,
            SetForegroundColor(Colors::DIM),
            Print(format!(
                "  (activity factor {:.2}, {} scaling)\n",
                report.activity_factor, report.normalization
            )),
            ResetColor,
        )?;
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!(
                "{:>4}  {:<w$}  {:<w$}  {:>7}  {:>7}  {:>7}\n",
                "#",
                "user 1",
                "user 2",
                "score",
                "replies",
                "msgs",
                w = NAME_WIDTH
            )),
            ResetColor,
        )?;

        for (i, row) in rows.iter().enumerate() {
            execute!(
                stdout,
                SetForegroundColor(Colors::RANK),
                Print(format!("{:>4}", i + 1)),
                ResetColor,
                Print(format!(
                    "  {}  {}  ",
                    fit(&label(&row.name_a, row.pair.a()), NAME_WIDTH),
                    fit(&label(&row.name_b, row.pair.b()), NAME_WIDTH)
                )),
                SetForegroundColor(Colors::SCORE),
                Print(format!("{:>7.4}", row.closeness_score)),
                ResetColor,
                Print(format!("  {:>7}  {:>7}\n", row.raw.reply_count, row.raw.total_messages())),
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_empty(&self, reason: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::WARN),
            Print(format!("No closeness table: {}\n", reason)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_saved(&self, path: &Path, rows: usize) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DONE),
            Print(format!("Saved {} pairs to {}\n", rows, path.display())),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

/// `name (id)`, or just the id when the name is the id.
fn label(name: &str, id: &str) -> String {
    if name == id {
        id.to_string()
    } else {
        format!("{} ({})", name, id)
    }
}

/// Pad or cut `text` to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        format!("{}{}", text, " ".repeat(width - count))
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_pads_and_truncates_by_chars() {
        assert_eq!(fit("ab", 4), "ab  ");
        assert_eq!(fit("小明同学你好", 4), "小明同…");
        assert_eq!(fit("abcd", 4), "abcd");
    }

    #[test]
    fn label_skips_duplicate_id() {
        assert_eq!(label("42", "42"), "42");
        assert_eq!(label("Alice", "42"), "Alice (42)");
    }
}
