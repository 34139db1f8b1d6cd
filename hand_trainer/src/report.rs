//! Text rendering of the history view: recent completions plus the daily
//! progress table.

use pose_catalog::PoseCatalog;
use pose_history::{summarize_daily, DailySummary, History, HistoryError, LogEntry};

/// How many recent completions the history view shows.
pub const TAIL_LINES: usize = 13;

/// One rendered line of the recent-completions list.
fn tail_row(entry: &LogEntry, catalog: &PoseCatalog) -> String {
    let name = catalog
        .get(entry.pose_id)
        .map(|p| p.name.as_str())
        .unwrap_or("?");
    format!("{} — {}", entry.to_line(), name)
}

/// One rendered row of the daily progress table.
fn summary_row(row: &DailySummary) -> String {
    let filled = (row.progress_pct / 10.0).round() as usize;
    let bar: String = (0..10).map(|i| if i < filled { '█' } else { '·' }).collect();
    format!(
        "{}  {:>4}  {:>4}  {:>4.0}%  [{}] {}",
        row.date,
        row.completions,
        row.sets_done,
        row.progress_pct,
        bar,
        row.trend.arrow(),
    )
}

/// Print the full report: the most recent completions, then one progress
/// row per day with a trend arrow against the previous day.
pub fn print_report(history: &dyn History, catalog: &PoseCatalog) -> Result<(), HistoryError> {
    let recent = history.tail(TAIL_LINES)?;
    println!("  Recent completions");
    if recent.is_empty() {
        println!("  (no history yet)");
    }
    for entry in &recent {
        println!("  {}", tail_row(entry, catalog));
    }

    let all = history.tail(usize::MAX)?;
    let rows = summarize_daily(&all);
    if rows.is_empty() {
        return Ok(());
    }

    println!();
    println!("  Daily progress");
    println!("  {:<10}  {:>4}  {:>4}  {:>5}", "date", "done", "sets", "prog");
    for row in &rows {
        println!("  {}", summary_row(row));
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
