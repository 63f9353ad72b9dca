use std::fmt::Write;

use stockbrief_core::domain::stock::or_unknown;
use stockbrief_core::domain::{PriceBar, SessionState, TimeFrame};

pub fn help() -> String {
    let mut out = String::from("Stock Analysis Application\n");
    out.push_str("Enter `TICKER TIMEFRAME` (e.g. `AAPL 1mo`), `show`, `help` or `quit`.\n");
    out.push_str("Timeframes:\n");
    for tf in TimeFrame::ALL {
        let _ = writeln!(out, "  {:<4} {}", tf.code(), tf.label());
    }
    out
}

/// Text view of the session. Only the last `max_rows` history rows are shown.
pub fn render_state(state: &SessionState, max_rows: usize) -> String {
    let mut out = String::new();
    if !state.status_message.is_empty() {
        let _ = writeln!(out, "{}", state.status_message);
    }

    if let Some(info) = &state.stock_info {
        let time_frame = state.time_frame.map(|tf| tf.label()).unwrap_or("-");
        let _ = writeln!(out, "\n{} ({time_frame})", state.selected_stock);
        for (label, value) in info.display_fields() {
            let _ = writeln!(out, "  {label:<22} {value}");
        }
    }

    if let Some(history) = &state.stock_history {
        let currency = history.currency.as_deref().unwrap_or("");
        let _ = writeln!(
            out,
            "\nHistory: {} rows {currency}",
            history.len()
        );
        let _ = writeln!(
            out,
            "  {:<22} {:>10} {:>10} {:>10} {:>10} {:>12}",
            "Date", "Open", "High", "Low", "Close", "Volume"
        );
        let skip = history.len().saturating_sub(max_rows);
        for row in history.rows.iter().skip(skip) {
            out.push_str(&render_row(row));
        }
    }

    if state.stock_summary_visible {
        let _ = writeln!(out, "\nSummary\n{}", state.stock_summary);
    }
    out
}

fn render_row(row: &PriceBar) -> String {
    let price = |v: Option<f64>| match v {
        Some(v) => format!("{v:.2}"),
        None => "-".to_string(),
    };
    format!(
        "  {:<22} {:>10} {:>10} {:>10} {:>10} {:>12}\n",
        row.timestamp.format("%Y-%m-%d %H:%M %:z").to_string(),
        price(row.open),
        price(row.high),
        price(row.low),
        price(row.close),
        or_unknown(row.volume.as_ref()),
    )
}
