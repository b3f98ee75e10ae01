use crate::liquidity::LiquidityRecord;
use crate::market_data::Interval;
use crate::screener::CategoryBuckets;

// Telegram legacy Markdown: single asterisks render bold.
const SEPARATOR: &str = "----------------------------------------------";
const NO_LIQUIDITY_MATCH: &str = "No high liquidity F&O stocks found.";

const CRORE: f64 = 10_000_000.0;

/// Renders the screener report: one section per interval, six categories
/// each, empty categories marked with an explicit `- None`.
pub fn format_screener_report(sections: &[(Interval, CategoryBuckets)]) -> String {
    let mut out = String::new();
    for (interval, buckets) in sections {
        out.push_str(&format!("--- {} Results ---\n\n", interval));
        let categories: [(&str, &[String]); 6] = [
            ("EMA Overbought", &buckets.ema_overbought),
            ("Stoch Overbought", &buckets.stoch_overbought),
            ("Both Overbought", &buckets.both_overbought),
            ("EMA Oversold", &buckets.ema_oversold),
            ("Stoch Oversold", &buckets.stoch_oversold),
            ("Both Oversold", &buckets.both_oversold),
        ];
        for (label, tickers) in categories {
            out.push_str(&format!("*{}:*\n", label));
            if tickers.is_empty() {
                out.push_str("- None\n");
            } else {
                for ticker in tickers {
                    out.push_str(&format!("- {}\n", ticker));
                }
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Renders the liquidity report, or its sentinel line when nothing made the
/// cut. Market cap is shown in Cr; the raw value already decided the flag.
pub fn format_liquidity_report(records: &[LiquidityRecord]) -> String {
    let qualifying: Vec<&LiquidityRecord> = records.iter().filter(|r| r.qualifies).collect();
    if qualifying.is_empty() {
        return NO_LIQUIDITY_MATCH.to_string();
    }

    let mut out = String::from("*High Liquidity F&O Stocks:*\n");
    out.push_str(SEPARATOR);
    out.push('\n');
    for record in qualifying {
        out.push_str(&format!("- *{}*\n", record.ticker));
        out.push_str(&format!(
            "- Avg Volume: {}\n",
            group_thousands(record.avg_volume.round() as u64)
        ));
        out.push_str(&format!(
            "- Market Cap: {} Cr\n",
            format_two_decimals(record.market_cap / CRORE)
        ));
        out.push_str(SEPARATOR);
        out.push('\n');
    }
    out
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn format_two_decimals(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let whole = rounded.trunc() as u64;
    let cents = ((rounded - rounded.trunc()) * 100.0).round() as u64;
    format!("{}.{:02}", group_thousands(whole), cents)
}
