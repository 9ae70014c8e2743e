//! Plain-text reports. Every function here is pure: data in, text out.

use ibkr_readonly::{
    AccountSummary, AuthStatus, Bar, Fundamentals, NewsItem, Position, Quote,
};
use serde_json::Value;

const RULE_WIDTH: usize = 50;

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

/// `$1,234.56`, or `-$1,234.56` for negatives.
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let dollars = group_thousands(cents / 100);
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${dollars}.{:02}", cents % 100)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Signed P&L with an up/down marker: `📈 +$50.00 (+5.00%)`.
pub fn format_pnl(value: f64, pct: f64) -> String {
    // Sub-cent losses print as zero, so they get the up marker too.
    let cents = (value * 100.0).round();
    if cents >= 0.0 {
        format!("📈 +{} ({pct:+.2}%)", format_currency(value))
    } else {
        format!("📉 {} ({pct:+.2}%)", format_currency(value))
    }
}

/// Large counts as `2.50T`, `55.30M`, `1.20K`.
pub fn format_compact(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (value / 1e12, "T")
    } else if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };
    format!("{scaled:.2}{suffix}")
}

fn optional(value: Option<f64>, fmt: impl Fn(f64) -> String) -> String {
    value.map(fmt).unwrap_or_else(|| "n/a".to_string())
}

pub fn render_status(status: &AuthStatus) -> String {
    match status {
        AuthStatus::Authenticated => "✅ Gateway session authenticated".to_string(),
        AuthStatus::NotAuthenticated => {
            "❌ Not authenticated. Log in through the gateway first.".to_string()
        }
        AuthStatus::Unreachable(reason) => format!("❌ Gateway unreachable: {reason}"),
    }
}

pub fn render_summary(account_id: &str, summary: &AccountSummary) -> String {
    let mut lines = vec![format!("📊 Account: {account_id}")];
    if !summary.currency.is_empty() {
        lines.push(format!("   Currency:        {}", summary.currency));
    }
    lines.push(format!("💵 Cash:            {}", format_currency(summary.cash)));
    lines.push(format!(
        "💰 Net liquidation: {}",
        format_currency(summary.net_liquidation)
    ));
    lines.push(format!(
        "   Buying power:    {}",
        format_currency(summary.buying_power)
    ));
    lines.push(format!(
        "   Available funds: {}",
        format_currency(summary.available_funds)
    ));
    lines.join("\n")
}

/// Position list with the total unrealized P&L as a share of net liquidation.
pub fn render_positions(positions: &[Position], net_liquidation: f64) -> String {
    if positions.is_empty() {
        return "No positions.".to_string();
    }

    let mut lines = vec![format!("📈 Positions: {}", positions.len()), rule()];
    for pos in positions {
        lines.push(format!("  {}", pos.symbol));
        lines.push(format!(
            "    Qty: {:.0} | Avg cost: {} | Value: {}",
            pos.quantity,
            format_currency(pos.avg_cost),
            format_currency(pos.market_value),
        ));
        lines.push(format!(
            "    P&L: {}",
            format_pnl(pos.unrealized_pnl, pos.pnl_percent)
        ));
    }

    let total = total_unrealized(positions);
    let pct = if net_liquidation != 0.0 {
        total / net_liquidation * 100.0
    } else {
        0.0
    };
    lines.push(rule());
    lines.push(format!("📊 Total P&L: {}", format_pnl(total, pct)));
    lines.join("\n")
}

pub fn total_unrealized(positions: &[Position]) -> f64 {
    positions.iter().map(|p| p.unrealized_pnl).sum()
}

pub fn render_quotes(quotes: &[(String, Quote)]) -> String {
    if quotes.is_empty() {
        return "No quotes available.".to_string();
    }

    let mut lines = vec![format!(
        "  {:8} {:>10} {:>10} {:>10} {:>12} {:>9}",
        "Symbol", "Last", "Bid", "Ask", "Volume", "Change"
    )];
    for (symbol, q) in quotes {
        lines.push(format!(
            "  {:8} {:>10.2} {:>10.2} {:>10.2} {:>12} {:>+8.2}%",
            symbol, q.last_price, q.bid, q.ask, q.volume, q.change_pct
        ));
    }
    lines.join("\n")
}

pub fn render_fundamentals(f: &Fundamentals) -> String {
    let money = |v: f64| format!("${}", format_compact(v));
    let plain = |v: f64| format!("{v:.2}");

    let mut lines = vec![format!("🏢 {} ({})", f.company_name, f.symbol)];
    if !f.industry.is_empty() {
        lines.push(format!("   Industry:   {} / {}", f.industry, f.category));
    }
    lines.push(rule());
    lines.push(format!("   Market cap: {}", optional(f.market_cap, money)));
    lines.push(format!("   P/E:        {}", optional(f.pe_ratio, plain)));
    lines.push(format!("   EPS:        {}", optional(f.eps, plain)));
    lines.push(format!(
        "   Div. yield: {}",
        optional(f.dividend_yield, |v| format!("{v:.2}%"))
    ));
    lines.push(format!(
        "   52w range:  {} - {}",
        optional(f.low_52w, plain),
        optional(f.high_52w, plain)
    ));
    lines.push(format!(
        "   Avg volume: {}",
        optional(f.avg_volume, format_compact)
    ));
    lines.join("\n")
}

pub fn render_bars(symbol: &str, bars: &[Bar]) -> String {
    if bars.is_empty() {
        return format!("No bars for {symbol}.");
    }

    let mut lines = vec![format!(
        "  {:16} {:>10} {:>10} {:>10} {:>10} {:>12}",
        "Time (UTC)", "Open", "High", "Low", "Close", "Volume"
    )];
    for bar in bars {
        lines.push(format!(
            "  {:16} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12.0}",
            bar.time.format("%Y-%m-%d %H:%M"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
        ));
    }
    lines.join("\n")
}

/// Scanner hits from the raw `contracts` array.
pub fn render_scanner(result: &Value) -> String {
    let hits = result
        .get("contracts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if hits.is_empty() {
        return "No scanner hits.".to_string();
    }

    let mut lines = vec![format!("🔎 Scanner hits: {}", hits.len())];
    for (i, hit) in hits.iter().enumerate() {
        let symbol = hit.get("symbol").and_then(Value::as_str).unwrap_or("?");
        let name = hit
            .get("company_name")
            .or_else(|| hit.get("companyHeader"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        lines.push(format!("  {:>3}. {symbol:8} {name}", i + 1));
    }
    lines.join("\n")
}

pub fn render_headlines(symbol: &str, items: &[NewsItem]) -> String {
    if items.is_empty() {
        return format!("No headlines for {symbol}.");
    }

    let mut lines = vec![format!("📰 {symbol}")];
    for item in items {
        lines.push(format!("  • {}", item.title));
        if !item.date.is_empty() {
            lines.push(format!("    {}", item.date));
        }
        if !item.link.is_empty() {
            lines.push(format!("    {}", item.link));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibkr_readonly::Conid;
    use serde_json::json;

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency(1234.56), "$1,234.56");
        assert_eq!(format_currency(-1234.56), "-$1,234.56");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(1_234_567.0), "$1,234,567.00");
    }

    #[test]
    fn pnl_formatting() {
        assert_eq!(format_pnl(50.0, 5.0), "📈 +$50.00 (+5.00%)");
        assert_eq!(format_pnl(-5.0, -1.0), "📉 -$5.00 (-1.00%)");
        assert_eq!(format_pnl(0.0, 0.0), "📈 +$0.00 (+0.00%)");
        assert_eq!(format_pnl(-0.001, 0.0), "📈 +$0.00 (+0.00%)");
        assert_eq!(format_pnl(-0.006, -0.01), "📉 -$0.01 (-0.01%)");
    }

    #[test]
    fn compact_formatting() {
        assert_eq!(format_compact(2.5e12), "2.50T");
        assert_eq!(format_compact(55_300_000.0), "55.30M");
        assert_eq!(format_compact(12.0), "12.00");
    }

    #[test]
    fn positions_total_over_net_liquidation() {
        let positions = vec![
            Position::new(Conid(1), "AAPL", 10.0, 100.0, 1050.0, 50.0),
            Position::new(Conid(2), "MSFT", 5.0, 200.0, 950.0, -50.0),
            Position::new(Conid(3), "NVDA", 2.0, 100.0, 300.0, 100.0),
        ];
        let text = render_positions(&positions, 10_000.0);
        assert!(text.contains("Positions: 3"));
        assert!(text.contains("📉 -$50.00 (-5.00%)"));
        assert!(text.ends_with("📊 Total P&L: 📈 +$100.00 (+1.00%)"));
    }

    #[test]
    fn zero_net_liquidation_total_is_zero_percent() {
        let positions = vec![Position::new(Conid(1), "AAPL", 10.0, 100.0, 1050.0, 50.0)];
        assert!(render_positions(&positions, 0.0).ends_with("(+0.00%)"));
        assert_eq!(render_positions(&[], 1.0), "No positions.");
    }

    #[test]
    fn scanner_hits_listed() {
        let text = render_scanner(&json!({"contracts": [
            {"symbol": "NVDA", "company_name": "NVIDIA CORP"},
            {"symbol": "TSLA", "companyHeader": "TESLA INC - NASDAQ"}
        ]}));
        assert!(text.contains("Scanner hits: 2"));
        assert!(text.contains("NVIDIA CORP"));
        assert!(text.contains("TESLA INC - NASDAQ"));
        assert_eq!(render_scanner(&json!({})), "No scanner hits.");
    }

    #[test]
    fn headlines_skip_missing_parts() {
        let items = vec![NewsItem {
            title: "Apple beats".into(),
            date: String::new(),
            link: "https://example.com/a".into(),
        }];
        assert_eq!(
            render_headlines("AAPL", &items),
            "📰 AAPL\n  • Apple beats\n    https://example.com/a"
        );
        assert_eq!(render_headlines("AAPL", &[]), "No headlines for AAPL.");
    }

    #[test]
    fn status_lines() {
        assert!(render_status(&AuthStatus::Authenticated).starts_with("✅"));
        assert!(render_status(&AuthStatus::Unreachable("refused".into())).contains("refused"));
    }
}
