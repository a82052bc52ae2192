use crate::domain::detection::Detection;

/// Human-readable alert body shared by the chat sinks
pub fn format_alert(detection: &Detection) -> String {
    let m = &detection.metrics;
    let rsi = m
        .rsi
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "n/a".to_string());

    let mut text = format!(
        "BREAKOUT {pair} ({interval})\n\
         Price: {price}\n\
         Breakout: +{pct:.2}%\n\
         Volume: {vol:.2}x avg\n\
         Flow: {flow}/min (avg {avg})\n\
         RSI: {rsi}",
        pair = detection.pair,
        interval = detection.interval,
        price = format_price(detection.price),
        pct = detection.pct_over_percent(),
        vol = m.vol_ratio,
        flow = format_usd(m.usd_per_min),
        avg = format_usd(m.vpm_avg_usd),
        rsi = rsi,
    );
    if let Some(hist) = m.macd_hist {
        text.push_str(&format!(" | MACD hist: {:.4}", hist));
    }
    text.push_str(&format!(
        "\n{} | {} | {}",
        detection.universe,
        detection.detected_at().format("%Y-%m-%d %H:%M:%S UTC"),
        detection.source
    ));
    text
}

fn format_price(price: f64) -> String {
    if price >= 1.0 {
        format!("{:.4}", price)
    } else {
        format!("{:.8}", price)
    }
}

/// `$1.2M`, `$350.0K`, `$920`
pub fn format_usd(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000_000.0 {
        format!("${:.2}B", value / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("${:.2}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("${:.1}K", value / 1_000.0)
    } else {
        format!("${:.0}", value)
    }
}
