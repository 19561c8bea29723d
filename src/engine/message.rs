//! Alert text composition (Telegram HTML parse mode)

use crate::core::clock::format_shanghai;
use crate::models::condition::TriggeredSet;
use crate::models::sample::{round_2dp, Sample};
use crate::models::subject::{Subject, SubjectSource};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━";

pub fn compose_alert(subject: &Subject, sample: &Sample, triggered: &TriggeredSet) -> String {
    match &subject.source {
        SubjectSource::Quote { code } => compose_quote_alert(subject, code, sample, triggered),
        SubjectSource::Listing { url, .. } => compose_listing_alert(subject, url, sample, triggered),
    }
}

/// Signed percentage at two decimals, `+` only for strictly positive values
pub fn format_change(change_pct: f64) -> String {
    let rounded = round_2dp(change_pct);
    if rounded > 0.0 {
        format!("+{:.2}", rounded)
    } else if rounded == 0.0 {
        "0.00".to_string()
    } else {
        format!("{:.2}", rounded)
    }
}

fn triggered_lines(triggered: &TriggeredSet) -> String {
    triggered
        .conditions()
        .iter()
        .map(|c| format!("⚠️ {}", c.display_message()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn compose_quote_alert(subject: &Subject, code: &str, sample: &Sample, triggered: &TriggeredSet) -> String {
    let mut text = format!(
        "🔔 <b>Price alert</b>\n\n📈 <b>{}</b> ({})\n{}\n\n💰 Price: <b>¥{}</b>\n📊 Change: <b>{}%</b>\n",
        subject.name,
        code.to_lowercase(),
        RULE,
        sample.value,
        format_change(sample.change_pct),
    );
    if let Some(ref quote) = sample.quote {
        text.push_str(&format!(
            "\nPrev close: ¥{}\nOpen: ¥{}\nHigh: ¥{}\nLow: ¥{}\n",
            quote.previous_close, quote.open, quote.high, quote.low
        ));
    }
    text.push_str(&format!(
        "\n<b>Triggered:</b>\n{}\n\n⏰ {}",
        triggered_lines(triggered),
        format_shanghai(sample.observed_at)
    ));
    text
}

fn compose_listing_alert(subject: &Subject, url: &str, sample: &Sample, triggered: &TriggeredSet) -> String {
    let site = subject
        .listing_site()
        .ok()
        .flatten()
        .unwrap_or_else(|| url.to_string());
    let link = sample.page_url.as_deref().unwrap_or(url);
    format!(
        "🎉 <b>{}</b> is back in stock!\n\n📦 Plan: {}\n🔗 Link: {}\n{}\n⏰ Detected: {}",
        site,
        subject.name,
        link,
        triggered_lines(triggered),
        format_shanghai(sample.observed_at)
    )
}
