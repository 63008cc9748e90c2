use std::sync::OnceLock;

use base64::Engine as _;
use chrono::{DateTime, FixedOffset};
use regex::{Captures, Regex};

use crate::storage::PinnedItem;

/// The two alert kinds a cycle can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    New,
    Reminder,
}

impl AlertKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Reminder => "reminder",
        }
    }
}

/// A fully rendered alert, ready for the notifier.
#[derive(Debug, Clone)]
pub struct RenderedAlert {
    pub subject: String,
    pub html_body: String,
    pub plain_text_body: String,
}

/// Everything the renderer needs besides the items themselves.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// strftime format for timestamps in the body.
    pub time_format: &'a str,
    /// Channel display name; `Some` only when intros should mention it.
    pub channel: Option<&'a str>,
    /// Current time in the display offset, for relative ages.
    pub now: DateTime<FixedOffset>,
}

/// Render one alert as a subject / HTML / plain-text triple.
///
/// The plain-text body is derived from the HTML body, so the two never
/// drift apart.
pub fn render_alert(
    kind: AlertKind,
    items: &[PinnedItem],
    total_pinned: u64,
    since: Option<DateTime<FixedOffset>>,
    ctx: &RenderContext<'_>,
) -> RenderedAlert {
    let subject = subject_line(kind, items.len());
    let intro = intro_line(kind, items.len(), total_pinned, since, ctx);

    let mut rows = String::new();
    for item in items {
        rows.push_str(&item_row(item, ctx));
    }

    let html_body = format!(
        "<html><body>\n<h2>{title}</h2>\n<p>{intro}</p>\n<table>\n{rows}</table>\n</body></html>\n",
        title = title_line(kind),
    );
    let plain_text_body = html2text::from_read(html_body.as_bytes(), 80).unwrap_or_default();

    RenderedAlert {
        subject,
        html_body,
        plain_text_body,
    }
}

fn subject_line(kind: AlertKind, count: usize) -> String {
    match (kind, count) {
        (AlertKind::New, 1) => "1 new pinned message".to_string(),
        (AlertKind::New, n) => format!("{n} new pinned messages"),
        (AlertKind::Reminder, 1) => "Reminder: 1 pinned message".to_string(),
        (AlertKind::Reminder, n) => format!("Reminder: {n} pinned messages"),
    }
}

fn title_line(kind: AlertKind) -> &'static str {
    match kind {
        AlertKind::New => "New pinned messages",
        AlertKind::Reminder => "Pinned message reminder",
    }
}

fn intro_line(
    kind: AlertKind,
    count: usize,
    total_pinned: u64,
    since: Option<DateTime<FixedOffset>>,
    ctx: &RenderContext<'_>,
) -> String {
    let place = match ctx.channel {
        Some(channel) => format!(" in {channel}"),
        None => String::new(),
    };
    let total_part = format!(
        "{total_pinned} pinned {}",
        plural(total_pinned as usize, "message", "messages")
    );
    match kind {
        AlertKind::New => {
            let since_part = match since {
                Some(threshold) => format!(" since {}", threshold.format(ctx.time_format)),
                None => String::new(),
            };
            format!(
                "{count} new {}{place} out of {total_part}{since_part}.",
                plural(count, "message", "messages")
            )
        }
        AlertKind::Reminder => format!(
            "A random pick of {count} of the {total_part} currently up{place}."
        ),
    }
}

fn item_row(item: &PinnedItem, ctx: &RenderContext<'_>) -> String {
    let text = linkify(&escape_html(&item.text));
    let image = match &item.attachment {
        Some(blob) => format!(
            "<br><img src=\"{}\" style=\"max-width:300px;height:auto;\"/>",
            image_data_uri(blob)
        ),
        None => String::new(),
    };
    format!(
        "<tr>\n<td style=\"padding: 10px;\">{id}</td>\n\
         <td style=\"padding: 10px;\">{text}{image}</td>\n\
         <td style=\"padding: 10px;\">{time}<br>(<b>{age}</b>)</td>\n</tr>\n",
        id = item.remote_id,
        time = item.pinned_at.format(ctx.time_format),
        age = humanize_age(ctx.now, item.pinned_at),
    )
}

fn image_data_uri(blob: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(blob)
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Wrap bare URLs in anchor tags. Runs after escaping, so `<` can no
/// longer appear inside a URL candidate.
fn linkify(text: &str) -> String {
    static URL: OnceLock<Regex> = OnceLock::new();
    let pattern = URL.get_or_init(|| Regex::new(r"https?://[^\s<>]+").expect("static pattern"));
    pattern
        .replace_all(text, |caps: &Captures<'_>| {
            let url = &caps[0];
            format!("<a href=\"{url}\">{url}</a>")
        })
        .into_owned()
}

/// Coarse relative age for alert rows: "just now", "5 minutes ago",
/// "3 hours ago", "2 days ago".
fn humanize_age(now: DateTime<FixedOffset>, then: DateTime<FixedOffset>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    if seconds < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        format!(
            "{minutes} {} ago",
            plural(minutes as usize, "minute", "minutes")
        )
    } else if hours < 24 {
        format!("{hours} {} ago", plural(hours as usize, "hour", "hours"))
    } else {
        format!("{days} {} ago", plural(days as usize, "day", "days"))
    }
}

fn plural(n: usize, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 {
        one
    } else {
        many
    }
}
