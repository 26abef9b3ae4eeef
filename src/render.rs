//! Presentation adapter: turns stored history into HTML
//!
//! Everything here is pure. Pending turns show a spinner, failed turns an
//! error notice, assistant replies rendered markdown, user text escaped.

mod markdown;
mod page;

pub use markdown::markdown_to_html;
pub use page::render_page;

use crate::db::{Role, Turn, TurnStatus};
use std::fmt::Write;

/// Render every turn as a chat bubble, in the given order.
///
/// The last bubble carries `id="last-message"` so the page can scroll to it.
pub fn render(history: &[Turn]) -> String {
    let mut out = String::new();
    let last = history.len().saturating_sub(1);
    for (idx, turn) in history.iter().enumerate() {
        render_turn(&mut out, turn, idx == last);
    }
    out
}

fn render_turn(out: &mut String, turn: &Turn, is_last: bool) {
    let (class, body) = match (turn.role, turn.status) {
        (_, TurnStatus::Pending) => (
            "llm-bubble",
            r#"<span class="loading-spinner" aria-label="Waiting for reply"></span>"#.to_string(),
        ),
        (_, TurnStatus::Failed) => (
            "llm-bubble error-bubble",
            format!(
                r#"<div class="error-notice">{}</div>"#,
                plain_text_html(turn.text())
            ),
        ),
        (Role::Assistant, TurnStatus::Complete) => ("llm-bubble", markdown_to_html(turn.text())),
        (Role::User, TurnStatus::Complete) => ("user-bubble", plain_text_html(turn.text())),
    };
    let anchor = if is_last { r#" id="last-message""# } else { "" };

    // Writing to a String cannot fail
    let _ = write!(
        out,
        r#"<div class="chat-bubble {class}"{anchor} data-turn="{}"><div class="bubble-message">{body}</div></div>"#,
        turn.id
    );
    out.push('\n');
}

/// Escaped text with newlines kept as line breaks
fn plain_text_html(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

/// Escape text for HTML body and attribute context
pub fn escape_html(text: &str) -> String {
    text.chars()
        .fold(String::with_capacity(text.len()), |mut escaped, ch| {
            match ch {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#39;"),
                _ => escaped.push(ch),
            }
            escaped
        })
}
