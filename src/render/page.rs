//! Full chat page

use super::{escape_html, render};
use crate::db::Turn;

/// Seconds before the browser follows the refresh target
const REFRESH_SECS: u32 = 1;

/// The chat page: history, input form, and optionally a meta refresh that
/// sends the browser to `refresh_to` (used to drive the poll).
pub fn render_page(history: &[Turn], refresh_to: Option<&str>) -> String {
    let refresh = refresh_to
        .map(|url| {
            format!(
                r#"<meta http-equiv="refresh" content="{REFRESH_SECS};url={}">"#,
                escape_html(url)
            )
        })
        .unwrap_or_default();
    let bubbles = render(history);
    let version = env!("CARGO_PKG_VERSION");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>lmchat</title>
<link rel="stylesheet" href="/static/style.css?v={version}">
{refresh}
</head>
<body>
<div class="wrapper">
<div class="chat-window" id="chat-window">
{bubbles}</div>
</div>
<form method="post" action="/chat" class="input-form">
<input type="text" name="user_input" placeholder="Type your message..." required autofocus>
<button type="submit">Send</button>
</form>
<script>document.getElementById("last-message")?.scrollIntoView();</script>
</body>
</html>
"#
    )
}
