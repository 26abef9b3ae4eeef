//! Markdown to HTML for assistant replies

use super::escape_html;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

/// Render assistant markdown.
///
/// Single newlines become `<br>`, and raw HTML from the model is shown as
/// text rather than interpreted.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        Event::Html(text) | Event::InlineHtml(text) => Event::Text(text),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut rendered, parser);

    if rendered.trim().is_empty() && !markdown.trim().is_empty() {
        return escape_html(markdown).replace('\n', "<br>");
    }
    rendered
}

/// Drop script-capable link targets
fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let scheme = url.trim_start().to_ascii_lowercase();
    if ["javascript:", "vbscript:", "data:"]
        .iter()
        .any(|prefix| scheme.starts_with(*prefix))
    {
        CowStr::Borrowed("#")
    } else {
        url
    }
}
