//! Rendering use case - fits a message to one platform's limits

use crate::model::{Message, Platform, RenderedPost};

/// Marker appended when text is cut
pub const ELLIPSIS: char = '…';

/// Render a message for a platform with the given character limit.
///
/// Long-form platforms get the article body when the message has one.
pub fn render_for(platform: Platform, message: &Message, max_chars: usize) -> RenderedPost {
    let body = if platform.is_long_form() {
        message.article().unwrap_or(message.text())
    } else {
        message.text()
    };

    let title = match platform {
        Platform::DevTo => Some(message.title_or_first_line().to_string()),
        _ => message.title().map(String::from),
    };

    RenderedPost {
        platform,
        text: truncate_chars(body, max_chars),
        title,
    }
}

/// Cut `content` to at most `max_chars` characters.
///
/// Counts `char`s, so multi-byte characters are never split. When cutting,
/// the result is exactly `max_chars` long and ends in [`ELLIPSIS`].
pub fn truncate_chars(content: &str, max_chars: usize) -> String {
    let len = content.chars().count();
    if len <= max_chars {
        return content.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let mut truncated: String = content.chars().take(max_chars - 1).collect();
    truncated.push(ELLIPSIS);
    truncated
}
