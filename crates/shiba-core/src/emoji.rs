//! Shortcode to emoji rewriting.
//!
//! Runs on rendered HTML rather than on markdown source so that the emitted
//! markup can carry attributes the markdown converter can't express.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

// Code blocks and tags are matched whole so that shortcodes inside them are
// never reached.
static SHORTCODE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?is)<code\b[^>]*>.*?</code>|<pre\b[^>]*>.*?</pre>|<[^>]*>|:([a-z0-9_+\-]+):").ok()
});

/// Replaces every known `:shortcode:` in `html` with its glyph.
///
/// Each match becomes `<span class="emoji" role="img" aria-label="NAME">GLYPH</span>`.
/// Unknown shortcodes are left untouched, as is anything inside a tag, a
/// `<code>` or a `<pre>`. Input without any replacement is returned borrowed.
///
/// # Examples
///
/// ```
/// use shiba_core::emoji::replace_all;
///
/// let html = replace_all("<h1>Hi :smile:</h1>");
/// assert!(html.contains("\u{1f604}"));
/// assert!(!html.contains(":smile:"));
///
/// assert_eq!(replace_all("at 12:30:00"), "at 12:30:00");
/// ```
#[must_use]
pub fn replace_all(html: &str) -> Cow<'_, str> {
    let Some(re) = SHORTCODE.as_ref() else {
        return Cow::Borrowed(html);
    };

    let known = |caps: &Captures<'_>| {
        caps.get(1)
            .is_some_and(|name| emojis::get_by_shortcode(name.as_str()).is_some())
    };
    if !re.captures_iter(html).any(|caps| known(&caps)) {
        return Cow::Borrowed(html);
    }

    re.replace_all(html, |caps: &Captures<'_>| {
        let Some(name) = caps.get(1).map(|m| m.as_str()) else {
            return caps[0].to_owned();
        };
        match emojis::get_by_shortcode(name) {
            Some(emoji) => format!(
                r#"<span class="emoji" role="img" aria-label="{name}">{}</span>"#,
                emoji.as_str()
            ),
            None => caps[0].to_owned(),
        }
    })
}
