//! Markdown to HTML conversion.
//!
//! The converter is a black box to the pipeline; [`GfmRenderer`] is the
//! default, and tests or hosts can plug in their own [`MarkdownRenderer`].

use markdown::{CompileOptions, Options, ParseOptions};

/// Converts markdown source to an HTML fragment.
pub trait MarkdownRenderer: Send + Sync {
    /// Renders `text`. Must not fail: malformed input still yields HTML.
    fn to_html(&self, text: &str) -> String;
}

/// GitHub flavored markdown with raw HTML passed through.
///
/// Raw HTML is allowed because the output is a local preview of the user's
/// own documents.
///
/// ```
/// use shiba_watcher::{GfmRenderer, MarkdownRenderer};
///
/// let html = GfmRenderer.to_html("# Hi\n\n- [x] done");
/// assert!(html.contains("<h1>Hi</h1>"));
/// assert!(html.contains("checkbox"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GfmRenderer;

// `Options` holds boxed MDX hooks, so it is neither `Send` nor `Clone`.
fn gfm_options() -> Options {
    Options {
        parse: ParseOptions::gfm(),
        compile: CompileOptions {
            allow_dangerous_html: true,
            allow_dangerous_protocol: true,
            ..CompileOptions::gfm()
        },
    }
}

impl MarkdownRenderer for GfmRenderer {
    fn to_html(&self, text: &str) -> String {
        markdown::to_html_with_options(text, &gfm_options()).unwrap_or_else(|message| {
            // Only reachable with MDX constructs, which GFM parsing never enables.
            tracing::warn!(error = %message, "Markdown conversion failed, rendering as text");
            markdown::to_html(text)
        })
    }
}
