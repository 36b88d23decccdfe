//! `mdast-lint`: structural rules evaluated on the markdown syntax tree.

use async_trait::async_trait;
use markdown::mdast::Node;
use markdown::{ParseOptions, to_mdast};
use rustc_hash::FxHashMap;
use serde_yaml_ng::Value;

use super::{RuleToggles, parse_toggles};
use crate::backend::LintBackend;
use crate::error::LintError;
use crate::result::Diagnostic;

const HEADING_INCREMENT: &str = "heading-increment";
const NO_MULTIPLE_TOPLEVEL_HEADINGS: &str = "no-multiple-toplevel-headings";
const NO_DUPLICATE_HEADINGS: &str = "no-duplicate-headings";
const NO_EMPTY_URL: &str = "no-empty-url";

/// Rules evaluated on the GFM syntax tree.
#[derive(Debug, Clone, Default)]
pub struct MdastLint {
    toggles: RuleToggles,
}

impl MdastLint {
    /// Registry name.
    pub const NAME: &'static str = "mdast-lint";

    /// Rule documentation.
    pub const RULE_URL: &'static str = "https://github.com/remarkjs/remark-lint#rules";

    /// Creates the backend from `lint_options` (rule id → bool).
    pub fn from_options(options: Option<&Value>) -> Result<Self, LintError> {
        Ok(Self {
            toggles: parse_toggles(Self::NAME, options, &[])?,
        })
    }

    fn check(&self, root: &Node) -> Vec<Diagnostic> {
        let mut nodes = Vec::new();
        collect(root, &mut nodes);

        let mut diagnostics = Vec::new();
        let mut previous_depth: Option<u8> = None;
        let mut first_toplevel: Option<usize> = None;
        let mut seen_headings: FxHashMap<(u8, String), usize> = FxHashMap::default();

        for node in nodes {
            let (line, column) = start_of(node);
            match node {
                Node::Heading(heading) => {
                    let depth = heading.depth;

                    let skipped = previous_depth
                        .filter(|previous| depth > previous + 1)
                        .filter(|_| self.toggles.is_enabled(HEADING_INCREMENT));
                    if let Some(previous) = skipped {
                        diagnostics.push(Diagnostic::new(
                            HEADING_INCREMENT,
                            format!(
                                "Heading levels should increment by one level at a time, expected h{} or lower",
                                previous + 1
                            ),
                            line,
                            column,
                        ));
                    }
                    previous_depth = Some(depth);

                    if depth == 1 && self.toggles.is_enabled(NO_MULTIPLE_TOPLEVEL_HEADINGS) {
                        match first_toplevel {
                            Some(first) => diagnostics.push(Diagnostic::new(
                                NO_MULTIPLE_TOPLEVEL_HEADINGS,
                                format!("Don't use multiple top level headings (first at line {first})"),
                                line,
                                column,
                            )),
                            None => first_toplevel = Some(line),
                        }
                    }

                    if self.toggles.is_enabled(NO_DUPLICATE_HEADINGS) {
                        let text = text_content(node).trim().to_lowercase();
                        if !text.is_empty() {
                            if let Some(first) = seen_headings.get(&(depth, text.clone())) {
                                diagnostics.push(Diagnostic::new(
                                    NO_DUPLICATE_HEADINGS,
                                    format!(
                                        "Don't use the same heading text more than once (first at line {first})"
                                    ),
                                    line,
                                    column,
                                ));
                            } else {
                                seen_headings.insert((depth, text), line);
                            }
                        }
                    }
                }
                Node::Link(link)
                    if link.url.is_empty() && self.toggles.is_enabled(NO_EMPTY_URL) =>
                {
                    diagnostics.push(Diagnostic::new(
                        NO_EMPTY_URL,
                        "Don't use links without URL",
                        line,
                        column,
                    ));
                }
                Node::Image(image)
                    if image.url.is_empty() && self.toggles.is_enabled(NO_EMPTY_URL) =>
                {
                    diagnostics.push(Diagnostic::new(
                        NO_EMPTY_URL,
                        "Don't use images without URL",
                        line,
                        column,
                    ));
                }
                _ => {}
            }
        }

        diagnostics
    }
}

#[async_trait]
impl LintBackend for MdastLint {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn rule_url(&self) -> &str {
        Self::RULE_URL
    }

    async fn lint(&self, file_name: &str, text: &str) -> Result<Vec<Diagnostic>, LintError> {
        let root = to_mdast(text, &ParseOptions::gfm())
            .map_err(|e| LintError::backend(Self::NAME, format!("{file_name}: {e}")))?;
        Ok(self.check(&root))
    }
}

/// Pushes `node` and its descendants in document order.
fn collect<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
    out.push(node);
    if let Some(children) = node.children() {
        for child in children {
            collect(child, out);
        }
    }
}

/// Concatenated literal text below `node`.
fn text_content(node: &Node) -> String {
    match node {
        Node::Text(text) => text.value.clone(),
        Node::InlineCode(code) => code.value.clone(),
        other => other
            .children()
            .map(|children| children.iter().map(text_content).collect())
            .unwrap_or_default(),
    }
}

fn start_of(node: &Node) -> (usize, usize) {
    node.position()
        .map_or((1, 1), |position| (position.start.line, position.start.column))
}
