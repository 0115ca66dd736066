//! Tracing targets, timing spans and tree dump options.
//!
//! Every log line from the collection view crates goes to one of the
//! [`targets`], so a subscriber can turn subsystems up independently:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("collection_view::sync=debug,collection_view::perf=info")
//!     .init();
//! ```

/// `tracing` targets, one per subsystem.
pub mod targets {
    /// Slot bookkeeping and emission.
    pub const SIGNAL: &str = "collection_view_core::signal";
    /// View construction, configuration and queries.
    pub const VIEW: &str = "collection_view::view";
    /// Source change synchronization.
    pub const SYNC: &str = "collection_view::sync";
    /// [`PerfSpan`](super::PerfSpan) timings.
    pub const PERF: &str = "collection_view::perf";
}

/// Characters used to draw tree branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// `+--` and `` `-- `` branches.
    Ascii,
    /// Box-drawing branches.
    #[default]
    Unicode,
    /// A single dash per node, indented by spaces only.
    Compact,
}

/// What a tree dump shows and how it is drawn.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    /// Append each node's id.
    pub show_ids: bool,
    /// Append each node's item count.
    pub show_counts: bool,
    /// List the entries of leaf nodes.
    pub show_leaves: bool,
    /// Deepest level drawn; `None` draws everything.
    pub max_depth: Option<usize>,
    /// Spaces after each ancestor rail.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: false,
            show_counts: true,
            show_leaves: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Branch drawing placed before a node at `depth`. Depth 0 is the
    /// header line and gets no prefix.
    pub fn prefix(&self, depth: usize, is_last: bool) -> String {
        let Some(outer) = depth.checked_sub(1) else {
            return String::new();
        };
        let (rail, tee, elbow) = match self.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };
        let indent = " ".repeat(self.indent_size);
        let mut prefix = format!("{rail}{indent}").repeat(outer);
        prefix.push_str(if is_last { elbow } else { tee });
        prefix.push(' ');
        prefix
    }
}

/// Times a region of work as an entered `tracing` span on the
/// [`targets::PERF`] target. The span closes when the guard drops.
#[derive(Debug)]
#[must_use = "the span ends as soon as the guard is dropped"]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enters a span named after `operation`.
    pub fn new(operation: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation);
        Self {
            _span: span.entered(),
        }
    }
}
