//! DOM queries and waits for the vacancy list.
//!
//! Selector templates may contain `{row}`, replaced by the selector of the row
//! being processed, so that a query stays scoped to that row.

use crate::wait::PollPolicy;
use serde::Deserialize;

/// Placeholder for the current row's selector in templates.
pub const ROW_PLACEHOLDER: &str = "{row}";

/// One way of reading a quick field from a row's markup or text.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetaProbe {
    /// Text of the first element matching the selector.
    Css(String),

    /// Text of `value` inside the parent of a `label` element whose text
    /// contains `contains` (case-insensitive).
    Labelled {
        label: String,
        contains: String,
        value: String,
    },

    /// The rendered line following the first line that contains `label`.
    LineAfter {
        label: String,
        #[serde(default = "default_line_max")]
        max_len: usize,
    },
}

fn default_line_max() -> usize {
    50
}

/// Every DOM query the pipeline issues.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Selectors {
    /// All rows of the current page.
    pub rows: String,

    /// One row, `{n}` being its 1-based position.
    pub row: String,

    /// Row element carrying the vacancy title.
    pub row_title: String,

    pub status: Vec<MetaProbe>,

    pub assignee: Vec<MetaProbe>,

    /// Contextual menu triggers, tried in order.
    pub menu_triggers: Vec<String>,

    /// Present once the row's dropdown has opened.
    pub dropdown_open: Vec<String>,

    /// "Details" actions inside the open dropdown, tried in order.
    pub detail_actions: Vec<String>,

    /// Labels searched inside the row when no detail action matched.
    pub detail_labels: Vec<String>,

    /// Any of these visible means the overlay has opened.
    pub overlay: Vec<String>,

    /// Overlay element whose text holds the vacancy detail.
    pub overlay_content: String,

    /// Heading read when the detail text carries no title line.
    pub overlay_heading: String,

    /// Explicit close controls, tried in order.
    pub close_controls: Vec<String>,

    /// Generic dismiss controls tried after the close controls.
    pub dismiss_controls: Vec<String>,

    /// All of these hidden means the overlay is gone.
    pub overlay_gone: Vec<String>,

    /// Next-page controls, tried in order.
    pub next_page: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            rows: "tbody tr".into(),
            row: "tbody tr:nth-child({n})".into(),
            row_title: r#"[class*="cargo"], [class*="title"], [class*="job"]"#.into(),
            status: vec![
                MetaProbe::Css("span.totalVacanciesList_title-status-new".into()),
                MetaProbe::Css(r#"span[class*="status"], span.badge"#.into()),
                MetaProbe::LineAfter {
                    label: "status".into(),
                    max_len: default_line_max(),
                },
            ],
            assignee: vec![
                MetaProbe::Labelled {
                    label: "small".into(),
                    contains: "selecionador".into(),
                    value: "strong".into(),
                },
                MetaProbe::Labelled {
                    label: "small".into(),
                    contains: "selecionador".into(),
                    value: r#"span[style*="color"]"#.into(),
                },
                MetaProbe::LineAfter {
                    label: "selecionador".into(),
                    max_len: default_line_max(),
                },
            ],
            menu_triggers: strings(&[
                "{row} i.fas.fa-ellipsis-v",
                "{row} i.fas",
                "{row} i.fa",
                "{row} i.fa-ellipsis-v",
                "{row} button i",
                "{row} .dropdown-toggle",
                r#"{row} [data-toggle="dropdown"]"#,
                "{row} button.btn-link",
                "{row} td:last-child button",
                "{row} td:last-child i",
            ]),
            dropdown_open: strings(&[
                ".dropdown-menu.show",
                r#".dropdown-menu[style*="display: block"]"#,
                "ul.show",
                ".show .dropdown-menu",
            ]),
            detail_actions: strings(&[
                "{row} ul > div:nth-of-type(2) button",
                "{row} .dropdown-menu button:nth-of-type(2)",
                "{row} .dropdown-menu > div:nth-of-type(2) button",
                "{row} .dropdown-menu li:nth-child(2) button",
                "{row} .dropdown-menu li:nth-child(2) a",
                "{row} .dropdown-menu li:nth-child(2)",
                r#"{row} [aria-label*="Informações"]"#,
                "{row} .show button:nth-of-type(2)",
                "{row} ul.show > div:nth-of-type(2) button",
            ]),
            detail_labels: strings(&["informações", "informacoes"]),
            overlay: strings(&[
                ".modal-dialog",
                ".modal-content",
                r#"[role="dialog"]"#,
                ".modal",
                r#"[class*="modal"]"#,
            ]),
            overlay_content: r#"[class*="modal"]"#.into(),
            overlay_heading: r#"[class*="modal"] h4, [class*="modal"] h3"#.into(),
            close_controls: strings(&[
                "button.close",
                "button.close > i",
                ".modal-header button",
                r#"[aria-label*="Close"]"#,
                r#"[aria-label*="Fechar"]"#,
            ]),
            dismiss_controls: strings(&[r#"button[data-dismiss="modal"]"#, ".close"]),
            overlay_gone: strings(&[
                ".modal-dialog",
                ".modal-content",
                ".modal",
                r#"[role="dialog"]"#,
            ]),
            next_page: strings(&[
                r#"a[aria-label="Next"]"#,
                r#"button[aria-label="Next"]"#,
                ".pagination .next a",
                ".pagination li:last-child a",
                r#"[class*="next"]"#,
                ".page-item:last-child a",
            ]),
        }
    }
}

impl Selectors {
    /// Selector of the row at `index` (0-based).
    pub fn row_at(&self, index: usize) -> String {
        self.row.replace("{n}", &(index + 1).to_string())
    }

    /// Expand a `{row}` template for the row at `index`.
    pub fn in_row(&self, template: &str, index: usize) -> String {
        template.replace(ROW_PLACEHOLDER, &self.row_at(index))
    }
}

/// Waits and budgets, all in milliseconds.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timing {
    /// Pause after dismissing popups and after scrolling a row into view.
    pub settle_ms: u64,

    /// Pause after clicking a menu trigger.
    pub menu_ms: u64,

    /// Visibility wait for each detail action.
    pub detail_action_timeout_ms: u64,

    /// Visibility wait for each overlay selector.
    pub overlay_timeout_ms: u64,

    /// Polling budget while waiting for the overlay to show the row's vacancy.
    pub content_match: PollPolicy,

    /// Visibility wait for each close control, and the disappearance wait.
    pub close_timeout_ms: u64,

    /// Pause after the overlay has gone.
    pub close_settle_ms: u64,

    /// Pause between successfully extracted rows.
    pub row_delay_ms: u64,

    /// Pause after clicking the next-page control.
    pub page_settle_ms: u64,

    /// Wait for rows after navigation or a page change.
    pub navigation_timeout_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_ms: 300,
            menu_ms: 1000,
            detail_action_timeout_ms: 1500,
            overlay_timeout_ms: 2000,
            content_match: PollPolicy::new(20, 300),
            close_timeout_ms: 2000,
            close_settle_ms: 500,
            row_delay_ms: 500,
            page_settle_ms: 2000,
            navigation_timeout_ms: 10_000,
        }
    }
}

impl Timing {
    /// No pauses; budgets keep their attempt counts.
    pub fn instant() -> Self {
        Self {
            settle_ms: 0,
            menu_ms: 0,
            detail_action_timeout_ms: 0,
            overlay_timeout_ms: 0,
            content_match: PollPolicy::new(20, 0),
            close_timeout_ms: 0,
            close_settle_ms: 0,
            row_delay_ms: 0,
            page_settle_ms: 0,
            navigation_timeout_ms: 0,
        }
    }
}
