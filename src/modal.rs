//! Detail overlay lifecycle: open it for a row, wait until it shows that row's
//! vacancy, read it, close it.
//!
//! The overlay is shared by every row and renders asynchronously, so right
//! after opening it may still show the previous vacancy. Nothing is read from
//! it until its displayed title matches the title taken from the row.

use crate::config::{Selectors, Timing};
use crate::driver::{self, Driver};
use crate::wait::{wait_until, Poll};
use crate::{Error, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use vacancy_parser::{parse_display_title, parse_record, Record};

const ESCAPE: &str = "Escape";

/// Steps of one row's traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ReadMeta,
    OpenModal,
    AwaitContentMatch,
    ExtractFields,
    CloseModal,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::ReadMeta => "read_meta",
            Stage::OpenModal => "open_modal",
            Stage::AwaitContentMatch => "await_content_match",
            Stage::ExtractFields => "extract_fields",
            Stage::CloseModal => "close_modal",
        };
        f.write_str(name)
    }
}

/// Case-insensitive containment in either direction, ignoring runs of
/// whitespace. Empty titles never match.
pub fn titles_match(current: &str, expected: &str) -> bool {
    let current = normalize(current);
    let expected = normalize(expected);
    if current.is_empty() || expected.is_empty() {
        return false;
    }
    current.contains(&expected) || expected.contains(&current)
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Drives the overlay of the current page.
pub struct ModalManager<'a, D: ?Sized> {
    driver: &'a D,
    selectors: &'a Selectors,
    timing: &'a Timing,
}

impl<'a, D: Driver + ?Sized> ModalManager<'a, D> {
    pub fn new(driver: &'a D, selectors: &'a Selectors, timing: &'a Timing) -> Self {
        Self {
            driver,
            selectors,
            timing,
        }
    }

    fn open_error(index: usize, reason: &str) -> Error {
        Error::ModalOpen {
            row: index + 1,
            reason: reason.to_string(),
        }
    }

    /// Dismiss stray popups and bring the row into view.
    pub async fn prepare(&self, index: usize) -> Result<()> {
        self.driver.press_key(ESCAPE).await?;
        self.driver.pause(self.timing.settle_ms).await;
        self.driver
            .scroll_into_view(&self.selectors.row_at(index))
            .await?;
        self.driver.pause(self.timing.settle_ms).await;
        Ok(())
    }

    /// Open the row's contextual menu, clicking the trigger a second time if
    /// the dropdown did not show.
    pub async fn open_menu(&self, index: usize) -> Result<()> {
        let triggers = self
            .selectors
            .menu_triggers
            .iter()
            .map(|t| self.selectors.in_row(t, index));
        let Some(trigger) = driver::click_first(self.driver, triggers).await? else {
            return Err(Self::open_error(index, "no menu trigger in row"));
        };
        debug!(row = index + 1, "menu trigger: {}", trigger);
        self.driver.pause(self.timing.menu_ms).await;

        if !driver::any_exists(self.driver, &self.selectors.dropdown_open).await? {
            debug!(row = index + 1, "dropdown did not open, clicking again");
            self.driver.click(&trigger).await?;
            self.driver.pause(self.timing.menu_ms).await;
        }
        Ok(())
    }

    /// Click the details action of the open menu. Once this returns `Ok`, the
    /// overlay may be on screen.
    pub async fn request_details(&self, index: usize) -> Result<()> {
        for template in &self.selectors.detail_actions {
            let sel = self.selectors.in_row(template, index);
            if self
                .driver
                .wait_for_visible(&sel, self.timing.detail_action_timeout_ms)
                .await?
                && self.driver.click(&sel).await?
            {
                debug!(row = index + 1, "details action: {}", sel);
                return Ok(());
            }
        }

        let scope = self.selectors.row_at(index);
        if self
            .driver
            .click_by_text(&scope, &self.selectors.detail_labels)
            .await?
        {
            debug!(row = index + 1, "details action found by label");
            return Ok(());
        }
        Err(Self::open_error(index, "no details action in menu"))
    }

    /// Wait for any overlay selector to become visible.
    pub async fn await_overlay(&self, index: usize) -> Result<()> {
        let overlays = self.selectors.overlay.iter().cloned();
        match driver::first_visible(self.driver, overlays, self.timing.overlay_timeout_ms).await? {
            Some(sel) => {
                debug!(row = index + 1, "overlay visible: {}", sel);
                Ok(())
            }
            None => Err(Self::open_error(index, "overlay did not appear")),
        }
    }

    /// Title the overlay currently shows.
    pub async fn displayed_title(&self) -> Result<Option<String>> {
        if let Some(text) = self.driver.inner_text(&self.selectors.overlay_content).await? {
            if let Some(title) = parse_display_title(&text) {
                return Ok(Some(title));
            }
        }
        let heading = self
            .driver
            .inner_text(&self.selectors.overlay_heading)
            .await?;
        Ok(heading
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty()))
    }

    /// Poll the overlay until it shows `expected`. Returns the number of reads.
    pub async fn await_content_match(&self, expected: &str) -> Result<u32> {
        let poll = wait_until(self.timing.content_match, |attempt| async move {
            let title = self.displayed_title().await?;
            debug!(attempt, ?title, expected, "overlay title");
            Ok(title.filter(|t| titles_match(t, expected)))
        })
        .await;

        match poll {
            Poll::Ready { attempts, .. } => Ok(attempts),
            Poll::TimedOut { attempts } => Err(Error::ContentSyncTimeout {
                expected: expected.to_string(),
                attempts,
            }),
        }
    }

    /// Read the overlay once and parse it.
    pub async fn extract(&self) -> Result<Record> {
        let content = &self.selectors.overlay_content;
        let text = self.driver.inner_text(content).await?.unwrap_or_default();
        let markup = self.driver.inner_html(content).await?.unwrap_or_default();
        debug!(text_len = text.len(), markup_len = markup.len(), "overlay read");

        if text.trim().is_empty() && !markup.is_empty() {
            warn!("overlay has no rendered text, parsing its markup text");
            return Ok(parse_record(&markup_text(&markup)));
        }
        Ok(parse_record(&text))
    }

    /// Close the overlay. Never fails; `false` when it could not be confirmed
    /// gone, in which case Escape has been pressed.
    pub async fn close(&self) -> bool {
        match self.try_close().await {
            Ok(true) => true,
            Ok(false) => {
                warn!("overlay still visible after close");
                self.escape().await;
                false
            }
            Err(e) => {
                warn!("closing overlay failed: {}", e);
                self.escape().await;
                false
            }
        }
    }

    async fn try_close(&self) -> Result<bool> {
        let controls = self
            .selectors
            .close_controls
            .iter()
            .chain(&self.selectors.dismiss_controls);

        let mut clicked = None;
        for sel in controls {
            if self
                .driver
                .wait_for_visible(sel, self.timing.close_timeout_ms)
                .await?
                && self.driver.click(sel).await?
            {
                clicked = Some(sel);
                break;
            }
        }
        match clicked {
            Some(sel) => debug!("overlay closed with {}", sel),
            None => {
                info!("no close control found, pressing Escape");
                self.driver.press_key(ESCAPE).await?;
            }
        }

        for sel in &self.selectors.overlay_gone {
            if !self
                .driver
                .wait_for_hidden(sel, self.timing.close_timeout_ms)
                .await?
            {
                return Ok(false);
            }
        }
        self.driver.pause(self.timing.close_settle_ms).await;
        Ok(true)
    }

    async fn escape(&self) {
        if let Err(e) = self.driver.press_key(ESCAPE).await {
            warn!("pressing Escape failed: {}", e);
        }
    }
}

/// Render an HTML fragment to text with the line and cell breaks the browser
/// puts into `innerText`: table cells are tab separated, rows and blocks end a
/// line, paragraphs are set off by a blank line.
fn markup_text(markup: &str) -> String {
    let doc = scraper::Html::parse_fragment(markup);
    let mut out = TextRender::default();
    out.walk(doc.root_element());
    out.buf
}

const BLOCKS: &[&str] = &[
    "address", "article", "aside", "div", "dl", "dd", "dt", "fieldset", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "section", "table",
    "tbody", "thead", "tfoot", "tr", "ul",
];

#[derive(Default)]
struct TextRender {
    buf: String,
    breaks: usize,
    tab: bool,
    space: bool,
}

impl TextRender {
    fn walk(&mut self, el: scraper::ElementRef<'_>) {
        for child in el.children() {
            if let Some(text) = child.value().as_text() {
                self.text(text);
                continue;
            }
            let Some(child) = scraper::ElementRef::wrap(child) else {
                continue;
            };
            let name = child.value().name();
            match name {
                "script" | "style" | "template" => {}
                "br" => {
                    self.space = false;
                    self.flush();
                    if !self.buf.is_empty() {
                        self.buf.push('\n');
                    }
                }
                "td" | "th" => {
                    self.walk(child);
                    self.tab = true;
                }
                "p" => {
                    self.require(2);
                    self.walk(child);
                    self.require(2);
                }
                _ if BLOCKS.contains(&name) => {
                    self.require(1);
                    self.walk(child);
                    self.require(1);
                }
                _ => self.walk(child),
            }
        }
    }

    fn require(&mut self, breaks: usize) {
        self.breaks = self.breaks.max(breaks);
        self.tab = false;
    }

    fn text(&mut self, text: &str) {
        let words: Vec<&str> = text.split_whitespace().collect();
        if text.starts_with(char::is_whitespace) {
            self.space = true;
        }
        if words.is_empty() {
            return;
        }
        self.flush();
        self.buf.push_str(&words.join(" "));
        self.space = text.ends_with(char::is_whitespace);
    }

    fn flush(&mut self) {
        if !self.buf.is_empty() {
            let have = self.buf.chars().rev().take_while(|c| *c == '\n').count();
            if self.breaks > have {
                self.buf.push_str(&"\n".repeat(self.breaks - have));
            } else if have == 0 && self.tab {
                self.buf.push('\t');
            } else if have == 0 && self.space {
                self.buf.push(' ');
            }
        }
        self.breaks = 0;
        self.tab = false;
        self.space = false;
    }
}
