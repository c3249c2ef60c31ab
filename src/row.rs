//! Quick fields read straight from a list row.
//!
//! The row is read once as markup and once as rendered text; every probe then
//! runs against those two snapshots, so reading a row never touches the page
//! more than twice and never fails.

use crate::config::{MetaProbe, Selectors};
use crate::driver::Driver;
use crate::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const STATUS_MISSING_ROW: &str = "Status não encontrado";
pub const STATUS_UNKNOWN: &str = "Status não informado";
pub const STATUS_READ_FAILED: &str = "Erro ao extrair status";
pub const ASSIGNEE_MISSING_ROW: &str = "Selecionador não encontrado";
pub const ASSIGNEE_UNKNOWN: &str = "Não informado";
pub const ASSIGNEE_READ_FAILED: &str = "Erro ao extrair selecionador";

/// `#123 Title, ...` in the row's text.
static INDEXED_TITLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"#\s*\d+\s+([^,]+)").ok());

/// One row of the current page, read before its overlay is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 0-based position on the current page.
    pub index: usize,
    /// Identity used to confirm the overlay shows this row.
    pub expected_title: Option<String>,
    pub status_label: String,
    pub assignee_name: String,
}

impl Row {
    fn sentinel(index: usize, status: &str, assignee: &str) -> Self {
        Self {
            index,
            expected_title: None,
            status_label: status.to_string(),
            assignee_name: assignee.to_string(),
        }
    }
}

/// Markup and rendered text of one row.
#[derive(Debug, Clone)]
pub struct RowSnapshot {
    pub html: String,
    pub text: String,
}

impl RowSnapshot {
    /// Quick fields and identity for the row at `index`.
    pub fn read(&self, index: usize, selectors: &Selectors) -> Row {
        // html5ever drops a bare <tr> outside of a table
        let doc = Html::parse_fragment(&format!("<table><tbody>{}</tbody></table>", self.html));
        let root = doc.root_element();

        let status_label = first_match(&root, &self.text, &selectors.status)
            .unwrap_or_else(|| STATUS_UNKNOWN.to_string());
        let assignee_name = first_match(&root, &self.text, &selectors.assignee)
            .unwrap_or_else(|| ASSIGNEE_UNKNOWN.to_string());

        let expected_title = css_text(&root, &selectors.row_title)
            .or_else(|| expected_title_from_text(&element_text(&root)));

        Row {
            index,
            expected_title,
            status_label,
            assignee_name,
        }
    }
}

/// Reads [`Row`]s from the page.
pub struct RowMetaReader<'a, D: ?Sized> {
    driver: &'a D,
    selectors: &'a Selectors,
}

impl<'a, D: Driver + ?Sized> RowMetaReader<'a, D> {
    pub fn new(driver: &'a D, selectors: &'a Selectors) -> Self {
        Self { driver, selectors }
    }

    /// Take both snapshots of the row. `None` when the row is gone.
    pub async fn snapshot(&self, index: usize) -> Result<Option<RowSnapshot>> {
        let sel = self.selectors.row_at(index);
        let Some(html) = self.driver.outer_html(&sel).await? else {
            return Ok(None);
        };
        let text = self.driver.inner_text(&sel).await?.unwrap_or_default();
        Ok(Some(RowSnapshot { html, text }))
    }

    /// Read the row at `index`.
    ///
    /// Never fails: a row that is gone or cannot be read yields sentinel
    /// labels and no identity.
    pub async fn read(&self, index: usize) -> Row {
        match self.snapshot(index).await {
            Ok(Some(snapshot)) => {
                let row = snapshot.read(index, self.selectors);
                debug!(
                    row = index + 1,
                    title = ?row.expected_title,
                    status = %row.status_label,
                    assignee = %row.assignee_name,
                    "row meta"
                );
                row
            }
            Ok(None) => {
                warn!(row = index + 1, "row not found");
                missing_row(index)
            }
            Err(e) => {
                warn!(row = index + 1, "row read failed: {}", e);
                Row::sentinel(index, STATUS_READ_FAILED, ASSIGNEE_READ_FAILED)
            }
        }
    }
}

/// Sentinels used when a row disappeared before it could be read.
pub fn missing_row(index: usize) -> Row {
    Row::sentinel(index, STATUS_MISSING_ROW, ASSIGNEE_MISSING_ROW)
}

/// Title after the `#<number>` marker, up to the first comma.
pub fn expected_title_from_text(text: &str) -> Option<String> {
    INDEXED_TITLE
        .as_ref()?
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn first_match(root: &ElementRef<'_>, text: &str, probes: &[MetaProbe]) -> Option<String> {
    probes.iter().find_map(|probe| {
        let found = apply(root, text, probe);
        debug!("probe {:?}: {:?}", probe, found);
        found
    })
}

fn apply(root: &ElementRef<'_>, text: &str, probe: &MetaProbe) -> Option<String> {
    match probe {
        MetaProbe::Css(sel) => css_text(root, sel),
        MetaProbe::Labelled {
            label,
            contains,
            value,
        } => labelled_text(root, label, contains, value),
        MetaProbe::LineAfter { label, max_len } => line_after(text, label, *max_len),
    }
}

fn parse_selector(sel: &str) -> Option<Selector> {
    match Selector::parse(sel) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("invalid selector {:?}: {:?}", sel, e);
            None
        }
    }
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

fn css_text(root: &ElementRef<'_>, sel: &str) -> Option<String> {
    let selector = parse_selector(sel)?;
    root.select(&selector)
        .map(|el| element_text(&el))
        .find(|s| !s.is_empty())
}

fn labelled_text(root: &ElementRef<'_>, label: &str, contains: &str, value: &str) -> Option<String> {
    let label_sel = parse_selector(label)?;
    let value_sel = parse_selector(value)?;
    let needle = contains.to_lowercase();

    root.select(&label_sel)
        .filter(|el| element_text(el).to_lowercase().contains(&needle))
        .filter_map(|el| el.parent().and_then(ElementRef::wrap))
        .find_map(|parent| {
            parent
                .select(&value_sel)
                .map(|v| element_text(&v))
                .find(|s| !s.is_empty())
        })
}

fn line_after(text: &str, label: &str, max_len: usize) -> Option<String> {
    let needle = label.to_lowercase();
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    lines.find(|l| l.to_lowercase().contains(&needle))?;
    lines
        .next()
        .map(str::to_string)
        .filter(|l| l.chars().count() < max_len)
        .and_then(non_empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECORATED: &str = r#"<tr>
        <td><span class="vacancy-cargo">#1024 Marceneiro, 2 posições</span></td>
        <td><span class="totalVacanciesList_title-status-new">Aberta</span></td>
        <td><div><small>Selecionador responsável</small><br>
            <span style="color: rgb(67, 101, 116);"><strong>Ana Souza</strong></span></div></td>
        <td><button class="btn-link"><i class="fas fa-ellipsis-v"></i></button></td>
    </tr>"#;

    const PLAIN: &str = r#"<tr>
        <td>#77 Auxiliar de Limpeza, 1 posição</td>
        <td><span class="badge badge-warning">Em andamento</span></td>
        <td><div><small>Selecionador</small><span style="color: red">Bruno Lima</span></div></td>
    </tr>"#;

    fn snapshot(html: &str, text: &str) -> RowSnapshot {
        RowSnapshot {
            html: html.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn decorated_row() {
        let row = snapshot(DECORATED, "").read(0, &Selectors::default());
        assert_eq!(row.index, 0);
        assert_eq!(row.status_label, "Aberta");
        assert_eq!(row.assignee_name, "Ana Souza");
        assert_eq!(row.expected_title.as_deref(), Some("#1024 Marceneiro, 2 posições"));
    }

    #[test]
    fn plain_row_uses_fallbacks() {
        let row = snapshot(PLAIN, "").read(4, &Selectors::default());
        assert_eq!(row.status_label, "Em andamento");
        assert_eq!(row.assignee_name, "Bruno Lima");
        assert_eq!(row.expected_title.as_deref(), Some("Auxiliar de Limpeza"));
    }

    #[test]
    fn rendered_text_fallback() {
        let html = "<tr><td>Pintor</td><td>Status</td></tr>";
        let text = "Pintor\nStatus\nSuspensa\nSelecionador responsável\n\nCarla Dias\n";
        let row = snapshot(html, text).read(1, &Selectors::default());
        assert_eq!(row.status_label, "Suspensa");
        assert_eq!(row.assignee_name, "Carla Dias");
        assert_eq!(row.expected_title, None);
    }

    #[test]
    fn unknown_sentinels() {
        let text = format!("Selecionador\n{}", "x".repeat(60));
        let row = snapshot("<tr><td></td></tr>", &text).read(0, &Selectors::default());
        assert_eq!(row.status_label, STATUS_UNKNOWN);
        assert_eq!(row.assignee_name, ASSIGNEE_UNKNOWN);
    }

    #[test]
    fn invalid_probe_is_skipped() {
        let mut selectors = Selectors::default();
        selectors.status.insert(0, MetaProbe::Css("span[[".into()));
        let row = snapshot(PLAIN, "").read(0, &selectors);
        assert_eq!(row.status_label, "Em andamento");
    }

    #[test]
    fn indexed_title() {
        assert_eq!(
            expected_title_from_text("  # 12   Operador de Empilhadeira, Campinas").as_deref(),
            Some("Operador de Empilhadeira")
        );
        assert_eq!(expected_title_from_text("no marker here"), None);
    }

    #[test]
    fn line_after_respects_limit() {
        assert_eq!(line_after("A\nlabel\nvalue", "LABEL", 50).as_deref(), Some("value"));
        assert_eq!(line_after("label\n0123456789", "label", 10), None);
        assert_eq!(line_after("label", "label", 10), None);
    }

    #[test]
    fn missing_row_sentinels() {
        let row = missing_row(2);
        assert_eq!(row.status_label, STATUS_MISSING_ROW);
        assert_eq!(row.assignee_name, ASSIGNEE_MISSING_ROW);
    }
}
