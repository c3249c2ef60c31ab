//! Scripted in-memory page for driving the pipeline without a browser.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use vacancy_harvest::{Config, Driver, Error, Result, Timing};

pub const CONFIG: &str = r#"
name: "fake list"
target:
  url: "https://fake.test/vacancies"
  table: ["tbody tr"]
selectors:
  rows: "tbody tr"
  row: "tbody tr:nth-child({n})"
  menu_triggers: ["{row} .menu"]
  dropdown_open: [".dropdown.show"]
  detail_actions: ["{row} .details"]
  overlay: [".modal"]
  overlay_content: ".modal"
  overlay_heading: ".modal h4"
  close_controls: ["button.close"]
  dismiss_controls: ["button.dismiss"]
  overlay_gone: [".modal"]
  next_page: ["a.next"]
"#;

pub const LOGIN_URL: &str = "https://fake.test/login";
pub const HOME_URL: &str = "https://fake.test/dashboard";

/// Config for the fake page with every wait set to zero.
pub fn config() -> Config {
    config_with("")
}

/// Same as [`config`] with extra top-level YAML appended.
pub fn config_with(extra: &str) -> Config {
    let yaml = format!("{}{}", CONFIG, extra);
    let mut config = Config::parse(&yaml).expect("test config parses");
    config.timing = Timing::instant();
    config
}

#[derive(Debug, Clone)]
pub struct FakeRow {
    pub title: String,
    pub status: String,
    pub assignee: String,
    pub has_title: bool,
    pub has_menu: bool,
    pub has_details: bool,
    /// The first click on the menu trigger does not open the dropdown.
    pub stubborn_menu: bool,
    /// The details action has no selector and is only found by its label.
    pub details_by_label: bool,
    /// Clicking the details action never shows the overlay.
    pub overlay_never_shows: bool,
    /// Titles the overlay shows on successive reads; the last one repeats.
    pub overlay_titles: Vec<String>,
}

pub fn row(title: &str) -> FakeRow {
    FakeRow {
        title: title.to_string(),
        status: "Aberta".to_string(),
        assignee: "Ana Souza".to_string(),
        has_title: true,
        has_menu: true,
        has_details: true,
        stubborn_menu: false,
        details_by_label: false,
        overlay_never_shows: false,
        overlay_titles: Vec::new(),
    }
}

impl FakeRow {
    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn without_details(mut self) -> Self {
        self.has_details = false;
        self
    }

    pub fn without_menu(mut self) -> Self {
        self.has_menu = false;
        self
    }

    pub fn without_title(mut self) -> Self {
        self.has_title = false;
        self
    }

    pub fn menu_needs_second_click(mut self) -> Self {
        self.stubborn_menu = true;
        self
    }

    pub fn details_by_label(mut self) -> Self {
        self.details_by_label = true;
        self
    }

    pub fn overlay_never_shows(mut self) -> Self {
        self.overlay_never_shows = true;
        self
    }

    pub fn overlay_shows(mut self, titles: &[&str]) -> Self {
        self.overlay_titles = titles.iter().map(|t| t.to_string()).collect();
        self
    }

    fn html(&self) -> String {
        let title = if self.has_title {
            format!(r#"<span class="job-title">{}</span>"#, self.title)
        } else {
            "<span>sem título</span>".to_string()
        };
        format!(
            r#"<tr><td>{}</td><td><span class="badge">{}</span></td><td><div><small>Selecionador responsável</small><br><strong>{}</strong></div></td><td><i class="menu"></i></td></tr>"#,
            title, self.status, self.assignee
        )
    }

    fn text(&self) -> String {
        format!(
            "{}\n{}\nSelecionador responsável\n{}",
            self.title, self.status, self.assignee
        )
    }
}

#[derive(Debug, Default)]
pub struct State {
    pub pages: Vec<Vec<FakeRow>>,
    pub page: usize,
    pub url: String,
    /// 1-based row whose dropdown is open.
    pub dropdown: Option<usize>,
    /// Titles scripted for the open overlay.
    pub overlay: Option<Vec<String>>,
    /// Markup of an overlay that renders no text.
    pub overlay_markup: Option<String>,
    pub reads_since_open: usize,
    pub overlay_reads: usize,
    pub opened: Vec<usize>,
    pub close_clicks: usize,
    pub dismiss_clicks: usize,
    /// Row number of every menu trigger click.
    pub menu_clicks: Vec<usize>,
    pub escapes: usize,
    pub gotos: usize,
    pub typed: Vec<(String, String)>,
    pub next_disabled: bool,
    /// The next control is clickable but never turns the page.
    pub next_inert: bool,
    pub no_close_button: bool,
    pub dismiss_button: bool,
    /// Close and dismiss clicks are ignored; only Escape hides the overlay.
    pub sticky_overlay: bool,
    pub fail_hidden_wait: bool,
    pub fail_count: bool,
    pub fail_overlay_reads: bool,
    pub accept_login: bool,
}

pub struct FakeDriver {
    state: Mutex<State>,
}

impl FakeDriver {
    pub fn new(pages: Vec<Vec<FakeRow>>) -> Self {
        Self {
            state: Mutex::new(State {
                pages,
                accept_login: true,
                ..State::default()
            }),
        }
    }

    pub fn single_page(rows: Vec<FakeRow>) -> Self {
        Self::new(vec![rows])
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake state lock")
    }

    /// Show the overlay as if some row had opened it.
    pub fn open_overlay(&self, titles: &[&str]) {
        let mut st = self.state();
        st.overlay = Some(titles.iter().map(|t| t.to_string()).collect());
        st.reads_since_open = 0;
    }

    /// Show an overlay whose text has not rendered, only its markup.
    pub fn open_overlay_markup(&self, markup: &str) {
        let mut st = self.state();
        st.overlay = Some(Vec::new());
        st.overlay_markup = Some(markup.to_string());
    }
}

/// `tbody tr:nth-child(3) .menu` -> `(3, ".menu")`.
fn split_row(sel: &str) -> Option<(usize, &str)> {
    let rest = sel.strip_prefix("tbody tr:nth-child(")?;
    let end = rest.find(')')?;
    let n = rest[..end].parse().ok()?;
    Some((n, rest[end + 1..].trim()))
}

impl State {
    fn rows(&self) -> &[FakeRow] {
        self.pages.get(self.page).map(Vec::as_slice).unwrap_or(&[])
    }

    fn row(&self, n: usize) -> Option<&FakeRow> {
        n.checked_sub(1).and_then(|i| self.rows().get(i))
    }

    fn has_next(&self) -> bool {
        self.page + 1 < self.pages.len()
    }

    fn on_login_page(&self) -> bool {
        self.url.contains("/login")
    }

    fn exists(&self, sel: &str) -> bool {
        if let Some((n, rest)) = split_row(sel) {
            let Some(row) = self.row(n) else {
                return false;
            };
            return match rest {
                "" => true,
                ".menu" => row.has_menu,
                ".details" => {
                    self.dropdown == Some(n) && row.has_details && !row.details_by_label
                }
                _ => false,
            };
        }
        match sel {
            "tbody tr" => !self.rows().is_empty(),
            ".dropdown.show" => self.dropdown.is_some(),
            ".modal" => self.overlay.is_some(),
            "button.close" => self.overlay.is_some() && !self.no_close_button,
            "button.dismiss" => self.overlay.is_some() && self.dismiss_button,
            "a.next" => self.has_next() || self.next_disabled || self.next_inert,
            "input#login" | "input#password" => self.on_login_page(),
            ".user-menu" => self.url == HOME_URL,
            _ => false,
        }
    }

    fn open_details(&mut self, n: usize, row: &FakeRow) {
        self.dropdown = None;
        self.opened.push(n);
        if row.overlay_never_shows {
            return;
        }
        let titles = if row.overlay_titles.is_empty() {
            vec![row.title.clone()]
        } else {
            row.overlay_titles.clone()
        };
        self.overlay = Some(titles);
        self.overlay_markup = None;
        self.reads_since_open = 0;
    }

    fn hide_overlay(&mut self) {
        self.overlay = None;
        self.overlay_markup = None;
    }

    fn submit_login(&mut self) -> bool {
        if !self.on_login_page() {
            return false;
        }
        if self.accept_login {
            self.url = HOME_URL.to_string();
        }
        true
    }

    fn overlay_text(&mut self) -> Option<String> {
        let titles = self.overlay.as_ref()?;
        let title = titles
            .get(self.reads_since_open.min(titles.len().saturating_sub(1)))
            .cloned()
            .unwrap_or_default();
        self.reads_since_open += 1;
        self.overlay_reads += 1;
        Some(format!(
            "Detalhes da vaga\nTítulo da Vaga: {}\tTipo de Requisição: Vaga nova\nSalário\n\nR$ 3.000,00\n",
            title
        ))
    }
}

fn fake_error(msg: &str) -> Error {
    Error::Driver(msg.to_string())
}

#[async_trait]
impl Driver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut st = self.state();
        st.gotos += 1;
        st.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state().url.clone())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let st = self.state();
        if st.fail_count {
            return Err(fake_error("count failed"));
        }
        Ok(match selector {
            "tbody tr" => st.rows().len(),
            _ => 0,
        })
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.state().exists(selector))
    }

    async fn inner_text(&self, selector: &str) -> Result<Option<String>> {
        let mut st = self.state();
        if let Some((n, "")) = split_row(selector) {
            return Ok(st.row(n).map(FakeRow::text));
        }
        match selector {
            ".modal" => {
                if st.fail_overlay_reads {
                    st.overlay_reads += 1;
                    return Err(fake_error("overlay detached"));
                }
                if st.overlay_markup.is_some() {
                    return Ok(Some("  \n ".to_string()));
                }
                Ok(st.overlay_text())
            }
            s if s.contains(".alert-danger") && st.on_login_page() => {
                Ok(Some("  Senha inválida  ".to_string()))
            }
            _ => Ok(None),
        }
    }

    async fn outer_html(&self, selector: &str) -> Result<Option<String>> {
        let st = self.state();
        Ok(match split_row(selector) {
            Some((n, "")) => st.row(n).map(FakeRow::html),
            _ => None,
        })
    }

    async fn inner_html(&self, selector: &str) -> Result<Option<String>> {
        let st = self.state();
        Ok(match selector {
            ".modal" if st.overlay_markup.is_some() => st.overlay_markup.clone(),
            ".modal" if st.overlay.is_some() => Some("<div class=\"modal-body\"></div>".into()),
            _ => None,
        })
    }

    async fn is_disabled(&self, selector: &str) -> Result<bool> {
        let st = self.state();
        Ok(selector == "a.next" && st.next_disabled)
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let mut st = self.state();
        if let Some((n, rest)) = split_row(selector) {
            let Some(row) = st.row(n).cloned() else {
                return Ok(false);
            };
            return Ok(match rest {
                ".menu" if row.has_menu => {
                    let first_click = !st.menu_clicks.contains(&n);
                    st.menu_clicks.push(n);
                    if !(row.stubborn_menu && first_click) {
                        st.dropdown = Some(n);
                    }
                    true
                }
                ".details"
                    if st.dropdown == Some(n) && row.has_details && !row.details_by_label =>
                {
                    st.open_details(n, &row);
                    true
                }
                _ => false,
            });
        }
        Ok(match selector {
            "button.close" if st.overlay.is_some() && !st.no_close_button => {
                st.close_clicks += 1;
                if !st.sticky_overlay {
                    st.hide_overlay();
                }
                true
            }
            "button.dismiss" if st.overlay.is_some() && st.dismiss_button => {
                st.dismiss_clicks += 1;
                if !st.sticky_overlay {
                    st.hide_overlay();
                }
                true
            }
            "a.next" if st.next_inert && !st.next_disabled => true,
            "a.next" if st.has_next() && !st.next_disabled => {
                st.page += 1;
                st.dropdown = None;
                true
            }
            r#"button[type="submit"]"# => st.submit_login(),
            _ => false,
        })
    }

    async fn click_by_text(&self, scope: &str, needles: &[String]) -> Result<bool> {
        let mut st = self.state();
        let Some((n, "")) = split_row(scope) else {
            return Ok(false);
        };
        let Some(row) = st.row(n).cloned() else {
            return Ok(false);
        };
        if row.details_by_label && st.dropdown == Some(n) && !needles.is_empty() {
            st.open_details(n, &row);
            return Ok(true);
        }
        Ok(false)
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.state()
            .typed
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let mut st = self.state();
        match key {
            "Escape" => {
                st.escapes += 1;
                st.hide_overlay();
                st.dropdown = None;
            }
            "Enter" => {
                st.submit_login();
            }
            _ => {}
        }
        Ok(())
    }

    async fn scroll_into_view(&self, _selector: &str) -> Result<()> {
        Ok(())
    }

    async fn wait_for_visible(&self, selector: &str, _timeout_ms: u64) -> Result<bool> {
        Ok(self.state().exists(selector))
    }

    async fn wait_for_hidden(&self, selector: &str, _timeout_ms: u64) -> Result<bool> {
        let st = self.state();
        if st.fail_hidden_wait {
            return Err(fake_error("overlay detached"));
        }
        Ok(!st.exists(selector))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn pause(&self, _ms: u64) {}
}
