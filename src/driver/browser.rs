use super::Driver;
use crate::config::BrowserConfig;
use crate::wait::{wait_until, PollPolicy};
use crate::Result;
use async_trait::async_trait;
use eoka::{Browser, Page};
use tracing::debug;

/// Poll interval for visibility waits.
const VISIBILITY_POLL_MS: u64 = 100;

/// Idle window after navigation before the page counts as settled.
const NETWORK_IDLE_MS: u64 = 500;
const NETWORK_IDLE_TIMEOUT_MS: u64 = 15_000;

/// Quote a string as a JS literal.
fn js(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Visible: attached, not `display: none`/`visibility: hidden`, non-zero box.
const IS_VISIBLE_JS: &str = r#"((sel) => {
    return Array.from(document.querySelectorAll(sel)).some(el => {
        const style = getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden') return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0;
    });
})"#;

const IS_DISABLED_JS: &str = r#"((sel) => {
    const el = document.querySelector(sel);
    if (!el) return false;
    return el.classList.contains('disabled')
        || el.hasAttribute('disabled')
        || !!el.parentElement?.classList.contains('disabled');
})"#;

const CLICK_BY_TEXT_JS: &str = r#"((scope, needles) => {
    const root = document.querySelector(scope);
    if (!root) return false;
    const candidates = root.querySelectorAll('button, a, [role="button"], li, [onclick]');
    for (const el of candidates) {
        const text = (el.textContent || '').trim().toLowerCase();
        if (needles.some(n => text.includes(n.toLowerCase()))) {
            el.click();
            return true;
        }
    }
    return false;
})"#;

/// [`Driver`] over a stealth Chrome page.
pub struct EokaDriver {
    browser: Browser,
    page: Page,
}

impl EokaDriver {
    /// Launch a browser and open a blank page.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            config.headless, config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        Ok(Self { browser, page })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }

    async fn visible(&self, selector: &str) -> Result<bool> {
        let script = format!("{}({})", IS_VISIBLE_JS, js(selector));
        Ok(self.page.evaluate(&script).await?)
    }

    async fn element_string(&self, selector: &str, property: &str) -> Result<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? (el.{} || '') : null; }})()",
            js(selector),
            property
        );
        Ok(self.page.evaluate(&script).await?)
    }

    async fn poll_visibility(&self, selector: &str, want: bool, timeout_ms: u64) -> Result<bool> {
        let policy = PollPolicy::within(timeout_ms, VISIBILITY_POLL_MS);
        let poll = wait_until(policy, |_| async move {
            let visible = self.visible(selector).await?;
            Ok((visible == want).then_some(()))
        })
        .await;
        Ok(poll.is_ready())
    }
}

#[async_trait]
impl Driver for EokaDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        if let Err(e) = self
            .page
            .wait_for_network_idle(NETWORK_IDLE_MS, NETWORK_IDLE_TIMEOUT_MS)
            .await
        {
            debug!("network did not go idle after {}: {}", url, e);
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?)
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let script = format!("document.querySelectorAll({}).length", js(selector));
        Ok(self.page.evaluate(&script).await?)
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        let script = format!("!!document.querySelector({})", js(selector));
        Ok(self.page.evaluate(&script).await?)
    }

    async fn inner_text(&self, selector: &str) -> Result<Option<String>> {
        self.element_string(selector, "innerText").await
    }

    async fn outer_html(&self, selector: &str) -> Result<Option<String>> {
        self.element_string(selector, "outerHTML").await
    }

    async fn inner_html(&self, selector: &str) -> Result<Option<String>> {
        self.element_string(selector, "innerHTML").await
    }

    async fn is_disabled(&self, selector: &str) -> Result<bool> {
        let script = format!("{}({})", IS_DISABLED_JS, js(selector));
        Ok(self.page.evaluate(&script).await?)
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let clicked = self.page.try_click(selector).await?;
        debug!("click {}: {}", selector, clicked);
        Ok(clicked)
    }

    async fn click_by_text(&self, scope: &str, needles: &[String]) -> Result<bool> {
        let script = format!(
            "{}({}, {})",
            CLICK_BY_TEXT_JS,
            js(scope),
            serde_json::to_string(needles)?
        );
        Ok(self.page.evaluate(&script).await?)
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.page.human_fill(selector, text).await?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.page.human().press_key(key).await?;
        Ok(())
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<()> {
        let script = format!(
            "document.querySelector({})?.scrollIntoView({{behavior:'smooth',block:'center'}})",
            js(selector)
        );
        self.page.execute(&script).await?;
        Ok(())
    }

    async fn wait_for_visible(&self, selector: &str, timeout_ms: u64) -> Result<bool> {
        self.poll_visibility(selector, true, timeout_ms).await
    }

    async fn wait_for_hidden(&self, selector: &str, timeout_ms: u64) -> Result<bool> {
        self.poll_visibility(selector, false, timeout_ms).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(self.page.screenshot().await?)
    }

    async fn pause(&self, ms: u64) {
        self.page.wait(ms).await;
    }
}
