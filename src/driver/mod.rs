//! Browser operations the harvest needs, behind one trait.
//!
//! Reads return `None`/`false` for absent elements; `Err` is reserved for the
//! browser itself misbehaving (closed page, broken CDP session).

mod browser;

pub use browser::EokaDriver;

use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate and wait for the page to settle.
    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Number of elements matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize>;

    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Rendered text (`innerText`) of the first match.
    async fn inner_text(&self, selector: &str) -> Result<Option<String>>;

    async fn outer_html(&self, selector: &str) -> Result<Option<String>>;

    async fn inner_html(&self, selector: &str) -> Result<Option<String>>;

    /// Whether the first match is disabled (attribute, class, or a disabled parent).
    async fn is_disabled(&self, selector: &str) -> Result<bool>;

    /// Click the first match. `false` when nothing matched.
    async fn click(&self, selector: &str) -> Result<bool>;

    /// Click the first clickable element inside `scope` whose text contains one
    /// of `needles` (case-insensitive). `false` when none did.
    async fn click_by_text(&self, scope: &str, needles: &[String]) -> Result<bool>;

    /// Replace the value of an input.
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    async fn press_key(&self, key: &str) -> Result<()>;

    async fn scroll_into_view(&self, selector: &str) -> Result<()>;

    /// Wait until the first match is visible. `false` on timeout.
    async fn wait_for_visible(&self, selector: &str, timeout_ms: u64) -> Result<bool>;

    /// Wait until no match is visible. `false` on timeout.
    async fn wait_for_hidden(&self, selector: &str, timeout_ms: u64) -> Result<bool>;

    /// PNG screenshot of the viewport.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn pause(&self, ms: u64) {
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

/// Click the first selector that matches, returning it.
pub async fn click_first<D: Driver + ?Sized>(
    driver: &D,
    selectors: impl IntoIterator<Item = String>,
) -> Result<Option<String>> {
    for sel in selectors {
        if driver.click(&sel).await? {
            return Ok(Some(sel));
        }
    }
    Ok(None)
}

/// First selector whose element becomes visible within `timeout_ms` each.
pub async fn first_visible<D: Driver + ?Sized>(
    driver: &D,
    selectors: impl IntoIterator<Item = String>,
    timeout_ms: u64,
) -> Result<Option<String>> {
    for sel in selectors {
        if driver.wait_for_visible(&sel, timeout_ms).await? {
            return Ok(Some(sel));
        }
    }
    Ok(None)
}

/// Whether any selector currently matches.
pub async fn any_exists<D: Driver + ?Sized>(driver: &D, selectors: &[String]) -> Result<bool> {
    for sel in selectors {
        if driver.exists(sel).await? {
            return Ok(true);
        }
    }
    Ok(false)
}
