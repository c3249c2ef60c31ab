//! Phases run before the list is walked: login and list navigation.

use crate::config::{LoginConfig, RetryConfig, Selectors, TargetConfig, Timing};
use crate::driver::{self, Driver};
use crate::{Error, Result};
use std::future::Future;
use tracing::{debug, info, warn};

/// Fill and submit the login form, then check that it worked.
pub async fn login<D: Driver + ?Sized>(
    driver: &D,
    login: &LoginConfig,
    timing: &Timing,
) -> Result<()> {
    info!("Logging in at {}", login.url);
    driver.goto(&login.url).await?;

    if !driver
        .wait_for_visible(&login.username_field, timing.navigation_timeout_ms)
        .await?
    {
        return Err(Error::Auth(format!(
            "login form not found ({})",
            login.username_field
        )));
    }
    driver
        .type_text(&login.username_field, &login.username)
        .await?;
    driver
        .type_text(&login.password_field, &login.password)
        .await?;

    match driver::click_first(driver, login.submit.iter().cloned()).await? {
        Some(sel) => debug!("submitted with {}", sel),
        None => {
            debug!("no submit control, pressing Enter");
            driver.press_key("Enter").await?;
        }
    }
    driver.pause(timing.page_settle_ms).await;

    verify_login(driver, login).await
}

/// Leaving the login page is enough; an authenticated marker is logged when
/// present.
async fn verify_login<D: Driver + ?Sized>(driver: &D, login: &LoginConfig) -> Result<()> {
    let url = driver.current_url().await?;
    debug!("url after login: {}", url);

    if url.contains(&login.login_path) {
        let message = driver
            .inner_text(&login.error_message)
            .await?
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        return Err(Error::Auth(
            message.unwrap_or_else(|| "invalid credentials".into()),
        ));
    }

    if driver::any_exists(driver, &login.authenticated).await? {
        info!("Login succeeded");
    } else {
        info!("Login succeeded (left the login page)");
    }
    Ok(())
}

/// Open the list, wait for its table and count the first page's rows.
pub async fn open_list<D: Driver + ?Sized>(
    driver: &D,
    target: &TargetConfig,
    selectors: &Selectors,
    timing: &Timing,
    retry: &RetryConfig,
) -> Result<usize> {
    info!("Navigating to: {}", target.url);
    with_retry(driver, retry, "navigation to the list", || {
        driver.goto(&target.url)
    })
    .await?;

    with_retry(driver, retry, "waiting for the results table", move || async move {
        let tables = target.table.iter().cloned();
        match driver::first_visible(driver, tables, timing.navigation_timeout_ms).await? {
            Some(sel) => {
                debug!("table found with {}", sel);
                Ok(())
            }
            None => Err(Error::Navigation("no table selector matched".into())),
        }
    })
    .await?;
    driver.pause(timing.settle_ms).await;

    let count = match driver.count(&selectors.rows).await {
        Ok(n) => n,
        Err(e) => {
            warn!("counting rows failed: {}", e);
            0
        }
    };
    if count == 0 {
        warn!("no rows on the first page");
    }
    info!("{} rows on the first page", count);
    Ok(count)
}

async fn with_retry<D, T, F, Fut>(
    driver: &D,
    retry: &RetryConfig,
    what: &str,
    mut op: F,
) -> Result<T>
where
    D: Driver + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;
    for attempt in 1..=retry.attempts {
        if attempt > 1 {
            info!("Retry attempt {}/{} ({})", attempt, retry.attempts, what);
            driver.pause(retry.delay_ms).await;
        }
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{} failed on attempt {}: {}", what, attempt, e);
                last_error = Some(e);
            }
        }
    }
    Err(Error::Navigation(format!(
        "{} failed after {} attempts: {}",
        what,
        retry.attempts,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}
