pub mod session;

use crate::aggregate::RunResult;
use crate::config::{BrowserConfig, Config};
use crate::driver::{Driver, EokaDriver};
use crate::pipeline::{CancelToken, Pipeline};
use crate::report::RunReport;
use crate::Result;
use std::time::Instant;
use tracing::{info, warn};

/// Runs harvests against one browser page.
pub struct Harvester<D> {
    driver: D,
    cancel: CancelToken,
}

impl Harvester<EokaDriver> {
    /// Launch a browser for harvesting.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        Ok(Self::new(EokaDriver::launch(config).await?))
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.driver.close().await
    }
}

impl<D: Driver> Harvester<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            cancel: CancelToken::new(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Token that stops the harvest before its next row.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Log in, open the list and walk it.
    ///
    /// A failure screenshot is written when the run ends in an error and
    /// `on_failure.screenshot` is set.
    pub async fn run(&mut self, config: &Config) -> Result<RunReport> {
        let start = Instant::now();
        match self.run_once(config).await {
            Ok(result) => {
                let report = RunReport::new(result, start.elapsed());
                info!(
                    "Harvest finished in {}: {}/{} vacancies ({})",
                    report.execution_time,
                    report.extracted_vacancies,
                    report.total_vacancies,
                    report.success_rate
                );
                Ok(report)
            }
            Err(e) => {
                warn!("Harvest failed: {}", e);
                self.handle_failure(config).await;
                Err(e)
            }
        }
    }

    async fn run_once(&mut self, config: &Config) -> Result<RunResult> {
        if let Some(ref login) = config.login {
            session::login(&self.driver, login, &config.timing).await?;
        }

        let total = session::open_list(
            &self.driver,
            &config.target,
            &config.selectors,
            &config.timing,
            &config.retry(),
        )
        .await?;

        Pipeline::new(&mut self.driver, config)
            .with_cancel(self.cancel.clone())
            .run(total)
            .await
    }

    async fn handle_failure(&self, config: &Config) {
        let Some(path) = config
            .on_failure
            .as_ref()
            .and_then(|f| f.screenshot.as_ref())
        else {
            return;
        };
        let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S").to_string();
        let path = path.replace("{timestamp}", &timestamp);
        info!("Saving failure screenshot to: {}", path);
        match self.driver.screenshot().await {
            Ok(data) => {
                if let Err(e) = std::fs::write(&path, data) {
                    warn!("Failed to save screenshot: {}", e);
                }
            }
            Err(e) => warn!("Failed to take screenshot: {}", e),
        }
    }
}
