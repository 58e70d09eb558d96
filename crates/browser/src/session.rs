//! Browser launch and session hand-off.

use std::time::Duration;

use {
    async_trait::async_trait,
    chromiumoxide::{
        Browser, BrowserConfig as CdpBrowserConfig,
        cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams,
        handler::viewport::Viewport,
    },
    futures::StreamExt,
    tracing::{debug, info, warn},
};

use {
    clockin_config::BrowserConfig,
    clockin_runner::{ProbeError, ReportPage, SessionProvider},
};

use crate::{detect, page::ChromePage};

/// Launches one hardened, device-emulating browser per attempt.
pub struct ChromeSessionProvider {
    config: BrowserConfig,
}

impl ChromeSessionProvider {
    #[must_use]
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn build_cdp_config(&self, chrome: &std::path::Path) -> Result<CdpBrowserConfig, ProbeError> {
        let device = &self.config.device;

        let mut builder = CdpBrowserConfig::builder()
            .chrome_executable(chrome)
            .viewport(Viewport {
                width: device.width,
                height: device.height,
                device_scale_factor: Some(device.scale),
                emulating_mobile: device.mobile,
                is_landscape: false,
                has_touch: device.touch,
            })
            .request_timeout(Duration::from_millis(self.config.navigation_timeout_ms))
            .arg(format!("--user-agent={}", device.user_agent));

        // with_head() shows the browser window; chromiumoxide is headless by
        // default, so only call it when headless mode is off.
        if !self.config.headless {
            builder = builder.with_head();
        }

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");

        builder
            .build()
            .map_err(|e| ProbeError::Launch(format!("failed to build browser config: {e}")))
    }
}

#[async_trait]
impl SessionProvider for ChromeSessionProvider {
    async fn open(&self) -> Result<Box<dyn ReportPage>, ProbeError> {
        let Some(chrome) = detect::detect_chrome(self.config.chrome_path.as_deref()) else {
            return Err(ProbeError::Launch(format!(
                "Chrome/Chromium not found. {}",
                detect::install_hint()
            )));
        };

        let cdp_config = self.build_cdp_config(&chrome)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| ProbeError::Launch(format!("browser launch failed: {e}")))?;

        // Drive CDP events for the lifetime of the connection; the task
        // exits on its own once the browser is closed.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!(?event, "browser event");
            }
        });

        info!(chrome = %chrome.display(), headless = self.config.headless, "browser launched");

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ProbeError::Launch(format!("failed to open page: {e}")))?;

        // Re-apply device metrics on the page; the browser-level viewport is
        // not always propagated to new pages.
        let device = &self.config.device;
        match SetDeviceMetricsOverrideParams::builder()
            .width(device.width as i64)
            .height(device.height as i64)
            .device_scale_factor(device.scale)
            .mobile(device.mobile)
            .build()
        {
            Ok(metrics) => {
                if let Err(e) = page.execute(metrics).await {
                    warn!(error = %e, "failed to apply device metrics to page");
                }
            },
            Err(e) => warn!(error = %e, "invalid device metrics"),
        }

        info!(
            width = device.width,
            height = device.height,
            user_agent = %device.user_agent,
            "page emulating device profile"
        );

        Ok(Box::new(ChromePage::new(
            browser,
            page,
            self.config.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdp_config_builds_from_defaults() {
        let provider = ChromeSessionProvider::new(BrowserConfig::default());
        let built = provider.build_cdp_config(std::path::Path::new("/usr/bin/chromium"));
        assert!(built.is_ok());
    }
}
