//! `ReportPage` implementation over an open CDP page.

use std::time::Duration;

use {
    async_trait::async_trait,
    chromiumoxide::{
        Browser, Page, cdp::browser_protocol::page::CaptureScreenshotFormat, error::CdpError,
    },
    tokio::time::Instant,
    tracing::{debug, info},
};

use {
    clockin_config::{BrowserConfig, StageSignature},
    clockin_runner::{ProbeError, ReportPage, StageVerdict, VerdictWire},
};

/// Poll cadence for stage-signature waits.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One open page on the report site.
pub struct ChromePage {
    browser: Browser,
    page: Page,
    config: BrowserConfig,
}

impl ChromePage {
    pub(crate) fn new(browser: Browser, page: Page, config: BrowserConfig) -> Self {
        Self {
            browser,
            page,
            config,
        }
    }

    async fn current_url(&self) -> Result<String, ProbeError> {
        Ok(self.page.url().await.ok().flatten().unwrap_or_default())
    }

    /// Poll the page against `sig` until it matches or the driver deadline
    /// passes.
    async fn wait_for(&self, stage: &'static str, sig: &StageSignature) -> Result<(), ProbeError> {
        let timeout_ms = self.config.navigation_timeout_ms;
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        while Instant::now() < deadline {
            if self.signature_matches(sig).await? {
                debug!(stage, "stage signature matched");
                return Ok(());
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }

        Err(ProbeError::Timeout(format!(
            "{stage} signature not seen after {timeout_ms}ms"
        )))
    }

    async fn signature_matches(&self, sig: &StageSignature) -> Result<bool, ProbeError> {
        if let Some(fragment) = &sig.url_contains {
            if !self.current_url().await?.contains(fragment.as_str()) {
                return Ok(false);
            }
        }

        if let Some(js) = signature_probe_js(sig) {
            let found: bool = self
                .page
                .evaluate(js.as_str())
                .await
                .map_err(|e| cdp_err("signature probe", e))?
                .into_value()
                .unwrap_or(false);
            if !found {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Evaluate one configured extraction snippet and decode the
    /// `{error, message}` wire object it yields.
    async fn extract_verdict(&self, script: &str) -> Result<StageVerdict, ProbeError> {
        let value: serde_json::Value = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| cdp_err("verdict extraction", e))?
            .into_value()
            .map_err(|e| ProbeError::Evaluation(format!("verdict result: {e:?}")))?;

        let wire: VerdictWire = serde_json::from_value(value)
            .map_err(|e| ProbeError::Evaluation(format!("verdict shape: {e}")))?;
        Ok(wire.into())
    }

    /// Evaluate a snippet that reports whether its target element existed.
    async fn run_action(&self, what: &'static str, js: &str) -> Result<(), ProbeError> {
        let ok: bool = self
            .page
            .evaluate(js)
            .await
            .map_err(|e| cdp_err(what, e))?
            .into_value()
            .unwrap_or(false);

        if ok {
            Ok(())
        } else {
            Err(ProbeError::Evaluation(format!(
                "{what}: expected page controls not found"
            )))
        }
    }
}

#[async_trait]
impl ReportPage for ChromePage {
    async fn goto(&self, url: &str) -> Result<(), ProbeError> {
        if let Err(e) = self.page.goto(url).await {
            return Err(match e {
                CdpError::Timeout => ProbeError::Timeout(format!("navigation to {url} timed out")),
                other => ProbeError::Navigation(other.to_string()),
            });
        }
        // Wait for network to settle; a slow page is caught by the stage wait.
        let _ = self.page.wait_for_navigation().await;
        debug!(url, "navigated");
        Ok(())
    }

    async fn wait_for_login_page(&self) -> Result<(), ProbeError> {
        self.wait_for("login page", &self.config.signatures.login_page)
            .await
    }

    async fn wait_for_logging_in(&self) -> Result<(), ProbeError> {
        self.wait_for("logging in", &self.config.signatures.logging_in)
            .await
    }

    async fn wait_for_index_page(&self) -> Result<(), ProbeError> {
        self.wait_for("report page", &self.config.signatures.index_page)
            .await
    }

    async fn wait_for_save_done(&self) -> Result<(), ProbeError> {
        self.wait_for("save done", &self.config.signatures.save_done)
            .await
    }

    async fn location_href(&self) -> Result<String, ProbeError> {
        self.current_url().await
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), ProbeError> {
        let js = login_fill_js(&self.config.selectors, username, password);
        self.run_action("login", &js).await
    }

    async fn login_result(&self) -> Result<StageVerdict, ProbeError> {
        self.extract_verdict(&self.config.scripts.login).await
    }

    async fn confirm_result(&self) -> Result<StageVerdict, ProbeError> {
        self.extract_verdict(&self.config.scripts.confirm).await
    }

    async fn click_save(&self) -> Result<(), ProbeError> {
        let js = click_js(&self.config.selectors.save_button);
        self.run_action("save click", &js).await
    }

    async fn save_result(&self) -> Result<StageVerdict, ProbeError> {
        self.extract_verdict(&self.config.scripts.save).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ProbeError> {
        self.page
            .screenshot(
                chromiumoxide::page::ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|e| ProbeError::Screenshot(e.to_string()))
    }

    async fn close(mut self: Box<Self>) -> Result<(), ProbeError> {
        self.browser
            .close()
            .await
            .map_err(|e| ProbeError::Driver(e.to_string()))?;
        let _ = self.browser.wait().await;
        info!("browser closed");
        Ok(())
    }
}

fn cdp_err(context: &str, e: CdpError) -> ProbeError {
    match e {
        CdpError::Timeout => ProbeError::Timeout(format!("{context} timed out")),
        other => ProbeError::Driver(format!("{context}: {other}")),
    }
}

/// Quote a string for safe embedding in a JS snippet.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
}

/// Build the boolean probe expression for the selector/text parts of a
/// signature; the URL part is checked Rust-side. `None` when the signature
/// has no page-content conditions.
fn signature_probe_js(sig: &StageSignature) -> Option<String> {
    let mut checks = Vec::new();
    if let Some(selector) = &sig.selector {
        checks.push(format!(
            "document.querySelector({}) !== null",
            js_string(selector)
        ));
    }
    if let Some(text) = &sig.text_contains {
        checks.push(format!(
            "(document.body ? document.body.innerText : '').includes({})",
            js_string(text)
        ));
    }
    if checks.is_empty() {
        None
    } else {
        Some(checks.join(" && "))
    }
}

/// Fill both credential inputs (firing the framework-visible input/change
/// events) and click the login control. Yields `false` when any control is
/// missing.
fn login_fill_js(
    selectors: &clockin_config::PageSelectors,
    username: &str,
    password: &str,
) -> String {
    format!(
        r#"(() => {{
    const user = document.querySelector({user_sel});
    const pass = document.querySelector({pass_sel});
    const button = document.querySelector({button_sel});
    if (!user || !pass || !button) return false;
    const fill = (el, value) => {{
        el.value = value;
        el.dispatchEvent(new Event('input', {{ bubbles: true }}));
        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    }};
    fill(user, {username});
    fill(pass, {password});
    button.click();
    return true;
}})()"#,
        user_sel = js_string(&selectors.username_input),
        pass_sel = js_string(&selectors.password_input),
        button_sel = js_string(&selectors.login_button),
        username = js_string(username),
        password = js_string(password),
    )
}

fn click_js(selector: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector({});
    if (!el) return false;
    el.click();
    return true;
}})()"#,
        js_string(selector)
    )
}
