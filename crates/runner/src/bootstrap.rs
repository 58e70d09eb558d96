//! The bootstrap state machine: drives one submission run through the fixed
//! stage sequence and guarantees exactly one terminal outcome, one
//! notification dispatch, and one close per session.

use std::{sync::Arc, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    tracing::{error, info, warn},
};

use crate::{
    notify::OutcomeNotifier,
    outcome::{RetryState, RunOutcome},
    probe::{ProbeError, ReportPage, SessionProvider, StageVerdict},
    shots::ShotStore,
};

/// Settings injected into the orchestrator by its caller.
#[derive(Clone)]
pub struct BootstrapConfig {
    /// URL of the remote report page.
    pub report_url: String,
    pub username: String,
    pub password: Secret<String>,
    /// Pause between a timeout and the next attempt.
    pub attempt_interval: Duration,
}

/// How one attempt ended: a terminal outcome for the whole run, or a
/// retryable stage timeout.
enum AttemptEnd {
    Terminal(RunOutcome),
    RetryTimeout,
}

/// The orchestrator. One instance drives one logical run at a time; the
/// retry path is sequential re-invocation of the same attempt logic, never a
/// background task.
pub struct Bootstrap {
    provider: Arc<dyn SessionProvider>,
    notifier: Arc<dyn OutcomeNotifier>,
    shots: ShotStore,
    config: BootstrapConfig,
}

impl Bootstrap {
    #[must_use]
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        notifier: Arc<dyn OutcomeNotifier>,
        shots: ShotStore,
        config: BootstrapConfig,
    ) -> Self {
        Self {
            provider,
            notifier,
            shots,
            config,
        }
    }

    /// Run to a terminal outcome. `retry` is owned by the caller so the
    /// counter survives every restart and is never reinitialized mid-run.
    pub async fn run(&self, retry: &mut RetryState) -> RunOutcome {
        loop {
            match self.attempt(retry.can_retry()).await {
                AttemptEnd::Terminal(outcome) => {
                    info!(outcome = %outcome, label = outcome.label(), "run finished");
                    return outcome;
                },
                AttemptEnd::RetryTimeout => {
                    let attempt = retry.record_attempt();
                    warn!(
                        attempt,
                        max_attempts = retry.max_attempts,
                        "stage wait timed out, retrying shortly"
                    );
                    tokio::time::sleep(self.config.attempt_interval).await;
                },
            }
        }
    }

    /// One attempt: open a session, walk the stages, end in a terminal
    /// branch or hand a retryable timeout back to [`run`]. The session
    /// opened here is closed here, on every path.
    async fn attempt(&self, can_retry: bool) -> AttemptEnd {
        let page = match self.provider.open().await {
            Ok(page) => page,
            Err(e) => {
                // No session exists, so there is nothing to capture or close.
                error!(error = %e, label = RunOutcome::RuntimeError.label(), "browser session could not be opened");
                self.notifier
                    .notify(RunOutcome::RuntimeError, &e.to_string())
                    .await;
                return AttemptEnd::Terminal(RunOutcome::RuntimeError);
            },
        };

        match self.stages(page.as_ref()).await {
            Ok((outcome, message)) => {
                AttemptEnd::Terminal(self.finish(page, outcome, &message).await)
            },
            Err(e) if e.is_timeout() && can_retry => {
                self.close(page).await;
                AttemptEnd::RetryTimeout
            },
            Err(e) => {
                let outcome = if e.is_timeout() {
                    RunOutcome::TimeoutExhausted
                } else {
                    RunOutcome::RuntimeError
                };
                error!(error = %e, label = outcome.label(), "run aborted");
                AttemptEnd::Terminal(self.finish(page, outcome, &e.to_string()).await)
            },
        }
    }

    /// The fixed stage sequence. Returns the terminal outcome and its detail
    /// message; propagates only timeouts and driver faults.
    async fn stages(
        &self,
        page: &dyn ReportPage,
    ) -> Result<(RunOutcome, String), ProbeError> {
        page.goto(&self.config.report_url).await?;
        page.wait_for_login_page().await?;
        info!("login page loaded");
        let href = page.location_href().await?;
        info!(url = %href, "login page address");

        page.login(&self.config.username, self.config.password.expose_secret())
            .await?;
        page.wait_for_logging_in().await?;
        match page.login_result().await? {
            StageVerdict::Failed { message } => {
                error!(label = RunOutcome::LoginFailed.label(), detail = %message, "login rejected");
                return Ok((RunOutcome::LoginFailed, message));
            },
            StageVerdict::Passed { .. } => info!("login succeeded"),
        }

        page.wait_for_index_page().await?;
        info!("report page loaded");
        match page.confirm_result().await? {
            StageVerdict::Failed { message } => {
                error!(label = RunOutcome::ValidationFailed.label(), detail = %message, "pre-filled data rejected");
                return Ok((RunOutcome::ValidationFailed, message));
            },
            StageVerdict::Passed { message } => {
                info!(detail = %message, "pre-filled data confirmed");
            },
        }

        page.click_save().await?;
        page.wait_for_save_done().await?;
        match page.save_result().await? {
            StageVerdict::Failed { message } => {
                error!(label = RunOutcome::SubmitFailed.label(), detail = %message, "save rejected");
                Ok((RunOutcome::SubmitFailed, message))
            },
            StageVerdict::Passed { message } => {
                info!(detail = %message, "save accepted");
                Ok((RunOutcome::Success, message))
            },
        }
    }

    /// Terminal branch tail: capture a tagged screenshot, dispatch the one
    /// notification for this run, close the session.
    async fn finish(
        &self,
        page: Box<dyn ReportPage>,
        outcome: RunOutcome,
        message: &str,
    ) -> RunOutcome {
        self.capture(page.as_ref(), outcome.shot_tag()).await;
        self.notifier.notify(outcome, message).await;
        self.close(page).await;
        outcome
    }

    /// Fire-and-forget screenshot persistence.
    async fn capture(&self, page: &dyn ReportPage, tag: &str) {
        match page.screenshot().await {
            Ok(png) => {
                if let Err(e) = self.shots.save(tag, &png) {
                    warn!(tag, error = %e, "failed to persist screenshot");
                }
            },
            Err(e) => warn!(tag, error = %e, "failed to capture screenshot"),
        }
    }

    async fn close(&self, page: Box<dyn ReportPage>) {
        info!("closing browser session");
        if let Err(e) = page.close().await {
            warn!(error = %e, "failed to close browser session");
        }
    }
}
