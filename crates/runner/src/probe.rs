//! Stage-probe seams between the orchestrator and the browser driver.

use {async_trait::async_trait, serde::Deserialize, thiserror::Error};

/// Errors a stage probe can surface. Content-level failures (wrong password,
/// rejected data) are never errors — they come back as
/// [`StageVerdict::Failed`].
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("page evaluation failed: {0}")]
    Evaluation(String),

    #[error("screenshot failed: {0}")]
    Screenshot(String),

    #[error("driver error: {0}")]
    Driver(String),
}

impl ProbeError {
    /// The retry classifier: only timeouts qualify for a re-attempt.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Wire form of a stage verdict as extracted from page content.
#[derive(Debug, Deserialize)]
pub struct VerdictWire {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
}

/// Verdict of one content-bearing stage (login, confirm, save).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageVerdict {
    /// The stage succeeded; `message` is the human-readable success detail.
    Passed { message: String },
    /// The remote page rejected the stage; `message` is its failure reason.
    Failed { message: String },
}

impl StageVerdict {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Passed { message } | Self::Failed { message } => message,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl From<VerdictWire> for StageVerdict {
    fn from(wire: VerdictWire) -> Self {
        if wire.error {
            Self::Failed {
                message: wire.message,
            }
        } else {
            Self::Passed {
                message: wire.message,
            }
        }
    }
}

/// One open page on the remote report site.
///
/// Waits block until the stage signature appears and fail with
/// [`ProbeError::Timeout`] once the driver's configured deadline passes; they
/// carry no per-stage budget of their own. Result probes assume the matching
/// wait already succeeded.
#[async_trait]
pub trait ReportPage: Send {
    async fn goto(&self, url: &str) -> Result<(), ProbeError>;

    async fn wait_for_login_page(&self) -> Result<(), ProbeError>;
    async fn wait_for_logging_in(&self) -> Result<(), ProbeError>;
    async fn wait_for_index_page(&self) -> Result<(), ProbeError>;
    async fn wait_for_save_done(&self) -> Result<(), ProbeError>;

    /// Current page URL, for diagnostic logging only.
    async fn location_href(&self) -> Result<String, ProbeError>;

    /// Fill the credential inputs and trigger the login submit.
    /// Precondition: the login page signature is satisfied.
    async fn login(&self, username: &str, password: &str) -> Result<(), ProbeError>;

    async fn login_result(&self) -> Result<StageVerdict, ProbeError>;
    async fn confirm_result(&self) -> Result<StageVerdict, ProbeError>;

    /// Trigger the save/submit control.
    /// Precondition: `confirm_result` returned `Passed`.
    async fn click_save(&self) -> Result<(), ProbeError>;

    async fn save_result(&self) -> Result<StageVerdict, ProbeError>;

    /// PNG capture of the current page.
    async fn screenshot(&self) -> Result<Vec<u8>, ProbeError>;

    /// Release the browser. Consumes the handle, so a session can only be
    /// closed once.
    async fn close(self: Box<Self>) -> Result<(), ProbeError>;
}

/// Opens one browser session per attempt.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn open(&self) -> Result<Box<dyn ReportPage>, ProbeError>;
}
