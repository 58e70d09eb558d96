//! Config schema types (account, report workflow, browser driver, mail).

use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockinConfig {
    pub account: AccountConfig,
    pub report: ReportConfig,
    pub browser: BrowserConfig,
    /// Mail notification is opt-in; absent means "do not notify".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail: Option<MailConfig>,
}

/// The report-site account the bot acts for.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub username: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: Secret<String>,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: Secret::new(String::new()),
        }
    }
}

/// Report workflow settings injected into the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// URL of the remote report page.
    pub url: String,
    /// How many timeout-triggered re-attempts are allowed after the first run.
    pub max_attempts: u32,
    /// Pause between a timeout and the next attempt, in milliseconds.
    pub attempt_interval_ms: u64,
    /// Directory for tagged screenshot artifacts.
    pub shot_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_attempts: 3,
            attempt_interval_ms: 30_000,
            shot_dir: PathBuf::from("shots"),
        }
    }
}

/// Browser driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Path to Chrome/Chromium binary (auto-detected if not set).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Deadline shared by navigation and every stage wait, in milliseconds.
    pub navigation_timeout_ms: u64,
    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,
    /// Device emulation profile applied to the page.
    pub device: DeviceProfile,
    /// CSS selectors for the credential and submit controls.
    pub selectors: PageSelectors,
    /// Per-stage readiness signatures.
    pub signatures: StageSignatures,
    /// Per-stage verdict extraction snippets.
    pub scripts: VerdictScripts,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            navigation_timeout_ms: 30_000,
            chrome_args: Vec::new(),
            device: DeviceProfile::default(),
            selectors: PageSelectors::default(),
            signatures: StageSignatures::default(),
            scripts: VerdictScripts::default(),
        }
    }
}

/// Mobile device profile the page emulates. Defaults match the report site's
/// phone-only layout (iPhone 6 class).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub user_agent: String,
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub mobile: bool,
    pub touch: bool,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 8_0 like Mac OS X) \
                         AppleWebKit/600.1.4 (KHTML, like Gecko) Version/8.0 \
                         Mobile/12A366 Safari/600.1.4"
                .into(),
            width: 375,
            height: 667,
            scale: 2.0,
            mobile: true,
            touch: true,
        }
    }
}

/// CSS selectors for the page controls the probes act on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSelectors {
    pub username_input: String,
    pub password_input: String,
    pub login_button: String,
    pub save_button: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            username_input: "input[name='username']".into(),
            password_input: "input[type='password']".into(),
            login_button: "button[type='submit']".into(),
            save_button: ".save-button".into(),
        }
    }
}

/// One stage-readiness signature. Every present condition must hold; an
/// entirely empty signature matches immediately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSignature {
    /// Substring the page URL must contain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_contains: Option<String>,
    /// CSS selector that must resolve to an element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Fragment the page body text must contain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_contains: Option<String>,
}

impl StageSignature {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url_contains.is_none() && self.selector.is_none() && self.text_contains.is_none()
    }
}

/// Readiness signatures for the four navigational milestones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSignatures {
    pub login_page: StageSignature,
    pub logging_in: StageSignature,
    pub index_page: StageSignature,
    pub save_done: StageSignature,
}

impl Default for StageSignatures {
    fn default() -> Self {
        Self {
            login_page: StageSignature {
                selector: Some("input[type='password']".into()),
                ..StageSignature::default()
            },
            logging_in: StageSignature {
                text_contains: Some("正在登录".into()),
                ..StageSignature::default()
            },
            index_page: StageSignature {
                url_contains: Some("/index".into()),
                ..StageSignature::default()
            },
            save_done: StageSignature {
                selector: Some(".result-tip".into()),
                ..StageSignature::default()
            },
        }
    }
}

/// JavaScript snippets evaluated after each stage wait; each must yield the
/// wire object `{ "error": bool, "message": string }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictScripts {
    pub login: String,
    pub confirm: String,
    pub save: String,
}

/// Default extraction snippet: an error marker element wins, otherwise the
/// first message element's text is the success detail.
const DEFAULT_VERDICT_JS: &str = r#"(() => {
    const err = document.querySelector('.error-tip, .toast-error');
    if (err && err.textContent.trim()) {
        return { error: true, message: err.textContent.trim() };
    }
    const msg = document.querySelector('.result-tip, .message');
    return { error: false, message: msg ? msg.textContent.trim() : '' };
})()"#;

impl Default for VerdictScripts {
    fn default() -> Self {
        Self {
            login: DEFAULT_VERDICT_JS.into(),
            confirm: DEFAULT_VERDICT_JS.into(),
            save: DEFAULT_VERDICT_JS.into(),
        }
    }
}

/// Mail notification settings. `info` and `transport` are validated by the
/// notifier right before a send is attempted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<MessageInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<SmtpConfig>,
}

/// Static envelope and body template for the outcome mail. `subject` and
/// `html` may reference `{{username}}`, `{{date}}`, `{{time}}`, `{{result}}`
/// and `{{message}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageInfo {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// SMTP transport settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// `true` = implicit TLS, `false` = STARTTLS. Must be set explicitly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    pub auth: SmtpAuth,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpAuth {
    pub user: String,
    #[serde(serialize_with = "serialize_secret")]
    pub pass: Secret<String>,
}

impl std::fmt::Debug for SmtpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpAuth")
            .field("user", &self.user)
            .field("pass", &"[REDACTED]")
            .finish()
    }
}

impl Default for SmtpAuth {
    fn default() -> Self {
        Self {
            user: String::new(),
            pass: Secret::new(String::new()),
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_report_config() {
        let cfg = ReportConfig::default();
        assert!(cfg.url.is_empty());
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.attempt_interval_ms, 30_000);
        assert_eq!(cfg.shot_dir, PathBuf::from("shots"));
    }

    #[test]
    fn default_device_is_mobile() {
        let device = DeviceProfile::default();
        assert_eq!((device.width, device.height), (375, 667));
        assert!(device.mobile);
        assert!(device.touch);
        assert!(device.user_agent.contains("iPhone"));
    }

    #[test]
    fn deserialize_from_toml() {
        let toml = r#"
[account]
username = "alice"
password = "s3cret"

[report]
url = "https://report.example.edu/daily"
max_attempts = 2
attempt_interval_ms = 5000

[mail.info]
from = "bot@example.com"
to = "alice@example.com"
subject = "{{result}}"
html = "<p>{{message}}</p>"

[mail.transport]
host = "smtp.example.com"
port = 465
secure = true

[mail.transport.auth]
user = "bot@example.com"
pass = "mailpass"
"#;
        let cfg: ClockinConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.account.username, "alice");
        assert_eq!(cfg.account.password.expose_secret(), "s3cret");
        assert_eq!(cfg.report.max_attempts, 2);
        let mail = cfg.mail.expect("mail section");
        assert_eq!(mail.transport.as_ref().unwrap().secure, Some(true));
        assert_eq!(
            mail.transport.unwrap().auth.pass.expose_secret(),
            "mailpass"
        );
        // defaults for unspecified sections
        assert!(cfg.browser.headless);
        assert_eq!(cfg.browser.navigation_timeout_ms, 30_000);
    }

    #[test]
    fn mail_absent_by_default() {
        let cfg: ClockinConfig = toml::from_str("").unwrap();
        assert!(cfg.mail.is_none());
    }

    #[test]
    fn secure_flag_absent_is_none() {
        let toml = r#"
[mail.transport]
host = "smtp.example.com"
port = 587
"#;
        let cfg: ClockinConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.mail.unwrap().transport.unwrap().secure, None);
    }

    #[test]
    fn debug_redacts_secrets() {
        let account = AccountConfig {
            username: "alice".into(),
            password: Secret::new("hunter2".into()),
        };
        let repr = format!("{account:?}");
        assert!(repr.contains("[REDACTED]"));
        assert!(!repr.contains("hunter2"));
    }

    #[test]
    fn serialize_roundtrip_keeps_secret_value() {
        let cfg = ClockinConfig {
            account: AccountConfig {
                username: "alice".into(),
                password: Secret::new("pw".into()),
            },
            ..Default::default()
        };
        let toml_str = toml::to_string(&cfg).unwrap();
        let cfg2: ClockinConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(cfg2.account.password.expose_secret(), "pw");
    }

    #[test]
    fn empty_signature_detected() {
        assert!(StageSignature::default().is_empty());
        let sig = StageSignature {
            url_contains: Some("/login".into()),
            ..StageSignature::default()
        };
        assert!(!sig.is_empty());
    }
}
