//! Configuration loading, validation, and env substitution.
//!
//! Config files: `clockin.toml`, `clockin.yaml`, or `clockin.json`
//! Searched in `./` then `~/.config/clockin/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, find_or_default_config_path, load_config},
    schema::{
        AccountConfig, BrowserConfig, ClockinConfig, DeviceProfile, MailConfig, MessageInfo,
        PageSelectors, ReportConfig, SmtpAuth, SmtpConfig, StageSignature, StageSignatures,
        VerdictScripts,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
