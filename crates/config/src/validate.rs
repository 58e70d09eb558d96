//! Configuration validation engine.
//!
//! Validates TOML configuration files against the known schema, detects
//! unknown/misspelled fields, and reports semantic problems before a run
//! wastes a browser launch on them.

use std::{collections::HashMap, path::Path};

use secrecy::ExposeSecret;

use crate::schema::ClockinConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "semantic",
    /// "mail", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "report.ur"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Represents the expected shape of the configuration schema.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// Scalar value — stop recursion.
    Leaf,
}

/// Build the full schema map mirroring every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let signature = || {
        Struct(HashMap::from([
            ("url_contains", Leaf),
            ("selector", Leaf),
            ("text_contains", Leaf),
        ]))
    };

    let device = || {
        Struct(HashMap::from([
            ("user_agent", Leaf),
            ("width", Leaf),
            ("height", Leaf),
            ("scale", Leaf),
            ("mobile", Leaf),
            ("touch", Leaf),
        ]))
    };

    let selectors = || {
        Struct(HashMap::from([
            ("username_input", Leaf),
            ("password_input", Leaf),
            ("login_button", Leaf),
            ("save_button", Leaf),
        ]))
    };

    let browser = || {
        Struct(HashMap::from([
            ("chrome_path", Leaf),
            ("headless", Leaf),
            ("navigation_timeout_ms", Leaf),
            ("chrome_args", Leaf),
            ("device", device()),
            ("selectors", selectors()),
            (
                "signatures",
                Struct(HashMap::from([
                    ("login_page", signature()),
                    ("logging_in", signature()),
                    ("index_page", signature()),
                    ("save_done", signature()),
                ])),
            ),
            (
                "scripts",
                Struct(HashMap::from([
                    ("login", Leaf),
                    ("confirm", Leaf),
                    ("save", Leaf),
                ])),
            ),
        ]))
    };

    let mail = || {
        Struct(HashMap::from([
            (
                "info",
                Struct(HashMap::from([
                    ("from", Leaf),
                    ("to", Leaf),
                    ("subject", Leaf),
                    ("html", Leaf),
                ])),
            ),
            (
                "transport",
                Struct(HashMap::from([
                    ("host", Leaf),
                    ("port", Leaf),
                    ("secure", Leaf),
                    (
                        "auth",
                        Struct(HashMap::from([("user", Leaf), ("pass", Leaf)])),
                    ),
                ])),
            ),
        ]))
    };

    Struct(HashMap::from([
        (
            "account",
            Struct(HashMap::from([("username", Leaf), ("password", Leaf)])),
        ),
        (
            "report",
            Struct(HashMap::from([
                ("url", Leaf),
                ("max_attempts", Leaf),
                ("attempt_interval_ms", Leaf),
                ("shot_dir", Leaf),
            ])),
        ),
        ("browser", browser()),
        ("mail", mail()),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.len();
    let b_len = b.len();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb {
                0
            } else {
                1
            };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Find the best match for `needle` among `candidates` using Levenshtein
/// distance. Returns `Some(best)` if the distance is <= `max_distance`.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = if let Some(p) = path {
        Some(p.to_path_buf())
    } else {
        crate::loader::find_config_file()
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let mut result = validate_toml_str(&content);
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML string without file-system side effects (useful for tests
/// and the CLI).
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    // 1. Syntax — parse raw TOML
    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    // 2. Unknown fields — walk the TOML tree against KnownKeys
    let schema = build_schema_map();
    check_unknown_fields(&toml_value, &schema, "", &mut diagnostics);

    // 3. Type check — attempt full deserialization
    if let Err(e) = toml::from_str::<ClockinConfig>(toml_str) {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        });
    }

    // 4. Semantic warnings on parsed config (only if it parses)
    if let Ok(config) = toml::from_str::<ClockinConfig>(toml_str) {
        check_semantic_warnings(&config, &mut diagnostics);
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Walk the TOML value tree against the schema tree and flag unknown keys.
fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) {
        let known_keys: Vec<&str> = fields.keys().copied().collect();
        for (key, child_value) in table {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            if let Some(child_schema) = fields.get(key.as_str()) {
                check_unknown_fields(child_value, child_schema, &path, diagnostics);
            } else {
                let level = if prefix.is_empty() {
                    "at top level "
                } else {
                    ""
                };
                let suggestion = suggest(key, &known_keys, 3);
                let msg = if let Some(s) = suggestion {
                    format!("unknown field {level}(did you mean \"{s}\"?)")
                } else {
                    format!("unknown field {level}")
                };
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "unknown-field",
                    path,
                    message: msg.trim().to_string(),
                });
            }
        }
    }
    // Leaf or type mismatch — stop recursion (type errors caught later)
}

/// Run semantic checks on a successfully parsed config.
fn check_semantic_warnings(config: &ClockinConfig, diagnostics: &mut Vec<Diagnostic>) {
    if config.account.username.is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "semantic",
            path: "account.username".into(),
            message: "username is empty; login will be rejected".into(),
        });
    }
    if config.account.password.expose_secret().is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "semantic",
            path: "account.password".into(),
            message: "password is empty; login will be rejected".into(),
        });
    }

    // report.url must be a usable http(s) URL
    if config.report.url.is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "semantic",
            path: "report.url".into(),
            message: "report.url is required".into(),
        });
    } else {
        match url::Url::parse(&config.report.url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {},
            Ok(parsed) => {
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "semantic",
                    path: "report.url".into(),
                    message: format!(
                        "unsupported URL scheme \"{}\", only http/https allowed",
                        parsed.scheme()
                    ),
                });
            },
            Err(e) => {
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "semantic",
                    path: "report.url".into(),
                    message: format!("invalid URL: {e}"),
                });
            },
        }
    }

    if config.report.max_attempts == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "semantic",
            path: "report.max_attempts".into(),
            message: "max_attempts is 0; a stage timeout will not be retried".into(),
        });
    }

    // Mail is optional, but a half-filled section is the most common operator
    // mistake, so surface what the notifier would skip at send time.
    if let Some(ref mail) = config.mail {
        match (&mail.info, &mail.transport) {
            (None, None) => {
                diagnostics.push(Diagnostic {
                    severity: Severity::Info,
                    category: "mail",
                    path: "mail".into(),
                    message: "mail section is present but empty; notifications stay off".into(),
                });
            },
            (None, Some(_)) | (Some(_), None) => {
                diagnostics.push(Diagnostic {
                    severity: Severity::Warning,
                    category: "mail",
                    path: "mail".into(),
                    message: "notifications need both mail.info and mail.transport".into(),
                });
            },
            (Some(info), Some(transport)) => {
                for (field, value) in [
                    ("mail.info.from", &info.from),
                    ("mail.info.to", &info.to),
                    ("mail.info.subject", &info.subject),
                    ("mail.info.html", &info.html),
                ] {
                    if value.is_empty() {
                        diagnostics.push(Diagnostic {
                            severity: Severity::Warning,
                            category: "mail",
                            path: field.into(),
                            message: "required for mail notification".into(),
                        });
                    }
                }
                if transport.host.is_empty() {
                    diagnostics.push(Diagnostic {
                        severity: Severity::Warning,
                        category: "mail",
                        path: "mail.transport.host".into(),
                        message: "required for mail notification".into(),
                    });
                }
                if transport.port == 0 {
                    diagnostics.push(Diagnostic {
                        severity: Severity::Warning,
                        category: "mail",
                        path: "mail.transport.port".into(),
                        message: "port must be non-zero".into(),
                    });
                }
                if transport.secure.is_none() {
                    diagnostics.push(Diagnostic {
                        severity: Severity::Warning,
                        category: "mail",
                        path: "mail.transport.secure".into(),
                        message: "set true for implicit TLS or false for STARTTLS".into(),
                    });
                }
                if transport.auth.user.is_empty() {
                    diagnostics.push(Diagnostic {
                        severity: Severity::Warning,
                        category: "mail",
                        path: "mail.transport.auth.user".into(),
                        message: "required for mail notification".into(),
                    });
                }
                if transport.auth.pass.expose_secret().is_empty() {
                    diagnostics.push(Diagnostic {
                        severity: Severity::Warning,
                        category: "mail",
                        path: "mail.transport.auth.pass".into(),
                        message: "required for mail notification".into(),
                    });
                }
            },
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_VALID: &str = r#"
[account]
username = "alice"
password = "pw"

[report]
url = "https://report.example.edu/daily"
"#;

    #[test]
    fn levenshtein_identical() {
        assert_eq!(levenshtein("report", "report"), 0);
    }

    #[test]
    fn levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", ""), 0);
    }

    #[test]
    fn levenshtein_single_edit() {
        assert_eq!(levenshtein("account", "acount"), 1); // deletion
        assert_eq!(levenshtein("url", "ur"), 1); // deletion
        assert_eq!(levenshtein("mail", "maik"), 1); // substitution
    }

    #[test]
    fn suggest_finds_close_match() {
        let candidates = &["account", "report", "browser", "mail"];
        assert_eq!(suggest("acount", candidates, 3), Some("account"));
        assert_eq!(suggest("reprot", candidates, 3), Some("report"));
    }

    #[test]
    fn suggest_returns_none_for_distant() {
        let candidates = &["account", "report", "browser", "mail"];
        assert_eq!(suggest("xxxxxxxxx", candidates, 3), None);
    }

    #[test]
    fn unknown_top_level_key_with_suggestion() {
        let result = validate_toml_str("acount = 42\n");
        let unknown = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field" && d.path == "acount");
        assert!(
            unknown.is_some(),
            "expected unknown-field diagnostic for 'acount'"
        );
        let d = unknown.unwrap();
        assert_eq!(d.severity, Severity::Error);
        assert!(
            d.message.contains("account"),
            "expected suggestion 'account' in message: {}",
            d.message
        );
    }

    #[test]
    fn unknown_nested_key_with_suggestion() {
        let toml = r#"
[report]
ur = "https://report.example.edu"
"#;
        let result = validate_toml_str(toml);
        let unknown = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field" && d.path == "report.ur");
        assert!(
            unknown.is_some(),
            "expected unknown-field for 'report.ur', got: {:?}",
            result.diagnostics
        );
        assert!(unknown.unwrap().message.contains("url"));
    }

    #[test]
    fn syntax_error_detected() {
        let result = validate_toml_str("this is not valid toml [[[");
        assert!(result.has_errors());
        let syntax = result.diagnostics.iter().find(|d| d.category == "syntax");
        assert!(syntax.is_some());
    }

    #[test]
    fn minimal_valid_config_has_no_errors() {
        let result = validate_toml_str(MINIMAL_VALID);
        let errors: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn missing_report_url_is_error() {
        let result = validate_toml_str("");
        let error = result
            .diagnostics
            .iter()
            .find(|d| d.severity == Severity::Error && d.path == "report.url");
        assert!(error.is_some(), "expected error for missing report.url");
    }

    #[test]
    fn non_http_url_is_error() {
        let toml = r#"
[report]
url = "ftp://report.example.edu"
"#;
        let result = validate_toml_str(toml);
        let error = result.diagnostics.iter().find(|d| {
            d.severity == Severity::Error
                && d.path == "report.url"
                && d.message.contains("scheme")
        });
        assert!(error.is_some(), "expected scheme error for ftp URL");
    }

    #[test]
    fn empty_credentials_warned() {
        let toml = r#"
[report]
url = "https://report.example.edu"
"#;
        let result = validate_toml_str(toml);
        for path in ["account.username", "account.password"] {
            assert!(
                result
                    .diagnostics
                    .iter()
                    .any(|d| d.severity == Severity::Warning && d.path == path),
                "expected warning for empty {path}"
            );
        }
    }

    #[test]
    fn max_attempts_zero_info() {
        let toml = r#"
[report]
url = "https://report.example.edu"
max_attempts = 0
"#;
        let result = validate_toml_str(toml);
        let info = result
            .diagnostics
            .iter()
            .find(|d| d.severity == Severity::Info && d.path == "report.max_attempts");
        assert!(info.is_some(), "expected info for max_attempts = 0");
    }

    #[test]
    fn mail_transport_without_info_warned() {
        let toml = r#"
[report]
url = "https://report.example.edu"

[mail.transport]
host = "smtp.example.com"
port = 465
secure = true
"#;
        let result = validate_toml_str(toml);
        let warning = result
            .diagnostics
            .iter()
            .find(|d| d.category == "mail" && d.path == "mail");
        assert!(
            warning.is_some(),
            "expected warning for transport without info, got: {:?}",
            result.diagnostics
        );
    }

    #[test]
    fn mail_missing_pass_warned() {
        let toml = r#"
[report]
url = "https://report.example.edu"

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
"#;
        let result = validate_toml_str(toml);
        let warning = result
            .diagnostics
            .iter()
            .find(|d| d.path == "mail.transport.auth.pass");
        assert!(warning.is_some(), "expected warning for missing pass");
    }

    #[test]
    fn mail_secure_unset_warned() {
        let toml = r#"
[report]
url = "https://report.example.edu"

[mail.info]
from = "a@example.com"
to = "b@example.com"
subject = "s"
html = "h"

[mail.transport]
host = "smtp.example.com"
port = 587

[mail.transport.auth]
user = "a@example.com"
pass = "pw"
"#;
        let result = validate_toml_str(toml);
        let warning = result
            .diagnostics
            .iter()
            .find(|d| d.path == "mail.transport.secure");
        assert!(warning.is_some(), "expected warning for unset secure flag");
    }

    #[test]
    fn unknown_field_inside_signature() {
        let toml = r#"
[browser.signatures.login_page]
selctor = "input[type='password']"
"#;
        let result = validate_toml_str(toml);
        let unknown = result.diagnostics.iter().find(|d| {
            d.category == "unknown-field" && d.path == "browser.signatures.login_page.selctor"
        });
        assert!(
            unknown.is_some(),
            "expected unknown-field in signature, got: {:?}",
            result.diagnostics
        );
        assert!(unknown.unwrap().message.contains("selector"));
    }

    /// Schema drift guard: verify every key from `ClockinConfig::default()`
    /// (plus a fully-populated mail section) is represented in
    /// `build_schema_map()`.
    #[test]
    fn schema_drift_guard() {
        let mut config = ClockinConfig::default();
        config.mail = Some(crate::schema::MailConfig {
            info: Some(crate::schema::MessageInfo::default()),
            transport: Some(crate::schema::SmtpConfig {
                secure: Some(true),
                ..Default::default()
            }),
        });
        let toml_value = toml::Value::try_from(&config).expect("serialize default config");
        let schema = build_schema_map();
        let mut missing = Vec::new();
        collect_missing_keys(&toml_value, &schema, "", &mut missing);
        assert!(
            missing.is_empty(),
            "schema map is missing keys present in ClockinConfig: {missing:?}\n\
             Update build_schema_map() in validate.rs to include these fields."
        );
    }

    /// Helper for schema drift guard: recursively collect keys in `value` that
    /// are not present in `schema`.
    fn collect_missing_keys(
        value: &toml::Value,
        schema: &KnownKeys,
        prefix: &str,
        missing: &mut Vec<String>,
    ) {
        if let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) {
            for (key, child_value) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                if let Some(child_schema) = fields.get(key.as_str()) {
                    collect_missing_keys(child_value, child_schema, &path, missing);
                } else {
                    missing.push(path);
                }
            }
        }
    }
}
