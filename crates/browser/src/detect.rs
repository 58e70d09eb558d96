//! Chrome/Chromium binary detection.

use std::path::PathBuf;

/// Binary names probed on `$PATH`, in order.
const CHROME_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Well-known install locations probed after `$PATH`.
const CHROME_FALLBACK_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
];

/// Find a usable browser binary. An explicit configured path always wins;
/// a wrong explicit path surfaces as a launch error rather than silently
/// falling back to a different browser.
pub fn detect_chrome(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    for candidate in CHROME_CANDIDATES {
        if let Ok(path) = which::which(candidate) {
            return Some(path);
        }
    }

    CHROME_FALLBACK_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

#[must_use]
pub fn install_hint() -> &'static str {
    "Install Google Chrome or Chromium, or set browser.chrome_path in the config."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = detect_chrome(Some("/opt/custom/chrome"));
        assert_eq!(path, Some(PathBuf::from("/opt/custom/chrome")));
    }

    #[test]
    fn candidate_lists_are_populated() {
        assert!(!CHROME_CANDIDATES.is_empty());
        assert!(!CHROME_FALLBACK_PATHS.is_empty());
    }
}
