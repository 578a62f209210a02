//! Best-effort browser / OS classification from a `User-Agent` header.
//!
//! Rules are ordered: the first matching pattern names the result. Several
//! engines impersonate each other (every Chromium build also says `Safari`,
//! every iPhone also says `Mac OS X`), so more specific tokens come first.

use regex::Regex;
use std::sync::LazyLock;

const BROWSER_PATTERNS: &[(&str, &str)] = &[
    (r"\bEdg(?:e|A|iOS)?/", "Edge"),
    (r"\bOPR/|\bOpera\b", "Opera"),
    (r"\bSamsungBrowser/", "Samsung Browser"),
    (r"\bFirefox/|\bFxiOS/", "Firefox"),
    (r"\bCriOS/|\bChrome/", "Chrome"),
    (r"Version/[\d.]+ Mobile/\S+ Safari/", "Mobile Safari"),
    (r"Version/[\d.]+.*\bSafari/", "Safari"),
    (r"\bMSIE |\bTrident/", "IE"),
    (r"^curl/", "curl"),
    (r"\bPostmanRuntime/", "Postman"),
    (r"(?i)^insomnia/", "Insomnia"),
];

const OS_PATTERNS: &[(&str, &str)] = &[
    (r"\bWindows\b|\bWin(?:32|64)\b", "Windows"),
    (r"\biPhone\b|\biPad\b|\biPod\b", "iOS"),
    (r"\bAndroid\b", "Android"),
    (r"\bCrOS\b", "Chrome OS"),
    (r"\bMacintosh\b|\bMac OS X\b", "Mac OS"),
    (r"\bLinux\b|\bX11\b", "Linux"),
];

static BROWSER_RULES: LazyLock<Vec<(Regex, &'static str)>> =
    LazyLock::new(|| compile_rules(BROWSER_PATTERNS));

static OS_RULES: LazyLock<Vec<(Regex, &'static str)>> =
    LazyLock::new(|| compile_rules(OS_PATTERNS));

fn compile_rules(patterns: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    patterns
        .iter()
        .filter_map(|(pattern, name)| match Regex::new(pattern) {
            Ok(re) => Some((re, *name)),
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Invalid user-agent pattern ignored");
                None
            }
        })
        .collect()
}

fn classify(rules: &[(Regex, &'static str)], user_agent: &str) -> Option<String> {
    rules
        .iter()
        .find(|(re, _)| re.is_match(user_agent))
        .map(|(_, name)| (*name).to_string())
}

/// Browser (or API client) name, if recognised.
pub fn browser(user_agent: &str) -> Option<String> {
    classify(&BROWSER_RULES, user_agent)
}

/// Operating system name, if recognised.
pub fn os(user_agent: &str) -> Option<String> {
    classify(&OS_RULES, user_agent)
}
