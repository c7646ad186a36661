//! Redaction of credentials in upstream error bodies and log messages.

use regex::{Captures, Regex};
use std::sync::LazyLock;

// GitHub personal, OAuth, user-to-server, server-to-server and refresh tokens.
static GITHUB_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:gh[pousr]_[A-Za-z0-9]{20,}|github_pat_[A-Za-z0-9_]{20,})").expect("valid pattern")
});

static AUTH_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Bearer|JWT|token)\s+[A-Za-z0-9\-_\.=]{16,}").expect("valid pattern")
});

static JWT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\beyJ[A-Za-z0-9_-]+\.eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+").expect("valid pattern")
});

static SECRET_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(["']?(?:access_token|token|shared_secret|secret|password)["']?\s*[:=]\s*["']?)[^"'\s,}&]+"#)
        .expect("valid pattern")
});

/// Replace every credential-looking substring of `message`.
pub fn scrub_secrets(message: &str) -> String {
    let scrubbed = GITHUB_TOKEN.replace_all(message, "[TOKEN_REDACTED]");
    let scrubbed = AUTH_SCHEME.replace_all(&scrubbed, "$1 [TOKEN_REDACTED]");
    let scrubbed = JWT.replace_all(&scrubbed, "[JWT_REDACTED]");
    SECRET_FIELD
        .replace_all(&scrubbed, |caps: &Captures| format!("{}[REDACTED]", &caps[1]))
        .into_owned()
}
