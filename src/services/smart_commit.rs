//! Smart-commit issue key extraction.
//!
//! An issue key is a project key (an uppercase letter followed by at least
//! one uppercase letter, digit or underscore), a dash and a number. The key
//! must not be glued to a preceding letter or digit, so `xABC-1` is not a key
//! while `[ABC-1]` and `ABC-1-ABC-2` are.

use regex::Regex;
use std::sync::LazyLock;

static ISSUE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9])([A-Z][A-Z0-9_]+-[0-9]+)").expect("issue key pattern is valid")
});

/// Issue keys in `message`, de-duplicated in first-seen order.
pub fn extract_issue_keys(message: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut start = 0;
    // The prefix group consumes one character, so matches are taken one at a
    // time and scanning resumes right after each key.
    while let Some(caps) = ISSUE_KEY.captures_at(message, start) {
        let Some(key) = caps.get(1) else { break };
        if !keys.iter().any(|k| k == key.as_str()) {
            keys.push(key.as_str().to_string());
        }
        start = key.end();
    }
    keys
}

/// Project part of an issue key (`ABC` for `ABC-123`).
pub fn project_key(issue_key: &str) -> &str {
    issue_key.split_once('-').map_or(issue_key, |(project, _)| project)
}

/// Distinct project keys referenced by a set of issue keys, in first-seen
/// order.
pub fn reduce_project_keys<'a, I>(issue_keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut projects: Vec<String> = Vec::new();
    for key in issue_keys {
        let project = project_key(key);
        if !projects.iter().any(|p| p == project) {
            projects.push(project.to_string());
        }
    }
    projects
}
