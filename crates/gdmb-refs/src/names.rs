//! Branch name validation following git-style conventions, and parsing of
//! canonical ref names.
//!
//! A valid branch name is non-empty and:
//! - has no whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`;
//! - has no `..` and no `@{`;
//! - does not end with `.lock` or `.`;
//! - has no empty slash-separated component and no component starting with `.`.

use crate::error::{RefError, Result};
use crate::types::BranchScope;

const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];
const FORBIDDEN_SEQUENCES: &[&str] = &["..", "@{"];

const HEADS: &str = "refs/heads/";
const REMOTES: &str = "refs/remotes/";

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidBranchName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a branch name.
///
/// ```
/// use gdmb_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("master").is_ok());
/// assert!(validate_branch_name("feature/auth").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "branch name must not be empty"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }
    if let Some(seq) = FORBIDDEN_SEQUENCES.iter().find(|s| name.contains(**s)) {
        return Err(invalid(name, format!("must not contain {seq:?}")));
    }
    if name.ends_with('.') || name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.' or '.lock'"));
    }
    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }
    Ok(())
}

/// Validate a remote name: a branch-like name without slashes.
pub fn validate_remote_name(name: &str) -> Result<()> {
    if name.contains('/') {
        return Err(invalid(name, "remote name must not contain '/'"));
    }
    validate_branch_name(name)
}

/// Canonical name of a local branch.
pub fn local_ref_name(name: &str) -> String {
    format!("{HEADS}{name}")
}

/// Canonical name of a remote-tracking branch.
pub fn remote_ref_name(remote: &str, name: &str) -> String {
    format!("{REMOTES}{remote}/{name}")
}

/// Split a canonical ref name into its scope and branch name.
///
/// `refs/heads/feature/x` is the local branch `feature/x`;
/// `refs/remotes/origin/feature/x` is `feature/x` on `origin`.
pub fn parse_ref_name(canonical: &str) -> Result<(BranchScope, String)> {
    if let Some(name) = canonical.strip_prefix(HEADS) {
        validate_branch_name(name)?;
        return Ok((BranchScope::Local, name.to_string()));
    }
    if let Some(rest) = canonical.strip_prefix(REMOTES) {
        if let Some((remote, name)) = rest.split_once('/') {
            validate_remote_name(remote)?;
            validate_branch_name(name)?;
            return Ok((BranchScope::Remote(remote.to_string()), name.to_string()));
        }
    }
    Err(RefError::InvalidRefName(canonical.to_string()))
}
