//! Git command lines for the build data checkout.

use super::Invocation;
use std::path::Path;

/// Whether `dir` already holds a git checkout
pub fn is_checkout(dir: &Path) -> bool {
    dir.join(".git").exists()
}

/// `git clone --branch <reference> <url> <dir>`
pub fn clone(url: &str, reference: &str, dir: &Path) -> Invocation {
    Invocation::new("git")
        .args(["clone", "--branch", reference, url])
        .path_arg(dir)
}

/// `git -C <dir> fetch origin <reference>`
pub fn fetch(dir: &Path, reference: &str) -> Invocation {
    Invocation::new("git")
        .arg("-C")
        .path_arg(dir)
        .args(["fetch", "origin", reference])
}

/// `git -C <dir> checkout --force --detach FETCH_HEAD`
///
/// Works for branches and tags alike and drops local modifications to
/// tracked files.
pub fn reset_to_fetched(dir: &Path) -> Invocation {
    Invocation::new("git")
        .arg("-C")
        .path_arg(dir)
        .args(["checkout", "--force", "--detach", "FETCH_HEAD"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_command() {
        let inv = clone("https://example.invalid/abd.git", "10.1.0", Path::new("abd"));
        assert_eq!(
            inv.args,
            vec!["clone", "--branch", "10.1.0", "https://example.invalid/abd.git", "abd"]
        );
    }

    #[test]
    fn test_reset_commands() {
        let dir = Path::new("abd");
        assert_eq!(fetch(dir, "main").to_string(), "git -C abd fetch origin main");
        assert_eq!(
            reset_to_fetched(dir).to_string(),
            "git -C abd checkout --force --detach FETCH_HEAD"
        );
    }

    #[test]
    fn test_is_checkout() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_checkout(dir.path()));
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(is_checkout(dir.path()));
    }
}
