//! Process-wide secret-redaction registry.
//!
//! Secrets are registered once during configuration resolution and
//! consulted whenever user-visible text is produced. The registry is
//! never cleared mid-run; registration has set semantics so repeated
//! resolution is idempotent.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

static SECRETS: Mutex<BTreeSet<String>> = Mutex::new(BTreeSet::new());

const MASK: &str = "<redacted>";

/// Register a secret value. Empty strings are ignored.
pub fn register_secret(value: &str) {
    if value.is_empty() {
        return;
    }
    SECRETS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(value.to_owned());
}

/// Replace every registered secret occurring in `text` with a mask.
pub fn redact(text: &str) -> String {
    let secrets = SECRETS.lock().unwrap_or_else(PoisonError::into_inner);
    let mut out = text.to_owned();
    for secret in secrets.iter() {
        if out.contains(secret.as_str()) {
            out = out.replace(secret.as_str(), MASK);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_secrets_are_masked() {
        register_secret("s3cr3t-token-a");
        let out = redact("auth failed for s3cr3t-token-a (s3cr3t-token-a expired)");
        assert_eq!(out, "auth failed for <redacted> (<redacted> expired)");
    }

    #[test]
    fn registration_is_idempotent() {
        register_secret("s3cr3t-token-b");
        register_secret("s3cr3t-token-b");
        assert_eq!(redact("x s3cr3t-token-b y"), "x <redacted> y");
    }

    #[test]
    fn empty_secret_is_ignored() {
        register_secret("");
        assert_eq!(redact("untouched"), "untouched");
    }
}
