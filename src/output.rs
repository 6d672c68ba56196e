//! Quiet mode for human-facing output
//!
//! Set once at startup from `--quiet`, the `quiet` config key or
//! `TREEINFO_QUIET`. Logs on stderr are governed by `RUST_LOG` instead.

use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// Parse a `TREEINFO_QUIET` value
fn quiet_from_env(value: Option<&str>) -> bool {
    value.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn env_quiet() -> bool {
    quiet_from_env(std::env::var("TREEINFO_QUIET").ok().as_deref())
}

/// Fix quiet mode for the rest of the process; the environment can only
/// turn it on
pub fn init_quiet(requested: bool) {
    let quiet = requested || env_quiet();
    if QUIET.set(quiet).is_err() {
        tracing::debug!("quiet mode already initialised");
    }
}

pub fn is_quiet() -> bool {
    *QUIET.get_or_init(env_quiet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_from_env() {
        assert!(quiet_from_env(Some("1")));
        assert!(quiet_from_env(Some("TRUE")));
        assert!(!quiet_from_env(Some("0")));
        assert!(!quiet_from_env(Some("")));
        assert!(!quiet_from_env(None));
    }
}
