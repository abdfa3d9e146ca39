//! Version command.

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Line printed for `--version`.
pub fn version_line() -> String {
    format!("appconfig-sync {}", VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_not_empty() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_version_line() {
        assert!(version_line().starts_with("appconfig-sync "));
    }
}
