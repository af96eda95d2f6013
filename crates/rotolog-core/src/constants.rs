//! Constants and defaults shared across rotolog

use std::env;

/// One kilobyte (decimal).
pub const KB: u64 = 1_000;

/// One kibibyte (binary).
pub const KIB: u64 = 1 << 10;

/// One megabyte (decimal).
pub const MB: u64 = 1_000 * KB;

/// One mebibyte (binary).
pub const MIB: u64 = 1 << 20;

/// One gigabyte (decimal).
pub const GB: u64 = 1_000 * MB;

/// One gibibyte (binary).
pub const GIB: u64 = 1 << 30;

/// Default size threshold before the current file is rotated.
pub const DEFAULT_MAX_SIZE: u64 = 15 * MIB;

/// Default extension for the current file and its archives.
pub const DEFAULT_EXTENSION: &str = ".log";

/// Default strftime layout for the `{time}` template variable. Nanosecond
/// precision keeps archive names unique under rapid rotation.
pub const DEFAULT_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%.9f";

/// Default archive name template.
pub const DEFAULT_ARCHIVE_TEMPLATE: &str = "{time}-{name}{extension}";

/// Base name used when the running executable's name cannot be determined.
pub const FALLBACK_NAME: &str = "rotolog";

/// Normalizes a log base name: lowercased, spaces replaced with hyphens.
pub fn sanitize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

/// Derives the default log base name from the running executable,
/// falling back to [`FALLBACK_NAME`].
pub fn default_name() -> String {
    env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .map(|s| sanitize_name(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert_eq!(KB, 1_000);
        assert_eq!(KIB, 1_024);
        assert_eq!(MB, 1_000_000);
        assert_eq!(MIB, 1_048_576);
        assert_eq!(GB, 1_000_000_000);
        assert_eq!(GIB, 1_073_741_824);
        assert_eq!(DEFAULT_MAX_SIZE, 15 * 1_048_576);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("My App"), "my-app");
        assert_eq!(sanitize_name("  Cool Server  "), "cool-server");
        assert_eq!(sanitize_name("already-fine"), "already-fine");
    }

    #[test]
    fn test_default_name_is_never_empty() {
        let name = default_name();
        assert!(!name.is_empty());
        assert_eq!(name, sanitize_name(&name));
    }
}
