//! Rotator configuration

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use rotolog_core::constants;
use rotolog_core::{Error, Result};

use crate::compress::{Compression, Gzip};
use crate::schedule::Schedule;
use crate::template::NameTemplate;

/// Configuration for a [`Rotator`](crate::Rotator).
///
/// Built with chainable `with_*` calls; unset fields keep their defaults.
/// Invalid values surface as [`Error::Config`] or [`Error::Template`] when
/// the configuration is applied, not while building.
#[derive(Clone)]
pub struct Config {
    folder: PathBuf,
    name: String,
    extension: String,
    time_format: String,
    max_size: u64,
    archive_template: String,
    max_archives: usize,
    max_total_archive_bytes: u64,
    compression: Option<Arc<dyn Compression>>,
    schedule: Option<Arc<dyn Schedule>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            folder: std::env::temp_dir(),
            name: constants::default_name(),
            extension: constants::DEFAULT_EXTENSION.to_string(),
            time_format: constants::DEFAULT_TIME_FORMAT.to_string(),
            max_size: constants::DEFAULT_MAX_SIZE,
            archive_template: constants::DEFAULT_ARCHIVE_TEMPLATE.to_string(),
            max_archives: 0,
            max_total_archive_bytes: 0,
            compression: None,
            schedule: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folder holding the current file and its archives. Must already
    /// exist. Defaults to the system temp directory.
    pub fn with_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Logical name identifying this rotator's file set, also the sharing
    /// key in the registry. Lowercased with spaces replaced by hyphens.
    /// Empty input keeps the previous value. Defaults to the executable
    /// name.
    ///
    /// Changing the name once archives exist orphans them: files written
    /// under the old name fall outside the derived match pattern, so
    /// rescans skip them and retention limits stop applying to them.
    pub fn with_name(mut self, name: &str) -> Self {
        let name = constants::sanitize_name(name);
        if !name.is_empty() {
            self.name = name;
        }
        self
    }

    /// Extension of the current file, `.log` by default. A leading dot is
    /// inserted when missing; an empty extension is allowed. Changing it
    /// once archives exist orphans them the same way a name change does.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = if extension.is_empty() || extension.starts_with('.') {
            extension.to_string()
        } else {
            format!(".{}", extension)
        };
        self
    }

    /// strftime layout for the `{time}` template variable. Should keep
    /// sub-second precision so rapid rotations render distinct names.
    pub fn with_time_format(mut self, format: &str) -> Self {
        self.time_format = format.to_string();
        self
    }

    /// Size threshold in bytes after which a write triggers rotation.
    /// Zero disables size-based rotation. Defaults to 15 MiB.
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    /// Template for archive file names, supporting `{time}`, `{name}`, and
    /// `{extension}`. Defaults to `{time}-{name}{extension}`.
    ///
    /// Changing the template once archives exist orphans them: names
    /// rendered by the old template no longer match the pattern derived
    /// from the new one, so rescans skip them and retention limits stop
    /// applying to them.
    pub fn with_archive_template(mut self, template: &str) -> Self {
        self.archive_template = template.to_string();
        self
    }

    /// Maximum number of archives kept on disk; the oldest are evicted
    /// past the limit. Zero (the default) keeps all.
    pub fn with_max_archives(mut self, count: usize) -> Self {
        self.max_archives = count;
        self
    }

    /// Maximum cumulative size of archives kept on disk; the oldest are
    /// evicted past the limit. Zero (the default) keeps all.
    pub fn with_max_total_archive_bytes(mut self, bytes: u64) -> Self {
        self.max_total_archive_bytes = bytes;
        self
    }

    /// Compresses every archive with `compression` during rotation.
    pub fn with_compression(mut self, compression: impl Compression + 'static) -> Self {
        self.compression = Some(Arc::new(compression));
        self
    }

    /// Shorthand for gzip at the default level.
    pub fn with_gzip(self) -> Self {
        self.with_compression(Gzip::new())
    }

    /// Rotates on `schedule` in addition to any size trigger.
    pub fn with_schedule(mut self, schedule: impl Schedule + 'static) -> Self {
        self.schedule = Some(Arc::new(schedule));
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn time_format(&self) -> &str {
        &self.time_format
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn archive_template(&self) -> &str {
        &self.archive_template
    }

    pub fn max_archives(&self) -> usize {
        self.max_archives
    }

    pub fn max_total_archive_bytes(&self) -> u64 {
        self.max_total_archive_bytes
    }

    pub(crate) fn compression(&self) -> Option<&Arc<dyn Compression>> {
        self.compression.as_ref()
    }

    pub(crate) fn schedule(&self) -> Option<&Arc<dyn Schedule>> {
        self.schedule.as_ref()
    }

    pub(crate) fn retention_enabled(&self) -> bool {
        self.max_archives > 0 || self.max_total_archive_bytes > 0
    }

    /// Path of the current file: `<folder>/<name><extension>`.
    pub(crate) fn current_path(&self) -> PathBuf {
        self.folder.join(format!("{}{}", self.name, self.extension))
    }

    /// Glob matching every archive this configuration can produce.
    pub(crate) fn archive_glob(&self, template: &NameTemplate) -> String {
        self.folder
            .join(template.to_glob(&self.name, &self.extension))
            .to_string_lossy()
            .into_owned()
    }

    /// Checks the folder, time format, and archive template, returning the
    /// compiled template. Called whenever the configuration is applied.
    pub(crate) fn validate(&self) -> Result<NameTemplate> {
        match fs::metadata(&self.folder) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(Error::config(format!(
                    "not a directory: {}",
                    self.folder.display()
                )))
            }
            Err(_) => {
                return Err(Error::config(format!(
                    "folder does not exist: {}",
                    self.folder.display()
                )))
            }
        }

        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::config(format!(
                "invalid time format '{}'",
                self.time_format
            )));
        }

        NameTemplate::parse(&self.archive_template)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("folder", &self.folder)
            .field("name", &self.name)
            .field("extension", &self.extension)
            .field("time_format", &self.time_format)
            .field("max_size", &self.max_size)
            .field("archive_template", &self.archive_template)
            .field("max_archives", &self.max_archives)
            .field("max_total_archive_bytes", &self.max_total_archive_bytes)
            .field("compression", &self.compression.is_some())
            .field("schedule", &self.schedule.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.extension(), ".log");
        assert_eq!(config.max_size(), 15 * constants::MIB);
        assert_eq!(config.archive_template(), "{time}-{name}{extension}");
        assert_eq!(config.max_archives(), 0);
        assert!(!config.retention_enabled());
        assert!(!config.name().is_empty());
    }

    #[test]
    fn test_name_is_sanitized() {
        let config = Config::new().with_name("My Cool App");
        assert_eq!(config.name(), "my-cool-app");

        // Empty names keep the previous value.
        let config = config.with_name("   ");
        assert_eq!(config.name(), "my-cool-app");
    }

    #[test]
    fn test_extension_gets_leading_dot() {
        assert_eq!(Config::new().with_extension("txt").extension(), ".txt");
        assert_eq!(Config::new().with_extension(".txt").extension(), ".txt");
        assert_eq!(Config::new().with_extension("").extension(), "");
    }

    #[test]
    fn test_current_path_layout() {
        let config = Config::new().with_folder("/var/log").with_name("app");
        assert_eq!(config.current_path(), PathBuf::from("/var/log/app.log"));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let dir = TempDir::new().unwrap();
        assert!(Config::new().with_folder(dir.path()).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_folder() {
        let err = Config::new()
            .with_folder("/lorem-ipsum-jada-jada")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_time_format() {
        let dir = TempDir::new().unwrap();
        let err = Config::new()
            .with_folder(dir.path())
            .with_time_format("%Q")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_template() {
        let dir = TempDir::new().unwrap();
        let err = Config::new()
            .with_folder(dir.path())
            .with_archive_template("{bogus}")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn test_with_gzip_sets_compression() {
        let config = Config::new().with_gzip();
        assert!(config.compression().is_some());
        assert_eq!(config.compression().unwrap().suffix(), ".gz");
    }
}
