//! The rotation engine

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use chrono::Local;
use parking_lot::Mutex;
use tracing::{debug, warn};

use rotolog_core::{Error, Result};

use crate::compress::Compression;
use crate::config::Config;
use crate::registry::Registry;
use crate::scan::{self, ArchiveEntry, ArchiveSet};
use crate::schedule::ScheduleHandle;
use crate::template::NameTemplate;

/// A shared log file rotator.
///
/// A rotator owns one current file, appends bytes to it, and rotates it
/// into a named archive when a write would push it past the size limit or
/// when a configured schedule fires; [`Rotator::rotate`] forces one.
/// Retention limits evict the oldest archives by count and total size.
///
/// Instances are shared per logical name: [`Rotator::open`] calls with the
/// same configured name return the same instance, with the latest
/// configuration applied. All operations take `&self` and serialize on an
/// internal lock, so one instance can be written from many threads.
///
/// A rotator must be shut down with [`Rotator::close`]; dropping the last
/// user handle leaves the instance registered and its schedule running.
pub struct Rotator {
    weak: Weak<Rotator>,
    registry: Arc<Registry>,
    /// Registry key; fixed at open even if a later configuration renames
    /// the managed files.
    name: String,
    inner: Mutex<Inner>,
}

struct Inner {
    config: Config,
    template: NameTemplate,
    current_path: PathBuf,
    file: Option<File>,
    current_size: u64,
    archives: ArchiveSet,
    timer: Option<ScheduleHandle>,
    closed: bool,
}

impl Rotator {
    /// Opens the rotator registered under the configuration's logical
    /// name, creating it on first use. A later call with the same name
    /// returns the existing instance after applying the new configuration
    /// to it.
    pub fn open(config: Config) -> Result<Arc<Rotator>> {
        Self::open_with(Registry::global(), config)
    }

    /// Like [`Rotator::open`], but sharing through a caller-owned registry
    /// instead of the process-wide one.
    pub fn open_with(registry: Arc<Registry>, config: Config) -> Result<Arc<Rotator>> {
        loop {
            let candidate = Self::build(registry.clone(), config.clone())?;
            let (shared, inserted) = registry.get_or_insert(&candidate.name, &candidate);
            if inserted {
                debug!("Registered rotator '{}'", shared.name);
                shared.arm_schedule();
                return Ok(shared);
            }
            // Lost the slot to an existing instance: apply this call's
            // configuration to it and let the candidate's freshly opened
            // file handle drop.
            debug!("Sharing existing rotator '{}'", candidate.name);
            match shared.reconfigure(config.clone()) {
                Ok(()) => return Ok(shared),
                // The occupant closed before we could update it and has
                // left the registry; take the slot with a new candidate.
                Err(Error::Closed) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn build(registry: Arc<Registry>, config: Config) -> Result<Arc<Rotator>> {
        let template = config.validate()?;
        let current_path = config.current_path();

        let archives = if config.retention_enabled() {
            let pattern = config.archive_glob(&template);
            scan::scan_archives(&pattern, &current_path)?
        } else {
            ArchiveSet::default()
        };

        let (file, current_size) = open_append(&current_path).map_err(|e| {
            Error::config(format!("cannot open {}: {}", current_path.display(), e))
        })?;
        debug!(
            "Opened {} at {} bytes, {} archives",
            current_path.display(),
            current_size,
            archives.len()
        );

        Ok(Arc::new_cyclic(|weak| Rotator {
            weak: weak.clone(),
            registry,
            name: config.name().to_string(),
            inner: Mutex::new(Inner {
                config,
                template,
                current_path,
                file: Some(file),
                current_size,
                archives,
                timer: None,
                closed: false,
            }),
        }))
    }

    /// Appends `buf` to the current file and returns the count written,
    /// rotating first if the write would push the file past the size
    /// limit. A write that exactly reaches the limit does not rotate; the
    /// next one does.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(Error::Closed);
        }

        let max_size = inner.config.max_size();
        if max_size > 0 && inner.current_size.saturating_add(buf.len() as u64) > max_size {
            self.rotate_locked(&mut inner)?;
        }

        let file = inner
            .file
            .as_mut()
            .ok_or_else(|| Error::rotate("no open current file"))?;
        let written = file.write(buf).map_err(Error::Write)?;
        inner.current_size += written as u64;
        Ok(written)
    }

    /// Forces a rotation of the current file, regardless of its size.
    ///
    /// On failure the rotator may be left with no open current file;
    /// writes then fail until another `rotate` or [`Rotator::close`]
    /// recovers it.
    pub fn rotate(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(Error::Closed);
        }
        self.rotate_locked(&mut inner)
    }

    /// Archives the current file and shuts the rotator down: the instance
    /// leaves the registry and its schedule stops. Every later operation
    /// returns [`Error::Closed`].
    ///
    /// If the final archiving step fails the rotator stays open (in the
    /// degraded no-current-file state) and close can be retried.
    pub fn close(&self) -> Result<()> {
        let timer = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(Error::Closed);
            }
            self.archive_locked(&mut inner)?;
            inner.closed = true;
            inner.timer.take()
        };

        if let Some(me) = self.weak.upgrade() {
            self.registry.remove_if(&self.name, &me);
        }
        // Joining the trigger thread under the instance lock could
        // deadlock against an in-flight tick, so it happens out here.
        if let Some(timer) = timer {
            timer.stop();
        }
        debug!("Closed rotator '{}'", self.name);
        Ok(())
    }

    /// Applies a new configuration to a live rotator.
    ///
    /// Validation and the archive rescan run before anything changes, so a
    /// rejected configuration leaves the previous one fully in effect. The
    /// schedule is re-armed from the new configuration; if it carries
    /// none, periodic rotation stops.
    pub fn reconfigure(&self, config: Config) -> Result<()> {
        let template = config.validate()?;
        let current_path = config.current_path();

        let old_timer = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(Error::Closed);
            }

            let archives = if config.retention_enabled() {
                let pattern = config.archive_glob(&template);
                scan::scan_archives(&pattern, &current_path)?
            } else {
                ArchiveSet::default()
            };

            // Reopen unconditionally; the stat resynchronizes the counter
            // and the old handle drops, whether or not the path changed.
            let (file, current_size) = open_append(&current_path).map_err(|e| {
                Error::config(format!("cannot open {}: {}", current_path.display(), e))
            })?;
            inner.file = Some(file);
            inner.current_size = current_size;

            inner.config = config;
            inner.template = template;
            inner.current_path = current_path;
            inner.archives = archives;

            let old_timer = inner.timer.take();
            self.arm_schedule_locked(&mut inner);
            old_timer
        };

        if let Some(timer) = old_timer {
            timer.stop();
        }
        debug!("Reconfigured rotator '{}'", self.name);
        Ok(())
    }

    /// The logical name this rotator is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the file currently receiving writes.
    pub fn current_path(&self) -> PathBuf {
        self.inner.lock().current_path.clone()
    }

    /// Bytes accumulated in the current file.
    pub fn current_size(&self) -> u64 {
        self.inner.lock().current_size
    }

    /// Configured size threshold, zero when size rotation is disabled.
    pub fn max_size(&self) -> u64 {
        self.inner.lock().config.max_size()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    fn arm_schedule(&self) {
        let mut inner = self.inner.lock();
        // A concurrent close may have won between registration and here.
        if inner.closed {
            return;
        }
        self.arm_schedule_locked(&mut inner);
    }

    fn arm_schedule_locked(&self, inner: &mut Inner) {
        // A concurrent reconfigure may have armed one already, from the
        // newest applied configuration; keep it.
        if inner.timer.is_some() {
            return;
        }
        let Some(schedule) = inner.config.schedule().cloned() else {
            return;
        };
        let weak = self.weak.clone();
        inner.timer = Some(schedule.start(Box::new(move || {
            let Some(rotator) = weak.upgrade() else {
                return;
            };
            match rotator.rotate() {
                Ok(()) => {}
                // Raced with close; the trigger is about to be stopped.
                Err(Error::Closed) => {}
                Err(e) => warn!("Scheduled rotation failed: {}", e),
            }
        })));
    }

    /// Rotation while holding the instance lock: archive the current file,
    /// then reopen the canonical path with a freshly stat'ed counter.
    fn rotate_locked(&self, inner: &mut Inner) -> Result<()> {
        self.archive_locked(inner)?;

        // The reopened path may already hold bytes, e.g. one left behind
        // by a previous process, so the counter comes from a stat.
        match open_append(&inner.current_path) {
            Ok((file, current_size)) => {
                inner.file = Some(file);
                inner.current_size = current_size;
                Ok(())
            }
            Err(e) => {
                inner.file = None;
                inner.current_size = 0;
                Err(Error::rotate(format!(
                    "cannot reopen {}: {}",
                    inner.current_path.display(),
                    e
                )))
            }
        }
    }

    /// Close, rename, optionally compress, record, and evict. Shared by
    /// rotation and close; neither holds an open current file afterwards.
    fn archive_locked(&self, inner: &mut Inner) -> Result<()> {
        inner.file = None;
        if !inner.current_path.exists() {
            // Degraded after an earlier failed rotation; nothing on disk
            // to archive.
            debug!(
                "No current file at {}, skipping archive",
                inner.current_path.display()
            );
            return Ok(());
        }

        debug!("Rotating {}", inner.current_path.display());
        let time = Local::now().format(inner.config.time_format()).to_string();
        let archive_name = inner.template.render(
            inner.config.name(),
            inner.config.extension(),
            &time,
        );
        let archive_path = inner.config.folder().join(archive_name);

        fs::rename(&inner.current_path, &archive_path).map_err(|e| {
            Error::rotate(format!(
                "cannot move {} to {}: {}",
                inner.current_path.display(),
                archive_path.display(),
                e
            ))
        })?;

        let final_path = match inner.config.compression().cloned() {
            Some(compression) => {
                compress_archive(compression.as_ref(), &archive_path).map_err(|e| {
                    Error::rotate(format!(
                        "cannot compress {}: {}",
                        archive_path.display(),
                        e
                    ))
                })?
            }
            None => archive_path,
        };

        let meta = fs::metadata(&final_path).map_err(|e| {
            Error::rotate(format!("cannot stat {}: {}", final_path.display(), e))
        })?;
        let modified = meta.modified().map_err(|e| {
            Error::rotate(format!("no mtime for {}: {}", final_path.display(), e))
        })?;
        debug!("Archived {} ({} bytes)", final_path.display(), meta.len());
        inner.archives.push(ArchiveEntry {
            path: final_path,
            size: meta.len(),
            modified,
        });

        self.evict_locked(inner)
    }

    /// Deletes oldest archives until both retention limits hold. A loop,
    /// not a single pass: a burst or a reconfiguration can leave count and
    /// total size violated at once.
    fn evict_locked(&self, inner: &mut Inner) -> Result<()> {
        let max_count = inner.config.max_archives();
        let max_bytes = inner.config.max_total_archive_bytes();
        loop {
            let over_count = max_count > 0 && inner.archives.len() > max_count;
            let over_bytes = max_bytes > 0 && inner.archives.total_bytes() > max_bytes;
            if !over_count && !over_bytes {
                return Ok(());
            }
            let Some(oldest) = inner.archives.pop_oldest() else {
                return Ok(());
            };
            match fs::remove_file(&oldest.path) {
                Ok(()) => debug!("Evicted {}", oldest.path.display()),
                // Already gone is as good as evicted.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!("Archive {} vanished before eviction", oldest.path.display())
                }
                Err(e) => {
                    return Err(Error::rotate(format!(
                        "cannot evict {}: {}",
                        oldest.path.display(),
                        e
                    )))
                }
            }
        }
    }
}

impl fmt::Debug for Rotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Rotator")
            .field("name", &self.name)
            .field("current_path", &inner.current_path)
            .field("current_size", &inner.current_size)
            .field("archives", &inner.archives.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

impl io::Write for &Rotator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Rotator::write(self, buf).map_err(io::Error::other)
    }

    // Appends go straight to the file; flush only reports a closed sink.
    fn flush(&mut self) -> io::Result<()> {
        if self.is_closed() {
            return Err(io::Error::other(Error::Closed));
        }
        Ok(())
    }
}

impl io::Write for Rotator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Rotator::write(self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.is_closed() {
            return Err(io::Error::other(Error::Closed));
        }
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata()?.len();
    Ok((file, size))
}

/// Streams `path` through the codec into a sibling file carrying the
/// compression suffix, then removes the uncompressed original. A failure
/// leaves the original in place and may leave a partial compressed file.
fn compress_archive(compression: &dyn Compression, path: &Path) -> io::Result<PathBuf> {
    let compressed_path = append_suffix(path, compression.suffix());
    let mut source = File::open(path)?;
    let dest = File::create(&compressed_path)?;
    let mut sink = compression.wrap(Box::new(dest))?;
    io::copy(&mut source, &mut *sink)?;
    sink.finish()?;
    fs::remove_file(path)?;
    Ok(compressed_path)
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
