//! rotolog - size- and schedule-based log file rotation
//!
//! A [`Rotator`] sits beneath any logging frontend that can write to an
//! [`std::io::Write`] sink. It appends records to a current file, rotates
//! it into templated archives on size or schedule triggers, optionally
//! compresses them, and evicts the oldest past the retention limits.
//!
//! ```no_run
//! use rotolog::{constants::MIB, Config, Rotator};
//!
//! let rotator = Rotator::open(
//!     Config::new()
//!         .with_folder("/var/log/myapp")
//!         .with_name("myapp")
//!         .with_max_size(10 * MIB)
//!         .with_max_archives(5)
//!         .with_gzip(),
//! )?;
//!
//! rotator.write(b"hello\n")?;
//! rotator.close()?;
//! # Ok::<(), rotolog::Error>(())
//! ```

mod compress;
mod config;
mod registry;
mod rotator;
mod scan;
mod schedule;
mod template;

pub use compress::{Compression, CompressionSink, Gzip};
pub use config::Config;
pub use registry::Registry;
pub use rotator::Rotator;
pub use schedule::{DailyAt, Every, Schedule, ScheduleHandle};

pub use rotolog_core::{constants, Error, Result};
