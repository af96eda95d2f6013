//! Pluggable archive compression

use std::io::{self, Write};

use flate2::write::GzEncoder;
use rotolog_core::{Error, Result};

/// Strategy for compressing rotated archives.
///
/// Implementations wrap the destination file so the archive bytes stream
/// through the codec during rotation; no intermediate buffer is held.
pub trait Compression: Send + Sync {
    /// File name suffix appended to compressed archives, e.g. `.gz`.
    fn suffix(&self) -> &str;

    /// Wraps `sink` so bytes written to the returned writer come out
    /// compressed on `sink`.
    fn wrap(&self, sink: Box<dyn Write + Send>) -> io::Result<Box<dyn CompressionSink>>;
}

/// A compressing writer that must be finished to flush its trailer.
pub trait CompressionSink: Write + Send {
    /// Consumes the sink, writing any buffered trailer to the underlying
    /// destination.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

impl<W: Write + Send> CompressionSink for GzEncoder<W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        GzEncoder::finish(*self).map(|_| ())
    }
}

/// Gzip compression backed by flate2.
#[derive(Debug, Clone, Copy)]
pub struct Gzip {
    level: u32,
}

impl Gzip {
    /// Gzip at the default compression level.
    pub fn new() -> Self {
        Self { level: 6 }
    }

    /// Gzip at an explicit level, 0 (store) through 9 (best).
    pub fn with_level(level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::config(format!(
                "gzip level must be between 0 and 9, got {}",
                level
            )));
        }
        Ok(Self { level })
    }
}

impl Default for Gzip {
    fn default() -> Self {
        Self::new()
    }
}

impl Compression for Gzip {
    fn suffix(&self) -> &str {
        ".gz"
    }

    fn wrap(&self, sink: Box<dyn Write + Send>) -> io::Result<Box<dyn CompressionSink>> {
        Ok(Box::new(GzEncoder::new(
            sink,
            flate2::Compression::new(self.level),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs::File;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_gzip_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("payload.gz");

        let gzip = Gzip::new();
        let dest = File::create(&path).unwrap();
        let mut sink = gzip.wrap(Box::new(dest)).unwrap();
        sink.write_all(b"the quick brown fox").unwrap();
        sink.finish().unwrap();

        let mut decoder = GzDecoder::new(File::open(&path).unwrap());
        let mut restored = String::new();
        decoder.read_to_string(&mut restored).unwrap();
        assert_eq!(restored, "the quick brown fox");
    }

    #[test]
    fn test_gzip_level_bounds() {
        assert!(Gzip::with_level(0).is_ok());
        assert!(Gzip::with_level(9).is_ok());

        let err = Gzip::with_level(10).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_gzip_suffix() {
        assert_eq!(Gzip::new().suffix(), ".gz");
    }
}
