//! Body transform stages.
//!
//! A transform sits between the caller's body writes and the transfer
//! framer (or, for raw transforms, between the framer and the socket).
//! Stages may buffer: an `update` is allowed to emit nothing, with the
//! held bytes surfacing on a later `update` or at `finish`.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::error::Error;
use crate::Result;

/// An ordered stage that observes or rewrites body bytes.
pub trait BodyTransform: Send {
    /// Feeds a chunk through the stage, appending any output to `out`.
    fn update(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()>;

    /// Flushes whatever the stage still holds.
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<()>;
}

/// A gzip compression stage.
pub struct GzipTransform {
    inner: Option<GzEncoder<Vec<u8>>>,
}

impl GzipTransform {
    /// Creates a gzip stage at the default compression level.
    pub fn new() -> GzipTransform {
        GzipTransform {
            inner: Some(GzEncoder::new(Vec::new(), Compression::default())),
        }
    }
}

impl Default for GzipTransform {
    fn default() -> GzipTransform {
        GzipTransform::new()
    }
}

impl BodyTransform for GzipTransform {
    fn update(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let encoder = self.inner.as_mut().ok_or_else(Error::new_user_state)?;
        encoder
            .write_all(chunk)
            .map_err(Error::new_io)?;
        out.append(encoder.get_mut());
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let encoder = self.inner.take().ok_or_else(Error::new_user_state)?;
        let mut done = encoder.finish().map_err(Error::new_io)?;
        out.append(&mut done);
        Ok(())
    }
}

impl fmt::Debug for GzipTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GzipTransform").finish()
    }
}

/// A deflate (zlib) compression stage.
pub struct DeflateTransform {
    inner: Option<ZlibEncoder<Vec<u8>>>,
}

impl DeflateTransform {
    /// Creates a deflate stage at the default compression level.
    pub fn new() -> DeflateTransform {
        DeflateTransform {
            inner: Some(ZlibEncoder::new(Vec::new(), Compression::default())),
        }
    }
}

impl Default for DeflateTransform {
    fn default() -> DeflateTransform {
        DeflateTransform::new()
    }
}

impl BodyTransform for DeflateTransform {
    fn update(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let encoder = self.inner.as_mut().ok_or_else(Error::new_user_state)?;
        encoder
            .write_all(chunk)
            .map_err(Error::new_io)?;
        out.append(encoder.get_mut());
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let encoder = self.inner.take().ok_or_else(Error::new_user_state)?;
        let mut done = encoder.finish().map_err(Error::new_io)?;
        out.append(&mut done);
        Ok(())
    }
}

impl fmt::Debug for DeflateTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeflateTransform").finish()
    }
}

/// A passthrough stage that duplicates body bytes into a shared buffer.
///
/// The cache middleware installs one to snapshot what actually went over
/// the wire at its position in the stack; `on_finish` fires once when the
/// body completes.
pub struct TeeTransform {
    sink: Arc<Mutex<Vec<u8>>>,
    on_finish: Option<Box<dyn FnOnce() + Send>>,
}

impl TeeTransform {
    /// Creates a tee into `sink` with a completion callback.
    pub fn new(sink: Arc<Mutex<Vec<u8>>>, on_finish: impl FnOnce() + Send + 'static) -> TeeTransform {
        TeeTransform {
            sink,
            on_finish: Some(Box::new(on_finish)),
        }
    }
}

impl BodyTransform for TeeTransform {
    fn update(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        self.sink.lock().unwrap().extend_from_slice(chunk);
        out.extend_from_slice(chunk);
        Ok(())
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<()> {
        if let Some(on_finish) = self.on_finish.take() {
            on_finish();
        }
        Ok(())
    }
}

impl fmt::Debug for TeeTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeeTransform").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn gunzip(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        flate2::read::GzDecoder::new(bytes)
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn gzip_round_trips_across_chunks() {
        let mut stage = GzipTransform::new();
        let mut wire = Vec::new();
        stage.update(b"hello, ", &mut wire).unwrap();
        stage.update(b"world", &mut wire).unwrap();
        stage.finish(&mut wire).unwrap();
        assert_eq!(gunzip(&wire), b"hello, world");
    }

    #[test]
    fn deflate_round_trips() {
        let mut stage = DeflateTransform::new();
        let mut wire = Vec::new();
        stage.update(b"abcabcabc", &mut wire).unwrap();
        stage.finish(&mut wire).unwrap();
        let mut out = Vec::new();
        flate2::read::ZlibDecoder::new(&wire[..])
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, b"abcabcabc");
    }

    #[test]
    fn tee_copies_and_passes_through() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let fired = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&fired);
        let mut stage = TeeTransform::new(Arc::clone(&sink), move || {
            *flag.lock().unwrap() = true;
        });
        let mut out = Vec::new();
        stage.update(b"abc", &mut out).unwrap();
        stage.update(b"def", &mut out).unwrap();
        assert_eq!(out, b"abcdef");
        assert!(!*fired.lock().unwrap());
        stage.finish(&mut out).unwrap();
        assert_eq!(*sink.lock().unwrap(), b"abcdef");
        assert!(*fired.lock().unwrap());
    }

    #[test]
    fn finishing_twice_is_a_state_error() {
        let mut stage = GzipTransform::new();
        stage.finish(&mut Vec::new()).unwrap();
        assert!(stage.finish(&mut Vec::new()).unwrap_err().is_user());
    }
}
