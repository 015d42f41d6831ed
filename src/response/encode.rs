//! Transfer-encoding framers.

use std::io::Write;

use crate::error::Error;
use crate::Result;

/// Frames body bytes for the chosen transfer encoding.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Encoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    /// `Transfer-Encoding: chunked` framing.
    Chunked,
    /// A declared `Content-Length`; enforces the body is exactly that long.
    Length(u64),
}

impl Encoder {
    pub(crate) fn chunked() -> Encoder {
        Encoder {
            kind: Kind::Chunked,
        }
    }

    pub(crate) fn length(len: u64) -> Encoder {
        Encoder {
            kind: Kind::Length(len),
        }
    }

    pub(crate) fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked)
    }

    /// Frames one write. Chunked writes become `hex-len\r\n payload \r\n`;
    /// sized writes pass through while the remaining budget is debited.
    pub(crate) fn encode(&mut self, msg: &[u8], dst: &mut Vec<u8>) -> Result<()> {
        debug_assert!(!msg.is_empty(), "encode() called with empty buf");
        match self.kind {
            Kind::Chunked => {
                log::trace!("encoding chunked {}B", msg.len());
                write!(dst, "{:x}\r\n", msg.len()).expect("vec write cannot fail");
                dst.extend_from_slice(msg);
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
            Kind::Length(ref mut remaining) => {
                log::trace!("sized write, len = {}", msg.len());
                if msg.len() as u64 > *remaining {
                    return Err(Error::new_user_body_overflow());
                }
                *remaining -= msg.len() as u64;
                dst.extend_from_slice(msg);
                Ok(())
            }
        }
    }

    /// Ends the body. Chunked emits the last-chunk marker; sized framing
    /// verifies the declared length was met.
    pub(crate) fn end(&mut self, dst: &mut Vec<u8>) -> Result<()> {
        match self.kind {
            Kind::Chunked => {
                dst.extend_from_slice(b"0\r\n\r\n");
                Ok(())
            }
            Kind::Length(0) => Ok(()),
            Kind::Length(_) => Err(Error::new_user_body_underflow()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Encoder;

    #[test]
    fn chunked() {
        let mut encoder = Encoder::chunked();
        let mut dst = Vec::new();

        encoder.encode(b"foo bar", &mut dst).unwrap();
        assert_eq!(dst, b"7\r\nfoo bar\r\n");

        encoder.encode(b"baz quux herp", &mut dst).unwrap();
        assert_eq!(dst, b"7\r\nfoo bar\r\nd\r\nbaz quux herp\r\n");

        encoder.end(&mut dst).unwrap();
        assert_eq!(
            dst,
            b"7\r\nfoo bar\r\nd\r\nbaz quux herp\r\n0\r\n\r\n".as_ref()
        );
    }

    #[test]
    fn length() {
        let mut encoder = Encoder::length(8);
        let mut dst = Vec::new();

        encoder.encode(b"foo bar", &mut dst).unwrap();
        assert_eq!(dst, b"foo bar");
        assert!(encoder.end(&mut Vec::new()).unwrap_err().is_user());

        encoder.encode(b"b", &mut dst).unwrap();
        assert_eq!(dst, b"foo barb");
        encoder.end(&mut dst).unwrap();
        assert_eq!(dst, b"foo barb");
    }

    #[test]
    fn length_overflow_fails_fast() {
        let mut encoder = Encoder::length(4);
        let mut dst = Vec::new();
        let err = encoder.encode(b"too long", &mut dst).unwrap_err();
        assert!(err.is_user());
        assert!(dst.is_empty());
    }
}
