//! Request body containers.

/// A request body being filled by the parser.
///
/// The parser only relies on [`update`](Body::update) and
/// [`is_saturated`](Body::is_saturated); new variants can be added without
/// touching it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    /// Accumulates up to an expected number of bytes in memory.
    Buffered {
        /// Total size the body will reach, from `Content-Length`.
        expected: usize,
        /// Bytes consumed so far.
        data: Vec<u8>,
    },
}

impl Body {
    /// A buffered body expecting exactly `expected` bytes.
    pub fn buffered(expected: usize) -> Body {
        Body::Buffered {
            expected,
            data: Vec::with_capacity(expected),
        }
    }

    /// Consumes bytes from `chunk`, returning how many were taken.
    ///
    /// Never takes more than the body still expects; leftover bytes belong
    /// to the next pipelined request.
    pub fn update(&mut self, chunk: &[u8]) -> usize {
        match self {
            Body::Buffered { expected, data } => {
                let want = *expected - data.len();
                let take = want.min(chunk.len());
                data.extend_from_slice(&chunk[..take]);
                take
            }
        }
    }

    /// Whether the body has consumed everything it expects.
    pub fn is_saturated(&self) -> bool {
        match self {
            Body::Buffered { expected, data } => data.len() == *expected,
        }
    }

    /// The buffered bytes, for variants that hold them in memory.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Buffered { data, .. } => Some(data),
        }
    }
}
