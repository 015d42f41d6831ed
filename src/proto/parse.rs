//! The incremental request parser.
//!
//! A state machine over a byte accumulator. Bytes go in through
//! [`feed`](RequestParser::feed); lifecycle events come out in order
//! through the returned queue drain. The parser never reads the transport
//! itself, which keeps it trivially testable and lets one connection
//! pipeline requests by replaying leftover bytes.

use bytes::{Buf, BytesMut};

use crate::error::Error;
use crate::request::Request;
use crate::util::Queue;
use crate::version::Version;
use crate::Result;

/// Lifecycle events emitted while a request is parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseEvent {
    /// The request line was parsed; method, target and version are set.
    LineLoaded,
    /// The final header line was consumed; the header map is complete.
    HeadersLoaded,
    /// The installed body object reported saturation.
    BodyLoaded,
    /// The request is complete; the next one may begin after the response
    /// finishes.
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    AwaitingRequestLine,
    AwaitingHeaders,
    AwaitingBody,
    Finished,
}

/// Incremental parser for one connection's request stream.
#[derive(Debug)]
pub struct RequestParser {
    state: State,
    buf: BytesMut,
    events: Queue<ParseEvent>,
}

impl RequestParser {
    /// Creates a parser awaiting a request line.
    pub fn new() -> RequestParser {
        RequestParser {
            state: State::AwaitingRequestLine,
            buf: BytesMut::with_capacity(8192),
            events: Queue::new(),
        }
    }

    /// Whether the current request has fully arrived.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Whether the parser sits between requests with nothing buffered.
    ///
    /// An EOF here is a clean close; an EOF anywhere else means the peer
    /// quit mid-message.
    pub fn is_idle(&self) -> bool {
        self.state == State::AwaitingRequestLine && self.buf.is_empty()
    }

    /// Appends bytes and advances the state machine as far as possible.
    ///
    /// Returns the events produced by this call, in order. When a body is
    /// expected the parser stops right after `HeadersLoaded` so the caller
    /// can install a body object; resume with [`drive`](Self::drive).
    pub fn feed(&mut self, req: &mut Request, chunk: &[u8]) -> Result<Vec<ParseEvent>> {
        self.buf.extend_from_slice(chunk);
        self.drive(req)
    }

    /// Advances the state machine without new bytes.
    pub fn drive(&mut self, req: &mut Request) -> Result<Vec<ParseEvent>> {
        loop {
            match self.state {
                State::AwaitingRequestLine => {
                    let line = match self.take_line(Error::new_request_line)? {
                        Some(line) => line,
                        None => break,
                    };
                    self.parse_request_line(req, &line)?;
                    self.events.push(ParseEvent::LineLoaded);
                    self.state = State::AwaitingHeaders;
                }
                State::AwaitingHeaders => {
                    let line = match self.take_line(Error::new_header_syntax)? {
                        Some(line) => line,
                        None => break,
                    };
                    if line.is_empty() {
                        self.events.push(ParseEvent::HeadersLoaded);
                        if req.content_length()?.unwrap_or(0) > 0 {
                            // Give the driver a chance to install a body
                            // object before any body byte is consumed.
                            self.state = State::AwaitingBody;
                            break;
                        }
                        self.events.push(ParseEvent::Finished);
                        self.state = State::Finished;
                        break;
                    }
                    self.parse_header_line(req, &line)?;
                }
                State::AwaitingBody => {
                    if self.buf.is_empty() {
                        break;
                    }
                    let body = match req.body.as_mut() {
                        Some(body) => body,
                        None => return Err(Error::new_user_missing_body()),
                    };
                    let consumed = body.update(&self.buf);
                    self.buf.advance(consumed);
                    if body.is_saturated() {
                        self.events.push(ParseEvent::BodyLoaded);
                        self.events.push(ParseEvent::Finished);
                        self.state = State::Finished;
                    }
                    break;
                }
                State::Finished => break,
            }
        }
        Ok(self.events.drain().collect())
    }

    /// Resets the request and re-arms for the next pipelined request,
    /// replaying any leftover bytes already buffered.
    pub fn next(&mut self, req: &mut Request) -> Result<Vec<ParseEvent>> {
        req.reset();
        self.state = State::AwaitingRequestLine;
        self.drive(req)
    }

    fn take_line(&mut self, err: fn() -> Error) -> Result<Option<String>> {
        let at = match self.buf.windows(2).position(|w| w == b"\r\n") {
            Some(at) => at,
            None => return Ok(None),
        };
        let line = self.buf.split_to(at);
        self.buf.advance(2);
        match std::str::from_utf8(&line) {
            Ok(s) => Ok(Some(s.to_owned())),
            Err(_) => Err(err()),
        }
    }

    fn parse_request_line(&mut self, req: &mut Request, line: &str) -> Result<()> {
        let mut tokens = line.split_whitespace();
        let (method, target, version) = match (
            tokens.next(),
            tokens.next(),
            tokens.next(),
            tokens.next(),
        ) {
            (Some(m), Some(t), Some(v), None) => (m, t, v),
            _ => return Err(Error::new_request_line()),
        };
        req.method = method.parse().map_err(|_| Error::new_request_line())?;
        if version != Version::WIRE {
            return Err(Error::new_version(version));
        }
        req.version = Version::Http11;
        req.uri = crate::uri::Uri::parse(target)?;
        req.target = target.to_owned();
        Ok(())
    }

    fn parse_header_line(&self, req: &mut Request, line: &str) -> Result<()> {
        let colon = line.find(':').ok_or_else(Error::new_header_syntax)?;
        let (name, value) = line.split_at(colon);
        let name = name.trim();
        // The value starts after the first colon only; embedded colons
        // belong to the value.
        let value = value[1..].trim();
        if name.is_empty() || value.is_empty() {
            return Err(Error::new_header_syntax());
        }
        req.headers.append(name, value);
        Ok(())
    }
}

impl Default for RequestParser {
    fn default() -> RequestParser {
        RequestParser::new()
    }
}
