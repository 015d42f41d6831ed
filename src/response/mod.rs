//! The streaming response writer.
//!
//! A response advances through four states: status line, headers, body,
//! finished. Headers written before the status line are enqueued and
//! flushed right after it. The transfer encoding is decided lazily when
//! the body phase starts: a known size with no body transforms gets a
//! `Content-Length`, anything else gets chunked framing. Transform stages
//! and observer taps let middleware reshape or snapshot the body without
//! the handler knowing.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Error;
use crate::headers::SetCookie;
use crate::proto::date;
use crate::status::StatusCode;
use crate::version::Version;
use crate::Result;

pub(crate) mod encode;
pub mod transform;

pub use self::transform::{BodyTransform, DeflateTransform, GzipTransform, TeeTransform};

use self::encode::Encoder;

/// The boxed write half a response borrows from its connection.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

type StatusTap = Box<dyn FnMut(StatusCode) + Send>;
type HeaderTap = Box<dyn FnMut(&str, &str) + Send>;

const FILE_CHUNK: usize = 8192;

/// Where the writer currently is; transitions are strictly monotonic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteState {
    /// Nothing sent yet; the status line must come first.
    WritingStatus,
    /// Status line sent; headers may be written.
    WritingHeaders,
    /// Header section terminated; body bytes may be written.
    WritingBody,
    /// The response is complete.
    Finished,
}

/// Whether the connection should be kept open after this response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionPreference {
    /// `Connection: keep-alive` (the default).
    KeepAlive,
    /// `Connection: close`.
    Close,
}

impl ConnectionPreference {
    fn as_str(&self) -> &'static str {
        match *self {
            ConnectionPreference::KeepAlive => "keep-alive",
            ConnectionPreference::Close => "close",
        }
    }
}

/// Per-response settings the connection handler decides.
#[derive(Clone, Debug)]
pub struct ResponseOptions {
    /// Suppress body bytes (HEAD) while keeping all headers.
    pub exclude_body: bool,
    /// The `Server` header value.
    pub server: String,
    /// Initial connection preference.
    pub connection: ConnectionPreference,
}

impl Default for ResponseOptions {
    fn default() -> ResponseOptions {
        ResponseOptions {
            exclude_body: false,
            server: default_server_header(),
            connection: ConnectionPreference::KeepAlive,
        }
    }
}

/// The default `Server` header: crate version plus host OS.
pub fn default_server_header() -> String {
    format!(
        "wicket/{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

/// A renderable template, kept behind a trait so engines stay external.
pub trait Template {
    /// Renders the template against a JSON data model.
    fn render(
        &self,
        data: &serde_json::Value,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// An in-progress HTTP response bound to one request.
pub struct Response {
    io: BoxedWriter,
    state: WriteState,
    enqueued: Vec<(String, String)>,
    body_transforms: Vec<Box<dyn BodyTransform>>,
    raw_transforms: Vec<Box<dyn BodyTransform>>,
    body_size: Option<u64>,
    connection: ConnectionPreference,
    transfer_encodings: Vec<String>,
    content_encodings: Vec<String>,
    exclude_body: bool,
    status: Option<StatusCode>,
    status_taps: Vec<StatusTap>,
    header_taps: Vec<HeaderTap>,
    encoder: Option<Encoder>,
    server: String,
}

impl Response {
    /// Creates a response over a borrowed write half.
    pub fn new(io: BoxedWriter, options: ResponseOptions) -> Response {
        Response {
            io,
            state: WriteState::WritingStatus,
            enqueued: Vec::new(),
            body_transforms: Vec::new(),
            raw_transforms: Vec::new(),
            body_size: None,
            connection: options.connection,
            transfer_encodings: Vec::new(),
            content_encodings: Vec::new(),
            exclude_body: options.exclude_body,
            status: None,
            status_taps: Vec::new(),
            header_taps: Vec::new(),
            encoder: None,
            server: options.server,
        }
    }

    /// The writer's current state.
    pub fn state(&self) -> WriteState {
        self.state
    }

    /// The status code already emitted, if any.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status
    }

    /// Whether the body is being suppressed for a HEAD request.
    pub fn excludes_body(&self) -> bool {
        self.exclude_body
    }

    /// Suppresses (or re-enables) body bytes; headers are unaffected.
    pub fn set_exclude_body(&mut self, exclude: bool) {
        self.exclude_body = exclude;
    }

    /// Declares the exact body size, enabling fixed-length transmission.
    pub fn set_body_size(&mut self, size: u64) {
        self.body_size = Some(size);
    }

    /// The declared body size, if any.
    pub fn body_size(&self) -> Option<u64> {
        self.body_size
    }

    /// Sets the connection preference echoed in the `Connection` header.
    pub fn set_connection(&mut self, preference: ConnectionPreference) {
        self.connection = preference;
    }

    /// The current connection preference.
    pub fn connection(&self) -> ConnectionPreference {
        self.connection
    }

    /// Pushes a body transform; the newest stage sees caller bytes first.
    pub fn push_body_transform(&mut self, stage: Box<dyn BodyTransform>) {
        self.body_transforms.push(stage);
    }

    /// Pushes a raw transform, sitting between framing and the socket.
    pub fn push_raw_transform(&mut self, stage: Box<dyn BodyTransform>) {
        self.raw_transforms.push(stage);
    }

    /// Records a content-coding token for the `Content-Encoding` header.
    pub fn add_content_encoding(&mut self, token: impl Into<String>) {
        self.content_encodings.push(token.into());
    }

    /// Registers an observer for the emitted status code.
    pub fn on_status(&mut self, tap: impl FnMut(StatusCode) + Send + 'static) {
        self.status_taps.push(Box::new(tap));
    }

    /// Registers an observer for each header as it is written.
    pub fn on_header(&mut self, tap: impl FnMut(&str, &str) + Send + 'static) {
        self.header_taps.push(Box::new(tap));
    }

    /// Writes the status line with the canonical reason phrase.
    pub async fn write_status(&mut self, status: StatusCode) -> Result<()> {
        self.write_status_phrase(status, None).await
    }

    /// Writes the status line, overriding the reason phrase.
    ///
    /// A code without a canonical phrase must supply one; writing a second
    /// status line is a state violation.
    pub async fn write_status_phrase(
        &mut self,
        status: StatusCode,
        phrase: Option<&str>,
    ) -> Result<()> {
        if self.state != WriteState::WritingStatus {
            return Err(Error::new_user_state());
        }
        let phrase = match phrase.or_else(|| status.canonical_reason()) {
            Some(phrase) => phrase,
            None => return Err(Error::new_user_unknown_status()),
        };
        let mut line = Vec::with_capacity(64);
        line.extend_from_slice(Version::WIRE.as_bytes());
        line.push(b' ');
        let mut digits = itoa::Buffer::new();
        line.extend_from_slice(digits.format(status.as_u16()).as_bytes());
        line.push(b' ');
        line.extend_from_slice(phrase.as_bytes());
        line.extend_from_slice(b"\r\n");
        self.io.write_all(&line).await.map_err(Error::new_io)?;
        self.status = Some(status);
        self.state = WriteState::WritingHeaders;
        for tap in &mut self.status_taps {
            tap(status);
        }
        let enqueued = std::mem::take(&mut self.enqueued);
        for (name, value) in enqueued {
            self.emit_header(&name, &value).await?;
        }
        Ok(())
    }

    /// Writes one header.
    ///
    /// Before the status line the header is enqueued and flushed with it;
    /// after the header section closes this is a state violation.
    pub async fn write_header(&mut self, name: &str, value: &str) -> Result<()> {
        match self.state {
            WriteState::WritingStatus => {
                self.enqueued.push((name.to_owned(), value.to_owned()));
                Ok(())
            }
            WriteState::WritingHeaders => self.emit_header(name, value).await,
            _ => Err(Error::new_user_state()),
        }
    }

    /// Encodes and writes a `Set-Cookie` header.
    pub async fn set_cookie(&mut self, cookie: &SetCookie) -> Result<()> {
        self.write_header("Set-Cookie", &cookie.encode()).await
    }

    async fn emit_header(&mut self, name: &str, value: &str) -> Result<()> {
        let mut line = Vec::with_capacity(name.len() + value.len() + 4);
        line.extend_from_slice(name.as_bytes());
        line.extend_from_slice(b": ");
        line.extend_from_slice(value.as_bytes());
        line.extend_from_slice(b"\r\n");
        self.io.write_all(&line).await.map_err(Error::new_io)?;
        for tap in &mut self.header_taps {
            tap(name, value);
        }
        Ok(())
    }

    /// Closes the header section and picks the transfer encoding: chunked
    /// when the size is unknown or any body transform is attached, fixed
    /// length otherwise. Also writes the default headers.
    async fn begin_body(&mut self) -> Result<()> {
        match self.state {
            WriteState::WritingBody => return Ok(()),
            WriteState::WritingHeaders => {}
            _ => return Err(Error::new_user_state()),
        }
        let encoder = match self.body_size {
            Some(size) if self.body_transforms.is_empty() => Encoder::length(size),
            _ => Encoder::chunked(),
        };
        if encoder.is_chunked() {
            self.transfer_encodings.push("chunked".to_owned());
        }
        let date = date::header_value();
        let server = self.server.clone();
        let connection = self.connection.as_str();
        self.emit_header("Date", &date).await?;
        self.emit_header("Server", &server).await?;
        self.emit_header("Connection", connection).await?;
        if !self.content_encodings.is_empty() {
            let tokens = self.content_encodings.join(", ");
            self.emit_header("Content-Encoding", &tokens).await?;
        }
        if encoder.is_chunked() {
            let tokens = self.transfer_encodings.join(", ");
            self.emit_header("Transfer-Encoding", &tokens).await?;
        } else {
            let mut digits = itoa::Buffer::new();
            let size = self.body_size.unwrap_or(0);
            let value = digits.format(size).to_owned();
            self.emit_header("Content-Length", &value).await?;
        }
        self.io.write_all(b"\r\n").await.map_err(Error::new_io)?;
        self.encoder = Some(encoder);
        self.state = WriteState::WritingBody;
        Ok(())
    }

    /// Writes body bytes through the transform stack and the framer.
    ///
    /// The first write closes the header section. For HEAD responses the
    /// bytes are accepted and dropped.
    pub async fn write_body(&mut self, chunk: &[u8]) -> Result<()> {
        self.begin_body().await?;
        if self.exclude_body || chunk.is_empty() {
            return Ok(());
        }
        let mut data = chunk.to_vec();
        // The stage pushed last is outermost: caller bytes flow newest to
        // oldest before reaching the framer.
        for stage in self.body_transforms.iter_mut().rev() {
            let mut out = Vec::new();
            stage.update(&data, &mut out)?;
            data = out;
            if data.is_empty() {
                // A buffering stage held everything; nothing to frame yet,
                // and a zero-length chunk would end the stream early.
                return Ok(());
            }
        }
        let mut framed = Vec::with_capacity(data.len() + 16);
        self.encoder
            .as_mut()
            .ok_or_else(Error::new_user_state)?
            .encode(&data, &mut framed)?;
        let framed = self.apply_raw(framed)?;
        self.io.write_all(&framed).await.map_err(Error::new_io)
    }

    /// Ends the body: flushes every transform stage, emits the final
    /// framing, and flushes the transport. The response is then finished.
    pub async fn end(&mut self) -> Result<()> {
        self.begin_body().await?;
        let mut wire = Vec::new();
        if !self.exclude_body {
            let mut carry: Vec<u8> = Vec::new();
            for idx in (0..self.body_transforms.len()).rev() {
                let mut out = Vec::new();
                if !carry.is_empty() {
                    self.body_transforms[idx].update(&carry, &mut out)?;
                }
                self.body_transforms[idx].finish(&mut out)?;
                carry = out;
            }
            let encoder = self.encoder.as_mut().ok_or_else(Error::new_user_state)?;
            if !carry.is_empty() {
                encoder.encode(&carry, &mut wire)?;
            }
            encoder.end(&mut wire)?;
            for idx in (0..self.raw_transforms.len()).rev() {
                let mut out = Vec::new();
                if !wire.is_empty() {
                    self.raw_transforms[idx].update(&wire, &mut out)?;
                }
                self.raw_transforms[idx].finish(&mut out)?;
                wire = out;
            }
        }
        if !wire.is_empty() {
            self.io.write_all(&wire).await.map_err(Error::new_io)?;
        }
        self.io.flush().await.map_err(Error::new_io)?;
        self.state = WriteState::Finished;
        Ok(())
    }

    fn apply_raw(&mut self, framed: Vec<u8>) -> Result<Vec<u8>> {
        let mut data = framed;
        for stage in self.raw_transforms.iter_mut().rev() {
            let mut out = Vec::new();
            stage.update(&data, &mut out)?;
            data = out;
            if data.is_empty() {
                break;
            }
        }
        Ok(data)
    }

    /// Sends a plain-text body with `Content-Type: text/plain`.
    pub async fn text(&mut self, status: StatusCode, body: &str) -> Result<()> {
        self.buffer(status, "text/plain", body.as_bytes()).await
    }

    /// Sends an HTML body with `Content-Type: text/html`.
    pub async fn html(&mut self, status: StatusCode, body: &str) -> Result<()> {
        self.buffer(status, "text/html", body.as_bytes()).await
    }

    /// Serializes `value` as JSON and sends it as `application/json`.
    pub async fn json<T: Serialize>(&mut self, status: StatusCode, value: &T) -> Result<()> {
        let body = serde_json::to_vec(value).map_err(Error::new_user_render)?;
        self.buffer(status, "application/json", &body).await
    }

    /// Sends a complete in-memory body with the given media type.
    pub async fn buffer(&mut self, status: StatusCode, media_type: &str, body: &[u8]) -> Result<()> {
        self.set_body_size(body.len() as u64);
        self.write_status(status).await?;
        self.write_header("Content-Type", media_type).await?;
        self.write_body(body).await?;
        self.end().await
    }

    /// Streams a file, with its size as the body-size hint and a media
    /// type chosen from the extension.
    pub async fn file(&mut self, status: StatusCode, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = tokio::fs::File::open(path).await.map_err(Error::new_io)?;
        let meta = file.metadata().await.map_err(Error::new_io)?;
        self.set_body_size(meta.len());
        self.write_status(status).await?;
        self.write_header("Content-Type", crate::mime::from_path(path))
            .await?;
        if self.exclude_body {
            return self.end().await;
        }
        let mut chunk = vec![0u8; FILE_CHUNK];
        loop {
            let n = file.read(&mut chunk).await.map_err(Error::new_io)?;
            if n == 0 {
                break;
            }
            self.write_body(&chunk[..n]).await?;
        }
        self.end().await
    }

    /// Sends an empty redirect to `location`.
    pub async fn redirect(&mut self, status: StatusCode, location: &str) -> Result<()> {
        self.set_body_size(0);
        self.write_status(status).await?;
        self.write_header("Location", location).await?;
        self.end().await
    }

    /// Renders `template` against `data` and sends it as HTML.
    pub async fn render<T: Template>(
        &mut self,
        status: StatusCode,
        template: &T,
        data: &serde_json::Value,
    ) -> Result<()> {
        let body = template.render(data).map_err(Error::new_user_render)?;
        self.html(status, &body).await
    }

    /// Hands the write half back to the connection.
    pub fn into_io(self) -> BoxedWriter {
        self.io
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("state", &self.state)
            .field("status", &self.status)
            .field("body_size", &self.body_size)
            .field("connection", &self.connection)
            .field("exclude_body", &self.exclude_body)
            .field("body_transforms", &self.body_transforms.len())
            .field("raw_transforms", &self.raw_transforms.len())
            .finish()
    }
}
