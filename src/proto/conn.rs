//! The per-connection driver.
//!
//! One task owns one transport. Bytes are piped into the request parser;
//! when a request completes, the write half is lent to a fresh response
//! and the router chain runs; afterwards the parser is re-armed so
//! pipelined requests on the same connection proceed in order. Parse and
//! version errors are answered on the wire before the transport goes
//! down; everything else just tears it down.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf};

use crate::body::Body;
use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::{
    BoxedWriter, ConnectionPreference, Response, ResponseOptions, WriteState,
};
use crate::router::Router;
use crate::status::StatusCode;
use crate::Result;

use super::parse::{ParseEvent, RequestParser};

const READ_CHUNK: usize = 8192;

fn family(peer: &SocketAddr) -> &'static str {
    if peer.is_ipv4() {
        "ipv4"
    } else {
        "ipv6"
    }
}

/// Serves one connection until it closes.
///
/// `server` is the `Server` header value stamped on every response. The
/// returned error is what tore the connection down; a clean close (EOF
/// between requests) is `Ok`.
pub async fn serve_connection<T>(
    io: T,
    peer: SocketAddr,
    router: Arc<Router>,
    server: String,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut rd, wr) = tokio::io::split(io);
    let mut wr: BoxedWriter = Box::new(wr);
    let mut parser = RequestParser::new();
    let mut req = Request::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut events = Vec::new();

    loop {
        match read_request(&mut rd, &mut parser, &mut req, &mut buf, events, peer).await {
            Ok(true) => {}
            Ok(false) => {
                log::debug!("{} peer {}: connection closed cleanly", family(&peer), peer);
                return Ok(());
            }
            Err(err) => {
                if err.is_parse() || err.is_version() {
                    return answer_and_close(wr, &server, peer, err).await;
                }
                return fail_connection(wr, peer, err).await;
            }
        }
        log::debug!("{} peer {}: dispatching {}", family(&peer), peer, req);

        let options = ResponseOptions {
            exclude_body: req.method() == Method::Head,
            server: server.clone(),
            connection: requested_preference(&req),
        };
        let mut res = Response::new(wr, options);

        match router.handle(&mut req, &mut res).await {
            Ok(_) => {
                if res.state() == WriteState::WritingStatus {
                    // No route wrote anything; applications override this
                    // with a trailing any("/*") rule.
                    if let Err(err) = res.text(StatusCode::NOT_FOUND, "Not found").await {
                        return fail_connection(res.into_io(), peer, err).await;
                    }
                }
                if res.state() != WriteState::Finished {
                    log::error!(
                        "{} peer {}: handler left response unfinished",
                        family(&peer),
                        peer
                    );
                    return fail_connection(res.into_io(), peer, Error::new_user_state()).await;
                }
            }
            Err(err) => {
                if res.state() == WriteState::WritingStatus
                    && (err.is_parse() || err.is_version())
                {
                    if let Err(write_err) = respond_error(&mut res, &err).await {
                        return fail_connection(res.into_io(), peer, write_err).await;
                    }
                    let mut wr = res.into_io();
                    let _ = wr.shutdown().await;
                    log::debug!("{} peer {}: {}", family(&peer), peer, err);
                    return Err(err);
                }
                // Past the status line nothing can be rewritten.
                return fail_connection(res.into_io(), peer, err).await;
            }
        }

        let close = res.connection() == ConnectionPreference::Close;
        wr = res.into_io();
        if close {
            let _ = wr.shutdown().await;
            return Ok(());
        }
        events = match parser.next(&mut req) {
            Ok(events) => events,
            Err(err) if err.is_parse() || err.is_version() => {
                return answer_and_close(wr, &server, peer, err).await;
            }
            Err(err) => return fail_connection(wr, peer, err).await,
        };
    }
}

/// Writes the 400/505 diagnostic for a request that never made it to
/// dispatch, then closes the transport.
async fn answer_and_close(
    wr: BoxedWriter,
    server: &str,
    peer: SocketAddr,
    err: Error,
) -> Result<()> {
    let mut res = Response::new(
        wr,
        ResponseOptions {
            exclude_body: false,
            server: server.to_owned(),
            connection: ConnectionPreference::Close,
        },
    );
    if let Err(write_err) = respond_error(&mut res, &err).await {
        return fail_connection(res.into_io(), peer, write_err).await;
    }
    let mut wr = res.into_io();
    let _ = wr.shutdown().await;
    log::debug!("{} peer {}: {}", family(&peer), peer, err);
    Err(err)
}

/// Reads until the parser finishes one request.
///
/// `Ok(false)` is a clean EOF between requests. The connection driver is
/// the "external actor" that installs the body object once the headers
/// declare a non-zero `Content-Length`.
async fn read_request<T>(
    rd: &mut ReadHalf<T>,
    parser: &mut RequestParser,
    req: &mut Request,
    buf: &mut [u8],
    mut events: Vec<ParseEvent>,
    peer: SocketAddr,
) -> Result<bool>
where
    T: AsyncRead,
{
    loop {
        for event in &events {
            match event {
                ParseEvent::LineLoaded => {
                    log::trace!("{} peer {}: request line loaded", family(&peer), peer);
                }
                ParseEvent::HeadersLoaded => {
                    if req.body().is_none() {
                        if let Some(len) = req.content_length()? {
                            if len > 0 {
                                req.set_body(Body::buffered(len));
                            }
                        }
                    }
                }
                ParseEvent::BodyLoaded | ParseEvent::Finished => {}
            }
        }
        if parser.is_finished() {
            return Ok(true);
        }
        events = parser.drive(req)?;
        if !events.is_empty() {
            continue;
        }
        let n = rd.read(buf).await.map_err(Error::new_io)?;
        if n == 0 {
            return if parser.is_idle() {
                Ok(false)
            } else {
                Err(Error::new_incomplete())
            };
        }
        events = parser.feed(req, &buf[..n])?;
    }
}

fn requested_preference(req: &Request) -> ConnectionPreference {
    use crate::headers::typed::ConnectionOptions;
    match req.headers().typed_get::<ConnectionOptions>() {
        Ok(Some(options)) if options.0.contains("close") => ConnectionPreference::Close,
        _ => ConnectionPreference::KeepAlive,
    }
}

/// Answers a parse or version error on the wire: a short diagnostic page
/// with `Connection: close`.
async fn respond_error(res: &mut Response, err: &Error) -> Result<()> {
    res.set_connection(ConnectionPreference::Close);
    res.set_exclude_body(false);
    let (status, detail) = if err.is_version() {
        (
            StatusCode::HTTP_VERSION_NOT_SUPPORTED,
            format!(
                "unsupported version: {}",
                err.version_token().unwrap_or("<missing>")
            ),
        )
    } else {
        (StatusCode::BAD_REQUEST, err.message().to_string())
    };
    let page = format!(
        "<html><head><title>{}</title></head><body><h1>{}</h1><p>{}</p></body></html>",
        status, status, detail
    );
    res.html(status, &page).await
}

/// Logs the failure with the peer identity and destroys the transport.
async fn fail_connection(mut wr: BoxedWriter, peer: SocketAddr, err: Error) -> Result<()> {
    if err.is_io() || err.is_incomplete_message() || err.is_parse() || err.is_version() {
        log::debug!("{} peer {}: {}", family(&peer), peer, err);
    } else {
        log::error!("{} peer {}: {}", family(&peer), peer, err);
    }
    let _ = wr.shutdown().await;
    Err(err)
}
