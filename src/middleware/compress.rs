//! Response compression negotiated from `Accept-Encoding`.

use crate::headers::typed::AcceptEncoding;
use crate::response::{DeflateTransform, GzipTransform};
use crate::router::Callback;

/// Installs a gzip or deflate body transform when the client accepts one.
///
/// gzip wins when both are acceptable. A malformed `Accept-Encoding` is
/// treated as "no preference" rather than failing the request. The
/// matching `Content-Encoding` token is recorded on the response; chunked
/// framing follows automatically since a transform is attached.
pub fn compress() -> Callback {
    Box::new(|_m, req, res| {
        Box::pin(async move {
            let accept = match req.headers().typed_get::<AcceptEncoding>() {
                Ok(Some(accept)) => accept,
                Ok(None) => return Ok(true),
                Err(_) => {
                    log::debug!("ignoring malformed accept-encoding");
                    return Ok(true);
                }
            };
            if accept.0.accepts("gzip") {
                res.push_body_transform(Box::new(GzipTransform::new()));
                res.add_content_encoding("gzip");
            } else if accept.0.accepts("deflate") {
                res.push_body_transform(Box::new(DeflateTransform::new()));
                res.add_content_encoding("deflate");
            }
            Ok(true)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::compress;
    use crate::method::Method;
    use crate::request::Request;
    use crate::response::{Response, ResponseOptions, WriteState};
    use crate::router::Router;
    use crate::status::StatusCode;
    use std::io::Read;
    use tokio::io::AsyncReadExt;

    async fn run(accept: Option<&str>) -> Vec<u8> {
        let mut router = Router::new();
        router.middleware(compress()).unwrap();
        router
            .get("/data", |_m, _req, res| {
                Box::pin(async move {
                    res.json(StatusCode::OK, &serde_json::json!([1, 2, 3])).await?;
                    Ok(false)
                })
            })
            .unwrap();

        let mut req = Request::new();
        req.method = Method::Get;
        req.uri = crate::uri::Uri::parse("/data").unwrap();
        if let Some(value) = accept {
            req.headers_mut().set("accept-encoding", value);
        }
        let (tx, mut rx) = tokio::io::duplex(64 * 1024);
        let mut res = Response::new(Box::new(tx), ResponseOptions::default());
        router.handle(&mut req, &mut res).await.unwrap();
        assert_eq!(res.state(), WriteState::Finished);
        drop(res);
        let mut wire = Vec::new();
        rx.read_to_end(&mut wire).await.unwrap();
        wire
    }

    fn dechunk(body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut rest = body;
        loop {
            let line_end = rest.windows(2).position(|w| w == b"\r\n").unwrap();
            let size = usize::from_str_radix(
                std::str::from_utf8(&rest[..line_end]).unwrap(),
                16,
            )
            .unwrap();
            rest = &rest[line_end + 2..];
            if size == 0 {
                break;
            }
            out.extend_from_slice(&rest[..size]);
            rest = &rest[size + 2..];
        }
        out
    }

    #[tokio::test]
    async fn gzip_body_decodes_to_the_original() {
        let wire = run(Some("gzip")).await;
        let text = String::from_utf8_lossy(&wire);
        assert!(text.contains("Content-Encoding: gzip\r\n"));
        assert!(text.contains("Transfer-Encoding: chunked\r\n"));
        let header_end = wire.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let compressed = dechunk(&wire[header_end..]);
        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(&compressed[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, b"[1,2,3]");
    }

    #[tokio::test]
    async fn no_accept_encoding_stays_identity() {
        let wire = run(None).await;
        let text = String::from_utf8_lossy(&wire);
        assert!(!text.contains("Content-Encoding"));
        assert!(text.contains("Content-Length: 7\r\n"));
    }

    #[tokio::test]
    async fn quality_parameters_still_negotiate() {
        let wire = run(Some("deflate;q=0.9")).await;
        let text = String::from_utf8_lossy(&wire);
        assert!(text.contains("Content-Encoding: deflate\r\n"));
    }
}
