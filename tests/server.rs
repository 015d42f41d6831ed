#![deny(rust_2018_idioms)]

//! Wire-level tests: raw request bytes in, raw response bytes out, one
//! connection task in between.

use std::collections::HashMap;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use wicket::middleware::compress;
use wicket::{serve_connection, Router, StatusCode};

fn peer() -> SocketAddr {
    "127.0.0.1:4711".parse().unwrap()
}

/// Feeds `input` to a freshly spawned connection, closes the client's
/// write side, and collects everything the server sent back.
async fn talk(router: Router, input: &[u8]) -> (Vec<u8>, wicket::Result<()>) {
    let _ = pretty_env_logger::try_init();
    let (client, server) = tokio::io::duplex(256 * 1024);
    let task = tokio::spawn(serve_connection(
        server,
        peer(),
        Arc::new(router),
        "wicket-test".to_owned(),
    ));
    let (mut rd, mut wr) = tokio::io::split(client);
    wr.write_all(input).await.unwrap();
    wr.shutdown().await.unwrap();
    let mut out = Vec::new();
    rd.read_to_end(&mut out).await.unwrap();
    (out, task.await.unwrap())
}

fn split_head(wire: &[u8]) -> (&[u8], &[u8]) {
    let at = wire
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("complete header section");
    (&wire[..at], &wire[at + 4..])
}

fn header_map(head: &[u8]) -> HashMap<String, String> {
    let text = std::str::from_utf8(head).unwrap();
    text.lines()
        .skip(1)
        .map(|line| {
            let at = line.find(':').unwrap();
            (
                line[..at].to_ascii_lowercase(),
                line[at + 1..].trim().to_owned(),
            )
        })
        .collect()
}

fn dechunk(mut body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let line_end = body.windows(2).position(|w| w == b"\r\n").unwrap();
        let size =
            usize::from_str_radix(std::str::from_utf8(&body[..line_end]).unwrap(), 16).unwrap();
        body = &body[line_end + 2..];
        if size == 0 {
            break;
        }
        out.extend_from_slice(&body[..size]);
        body = &body[size + 2..];
    }
    out
}

fn hello_router() -> Router {
    let mut router = Router::new();
    router
        .get("/hello", |_m, _req, res| {
            Box::pin(async move {
                res.text(StatusCode::OK, "ok").await?;
                Ok(false)
            })
        })
        .unwrap();
    router
}

#[tokio::test]
async fn fixed_length_get() {
    let (wire, result) = talk(hello_router(), b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n").await;
    result.unwrap();
    let (head, body) = split_head(&wire);
    assert!(wire.starts_with(b"HTTP/1.1 200 OK\r\n"));
    let headers = header_map(head);
    assert_eq!(headers["content-length"], "2");
    assert_eq!(headers["connection"], "keep-alive");
    assert_eq!(headers["server"], "wicket-test");
    assert!(headers.contains_key("date"));
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn compressed_json_is_chunked_and_decodes() {
    let mut router = Router::new();
    router.middleware(compress()).unwrap();
    router
        .get("/api/v1/items", |_m, _req, res| {
            Box::pin(async move {
                res.json(StatusCode::OK, &serde_json::json!([1, 2, 3])).await?;
                Ok(false)
            })
        })
        .unwrap();

    let (wire, result) = talk(
        router,
        b"GET /api/v1/items?limit=10 HTTP/1.1\r\nHost: x\r\nAccept-Encoding: gzip\r\n\r\n",
    )
    .await;
    result.unwrap();
    let (head, body) = split_head(&wire);
    let headers = header_map(head);
    assert_eq!(headers["transfer-encoding"], "chunked");
    assert_eq!(headers["content-encoding"], "gzip");
    let compressed = dechunk(body);
    let mut decoded = Vec::new();
    flate2::read::GzDecoder::new(&compressed[..])
        .read_to_end(&mut decoded)
        .unwrap();
    assert_eq!(decoded, b"[1,2,3]");
}

#[tokio::test]
async fn head_of_a_static_file_reports_size_without_body() {
    let dir = std::env::temp_dir().join("wicket-head-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("index.html");
    std::fs::write(&path, vec![b'x'; 412]).unwrap();

    let mut router = Router::new();
    let served = path.clone();
    router
        .get("/static/index.html", move |_m, _req, res| {
            let served = served.clone();
            Box::pin(async move {
                res.file(StatusCode::OK, &served).await?;
                Ok(false)
            })
        })
        .unwrap();

    let (wire, result) = talk(
        router,
        b"HEAD /static/index.html HTTP/1.1\r\nHost: x\r\n\r\n",
    )
    .await;
    result.unwrap();
    let (head, body) = split_head(&wire);
    let headers = header_map(head);
    assert_eq!(headers["content-length"], "412");
    assert_eq!(headers["content-type"], "text/html");
    assert!(body.is_empty());
}

#[tokio::test]
async fn unsupported_version_gets_505_and_close() {
    let (wire, result) = talk(hello_router(), b"GET / HTTP/2.0\r\nHost: x\r\n\r\n").await;
    assert!(result.unwrap_err().is_version());
    let (head, _body) = split_head(&wire);
    assert!(wire.starts_with(b"HTTP/1.1 505 HTTP Version Not Supported\r\n"));
    let headers = header_map(head);
    assert_eq!(headers["connection"], "close");
    let text = String::from_utf8_lossy(&wire);
    assert!(text.contains("HTTP/2.0"));
}

#[tokio::test]
async fn malformed_request_line_gets_400_and_close() {
    let (wire, result) = talk(hello_router(), b"GET /hello\r\n\r\n").await;
    assert!(result.unwrap_err().is_parse());
    let (head, _body) = split_head(&wire);
    assert!(wire.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(header_map(head)["connection"], "close");
}

#[tokio::test]
async fn pipelined_requests_answer_in_order() {
    let order = Arc::new(AtomicUsize::new(0));
    let mut router = Router::new();
    for (path, reply, expected_turn) in &[("/a", "A", 0usize), ("/b", "B", 1)] {
        let order = Arc::clone(&order);
        let reply = reply.to_string();
        let expected_turn = *expected_turn;
        router
            .get(path, move |_m, _req, res| {
                let order = Arc::clone(&order);
                let reply = reply.clone();
                Box::pin(async move {
                    assert_eq!(order.fetch_add(1, Ordering::SeqCst), expected_turn);
                    res.text(StatusCode::OK, &reply).await?;
                    Ok(false)
                })
            })
            .unwrap();
    }

    let (wire, result) = talk(
        router,
        b"GET /a HTTP/1.1\r\nHost: x\r\n\r\nGET /b HTTP/1.1\r\nHost: x\r\n\r\n",
    )
    .await;
    result.unwrap();
    let text = String::from_utf8(wire).unwrap();
    let first = text.find("\r\n\r\nA").expect("first body");
    let second = text.find("\r\n\r\nB").expect("second body");
    assert!(first < second);
    assert_eq!(text.matches("HTTP/1.1 200 OK\r\n").count(), 2);
    assert_eq!(order.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fallthrough_hits_the_wildcard_404_handler() {
    let mut router = Router::new();
    router
        .any("/*", |_m, _req, res| {
            Box::pin(async move {
                res.text(StatusCode::NOT_FOUND, "nope").await?;
                Ok(false)
            })
        })
        .unwrap();

    let (wire, result) = talk(router, b"GET /missing HTTP/1.1\r\nHost: x\r\n\r\n").await;
    result.unwrap();
    assert!(wire.starts_with(b"HTTP/1.1 404 Not found\r\n"));
    let (_head, body) = split_head(&wire);
    assert_eq!(body, b"nope");
}

#[tokio::test]
async fn no_route_at_all_falls_back_to_a_builtin_404() {
    let (wire, result) = talk(Router::new(), b"GET /missing HTTP/1.1\r\nHost: x\r\n\r\n").await;
    result.unwrap();
    assert!(wire.starts_with(b"HTTP/1.1 404 Not found\r\n"));
}

#[tokio::test]
async fn head_headers_match_get_headers() {
    let make_router = || {
        let mut router = Router::new();
        router
            .get("/page", |_m, _req, res| {
                Box::pin(async move {
                    res.html(StatusCode::OK, "<p>body</p>").await?;
                    Ok(false)
                })
            })
            .unwrap();
        router
    };

    let (get_wire, _) = talk(make_router(), b"GET /page HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let (head_wire, _) = talk(make_router(), b"HEAD /page HTTP/1.1\r\nHost: x\r\n\r\n").await;

    let (get_head, get_body) = split_head(&get_wire);
    let (head_head, head_body) = split_head(&head_wire);
    assert_eq!(get_body, b"<p>body</p>");
    assert!(head_body.is_empty());

    let mut get_headers = header_map(get_head);
    let mut head_headers = header_map(head_head);
    // The date may tick between the two exchanges.
    assert!(get_headers.remove("date").is_some());
    assert!(head_headers.remove("date").is_some());
    assert_eq!(get_headers, head_headers);
}

#[tokio::test]
async fn post_body_reaches_the_handler() {
    let seen: Arc<std::sync::Mutex<Option<Vec<u8>>>> = Arc::default();
    let mut router = Router::new();
    let captured = Arc::clone(&seen);
    router
        .post("/submit", move |_m, req, res| {
            let captured = Arc::clone(&captured);
            let body = req
                .body()
                .and_then(|b| b.bytes())
                .map(|b| b.to_vec());
            Box::pin(async move {
                *captured.lock().unwrap() = body;
                res.text(StatusCode::OK, "got it").await?;
                Ok(false)
            })
        })
        .unwrap();

    let (wire, result) = talk(
        router,
        b"POST /submit HTTP/1.1\r\nHost: x\r\nContent-Length: 11\r\n\r\nhello world",
    )
    .await;
    result.unwrap();
    assert!(wire.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert_eq!(seen.lock().unwrap().as_deref(), Some(&b"hello world"[..]));
}

#[tokio::test]
async fn content_length_zero_means_no_body() {
    let mut router = Router::new();
    router
        .post("/submit", |_m, req, res| {
            let had_body = req.body().is_some();
            Box::pin(async move {
                assert!(!had_body);
                res.text(StatusCode::OK, "empty").await?;
                Ok(false)
            })
        })
        .unwrap();

    let (wire, result) = talk(
        router,
        b"POST /submit HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\n\r\n",
    )
    .await;
    result.unwrap();
    assert!(wire.starts_with(b"HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn connection_close_is_honored() {
    let (wire, result) = talk(
        hello_router(),
        b"GET /hello HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
    )
    .await;
    result.unwrap();
    let (head, _body) = split_head(&wire);
    assert_eq!(header_map(head)["connection"], "close");
    let text = String::from_utf8(wire).unwrap();
    assert_eq!(text.matches("HTTP/1.1 ").count(), 1);
}

#[tokio::test]
async fn sloppy_paths_are_normalized_for_dispatch() {
    let (wire, result) = talk(hello_router(), b"GET ////hello/// HTTP/1.1\r\nHost: x\r\n\r\n").await;
    result.unwrap();
    assert!(wire.starts_with(b"HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn route_params_and_wildcards_flow_through_sub_routers() {
    let mut api = Router::new();
    api.get("/items/:id", |m, _req, res| {
        let id = m.param("id").unwrap_or("?").to_owned();
        Box::pin(async move {
            res.text(StatusCode::OK, &id).await?;
            Ok(false)
        })
    })
    .unwrap();
    let mut router = Router::new();
    router.mount("/api/*", api).unwrap();

    let (wire, result) = talk(router, b"GET /api/items/42 HTTP/1.1\r\nHost: x\r\n\r\n").await;
    result.unwrap();
    let (_head, body) = split_head(&wire);
    assert_eq!(body, b"42");
}

#[tokio::test]
async fn handler_errors_tear_the_connection_down() {
    let mut router = Router::new();
    router
        .get("/boom", |_m, _req, res| {
            Box::pin(async move {
                res.write_status(StatusCode::OK).await?;
                // Writing a second status violates the state machine.
                res.write_status(StatusCode::OK).await?;
                Ok(false)
            })
        })
        .unwrap();

    let (wire, result) = talk(router, b"GET /boom HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(result.unwrap_err().is_user());
    // Only the first status line made it out; no error page was attempted.
    assert_eq!(wire, b"HTTP/1.1 200 OK\r\n");
}
