//! JSON body decoding into the user bag.

use crate::headers::typed::ContentType;
use crate::router::Callback;
use crate::status::StatusCode;

/// The decoded JSON body, published by [`json_body`].
#[derive(Clone, Debug, PartialEq)]
pub struct JsonBody(pub serde_json::Value);

/// Parses a buffered `application/json` body into [`JsonBody`].
///
/// Requests without a JSON content type (or without a body) pass through
/// untouched. A body that fails to parse is answered with a 400 and the
/// chain short-circuits.
pub fn json_body() -> Callback {
    Box::new(|_m, req, res| {
        Box::pin(async move {
            let is_json = match req.headers().typed_get::<ContentType>() {
                Ok(Some(ct)) => ct.media_type == "application/json",
                _ => false,
            };
            if !is_json {
                return Ok(true);
            }
            let bytes = match req.body().and_then(|body| body.bytes()) {
                Some(bytes) if !bytes.is_empty() => bytes,
                _ => return Ok(true),
            };
            match serde_json::from_slice(bytes) {
                Ok(value) => {
                    req.extensions_mut().insert(JsonBody(value));
                    Ok(true)
                }
                Err(err) => {
                    log::debug!("rejecting unparseable json body: {}", err);
                    res.text(StatusCode::BAD_REQUEST, "malformed json body")
                        .await?;
                    Ok(false)
                }
            }
        })
    })
}
