//! Unary call decoding and encoding shared by every procedure

use std::{future::Future, time::Duration};

use axum::{
    body::{self, Bytes},
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{Code, RpcError, RpcRequest, RpcResponse};
use crate::context::CallContext;

pub const TIMEOUT_HEADER: &str = "connect-timeout-ms";
pub const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Decodes a JSON unary request, runs `call`, and encodes its outcome.
///
/// The call is cancelled through its context when the server aborts it or
/// when the caller-supplied timeout elapses.
pub async fn serve_unary<Req, Res, F, Fut>(
    procedure: &'static str,
    request: Request,
    call: F,
) -> Response
where
    Req: DeserializeOwned + Default,
    Res: Serialize,
    F: FnOnce(RpcRequest<Req>) -> Fut,
    Fut: Future<Output = Result<RpcResponse<Res>, RpcError>>,
{
    let (parts, body) = request.into_parts();

    if !is_json_content_type(&parts.headers) {
        return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
    }

    let timeout = match parse_timeout(&parts.headers) {
        Ok(timeout) => timeout,
        Err(err) => return err.into_response(),
    };

    let bytes = match body::to_bytes(body, MAX_MESSAGE_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return RpcError::new(
                Code::ResourceExhausted,
                format!("read request message: {err}"),
            )
            .into_response()
        }
    };

    let message: Req = match decode_message(&bytes) {
        Ok(message) => message,
        Err(err) => return err.into_response(),
    };

    let cancellation = parts
        .extensions
        .get::<CancellationToken>()
        .cloned()
        .unwrap_or_default();
    let mut context = CallContext::new(procedure).with_cancellation(cancellation);
    if let Some(timeout) = timeout {
        context = context.with_deadline(Instant::now() + timeout);
    }

    let deadline = context.deadline();
    let rpc_request = RpcRequest::new(context.clone(), message);

    let outcome = match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, call(rpc_request)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                context.cancel();
                Err(RpcError::new(Code::DeadlineExceeded, "deadline exceeded"))
            }
        },
        None => call(rpc_request).await,
    };

    match outcome {
        Ok(response) => response.into_response(),
        Err(err) => err.into_response(),
    }
}

fn decode_message<Req>(bytes: &Bytes) -> Result<Req, RpcError>
where
    Req: DeserializeOwned + Default,
{
    if bytes.is_empty() {
        return Ok(Req::default());
    }

    serde_json::from_slice(bytes).map_err(|err| {
        RpcError::new(
            Code::InvalidArgument,
            format!("unmarshal request message: {err}"),
        )
    })
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|media_type| media_type.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

fn parse_timeout(headers: &HeaderMap) -> Result<Option<Duration>, RpcError> {
    let Some(value) = headers.get(TIMEOUT_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(|millis| Some(Duration::from_millis(millis)))
        .ok_or_else(|| {
            RpcError::new(
                Code::InvalidArgument,
                format!("invalid {TIMEOUT_HEADER} header"),
            )
        })
}
