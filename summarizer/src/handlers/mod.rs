pub mod summarize;
pub mod utils;

use bytes::Bytes;
use common::consts::{PING_PATH, SUMMARIES_STREAM_PATH};
use http_body_util::combinators::BoxBody;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use std::fmt::Display;
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;
use utils::full;

/// Dispatch one request to its handler.
pub async fn route<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, hyper::Error>
where
    B: Body,
    B::Error: Display,
{
    match (req.method(), req.uri().path()) {
        (&Method::GET, PING_PATH) => Ok(Response::new(full("pong"))),
        (&Method::POST, SUMMARIES_STREAM_PATH) => summarize::summarize_stream(req, state).await,
        _ => {
            debug!("no route for {} {}", req.method(), req.uri().path());
            let mut not_found = Response::new(full("Not Found"));
            *not_found.status_mut() = StatusCode::NOT_FOUND;
            Ok(not_found)
        }
    }
}
