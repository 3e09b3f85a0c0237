//! Terminal handler for unexpected failures.
//!
//! Validation and not-found outcomes never come through here. Everything else
//! (store faults, panics caught by the middleware) becomes one generic 500
//! envelope carrying only the outermost error context, or is handed back to
//! the caller when a response is already on the wire.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::rest::dto::FaultEnvelope;

pub const FAULT_MESSAGE: &str = "Something broke!";

/// What the caller should do with a reported failure.
#[derive(Debug)]
pub enum Outcome {
    /// Nothing was sent yet; send this.
    Respond(Response),
    /// Headers or body already went out. Do not write again; abort with the error.
    Propagate(anyhow::Error),
}

impl Outcome {
    /// Collapse into a response for contexts where nothing has been sent yet.
    pub fn into_response_or_bare(self) -> Response {
        match self {
            Outcome::Respond(res) => res,
            Outcome::Propagate(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Log the full chain at `error` and decide how the failure ends the exchange.
pub fn report(err: anyhow::Error, response_started: bool) -> Outcome {
    tracing::error!(error = ?err, response_started, "Unhandled failure");

    if response_started {
        return Outcome::Propagate(err);
    }

    let envelope = FaultEnvelope {
        status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        message: FAULT_MESSAGE.to_string(),
        error: err.to_string(),
    };
    Outcome::Respond(envelope.into_response())
}

/// Panic hook for `CatchPanicLayer`.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| (*s).to_string()))
        .unwrap_or_else(|| "unknown panic payload".to_string());

    let err = anyhow::anyhow!(detail).context("request handler panicked");
    report(err, false).into_response_or_bare()
}
