//! Typed response states
//!
//! Every call resolves to a caller-defined state type implementing [`ResponseState`]. Failed
//! exchanges are folded into a [`BaseState`] carrying the service reachability and at most one
//! error; successful exchanges hand the raw response to the state's own constructor.

use crate::{Outcome, RawResponse};
use bytes::Bytes;

/// Whether the service was reachable for the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceState {
    /// Reachable
    #[default]
    Online,
    /// Unreachable
    Offline,
}

/// The single error a [`BaseState`] may carry, with the response body that came with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// `400`
    BadRequest(Bytes),
    /// `401`
    Unauthorized(Bytes),
    /// `403`
    Forbidden(Bytes),
    /// `404`
    NotFound(Bytes),
    /// `422`
    ValidationProblem(Bytes),
    /// `5xx`, exhausted transport failures, or an undecodable success body
    Unexpected(Bytes),
}

impl StateError {
    /// Body or message attached to the error
    pub fn body(&self) -> &Bytes {
        match self {
            StateError::BadRequest(body)
            | StateError::Unauthorized(body)
            | StateError::Forbidden(body)
            | StateError::NotFound(body)
            | StateError::ValidationProblem(body)
            | StateError::Unexpected(body) => body,
        }
    }
}

/// Minimal error-carrying state produced when an exchange has no usable payload.
///
/// Immutable once constructed; a fresh one is built per failed exchange.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BaseState {
    service: ServiceState,
    error: Option<StateError>,
}

impl BaseState {
    /// Online, no error
    pub fn online() -> Self {
        Self::default()
    }

    /// Offline, no error
    pub fn offline() -> Self {
        Self {
            service: ServiceState::Offline,
            error: None,
        }
    }

    /// Initial value used by `empty` states
    pub fn empty() -> Self {
        Self::online()
    }

    /// Online state carrying `error`
    pub fn with_error(error: StateError) -> Self {
        Self {
            service: ServiceState::Online,
            error: Some(error),
        }
    }

    /// Online state carrying an unexpected error built from a message
    pub fn unexpected(message: impl std::fmt::Display) -> Self {
        Self::with_error(StateError::Unexpected(Bytes::from(message.to_string())))
    }

    /// Fold a classified outcome into a base state
    pub fn from_outcome(outcome: Outcome) -> Self {
        let error = match outcome {
            Outcome::Offline => return Self::offline(),
            Outcome::Passthrough(..) => return Self::online(),
            Outcome::BadRequest(body) => StateError::BadRequest(body),
            Outcome::Unauthorized(body) => StateError::Unauthorized(body),
            Outcome::Forbidden(body) => StateError::Forbidden(body),
            Outcome::NotFound(body) => StateError::NotFound(body),
            Outcome::ValidationProblem(body) => StateError::ValidationProblem(body),
            Outcome::UnexpectedServerError(body) => StateError::Unexpected(body),
        };
        Self::with_error(error)
    }

    /// Service reachability
    pub fn service(&self) -> ServiceState {
        self.service
    }

    /// Whether the service was reachable
    pub fn is_online(&self) -> bool {
        self.service == ServiceState::Online
    }

    /// The error, if any
    pub fn error(&self) -> Option<&StateError> {
        self.error.as_ref()
    }

    /// Body of a `400` response
    pub fn bad_request(&self) -> Option<&Bytes> {
        match &self.error {
            Some(StateError::BadRequest(body)) => Some(body),
            _ => None,
        }
    }

    /// Body of a `401` response
    pub fn unauthorized(&self) -> Option<&Bytes> {
        match &self.error {
            Some(StateError::Unauthorized(body)) => Some(body),
            _ => None,
        }
    }

    /// Body of a `403` response
    pub fn forbidden(&self) -> Option<&Bytes> {
        match &self.error {
            Some(StateError::Forbidden(body)) => Some(body),
            _ => None,
        }
    }

    /// Body of a `404` response
    pub fn not_found(&self) -> Option<&Bytes> {
        match &self.error {
            Some(StateError::NotFound(body)) => Some(body),
            _ => None,
        }
    }

    /// Body of a `422` response
    pub fn validation_problem(&self) -> Option<&Bytes> {
        match &self.error {
            Some(StateError::ValidationProblem(body)) => Some(body),
            _ => None,
        }
    }

    /// Body or message of an unexpected error
    pub fn unexpected_error(&self) -> Option<&Bytes> {
        match &self.error {
            Some(StateError::Unexpected(body)) => Some(body),
            _ => None,
        }
    }
}

impl From<Outcome> for BaseState {
    fn from(outcome: Outcome) -> Self {
        Self::from_outcome(outcome)
    }
}

/// A caller-defined result type the pipeline can construct.
///
/// Both constructors must return a fully formed value.
pub trait ResponseState: Sized + Send + 'static {
    /// Build from a failed exchange
    fn from_base_state(state: BaseState) -> Self;

    /// Build from a completed exchange that was not classified as an error
    fn from_response(response: RawResponse) -> Self;

    /// Initial value before any exchange
    fn empty() -> Self;

    /// The base state carried by this value, if any
    fn base_state(&self) -> Option<&BaseState>;
}

/// Acknowledgement state for calls whose body is not interesting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultState {
    /// Whether the response status was `2xx`
    pub success: bool,
    /// Reachability and error information
    pub state: BaseState,
}

impl ResponseState for DefaultState {
    fn from_base_state(state: BaseState) -> Self {
        Self {
            success: false,
            state,
        }
    }

    fn from_response(response: RawResponse) -> Self {
        Self {
            success: response.is_success(),
            state: BaseState::online(),
        }
    }

    fn empty() -> Self {
        Self::from_base_state(BaseState::empty())
    }

    fn base_state(&self) -> Option<&BaseState> {
        Some(&self.state)
    }
}

/// Map a settled exchange onto the caller's state type
pub(crate) fn into_state<S: ResponseState>(settled: Settled) -> S {
    match settled {
        Settled::Response(response) => S::from_response(response),
        Settled::Failed(outcome) => S::from_base_state(BaseState::from_outcome(outcome)),
    }
}

/// Terminal result of one exchange after validation
#[derive(Debug, Clone)]
pub(crate) enum Settled {
    /// Not an error; handed to [`ResponseState::from_response`]
    Response(RawResponse),
    /// Any error outcome, [`Outcome::Offline`] included
    Failed(Outcome),
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, StatusCode};

    #[test]
    fn every_error_outcome_fills_exactly_its_slot() {
        let body = Bytes::from_static(b"why");
        let cases = [
            Outcome::BadRequest(body.clone()),
            Outcome::Unauthorized(body.clone()),
            Outcome::Forbidden(body.clone()),
            Outcome::NotFound(body.clone()),
            Outcome::ValidationProblem(body.clone()),
            Outcome::UnexpectedServerError(body.clone()),
        ];

        for outcome in cases {
            let state = BaseState::from_outcome(outcome);
            let filled = [
                state.bad_request(),
                state.unauthorized(),
                state.forbidden(),
                state.not_found(),
                state.validation_problem(),
                state.unexpected_error(),
            ]
            .into_iter()
            .flatten()
            .count();
            assert_eq!(filled, 1);
            assert!(state.is_online());
            assert_eq!(state.error().map(StateError::body), Some(&body));
        }
    }

    #[test]
    fn offline_outcome_has_no_error_slot() {
        let state = BaseState::from_outcome(Outcome::Offline);
        assert_eq!(state.service(), ServiceState::Offline);
        assert!(state.error().is_none());
    }

    #[test]
    fn validation_problem_scenario() {
        let state = BaseState::from(Outcome::ValidationProblem(Bytes::from_static(b"q required")));
        assert_eq!(state.validation_problem().map(|b| b.as_ref()), Some(&b"q required"[..]));
        assert_eq!(state.service(), ServiceState::Online);
    }

    #[test]
    fn default_state_tracks_success() {
        let ok: DefaultState =
            into_state(Settled::Response(RawResponse::new(StatusCode::NO_CONTENT, HeaderMap::new(), "")));
        assert!(ok.success);
        assert!(ok.state.is_online());

        let moved: DefaultState = into_state(Settled::Response(RawResponse::new(
            StatusCode::MOVED_PERMANENTLY,
            HeaderMap::new(),
            "",
        )));
        assert!(!moved.success);

        let failed: DefaultState = into_state(Settled::Failed(Outcome::Forbidden(Bytes::new())));
        assert!(!failed.success);
        assert!(failed.state.forbidden().is_some());

        assert_eq!(DefaultState::empty().state, BaseState::empty());
    }
}
