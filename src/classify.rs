//! Classification of completed HTTP exchanges
//!
//! [`classify`] is a pure, total mapping from a status code to an [`Outcome`]. It looks only
//! at the status; the body is carried along untouched so error states can show it. Policies
//! that depend on the body, or on codes the classifier does not name (a `413` from an upload
//! endpoint, say), belong in a custom [`Validate`] implementation or in the response state's
//! own constructor.

use crate::{RawResponse, Request};
use bytes::Bytes;
use http::StatusCode;
use std::fmt;

/// Classified result of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The service could not be reached
    Offline,
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
    /// Any `5xx`, or a transport failure that outlived the retry budget
    UnexpectedServerError(Bytes),
    /// Everything else, including every `2xx`
    Passthrough(StatusCode, Bytes),
}

impl Outcome {
    /// Whether this outcome is one of the error categories
    pub fn is_error(&self) -> bool {
        !matches!(self, Outcome::Passthrough(..))
    }

    /// Whether the service was unreachable
    pub fn is_offline(&self) -> bool {
        matches!(self, Outcome::Offline)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Offline => f.write_str("offline"),
            Outcome::BadRequest(_) => f.write_str("bad request"),
            Outcome::Unauthorized(_) => f.write_str("unauthorized"),
            Outcome::Forbidden(_) => f.write_str("forbidden"),
            Outcome::NotFound(_) => f.write_str("not found"),
            Outcome::ValidationProblem(_) => f.write_str("validation problem"),
            Outcome::UnexpectedServerError(_) => f.write_str("unexpected server error"),
            Outcome::Passthrough(status, _) => write!(f, "passthrough {}", status.as_u16()),
        }
    }
}

/// Classify a status code.
///
/// Never yields [`Outcome::Offline`]; that outcome only arises when no response was received.
pub fn classify(status: StatusCode, body: Bytes) -> Outcome {
    match status.as_u16() {
        400 => Outcome::BadRequest(body),
        401 => Outcome::Unauthorized(body),
        403 => Outcome::Forbidden(body),
        404 => Outcome::NotFound(body),
        422 => Outcome::ValidationProblem(body),
        500..=599 => Outcome::UnexpectedServerError(body),
        _ => Outcome::Passthrough(status, body),
    }
}

/// Validation hook applied to every completed exchange.
///
/// Override to layer call-site policy on top of [`classify`].
pub trait Validate: Send + Sync {
    /// Decide the outcome of a response to `request`
    fn validate(&self, request: &Request, response: &RawResponse) -> Outcome {
        let _ = request;
        classify(response.status(), response.body().clone())
    }
}

/// Validator that applies [`classify`] unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValidator;

impl Validate for DefaultValidator {}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, Method};
    use url::Url;

    fn status(code: u16) -> StatusCode {
        StatusCode::from_u16(code).unwrap()
    }

    #[test]
    fn named_client_errors() {
        let body = Bytes::from_static(b"q required");
        assert_eq!(classify(status(400), body.clone()), Outcome::BadRequest(body.clone()));
        assert_eq!(classify(status(401), body.clone()), Outcome::Unauthorized(body.clone()));
        assert_eq!(classify(status(403), body.clone()), Outcome::Forbidden(body.clone()));
        assert_eq!(classify(status(404), body.clone()), Outcome::NotFound(body.clone()));
        assert_eq!(
            classify(status(422), body.clone()),
            Outcome::ValidationProblem(body)
        );
    }

    #[test]
    fn every_5xx_is_unexpected() {
        for code in 500..600 {
            let outcome = classify(status(code), Bytes::new());
            assert!(
                matches!(outcome, Outcome::UnexpectedServerError(_)),
                "{code} classified as {outcome}"
            );
        }
    }

    #[test]
    fn everything_else_passes_through() {
        for code in (100..600).filter(|c| ![400, 401, 403, 404, 422].contains(c) && *c < 500) {
            let outcome = classify(status(code), Bytes::from_static(b"{}"));
            assert_eq!(outcome, Outcome::Passthrough(status(code), Bytes::from_static(b"{}")));
            assert!(!outcome.is_error());
        }
    }

    #[test]
    fn success_with_error_looking_body_is_not_an_error() {
        let outcome = classify(StatusCode::OK, Bytes::from_static(br#"{"error":"nope"}"#));
        assert!(!outcome.is_error());
    }

    struct TooLarge;

    impl Validate for TooLarge {
        fn validate(&self, request: &Request, response: &RawResponse) -> Outcome {
            if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
                return Outcome::BadRequest(response.body().clone());
            }
            DefaultValidator.validate(request, response)
        }
    }

    #[test]
    fn custom_validator_layers_on_top() {
        let request = Request::new(Method::POST, Url::parse("https://example.com/upload").unwrap());
        let too_large = RawResponse::new(status(413), HeaderMap::new(), "too big");
        let ok = RawResponse::new(StatusCode::CREATED, HeaderMap::new(), "");

        assert!(matches!(
            TooLarge.validate(&request, &too_large),
            Outcome::BadRequest(_)
        ));
        assert!(matches!(
            DefaultValidator.validate(&request, &too_large),
            Outcome::Passthrough(..)
        ));
        assert!(!TooLarge.validate(&request, &ok).is_error());
    }
}
