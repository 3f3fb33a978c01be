//! Request logging hook

use crate::Request;

/// Receives every outgoing request before dispatch, for diagnostics only
pub trait RequestLogger: Send + Sync {
    /// Called once per dispatch attempt
    fn log(&self, request: &Request);
}

/// Logs requests through `tracing` at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl RequestLogger for TracingLogger {
    fn log(&self, request: &Request) {
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            headers = ?request.headers(),
            encoding = ?request.encoding(),
            "outgoing request"
        );
    }
}

impl<F> RequestLogger for F
where
    F: Fn(&Request) + Send + Sync,
{
    fn log(&self, request: &Request) {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use std::io;
    use std::sync::{Arc, Mutex};
    use url::Url;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn tracing_logger_emits_a_debug_event() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let capture = capture.clone();
                move || capture.clone()
            })
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();

        let request = Request::new(
            Method::DELETE,
            Url::parse("https://api.example.com/tags/9").unwrap(),
        );
        tracing::subscriber::with_default(subscriber, || TracingLogger.log(&request));

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("DEBUG"));
        assert!(output.contains("outgoing request"));
        assert!(output.contains("method=DELETE"));
        assert!(output.contains("https://api.example.com/tags/9"));
    }
}
