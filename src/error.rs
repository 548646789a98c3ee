use std::any::Any;

/// Errors raised by the promise engine itself.
///
/// Rejection reasons of user code travel as the promise's own `E`; the engine
/// only needs `E: From<Error>` to inject the cases below.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("cannot resolve promise with itself")]
    CyclicResolution,
    #[error("{0}")]
    Failure(String),
    #[error("panicked: {0}")]
    Panicked(String),
}

impl Error {
    /// Wrap an opaque failure message.
    pub fn failure(message: impl Into<String>) -> Self {
        Error::Failure(message.into())
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        tracing::warn!(%message, "user code panicked, rejecting");
        Error::Panicked(message)
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(
            Error::from_panic(Box::new("boom")),
            Error::Panicked("boom".into())
        );
        assert_eq!(
            Error::from_panic(Box::new(String::from("bang"))),
            Error::Panicked("bang".into())
        );
        assert_eq!(
            Error::from_panic(Box::new(7_u8)),
            Error::Panicked("unknown panic payload".into())
        );
    }

    #[test]
    fn display() {
        assert_eq!(
            Error::CyclicResolution.to_string(),
            "cannot resolve promise with itself"
        );
        assert_eq!(Error::failure("nope").to_string(), "nope");
    }
}
