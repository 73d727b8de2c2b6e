use std::error::Error;
use std::io;
use std::num::ParseIntError;
use thiserror::Error;

/// Error type handed back by handlers, writers and middlewares.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// A `Range` header that could not be understood.
#[derive(Error, Debug)]
pub enum RangeError {
    #[error("invalid range bound `{value}`: {source}")]
    InvalidBound {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("multiple ranges are not supported")]
    MultipleRanges,
}

/// Failure to hand bytes over to the transport.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("connection closed by peer")]
    Closed,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// True when the peer went away, which the streaming engine treats as a clean stop.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Everything that can fail while delivering one response.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("send error: {source}")]
    Send {
        #[from]
        source: SendError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("handler error: {0}")]
    Handler(BoxError),

    #[error("misuse: {0}")]
    Misuse(&'static str),
}

#[cfg(test)]
mod tests {
    use super::{DeliveryError, RangeError, SendError};
    use std::io;

    #[test]
    fn range_error_message_names_the_bound() {
        let source = "x".parse::<u64>().unwrap_err();
        let error = RangeError::InvalidBound { value: "x".into(), source };
        assert!(error.to_string().starts_with("invalid range bound `x`"));
    }

    #[test]
    fn conversions() {
        let error: DeliveryError = SendError::Closed.into();
        assert!(matches!(error, DeliveryError::Send { source: SendError::Closed }));

        let error: DeliveryError = io::Error::other("boom").into();
        assert!(matches!(error, DeliveryError::Io { .. }));

        assert!(SendError::Closed.is_closed());
        assert!(!SendError::io(io::Error::other("x")).is_closed());
    }
}
