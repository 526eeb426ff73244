use moqlink_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("host rejected request: {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("response body exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
    #[error("registration failed: {0}")]
    RegistrationFailed(String),
    #[error("{message}")]
    Message { message: String },
}

impl Error {
    /// Transport-class failures trigger channel invalidation; everything
    /// else is a host-level rejection handled at the call site.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_connect() || e.is_timeout() || e.is_body() || (e.is_request() && !e.is_decode())
            },
            // Gateway-class statuses mean the host is unreachable behind
            // its front door, not that it rejected this request.
            Self::Rejected { status, .. } => matches!(*status, 502 | 503 | 504),
            _ => false,
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

moqlink_common::impl_context!();
