use moqlink_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("broker is not running")]
    NotRunning,
    #[error("invalid engine config: {0}")]
    Config(String),
    #[error("broker engine: {0}")]
    Engine(String),
    #[error("{message}")]
    Message { message: String },
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

moqlink_common::impl_context!();
