//! Poll iteration errors
//!
//! `Auth` and `Content` fail a single iteration and are counted by the poll
//! loop. `TooManyErrors` is produced only by the loop itself and ends the
//! process.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("content fetch failed: {0}")]
    Content(String),

    #[error("got {consecutive} consecutive errors, stopping")]
    TooManyErrors { consecutive: u32 },
}

impl From<reddit_auth::Error> for Error {
    fn from(e: reddit_auth::Error) -> Self {
        Error::Auth(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_convert_to_auth() {
        let err: Error = reddit_auth::Error::InvalidCredentials("bad password".into()).into();
        match err {
            Error::Auth(msg) => assert!(msg.contains("bad password"), "got: {msg}"),
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn too_many_errors_message() {
        assert_eq!(
            Error::TooManyErrors { consecutive: 3 }.to_string(),
            "got 3 consecutive errors, stopping"
        );
    }
}
