//! Script-app credential set

use common::Secret;

/// Username/password plus the OAuth client pair of a Reddit "script" app.
///
/// Immutable for the life of the process. The password and client secret
/// are redacted from `Debug` output.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Secret<String>,
    pub client_id: String,
    pub client_secret: Secret<String>,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password.into()),
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret.into()),
        }
    }
}
