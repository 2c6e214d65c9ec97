//! Types shared by the get-motivated crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
