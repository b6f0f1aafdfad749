//! HTTP Basic authentication against a plaintext password file.
//!
//! The file holds one principal per line as `username:$<codec>$<material>`.
//! The only codec currently defined is `plain`, where the material is the
//! literal password. The file is re-read on demand whenever its
//! modification time advances past the last successful read, so passwords
//! can be rotated without restarting the broker.

mod plaintext;

pub use plaintext::{AuthError, PlaintextAuth};
