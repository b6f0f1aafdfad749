//! Broker configuration: a JSON document naming authentication backends
//! and the listening endpoints, with validation of everything the server
//! assembly relies on (port range, TLS material, backend references).

mod loader;
mod schema;

pub use loader::{load, load_str};
pub use schema::{
    AuthBackend, AuthKind, Config, ConfigError, DEFAULT_HOSTNAME, DEFAULT_PORT, Security,
    ServerConfig,
};
