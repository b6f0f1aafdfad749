use std::{collections::HashMap, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Bind address used when no configuration file is given.
pub const DEFAULT_HOSTNAME: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3682;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no servers configured")]
    NoServers,
    #[error("server {index}: port {port} out of range (1-32767)")]
    PortOutOfRange { index: usize, port: u16 },
    #[error("server {index}: unknown authentication backend \"{name}\"")]
    UnknownAuthentication { index: usize, name: String },
}

// ── Schema ───────────────────────────────────────────────────────────────────

/// A named authentication backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthBackend {
    #[serde(rename = "type")]
    pub kind: AuthKind,
    /// Password file consumed by the backend.
    pub file: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    Plaintext,
}

/// TLS material for one endpoint; both halves are required together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Security {
    pub certificate: PathBuf,
    pub privatekey: PathBuf,
}

/// One listening endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Security>,
    /// Name of an entry in the top-level `authentication` map. The name
    /// doubles as the Basic-auth realm presented in challenges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
}

/// The whole configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub authentication: HashMap<String, AuthBackend>,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl Default for Config {
    /// The configuration used without `-c`: one plain endpoint on
    /// 127.0.0.1:3682, no TLS, no authentication.
    fn default() -> Self {
        Self {
            authentication: HashMap::new(),
            servers: vec![ServerConfig {
                hostname: DEFAULT_HOSTNAME.to_string(),
                port: DEFAULT_PORT,
                security: None,
                authentication: None,
            }],
        }
    }
}

impl Config {
    /// Check everything the server assembly depends on. Ports must sit in
    /// (0, 32767]; every `authentication` reference must resolve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }

        for (index, server) in self.servers.iter().enumerate() {
            if server.port == 0 || server.port > 32767 {
                return Err(ConfigError::PortOutOfRange {
                    index,
                    port: server.port,
                });
            }
            if let Some(name) = &server.authentication
                && !self.authentication.contains_key(name)
            {
                return Err(ConfigError::UnknownAuthentication {
                    index,
                    name: name.clone(),
                });
            }
        }

        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_full_document() {
        let config: Config = serde_json::from_str(
            r#"{
                "authentication": {
                    "staff": {"type": "plaintext", "file": "/etc/hopper/passwords"}
                },
                "servers": [
                    {
                        "hostname": "127.0.0.1",
                        "port": 3682,
                        "security": {"certificate": "/tls/cert.pem", "privatekey": "/tls/key.pem"},
                        "authentication": "staff"
                    },
                    {"hostname": "::1", "port": 3683}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].authentication.as_deref(), Some("staff"));
        assert!(config.servers[1].security.is_none());
        assert_eq!(config.authentication["staff"].kind, AuthKind::Plaintext);
        config.validate().unwrap();
    }

    #[test]
    fn default_is_one_local_server() {
        let config = Config::default();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].hostname, DEFAULT_HOSTNAME);
        assert_eq!(config.servers[0].port, DEFAULT_PORT);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_ports() {
        for port in [0u16, 32768, 65535] {
            let config = Config {
                authentication: HashMap::new(),
                servers: vec![ServerConfig {
                    hostname: "127.0.0.1".into(),
                    port,
                    security: None,
                    authentication: None,
                }],
            };
            assert_eq!(
                config.validate(),
                Err(ConfigError::PortOutOfRange { index: 0, port })
            );
        }
    }

    #[test]
    fn rejects_a_dangling_authentication_reference() {
        let config: Config = serde_json::from_str(
            r#"{"servers": [{"hostname": "127.0.0.1", "port": 1, "authentication": "ghost"}]}"#,
        )
        .unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownAuthentication {
                index: 0,
                name: "ghost".into()
            })
        );
    }

    #[test]
    fn rejects_an_empty_server_list() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.validate(), Err(ConfigError::NoServers));
    }

    #[test]
    fn security_requires_both_fields() {
        let result: Result<Config, _> = serde_json::from_str(
            r#"{"servers": [{"hostname": "h", "port": 1, "security": {"certificate": "c"}}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_backend_type_is_a_parse_error() {
        let result: Result<Config, _> = serde_json::from_str(
            r#"{"authentication": {"a": {"type": "ldap", "file": "f"}}, "servers": []}"#,
        );
        assert!(result.is_err());
    }
}
