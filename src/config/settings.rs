use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the TCP server, the broker engine and logging.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub logging: LoggingSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the TCP listener will bind to.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration settings for the broker engine.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BrokerSettings {
    /// Upper bound on a single read while accumulating a frame body.
    pub read_chunk_size: usize,
    /// Largest length prefix accepted before the connection is dropped.
    pub max_frame_len: usize,
    /// Reject re-declarations whose `Type`/`Durable` differ from the existing queue.
    pub strict_redeclare: bool,
    /// Write `Error` frames back to peers whose requests fail.
    pub reply_errors: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
}

impl Settings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub read_chunk_size: Option<usize>,
    pub max_frame_len: Option<usize>,
    pub strict_redeclare: Option<bool>,
    pub reply_errors: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl PartialSettings {
    /// Fill every missing value from `Settings::default()`.
    pub fn merge_with_defaults(self) -> Settings {
        let default = Settings::default();
        let server = self.server;
        let broker = self.broker;
        let logging = self.logging;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(default.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(default.server.port),
            },
            broker: BrokerSettings {
                read_chunk_size: broker
                    .as_ref()
                    .and_then(|b| b.read_chunk_size)
                    .filter(|size| *size > 0)
                    .unwrap_or(default.broker.read_chunk_size),
                max_frame_len: broker
                    .as_ref()
                    .and_then(|b| b.max_frame_len)
                    .unwrap_or(default.broker.max_frame_len),
                strict_redeclare: broker
                    .as_ref()
                    .and_then(|b| b.strict_redeclare)
                    .unwrap_or(default.broker.strict_redeclare),
                reply_errors: broker
                    .as_ref()
                    .and_then(|b| b.reply_errors)
                    .unwrap_or(default.broker.reply_errors),
            },
            logging: LoggingSettings {
                level: logging
                    .and_then(|l| l.level)
                    .unwrap_or(default.logging.level),
            },
        }
    }
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 5671,
            },
            broker: BrokerSettings {
                read_chunk_size: 50,
                max_frame_len: 16 * 1024 * 1024,
                strict_redeclare: true,
                reply_errors: true,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}
