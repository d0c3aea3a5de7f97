//! Configuration loading.
//!
//! Values are layered: built-in defaults, then an optional `config/default`
//! file (any format the `config` crate understands), then `ROUTEMQ_*`
//! environment variables using `__` to separate nested keys, for example
//! `ROUTEMQ_SERVER__PORT=6000` or `ROUTEMQ_BROKER__STRICT_REDECLARE=false`.

mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{BrokerSettings, LoggingSettings, ServerSettings, Settings};

const ENV_PREFIX: &str = "ROUTEMQ";

/// Loads the configuration from the default file and environment variables
/// and merges it with default values.
pub fn load_config() -> Result<Settings, ConfigError> {
    load(File::with_name("config/default").required(false))
}

/// Same as [`load_config`] but reads a specific file, which must exist.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    load(File::with_name(path).required(true))
}

fn load<S>(file: S) -> Result<Settings, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let config = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let partial: PartialSettings = config.try_deserialize()?;
    Ok(partial.merge_with_defaults())
}
