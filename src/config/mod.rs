mod settings;

use config::{Config, ConfigError, Environment, File};

pub use settings::{LoggingSettings, PartialSettings, ServerSettings, Settings};

/// Prefix of environment overrides, e.g. `COUNTCAST__SERVER__PORT=4000`.
pub const ENV_PREFIX: &str = "COUNTCAST";

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the server and logging configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_with_defaults())
}
