//! Engine loader for initializing engines from configuration

use super::registry::EngineRegistry;
use super::traits::Engine;
use super::{fofa, hunter, quake, zone};
use crate::config::{EngineConfig, Settings};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Loader for initializing engines from configuration
pub struct EngineLoader;

impl EngineLoader {
    /// Load all engines from settings.
    ///
    /// Disabled engines and engines that fail to initialize (typically a
    /// missing API key) are skipped with a log line; they never abort the run.
    pub fn load(settings: &Settings) -> EngineRegistry {
        let mut registry = EngineRegistry::new();

        for config in &settings.engines {
            if config.disabled {
                info!("Skipping disabled engine: {}", config.name);
                continue;
            }

            match Self::create_engine(&config.engine, config) {
                Ok(engine) => {
                    info!("Loaded engine: {} ({})", config.name, config.engine);
                    registry.register(engine, config.clone());
                }
                Err(e) => {
                    warn!("Failed to load engine {}: {}", config.name, e);
                }
            }
        }

        info!("Loaded {} engines", registry.len());
        registry
    }

    /// Create an engine instance by module name
    fn create_engine(engine_type: &str, config: &EngineConfig) -> Result<Arc<dyn Engine>> {
        let mut engine: Box<dyn Engine> = match engine_type {
            "hunter" => Box::new(hunter::Hunter::new()),
            "fofa" => Box::new(fofa::Fofa::new()),
            "quake" => Box::new(quake::Quake::new()),
            "zone" => Box::new(zone::Zone::new()),
            _ => {
                return Err(anyhow::anyhow!("Unknown engine type: {}", engine_type));
            }
        };

        // Initialize the engine
        engine.init(config)?;

        // Validate configuration
        engine.validate(config)?;

        Ok(Arc::from(engine))
    }

    /// Get list of available engine types
    pub fn available_engines() -> Vec<&'static str> {
        vec!["hunter", "fofa", "quake", "zone"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_are_skipped() {
        let registry = EngineLoader::load(&Settings::default());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_configured_engines() {
        let mut settings = Settings::default();
        settings.engines = vec![
            EngineConfig::new("quake").with_api_key("q"),
            EngineConfig::new("fofa").with_api_key("f"),
            EngineConfig {
                disabled: true,
                ..EngineConfig::new("hunter").with_api_key("h")
            },
            EngineConfig::new("shodan").with_api_key("s"),
        ];

        let registry = EngineLoader::load(&settings);
        // fofa lacks an email
        assert_eq!(registry.names(), vec!["quake"]);
    }

    #[test]
    fn test_available_engines() {
        for name in EngineLoader::available_engines() {
            let config = EngineConfig::new(name)
                .with_api_key("key")
                .with_email("me@example.com");
            assert!(EngineLoader::create_engine(name, &config).is_ok());
        }
    }
}
