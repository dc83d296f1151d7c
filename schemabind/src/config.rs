// Copyright 2025 Oxide Computer Company
/*!
 * Configuration for schemabind
 */

use crate::logging::ConfigLogging;
use serde::Deserialize;
use serde::Serialize;

/** Media type used for request and response bodies by default. */
pub const CONTENT_TYPE_JSON: &str = "application/json";

/**
 * Configuration for schemabind.
 *
 * This type implements [`serde::Deserialize`] and [`serde::Serialize`] and it
 * can be composed with the consumer's configuration (whatever format that's
 * in).  For example, consumers could define a custom `MyAppConfig` for an app
 * that documents its API with schemabind:
 *
 * ```
 * use schemabind::ConfigSchemabind;
 * use serde::Deserialize;
 *
 * #[derive(Deserialize)]
 * struct MyAppConfig {
 *     api: ConfigSchemabind,
 *     /* ... (other app-specific config) */
 * }
 *
 * fn main() -> Result<(), String> {
 *     let my_config: MyAppConfig = toml::from_str(
 *         r##"
 *             [api.generator]
 *             media_type = "application/json"
 *             full_schema_names = false
 *
 *             [api.binder]
 *             lenient_booleans = false
 *
 *             [api.log]
 *             mode = "stderr-terminal"
 *             level = "info"
 *
 *             ## ... (other app-specific config)
 *         "##
 *     ).map_err(|error| format!("parsing config: {}", error))?;
 *
 *     let config: &ConfigSchemabind = &my_config.api;
 *     assert!(!config.generator.full_schema_names);
 *     /* ... (use the config to create a generator and a binder) */
 *     Ok(())
 * }
 * ```
 */
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ConfigSchemabind {
    pub generator: GeneratorConfig,
    pub binder: BinderConfig,
    /** If present, the logger to build for the generator and the binder */
    pub log: Option<ConfigLogging>,
}

/** Configuration for a [`crate::Generator`]. */
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /** media type of generated request and response bodies */
    pub media_type: String,
    /**
     * whether component names include the last module of the type's path
     * (`ModelsPet`) or only the type name (`Pet`)
     */
    pub full_schema_names: bool,
    /** value of the top-level `openapi` field */
    pub openapi_version: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            media_type: CONTENT_TYPE_JSON.to_string(),
            full_schema_names: true,
            openapi_version: "3.0.3".to_string(),
        }
    }
}

impl GeneratorConfig {
    /**
     * Returns the tag holding the serialized name of body fields for the
     * configured media type.
     */
    pub fn serialization_tag(&self) -> &'static str {
        let essence = self
            .media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence == "application/xml"
            || essence == "text/xml"
            || essence.ends_with("+xml")
        {
            "xml"
        } else {
            "json"
        }
    }
}

/** Configuration for a [`crate::Binder`]. */
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct BinderConfig {
    /**
     * when true, boolean parameters with a value outside the accepted
     * literals bind as `false` instead of failing
     */
    pub lenient_booleans: bool,
}

impl Default for BinderConfig {
    fn default() -> Self {
        BinderConfig { lenient_booleans: true }
    }
}

#[cfg(test)]
mod test {
    use super::BinderConfig;
    use super::ConfigSchemabind;
    use super::GeneratorConfig;
    use crate::logging::ConfigLogging;
    use crate::logging::ConfigLoggingLevel;

    #[test]
    fn test_config_defaults() {
        let config: ConfigSchemabind = toml::from_str("").unwrap();
        assert_eq!(config, ConfigSchemabind::default());
        assert_eq!(config.generator.media_type, "application/json");
        assert!(config.generator.full_schema_names);
        assert_eq!(config.generator.openapi_version, "3.0.3");
        assert!(config.binder.lenient_booleans);
        assert!(config.log.is_none());
    }

    #[test]
    fn test_config_partial() {
        let config: ConfigSchemabind = toml::from_str(
            r##"
                [generator]
                media_type = "application/xml"

                [binder]
                lenient_booleans = false

                [log]
                mode = "stderr-terminal"
                level = "warn"
            "##,
        )
        .unwrap();
        assert_eq!(config.generator.media_type, "application/xml");
        assert!(config.generator.full_schema_names);
        assert_eq!(config.binder, BinderConfig { lenient_booleans: false });
        assert_eq!(
            config.log,
            Some(ConfigLogging::StderrTerminal {
                level: ConfigLoggingLevel::Warn
            })
        );
    }

    #[test]
    fn test_config_bad_type() {
        let error = toml::from_str::<GeneratorConfig>(
            "full_schema_names = \"yes\"",
        )
        .unwrap_err();
        assert!(error.to_string().contains("invalid type"), "{}", error);
    }

    #[test]
    fn test_serialization_tag() {
        let mut config = GeneratorConfig::default();
        assert_eq!(config.serialization_tag(), "json");
        config.media_type = "application/xml; charset=utf-8".to_string();
        assert_eq!(config.serialization_tag(), "xml");
        config.media_type = "application/atom+xml".to_string();
        assert_eq!(config.serialization_tag(), "xml");
        config.media_type = "text/plain".to_string();
        assert_eq!(config.serialization_tag(), "json");
    }
}
