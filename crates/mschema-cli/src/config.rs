//! # CLI Configuration
//!
//! Optional YAML file passed with `--config`. Every field is optional:
//!
//! ```yaml
//! name: settings          # root name in error messages
//! deep: true              # match mapping property values recursively
//! predicates:
//!   is_even: "x % 2 == 0"
//! types:
//!   net.addr:Port:
//!     type: integer
//!     assertion: "0 < x <= 65535"
//! ```
//!
//! `predicates` become named predicates callable from assertions. `types`
//! are inline schemas registered as external types: a value is an instance
//! of `net.addr:Port` when it matches that schema. Entries are registered
//! in file order, so later entries may use earlier ones.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use mschema::{MatchMode, Matcher, Predicate, RawSchema, SchemaCompiler};

/// Settings loaded from `--config`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub name: Option<String>,
    pub deep: bool,
    pub predicates: IndexMap<String, String>,
    pub types: IndexMap<String, RawSchema>,
}

impl CliConfig {
    /// Load the config file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            predicates = config.predicates.len(),
            types = config.types.len(),
            "loaded config"
        );
        Ok(config)
    }

    pub fn mode(&self) -> MatchMode {
        if self.deep {
            MatchMode::Deep
        } else {
            MatchMode::Legacy
        }
    }

    /// Build a compiler with the configured predicates and types registered.
    ///
    /// Schema-backed types are matched with `mode`, the same mode the
    /// caller uses for the document itself.
    pub fn build_compiler(&self, mode: MatchMode) -> Result<SchemaCompiler> {
        let mut compiler = SchemaCompiler::new();

        for (name, expression) in &self.predicates {
            let predicate = Predicate::compile(expression, compiler.predicates())
                .with_context(|| format!("invalid predicate '{name}': {expression}"))?;
            compiler
                .predicates_mut()
                .register(name.clone(), move |value| predicate.test(value))?;
        }

        let matcher = Matcher::new(mode);
        for (name, raw) in &self.types {
            let node = compiler
                .compile_raw(raw)
                .with_context(|| format!("invalid schema for type '{name}'"))?;
            let label = name.clone();
            compiler
                .types_mut()
                .register(name.clone(), move |value| matcher.check(value, &node, &label).is_ok())?;
        }

        Ok(compiler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> CliConfig {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn missing_path_yields_defaults() {
        let config = CliConfig::load(None).unwrap();
        assert!(config.name.is_none());
        assert_eq!(config.mode(), MatchMode::Legacy);
        assert!(config.predicates.is_empty());
        assert!(config.types.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = serde_yaml::from_str::<CliConfig>("nmae: typo\n").unwrap_err();
        assert!(err.to_string().contains("nmae"));
    }

    #[test]
    fn configured_predicates_and_types_are_registered() {
        let config = parse(
            r#"
deep: true
predicates:
  is_even: "x % 2 == 0"
  is_even_positive: "is_even(x) and x > 0"
types:
  net.addr:Port:
    type: integer
    assertion: "0 < x <= 65535"
  net.addr:EvenPort:
    type: net.addr:Port
    assertion: is_even
"#,
        );
        assert_eq!(config.mode(), MatchMode::Deep);

        let compiler = config.build_compiler(config.mode()).unwrap();
        assert_eq!(compiler.predicates().names(), vec!["is_even", "is_even_positive"]);
        assert_eq!(compiler.types().names(), vec!["net.addr:EvenPort", "net.addr:Port"]);

        let schema = compiler
            .compile("type: sequence\nitems:\n  type: net.addr:EvenPort\n")
            .unwrap();
        assert!(schema.validate(&json!([80, 8080]), "ports").is_ok());
        assert!(schema.validate(&json!([81]), "ports").is_err());
        assert!(schema.validate(&json!([70000]), "ports").is_err());
    }

    #[test]
    fn bad_predicate_names_the_entry() {
        let config = parse("predicates:\n  broken: \"x >\"\n");
        let err = config.build_compiler(MatchMode::Legacy).unwrap_err();
        assert!(err.to_string().contains("invalid predicate 'broken'"));
    }

    #[test]
    fn schema_types_follow_the_requested_mode() {
        let config = parse(
            "types:\n  app.net:Server:\n    type: mapping\n    properties:\n      port:\n        type: integer\n",
        );
        let data = json!({"server": {"port": "8080"}});
        let text = "type: mapping\nproperties:\n  server:\n    type: app.net:Server\n";

        // Presence-only inside the type: the text port goes unnoticed.
        let legacy = config.build_compiler(MatchMode::Legacy).unwrap().compile(text).unwrap();
        assert!(legacy.validate_with(&data, "settings", MatchMode::Deep).is_ok());

        let deep = config.build_compiler(MatchMode::Deep).unwrap().compile(text).unwrap();
        let err = deep.validate_with(&data, "settings", MatchMode::Deep).unwrap_err();
        assert_eq!(
            err.to_string(),
            "the type of settings['server'] should be [app.net:Server], but it was mapping"
        );
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mschema.yaml");
        std::fs::write(&path, "name: settings\n").unwrap();
        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.name.as_deref(), Some("settings"));
    }
}
