//! # Check Subcommand
//!
//! Matches one data document against a schema file and reports the first
//! violation.
//!
//! Exit codes: `0` the document matches, `1` it does not, `2` (from
//! `main`) the schema, data, or config could not be loaded.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;

use mschema::{MatchMode, ValidationError, DEFAULT_NAME};

use crate::config::CliConfig;
use crate::document::{load_document, load_schema};

/// Arguments for the check subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the YAML schema.
    #[arg(long, short)]
    pub schema: PathBuf,

    /// Path to the data document (`.yaml`/`.yml` for YAML, JSON otherwise).
    pub data: PathBuf,

    /// Root name used in error messages. Overrides the config file.
    #[arg(long)]
    pub name: Option<String>,

    /// Match the values of declared mapping properties recursively.
    #[arg(long)]
    pub deep: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct Report<'a> {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReport<'a>>,
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    message: String,
    #[serde(flatten)]
    detail: &'a ValidationError,
}

pub fn run_check(args: &CheckArgs, config: &CliConfig) -> Result<u8> {
    let mode = if args.deep { MatchMode::Deep } else { config.mode() };
    let compiler = config.build_compiler(mode)?;
    let schema = load_schema(&compiler, &args.schema)?;
    let data = load_document(&args.data)?;

    let name = args
        .name
        .as_deref()
        .or(config.name.as_deref())
        .unwrap_or(DEFAULT_NAME);

    let outcome = schema.validate_with(&data, name, mode);
    tracing::info!(
        schema = %args.schema.display(),
        data = %args.data.display(),
        ?mode,
        valid = outcome.is_ok(),
        "check finished"
    );

    println!("{}", render(&outcome, args.format)?);
    Ok(if outcome.is_ok() { 0 } else { 1 })
}

/// Render a match outcome for stdout.
pub fn render(outcome: &Result<(), ValidationError>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(match outcome {
            Ok(()) => "OK".to_string(),
            Err(e) => format!("FAIL: {e}"),
        }),
        OutputFormat::Json => {
            let report = Report {
                valid: outcome.is_ok(),
                error: outcome.as_ref().err().map(|e| ErrorReport {
                    message: e.to_string(),
                    detail: e,
                }),
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mschema::ValueKind;

    #[test]
    fn text_render() {
        assert_eq!(render(&Ok(()), OutputFormat::Text).unwrap(), "OK");
        let err = ValidationError::MissingProperty {
            name: "variable".to_string(),
            property: "age".to_string(),
        };
        assert_eq!(
            render(&Err(err), OutputFormat::Text).unwrap(),
            "FAIL: cannot find property age in variable"
        );
    }

    #[test]
    fn json_render_includes_kind_and_message() {
        let ok: serde_json::Value =
            serde_json::from_str(&render(&Ok(()), OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(ok, serde_json::json!({"valid": true}));

        let err = ValidationError::TypeMismatch {
            name: "variable".to_string(),
            actual: ValueKind::Sequence,
            expected: vec!["mapping".to_string()],
        };
        let report: serde_json::Value =
            serde_json::from_str(&render(&Err(err), OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(report["valid"], false);
        assert_eq!(report["error"]["kind"], "type_mismatch");
        assert_eq!(report["error"]["actual"], "sequence");
        assert_eq!(
            report["error"]["message"],
            "the type of variable should be [mapping], but it was sequence"
        );
    }
}
