//! # Compile Subcommand
//!
//! Compiles a schema without matching any data, so schema errors can be
//! caught in CI before documents exist.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use mschema::{CompiledSchema, SchemaNode};

use crate::config::CliConfig;
use crate::document::load_schema;

/// Arguments for the compile subcommand.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Path to the YAML schema.
    #[arg(long, short)]
    pub schema: PathBuf,
}

pub fn run_compile(args: &CompileArgs, config: &CliConfig) -> Result<u8> {
    let compiler = config.build_compiler(config.mode())?;
    let schema = load_schema(&compiler, &args.schema)?;
    println!("OK: {} ({})", args.schema.display(), summarize(&schema));
    Ok(0)
}

/// One-line description of a compiled schema's root.
pub fn summarize(schema: &CompiledSchema) -> String {
    let Some(root) = schema.root() else {
        return "empty schema".to_string();
    };
    let mut parts = vec![format!("root types [{}]", root.types().names().join(", "))];
    let nodes = count_nodes(root);
    if nodes > 1 {
        parts.push(format!("{nodes} nodes"));
    }
    parts.join(", ")
}

fn count_nodes(node: &SchemaNode) -> usize {
    let properties: usize = node
        .properties()
        .map(|props| props.values().map(|p| count_nodes(p.schema())).sum())
        .unwrap_or(0);
    let items = node.items().map(count_nodes).unwrap_or(0);
    1 + properties + items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_empty_schema() {
        let schema = mschema::compile("").unwrap();
        assert_eq!(summarize(&schema), "empty schema");
    }

    #[test]
    fn summary_counts_nested_nodes() {
        let schema = mschema::compile(
            "type: [mapping, sequence]\nproperties:\n  name:\n    type: text\n  tags:\n    type: sequence\n    items:\n      type: text\n",
        )
        .unwrap();
        assert_eq!(summarize(&schema), "root types [mapping, sequence], 4 nodes");
    }

    #[test]
    fn summary_of_single_node() {
        let schema = mschema::compile("type: integer").unwrap();
        assert_eq!(summarize(&schema), "root types [integer]");
    }
}
