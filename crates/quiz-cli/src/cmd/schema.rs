use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use quiz_spec::QuizConfig;
use schemars::schema_for;

use crate::cmd::write_json;

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Write the schema here instead of stdout
    #[arg(long, value_name = "schema.json")]
    pub out: Option<PathBuf>,
}

pub fn run(args: &SchemaArgs) -> Result<()> {
    let schema = schema_for!(QuizConfig);
    write_json(&schema, args.out.as_deref(), &mut std::io::stdout())
}
