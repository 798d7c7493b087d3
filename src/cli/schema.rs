use crate::config::Config;
use crate::engine::FinalResult;
use schemars::schema_for;

/// Prints the config schema, or the result schema with `result`
pub fn execute(result: bool) -> anyhow::Result<()> {
    let schema = if result {
        schema_for!(FinalResult)
    } else {
        schema_for!(Config)
    };
    let json = serde_json::to_string_pretty(&schema)?;
    println!("{}", json);
    Ok(())
}
