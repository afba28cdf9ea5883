use std::error::Error;

use clap::Args;
use sweepdag_dag::build_graph;
use sweepdag_dag::serde::to_canonical_json_bytes;

use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Prints the compiled graph as canonical JSON without rendering it.
pub fn run(args: &PlanArgs) -> Result<(), Box<dyn Error>> {
    let config = args.config.load(args.config.overrides())?;
    let graph = build_graph(&config, &args.config.build_opts())?;
    let json = to_canonical_json_bytes(&graph)?;
    println!("{}", String::from_utf8(json)?);
    Ok(())
}
