use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use sweepdag_dag::backend::condor::DEFAULT_SUBMIT_PROGRAM;
use sweepdag_dag::{generate, CondorBackend, RawConfig};
use tracing::info;

use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Submit the rendered DAG after writing it.
    #[arg(long)]
    pub submit: bool,
    /// Program used to submit the DAG.
    #[arg(long, default_value = DEFAULT_SUBMIT_PROGRAM)]
    pub submit_program: PathBuf,
}

pub fn run(args: &GenerateArgs) -> Result<(), Box<dyn Error>> {
    let overrides = RawConfig {
        submit: args.submit.then_some(true),
        ..args.config.overrides()
    };
    let config = args.config.load(overrides)?;
    let backend = CondorBackend::new(&args.submit_program);
    let report = generate(&config, &backend, &args.config.build_opts())?;

    println!("{}", report.rendered.graph_file.display());
    if let Some(receipt) = &report.receipt {
        for cluster in &receipt.cluster_ids {
            println!("submitted to cluster {cluster}");
        }
        info!(clusters = receipt.cluster_ids.len(), "submission accepted");
    }
    Ok(())
}
