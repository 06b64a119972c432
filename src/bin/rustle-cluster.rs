use anyhow::Result;
use clap::Parser;
use rustle_cluster::cli::{
    list_pipelines, print_pipeline_list, print_pipeline_report, run_pipeline, Commands,
    RustleClusterCli,
};
use rustle_cluster::engine::PipelineRegistry;
use rustle_cluster::runtime::RuntimeArgs;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RustleClusterCli::parse();

    let level = if cli.options.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Starting rustle-cluster v{}", env!("CARGO_PKG_VERSION"));

    let registry = PipelineRegistry::with_builtin_pipelines();

    match &cli.command {
        Commands::List => {
            print_pipeline_list(&list_pipelines(&registry));
        }
        Commands::Run { pipeline, file } => {
            let args = RuntimeArgs::from(&cli.options);
            match run_pipeline(&registry, pipeline, file, args).await {
                Ok(report) => {
                    print_pipeline_report(&report);
                    if !report.is_success() {
                        std::process::exit(1);
                    }
                }
                Err(e) if e.is_work_dir() => {
                    error!("{}", e);
                    std::process::exit(2);
                }
                Err(e) => {
                    error!("{}", e);
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
