use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::runtime::RuntimeArgs;

/// rustle-cluster: declarative cluster provisioning over SSH
#[derive(Parser)]
#[command(name = "rustle-cluster")]
#[command(about = "Provision Kubernetes clusters from a declarative cluster definition")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct RustleClusterCli {
    #[command(flatten)]
    pub options: RunOptions,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a registered pipeline against a cluster definition
    Run {
        /// Pipeline name, see `list`
        pipeline: String,
        /// Cluster definition file (YAML)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List registered pipelines
    List,
}

#[derive(Debug, Clone, Args)]
pub struct RunOptions {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Working directory for results and ssh control sockets
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    /// Keep going after failed steps, tasks and modules
    #[arg(long, global = true)]
    pub ignore_err: bool,

    /// Extra `key=value` argument, may be repeated (before the subcommand)
    #[arg(long = "arg", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub args: Vec<(String, String)>,

    /// SSH connect timeout (seconds)
    #[arg(long, default_value = "30", global = true)]
    pub connect_timeout: u64,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

impl From<&RunOptions> for RuntimeArgs {
    fn from(options: &RunOptions) -> Self {
        let defaults = RuntimeArgs::default();
        Self {
            work_dir: options.work_dir.clone().unwrap_or(defaults.work_dir),
            ignore_err: options.ignore_err,
            verbose: options.verbose,
            args: options.args.iter().cloned().collect::<BTreeMap<_, _>>(),
            connect_timeout: std::time::Duration::from_secs(options.connect_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("version=v1.23.10").unwrap(),
            ("version".to_string(), "v1.23.10".to_string())
        );
        assert_eq!(
            parse_key_value("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=value").is_err());
    }

    #[test]
    fn test_run_command_parsing() {
        let cli = RustleClusterCli::try_parse_from([
            "rustle-cluster",
            "--ignore-err",
            "--arg",
            "a=1",
            "--arg",
            "b=2",
            "run",
            "cluster-install",
            "-f",
            "cluster.yaml",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.options.verbose);

        assert!(cli.options.ignore_err);
        match cli.command {
            Commands::Run { pipeline, file } => {
                assert_eq!(pipeline, "cluster-install");
                assert_eq!(file, PathBuf::from("cluster.yaml"));
            }
            Commands::List => panic!("expected run"),
        }

        let args = RuntimeArgs::from(&cli.options);
        assert_eq!(args.arg("a"), Some("1"));
        assert_eq!(args.arg("b"), Some("2"));
        assert!(args.ignore_err);
    }

    #[test]
    fn test_arg_after_subcommand_is_rejected() {
        let parsed = RustleClusterCli::try_parse_from([
            "rustle-cluster",
            "--arg",
            "a=1",
            "run",
            "cluster-install",
            "-f",
            "cluster.yaml",
            "--arg",
            "b=2",
        ]);
        assert!(parsed.is_err());
    }
}
