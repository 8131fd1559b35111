use std::path::PathBuf;

use crate::consts::{
    CONFIG_DEFAULT_NAME, CONFIG_DEFAULT_NAMESPACE, CONFIG_NAMESPACE_ENV_VAR, CONFIG_NAME_ENV_VAR,
    FUNCTIONS_NAMESPACE_ENV_VAR,
};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs the Kubeless functions controller
    #[clap(visible_alias = "r")]
    Run {
        /// The namespace to watch for functions, all namespaces if not set
        #[clap(short = 'n', long, env = FUNCTIONS_NAMESPACE_ENV_VAR)]
        functions_namespace: Option<String>,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Custom definition resource (CRD) commands
    #[clap(visible_alias = "c")]
    Crd {
        #[command(subcommand)]
        command: CrdCommands,
    },
    /// Reconciles a single function once
    #[clap(visible_alias = "f")]
    Function {
        #[command(subcommand)]
        command: FunctionCommands,
    },
}

/// Where the controller configuration lives
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// The namespace of the configuration config map
    #[clap(long, env = CONFIG_NAMESPACE_ENV_VAR, default_value = CONFIG_DEFAULT_NAMESPACE)]
    pub config_namespace: String,
    /// The name of the configuration config map
    #[clap(long, env = CONFIG_NAME_ENV_VAR, default_value = CONFIG_DEFAULT_NAME)]
    pub config_name: String,
}

#[derive(Subcommand, Debug)]
pub enum CrdCommands {
    /// Writes the CRD to a file
    #[clap(visible_alias = "w")]
    Write {
        /// The path to the file to write the CRD to
        #[clap(short, long)]
        file: PathBuf,
    },
    /// Prints the CRD to stdout
    #[clap(visible_alias = "p")]
    Print {},
    /// Installs the CRD to the cluster
    #[clap(visible_alias = "in")]
    Install {},
    /// Uninstalls the CRD from the cluster
    #[clap(visible_alias = "un")]
    Uninstall {},
    /// Updates the CRD in the cluster
    /// This is equivalent to uninstalling and then installing the CRD
    #[clap(visible_alias = "up")]
    Update {},
}

#[derive(Subcommand, Debug)]
pub enum FunctionCommands {
    /// Creates or updates the objects of a function
    #[clap(visible_alias = "e")]
    Ensure {
        /// The namespace of the function
        #[clap(short, long)]
        namespace: String,
        /// The name of the function
        name: String,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Deletes the objects of a function
    #[clap(visible_alias = "d")]
    Delete {
        /// The namespace of the function
        #[clap(short, long)]
        namespace: String,
        /// The name of the function
        name: String,
    },
}
