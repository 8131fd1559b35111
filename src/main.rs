use clap::Parser;
use kubeless_functions_operato_rs::{
    cli::{Cli, Commands, CrdCommands, FunctionCommands},
    consts::{PKG_NAME, PKG_VERSION},
    main_actions::*,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", format!("{PKG_NAME}=info,kube=off"));
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_level(true)
        .with_ansi(true)
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing();

    tracing::debug!(version = PKG_VERSION, "Starting {PKG_NAME}.");

    match cli.command {
        Commands::Run {
            functions_namespace,
            config,
        } => create_and_run_operator(functions_namespace, config).await?,
        Commands::Crd { command } => match command {
            CrdCommands::Write { file } => write_crd_to_file(file).await?,
            CrdCommands::Print {} => print_crd()?,
            CrdCommands::Install {} => install_crd().await?,
            CrdCommands::Uninstall {} => uninstall_crd().await?,
            CrdCommands::Update {} => update_crd().await?,
        },
        Commands::Function { command } => match command {
            FunctionCommands::Ensure {
                namespace,
                name,
                config,
            } => ensure_function(namespace, name, config).await?,
            FunctionCommands::Delete { namespace, name } => {
                delete_function(namespace, name).await?
            }
        },
    }

    Ok(())
}
