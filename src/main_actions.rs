use crate::{
    cli::ConfigArgs,
    config::ConfigSource,
    crds::defs::{Function, NAME},
    operator::Operator,
    reconciler::{delete_all, ensure},
    store::KubeStore,
};
use anyhow::{Context, Ok, Result as AnyResult};
use either::Either::Left;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    api::PostParams,
    runtime::{conditions, wait::await_condition},
    Api, Client as KubeClient, CustomResourceExt, ResourceExt,
};
use std::path::PathBuf;
use tracing::{trace_span, Instrument};

fn config_source(client: KubeClient, config: ConfigArgs) -> ConfigSource {
    ConfigSource::new(client, config.config_namespace, config.config_name)
}

pub async fn create_and_run_operator(
    functions_namespace: Option<String>,
    config: ConfigArgs,
) -> AnyResult<()> {
    let client = KubeClient::try_default().await?;

    tracing::info!(
        functions_namespace = functions_namespace.as_deref().unwrap_or("*"),
        config_namespace = %config.config_namespace,
        config_name = %config.config_name,
        "Running with current config."
    );

    let span = trace_span!("Create");

    let operator = Operator::new_with_check_functions_namespace(
        client.clone(),
        functions_namespace,
        config_source(client, config),
    )
    .instrument(span)
    .await;

    operator.run().await;

    Ok(())
}

pub async fn ensure_function(namespace: String, name: String, config: ConfigArgs) -> AnyResult<()> {
    let client = KubeClient::try_default().await?;

    let function = Api::<Function>::namespaced(client.clone(), &namespace)
        .get(&name)
        .await
        .context("Failed to get function")?;

    let config = config_source(client.clone(), config)
        .load()
        .await
        .context("Failed to load configuration")?;

    let store = KubeStore::new(client);

    ensure(&store, &config.registry, &config.defaults, &function)
        .instrument(trace_span!("Ensure", %namespace, %name))
        .await
        .context("Failed to ensure function objects")?;

    tracing::info!(%namespace, %name, "Function objects are up to date.");

    Ok(())
}

pub async fn delete_function(namespace: String, name: String) -> AnyResult<()> {
    let client = KubeClient::try_default().await?;
    let store = KubeStore::new(client);

    delete_all(&store, &namespace, &name)
        .instrument(trace_span!("DeleteAll", %namespace, %name))
        .await
        .context("Failed to delete function objects")?;

    Ok(())
}

pub fn generate_crd_yaml() -> AnyResult<String> {
    Function::generate_crd_yaml().context("Failed to generate crd")
}

pub fn print_crd() -> AnyResult<()> {
    println!("{}", generate_crd_yaml()?);
    Ok(())
}

pub async fn write_crd_to_file(path: PathBuf) -> AnyResult<()> {
    let crd = generate_crd_yaml()?;
    tokio::fs::write(path, crd)
        .await
        .context("Failed to write crd to file")?;
    Ok(())
}

pub async fn install_crd() -> AnyResult<()> {
    let client = KubeClient::try_default().await?;

    let api = Api::<CustomResourceDefinition>::all(client);
    api.create(&PostParams::default(), &Function::crd())
        .await
        .with_context(|| format!("Failed to create crd {NAME}"))?;

    tracing::info!(crd = NAME, "Waiting for crd to be established.");
    await_condition(api, NAME, conditions::is_crd_established())
        .await
        .with_context(|| format!("Crd {NAME} was not established"))?;

    tracing::info!(crd = NAME, "Crd installed.");

    Ok(())
}

pub async fn uninstall_crd() -> AnyResult<()> {
    let client = KubeClient::try_default().await?;

    let api = Api::<CustomResourceDefinition>::all(client);
    let deleted = api
        .delete(NAME, &Default::default())
        .await
        .with_context(|| format!("Failed to delete crd {NAME}"))?;

    // Right means the deletion already completed
    let Left(crd) = deleted else {
        tracing::info!(crd = NAME, "Crd removed.");
        return Ok(());
    };

    let Some(uid) = crd.uid() else {
        tracing::warn!(crd = NAME, "Deleted crd has no uid, not waiting for removal.");
        return Ok(());
    };

    tracing::info!(crd = NAME, "Waiting for crd and its functions to be removed.");
    await_condition(api, NAME, conditions::is_deleted(&uid))
        .await
        .with_context(|| format!("Crd {NAME} was not removed"))?;

    tracing::info!(crd = NAME, "Crd removed.");

    Ok(())
}

pub async fn update_crd() -> AnyResult<()> {
    uninstall_crd().await?;
    install_crd().await
}
