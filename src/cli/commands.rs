//! CLI command definitions for tale-publish.
//!
//! `publish` runs the full pipeline for one tale; `classify` is a dry run
//! that only reports where each item's bytes live.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::metrics::{export_metrics, init_metrics};
use crate::publish::{classify, publish_tale, PublishConfig, PublishRequest};
use crate::repository::Network;
use crate::storage::{GirderClient, StorageClient};

/// Default license for published packages.
const DEFAULT_LICENSE: &str = "CC-BY-4.0";

/// Publish Whole Tale packages to a DataONE member node.
#[derive(Parser)]
#[command(name = "tale-publish")]
#[command(about = "Publish Whole Tale packages to DataONE")]
#[command(version)]
#[command(
    long_about = "tale-publish packages the items of a tale together with generated metadata \
(EML record, package info, license, environment archive) and uploads them to a DataONE \
member node, linked by an OAI-ORE resource map.\n\nExample usage:\n  tale-publish publish \
--tale-id 5c9a1b --user-id 5b8f22 item1 item2"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Publish a tale's items as a DataONE package.
    Publish(PublishArgs),

    /// Report where each item's content lives without uploading anything.
    Classify(ClassifyArgs),
}

/// Storage and repository connection options shared by all subcommands.
#[derive(Parser, Debug)]
pub struct ConnectionArgs {
    /// Girder API URL (resolved automatically when unset).
    #[arg(long, env = "GIRDER_API_URL")]
    pub girder_url: Option<String>,

    /// Girder token of the publishing user.
    #[arg(long, env = "GIRDER_TOKEN")]
    pub girder_token: String,

    /// DataONE member node URL.
    #[arg(long, env = "DATAONE_NODE")]
    pub node: Option<String>,

    /// DataONE network (production or development); inferred from the node when unset.
    #[arg(long)]
    pub network: Option<Network>,
}

/// Arguments for `tale-publish publish`.
#[derive(Parser, Debug)]
pub struct PublishArgs {
    /// Ids of the items to include, in the order they should be described.
    #[arg(required = true)]
    pub items: Vec<String>,

    /// Id of the tale being published.
    #[arg(long)]
    pub tale_id: String,

    /// Girder id of the publishing user.
    #[arg(long)]
    pub user_id: String,

    /// SPDX id of the package license (CC0-1.0, CC-BY-3.0, CC-BY-4.0).
    #[arg(long, default_value = DEFAULT_LICENSE)]
    pub license: String,

    /// DataONE JWT of the publishing user.
    #[arg(long, env = "DATAONE_TOKEN")]
    pub dataone_token: String,

    /// Directory holding the license text files.
    #[arg(long)]
    pub license_dir: Option<PathBuf>,

    /// YAML file with provenance fields to add to the package info.
    #[arg(long)]
    pub prov_file: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Print the publish report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Print Prometheus metrics after the run.
    #[arg(long)]
    pub metrics: bool,
}

/// Arguments for `tale-publish classify`.
#[derive(Parser, Debug)]
pub struct ClassifyArgs {
    /// Ids of the items to classify.
    #[arg(required = true)]
    pub items: Vec<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Print the classification as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    init_metrics().context("Failed to initialize metrics")?;
    match cli.command {
        Commands::Publish(args) => run_publish_command(args).await,
        Commands::Classify(args) => run_classify_command(args).await,
    }
}

fn build_config(connection: &ConnectionArgs) -> anyhow::Result<PublishConfig> {
    let mut config = PublishConfig::from_env()?;
    if let Some(url) = &connection.girder_url {
        config = config.with_storage_api_url(url.clone());
    }
    if let Some(node) = &connection.node {
        config = config.with_member_node(node.clone());
    }
    if let Some(network) = connection.network {
        config = config.with_network(network);
    }
    config.validate()?;
    Ok(config)
}

fn read_prov_info(path: &PathBuf) -> anyhow::Result<serde_yaml::Mapping> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read provenance file {}", path.display()))?;
    match serde_yaml::from_str::<serde_yaml::Value>(&text)? {
        serde_yaml::Value::Mapping(mapping) => Ok(mapping),
        serde_yaml::Value::Null => Ok(serde_yaml::Mapping::new()),
        _ => anyhow::bail!("Provenance file {} must hold a YAML mapping", path.display()),
    }
}

async fn run_publish_command(args: PublishArgs) -> anyhow::Result<()> {
    let mut config = build_config(&args.connection)?;
    if let Some(dir) = &args.license_dir {
        config = config.with_license_dir(dir.clone());
    }

    let prov_info = match &args.prov_file {
        Some(path) => read_prov_info(path)?,
        None => serde_yaml::Mapping::new(),
    };

    let request = PublishRequest {
        item_ids: args.items,
        tale_id: args.tale_id,
        user_id: args.user_id,
        license_id: args.license,
        repository_token: args.dataone_token,
        prov_info,
    };

    info!(
        tale = %request.tale_id,
        items = request.item_ids.len(),
        node = %config.member_node,
        "Publishing tale"
    );
    let report = publish_tale(config, &request, &args.connection.girder_token).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Published: {}", report.package_url);
        println!("  Resource map: {}", report.resource_map_pid);
        println!("  Metadata:     {}", report.metadata_pid);
        println!("  Objects:      {}", report.object_pids.len());
        if !report.degraded_steps.is_empty() {
            let steps: Vec<String> = report.degraded_steps.iter().map(|s| s.to_string()).collect();
            println!("  Skipped:      {}", steps.join(", "));
        }
        for name in &report.failed_objects {
            println!("  Not uploaded: {}", name);
        }
    }

    if args.metrics {
        print!("{}", export_metrics());
    }
    Ok(())
}

async fn run_classify_command(args: ClassifyArgs) -> anyhow::Result<()> {
    let config = build_config(&args.connection)?;
    let storage: Arc<dyn StorageClient> = Arc::new(GirderClient::new(
        config.storage_api_url().await,
        args.connection.girder_token.clone(),
        config.http_timeout,
    )?);

    let classified = classify(storage.as_ref(), &args.items, config.network()).await?;

    if args.json {
        let output = serde_json::json!({
            "network": config.network(),
            "dataone": classified.dataone,
            "remote": classified.remote,
            "local": classified.local_refs,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Classified {} items ({})", classified.len(), config.network());
        for (label, items) in [
            ("DataONE", &classified.dataone),
            ("Remote", &classified.remote),
            ("Local", &classified.local_refs),
        ] {
            println!("  {}: {}", label, items.len());
            for item in items {
                println!("    {}", item);
            }
        }
    }
    Ok(())
}
