use clap::{Parser, Subcommand};
use quorum_fs::client::agent::CacheAgent;
use quorum_fs::client::types::ERROR_TAG;
use quorum_fs::cluster::config::ClusterConfig;
use quorum_fs::cluster::types::NodeId;
use quorum_fs::storage::node::StorageNode;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quorum_fs", about = "Quorum-replicated file store")]
struct Cli {
    /// JSON cluster config. The built-in three-node localhost cluster is used when omitted.
    #[arg(long, global = true, env = "QFS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a storage node.
    Node {
        /// Node name as listed in the config (e.g. "New York").
        name: String,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Run a cache agent with an interactive shell.
    Client {
        /// Port the agent listens on for invalidations.
        port: u16,
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Arc::new(ClusterConfig::load_or_default(cli.config.as_deref())?);

    match cli.command {
        Command::Node { name, data_dir } => run_node(config, name, data_dir).await,
        Command::Client {
            port,
            host,
            cache_dir,
        } => run_client(config, host, port, cache_dir).await,
    }
}

async fn run_node(
    config: Arc<ClusterConfig>,
    name: String,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let id = NodeId::new(name);
    let data_dir = data_dir.unwrap_or_else(|| StorageNode::default_data_dir(&id));

    tracing::info!("Starting node {} (data in {})", id, data_dir.display());
    tracing::info!(
        "Primary for: {:?}",
        config.ownership.files_owned_by(&id).collect::<Vec<_>>()
    );

    let node = StorageNode::open(&id, config, data_dir).await?;
    node.run().await
}

async fn run_client(
    config: Arc<ClusterConfig>,
    host: String,
    port: u16,
    cache_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let cache_dir = cache_dir.unwrap_or_else(|| CacheAgent::default_cache_dir(port));
    let agent = CacheAgent::open(host, port, config, cache_dir).await?;
    let listener = agent.clone().start().await?;

    let result = interactive_loop(&agent).await;
    listener.abort();
    result
}

async fn interactive_loop(agent: &CacheAgent) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"\nCommands: READ <filename>, WRITE <filename> <content>, EXIT\n")
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let mut parts = line.trim().splitn(3, ' ');
        let op = parts.next().unwrap_or_default().to_uppercase();

        let output = match (op.as_str(), parts.next(), parts.next()) {
            ("", _, _) => continue,
            ("EXIT", _, _) => break,
            ("READ", Some(filename), _) => match agent.read(filename).await {
                Ok(outcome) => format!("[{}] Content: {}", outcome.source, outcome.content),
                Err(e) => format!("[{}] {}", ERROR_TAG, e),
            },
            ("READ", None, _) => "Usage: READ <filename>".to_string(),
            ("WRITE", Some(filename), Some(content)) => {
                match agent.write(filename, content).await {
                    Ok(response) => format!("Response: {}", response.message_or_default()),
                    Err(e) => format!("Response: {}", e),
                }
            }
            ("WRITE", _, _) => "Usage: WRITE <filename> <content>".to_string(),
            _ => "Unknown command".to_string(),
        };

        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }

    Ok(())
}
