use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Number;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    /// Node base URL
    #[arg(long, global = true, default_value = "http://127.0.0.1:5000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine a block on the node
    Mine,
    /// Submit a transaction
    Submit {
        #[arg(long)]
        sender: String,
        #[arg(long)]
        recipient: String,
        /// Non-negative number, fractions allowed
        #[arg(long)]
        amount: Number,
    },
    /// Print the node's full chain
    Chain,
    /// Print transactions waiting for the next block
    Pending,
    /// Register peer addresses, e.g. http://10.0.0.1:5000
    Register {
        #[arg(required = true)]
        nodes: Vec<String>,
    },
    /// Run consensus against the node's peers
    Resolve,
}

#[derive(Serialize)]
struct Tx {
    sender: String,
    recipient: String,
    amount: Number,
}

#[derive(Serialize)]
struct Nodes {
    nodes: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();

    let request = match cli.cmd {
        Command::Mine => client.get(format!("{node}/mine")),
        Command::Submit {
            sender,
            recipient,
            amount,
        } => client
            .post(format!("{node}/transactions/new"))
            .json(&Tx {
                sender,
                recipient,
                amount,
            }),
        Command::Chain => client.get(format!("{node}/chain")),
        Command::Pending => client.get(format!("{node}/transactions/pending")),
        Command::Register { nodes } => client
            .post(format!("{node}/nodes/register"))
            .json(&Nodes { nodes }),
        Command::Resolve => client.get(format!("{node}/nodes/resolve")),
    };
    debug!(?request, "sending request");

    let res = request.send().await?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
