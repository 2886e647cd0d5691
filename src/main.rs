//! Operator CLI: deploy contracts and check lending pool balances.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use alloy::{primitives::Address, transports::http::reqwest::Url};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lending_deployer::{
    ContractHandle, DeployError, Deployer, WaitConfig, artifact::Artifact, deployer::within,
    pool_summary, provider::connect_http, reader::lending_pool_abi, submit::default_account,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON-RPC endpoint of the node
    #[arg(long, env = "RPC_URL", default_value = "http://127.0.0.1:8545")]
    rpc_url: Url,

    /// Seconds to wait for a deployment to be mined
    #[arg(long, env = "DEPLOY_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,

    /// Delay before the first receipt poll, and the minimum between polls
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_ms: u64,

    /// Upper bound for the growing delay between receipt polls
    #[arg(long, default_value_t = 5_000, value_parser = clap::value_parser!(u64).range(1..))]
    max_poll_interval_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy a contract artifact with constructor arguments
    Deploy {
        #[arg(long, default_value = "artifacts/contracts/Lock.sol/Lock.json")]
        artifact: PathBuf,
        /// Constructor argument, repeat for each parameter in order.
        /// Single-argument constructors get 123 when none is given.
        #[arg(long = "arg")]
        args: Vec<String>,
    },
    /// Deploy the lending pool contract
    #[command(alias = "deploy-lendingPool")]
    DeployLendingPool {
        #[arg(
            long,
            default_value = "artifacts/contracts/LendingPool.sol/LendingBorrowingPool.json"
        )]
        artifact: PathBuf,
    },
    /// Print a lending pool's balance and an account's deposit
    CheckBalance {
        /// Address of the deployed lending pool
        #[arg(long)]
        contract: Address,
        /// Depositor to look up, defaults to the node's first account
        #[arg(long)]
        account: Option<Address>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<DeployError>() {
                Some(deploy_err) => eprintln!("{} failed: {err:#}", deploy_err.phase()),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lending_deployer=info,warn"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(env_filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let timeout = Duration::from_secs(cli.timeout_secs);
    let wait = WaitConfig::new(timeout).with_poll_interval(
        Duration::from_millis(cli.poll_interval_ms),
        Duration::from_millis(cli.max_poll_interval_ms),
    );
    let rpc = connect_http(cli.rpc_url);

    match cli.command {
        Command::Deploy { artifact, args } => {
            let artifact = Artifact::load(&artifact)
                .with_context(|| format!("loading {}", artifact.display()))?;
            let args = artifact.constructor_args_or_default(&args, &["123"])?;
            let handle = Deployer::new(&rpc, wait)
                .deploy_artifact(&artifact, &args)
                .await?;
            println!("{} deployed to: {:#x}", artifact.contract_name, handle.address());
        }
        Command::DeployLendingPool { artifact } => {
            let artifact = Artifact::load(&artifact)
                .with_context(|| format!("loading {}", artifact.display()))?;
            let handle = Deployer::new(&rpc, wait)
                .deploy_lending_pool(&artifact)
                .await?;
            println!("LendingPool deployed at: {:#x}", handle.address());
        }
        Command::CheckBalance { contract, account } => {
            let account = match account {
                Some(account) => account,
                None => within("eth_accounts", timeout, default_account(&rpc)).await?,
            };
            let handle = ContractHandle::new(contract, lending_pool_abi()?);
            let summary = pool_summary(&rpc, &handle, account, timeout).await?;
            println!("{summary}");
        }
    }
    Ok(())
}
