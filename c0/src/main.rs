//! c0 - core0 command-line client
//!
//! Submits commands to a remote executor and prints their results.

use std::collections::HashMap;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use core0::cli::{BridgeCommand, Cli, Command, ContainerCommand, InfoKind};
use core0::{
    Client, CommandResult, Config, ContainerCreateArguments, CorrelationId, Dispatch, ResultHandle, SystemOptions,
    arguments_from,
};

fn setup_logging(verbose: bool) {
    // Logs go to stderr so stdout stays clean for results
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

/// Apply command-line overrides on top of the loaded config
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(host) = &cli.host {
        config.redis.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.redis.port = port;
    }
    if let Some(password) = &cli.password {
        config.redis.password = Some(password.clone());
    }
    if let Some(db) = cli.db {
        config.redis.db = db;
    }
    if let Some(timeout) = cli.timeout {
        config.timeouts.default_secs = timeout;
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);
    config.validate().context("Invalid configuration")?;

    info!(
        "c0 using redis {}:{} db={} queue={}",
        config.redis.host, config.redis.port, config.redis.db, config.queue.input
    );

    let client = Client::new(&config).context("Failed to create client")?;

    let code = match cli.command {
        Command::Raw {
            command,
            arguments,
            no_wait,
        } => cmd_raw(&client, &command, arguments.as_deref(), no_wait).await,
        Command::System {
            cmdline,
            dir,
            stdin,
            no_wait,
        } => {
            let options = SystemOptions {
                dir,
                stdin,
                env: None,
            };
            submit(client.system(&cmdline, options).await?, no_wait).await
        }
        Command::Bash { script, no_wait } => submit(client.bash(&script).await?, no_wait).await,
        Command::Result { id } => wait_and_print(&client.response_for(CorrelationId::from(id))).await,
        Command::Info { kind } => cmd_info(&client, kind).await,
        Command::Container { command } => cmd_container(&client, command).await,
        Command::Bridge { command } => cmd_bridge(&client, command).await,
    };

    client.close().await;
    code
}

/// Submit a raw command
async fn cmd_raw(client: &Client, command: &str, arguments: Option<&str>, no_wait: bool) -> Result<ExitCode> {
    let arguments = match arguments {
        Some(json) => {
            let value: Value = serde_json::from_str(json).context("Failed to parse arguments as JSON")?;
            arguments_from(&value).context("Invalid arguments")?
        }
        None => Default::default(),
    };

    let handle = client.raw(command, arguments).await?;
    submit(handle, no_wait).await
}

/// Print the ID and return, or wait for the result
async fn submit(handle: ResultHandle, no_wait: bool) -> Result<ExitCode> {
    if no_wait {
        println!("{}", handle.id());
        return Ok(ExitCode::SUCCESS);
    }
    wait_and_print(&handle).await
}

async fn wait_and_print(handle: &ResultHandle) -> Result<ExitCode> {
    debug!(id = %handle.id(), "wait_and_print: called");
    match handle.get().await? {
        Some(result) => Ok(print_result(&result)),
        None => {
            eprintln!(
                "{} no result for {} within {}s",
                "timeout:".yellow().bold(),
                handle.id(),
                handle.default_timeout().as_secs()
            );
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_result(result: &CommandResult) -> ExitCode {
    print!("{}", result);
    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        eprintln!("{} command finished with state {}", "error:".red().bold(), result.state());
        ExitCode::FAILURE
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_info(client: &Client, kind: InfoKind) -> Result<ExitCode> {
    let info = client.info();
    let value = match kind {
        InfoKind::Cpu => info.cpu().await?,
        InfoKind::Nic => info.nic().await?,
        InfoKind::Mem => info.mem().await?,
        InfoKind::Disk => info.disk().await?,
        InfoKind::Os => info.os().await?,
    };
    print_json(&value)?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_container(client: &Client, command: ContainerCommand) -> Result<ExitCode> {
    let containers = client.container();
    match command {
        ContainerCommand::List => {
            let mut list: Vec<_> = containers.list().await?.into_iter().collect();
            list.sort_by_key(|(id, _)| *id);

            if list.is_empty() {
                println!("No containers running");
                return Ok(ExitCode::SUCCESS);
            }

            println!("{:<6} {:<8} {:<24} {}", "ID".bold(), "PID".bold(), "ROOT".bold(), "PLIST".bold());
            for (id, container) in list {
                println!(
                    "{:<6} {:<8} {:<24} {}",
                    id, container.pid, container.root, container.arguments.plist
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        ContainerCommand::Create {
            plist,
            mounts,
            zerotier,
            bridges,
        } => {
            let mut arguments = ContainerCreateArguments::new(plist);
            arguments.mount = mounts.into_iter().collect::<HashMap<_, _>>();
            arguments.network.zerotier = zerotier;
            arguments.network.bridge = bridges;

            let id = containers.create(&arguments).await?;
            println!("{}", id);
            Ok(ExitCode::SUCCESS)
        }
        ContainerCommand::Terminate { id } => {
            containers.terminate(id).await?;
            println!("Container {} terminated", id);
            Ok(ExitCode::SUCCESS)
        }
        ContainerCommand::System { id, cmdline } => {
            let handle = containers
                .client(id)
                .system(&cmdline, SystemOptions::default())
                .await?;
            wait_and_print(&handle).await
        }
    }
}

async fn cmd_bridge(client: &Client, command: BridgeCommand) -> Result<ExitCode> {
    let bridges = client.bridge();
    match command {
        BridgeCommand::List => print_json(&bridges.list().await?)?,
        BridgeCommand::Create { name, hwaddr } => print_json(&bridges.create(&name, hwaddr.as_deref()).await?)?,
        BridgeCommand::Delete { name } => {
            bridges.delete(&name).await?;
            println!("Bridge {} deleted", name);
        }
    }
    Ok(ExitCode::SUCCESS)
}
