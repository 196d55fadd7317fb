use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cloudrecon::api::HttpBackend;
use cloudrecon::config::Config;
use cloudrecon::enumeration::{drain_events, Orchestrator, ProgressEvent, RunReport};
use cloudrecon::graph::{build_attack_path, build_escalation_graph, build_topology, techniques};
use cloudrecon::groups::{FileStore, GroupPatch, GroupRegistry};
use cloudrecon::resource::{self, Provider, ResourceFilter, ALL};
use cloudrecon::Credential;
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Cloud resource enumeration through the recon backend
#[derive(Parser, Debug)]
#[command(name = "cloudrecon", version = cloudrecon::VERSION, about, long_about = None)]
struct Args {
    /// Backend base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Value of the Authorization header
    #[arg(long, global = true)]
    token: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enumerate resources for a credential
    Enumerate(EnumerateArgs),
    /// Manage resource groups
    Groups {
        #[command(subcommand)]
        action: GroupsCommand,
    },
    /// List the resource types of a provider
    Types {
        #[arg(long)]
        provider: String,
    },
    /// Print a graph as JSON
    Graph {
        #[command(subcommand)]
        kind: GraphCommand,
    },
}

#[derive(clap::Args, Debug)]
struct CredentialArgs {
    /// Credential id known to the backend (defaults to the last one used)
    #[arg(long)]
    credential_id: Option<u64>,

    /// AWS, GCP, Aliyun or Azure (defaults to the last one used)
    #[arg(long)]
    provider: Option<String>,

    /// Region applied to resources that report none
    #[arg(long, default_value = "")]
    region: String,

    /// Display name of the credential
    #[arg(long)]
    name: Option<String>,
}

#[derive(clap::Args, Debug)]
struct EnumerateArgs {
    #[command(flatten)]
    credential: CredentialArgs,

    /// Comma-separated type codes or aliases
    #[arg(long, value_delimiter = ',', default_value = ALL)]
    types: Vec<String>,

    /// Use the types of a resource group instead of --types
    #[arg(long, conflicts_with = "types")]
    group: Option<String>,

    /// Only show resources of this type
    #[arg(long = "type")]
    resource_type: Option<String>,

    /// Only show resources in this region
    #[arg(long = "in-region")]
    in_region: Option<String>,

    /// Only show resources whose id or name contains this text
    #[arg(long)]
    search: Option<String>,

    /// Print resources as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum GroupsCommand {
    List,
    Create {
        name: String,
        /// Comma-separated type codes
        #[arg(value_delimiter = ',')]
        codes: Vec<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_delimiter = ',')]
        types: Option<Vec<String>>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum GraphCommand {
    /// Networks and the instances inside them
    Topology(CredentialArgs),
    /// Escalation techniques for the credential's permissions
    Escalation(CredentialArgs),
    /// Credential to platform takeover
    AttackPath(CredentialArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled: cannot open {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cloudrecon started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = Config::config_dir() {
        return config_dir.join("cloudrecon.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cloudrecon").join("cloudrecon.log");
    }
    PathBuf::from("cloudrecon.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let mut config = Config::load();

    match args.command {
        Command::Types { ref provider } => {
            print_json(&resource::list_types(&Provider::from_str(provider)))
        }
        Command::Groups { ref action } => run_groups(&config, action),
        Command::Enumerate(ref enumerate) => {
            let orchestrator = orchestrator(&args, &config)?;
            let credential = resolve_credential(&mut config, &enumerate.credential)?;
            run_enumerate(&orchestrator, &config, &credential, enumerate).await
        }
        Command::Graph { ref kind } => {
            let orchestrator = orchestrator(&args, &config)?;
            run_graph(&orchestrator, &mut config, kind).await
        }
    }
}

fn orchestrator(args: &Args, config: &Config) -> Result<Orchestrator<HttpBackend>> {
    let api_url = config.effective_api_url(args.api_url.as_deref());
    let token = config.effective_token(args.token.as_deref());
    tracing::debug!("Using backend {}", api_url);

    let backend = HttpBackend::new(&api_url, token)?;
    Ok(Orchestrator::with_options(backend, config.orchestrator_options()))
}

/// Flags first, then the last credential used
fn resolve_credential(config: &mut Config, args: &CredentialArgs) -> Result<Credential> {
    let Some(id) = args.credential_id.or(config.last_credential_id) else {
        bail!("No credential selected. Pass --credential-id.");
    };
    let Some(provider) = args.provider.clone().or_else(|| config.last_provider.clone()) else {
        bail!("No provider selected. Pass --provider.");
    };

    let mut credential = Credential::new(id, Provider::from_str(&provider), &args.region);
    if let Some(ref name) = args.name {
        credential.name = name.clone();
    }

    if let Err(e) = config.remember_credential(id, credential.provider.as_str()) {
        tracing::warn!("Failed to save config: {:#}", e);
    }

    Ok(credential)
}

/// Token cancelled by Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, cancelling");
            cancel.cancel();
        }
    });
    token
}

async fn run_enumerate(
    orchestrator: &Orchestrator<HttpBackend>,
    config: &Config,
    credential: &Credential,
    args: &EnumerateArgs,
) -> Result<()> {
    let selection = match args.group {
        Some(ref id) => registry(config).apply_selection(id)?,
        None => args.types.clone(),
    };

    // Live progress on stderr
    let mut events = orchestrator.state(credential.id).events();
    let cancel = cancel_on_ctrl_c();
    let run = orchestrator.run(credential, &selection, &cancel);
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            Ok(event) = events.recv() => print_event(&event),
        }
    };
    for event in drain_events(&mut events) {
        print_event(&event);
    }
    let report = result?;

    let filter = ResourceFilter::new(
        args.resource_type.as_deref(),
        args.in_region.as_deref(),
        args.search.as_deref(),
    );
    let shown = filter.apply(&report.resources);

    if args.json {
        return print_json(&shown);
    }

    print_report(&report, &shown);
    Ok(())
}

fn print_event(event: &ProgressEvent) {
    eprintln!(
        "{} {:<16} {:>3}% {}",
        event.status.icon(),
        event.code,
        event.percent,
        event.status.text()
    );
}

fn print_report(report: &RunReport, shown: &[resource::Resource]) {
    for resource in shown {
        println!(
            "{:<16} {:<14} {:<12} {:<24} {}",
            resource.resource_type, resource.region, resource.status, resource.id, resource.name
        );
    }

    println!();
    for (code, count) in resource::summarize_by_type(shown) {
        println!("{:<16} {}", code, count);
    }
    let regions = resource::regions(shown);
    if !regions.is_empty() {
        println!("Regions: {}", regions.join(", "));
    }
    println!("{}", report.summary.status_text());
}

fn registry(config: &Config) -> GroupRegistry<FileStore> {
    GroupRegistry::new(FileStore::new(config.effective_groups_path()))
}

fn run_groups(config: &Config, action: &GroupsCommand) -> Result<()> {
    let registry = registry(config);

    match action {
        GroupsCommand::List => print_json(&registry.list()?),
        GroupsCommand::Create { name, codes } => print_json(&registry.create(name, codes)?),
        GroupsCommand::Update { id, name, types } => {
            let patch = GroupPatch {
                name: name.clone(),
                resources: types.clone(),
            };
            print_json(&registry.update(id, patch)?)
        }
        GroupsCommand::Delete { id } => print_json(&registry.delete(id)?),
    }
}

async fn run_graph(
    orchestrator: &Orchestrator<HttpBackend>,
    config: &mut Config,
    kind: &GraphCommand,
) -> Result<()> {
    let cancel = cancel_on_ctrl_c();

    match kind {
        GraphCommand::Topology(args) => {
            let credential = resolve_credential(config, args)?;
            let report = orchestrator.run(&credential, &[ALL], &cancel).await?;
            print_json(&build_topology(&report.resources))
        }
        GraphCommand::Escalation(args) => {
            let credential = resolve_credential(config, args)?;
            let profile = orchestrator.escalate(&credential, &cancel).await?;
            if profile.is_terminal() {
                eprintln!(
                    "{} already has full access; nothing to escalate",
                    profile.user_type
                );
                return print_json(&profile);
            }
            print_json(&build_escalation_graph(
                &profile,
                techniques(&credential.provider),
            ))
        }
        GraphCommand::AttackPath(args) => {
            let credential = resolve_credential(config, args)?;
            let (report, profile) = futures::try_join!(
                orchestrator.run(&credential, &[ALL], &cancel),
                orchestrator.escalate(&credential, &cancel),
            )?;
            print_json(&build_attack_path(&credential, &profile, &report.resources))
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}
