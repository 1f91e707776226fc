use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tagbind::config::{Config, Overrides, Settings};
use tagbind::events::default_sink;
use tagbind::gcp::auth::GcpCredentials;
use tagbind::gcp::client::GcpClient;
use tagbind::gcp::http::error_hint;
use tagbind::tagging::names::encode_tag_binding_name;
use tagbind::tagging::{Created, DeleteTarget, ResourceKind, TagBinding, TagBindingService};
use tagbind::TagError;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Manage GCP tag bindings
#[derive(Parser, Debug)]
#[command(name = "tagbind", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    output: OutputFormat,

    /// Delay between operation polls, in milliseconds
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    /// Give up waiting for an operation after this many seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Reduce a zone location to its region when choosing the API host
    #[arg(long, global = true)]
    derive_region: Option<bool>,

    /// Global API base URL
    #[arg(long, global = true)]
    endpoint: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bind a tag value to a resource
    Create {
        /// Service-account JSON key
        credentials: PathBuf,
        /// Full resource name, e.g. //compute.googleapis.com/projects/p/zones/z/instances/i
        resource_name: String,
        /// tagValues/<id>
        tag_value: String,
        /// Zone or region of the resource
        location: Option<String>,
    },
    /// Delete a tag binding
    Delete {
        /// Service-account JSON key
        credentials: PathBuf,
        /// tagBindings/... name, or a resource name when --tag-value is given
        target: String,
        /// Zone or region of the resource
        location: Option<String>,
        /// Delete the binding of this tag value on the resource named by TARGET
        #[arg(long)]
        tag_value: Option<String>,
    },
    /// List tag bindings on a resource
    ListResource {
        /// Service-account JSON key
        credentials: PathBuf,
        resource_name: String,
        /// Zone or region of the resource
        location: Option<String>,
    },
    /// List tag bindings of a tag value
    ListTag {
        /// Service-account JSON key
        credentials: PathBuf,
        /// tagValues/<id>
        tag_value: String,
        /// Zone or region to search
        location: Option<String>,
    },
    /// Print the canonical name of a resource
    ResourceName {
        /// instance, disk, project, bucket, dataset, table, sql-instance, gke-cluster
        kind: ResourceKind,
        parts: Vec<String>,
    },
    /// Print the display name of a binding
    BindingName {
        resource_name: String,
        tag_value: String,
    },
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let rust_log = std::env::var("RUST_LOG").ok().filter(|v| !v.is_empty());
    let tracing_level = level.to_tracing_level();
    if tracing_level.is_none() && rust_log.is_none() {
        return None;
    }

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
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let max_level = tracing_level.unwrap_or(Level::TRACE);
    let filter = match rust_log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::default().add_directive(LevelFilter::from_level(max_level).into()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(max_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("tagbind started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("tagbind").join("tagbind.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".tagbind").join("tagbind.log");
    }
    PathBuf::from("tagbind.log")
}

/// Usage errors exit 1; `--help` and `--version` exit 0
fn parse_failure_code(error: &clap::Error) -> u8 {
    if error.use_stderr() {
        1
    } else {
        0
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_failure_code(&e));
        }
    };

    let _log_guard = setup_logging(args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {err:?}");
            if let Some(hint) = err.downcast_ref::<TagError>().and_then(error_hint) {
                eprintln!("Hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let output = args.output;
    let overrides = Overrides {
        poll_interval_ms: args.poll_interval_ms,
        operation_timeout_secs: args.timeout_secs,
        derive_region_from_zone: args.derive_region,
        api_endpoint: args.endpoint,
    };

    match args.command {
        Command::Create {
            credentials,
            resource_name,
            tag_value,
            location,
        } => {
            let settings = load_settings(&overrides)?;
            let service = connect(&credentials, &settings).await?;
            let location = location_or_default(location, &settings);
            let created = service
                .create(&resource_name, &tag_value, location.as_deref())
                .await
                .context("Failed to create tag binding")?;
            print_created(output, &created)?;
        }
        Command::Delete {
            credentials,
            target,
            location,
            tag_value,
        } => {
            let settings = load_settings(&overrides)?;
            let service = connect(&credentials, &settings).await?;
            let location = location_or_default(location, &settings);
            let target = match tag_value {
                Some(tag_value) => DeleteTarget::Parts {
                    resource_name: target,
                    tag_value,
                },
                None => DeleteTarget::Name(target),
            };
            service
                .delete(&target, location.as_deref())
                .await
                .context("Failed to delete tag binding")?;
            println!("Deleted {}", target.path());
        }
        Command::ListResource {
            credentials,
            resource_name,
            location,
        } => {
            let settings = load_settings(&overrides)?;
            let service = connect(&credentials, &settings).await?;
            let location = location_or_default(location, &settings);
            let bindings = service
                .list_for_resource(&resource_name, location.as_deref())
                .await
                .context("Failed to list tag bindings")?;
            print_bindings(output, &bindings)?;
        }
        Command::ListTag {
            credentials,
            tag_value,
            location,
        } => {
            let settings = load_settings(&overrides)?;
            let service = connect(&credentials, &settings).await?;
            let location = location_or_default(location, &settings);
            let bindings = service
                .list_for_tag_value(&tag_value, location.as_deref())
                .await
                .context("Failed to list tag bindings")?;
            print_bindings(output, &bindings)?;
        }
        Command::ResourceName { kind, parts } => {
            let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
            let name = kind.format(&parts)?;
            print_value(output, &name);
        }
        Command::BindingName {
            resource_name,
            tag_value,
        } => {
            print_value(output, &encode_tag_binding_name(&resource_name, &tag_value));
        }
    }

    Ok(())
}

fn load_settings(overrides: &Overrides) -> Result<Settings> {
    let settings = Config::load()
        .effective(overrides)
        .context("Invalid configuration")?;
    tracing::info!("Using settings: {:?}", settings);
    Ok(settings)
}

async fn connect(credentials: &Path, settings: &Settings) -> Result<TagBindingService<GcpClient>> {
    let credentials = GcpCredentials::from_service_account_file(credentials)
        .context("Failed to load credentials")?;

    match credentials.project_id().await {
        Some(project) => tracing::info!("Using service account of project: {}", project),
        None => tracing::warn!("Service account key does not name a project"),
    }

    let sink = default_sink();
    let client = GcpClient::new(credentials, sink.clone())?;

    Ok(TagBindingService::new(
        client,
        settings.resolver()?,
        settings.poll,
        sink,
    ))
}

fn location_or_default(location: Option<String>, settings: &Settings) -> Option<String> {
    location
        .filter(|l| !l.trim().is_empty())
        .or_else(|| settings.default_location.clone())
}

fn print_value(output: OutputFormat, value: &str) {
    match output {
        OutputFormat::Text => println!("{}", value),
        OutputFormat::Json => println!("{}", serde_json::Value::String(value.to_string())),
    }
}

fn print_created(output: OutputFormat, created: &Created) -> Result<()> {
    match (output, created) {
        (OutputFormat::Json, Created::Binding(binding)) => {
            println!("{}", serde_json::to_string_pretty(binding)?)
        }
        (OutputFormat::Json, Created::Operation(operation)) => {
            println!("{}", serde_json::to_string_pretty(operation)?)
        }
        (OutputFormat::Text, Created::Binding(binding)) => {
            println!("Created {}", binding_line(binding))
        }
        (OutputFormat::Text, Created::Operation(operation)) => {
            let name = operation
                .get("name")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("(unnamed operation)");
            println!("Created (operation {})", name)
        }
    }
    Ok(())
}

fn print_bindings(output: OutputFormat, bindings: &[TagBinding]) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(bindings)?),
        OutputFormat::Text => {
            if bindings.is_empty() {
                println!("No tag bindings found");
            }
            for binding in bindings {
                println!("{}", binding_line(binding));
            }
        }
    }
    Ok(())
}

fn binding_line(binding: &TagBinding) -> String {
    format!(
        "{}  {}  {}",
        binding.name.as_deref().unwrap_or("-"),
        binding.parent,
        binding.tag_value
    )
}
