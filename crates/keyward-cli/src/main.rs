//! Keyward CLI — the dashboard, from the terminal.
//!
//! Talks to the Keyward REST API with a bearer token and drives the
//! key-creation flow: `intent encode` produces the dashboard URL that
//! carries a half-filled key, `keys create --from-url` consumes it.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cloud;
mod flow;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use keyward_client::{Keyward, KeywardConfig, ProjectStore};
use keyward_core::{DomainTable, IntentDraft, QueryParams};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

// ── CLI structure ────────────────────────────────────────────────────

/// Keyward — proxied API keys with device attestation.
#[derive(Parser)]
#[command(
    name = "keyward",
    version,
    about = "Keyward CLI — manage projects, proxied keys, and device attestation",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         KEYWARD_API_URL        API base URL (default: https://api.keyward.dev)\n  \
         KEYWARD_TOKEN          Bearer token\n  \
         KEYWARD_DASHBOARD_URL  Dashboard URL (default: https://app.keyward.dev)\n\n\
         {DIM}Examples:{RESET}\n  \
         keyward intent encode --name OpenAI --rate-limit 60\n  \
         keyward keys create --from-url 'https://app.keyward.dev/projects/…?name=OpenAI'\n  \
         keyward projects list"
    ),
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// API base URL.
    #[arg(
        long,
        global = true,
        env = "KEYWARD_API_URL",
        default_value = "https://api.keyward.dev"
    )]
    api_url: String,

    /// Bearer token.
    #[arg(long, global = true, env = "KEYWARD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Dashboard base URL used for generated links.
    #[arg(
        long,
        global = true,
        env = "KEYWARD_DASHBOARD_URL",
        default_value = "https://app.keyward.dev"
    )]
    dashboard_url: String,

    /// Log filter (overridden by `RUST_LOG`).
    #[arg(long, global = true, env = "KEYWARD_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Request timeout in seconds.
    #[arg(long, global = true, env = "KEYWARD_TIMEOUT", default_value = "10")]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode or decode key-creation intents.
    Intent {
        #[command(subcommand)]
        action: IntentCommands,
    },
    /// Default whitelisted-domain suggestions.
    Domains {
        #[command(subcommand)]
        action: DomainCommands,
    },
    /// Project management.
    Projects {
        #[command(subcommand)]
        action: ProjectCommands,
    },
    /// Proxied key management.
    Keys {
        #[command(subcommand)]
        action: KeyCommands,
    },
    /// Apple DeviceCheck and Google Play Integrity settings.
    Attestation {
        #[command(subcommand)]
        action: AttestationCommands,
    },
    /// Subscription and tier limits.
    Billing {
        #[command(subcommand)]
        action: BillingCommands,
    },
    /// Show the signed-in user.
    Whoami,
}

/// Key fields shared by `intent encode` and `keys create`.
#[derive(Args)]
struct IntentArgs {
    /// Key name.
    #[arg(long)]
    name: Option<String>,
    /// Upstream API key (travels in the URL when encoded).
    #[arg(long)]
    key: Option<String>,
    /// Description.
    #[arg(long)]
    description: Option<String>,
    /// Allow browser (CORS) access.
    #[arg(long)]
    allows_web: bool,
    /// Comma-separated whitelisted domains.
    #[arg(long, value_delimiter = ',')]
    whitelist: Option<Vec<String>>,
    /// Requests per minute; omit for unlimited.
    #[arg(long, allow_negative_numbers = true)]
    rate_limit: Option<i64>,
}

impl IntentArgs {
    fn to_draft(&self) -> IntentDraft {
        IntentDraft {
            name: self.name.clone(),
            key: self.key.clone(),
            description: self.description.clone(),
            allows_web: self.allows_web.then_some(true),
            whitelisted_urls: self.whitelist.clone(),
            rate_limit: self.rate_limit,
        }
    }
}

#[derive(Subcommand)]
enum IntentCommands {
    /// Build the dashboard URL that resumes key creation.
    Encode {
        #[command(flatten)]
        fields: IntentArgs,
        /// Target project id (default: the project chooser).
        #[arg(long)]
        project: Option<uuid::Uuid>,
        /// Do not ask the dashboard to open the creation modal.
        #[arg(long)]
        no_open: bool,
        /// Do not infer a whitelisted domain from the name.
        #[arg(long)]
        no_suggest: bool,
        /// Print only the query string.
        #[arg(long)]
        query_only: bool,
    },
    /// Decode a query string or dashboard URL.
    Decode {
        /// Query string or full URL.
        input: String,
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DomainCommands {
    /// Suggest a whitelisted domain for a key name.
    Suggest {
        /// Key name, e.g. "OpenAI prod".
        name: String,
    },
    /// List the built-in suggestions.
    List,
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// List projects.
    List,
    /// Create a project.
    Create {
        /// Project name.
        name: String,
        /// Description.
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete a project (by id or name) and all its keys.
    Delete {
        project: String,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// List proxied keys of a project.
    List {
        /// Project id or name.
        project: String,
    },
    /// Create a proxied key, optionally resuming a dashboard URL.
    Create {
        /// Project id or name (default: taken from `--from-url`).
        project: Option<String>,
        /// Dashboard URL or query produced by `intent encode`.
        #[arg(long)]
        from_url: Option<String>,
        #[command(flatten)]
        fields: IntentArgs,
    },
    /// Delete a proxied key.
    Delete {
        /// Project id or name.
        project: String,
        /// Key id.
        key_id: uuid::Uuid,
    },
}

#[derive(Subcommand)]
enum AttestationCommands {
    /// Apple DeviceCheck settings.
    #[command(name = "device-check")]
    DeviceCheck {
        #[command(subcommand)]
        action: DeviceCheckCommands,
    },
    /// Google Play Integrity settings.
    #[command(name = "play-integrity")]
    PlayIntegrity {
        #[command(subcommand)]
        action: PlayIntegrityCommands,
    },
}

#[derive(Subcommand)]
enum DeviceCheckCommands {
    /// Show settings.
    Get { project: String },
    /// Replace settings.
    Set {
        project: String,
        /// Apple developer team id.
        #[arg(long)]
        team_id: String,
        /// DeviceCheck key id.
        #[arg(long)]
        key_id: String,
        /// Path to the `.p8` private key.
        #[arg(long)]
        private_key_file: String,
        /// Allowed bundle ids (repeatable).
        #[arg(long = "bundle-id")]
        bundle_ids: Vec<String>,
        /// Store the settings but leave enforcement off.
        #[arg(long)]
        disabled: bool,
    },
}

#[derive(Subcommand)]
enum PlayIntegrityCommands {
    /// Show settings.
    Get { project: String },
    /// Replace settings.
    Set {
        project: String,
        /// Android package name.
        #[arg(long)]
        package: String,
        /// Path to the service-account JSON key file.
        #[arg(long)]
        service_account: String,
        /// Store the settings but leave enforcement off.
        #[arg(long)]
        disabled: bool,
    },
}

#[derive(Subcommand)]
enum BillingCommands {
    /// Show the current subscription and its limits.
    Status,
}

impl GlobalArgs {
    fn client(&self) -> Result<Keyward> {
        Keyward::with_config(KeywardConfig {
            token: self.token.clone().unwrap_or_default(),
            base_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout),
            ..Default::default()
        })
        .context("failed to configure API client")
    }

    fn store(&self) -> Result<ProjectStore> {
        Ok(ProjectStore::new(self.client()?))
    }
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    eprintln!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn yes_no(value: bool) -> String {
    if value {
        format!("{GREEN}yes{RESET}")
    } else {
        format!("{DIM}no{RESET}")
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{text}");
    Ok(())
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.global.log_level);

    match run(&cli.global, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(global: &GlobalArgs, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Intent { action } => cmd_intent(global, action),
        Commands::Domains { action } => cmd_domains(&action),
        Commands::Projects { action } => cloud::cmd_projects(&global.store()?, action).await,
        Commands::Keys { action } => cloud::cmd_keys(&global.store()?, action).await,
        Commands::Attestation { action } => {
            cloud::cmd_attestation(&global.store()?, action).await
        }
        Commands::Billing { action } => cloud::cmd_billing(&global.client()?, &action).await,
        Commands::Whoami => cloud::cmd_whoami(&global.client()?).await,
    }
}

// ── Intent commands ──────────────────────────────────────────────────

fn cmd_intent(global: &GlobalArgs, action: IntentCommands) -> Result<()> {
    match action {
        IntentCommands::Encode {
            fields,
            project,
            no_open,
            no_suggest,
            query_only,
        } => {
            let mut draft = fields.to_draft();
            let table = DomainTable::builtin();
            let suggestion = if no_suggest {
                None
            } else {
                flow::apply_domain_suggestion(&mut draft, &table)
            };
            if let Some(domain) = suggestion {
                tracing::info!(domain, "whitelist inferred from key name");
                eprintln!("{DIM}whitelist inferred from name: {domain}{RESET}");
            }
            if draft.key.as_deref().is_some_and(|k| !k.is_empty()) {
                warning(
                    "the upstream key is embedded in the URL and will appear in browser history",
                );
            }

            let query = keyward_core::encode(&draft, !no_open);
            if query_only {
                println!("{query}");
            } else {
                println!("{}", flow::dashboard_url(&global.dashboard_url, project, &query));
            }
            Ok(())
        }
        IntentCommands::Decode { input, json } => {
            let params = QueryParams::parse(&input);
            let resumed = keyward_core::resume(&input);
            if json {
                return print_json(&resumed);
            }

            let intent = &resumed.intent;
            header("🔑", "Key-creation intent");
            kv_line("Name", &intent.name);
            kv_line("Key", if intent.key.is_empty() { "" } else { "[provided]" });
            kv_line("Description", &intent.description);
            kv_line("Allows web", &yes_no(intent.allows_web));
            kv_line("Whitelisted URLs", &intent.whitelisted_urls.join(", "));
            kv_line("Rate limit", &intent.rate_limit.to_string());
            kv_line("Auto-open", &yes_no(resumed.auto_open));
            if let Some(project) = flow::project_from_url(&input) {
                kv_line("Project", &project.to_string());
            }
            if !intent.has_content() && !params.is_empty() {
                warning("no recognized key-creation fields in input");
            }
            println!();
            Ok(())
        }
    }
}

fn cmd_domains(action: &DomainCommands) -> Result<()> {
    let table = DomainTable::builtin();
    match action {
        DomainCommands::Suggest { name } => {
            let Some(domain) = table.suggest(name) else {
                bail!("no default domain known for '{name}'");
            };
            println!("{domain}");
            Ok(())
        }
        DomainCommands::List => {
            header("🌐", "Built-in domain suggestions");
            for (fragment, domain) in table.entries() {
                kv_line(fragment, domain);
            }
            println!();
            Ok(())
        }
    }
}
