use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rein_autonomy::{Responder, ScriptedResponder};
use rein_config::{ConfigLoader, ReinConfig, WarningSeverity};
use rein_runtime::Engine;

use crate::responder::TerminalResponder;

mod execute;
mod hook;
mod init;
mod status;
mod watch;

/// 🧭 Rein — feedback-controlled autonomy for automated project changes
#[derive(Parser)]
#[command(name = "rein", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to rein.toml (or a legacy rules.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one operation through the decision pipeline
    Execute {
        /// Operation type, e.g. add-function, add-dependency
        #[arg(name = "type")]
        kind: String,
        /// Human-readable description
        #[arg(short, long)]
        description: Option<String>,
        /// File the operation targets
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Type-specific payload as JSON, e.g. '{"package": "serde"}'
        #[arg(short, long)]
        payload: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show thresholds and per-type rules
    Check,
    /// Show per-type success rates and resulting status
    Trust {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List operations waiting for review
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Present the decision queue for approval
    Approve,
    /// Summarize recent executions
    Audit {
        /// Number of trailing days to include
        #[arg(short, long, default_value = "7")]
        days: u32,
    },
    /// Watch the project and run changes through the pipeline
    Watch {
        /// Directories to watch (default from observer.paths)
        #[arg(short, long, num_args = 1..)]
        paths: Vec<PathBuf>,
    },
    /// Editor hook protocol; reads a JSON event, prints a JSON response
    Hook {
        #[arg(value_enum)]
        stage: hook::HookStage,
        /// File holding the event JSON ("-" for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Audit configuration and environment
    Doctor,
    /// Create rein.toml and the state directory in the current project
    Init,
    /// Restore a checkpoint by label (lists checkpoints when omitted)
    Rollback { label: Option<String> },
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Show version and build info
    Version,
}

impl Cli {
    pub async fn run(self) -> rein_core::Result<()> {
        let root = std::env::current_dir()?;

        // Load config first so we can use it for log format
        let config_loader = ConfigLoader::load(self.config.as_deref(), &root)?;
        let config = config_loader.shared();

        // Resolve log level: --verbose > --quiet > --log-level > config default
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level
                .as_deref()
                .unwrap_or(config.logging.level.as_str())
        };
        init_tracing(log_level, &config.logging.format);

        match self.command {
            Commands::Execute {
                kind,
                description,
                file,
                payload,
                json,
            } => execute::cmd_execute(config, &root, kind, description, file, payload, json).await,
            Commands::Check => status::cmd_check(&config),
            Commands::Trust { json } => status::cmd_trust(config, &root, json),
            Commands::Queue { json } => execute::cmd_queue(config, &root, json),
            Commands::Approve => execute::cmd_approve(config, &root).await,
            Commands::Audit { days } => status::cmd_audit(config, &root, days),
            Commands::Watch { paths } => watch::cmd_watch(config, &root, paths).await,
            Commands::Hook { stage, input } => hook::cmd_hook(config, &root, stage, &input).await,
            Commands::Config { json } => Self::cmd_config(&config, json),
            Commands::Doctor => Self::cmd_doctor(&config, &root, config_loader.path()),
            Commands::Init => {
                init::cmd_init(&root, config_loader.path(), &config.persistence.state_dir)
            }
            Commands::Rollback { label } => execute::cmd_rollback(config, &root, label).await,
            Commands::Completions { shell } => Self::cmd_completions(shell),
            Commands::Version => Self::cmd_version(),
        }
    }

    fn cmd_config(config: &ReinConfig, json: bool) -> rein_core::Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(config)?);
        } else {
            let rendered = toml::to_string_pretty(config)
                .map_err(|e| rein_core::ReinError::Config(format!("cannot render config: {e}")))?;
            println!("{rendered}");
        }
        Ok(())
    }

    fn cmd_doctor(config: &ReinConfig, root: &Path, config_path: &Path) -> rein_core::Result<()> {
        println!("🩺 Rein Doctor — Configuration Audit");
        println!();

        // Run structured validation
        let warnings = match config.validate() {
            Ok(w) => w,
            Err(e) => {
                println!("{e}");
                return Ok(());
            }
        };

        let mut warn_count = 0;
        let mut info_count = 0;
        for w in &warnings {
            println!("  {w}");
            match w.severity {
                WarningSeverity::Warning => warn_count += 1,
                WarningSeverity::Info => info_count += 1,
                WarningSeverity::Error => {}
            }
        }

        // Environment checks beyond the config itself
        let mut ok_count = 0;
        let mut check = |ok: bool, problem: String| {
            if ok {
                ok_count += 1;
            } else {
                println!("  💡 {problem}");
                info_count += 1;
            }
        };
        check(
            config_path.exists(),
            format!("{} not found, running on defaults (try `rein init`)", config_path.display()),
        );
        check(
            !config.checkpoint.enabled || root.join(".git").exists(),
            "checkpoint.enabled: project is not a git repository, no checkpoints will be taken".into(),
        );
        check(
            config.verification.command.is_some(),
            "verification.command: not set, operations requiring tests will not be verified".into(),
        );
        check(
            root.join(&config.verification.tests_dir).is_dir(),
            format!(
                "verification.tests_dir: {} does not exist, verification is skipped",
                config.verification.tests_dir.display()
            ),
        );
        check(
            root.join(&config.persistence.state_dir).is_dir(),
            format!(
                "persistence.state_dir: {} does not exist yet (created on first run)",
                config.persistence.state_dir.display()
            ),
        );

        println!();
        println!("  ✅ {ok_count} checks passed, ⚠️  {warn_count} warnings, 💡 {info_count} suggestions");
        Ok(())
    }

    fn cmd_version() -> rein_core::Result<()> {
        println!("🧭 Rein v{}", env!("CARGO_PKG_VERSION"));
        println!("   Rust edition: 2024");
        println!("   Target: {}", std::env::consts::ARCH);
        println!("   OS: {}", std::env::consts::OS);
        #[cfg(debug_assertions)]
        println!("   Profile: debug");
        #[cfg(not(debug_assertions))]
        println!("   Profile: release");
        Ok(())
    }

    fn cmd_completions(shell: Shell) -> rein_core::Result<()> {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "rein", &mut std::io::stdout());
        Ok(())
    }
}

/// Logs go to stderr so stdout stays parseable for `--json` and hooks.
fn init_tracing(level: &str, format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        "json" => builder.json().with_target(true).init(),
        "compact" => builder.compact().with_target(false).init(),
        _ => builder.with_target(false).init(),
    }
}

/// The responder used by interactive commands: the terminal when attached to
/// one, otherwise a responder that declines and defers.
fn interactive_responder() -> Arc<dyn Responder> {
    if console::user_attended() {
        Arc::new(TerminalResponder::new())
    } else {
        Arc::new(ScriptedResponder::new())
    }
}

fn build_engine(config: Arc<ReinConfig>, root: &Path, responder: Arc<dyn Responder>) -> Engine {
    Engine::builder(config, root).responder(responder).build()
}
