//! Operator tool for mailspool mailers
//!
//! Every invocation is one unit of work: memory spools filled while it runs
//! are flushed when it ends successfully.

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use mailspool::{
    Config, FlushTrigger, MailerRegistry,
    commands::{self, NewEmail, SpoolDebug, SpoolSend, TestEmail},
};
use mailspool_common::{internal, logging};

/// Inspect and drive mailspool mailers
#[derive(Parser, Debug)]
#[command(name = "mailspool")]
#[command(about = "Inspect and flush mail spools", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to MAILSPOOL_CONFIG, then the usual locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the configured mailers
    Debug {
        /// Only show this mailer
        name: Option<String>,
    },
    /// Spool commands
    Spool {
        #[command(subcommand)]
        action: SpoolAction,
    },
    /// Send a test email to check a mailer's configuration
    Test {
        /// Where to send the test email
        email: Option<String>,

        /// Sender address
        #[arg(short, long, default_value = "noreply@example.com")]
        from: String,

        /// Subject line
        #[arg(short = 'u', long, default_value = "Mailspool Test Email")]
        subject: String,

        /// Only test this mailer
        #[arg(long)]
        mailer: Option<String>,

        /// Flush the mailer's spool after queueing the email
        #[arg(long)]
        flush: bool,
    },
    /// Compose emails
    Email {
        #[command(subcommand)]
        action: EmailAction,
    },
}

#[derive(Subcommand, Debug)]
enum SpoolAction {
    /// Show the messages waiting in file spools
    Debug {
        /// Only this mailer
        #[arg(long)]
        mailer: Option<String>,

        /// Maximum number of messages listed, 0 for no limit
        #[arg(long, default_value = "10")]
        max_messages: usize,

        /// Maximum number of recipients listed per message, 0 for no limit
        #[arg(long, default_value = "5")]
        max_recipients: usize,
    },
    /// Send the queued messages now
    Send {
        /// Only this mailer
        #[arg(long)]
        mailer: Option<String>,

        /// Maximum number of messages to send
        #[arg(long)]
        message_limit: Option<usize>,

        /// Stop sending after this many seconds
        #[arg(long)]
        time_limit: Option<u64>,

        /// Seconds after which an interrupted send is retried
        #[arg(long)]
        recover_timeout: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum EmailAction {
    /// Create and send a simple email
    New {
        #[arg(short, long)]
        from: String,

        /// Recipients, comma separated
        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        subject: String,

        #[arg(short, long)]
        body: String,

        #[arg(long, default_value = "text/html")]
        content_type: String,

        #[arg(long, default_value = "UTF-8")]
        charset: String,

        /// Defaults to the default mailer
        #[arg(long)]
        mailer: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => find_config_file()?,
    };
    let config = Config::from_file(&config_path)?;
    let registry = Arc::new(MailerRegistry::from_config(&config)?);
    let trigger = FlushTrigger::new(Arc::clone(&registry));

    let (result, report) = trigger
        .run_unit(run(cli.command, &registry, &config))
        .await;

    if report.sent() > 0 {
        internal!(
            level = INFO,
            "Flushed {} spooled messages on exit",
            report.sent()
        );
    }

    result
}

async fn run(command: Commands, registry: &MailerRegistry, config: &Config) -> anyhow::Result<()> {
    let mut out = std::io::stdout();

    match command {
        Commands::Debug { name } => commands::debug(registry, name.as_deref(), &mut out),
        Commands::Spool { action } => match action {
            SpoolAction::Debug {
                mailer,
                max_messages,
                max_recipients,
            } => {
                let options = SpoolDebug {
                    mailer,
                    max_messages,
                    max_recipients,
                };
                commands::debug_spool(registry, &options, &mut out).await
            }
            SpoolAction::Send {
                mailer,
                message_limit,
                time_limit,
                recover_timeout,
            } => {
                let options = SpoolSend {
                    mailer,
                    message_limit,
                    time_limit: time_limit.map(Duration::from_secs),
                    recover_timeout: recover_timeout
                        .map_or_else(|| config.flush.recover_timeout(), Duration::from_secs),
                };
                commands::send_spool(registry, &options, &mut out).await
            }
        },
        Commands::Test {
            email,
            from,
            subject,
            mailer,
            flush,
        } => {
            let options = TestEmail {
                email,
                from,
                subject,
                mailer,
                flush,
            };
            commands::test_email(registry, &options, &mut out).await
        }
        Commands::Email {
            action:
                EmailAction::New {
                    from,
                    to,
                    subject,
                    body,
                    content_type,
                    charset,
                    mailer,
                },
        } => {
            let options = NewEmail {
                from,
                to,
                subject,
                body,
                content_type,
                charset,
                mailer,
            };
            commands::new_email(registry, &options, &mut out).await
        }
    }
}

/// Find the configuration file using the following precedence:
/// 1. `MAILSPOOL_CONFIG` environment variable
/// 2. ./mailspool.config.ron (current working directory)
/// 3. /etc/mailspool/mailspool.config.ron (system-wide config)
fn find_config_file() -> anyhow::Result<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILSPOOL_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!(
            "MAILSPOOL_CONFIG points to non-existent file: {}",
            path.display()
        );
    }

    let default_paths = [
        PathBuf::from("./mailspool.config.ron"),
        PathBuf::from("/etc/mailspool/mailspool.config.ron"),
    ];

    for path in &default_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - MAILSPOOL_CONFIG environment variable\n{paths_tried}"
    )
}
