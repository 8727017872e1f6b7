use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "slate", about = "Slate school platform — roster sync engine", version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "slate.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Initialize the Slate data directory and configuration
    Init {
        /// Data directory path
        #[arg(long, default_value = "/var/lib/slate")]
        data_dir: String,
    },
    /// Run a full roster pull from a OneRoster SIS
    Sync {
        /// Integration config to sync
        #[arg(long)]
        config_id: i64,
        /// User id that triggered the sync
        #[arg(long)]
        triggered_by: Option<i64>,
    },
    /// Import a OneRoster CSV zip bundle
    Import {
        /// Integration config to import into
        #[arg(long)]
        config_id: i64,
        /// Path to the zip bundle
        #[arg(long)]
        bundle: String,
        /// User id that triggered the import
        #[arg(long)]
        triggered_by: Option<i64>,
    },
    /// Push local records to the classroom provider
    Push {
        #[command(subcommand)]
        target: PushTarget,
    },
    /// Show recent sync runs
    Status {
        /// Tenant to inspect
        #[arg(long, default_value = "1")]
        tenant_id: i64,
        /// Number of runs to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
}

#[derive(clap::Subcommand)]
enum PushTarget {
    /// Create or update coursework for an assignment
    Coursework {
        #[arg(long)]
        config_id: i64,
        #[arg(long)]
        assignment_id: i64,
        #[arg(long)]
        triggered_by: Option<i64>,
    },
    /// Push grades for an assignment's graded submissions
    Grades {
        #[arg(long)]
        config_id: i64,
        #[arg(long)]
        assignment_id: i64,
        #[arg(long)]
        triggered_by: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data_dir } => {
            commands::init::run(&cli.config, &data_dir).await?;
        }
        Commands::Sync {
            config_id,
            triggered_by,
        } => {
            commands::sync::run(&cli.config, config_id, triggered_by).await?;
        }
        Commands::Import {
            config_id,
            bundle,
            triggered_by,
        } => {
            commands::import::run(&cli.config, config_id, &bundle, triggered_by).await?;
        }
        Commands::Push { target } => match target {
            PushTarget::Coursework {
                config_id,
                assignment_id,
                triggered_by,
            } => {
                commands::push::coursework(&cli.config, config_id, assignment_id, triggered_by)
                    .await?;
            }
            PushTarget::Grades {
                config_id,
                assignment_id,
                triggered_by,
            } => {
                commands::push::grades(&cli.config, config_id, assignment_id, triggered_by)
                    .await?;
            }
        },
        Commands::Status { tenant_id, limit } => {
            commands::status::run(&cli.config, tenant_id, limit).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn cli_parse_init_defaults() {
        let cli = Cli::parse_from(["slate", "init"]);
        assert_eq!(cli.config, "slate.toml");
        match cli.command {
            Commands::Init { data_dir } => assert_eq!(data_dir, "/var/lib/slate"),
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn cli_parse_sync() {
        let cli = Cli::parse_from(["slate", "sync", "--config-id", "3", "--triggered-by", "11"]);
        match cli.command {
            Commands::Sync {
                config_id,
                triggered_by,
            } => {
                assert_eq!(config_id, 3);
                assert_eq!(triggered_by, Some(11));
            }
            _ => panic!("expected Sync command"),
        }
    }

    #[test]
    fn cli_parse_import() {
        let cli = Cli::parse_from([
            "slate",
            "--config",
            "/etc/slate.toml",
            "import",
            "--config-id",
            "3",
            "--bundle",
            "/tmp/roster.zip",
        ]);
        assert_eq!(cli.config, "/etc/slate.toml");
        match cli.command {
            Commands::Import {
                config_id, bundle, ..
            } => {
                assert_eq!(config_id, 3);
                assert_eq!(bundle, "/tmp/roster.zip");
            }
            _ => panic!("expected Import command"),
        }
    }

    #[test]
    fn cli_parse_push_grades() {
        let cli = Cli::parse_from([
            "slate",
            "push",
            "grades",
            "--config-id",
            "3",
            "--assignment-id",
            "9",
        ]);
        match cli.command {
            Commands::Push {
                target:
                    PushTarget::Grades {
                        config_id,
                        assignment_id,
                        triggered_by,
                    },
            } => {
                assert_eq!(config_id, 3);
                assert_eq!(assignment_id, 9);
                assert_eq!(triggered_by, None);
            }
            _ => panic!("expected Push Grades command"),
        }
    }

    #[test]
    fn cli_parse_status_defaults() {
        let cli = Cli::parse_from(["slate", "status"]);
        match cli.command {
            Commands::Status { tenant_id, limit } => {
                assert_eq!(tenant_id, 1);
                assert_eq!(limit, 10);
            }
            _ => panic!("expected Status command"),
        }
    }
}
