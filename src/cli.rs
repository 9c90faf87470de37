use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{default_data_dir, Config, CONFIG_FILE_NAME};
use crate::error::Result;
use crate::store::StoreBackend;

#[derive(Parser, Debug)]
#[command(name = "multi-llm-chat")]
#[command(version)]
#[command(about = "Compare simulated LLM responses side by side, organized into rated projects")]
pub struct Args {
    /// TOML config file (defaults to <data-dir>/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the project store
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Storage backend: file, sqlite, or memory
    #[arg(long, value_enum, global = true)]
    pub backend: Option<StoreBackend>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, list, select, or delete projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Send a message to every model and store the answers
    Send {
        /// The question to ask
        text: String,

        /// Model to ask; repeat for several (defaults to the configured list)
        #[arg(long = "model", short = 'm')]
        models: Vec<String>,

        /// Skip the simulated network latency
        #[arg(long)]
        instant: bool,

        /// Per-model timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Show the current project's messages
    Messages {
        /// Only show messages containing this text
        #[arg(long, short, default_value = "")]
        search: String,
    },

    /// Rate a response in the current project
    Rate {
        message_id: String,
        response_id: String,
        /// Stars, 1 to 5
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,
    },

    /// Print aggregate statistics over all projects
    Analytics,

    /// Write all projects and analytics to chat-data-<date>.json
    Export {
        /// Output directory (defaults to the current directory)
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Replace all projects with those from an export file
    Import { file: PathBuf },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project and select it
    Create { name: String },

    /// List projects with message counts and ratings
    List {
        /// Only show projects whose name contains this text
        #[arg(long, short, default_value = "")]
        search: String,
    },

    /// Select a project by id
    Select { id: String },

    /// Delete a project by id
    Delete { id: String },
}

/// Load the config file and apply command-line overrides on top.
pub fn resolve_config(args: &Args) -> Result<Config> {
    let base_dir = args.data_dir.clone().unwrap_or_else(default_data_dir);
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| base_dir.join(CONFIG_FILE_NAME));

    let mut config = Config::load(&config_path)?;
    if let Some(dir) = &args.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Command::Send {
        instant, timeout_ms, ..
    } = &args.command
    {
        if *instant {
            config.latency_min_ms = 0;
            config.latency_max_ms = 0;
        }
        if let Some(ms) = timeout_ms {
            config.task_timeout_ms = *ms;
        }
    }
    config.validate()?;
    Ok(config)
}

/// Models for a send: the explicit list, or the configured ones.
pub fn resolve_models(requested: &[String], config: &Config) -> Vec<String> {
    if requested.is_empty() {
        config.models.clone()
    } else {
        requested.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_send_minimal() {
        let args = Args::parse_from(["mlc", "send", "hello world"]);
        match args.command {
            Command::Send {
                text,
                models,
                instant,
                timeout_ms,
            } => {
                assert_eq!(text, "hello world");
                assert!(models.is_empty());
                assert!(!instant);
                assert!(timeout_ms.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(args.backend.is_none());
        assert!(args.data_dir.is_none());
    }

    #[test]
    fn test_args_parse_send_models_repeat() {
        let args = Args::parse_from(["mlc", "send", "q", "-m", "GPT-4", "--model", "Claude-3"]);
        let Command::Send { models, .. } = args.command else {
            panic!("expected send");
        };
        assert_eq!(models, vec!["GPT-4", "Claude-3"]);
    }

    #[test]
    fn test_args_global_flags_after_subcommand() {
        let args = Args::parse_from(["mlc", "analytics", "--backend", "sqlite", "--data-dir", "/tmp/x"]);
        assert_eq!(args.backend, Some(StoreBackend::Sqlite));
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(args.command, Command::Analytics));
    }

    #[test]
    fn test_args_project_create() {
        let args = Args::parse_from(["mlc", "project", "create", "Research"]);
        assert!(matches!(
            args.command,
            Command::Project(ProjectCommand::Create { ref name }) if name == "Research"
        ));
    }

    #[test]
    fn test_args_project_list_search_default_empty() {
        let args = Args::parse_from(["mlc", "project", "list"]);
        assert!(matches!(
            args.command,
            Command::Project(ProjectCommand::List { ref search }) if search.is_empty()
        ));
    }

    #[test]
    fn test_args_rate_in_range() {
        let args = Args::parse_from(["mlc", "rate", "m1", "m1-0", "5"]);
        assert!(matches!(args.command, Command::Rate { rating: 5, .. }));
    }

    #[test]
    fn test_args_rate_out_of_range_rejected() {
        assert!(Args::try_parse_from(["mlc", "rate", "m1", "m1-0", "6"]).is_err());
        assert!(Args::try_parse_from(["mlc", "rate", "m1", "m1-0", "0"]).is_err());
    }

    #[test]
    fn test_args_export_default_dir() {
        let args = Args::parse_from(["mlc", "export"]);
        assert!(matches!(args.command, Command::Export { ref dir } if dir == &PathBuf::from(".")));
    }

    #[test]
    fn test_args_missing_subcommand_rejected() {
        assert!(Args::try_parse_from(["mlc"]).is_err());
    }

    #[test]
    fn test_resolve_config_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "backend = \"sqlite\"\nmodels = [\"A\"]\n",
        )
        .unwrap();
        let data_dir = dir.path().to_str().unwrap();
        let args = Args::parse_from([
            "mlc", "send", "q", "--instant", "--timeout-ms", "250", "--data-dir", data_dir,
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.backend, StoreBackend::Sqlite);
        assert_eq!(config.models, vec!["A"]);
        assert_eq!(config.latency_max_ms, 0);
        assert_eq!(config.task_timeout_ms, 250);
        assert_eq!(config.resolved_data_dir(), dir.path());
    }

    #[test]
    fn test_resolve_config_cli_backend_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "backend = \"sqlite\"\n").unwrap();
        let data_dir = dir.path().to_str().unwrap();
        let args = Args::parse_from(["mlc", "analytics", "--data-dir", data_dir, "--backend", "memory"]);
        assert_eq!(resolve_config(&args).unwrap().backend, StoreBackend::Memory);
    }

    #[test]
    fn test_resolve_models_prefers_explicit() {
        let config = Config::default();
        assert_eq!(resolve_models(&[], &config), config.models);
        let picked = vec!["Claude-3".to_string()];
        assert_eq!(resolve_models(&picked, &config), picked);
    }
}
