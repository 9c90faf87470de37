use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use colored::*;
use tracing_subscriber::EnvFilter;

use multi_llm_chat::cli::{resolve_config, resolve_models, Args, Command, ProjectCommand};
use multi_llm_chat::export::{read_export, write_export};
use multi_llm_chat::providers::SimulatedSource;
use multi_llm_chat::render::{render_analytics, render_message, render_messages, render_project_list, stars};
use multi_llm_chat::search::{filter_messages, filter_projects};
use multi_llm_chat::store::open_store;
use multi_llm_chat::{ChatState, Dispatcher, ProjectRepository, Rating, Result, Score};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".bright_red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<()> {
    if let Command::Completions { shell } = &args.command {
        clap_complete::generate(*shell, &mut Args::command(), "multi-llm-chat", &mut std::io::stdout());
        return Ok(());
    }

    let config = resolve_config(&args)?;
    let data_dir = config.resolved_data_dir();
    tracing::debug!(data_dir = %data_dir.display(), backend = %config.backend, "opening store");
    let store = open_store(config.backend, &data_dir)?;
    let dispatcher = Dispatcher::new(Arc::new(SimulatedSource))
        .with_latency(config.latency())
        .with_task_timeout(config.task_timeout());
    let mut state = ChatState::open(ProjectRepository::from_boxed(store), dispatcher, config.models.clone())?;

    match args.command {
        Command::Project(cmd) => run_project(&mut state, cmd)?,
        Command::Send { text, models, .. } => {
            let models = resolve_models(&models, &config);
            eprintln!("{}", format!("[send] asking {} models: {}", models.len(), models.join(", ")).dimmed());
            match state.send_message(&text, &models).await? {
                Some(message) => print!("{}", render_message(&message)),
                None => eprintln!("{}", "Nothing to send: the message is empty.".yellow()),
            }
        }
        Command::Messages { search } => {
            let shown = filter_messages(state.messages(), &search);
            println!("{}", render_messages(&shown, !search.is_empty()).trim_end());
        }
        Command::Rate {
            message_id,
            response_id,
            rating,
        } => {
            let rating = Rating::new(rating)?;
            if state.rate_response(&message_id, &response_id, rating)? {
                println!("Rated {} {}", response_id, stars(Score::Rated(rating)).yellow());
            } else {
                eprintln!(
                    "{}",
                    format!("No response '{response_id}' in message '{message_id}' of the current project.").yellow()
                );
            }
        }
        Command::Analytics => print!("{}", render_analytics(&state.analytics())),
        Command::Export { dir } => {
            let path = write_export(&dir, &state)?;
            println!("Exported {} projects to {}", state.projects().len(), path.display());
        }
        Command::Import { file } => {
            let doc = read_export(&file)?;
            let count = doc.projects.len();
            state.import_projects(doc.projects)?;
            println!("Imported {count} projects from {}", file.display());
        }
        Command::Completions { .. } => {}
    }
    Ok(())
}

fn run_project(state: &mut ChatState, cmd: ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::Create { name } => match state.create_project(&name)? {
            Some(p) => println!("Created {} {}", p.name.bold(), p.id.dimmed()),
            None => eprintln!("{}", "Project name must not be empty.".yellow()),
        },
        ProjectCommand::List { search } => {
            let rows = state.project_summaries();
            let shown = filter_projects(&rows, &search);
            println!("{}", render_project_list(&shown, state.current_project_id()).trim_end());
        }
        ProjectCommand::Select { id } => {
            state.select_project(&id)?;
            match state.current_project() {
                Some(p) => println!("Selected {}", p.name.bold()),
                None => eprintln!("{}", format!("No project '{id}'; nothing will be shown.").yellow()),
            }
        }
        ProjectCommand::Delete { id } => {
            if state.delete_project(&id)? {
                println!("Deleted {id}");
            } else {
                eprintln!("{}", format!("No project '{id}'.").yellow());
            }
        }
    }
    Ok(())
}
