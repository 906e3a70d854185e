use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use comply_client::{ClientEvent, ConnectionManager, Dispatcher};
use comply_content::{ContentRenderer, Theme};
use comply_core::{AuthConfig, ClientConfig};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod helper;
mod input;
mod session;

use helper::{CliHelper, SuggestionCache};
use input::{Input, parse_input};
use session::{Request, Session};

#[derive(Parser)]
#[command(name = "comply")]
#[command(about = "Comply - terminal console for Compliance Protocol applications", long_about = None)]
struct Cli {
    /// Application address (`host:port`); defaults to the configured profile or COMPLY_HOST
    host: Option<String>,

    /// Bearer token sent with every request
    #[arg(long)]
    token: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// TOML theme file
    #[arg(long)]
    theme: Option<PathBuf>,

    /// Disable colors
    #[arg(long)]
    plain: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_theme(cli: &Cli) -> Result<Theme> {
    if cli.plain {
        return Ok(Theme::plain());
    }
    match &cli.theme {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read theme {}", path.display()))?;
            Ok(Theme::from_toml(&content)?)
        }
        None => Ok(Theme::default_dark()),
    }
}

/// Host from the command line, else the profile; a `--token` overrides the
/// profile's credentials.
fn resolve_target(cli: &Cli, config: &ClientConfig) -> Result<(String, Option<AuthConfig>)> {
    let profile = config.resolve_profile();
    let host = cli
        .host
        .clone()
        .or_else(|| profile.as_ref().map(|p| p.host.clone()))
        .context("No host given: pass one, set COMPLY_HOST, or add a [profile] to the config")?;
    let auth = match &cli.token {
        Some(token) => Some(AuthConfig::bearer(token.clone())),
        None => profile.and_then(|p| p.auth),
    };
    Ok((host, auth))
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

/// Response handler: owns the session and serializes everything it prints.
async fn run_session(
    mut session: Session,
    dispatcher: Dispatcher,
    mut inputs: mpsc::UnboundedReceiver<Input>,
    mut events: mpsc::UnboundedReceiver<ClientEvent>,
) {
    loop {
        tokio::select! {
            input = inputs.recv() => {
                let Some(input) = input else { break };
                let step = session.handle_input(input);
                print_lines(&step.lines);
                if let Some(request) = step.request {
                    submit(&session, &dispatcher, request).await;
                }
            }
            Some(event) = events.recv() => {
                print_lines(&session.handle_event(event));
            }
        }
    }

    drop(dispatcher);
    print_lines(&drain_events(&mut session, &mut events).await);
}

/// Renders completions still in flight once input has closed. Returns when
/// every dispatched call has reported and all dispatchers are dropped.
async fn drain_events(
    session: &mut Session,
    events: &mut mpsc::UnboundedReceiver<ClientEvent>,
) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(event) = events.recv().await {
        lines.extend(session.handle_event(event));
    }
    lines
}

async fn submit(session: &Session, dispatcher: &Dispatcher, request: Request) {
    match request {
        Request::Command(request) => {
            dispatcher.execute_command(request);
        }
        Request::Action(request) => {
            dispatcher.execute_action(request);
        }
        Request::Suggest(request) => {
            dispatcher.get_suggestions(request);
        }
        Request::Progress(request) => {
            dispatcher.get_progress(request);
        }
        Request::Cancel(request) => {
            dispatcher.cancel_operation(request);
        }
        Request::Status => {
            let state = dispatcher.manager().state().await;
            print_lines(&session.status_lines(&state));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::load_default()?,
    };
    if cli.plain {
        colored::control::set_override(false);
    }
    let theme = load_theme(&cli)?;
    let (host, auth) = resolve_target(&cli, &config)?;

    // ===== Backend =====
    let manager = Arc::new(ConnectionManager::new(config.clone()));
    let (dispatcher, events) = Dispatcher::new(manager);
    let suggestions = SuggestionCache::default();
    let session = Session::new(
        ContentRenderer::from_config(&config),
        theme.clone(),
        Arc::clone(&suggestions),
    );

    let (input_tx, input_rx) = mpsc::unbounded_channel::<Input>();
    let handler = tokio::spawn(run_session(session, dispatcher.clone(), input_rx, events));

    println!("{}", theme.apply("header", "=== Comply ==="));
    println!("{}", theme.apply("muted", &format!("Connecting to {host}...")));
    dispatcher.connect(host, auth);

    // ===== REPL =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new(suggestions, !cli.plain)));
    println!(
        "{}",
        theme.apply("muted", "Type a command, '/help' for console commands, or 'quit' to exit.")
    );

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let input = parse_input(&line);
                match input {
                    Input::Quit => break,
                    Input::Empty => continue,
                    _ => {}
                }
                let _ = rl.add_history_entry(line.trim());
                if input_tx.send(input).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", theme.apply("warning", "CTRL-C detected. Type 'quit' to exit."));
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                tracing::error!(error = %err, "readline failed");
                break;
            }
        }
    }

    // Cancel in-flight retries; the handler prints what still completes.
    dispatcher.shutdown();
    drop(dispatcher);
    drop(input_tx);
    let _ = handler.await;
    println!("{}", theme.apply("status_success", "Goodbye!"));

    Ok(())
}
