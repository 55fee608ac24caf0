use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod actions;
mod app;
mod config;
mod discovery;
mod error;
mod git;
mod naming;
mod recent;
mod reconcile;
mod refresh;
mod task;
mod tmux;

use actions::Action;
use app::App;
use config::Config;
use git::GitClient;
use reconcile::Category;
use refresh::{resolve_repo, RepoTarget, Refresher};
use tmux::TmuxClient;

/// Dashboard pairing tmux sessions with git worktrees
#[derive(Parser, Debug)]
#[command(name = "worktree-deck", version, about)]
struct Args {
    /// Repository to watch (defaults to the one containing the current directory)
    #[arg(long, value_name = "PATH", conflicts_with = "scan")]
    repo: Option<PathBuf>,

    /// Watch every repository found under the configured search paths
    #[arg(long)]
    scan: bool,

    /// Initial filter: all, attached, alive, idle, stopped, orphans
    #[arg(long, value_name = "CATEGORY")]
    filter: Option<Category>,

    /// Refresh interval in milliseconds
    #[arg(long, value_name = "MS")]
    interval: Option<u64>,

    /// Print the view once and exit
    #[arg(long)]
    list: bool,

    /// Print the view once as JSON and exit
    #[arg(long)]
    json: bool,

    /// Config file to read instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn init_logging(to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if to_file {
        // The terminal belongs to the UI, so logs go to a file
        let dir = config::log_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("deck.log"))
            .context("Failed to open log file")?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

/// Hand the terminal to `tmux attach` and take it back afterwards
fn attach(
    tmux: &TmuxClient,
    name: &str,
    terminal: &mut ratatui::DefaultTerminal,
    paused: &AtomicBool,
) -> std::io::Result<std::process::ExitStatus> {
    // Suspend TUI and attach to session
    paused.store(true, Ordering::Relaxed);
    ratatui::restore();

    let cmd = tmux.attach_command(name);
    let status = std::process::Command::new(&cmd[0])
        .args(&cmd[1..])
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status();

    // Resume TUI
    *terminal = ratatui::init();
    paused.store(false, Ordering::Relaxed);
    status
}

async fn resolve_repos(args: &Args, config: &Config, git: &GitClient) -> Result<Vec<RepoTarget>> {
    if args.scan {
        let roots = config.expanded_search_paths();
        if roots.is_empty() {
            anyhow::bail!("--scan needs search_paths in the config file");
        }
        let repos: Vec<RepoTarget> = discovery::find_git_repos(&roots, config.depth)
            .into_iter()
            .map(RepoTarget::new)
            .collect();
        info!(count = repos.len(), "discovered repositories");
        return Ok(repos);
    }

    let path = match &args.repo {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let repo = resolve_repo(git, &path)
        .await
        .with_context(|| format!("{} is not inside a git repository", path.display()))?;
    Ok(vec![repo])
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let one_shot = args.list || args.json;
    init_logging(!one_shot)?;

    let config = Config::load(args.config.as_deref())?;
    let filter = args.filter.unwrap_or(config.default_filter);
    let interval = Duration::from_millis(args.interval.unwrap_or(config.refresh_interval_ms).max(1));

    let git_client = GitClient::new();
    let tmux_client = TmuxClient::new();
    let repos = resolve_repos(&args, &config, &git_client).await?;
    let refresher = Refresher::new();

    if one_shot {
        let outcome = refresher.refresh(&repos, 1).await;
        if args.json {
            let listings = app::listings(&outcome.repos, filter, outcome.captured_at);
            println!("{}", serde_json::to_string_pretty(&listings)?);
        } else {
            print!("{}", app::render_text(&outcome.repos, filter, outcome.captured_at));
        }
        return Ok(());
    }

    // Create event channel
    let (tx, mut rx) = mpsc::unbounded_channel::<Action>();
    let refresh_now = Arc::new(Notify::new());

    // Initialize terminal
    let mut terminal = ratatui::init();

    // Spawn input handler; it stands aside while tmux owns the terminal
    let input_tx = tx.clone();
    let input_paused = Arc::new(AtomicBool::new(false));
    let paused = input_paused.clone();
    std::thread::spawn(move || loop {
        if paused.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(50));
            continue;
        }
        if event::poll(Duration::from_millis(100)).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind == KeyEventKind::Press && input_tx.send(Action::KeyPress(key)).is_err() {
                    break;
                }
            }
        }
    });

    // Spawn refresher; each pass carries the next generation number
    let refresh_tx = tx.clone();
    let wake = refresh_now.clone();
    tokio::spawn(async move {
        let mut generation = 0u64;
        loop {
            generation += 1;
            let outcome = refresher.refresh(&repos, generation).await;
            if refresh_tx.send(Action::RefreshCompleted(outcome)).is_err() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = wake.notified() => {}
            }
        }
    });

    let mut app = App::new(filter);

    // Main event loop
    let result = loop {
        terminal.draw(|f| app.render(f))?;

        for pending_action in app.take_pending_actions() {
            match pending_action {
                Action::AttachSession { name, cwd, create } => {
                    if create && !tmux_client.has_session(&name).await {
                        let Some(cwd) = cwd.as_deref() else {
                            app.message = Some(format!("No working tree for '{}'", name));
                            continue;
                        };
                        if let Err(e) = tmux_client.create_session(&name, cwd).await {
                            warn!(session = %name, "create failed: {:#}", e);
                            app.message = Some(format!("Failed to create: {}", e));
                            continue;
                        }
                    }

                    if let Err(e) = attach(&tmux_client, &name, &mut terminal, &input_paused) {
                        app.message = Some(format!("Failed to attach: {}", e));
                    }
                    refresh_now.notify_one();
                }
                Action::CreateTask { repo, slug } => {
                    match task::create_task(&tmux_client, &git_client, &repo, &slug).await {
                        Ok(created) => {
                            app.message = Some(format!(
                                "Created {} at {}",
                                created.session,
                                created.worktree.display()
                            ));
                            if let Err(e) =
                                attach(&tmux_client, &created.session, &mut terminal, &input_paused)
                            {
                                app.message = Some(format!("Failed to attach: {}", e));
                            }
                        }
                        Err(e) => {
                            warn!(repo = %repo.name, %slug, "task creation failed: {:#}", e);
                            app.message = Some(format!("Failed to create task: {}", e));
                        }
                    }
                    refresh_now.notify_one();
                }
                Action::Cleanup(items) => {
                    let (done, failures) =
                        task::run_cleanup(&tmux_client, &git_client, &items).await;
                    app.message = Some(match failures.first() {
                        None => format!("Cleaned {} item(s)", done),
                        Some(first) => format!(
                            "Cleaned {} item(s), {} failed: {}",
                            done,
                            failures.len(),
                            first
                        ),
                    });
                    refresh_now.notify_one();
                }
                Action::KillSession(name) => {
                    match tmux_client.kill_session(&name).await {
                        Ok(_) => app.message = Some(format!("Killed session '{}'", name)),
                        Err(e) => app.message = Some(format!("Failed to kill: {}", e)),
                    }
                    refresh_now.notify_one();
                }
                Action::RemoveWorktree { repo_root, path } => {
                    match git_client.remove_worktree(&repo_root, &path, false).await {
                        Ok(_) => app.message = Some(format!("Removed worktree {}", path)),
                        Err(e) => app.message = Some(format!("Failed to remove: {}", e)),
                    }
                    refresh_now.notify_one();
                }
                Action::CopyPath(path) => match arboard::Clipboard::new() {
                    Ok(mut clipboard) => {
                        if let Err(e) = clipboard.set_text(path.as_str()) {
                            app.message = Some(format!("Clipboard error: {}", e));
                        } else {
                            app.message = Some(format!("Copied {}", path));
                        }
                    }
                    Err(e) => {
                        app.message = Some(format!("Clipboard error: {}", e));
                    }
                },
                Action::Refresh => refresh_now.notify_one(),
                _ => {}
            }
        }

        // Handle events from channel
        tokio::select! {
            Some(action) = rx.recv() => {
                match app.handle_action(action) {
                    Ok(should_quit) => {
                        if should_quit {
                            break Ok(());
                        }
                    }
                    Err(e) => {
                        break Err(e);
                    }
                }
            }
            else => break Ok(()),
        }
    };

    // Restore terminal
    ratatui::restore();
    result
}
