//! dailyspark-admin - DailySpark Admin Dashboard
//!
//! A TUI for administering the DailySpark notification platform.
//!
//! Features:
//! - Browse users, audiences, notifications and surveys
//! - Delete rows with a short undo window
//! - Toggle user status, bulk delete audiences
//! - Resend notifications, publish and archive surveys
//! - Browse feedback notes and ratings
//! - Create and edit users, audiences and notifications, create surveys,
//!   all from JSON drafts
//!
//! Usage: dailyspark-admin [login|logout|create|edit] [--api-base URL]

mod api;
mod app;
mod config;
mod deferred;
mod jobs;
mod list;
mod logging;
mod types;
mod ui;

use anyhow::{bail, Context, Result};
use api::forms::{self, AudienceDraft, NotificationDraft, UserDraft, UserEditDraft};
use api::{AdminBackend, ApiClient, Session, Submission, SurveyDraft};
use app::App;
use chrono::{DateTime, Local, Utc};
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use dialoguer::Password;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use types::ResourceKind;

const PASSWORD_ENV: &str = "DAILYSPARK_PASSWORD";

/// What the command line asked for
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Tui,
    Login {
        email: String,
        password: Option<String>,
    },
    Logout,
    Create {
        kind: ResourceKind,
        file: PathBuf,
    },
    Edit {
        kind: ResourceKind,
        id: String,
        file: PathBuf,
    },
    Help,
    Version,
}

#[derive(Debug, Clone, PartialEq)]
struct Cli {
    command: Command,
    api_base: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Cli> {
    let mut command = None;
    let mut api_base = None;
    let mut email = None;
    let mut password = None;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Cli { command: Command::Help, api_base }),
            "-v" | "--version" => return Ok(Cli { command: Command::Version, api_base }),
            "--api-base" => api_base = Some(iter.next().context("--api-base needs a URL")?.clone()),
            "--email" => email = Some(iter.next().context("--email needs a value")?.clone()),
            "--password" => password = Some(iter.next().context("--password needs a value")?.clone()),
            "login" | "logout" | "create" | "edit" | "create-survey" if command.is_none() => {
                command = Some(arg.clone())
            }
            other if other.starts_with('-') => bail!("Unknown option: {}", other),
            other => positional.push(other.to_string()),
        }
    }

    let command = match command.as_deref() {
        None => Command::Tui,
        Some("login") => Command::Login {
            email: email.context("login needs --email")?,
            password,
        },
        Some("logout") => Command::Logout,
        Some("create-survey") => Command::Create {
            kind: ResourceKind::Survey,
            file: positional
                .first()
                .map(PathBuf::from)
                .context("create-survey needs a draft file")?,
        },
        Some("create") => match positional.as_slice() {
            [kind, file] => Command::Create {
                kind: parse_kind(kind)?,
                file: PathBuf::from(file),
            },
            _ => bail!("usage: create KIND FILE"),
        },
        Some("edit") => match positional.as_slice() {
            [kind, id, file] => Command::Edit {
                kind: parse_kind(kind)?,
                id: id.clone(),
                file: PathBuf::from(file),
            },
            _ => bail!("usage: edit KIND ID FILE"),
        },
        Some(other) => bail!("Unknown command: {}", other),
    };

    Ok(Cli { command, api_base })
}

fn parse_kind(name: &str) -> Result<ResourceKind> {
    ResourceKind::parse(name).with_context(|| {
        format!("Unknown resource \"{}\" (user, audience, notification, survey)", name)
    })
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {:#}\n\nRun with --help for usage.", e);
            std::process::exit(2);
        }
    };

    match cli.command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("dailyspark-admin {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Logging is best effort; the dashboard works without it
    match logging::log_path().and_then(|path| logging::init(&path)) {
        Ok(()) => info!(version = env!("CARGO_PKG_VERSION"), "starting"),
        Err(e) => eprintln!("Warning: logging disabled: {:#}", e),
    }

    let result = run(cli);

    if let Err(e) = result {
        error!(error = %format!("{:#}", e), "exited with error");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"dailyspark-admin - DailySpark Admin Dashboard

USAGE:
    dailyspark-admin [OPTIONS]
    dailyspark-admin login --email EMAIL [--password PASSWORD]
    dailyspark-admin logout
    dailyspark-admin create KIND FILE
    dailyspark-admin edit KIND ID FILE
    dailyspark-admin create-survey FILE    (same as `create survey FILE`)

    KIND is user, audience, notification or survey (create only).
    FILE is a JSON draft; see README for the fields of each kind.

OPTIONS:
    --api-base URL   Backend base URL (overrides DAILYSPARK_API_BASE and config)
    -h, --help       Print help information
    -v, --version    Print version information

KEYBINDINGS:
    1-6 / Tab        Switch tabs
    j/k              Navigate up/down
    n/p              Next/previous page
    /                Filter
    f                Cycle role/status/rating filter
    c                Cycle channel filter (Notifications)
    r                Reload
    d                Delete (with undo window)
    u                Undo pending delete
    s                Toggle user status (Users)
    Space / a        Select row / page (Audiences)
    D                Delete selected (Audiences)
    R                Resend (Notifications)
    P / A            Publish / Archive (Surveys)
    q                Quit

TABS:
    [1] Users          Registered mobile users
    [2] Audiences      User segments
    [3] Notifications  Push notifications and their delivery stats
    [4] Surveys        Multiple-choice surveys
    [5] Feedbacks      Notes and ratings left by users
    [6] Settings       Theme, undo delay and pending-delete policy

ENVIRONMENT:
    DAILYSPARK_API_BASE    Backend base URL
    DAILYSPARK_PASSWORD    Password for `login`
    RUST_LOG               Log filter (default dailyspark_admin=info)

FILES:
    ~/.config/dailyspark-admin/config.toml
    ~/.local/share/dailyspark-admin/session.json
    ~/.local/share/dailyspark-admin/dailyspark-admin.log
"#
    );
}

fn run(cli: Cli) -> Result<()> {
    let config_path = Config::path()?;
    let config = Config::load_from(&config_path).context("Failed to load configuration")?;
    let api_base = config.resolve_api_base(cli.api_base.as_deref());
    info!(api_base = %api_base, "backend resolved");

    match cli.command {
        Command::Login { email, password } => login(&config, &api_base, &email, password),
        Command::Logout => {
            if Session::clear()? {
                println!("Signed out.");
            } else {
                println!("No session to clear.");
            }
            Ok(())
        }
        Command::Create { kind, file } => submit_draft(&config, &api_base, kind, None, &file),
        Command::Edit { kind, id, file } => {
            submit_draft(&config, &api_base, kind, Some(id), &file)
        }
        Command::Tui => run_tui(config, config_path, api_base),
        Command::Help | Command::Version => Ok(()),
    }
}

fn login(config: &Config, api_base: &str, email: &str, password: Option<String>) -> Result<()> {
    let password = match password.or_else(|| std::env::var(PASSWORD_ENV).ok()) {
        Some(p) => p,
        None => prompt_password()?,
    };

    let client = ApiClient::new(api_base, None, config.request_timeout())?;
    let session = client.login(email, &password)?;
    session.save()?;

    println!("Signed in as {} ({})", session.display_name(), session.user.role);
    Ok(())
}

fn prompt_password() -> Result<String> {
    Password::new()
        .with_prompt("Password")
        .interact()
        .context("Failed to read password")
}

/// Ask for a new user's password twice, without echo
fn prompt_new_password() -> Result<String> {
    Password::new()
        .with_prompt("Password for the new user")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .context("Failed to read password")
}

/// Backend clock for scheduling checks; the local clock if `/time` fails
fn server_now(backend: &dyn AdminBackend) -> DateTime<Utc> {
    match backend.server_time() {
        Ok(time) => {
            let drift = time.drift_minutes();
            if drift > 1 {
                warn!(drift_minutes = drift, "server clock differs from local clock");
                eprintln!(
                    "Note: the server clock is {} minute(s) off from this machine; schedules use the server time.",
                    drift
                );
            }
            time.now
        }
        Err(e) => {
            warn!(error = %e, "server time unavailable, using local clock");
            Utc::now()
        }
    }
}

/// Turn a draft file into a validated request
fn build_submission(
    kind: ResourceKind,
    id: Option<String>,
    file: &Path,
    password: impl FnOnce() -> Result<String>,
    now: impl FnOnce() -> DateTime<Utc>,
) -> Result<Submission> {
    let submission = match (kind, id) {
        (ResourceKind::User, None) => {
            let draft: UserDraft = forms::read_draft(file)?;
            let password = match draft.password.clone().filter(|p| !p.is_empty()) {
                Some(p) => p,
                None => password()?,
            };
            let payload = draft.normalize(password);
            payload.validate()?;
            Submission::RegisterUser(payload)
        }
        (ResourceKind::User, Some(id)) => {
            let payload = forms::read_draft::<UserEditDraft>(file)?.normalize()?;
            payload.validate(Local::now())?;
            Submission::UpdateUser { id, payload }
        }
        (ResourceKind::Audience, id) => {
            let payload = forms::read_draft::<AudienceDraft>(file)?.normalize();
            payload.validate()?;
            match id {
                None => Submission::CreateAudience(payload),
                Some(id) => Submission::UpdateAudience { id, payload },
            }
        }
        (ResourceKind::Notification, None) => {
            let payload = forms::read_draft::<NotificationDraft>(file)?.to_create()?;
            payload.validate(now())?;
            Submission::CreateNotification(payload)
        }
        (ResourceKind::Notification, Some(id)) => {
            let payload = forms::read_draft::<NotificationDraft>(file)?.to_update()?;
            payload.validate(now())?;
            Submission::UpdateNotification { id, payload }
        }
        (ResourceKind::Survey, None) => {
            let payload = SurveyDraft::from_file(file)?.normalize();
            payload.validate()?;
            Submission::CreateSurvey(payload)
        }
        (ResourceKind::Survey, Some(_)) => bail!("Surveys cannot be edited once created"),
        (ResourceKind::Feedback, _) => bail!("Feedback is read-only"),
    };
    Ok(submission)
}

fn submit_draft(
    config: &Config,
    api_base: &str,
    kind: ResourceKind,
    id: Option<String>,
    file: &Path,
) -> Result<()> {
    let session = Session::load()?;
    let client = ApiClient::new(api_base, session.map(|s| s.token), config.request_timeout())?;

    let editing = id.is_some();
    let submission = build_submission(kind, id, file, prompt_new_password, || server_now(&client))?;
    let saved = client.submit(&submission)?;

    let id = saved
        .get("id")
        .map(|id| id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string()))
        .unwrap_or_else(|| "unknown".into());
    info!(action = submission.action(), id = %id, "draft submitted");
    println!(
        "{} {} (id {}).",
        kind.as_str(),
        if editing { "updated" } else { "created" },
        id
    );
    Ok(())
}

fn run_tui(config: Config, config_path: PathBuf, api_base: String) -> Result<()> {
    let session = Session::load().context("Failed to read session")?;
    if session.is_none() {
        eprintln!("No session found; lists will be empty. Run `dailyspark-admin login` first.");
    }

    let client = ApiClient::new(
        &api_base,
        session.as_ref().map(|s| s.token.clone()),
        config.request_timeout(),
    )?;
    let backend: Arc<dyn AdminBackend> = Arc::new(client);

    let shutdown_wait = config.shutdown_wait();
    eprintln!("Loading users...");
    let mut app = App::new(config, config_path, session, api_base, backend);

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to setup terminal")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)
        .context("Failed to create terminal")?;

    // Run main loop
    let result = main_loop(&mut terminal, &mut app);

    // Nothing new commits after the user has left; deletes already sent
    // get a bounded wait
    let unresolved = app.shutdown(shutdown_wait);

    // Restore terminal
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    if !unresolved.is_empty() {
        eprintln!("These deletes were sent but had not finished when the dashboard closed:");
        for row in &unresolved {
            eprintln!("  {}", row);
        }
        eprintln!("Reload the dashboard to check whether they went through.");
    }

    result
}

fn main_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        // Render UI
        terminal.draw(|frame| {
            ui::render(frame, app);
        })?;

        // Deadlines, toasts and finished jobs
        app.tick();

        // Poll for events with timeout (for timer updates)
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key)?;
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
