//! StaffPortal CLI - a command-line field client for StaffPortal.
//!
//! Log in once, then browse jobs, look up elements by their label code and
//! update element status from the terminal.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use staffportal_core::models::{filter_jobs, Element, ElementStatus, ElementUpdate, Job};
use staffportal_core::{scan, ApiError, Config, SessionController};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

const ENV_EMAIL: &str = "STAFFPORTAL_EMAIL";
const ENV_PASSWORD: &str = "STAFFPORTAL_PASSWORD";

const USAGE: &str = "\
Usage: staffportal <command> [args]

Commands:
  login [email]                      Sign in and store the session token
  logout                             Forget the stored token
  whoami                             Show the signed-in user
  jobs [query]                       List jobs, optionally filtered by name or project number
  job <id>                           Show one job
  elements <job-id>                  List the elements of a job
  element <id>                       Show one element
  scan <payload>                     Look up an element from a scanned label
  update <id> [--status S] [--notes N]
                                     Update an element (S: not_started, in_progress, complete, on_hold)
  dashboard                          Show dashboard stats and recent activity
  help                               Show this message";

#[derive(Debug, PartialEq)]
enum Command {
    Login { email: Option<String> },
    Logout,
    Whoami,
    Jobs { query: Option<String> },
    Job(i64),
    Elements(i64),
    Element(i64),
    Scan(String),
    Update {
        id: i64,
        status: Option<ElementStatus>,
        notes: Option<String>,
    },
    Dashboard,
    Help,
}

fn parse_id(value: Option<&String>, what: &str) -> Result<i64> {
    let value = value.ok_or_else(|| anyhow::anyhow!("Missing {}", what))?;
    value
        .parse()
        .with_context(|| format!("Invalid {}: {}", what, value))
}

fn parse_status(value: &str) -> Result<ElementStatus> {
    ElementStatus::parse(&value.replace('-', "_"))
        .ok_or_else(|| anyhow::anyhow!("Unknown status: {}", value))
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some(name) = args.first() else {
        return Ok(Command::Help);
    };
    let rest = &args[1..];

    let command = match name.as_str() {
        "login" => Command::Login {
            email: rest.first().cloned(),
        },
        "logout" => Command::Logout,
        "whoami" => Command::Whoami,
        "jobs" => Command::Jobs {
            query: (!rest.is_empty()).then(|| rest.join(" ")),
        },
        "job" => Command::Job(parse_id(rest.first(), "job id")?),
        "elements" => Command::Elements(parse_id(rest.first(), "job id")?),
        "element" => Command::Element(parse_id(rest.first(), "element id")?),
        "scan" => {
            if rest.is_empty() {
                bail!("Missing scan payload");
            }
            Command::Scan(rest.join(" "))
        }
        "update" => {
            let id = parse_id(rest.first(), "element id")?;
            let mut status = None;
            let mut notes = None;
            let mut flags = rest[1..].iter();
            while let Some(flag) = flags.next() {
                let value = flags
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing value for {}", flag))?;
                match flag.as_str() {
                    "--status" => status = Some(parse_status(value)?),
                    "--notes" => notes = Some(value.clone()),
                    other => bail!("Unknown option: {}", other),
                }
            }
            Command::Update { id, status, notes }
        }
        "dashboard" => Command::Dashboard,
        "help" | "--help" | "-h" => Command::Help,
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    };
    Ok(command)
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = Config::load()?;
    debug!(api = %config.api_base_url, backend = ?config.credential_backend, "Config loaded");

    let session = SessionController::new(config.api_client()?);
    let result = run(&session, &mut config, command).await;

    if let Err(ref e) = result {
        if let Some(api_err) = e.downcast_ref::<ApiError>() {
            if session.handle_error(api_err) {
                eprintln!("Your session has expired. Run `staffportal login` to sign in again.");
            }
        }
    }
    result
}

async fn run(session: &SessionController, config: &mut Config, command: Command) -> Result<()> {
    match command {
        Command::Login { email } => login(session, config, email).await,
        Command::Logout => {
            session.logout();
            println!("Logged out.");
            Ok(())
        }
        command => {
            require_session(session).await?;
            run_authenticated(session, command).await
        }
    }
}

async fn login(session: &SessionController, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email
        .or_else(|| std::env::var(ENV_EMAIL).ok())
        .or_else(|| config.last_email.clone())
    {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = match std::env::var(ENV_PASSWORD) {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    let user = session.login(&email, &password).await?;

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    info!("Login successful");
    println!("Logged in as {} ({})", user.display_name(), user.role);
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

async fn require_session(session: &SessionController) -> Result<()> {
    let state = session.initialize().await;
    if !state.is_authenticated {
        bail!("Not logged in. Run `staffportal login` first.");
    }
    Ok(())
}

async fn run_authenticated(session: &SessionController, command: Command) -> Result<()> {
    let api = session.api();
    match command {
        Command::Whoami => {
            if let Some(user) = session.session().user {
                println!("{} [{}]", user.display_name(), user.initials());
                println!("  Email:   {}", user.email);
                println!("  Role:    {}", user.role);
                println!("  Company: {}", user.company_id);
            }
        }
        Command::Jobs { query } => {
            let jobs = api.jobs().await?;
            let shown = filter_jobs(&jobs, query.as_deref().unwrap_or(""));
            if shown.is_empty() {
                println!("No jobs found.");
            }
            for job in shown {
                print_job_line(job);
            }
        }
        Command::Job(id) => print_job(&api.job(id).await?),
        Command::Elements(job_id) => {
            let rows = api.job_elements(job_id).await?;
            println!("Elements ({})", rows.len());
            for row in &rows {
                let element = &row.element;
                let phase = element.phase().map(|p| p.to_string()).unwrap_or_default();
                let secondary = element.secondary_status.as_deref().unwrap_or("");
                print!(
                    "{:>6}  {:<14} {:<12} {:<12} {}",
                    element.id,
                    element.element_id,
                    phase,
                    secondary,
                    element.name.as_deref().unwrap_or("")
                );
                match row.location() {
                    Some(location) => println!("  ({})", location),
                    None => println!(),
                }
            }
        }
        Command::Element(id) => print_element(&api.element(id).await?),
        Command::Scan(payload) => {
            let code = scan::element_code(&payload)
                .ok_or_else(|| anyhow::anyhow!("Scanned label is empty"))?;
            match api.lookup_element(&code).await? {
                Some(element) => print_element(&element),
                None => bail!("No element found with ID: {}", code),
            }
        }
        Command::Update { id, status, notes } => {
            let mut update = ElementUpdate::new();
            if let Some(status) = status {
                update = update.status(status);
            }
            if let Some(notes) = notes {
                update = update.notes(notes);
            }
            if update.is_empty() {
                bail!("Nothing to update. Pass --status and/or --notes.");
            }
            let element = api.update_element(id, &update.touched_now()).await?;
            println!("Element updated successfully.");
            print_element(&element);
        }
        Command::Dashboard => {
            let dashboard = api.dashboard().await?;
            let stats = &dashboard.stats;
            println!("Active jobs:      {}", stats.active_jobs);
            println!("Documents:        {}", stats.total_documents);
            println!("Pending reports:  {}", stats.pending_reports);
            println!("Production:       {}", stats.total_production);
            let recent = dashboard.recent_activities();
            if !recent.is_empty() {
                println!("\nRecent activity");
                for activity in recent {
                    println!("  {}  {}", activity.date_display(), activity.action);
                }
            }
        }
        Command::Login { .. } | Command::Logout | Command::Help => unreachable!("handled in run"),
    }
    Ok(())
}

fn print_job_line(job: &Job) {
    println!(
        "{:>6}  {:<32} #{:<10} {}",
        job.id,
        job.name,
        job.project_number.as_deref().unwrap_or("-"),
        job.status().map(|s| s.to_string()).unwrap_or_default()
    );
}

fn print_job(job: &Job) {
    println!("{} (#{})", job.name, job.project_number.as_deref().unwrap_or("-"));
    if let Some(status) = job.status() {
        println!("  Status:   {}", status);
    }
    if let Some(ref location) = job.location {
        println!("  Location: {}", location);
    }
    if let Some(start) = job.start_date_display() {
        println!("  Started:  {}", start);
    }
    if let Some(ref client) = job.client_name {
        println!("  Client:   {}", client);
    }
}

fn print_element(element: &Element) {
    println!(
        "{} {}",
        element.element_id,
        element.name.as_deref().unwrap_or("")
    );
    println!("  Type:       {}", element.element_type.as_deref().unwrap_or("N/A"));
    println!("  Dimensions: {}", element.dimensions_display());
    println!("  Status:     {}", element.status_label());
    if let Some(phase) = element.phase() {
        println!("  Phase:      {}", phase);
    }
    if let Some(ref assigned) = element.assigned_to {
        println!("  Assigned:   {}", assigned);
    }
    if let Some(ref modified) = element.last_modified {
        println!("  Modified:   {}", staffportal_core::utils::format_date(modified));
    }
    if let Some(ref notes) = element.notes {
        println!("  Notes:      {}", notes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_parse_no_args_is_help() {
        assert_eq!(parse_args(&[]).unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_jobs_query() {
        assert_eq!(parse_args(&args(&["jobs"])).unwrap(), Command::Jobs { query: None });
        assert_eq!(
            parse_args(&args(&["jobs", "harbour", "tower"])).unwrap(),
            Command::Jobs {
                query: Some("harbour tower".to_string())
            }
        );
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_args(&args(&["job", "12"])).unwrap(), Command::Job(12));
        assert!(parse_args(&args(&["job"])).is_err());
        assert!(parse_args(&args(&["element", "abc"])).is_err());
    }

    #[test]
    fn test_parse_update() {
        assert_eq!(
            parse_args(&args(&["update", "5", "--status", "in-progress", "--notes", "half done"]))
                .unwrap(),
            Command::Update {
                id: 5,
                status: Some(ElementStatus::InProgress),
                notes: Some("half done".to_string()),
            }
        );
        assert!(parse_args(&args(&["update", "5", "--status", "finished"])).is_err());
        assert!(parse_args(&args(&["update", "5", "--status"])).is_err());
        assert!(parse_args(&args(&["update", "5", "--colour", "red"])).is_err());
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(parse_args(&args(&["frobnicate"])).is_err());
    }
}
