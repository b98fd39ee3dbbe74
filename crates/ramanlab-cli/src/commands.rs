//! Command-line surface and the handlers behind it.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::warn;

use ramanlab_core::{
    Config, NotificationLevel, SessionContext, SessionError, ShellEvent, UserProfile,
};

/// Environment variable consulted before prompting for a password
const PASSWORD_ENV: &str = "RAMANLAB_PASSWORD";

#[derive(Debug, Parser)]
#[command(name = "ramanlab", version, about = "Session-aware client for the Raman lab backend")]
pub struct Cli {
    /// Backend API root, overriding config and RAMANLAB_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and cache the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
    },
    /// Forget the cached session
    Logout,
    /// Refresh and show the logged-in user's profile
    Whoami,
    /// Show whether a session is cached, without touching the network
    Status,
    /// GET an API path through the authenticated transport and print the JSON
    Get { path: String },
    /// Resolve a route through the navigation guard
    Open { route: String },
}

/// Print shell events until the shell goes away
pub fn spawn_event_printer(mut rx: broadcast::Receiver<ShellEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ShellEvent::Notify(n)) => match n.level {
                    NotificationLevel::Error => eprintln!("error: {}", n.message),
                    NotificationLevel::Info => eprintln!("{}", n.message),
                },
                Ok(ShellEvent::Navigate(path)) => {
                    eprintln!("Session expired. Run `ramanlab login` to continue ({path}).")
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Dropped shell events"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Wait for the event printer to finish. Returns `false` if it panicked.
pub async fn finish_event_printer(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Event printer task failed");
            false
        }
    }
}

pub async fn run(command: Command, ctx: &SessionContext, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { username } => login(ctx, config, username).await,
        Command::Register { username, email } => register(ctx, &username, &email).await,
        Command::Logout => {
            if ctx.session.logout() {
                println!("Logged out.");
            } else {
                println!("No session to clear.");
            }
            Ok(())
        }
        Command::Whoami => {
            if !ctx.session.is_authenticated() {
                println!("Not logged in.");
                return Ok(());
            }
            ctx.session.fetch_user().await;
            match ctx.session.user() {
                Some(user) => print_user(&user),
                None if ctx.session.is_authenticated() => {
                    println!("Logged in (profile unavailable).")
                }
                None => println!("Not logged in."),
            }
            Ok(())
        }
        Command::Status => {
            let state = ctx.session.snapshot();
            if state.is_authenticated() {
                match state.user {
                    Some(ref user) => println!("Logged in as {}.", user.display_name()),
                    None => println!("Logged in."),
                }
            } else {
                println!("Not logged in.");
            }
            Ok(())
        }
        Command::Get { path } => {
            let value: Value = ctx.transport.get(&path).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Command::Open { route } => {
            let landed = ctx.navigator.navigate(&route)?;
            if landed == route {
                println!("{landed}");
            } else {
                println!("{route} -> {landed}");
            }
            Ok(())
        }
    }
}

async fn login(ctx: &SessionContext, config: &mut Config, username: Option<String>) -> Result<()> {
    let username = match username.or_else(|| config.last_username.clone()) {
        Some(name) if !name.is_empty() => name,
        _ => prompt_username()?,
    };
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ")?,
    };
    if password.is_empty() {
        anyhow::bail!("Username and password required");
    }

    ctx.navigator.navigate(config.login_route())?;
    match ctx.session.login(&username, &password).await {
        Ok(_) if !ctx.session.is_authenticated() => {
            anyhow::bail!("Login succeeded but the server rejected the new session")
        }
        Ok(_) => {
            config.last_username = Some(username.clone());
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            match ctx.session.user() {
                Some(user) => println!("Logged in as {}.", user.display_name()),
                None => println!("Logged in as {username}."),
            }
            Ok(())
        }
        Err(e) => {
            report_session_error(&e);
            Err(anyhow::anyhow!("Login failed"))
        }
    }
}

async fn register(ctx: &SessionContext, username: &str, email: &str) -> Result<()> {
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => {
            let first = rpassword::prompt_password("Password: ")?;
            let second = rpassword::prompt_password("Repeat password: ")?;
            if first != second {
                anyhow::bail!("Passwords do not match");
            }
            first
        }
    };

    match ctx.session.register(username, &password, email).await {
        Ok(_) => {
            println!("Account {username} created. Run `ramanlab login -u {username}` to sign in.");
            Ok(())
        }
        Err(e) => {
            report_session_error(&e);
            Err(anyhow::anyhow!("Registration failed"))
        }
    }
}

/// Print the server's error body field by field
fn report_session_error(err: &SessionError) {
    let Some(body) = err.body() else {
        eprintln!("error: {err}");
        return;
    };

    if let Some(message) = body.message() {
        eprintln!("error: {message}");
    }
    for (field, messages) in body.field_errors() {
        for message in messages {
            eprintln!("  {field}: {message}");
        }
    }
}

fn print_user(user: &UserProfile) {
    println!("{} (id {})", user.display_name(), user.id);
    for (key, value) in &user.extra {
        println!("  {key}: {value}");
    }
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin()
        .read_line(&mut username)
        .context("Failed to read username")?;
    Ok(username.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login() {
        let cli = Cli::try_parse_from(["ramanlab", "login", "-u", "alice"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Login { username: Some(ref u) } if u == "alice"
        ));
        assert!(cli.api_url.is_none());
    }

    #[test]
    fn test_parse_global_api_url() {
        let cli = Cli::try_parse_from([
            "ramanlab",
            "get",
            "records/",
            "--api-url",
            "http://10.0.0.2:8000/api/v1/",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://10.0.0.2:8000/api/v1/"));
        assert!(matches!(cli.command, Command::Get { ref path } if path == "records/"));
    }

    #[tokio::test]
    async fn test_event_printer_stops_when_shell_drops() {
        let (tx, rx) = broadcast::channel(4);
        let printer = spawn_event_printer(rx);
        tx.send(ShellEvent::Navigate("/login".to_string())).unwrap();
        drop(tx);
        assert!(finish_event_printer(printer).await);
    }

    #[tokio::test]
    async fn test_finish_event_printer_reports_panic() {
        let printer = tokio::spawn(async { panic!("printer failed") });
        assert!(!finish_event_printer(printer).await);
    }

    #[test]
    fn test_register_requires_email() {
        assert!(Cli::try_parse_from(["ramanlab", "register", "-u", "alice"]).is_err());
    }
}
