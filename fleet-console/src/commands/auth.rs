use anyhow::{Context, Result};
use std::io::{self, Write};

use crate::auth::AuthGate;
use crate::config::Config;
use crate::notify::Notice;

pub async fn run_login(config: &Config, username: String, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_secret()?,
    };

    let gate = AuthGate::new(config.session_store());
    let client = config.client()?;

    // GateError::LoginFailed carries the generic credentials notice
    let session = gate.login(&client, &username, &password).await?;

    Notice::success(format!("Signed in as {}", session.username)).emit();
    if let Some(expires_at) = session.expires_at {
        println!(
            "  Session expires: {}",
            expires_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub fn run_logout(config: &Config) -> Result<()> {
    let gate = AuthGate::new(config.session_store());
    match gate.logout()? {
        Some(user) => Notice::success(format!("Signed out {}", user)).emit(),
        None => Notice::info("Not signed in").emit(),
    }
    Ok(())
}

pub fn run_whoami(config: &Config) -> Result<()> {
    let gate = AuthGate::new(config.session_store());
    let session = gate.require_session()?;

    println!("User:           {}", session.username);
    println!("Control plane:  {}", config.api_url);
    println!(
        "Signed in:      {}",
        session
            .issued_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

fn read_secret() -> Result<String> {
    print!("Password: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read password from stdin")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
