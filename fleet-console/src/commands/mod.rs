pub mod auth;
pub mod config_files;
pub mod instance;
pub mod system;

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{self, BufRead, Write};

use crate::auth::{AuthGate, SessionContext};
use crate::cli::Mode;
use crate::config::Config;
use crate::notify::Notice;

/// Session check for protected commands. Runs before any network call.
pub fn protected(config: &Config) -> Result<SessionContext> {
    let gate = AuthGate::new(config.session_store());
    let session = gate.require_session()?;
    let client = config.client()?.with_token(session.token.clone());
    tracing::debug!(user = %session.username, "Session accepted");
    Ok(SessionContext::new(gate, session, client))
}

/// Runs one protected command
pub async fn dispatch(ctx: &SessionContext, config: &Config, mode: Mode) -> Result<()> {
    match mode {
        Mode::List { output, cards } => instance::run_list(ctx, config, output, cards).await,
        Mode::Get { id, output } => instance::run_get(ctx, config, &id, output).await,
        Mode::Create {
            name,
            file,
            description,
            entry_object,
            ports,
            command,
            args,
            image,
            env,
            secrets,
            config: config_paths,
            config_inline,
        } => {
            let request = instance::CreateRequest {
                name,
                file,
                description,
                entry_object,
                ports,
                command,
                args,
                image,
                env,
                secrets,
                config_paths,
                config_inline,
            };
            instance::run_create(ctx, config, request).await
        }
        Mode::Update {
            id,
            description,
            entry_object,
            port,
            command,
            args,
        } => {
            let changes = instance::UpdateRequest {
                description,
                entry_object,
                port,
                command,
                args,
            };
            instance::run_update(ctx, &id, changes).await
        }
        Mode::UploadCode { id, file } => instance::run_upload_code(ctx, &id, file).await,
        Mode::UploadConfig { id, files } => instance::run_upload_config(ctx, &id, files).await,
        Mode::Action { id, action, yes } => {
            instance::run_action(ctx, config, &id, action, yes).await
        }
        Mode::Delete { id, yes } => instance::run_delete(ctx, &id, yes).await,
        Mode::Overview => instance::run_overview(ctx).await,
        Mode::Images { output } => system::run_images(ctx, config, output).await,
        Mode::System { output } => system::run_system(ctx, output).await,
        Mode::Ports { output } => system::run_ports(ctx, output).await,
        Mode::ConfigFiles { command } => config_files::handle_command(ctx, command).await,
        Mode::Login { .. } | Mode::Logout | Mode::Whoami | Mode::Version | Mode::Config => {
            anyhow::bail!("not a protected command")
        }
    }
}

/// A rejected session outranks whatever the command reported, so the operator
/// is always sent back to `fleet login`
pub fn conclude(ctx: &SessionContext, result: Result<()>) -> Result<()> {
    if let Err(e) = ctx.check() {
        if let Err(cause) = &result {
            tracing::debug!(error = %cause, "Command failed after session rejection");
        }
        return Err(e.into());
    }
    result
}

/// Prints a successful notice, or turns an error notice into the command's
/// error so the process exits non-zero
pub fn finish(notice: Notice) -> Result<()> {
    if notice.is_error() {
        anyhow::bail!(notice.message);
    }
    notice.emit();
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", json);
    Ok(())
}

/// Asks a y/N question on stdin
pub fn confirm(question: &str) -> Result<bool> {
    print!("{} (y/N) ", question);
    io::stdout().flush()?;

    let stdin = io::stdin();
    read_confirmation(stdin.lock())
}

fn read_confirmation(mut input: impl BufRead) -> Result<bool> {
    let mut answer = String::new();
    input.read_line(&mut answer)?;

    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
