use anyhow::{Context, Result};
use fleet_client::ControlPlane;
use fleet_models::{ConfigFileContent, Instance};
use std::path::PathBuf;

use crate::auth::SessionContext;
use crate::cli::{ConfigFilesCommand, OutputFormat};
use crate::commands::instance::resolve;
use crate::commands::{confirm, finish, print_json};
use crate::notify::Notice;

pub async fn handle_command(ctx: &SessionContext, command: ConfigFilesCommand) -> Result<()> {
    match command {
        ConfigFilesCommand::List { id, output } => list(ctx, &id, output).await,
        ConfigFilesCommand::Add {
            id,
            filename,
            from,
            content,
        } => {
            let instance = resolve(ctx.api(), &id).await?;
            let file = content_for(filename, from, content).await?;
            finish(add(ctx.api(), &instance, &file).await)
        }
        ConfigFilesCommand::Update {
            id,
            config_id,
            filename,
            from,
            content,
        } => {
            let instance = resolve(ctx.api(), &id).await?;
            let file = content_for(filename, from, content).await?;
            finish(update(ctx.api(), &instance, config_id, &file).await)
        }
        ConfigFilesCommand::Remove { id, config_id, yes } => {
            let instance = resolve(ctx.api(), &id).await?;
            if !yes && !confirm(&format!("Remove config file {} from '{}'?", config_id, instance.name))? {
                println!("Cancelled.");
                return Ok(());
            }
            finish(remove(ctx.api(), &instance, config_id).await)
        }
    }
}

async fn list(ctx: &SessionContext, key: &str, output: OutputFormat) -> Result<()> {
    let instance = resolve(ctx.api(), key).await?;
    let files = ctx
        .api()
        .list_config_files(&instance.id)
        .await
        .with_context(|| format!("Failed to fetch config files of '{}'", instance.name))?;

    if output == OutputFormat::Json {
        return print_json(&files);
    }

    println!("{:<8} {:<32} {:<10} {:<20}", "ID", "FILENAME", "BYTES", "UPDATED");
    println!("{}", "-".repeat(72));
    for file in &files {
        let updated = file
            .updated_at
            .as_deref()
            .or(file.created_at.as_deref())
            .unwrap_or("");
        println!(
            "{:<8} {:<32} {:<10} {:<20}",
            file.id,
            file.filename,
            file.content.len(),
            crate::views::system::format_date(updated)
        );
    }
    println!();
    println!("{} config file(s) found", files.len());
    Ok(())
}

/// Content comes from `--content` or from the file at `--from`
async fn content_for(
    filename: String,
    from: Option<PathBuf>,
    content: Option<String>,
) -> Result<ConfigFileContent> {
    if filename.trim().is_empty() {
        anyhow::bail!("Config file needs a filename");
    }

    let content = match (from, content) {
        (Some(path), _) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, Some(content)) => content,
        (None, None) => anyhow::bail!("Provide the content with --content or --from"),
    };

    Ok(ConfigFileContent { filename, content })
}

async fn add(api: &dyn ControlPlane, instance: &Instance, file: &ConfigFileContent) -> Notice {
    match api.add_config_file(&instance.id, file).await {
        Ok(created) => {
            tracing::info!(id = %instance.id, config_id = created.id, "Config file added");
            Notice::success(format!("Added {} [{}]", created.filename, created.id))
        }
        Err(e) => {
            tracing::error!(id = %instance.id, error = %e, "Failed to add config file");
            Notice::error("Failed to add config file")
        }
    }
}

async fn update(
    api: &dyn ControlPlane,
    instance: &Instance,
    config_id: i64,
    file: &ConfigFileContent,
) -> Notice {
    match api.update_config_file(&instance.id, config_id, file).await {
        Ok(updated) => {
            tracing::info!(id = %instance.id, config_id, "Config file updated");
            Notice::success(format!("Updated {} [{}]", updated.filename, updated.id))
        }
        Err(e) => {
            tracing::error!(id = %instance.id, config_id, error = %e, "Failed to update config file");
            Notice::error("Failed to update config file")
        }
    }
}

async fn remove(api: &dyn ControlPlane, instance: &Instance, config_id: i64) -> Notice {
    match api.delete_config_file(&instance.id, config_id).await {
        Ok(()) => {
            tracing::info!(id = %instance.id, config_id, "Config file removed");
            Notice::success(format!("Removed config file {}", config_id))
        }
        Err(e) => {
            tracing::error!(id = %instance.id, config_id, error = %e, "Failed to remove config file");
            Notice::error("Failed to remove config file")
        }
    }
}
