use anyhow::{Context, Result};
use fleet_client::{ClientError, ConfigEntry, ControlPlane, FilePart};
use fleet_models::{Instance, LifecycleAction};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::auth::SessionContext;
use crate::cli::OutputFormat;
use crate::commands::{confirm, finish, print_json};
use crate::config::Config;
use crate::forms::{CreateInstanceDialog, CreateInstanceForm, EditInstanceDialog, EnvVarEntry};
use crate::notify::Notice;
use crate::views::{dashboard, overview, InstanceListView};

/// Create options as given on the command line
#[derive(Debug, Default)]
pub struct CreateRequest {
    pub name: String,
    pub file: Option<PathBuf>,
    pub description: Option<String>,
    pub entry_object: String,
    pub ports: Option<String>,
    pub command: Option<String>,
    pub args: Option<String>,
    pub image: Option<String>,
    pub env: Vec<(String, String)>,
    pub secrets: Vec<(String, String)>,
    pub config_paths: Vec<PathBuf>,
    pub config_inline: Vec<(String, String)>,
}

/// Fields to change; `None` keeps the current value
#[derive(Debug, Default)]
pub struct UpdateRequest {
    pub description: Option<String>,
    pub entry_object: Option<String>,
    pub port: Option<String>,
    pub command: Option<String>,
    pub args: Option<String>,
}

// ============================================================================
// Listing
// ============================================================================

pub async fn run_list(
    ctx: &SessionContext,
    config: &Config,
    output: OutputFormat,
    cards: bool,
) -> Result<()> {
    let mut view = InstanceListView::new();
    view.refresh(ctx.api())
        .await
        .context("Failed to fetch instances")?;

    match output {
        OutputFormat::Json => print_json(view.instances()),
        OutputFormat::Table if cards => {
            if view.instances().is_empty() {
                println!("No instances yet. Create one with `fleet create`.");
            } else {
                let color = std::io::stdout().is_terminal();
                println!("{}", view.render_cards(&config.gateway_host, color));
            }
            Ok(())
        }
        OutputFormat::Table => {
            println!("{}", view.render_table());
            Ok(())
        }
    }
}

pub async fn run_get(
    ctx: &SessionContext,
    config: &Config,
    key: &str,
    output: OutputFormat,
) -> Result<()> {
    let instance = resolve(ctx.api(), key).await?;

    if output == OutputFormat::Json {
        return print_json(&instance);
    }

    let color = std::io::stdout().is_terminal();
    print!("{}", dashboard::render_card(&instance, &config.gateway_host, color));
    println!("  Image:       {}", instance.image.as_deref().unwrap_or("-"));
    println!("  Command:     {}", instance.command.as_deref().unwrap_or("-"));
    println!("  Args:        {}", instance.args.as_deref().unwrap_or("-"));
    println!(
        "  Created:     {}",
        crate::views::system::format_date(instance.created_at.as_deref().unwrap_or(""))
    );

    let mappings = instance.host_port_map();
    if !mappings.is_empty() {
        println!();
        println!("Port mappings:");
        for (container, host) in &mappings {
            println!("  {:<8} -> {}", container, host);
        }
    }

    if !instance.env_vars.is_empty() {
        println!();
        println!("Environment:");
        for var in &instance.env_vars {
            println!("  {}={}", var.key, var.display_value());
        }
    }

    if !instance.config_files.is_empty() {
        println!();
        println!("Config files:");
        for file in &instance.config_files {
            println!("  [{}] {}", file.id, file.filename);
        }
    }

    Ok(())
}

/// Finds an instance by id, falling back to a name match in the full list
pub async fn resolve(api: &dyn ControlPlane, key: &str) -> Result<Instance> {
    match api.get_instance(key).await {
        Ok(instance) => Ok(instance),
        Err(ClientError::NotFound(_)) => {
            let mut view = InstanceListView::new();
            view.refresh(api)
                .await
                .context("Failed to fetch instances")?;
            view.find(key)
                .cloned()
                .with_context(|| format!("Instance '{}' not found", key))
        }
        Err(e) => Err(e).with_context(|| format!("Failed to fetch instance '{}'", key)),
    }
}

pub async fn run_overview(ctx: &SessionContext) -> Result<()> {
    let stats = overview::load(ctx.api())
        .await
        .context("Failed to fetch instances")?;
    print!("{}", overview::render(&stats));
    Ok(())
}

// ============================================================================
// Create / edit
// ============================================================================

pub async fn run_create(ctx: &SessionContext, config: &Config, request: CreateRequest) -> Result<()> {
    let mut dialog = CreateInstanceDialog::new();
    dialog.open();
    dialog.form = build_create_form(request).await?;

    if let Err(e) = dialog.form.validate() {
        anyhow::bail!(e);
    }

    if dialog.form.image.is_none() {
        match ctx.api().list_images().await {
            Ok(images) => dialog.form.apply_image_options(&images, &config.default_image),
            Err(e) => tracing::warn!(error = %e, "Failed to fetch images, using server default"),
        }
    }

    let mut created = false;
    let notice = dialog.submit(ctx.api(), || created = true).await;
    finish(notice)?;

    if created {
        let mut view = InstanceListView::new();
        if view.refresh(ctx.api()).await.is_ok() {
            println!();
            println!("{}", view.render_table());
        }
    }
    Ok(())
}

/// Reads referenced files and fills a create form
pub async fn build_create_form(request: CreateRequest) -> Result<CreateInstanceForm> {
    let mut form = CreateInstanceForm {
        name: request.name,
        description: request.description.unwrap_or_default(),
        entry_object: request.entry_object,
        ports: request.ports.unwrap_or_default(),
        command: request.command.unwrap_or_default(),
        args: request.args.unwrap_or_default(),
        image: request.image.filter(|i| !i.trim().is_empty()),
        ..Default::default()
    };

    for (key, value) in request.env {
        form.add_env_var(EnvVarEntry::new(key, value, false));
    }
    for (key, value) in request.secrets {
        form.add_env_var(EnvVarEntry::new(key, value, true));
    }

    for (filename, content) in request.config_inline {
        form.add_config_file(ConfigEntry::Inline { filename, content });
    }
    for path in request.config_paths {
        form.add_config_file(ConfigEntry::Upload(read_file(&path).await?));
    }

    if let Some(path) = request.file {
        form.code = Some(read_file(&path).await?);
    }

    Ok(form)
}

pub async fn run_update(ctx: &SessionContext, key: &str, changes: UpdateRequest) -> Result<()> {
    let instance = resolve(ctx.api(), key).await?;
    let mut dialog = EditInstanceDialog::new(&instance);
    apply_changes(&mut dialog, changes);

    let notice = dialog.save(ctx.api()).await;
    finish(notice)?;
    Notice::info(dialog.warning()).emit();
    Ok(())
}

fn apply_changes(dialog: &mut EditInstanceDialog, changes: UpdateRequest) {
    let form = &mut dialog.form;
    if let Some(description) = changes.description {
        form.description = description;
    }
    if let Some(entry_object) = changes.entry_object {
        form.entry_object = entry_object;
    }
    if let Some(port) = changes.port {
        form.port = port;
    }
    if let Some(command) = changes.command {
        form.command = command;
    }
    if let Some(args) = changes.args {
        form.args = args;
    }
}

pub async fn run_upload_code(ctx: &SessionContext, key: &str, path: PathBuf) -> Result<()> {
    let instance = resolve(ctx.api(), key).await?;
    let file = read_file(&path).await?;

    let mut dialog = EditInstanceDialog::new(&instance);
    finish(dialog.upload_code(ctx.api(), file).await)
}

pub async fn run_upload_config(ctx: &SessionContext, key: &str, paths: Vec<PathBuf>) -> Result<()> {
    let instance = resolve(ctx.api(), key).await?;
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        files.push(read_file(path).await?);
    }

    let mut dialog = EditInstanceDialog::new(&instance);
    finish(dialog.upload_config(ctx.api(), files).await)
}

async fn read_file(path: &std::path::Path) -> Result<FilePart> {
    FilePart::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

// ============================================================================
// Lifecycle
// ============================================================================

pub async fn run_action(
    ctx: &SessionContext,
    config: &Config,
    key: &str,
    action: LifecycleAction,
    yes: bool,
) -> Result<()> {
    let instance = resolve(ctx.api(), key).await?;

    if action.is_destructive() && !yes {
        println!("⚠️  {} {}", action, instance.name);
        println!();
        println!("  ID:       {}", instance.id);
        println!("  Status:   {}", instance.status);
        println!();
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let mut view = InstanceListView::new();
    let notice = view.run_action(ctx.api(), &instance.id, action).await;

    if let Some(updated) = view.find(&instance.id) {
        let color = std::io::stdout().is_terminal();
        print!("{}", dashboard::render_card(updated, &config.gateway_host, color));
        println!();
    }
    finish(notice)
}

pub async fn run_delete(ctx: &SessionContext, key: &str, yes: bool) -> Result<()> {
    let instance = resolve(ctx.api(), key).await?;

    if !yes {
        println!("⚠️  Delete Instance");
        println!();
        println!("  ID:       {}", instance.id);
        println!("  Name:     {}", instance.name);
        println!("  Status:   {}", instance.status);
        println!();
        println!("This removes the instance record, its container and its files.");
        println!();
        if !confirm("Are you sure you want to delete?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    finish(delete(ctx.api(), &instance).await)
}

async fn delete(api: &dyn ControlPlane, instance: &Instance) -> Notice {
    match api.delete_instance(&instance.id).await {
        Ok(()) => {
            tracing::info!(id = %instance.id, name = %instance.name, "Instance deleted");
            Notice::success(format!("Instance '{}' deleted", instance.name))
        }
        Err(e) => {
            tracing::error!(id = %instance.id, error = %e, "Failed to delete instance");
            Notice::error("Failed to delete instance")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{instance, Call, RecordingControlPlane};
    use fleet_models::InstanceStatus;

    #[tokio::test]
    async fn test_resolve_by_id_then_name() {
        let api = RecordingControlPlane::with_instances(vec![instance(
            "srv-1",
            "weather",
            InstanceStatus::Running,
        )]);

        assert_eq!(resolve(&api, "srv-1").await.unwrap().name, "weather");
        assert_eq!(resolve(&api, "weather").await.unwrap().id, "srv-1");
        assert_eq!(
            api.calls(),
            vec![
                Call::GetInstance("srv-1".to_string()),
                Call::GetInstance("weather".to_string()),
                Call::ListInstances,
            ]
        );

        let err = resolve(&api, "missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Instance 'missing' not found");
    }

    #[tokio::test]
    async fn test_build_create_form_collects_env_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let code = dir.path().join("server.py");
        let settings = dir.path().join("settings.json");
        std::fs::write(&code, "print('hi')").unwrap();
        std::fs::write(&settings, "{}").unwrap();

        let form = build_create_form(CreateRequest {
            name: "demo".to_string(),
            file: Some(code),
            entry_object: "mcp".to_string(),
            env: vec![("DEBUG".to_string(), "1".to_string())],
            secrets: vec![("API_KEY".to_string(), "s3cr3t".to_string())],
            config_paths: vec![settings],
            config_inline: vec![("extra.ini".to_string(), "[a]".to_string())],
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(form.env_vars.len(), 2);
        assert!(!form.env_vars[0].is_secret);
        assert!(form.env_vars[1].is_secret);
        assert_eq!(form.config_files[0].filename(), "extra.ini");
        assert_eq!(form.config_files[1].filename(), "settings.json");
        assert_eq!(form.code.as_ref().map(|c| c.filename.as_str()), Some("server.py"));
        assert!(form.validate().is_ok());
    }

    #[tokio::test]
    async fn test_build_create_form_missing_file_is_an_error() {
        let err = build_create_form(CreateRequest {
            name: "demo".to_string(),
            file: Some(PathBuf::from("/nonexistent/server.py")),
            ..Default::default()
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/server.py"));
    }

    #[tokio::test]
    async fn test_form_without_code_is_invalid() {
        let form = build_create_form(CreateRequest {
            name: "demo".to_string(),
            entry_object: "mcp".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(
            form.validate().unwrap_err().to_string(),
            "Select a code file (.py or .zip)"
        );
    }

    #[test]
    fn test_apply_changes_only_touches_given_fields() {
        let mut inst = instance("srv-1", "weather", InstanceStatus::Running);
        inst.command = Some("uv".to_string());
        let mut dialog = EditInstanceDialog::new(&inst);

        apply_changes(
            &mut dialog,
            UpdateRequest {
                description: Some("Forecasts".to_string()),
                port: Some(String::new()),
                ..Default::default()
            },
        );

        assert_eq!(dialog.form.description, "Forecasts");
        assert_eq!(dialog.form.command, "uv");
        assert_eq!(dialog.form.port, "");
        assert_eq!(dialog.form.to_update().unwrap().port, None);
    }

    #[tokio::test]
    async fn test_delete_notice() {
        let inst = instance("srv-1", "weather", InstanceStatus::Stopped);
        let api = RecordingControlPlane::with_instances(vec![inst.clone()]);

        assert_eq!(
            delete(&api, &inst).await,
            Notice::success("Instance 'weather' deleted")
        );
        assert!(api.calls().contains(&Call::DeleteInstance("srv-1".to_string())));

        api.fail_mutations();
        assert_eq!(delete(&api, &inst).await, Notice::error("Failed to delete instance"));
    }
}
