use anyhow::{Context, Result};
use fleet_models::ImageOption;
use std::fmt;

use crate::auth::SessionContext;
use crate::cli::OutputFormat;
use crate::commands::print_json;
use crate::config::Config;
use crate::views::SystemView;

pub async fn run_images(ctx: &SessionContext, config: &Config, output: OutputFormat) -> Result<()> {
    let images = ctx
        .api()
        .list_images()
        .await
        .context("Failed to fetch images")?;

    match output {
        OutputFormat::Json => print_json(&images),
        OutputFormat::Table => {
            print!("{}", render_images(&images, &config.default_image));
            Ok(())
        }
    }
}

fn render_images(images: &[ImageOption], platform_default: &str) -> String {
    ImageTable {
        images,
        platform_default,
    }
    .to_string()
}

struct ImageTable<'a> {
    images: &'a [ImageOption],
    platform_default: &'a str,
}

impl fmt::Display for ImageTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<50} {:<12}", "IMAGE", "SIZE")?;
        writeln!(f, "{}", "-".repeat(64))?;
        for image in self.images {
            let size = image
                .size
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let marker = if image.name == self.platform_default { " *" } else { "" };
            writeln!(f, "{:<50} {:<12}{}", image.name, size, marker)?;
        }
        writeln!(f)?;
        writeln!(f, "{} image(s) available (* platform default)", self.images.len())
    }
}

pub async fn run_system(ctx: &SessionContext, output: OutputFormat) -> Result<()> {
    let mut view = SystemView::new();
    view.refresh(ctx.api()).await;

    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": view.status(),
            "ports": view.ports(),
        })),
        OutputFormat::Table => {
            println!("{}", view.render());
            Ok(())
        }
    }
}

pub async fn run_ports(ctx: &SessionContext, output: OutputFormat) -> Result<()> {
    let pool = ctx
        .api()
        .port_pool_status()
        .await
        .context("Failed to fetch port pool status")?;

    match output {
        OutputFormat::Json => print_json(&pool),
        OutputFormat::Table => {
            let view = SystemView::with_ports(pool);
            println!("{}", view.render_ports());
            Ok(())
        }
    }
}

pub async fn run_version(config: &Config) -> Result<()> {
    let client = config.client()?;
    let version = client
        .version()
        .await
        .with_context(|| format!("Failed to reach control plane at {}", config.api_url))?;

    println!("Control Plane");
    println!("{}", "=".repeat(60));
    println!("  Name:            {}", version.name);
    println!("  Version:         {}", version.version);
    if !version.description.is_empty() {
        println!("  Description:     {}", version.description);
    }
    println!("  URL:             {}", config.api_url);
    println!();
    println!("Console version:   {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

pub fn run_config(config: &Config) -> Result<()> {
    println!("Fleet Console Configuration");
    println!("{}", "=".repeat(60));
    println!("  API URL:         {}", config.api_url);
    println!("  Home:            {}", config.home.display());
    println!("  Session file:    {}", config.session_store().path().display());
    println!("  Log file:        {}", config.log_path().display());
    println!("  Gateway host:    {}", config.gateway_host);
    println!("  Default image:   {}", config.default_image);
    println!("  HTTP timeout:    {}s", config.http_timeout.as_secs());
    println!("  Fetch retries:   {}", config.fetch_retries);
    println!("  Retry backoff:   {}ms", config.retry_backoff.as_millis());
    Ok(())
}
