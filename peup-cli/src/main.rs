//! PEUP CLI
//!
//! Command-line interface for the PEUP intent-routing gateway.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use peup_api::{ApiConfig, ApiServer};
use peup_cache::{ManifestService, ServiceConfig};
use peup_core::constants::DEFAULT_RESOLVE_TIMEOUT_MS;
use peup_core::traits::ManifestRegistry;
use peup_core::types::{Deadline, Manifest};
use peup_registry::{FileRegistry, HttpRegistry, StaticFallback};

/// PEUP - Intent-routing manifest gateway
#[derive(Parser)]
#[command(name = "peup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where manifests come from.
#[derive(clap::Args, Clone, Debug)]
struct SourceArgs {
    /// Remote discovery service (overrides --manifest-dir)
    #[arg(long, env = "PEUP_REGISTRY_URL")]
    registry_url: Option<String>,
    /// Directory of <scope>_manifest.json files
    #[arg(long, env = "PEUP_MANIFEST_DIR")]
    manifest_dir: Option<PathBuf>,
    /// Manifest served when the registry fails
    #[arg(long, env = "PEUP_FALLBACK_MANIFEST")]
    fallback: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Binary encoding, hex dumped
    Binary,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Resolve a scope once and print its manifest
    Resolve {
        /// Scope to resolve
        scope: String,
        #[command(flatten)]
        source: SourceArgs,
        /// Output encoding
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Resolution budget in milliseconds
        #[arg(long, default_value_t = DEFAULT_RESOLVE_TIMEOUT_MS)]
        timeout_ms: u64,
    },

    /// Check a manifest file
    Validate {
        /// Path to the manifest JSON
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "peup=debug,info"
    } else {
        "peup=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve { port, bind, source } => cmd_serve(port, &bind, source).await,
        Commands::Resolve {
            scope,
            source,
            format,
            timeout_ms,
        } => cmd_resolve(&scope, source, format, timeout_ms).await,
        Commands::Validate { path } => cmd_validate(&path).await,
    }
}

/// Run the HTTP gateway
async fn cmd_serve(port: u16, bind: &str, source: SourceArgs) -> Result<()> {
    println!("{}", "🚀 Starting PEUP gateway...".cyan().bold());

    let mut config = ApiConfig::from_env().context("Invalid configuration")?;
    if source.registry_url.is_some() {
        config.registry_url = source.registry_url;
    }
    if let Some(dir) = source.manifest_dir {
        config.manifest_dir = dir;
    }
    if source.fallback.is_some() {
        config.fallback_manifest = source.fallback;
    }

    match &config.registry_url {
        Some(url) => println!("   {} {}", "Registry:".green(), url),
        None => println!("   {} {}", "Manifests:".green(), config.manifest_dir.display()),
    }
    if let Some(path) = &config.fallback_manifest {
        println!("   {} {}", "Fallback:".green(), path.display());
    }

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .context("Invalid bind address")?;
    println!("   {} http://{}", "Listening on:".green(), addr);
    println!("   {} http://{}/health", "Health check:".dimmed(), addr);
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ApiServer::from_config(config)
        .await
        .context("Failed to build gateway")?;
    server.run(addr).await?;

    Ok(())
}

/// Resolve one scope
async fn cmd_resolve(
    scope: &str,
    source: SourceArgs,
    format: OutputFormat,
    timeout_ms: u64,
) -> Result<()> {
    println!("{} {}", "🔍 Resolving:".cyan().bold(), scope);

    let registry: Arc<dyn ManifestRegistry> = match source.registry_url {
        Some(url) => Arc::new(HttpRegistry::new(url).context("Invalid registry URL")?),
        None => Arc::new(FileRegistry::new(
            source.manifest_dir.unwrap_or_else(|| PathBuf::from("manifests")),
        )),
    };

    let config = ServiceConfig {
        resolve_timeout_ms: timeout_ms,
        ..Default::default()
    };
    let mut service = ManifestService::with_config(registry, config);
    if let Some(path) = source.fallback {
        let fallback = StaticFallback::from_file(&path)
            .await
            .with_context(|| format!("Failed to load fallback manifest {}", path.display()))?;
        service = service.with_fallback(Arc::new(fallback));
    }

    let resolution = service
        .resolve(scope, Some(Deadline::after_millis(timeout_ms)))
        .await
        .with_context(|| format!("Failed to resolve scope '{}'", scope))?;

    let label = format!("✅ Resolved from {}:", resolution.source);
    if resolution.is_degraded() {
        println!("\n{}", label.yellow().bold());
    } else {
        println!("\n{}", label.green().bold());
    }

    let manifest = &resolution.manifest;
    println!("   {} {}", "Service:".dimmed(), manifest.service_id);
    println!("   {} {}", "Version:".dimmed(), manifest.version);
    println!(
        "   {} {} ({})",
        "Endpoint:".dimmed(),
        manifest.endpoint.url,
        manifest.endpoint.protocol
    );
    if let Some(ttl) = resolution.expires_in() {
        println!("   {} {}s", "Cached for:".dimmed(), ttl.as_secs());
    }

    match format {
        OutputFormat::Json => {
            println!("\n{}", serde_json::to_string_pretty(manifest.as_ref())?);
        }
        OutputFormat::Binary => {
            let bytes = manifest.to_bytes()?;
            println!("\n   {} {} bytes", "Binary:".dimmed(), bytes.len());
            println!("{}", hex::encode(bytes));
        }
    }

    Ok(())
}

/// Check a manifest file
async fn cmd_validate(path: &Path) -> Result<()> {
    println!("{} {}", "🧪 Validating:".cyan().bold(), path.display());

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let manifest = Manifest::from_json(&bytes).context("Not a manifest")?;

    if let Err(e) = manifest.validate() {
        println!("\n{} {}", "❌ Invalid:".red().bold(), e);
        anyhow::bail!("manifest {} is invalid", path.display());
    }

    println!("\n{}", "✅ Manifest is valid".green().bold());
    println!("   {} {}", "Service:".dimmed(), manifest.service_id);
    println!("   {} {}", "Protocol:".dimmed(), manifest.endpoint.protocol);
    if manifest.metadata.cache_ttl_seconds == 0 {
        println!(
            "   {} {}s (default)",
            "Cache TTL:".dimmed(),
            manifest.cache_ttl().as_secs()
        );
    } else {
        println!("   {} {}s", "Cache TTL:".dimmed(), manifest.cache_ttl().as_secs());
    }

    Ok(())
}
