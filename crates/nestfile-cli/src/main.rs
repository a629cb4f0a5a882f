//! Nestfile CLI
//!
//! Inspect files on disk and inside nested zip and jar archives through one
//! path syntax, e.g. `nestfile cat dist.zip/lib/app.jar/META-INF/MANIFEST.MF`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nestfile_core::{Vfs, VfsConfig, VirtualFile};
use nestfile_providers::{vfs_with_defaults, JarProvider};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nestfile")]
#[command(about = "Browse files inside nested archives", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON configuration file
    #[arg(long, global = true, env = "NESTFILE_CONFIG")]
    config: Option<PathBuf>,

    /// Path separator
    #[arg(long, global = true)]
    separator: Option<char>,

    /// Maximum container nesting depth
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Judge archives inside archives by name only, without reading them
    #[arg(long, global = true)]
    no_probe_nested: bool,

    /// Memory-map archives opened from disk
    #[arg(long, global = true)]
    mmap: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true, env = "RUST_LOG")]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Show existence, kind and container chain
    Stat { path: String },

    /// List a directory or container
    Ls {
        path: String,

        /// Include every descendant
        #[arg(short, long)]
        recursive: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write a file's bytes to stdout
    Cat { path: String },

    /// Report formats matching a file's signature bytes
    Identify { path: String },

    /// Print a jar's manifest
    Manifest {
        path: String,

        /// Print JSON instead of attribute lines
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_level.as_str())
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let vfs = vfs_with_defaults(load_config(&cli)?);

    match cli.command {
        Command::Stat { path } => cmd_stat(&vfs, &path),
        Command::Ls { path, recursive, json } => cmd_ls(&vfs, &path, recursive, json),
        Command::Cat { path } => cmd_cat(&vfs, &path),
        Command::Identify { path } => cmd_identify(&vfs, &path),
        Command::Manifest { path, json } => cmd_manifest(&vfs, &path, json),
    }
}

/// Configuration file (if any) overridden by flags
fn load_config(cli: &Cli) -> Result<VfsConfig> {
    let mut config = match &cli.config {
        Some(path) => VfsConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => VfsConfig::default(),
    };

    if let Some(separator) = cli.separator {
        config = config.with_separator(separator);
    }
    if let Some(max_depth) = cli.max_depth {
        config = config.with_max_depth(max_depth);
    }
    if cli.no_probe_nested {
        config = config.with_probe_nested_content(false);
    }
    if cli.mmap {
        config = config.with_mmap(true);
    }

    tracing::debug!(?config, "Effective configuration");
    Ok(config)
}

fn resolve(vfs: &Vfs, path: &str) -> Result<VirtualFile> {
    vfs.resolve_path(path)
        .with_context(|| format!("Failed to resolve {}", path))
}

fn kind_of(file: &VirtualFile) -> Result<&'static str> {
    Ok(if file.is_container() {
        "container"
    } else if file.is_directory()? {
        "directory"
    } else if file.is_file()? {
        "file"
    } else {
        "missing"
    })
}

fn cmd_stat(vfs: &Vfs, path: &str) -> Result<()> {
    let file = resolve(vfs, path)?;
    let exists = file.exists()?;

    println!("=== Virtual File ===");
    println!("Path:       {}", file);
    println!("Exists:     {}", if exists { "Yes" } else { "No" });
    if exists {
        println!("Kind:       {}", kind_of(&file)?);
    }
    if let Some(format) = file.container_provider() {
        println!("Format:     {}", format.identify());
    }
    println!("Depth:      {}", file.depth());

    let chain = file.containers();
    if !chain.is_empty() {
        println!();
        println!("=== Container Chain ===");
        for (level, container) in chain.iter().enumerate() {
            let provider = container
                .container_provider()
                .map(|p| p.identify())
                .unwrap_or("?");
            println!("{:<3} {:<6} {}", level, provider, container);
        }
    }

    Ok(())
}

fn cmd_ls(vfs: &Vfs, path: &str, recursive: bool, json: bool) -> Result<()> {
    let dir = resolve(vfs, path)?;
    let children = dir.list_files(recursive)?;

    if json {
        let mut rows = Vec::with_capacity(children.len());
        for child in &children {
            rows.push(serde_json::json!({
                "path": child.path(),
                "name": child.name(),
                "kind": kind_of(child)?,
                "format": child.container_provider().map(|p| p.identify().to_string()),
                "depth": child.depth(),
            }));
        }
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if children.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    println!("{:<10} {}", "Kind", "Path");
    println!("{}", "-".repeat(60));
    for child in &children {
        println!("{:<10} {}", kind_of(child)?, child);
    }
    println!();
    println!("{} entries", children.len());

    Ok(())
}

fn cmd_cat(vfs: &Vfs, path: &str) -> Result<()> {
    let file = resolve(vfs, path)?;
    let mut stream = file.open_stream()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let copied = io::copy(&mut stream, &mut out)?;
    out.flush()?;

    tracing::debug!(path = file.path(), bytes = copied, "Copied entry to stdout");
    Ok(())
}

fn cmd_identify(vfs: &Vfs, path: &str) -> Result<()> {
    let file = resolve(vfs, path)?;
    let tags = file.identify()?;

    println!("Path:       {}", file);
    if tags.is_empty() {
        println!("Signatures: none");
    } else {
        println!("Signatures: {}", tags.join(", "));
    }
    match file.container_provider() {
        Some(format) => println!("Container:  {}", format.identify()),
        None => println!("Container:  No"),
    }

    Ok(())
}

fn cmd_manifest(vfs: &Vfs, path: &str, json: bool) -> Result<()> {
    let jar = resolve(vfs, path)?;
    let Some(manifest) = JarProvider::new().manifest(&jar)? else {
        println!("No manifest in {}", jar);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    for (name, value) in &manifest.main {
        println!("{}: {}", name, value);
    }
    for (section, attributes) in &manifest.sections {
        println!();
        println!("[{}]", section);
        for (name, value) in attributes {
            println!("{}: {}", name, value);
        }
    }

    Ok(())
}
