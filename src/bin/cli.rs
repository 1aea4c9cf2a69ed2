use anyhow::{bail, Context, Result};
use crabcaps::platform::{ArPlatform, CameraPlatform};
use crabcaps::remote::{
    ActionThrottle, AnonymousAuthenticator, BrowseState, DataBrowser, DirectoryDocumentStore,
    TrustingVerifier, Uploader,
};
use crabcaps::testing::{SyntheticArPlatform, SyntheticCameraPlatform};
use crabcaps::{CapabilityModel, CapabilityReport, CapsConfig};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const USAGE: &str = "Usage: crabcaps-cli <command> [args] [--config <file>] [--synthetic]

Commands:
  report                      Print the capability report of this device
  upload [store_dir]          Upload the report to a directory store
  browse [store_dir]          List uploaded reports as a tree
  export <out.zip|out_dir>    Export uploaded reports (uses --store <dir>)";

#[tokio::main]
async fn main() -> Result<()> {
    crabcaps::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let config = load_config(&args)?;
    let command = &args[1];
    match command.as_str() {
        "report" => cmd_report(&args, &config).await,
        "upload" => cmd_upload(&args, &config).await,
        "browse" => cmd_browse(&args, &config).await,
        "export" => cmd_export(&args, &config).await,
        "--help" | "-h" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}\n\n{}", command, USAGE);
            std::process::exit(1);
        }
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// First argument after the command that is neither a flag nor a flag value
fn positional(args: &[String]) -> Option<&str> {
    let mut iter = args.iter().skip(2);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "--store" => {
                iter.next();
            }
            a if a.starts_with("--") => {}
            a => return Some(a),
        }
    }
    None
}

fn load_config(args: &[String]) -> Result<CapsConfig> {
    match flag_value(args, "--config") {
        Some(path) => CapsConfig::load_layered(path)
            .with_context(|| format!("Failed to load configuration from {}", path)),
        None => Ok(CapsConfig::load_or_default()),
    }
}

fn store_dir(args: &[String], config: &CapsConfig, explicit: Option<&str>) -> PathBuf {
    explicit
        .or_else(|| flag_value(args, "--store"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&config.remote.store_directory))
}

async fn build_report<C: CameraPlatform, A: ArPlatform>(
    camera: C,
    ar: A,
    config: &CapsConfig,
) -> Result<CapabilityReport> {
    let model = CapabilityModel::new(Arc::new(camera), Arc::new(ar), config.aggregator.clone());
    let report = crabcaps::collect_report(&model).await?;

    while let Some(notice) = model.poll_notice().await {
        eprintln!("note: {}", notice);
    }
    Ok(report)
}

#[cfg(feature = "native")]
async fn device_report(args: &[String], config: &CapsConfig) -> Result<CapabilityReport> {
    if args.iter().any(|a| a == "--synthetic") {
        return synthetic_report(config).await;
    }
    build_report(
        crabcaps::platform::NativeCameraPlatform::new(),
        crabcaps::platform::NoArPlatform,
        config,
    )
    .await
}

#[cfg(not(feature = "native"))]
async fn device_report(args: &[String], config: &CapsConfig) -> Result<CapabilityReport> {
    if !args.iter().any(|a| a == "--synthetic") {
        log::info!("Built without the native backend; reporting the synthetic flagship device");
    }
    synthetic_report(config).await
}

async fn synthetic_report(config: &CapsConfig) -> Result<CapabilityReport> {
    build_report(
        SyntheticCameraPlatform::flagship(),
        SyntheticArPlatform::supported(),
        config,
    )
    .await
}

async fn cmd_report(args: &[String], config: &CapsConfig) -> Result<()> {
    let report = device_report(args, config).await?;
    println!("{}", report.to_json_pretty()?);
    Ok(())
}

async fn cmd_upload(args: &[String], config: &CapsConfig) -> Result<()> {
    let report = device_report(args, config).await?;
    let identity = crabcaps::DeviceIdentity::new(
        report.device_brand.clone(),
        report.device_model.clone(),
        report.device_sdk,
    );

    let dir = store_dir(args, config, positional(args));
    std::fs::create_dir_all(&dir).with_context(|| format!("Creating {}", dir.display()))?;
    let uploader = Uploader::new(
        Arc::new(DirectoryDocumentStore::new(&dir)),
        Arc::new(AnonymousAuthenticator::new()),
        Arc::new(TrustingVerifier),
        config.remote.clone(),
    )
    .with_throttle(ActionThrottle::persisted(
        config.remote.min_action_interval(),
        dir.join(".last_upload"),
    ));

    let result = uploader.upload(&identity, &report).await;
    println!("{}", serde_json::to_string(&result)?);
    if result.is_error() {
        bail!("Upload to {} failed", dir.display());
    }
    Ok(())
}

async fn load_tree(dir: &Path, config: &CapsConfig) -> Result<crabcaps::PathTree> {
    let mut browser = DataBrowser::new(
        Arc::new(DirectoryDocumentStore::new(dir)),
        Arc::new(AnonymousAuthenticator::new()),
        config.remote.clone(),
    );

    match browser.populate().await {
        BrowseState::Loaded(tree) => Ok(tree.clone()),
        BrowseState::LoadFailed(message) => bail!("Failed to load reports: {}", message),
        BrowseState::NotLoaded => bail!("No reports loaded from {}", dir.display()),
    }
}

async fn cmd_browse(args: &[String], config: &CapsConfig) -> Result<()> {
    let dir = store_dir(args, config, positional(args));
    let tree = load_tree(&dir, config).await?;

    if args.iter().any(|a| a == "--json") {
        println!("{}", serde_json::to_string(&tree)?);
    } else if tree.is_empty() {
        println!("No reports in {}", dir.display());
    } else {
        print!("{}", tree.render());
    }
    Ok(())
}

async fn cmd_export(args: &[String], config: &CapsConfig) -> Result<()> {
    let Some(out) = positional(args) else {
        eprintln!("Usage: crabcaps-cli export <out.zip|out_dir> [--store <dir>]");
        std::process::exit(1);
    };

    let dir = store_dir(args, config, None);
    let browser = DataBrowser::new(
        Arc::new(DirectoryDocumentStore::new(&dir)),
        Arc::new(AnonymousAuthenticator::new()),
        config.remote.clone(),
    )
    .with_export_throttle(ActionThrottle::persisted(
        config.remote.min_action_interval(),
        dir.join(".last_export"),
    ));

    let out = Path::new(out);
    let written = browser.export(out).await?;
    println!("Exported {} reports to {}", written, out.display());
    Ok(())
}
