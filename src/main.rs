use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use oneatlas::{
    BatchPolicy, Client, CredentialStore, Credentials, Workflow, is_valid_api_key, logging,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "oneatlas")]
#[command(about = "Download products delivered to your Airbus OneAtlas Data workspace", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory for per-session log files
    #[arg(long, value_name = "DIR", global = true)]
    logs_dir: Option<PathBuf>,

    /// Settings file (defaults to ONEATLAS_SETTINGS or the user config directory)
    #[arg(long, value_name = "FILE", global = true)]
    settings: Option<PathBuf>,

    /// Hide the download progress bar
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct KeyArg {
    /// OneAtlas Data API key (overrides the stored one)
    #[arg(long, env = "ONEATLAS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the API key and/or download directory
    Configure {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,
    },
    /// List products in the workspace, newest first
    Products {
        #[command(flatten)]
        key: KeyArg,
    },
    /// Download one product or all of them
    #[command(group(
        clap::ArgGroup::new("selection")
            .required(true)
            .args(["product", "all"])
    ))]
    Download {
        #[command(flatten)]
        key: KeyArg,
        /// Product id, or a line printed by `products`
        #[arg(long)]
        product: Option<String>,
        /// Download every product in the workspace
        #[arg(long)]
        all: bool,
        /// Unzip each archive next to it
        #[arg(long)]
        extract: bool,
        /// Carry on with the next product when one fails
        #[arg(long)]
        keep_going: bool,
        /// Target directory (overrides the stored one)
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,
    },
    /// Print a product footprint as GeoJSON
    Footprint {
        #[command(flatten)]
        key: KeyArg,
        product: String,
    },
}

fn api_key(store: &CredentialStore, key: KeyArg) -> Result<String> {
    let key = match key.api_key {
        Some(k) => k,
        None => {
            store
                .load()
                .context("no API key given and no usable settings file (run `oneatlas configure`)")?
                .api_key
        }
    };
    if !is_valid_api_key(&key) {
        bail!("the API key is empty or contains whitespace");
    }
    Ok(key.trim().to_string())
}

fn entrypoint(cli: Cli) -> Result<()> {
    let store = match cli.settings {
        Some(path) => CredentialStore::new(path),
        None => CredentialStore::locate(),
    };
    let mut report = |msg: &str| {
        info!("{}", msg);
        eprintln!("{}", msg);
    };

    match cli.command {
        Commands::Configure {
            api_key,
            download_dir,
        } => {
            let mut creds = if store.exists() {
                store.load()?
            } else {
                Credentials::default()
            };
            if let Some(key) = api_key {
                if !is_valid_api_key(&key) {
                    bail!("the API key is empty or contains whitespace");
                }
                creds.api_key = key.trim().to_string();
            }
            if let Some(dir) = download_dir {
                if !dir.is_dir() {
                    bail!("{} is not a directory", dir.display());
                }
                creds.download_dir = dir.display().to_string();
            }
            store.save(&creds)?;
            eprintln!("Settings written to {}", store.path().display());
        }
        Commands::Products { key } => {
            let key = api_key(&store, key)?;
            let client = Client::from_env()?;
            let token = client.token(&key)?;
            let workspace = client.workspace_id(&token)?;
            for product in client.list_products(&token, &workspace)? {
                println!("{}", product);
            }
        }
        Commands::Download {
            key,
            product,
            all,
            extract,
            keep_going,
            download_dir,
        } => {
            let api_key = api_key(&store, key)?;
            let download_dir = match download_dir {
                Some(dir) => dir,
                None => store
                    .load()
                    .context("no --download-dir given and no usable settings file")?
                    .existing_download_dir()
                    .with_context(|| {
                        format!(
                            "no --download-dir given and {} holds no existing download directory \
                             (run `oneatlas configure --download-dir <DIR>`)",
                            store.path().display()
                        )
                    })?,
            };
            let client = Client::from_env()?.with_progress(!cli.no_progress);
            let workflow = Workflow::new(&client, download_dir)
                .extract(extract)
                .policy(if keep_going {
                    BatchPolicy::Continue
                } else {
                    BatchPolicy::Abort
                });

            let summary = match (all, product) {
                (true, _) => workflow.run_all(&api_key, &mut report)?,
                (false, Some(product)) => workflow.run_single(&api_key, &product, &mut report)?,
                (false, None) => bail!("either --product or --all is required"),
            };
            eprintln!(
                "{} downloaded, {} already present, {} extracted, {} failed",
                summary.downloaded.len(),
                summary.skipped.len(),
                summary.extracted.len(),
                summary.failed.len()
            );
            if !summary.failed.is_empty() {
                bail!("{} product(s) failed", summary.failed.len());
            }
        }
        Commands::Footprint { key, product } => {
            let key = api_key(&store, key)?;
            let client = Client::from_env()?;
            let token = client.token(&key)?;
            let workspace = client.workspace_id(&token)?;
            let geometry =
                client.product_geometry(&token, &workspace, oneatlas::parse_product_id(&product))?;
            println!("{}", serde_json::to_string_pretty(&geometry)?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let logs_dir = cli
        .logs_dir
        .clone()
        .or_else(|| dirs::data_local_dir().map(|d| d.join("oneatlas").join("logs")))
        .unwrap_or_else(|| PathBuf::from("logs"));

    let session = match logging::init(&logs_dir) {
        Ok(session) => Some(session),
        Err(e) => {
            eprintln!("Warning: session log disabled: {}", e);
            None
        }
    };

    let code = match entrypoint(cli) {
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
        Ok(()) => ExitCode::SUCCESS,
    };
    drop(session);
    code
}
