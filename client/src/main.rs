use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use roomforge_client::api::ApiClient;
use roomforge_client::config::{ClientConfig, DEFAULT_HANDOFF_PORT};
use roomforge_client::controller::SessionController;
use roomforge_client::handoff::{publish, resolve_public_host};
use roomforge_client::poll::UploadOutcome;
use roomforge_client::remote::RemoteSubmitter;

use roomforge::api::v1::project::{room_model_url, ProjectId};

/// Turn room photos into a furnishable 3D model.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Base URL of the backend API.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8000")]
    endpoint: Url,

    /// Host other devices can reach this machine at, for phone handoffs.
    #[arg(long, global = true)]
    public_host: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a design session: upload photos and wait for the room model.
    Design {
        /// Photos of the room (2 to 4).
        #[arg(conflicts_with = "phone")]
        photos: Vec<PathBuf>,

        /// Hand the upload off to a phone via a QR code.
        #[arg(long)]
        phone: bool,

        /// Port the handoff link points at.
        #[arg(long, default_value_t = DEFAULT_HANDOFF_PORT)]
        handoff_port: u16,
    },

    /// Submit photos against a scanned handoff link (phone side).
    PhoneUpload {
        /// The handoff URL from the QR code.
        link: String,

        /// Photos to submit (2 to 4).
        #[arg(required = true)]
        photos: Vec<PathBuf>,
    },

    /// Show the processing status of a project.
    Status {
        project_id: String,
    },

    /// Browse the furniture catalog.
    Furniture {
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        style: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::new(cli.endpoint.clone());
    config.public_host = cli.public_host.clone();

    match cli.command {
        Command::Design {
            photos,
            phone,
            handoff_port,
        } => {
            config.handoff_port = handoff_port;
            run_design(config, photos, phone).await
        }
        Command::PhoneUpload { link, photos } => run_phone_upload(config, &link, photos).await,
        Command::Status { project_id } => run_status(config, project_id).await,
        Command::Furniture { category, style } => {
            run_furniture(config, category.as_deref(), style.as_deref()).await
        }
    }
}

async fn run_design(config: ClientConfig, photos: Vec<PathBuf>, phone: bool) -> Result<()> {
    let backend = ApiClient::new(&config)?;
    let mut controller = SessionController::new(backend, config.clone());
    controller.start_design();

    if phone {
        let host = resolve_public_host(&config)?;
        let link = controller.start_phone_handoff(config.endpoint.scheme(), &host)?;
        publish(&link)?;

        let bar = spinner("Waiting for the phone upload...");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    bar.finish_and_clear();
                    eprintln!("Cancelled.");
                    return Ok(());
                }
                _ = time::sleep(Duration::from_millis(250)) => {}
            }
            match controller.handoff_outcome().await {
                Some(UploadOutcome::Completed(_)) => break,
                Some(UploadOutcome::Failed) => {
                    bar.finish_and_clear();
                    return Err(anyhow!("the phone upload failed; start a new session"));
                }
                Some(UploadOutcome::GaveUp) => {
                    bar.finish_and_clear();
                    return Err(anyhow!("lost contact with the backend while waiting"));
                }
                Some(UploadOutcome::Cancelled) | None => {}
            }
        }
        bar.finish_and_clear();
        eprintln!("✅ Photos received from the phone");
    } else {
        if photos.is_empty() {
            return Err(anyhow!(
                "pass 2 to 4 photos, or --phone to upload from a phone"
            ));
        }
        controller.select_local_files(photos)?;
    }

    let id = controller.submit().await?;
    eprintln!("✅ Project created: {id}");

    let bar = spinner("Generating the room model...");
    let cancel = CancellationToken::new();
    let url = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            bar.finish_and_clear();
            eprintln!("Cancelled. Check back later with: roomforge status {id}");
            return Ok(());
        }
        url = controller.wait_for_model(cancel.clone()) => url?,
    };
    bar.finish_and_clear();

    eprintln!("✅ Room model ready");
    println!("{url}");
    Ok(())
}

async fn run_phone_upload(config: ClientConfig, link: &str, photos: Vec<PathBuf>) -> Result<()> {
    let backend = ApiClient::new(&config)?;
    let mut submitter = RemoteSubmitter::from_link(link)?;
    submitter.select_files(photos)?;
    submitter.submit(&backend).await?;
    eprintln!("✅ Photos submitted; return to the other device");
    Ok(())
}

async fn run_status(config: ClientConfig, project_id: String) -> Result<()> {
    let backend = ApiClient::new(&config)?;
    let id = ProjectId::from(project_id);
    let res = backend.get_project(&id).await?;
    eprintln!("Status: {}", res.status);
    if let Some(url) = room_model_url(&config.endpoint, &res.status, res.room_model_path.as_deref())
    {
        println!("{url}");
    }
    Ok(())
}

async fn run_furniture(
    config: ClientConfig,
    category: Option<&str>,
    style: Option<&str>,
) -> Result<()> {
    let backend = ApiClient::new(&config)?;
    let items = backend.list_furniture(category, style).await?;
    if items.is_empty() {
        eprintln!("No matching furniture.");
        return Ok(());
    }
    for item in items {
        println!(
            "{: <12} {: <24} {: <12} {: <12} {}x{}x{}",
            item.id,
            item.name,
            item.category,
            item.style,
            item.dimensions.width,
            item.dimensions.height,
            item.dimensions.depth,
        );
    }
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let bar = ProgressBar::new_spinner().with_message(message.to_owned());
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
