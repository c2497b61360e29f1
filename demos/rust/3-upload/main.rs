use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use postcms::{FetchController, FileTokenStore, FileUpload, PostCms};

#[derive(Parser, Debug)]
#[command(version, about = "Upload a file with progress; Ctrl-C aborts.", long_about = None)]
struct Cli {
    /// Tenant id
    tenant: String,
    /// File to upload
    file: PathBuf,
    /// Storage path the file is filed under
    #[arg(long)]
    path: Option<String>,
    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Directory holding the session token written by the `login` demo
    #[arg(long, default_value = ".postcms")]
    state_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env::var("TRACING").unwrap_or("info".to_string()))
        .init();

    let cms = PostCms::builder(&cli.tenant)
        .token_store(FileTokenStore::in_dir(&cli.state_dir))
        .build()?;
    cms.verify_session()
        .await?
        .context("not signed in, run the `login` demo first")?;

    let file = FileUpload::from_path(&cli.file).await?;
    let fc = FetchController::new().on_progress(|loaded, total| {
        let pct = if total == 0 { 100 } else { loaded * 100 / total };
        eprint!("\r{loaded}/{total} bytes ({pct}%)");
    });

    let cancel = fc.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.abort();
        }
    });
    if let Some(secs) = cli.timeout {
        let cancel = fc.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            cancel.abort();
        });
    }

    match cms.upload_file(file, cli.path.as_deref(), Some(&fc)).await {
        Ok(object) => {
            eprintln!();
            println!("Uploaded {} as {}", object.id, object.hashname);
        }
        Err(e) if e.is_aborted() => {
            eprintln!();
            println!("Upload aborted");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
