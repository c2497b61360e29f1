use anyhow::Result;
use clap::Parser;
use std::env;
use std::path::PathBuf;

use postcms::{CmsEvent, EventKind, FileTokenStore, PostCms};

#[derive(Parser, Debug)]
#[command(version, about = "Sign in and keep the session token on disk.", long_about = None)]
struct Cli {
    /// Tenant id
    tenant: String,
    /// Username, email or phone number
    id: String,
    /// Directory the session token is kept in
    #[arg(long, default_value = ".postcms")]
    state_dir: PathBuf,
    /// Forget the stored session instead of signing in
    #[arg(long)]
    logout: bool,
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

    cms.on(EventKind::SessionUpdate, |event| {
        let CmsEvent::SessionUpdate(session) = event;
        match session {
            Some(s) => println!("session: signed in as {}", s.user.id),
            None => println!("session: signed out"),
        }
    });

    if cli.logout {
        cms.logout()?;
        return Ok(());
    }

    // A token left by a previous run may still be valid.
    if let Some(session) = cms.verify_session().await? {
        println!("Resumed session of {}", session.user.id);
        return Ok(());
    }

    let password = rpassword::prompt_password("Password: ")?;
    let session = cms.login(&cli.id, &password).await?;
    println!(
        "Signed in as {} (token stored under {})",
        session.user.id,
        cli.state_dir.display()
    );

    Ok(())
}
