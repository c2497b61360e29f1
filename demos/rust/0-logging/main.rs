use anyhow::Result;
use clap::Parser;
use postcms::PostCms;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(
    version,
    about = "Configure tracing before calling into the PostCMS SDK."
)]
struct Cli {
    /// Tenant id, served from <tenant>.postcms.x-static.io
    tenant: String,
    /// Public bucket to list
    bucket: String,
    /// Maximum tracing verbosity to enable: error|warn|info|debug|trace
    #[arg(long, default_value_t = LevelFilter::INFO, value_parser = clap::value_parser!(LevelFilter))]
    level: LevelFilter,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        tenant,
        bucket,
        level,
    } = Cli::parse();
    init_tracing(level);
    info!(%level, "Tracing initialized");

    let cms = PostCms::new(&tenant)?;
    info!(base_url = %cms.api().base_url(), "Client ready");

    // Reading a public bucket needs no session.
    let posts = cms.bucket(&bucket).get_posts(None, None).await?;
    info!(count = posts.len(), %bucket, "Listed posts");
    for post in &posts {
        debug!(id = %post.id, alias = %post.alias, "Post");
    }

    Ok(())
}

fn init_tracing(level: LevelFilter) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .init();
}
