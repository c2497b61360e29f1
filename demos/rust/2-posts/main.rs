use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

use postcms::{
    BucketAcl, FileTokenStore, PostCms, PostDraft, PostOrder, QueryPostsFilter,
};

#[derive(Parser, Debug)]
#[command(version, about = "Manage buckets and posts with a stored session.", long_about = None)]
struct Cli {
    /// Tenant id
    tenant: String,
    /// Directory holding the session token written by the `login` demo
    #[arg(long, default_value = ".postcms")]
    state_dir: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a publicly readable bucket
    CreateBucket { name: String },
    /// Delete a bucket
    DeleteBucket { name: String },
    /// List the newest posts of a bucket
    List {
        bucket: String,
        /// Only posts with these tags (comma separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Create a post with a title
    Create {
        bucket: String,
        alias: String,
        title: String,
    },
    /// Delete a post
    Delete { bucket: String, id: String },
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

    match cli.command {
        Command::CreateBucket { name } => {
            let bucket = cms.create_bucket(&name, BucketAcl::PUBLIC_READ).await?;
            println!("Created bucket {}", bucket.name());
        }
        Command::DeleteBucket { name } => {
            cms.delete_bucket(&name).await?;
            println!("Deleted bucket {name}");
        }
        Command::List {
            bucket,
            tags,
            limit,
        } => {
            let filter = QueryPostsFilter {
                tags: (!tags.is_empty()).then_some(tags),
                kv: Some(vec!["title".into()]),
                limit: Some(limit),
                order: Some(PostOrder::Desc),
                ..Default::default()
            };
            for post in cms.bucket(&bucket).get_posts(Some(&filter), None).await? {
                let title = post.kv.get("title").and_then(|t| t.as_str()).unwrap_or("");
                println!("{}\t{}\t{title}", post.id, post.alias);
            }
        }
        Command::Create {
            bucket,
            alias,
            title,
        } => {
            let draft = PostDraft::new()
                .alias(alias)
                .kv("title", title);
            let post = cms.bucket(&bucket).create_post(Some(&draft)).await?;
            println!("Created post {}", post.id);
        }
        Command::Delete { bucket, id } => {
            cms.bucket(&bucket).delete_post(&id).await?;
            println!("Deleted post {id}");
        }
    }

    Ok(())
}
