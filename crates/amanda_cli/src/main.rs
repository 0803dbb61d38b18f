//! Operator entry point for the Amanda blog core.
//!
//! # Responsibility
//! - Verify `amanda_core` linkage (`ping`).
//! - Create posts, merge keywords and list posts against a configured database.
//!
//! Configuration comes from `AMANDA_*` environment variables, optionally
//! layered over a JSON file passed with `--config`.

use amanda_core::db::open_db_with_config;
use amanda_core::{
    init_logging_from_config, search_posts_or_empty, CoreConfig, NewPost, Post, PostSearchQuery,
    PostService, SearchService,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "amanda", version, about = "Keyword merge and post search for the Amanda blog")]
struct Cli {
    /// Optional JSON config file; environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print core linkage and version.
    Ping,
    /// Create a post, merging its comma-separated keywords.
    Post {
        author: String,
        title: String,
        content: String,
        #[arg(long)]
        keywords: Option<String>,
    },
    /// Merge a comma-separated keyword string into an existing post.
    Merge { post_id: i64, keywords: String },
    /// List posts matching optional keyword and author filters.
    Search {
        #[arg(long)]
        keywords: Option<String>,
        #[arg(long)]
        author: Option<String>,
    },
    /// List posts whose title or keywords contain the text.
    Find { text: String },
    /// List the newest posts.
    Recent,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Ping = cli.command {
        println!("amanda_core ping={}", amanda_core::ping());
        println!("amanda_core version={}", amanda_core::core_version());
        return Ok(());
    }

    let config = load_config(cli.config.as_ref())?;
    init_logging_from_config(&config).context("failed to initialize logging")?;
    if config.db_path.is_none() {
        bail!("no database configured; set AMANDA_DB_PATH or db_path in --config");
    }
    let mut conn = open_db_with_config(&config).context("failed to open database")?;

    match cli.command {
        Commands::Ping => {}
        Commands::Post {
            author,
            title,
            content,
            keywords,
        } => {
            let mut request = NewPost::new(author, title, content);
            request.keywords = keywords;
            let created = PostService::new(&mut conn).create_post(&request, None)?;
            println!("created post {}", created.detail.post.id);
            for keyword in &created.detail.keywords {
                println!("  keyword {} {}", keyword.id, keyword.text);
            }
            for err in &created.follow_up_errors {
                eprintln!("warning: {err}");
            }
        }
        Commands::Merge { post_id, keywords } => {
            let report = PostService::new(&mut conn).merge_keywords(post_id, &keywords)?;
            info!(
                "event=cli_merge module=cli status=ok post_id={post_id} keywords={}",
                report.keywords.len()
            );
            for keyword in &report.keywords {
                println!("{} {}", keyword.id, keyword.text);
            }
        }
        Commands::Search { keywords, author } => {
            let response = search_posts_or_empty(
                &conn,
                &PostSearchQuery {
                    keyword_string: keywords,
                    author_name: author,
                },
            );
            print_posts(&response.items);
            if !response.ok {
                bail!(response.message);
            }
            eprintln!("{}", response.message);
        }
        Commands::Find { text } => print_posts(&SearchService::new(&conn).find(&text)?),
        Commands::Recent => print_posts(&SearchService::new(&conn).recent_posts()?),
    }

    Ok(())
}

fn print_posts(posts: &[Post]) {
    for post in posts {
        println!("{}\t{}\t{}", post.id, post.author.name, post.title);
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<CoreConfig> {
    let Some(path) = path else {
        return Ok(CoreConfig::from_env()?);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config `{}`", path.display()))?;
    let mut config = CoreConfig::from_json_str(&text)?;
    config.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}
