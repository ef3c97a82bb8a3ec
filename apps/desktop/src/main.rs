use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{ClientEvent, ForumClient};
use shared::domain::{PostId, SubforumId, UserId, Viewer, VoteDirection};
use shared::protocol::{CommentPayload, PostSummary};

mod config;

#[derive(Parser, Debug)]
#[command(about = "Command-line driver for the forum client")]
struct Args {
    /// Overrides the configured server URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Act as this signed-in user (pair with --username). Use `login` to
    /// obtain the values.
    #[arg(long)]
    user_id: Option<i64>,
    #[arg(long)]
    username: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the global front page.
    Feed,
    /// Print one community's feed.
    Community { name: String },
    /// Print a post with its comment thread.
    Post { post_id: i64 },
    /// Cast, switch, or toggle a vote on a post.
    Vote {
        post_id: i64,
        #[arg(value_parser = parse_direction)]
        direction: VoteDirection,
    },
    /// Comment under a post and print the refreshed thread.
    Comment { post_id: i64, body: String },
    /// List communities that accept new posts.
    Communities,
    /// Create a post in a community.
    CreatePost {
        #[arg(long)]
        subforum_id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
    },
    /// Subscribe to a community.
    Subscribe { subforum_id: i64 },
    /// Log in and print the identity to pass back via --user-id/--username.
    Login { username: String, password: String },
    /// Register a new account.
    Register {
        username: String,
        email: String,
        password: String,
    },
}

fn parse_direction(raw: &str) -> Result<VoteDirection, String> {
    match raw.to_ascii_lowercase().as_str() {
        "up" | "+1" => Ok(VoteDirection::Up),
        "down" | "-1" => Ok(VoteDirection::Down),
        other => Err(format!("expected 'up' or 'down', got '{other}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(server_url) = args.server_url.clone() {
        settings.server_url = server_url;
    }

    let http = reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .build()?;
    let client = ForumClient::with_http(http, settings.server_url, settings.unvote_encoding);

    let viewer = match (args.user_id, args.username.clone()) {
        (Some(user_id), Some(username)) => Some(Viewer {
            user_id: UserId(user_id),
            username,
            karma: 0,
        }),
        (None, None) => None,
        _ => return Err(anyhow!("--user-id and --username must be given together")),
    };

    match args.command {
        Command::Feed => {
            for post in client.fetch_front_page(viewer.as_ref()).await? {
                print_post(&post);
            }
        }
        Command::Community { name } => {
            for post in client.fetch_subforum_posts(&name, viewer.as_ref()).await? {
                print_post(&post);
            }
        }
        Command::Post { post_id } => {
            let detail = client
                .fetch_post_detail(PostId(post_id), viewer.as_ref())
                .await?;
            print_post(&detail.post);
            for comment in &detail.comments {
                print_comment(comment);
            }
        }
        Command::Vote { post_id, direction } => {
            vote(&client, PostId(post_id), direction, viewer).await?;
        }
        Command::Comment { post_id, body } => {
            let viewer =
                viewer.ok_or_else(|| anyhow!("commenting requires --user-id and --username"))?;
            client
                .submit_comment(PostId(post_id), &viewer, &body, None)
                .await?;
            // The backend makes no append promise; refetch for the real
            // sequence.
            let detail = client
                .fetch_post_detail(PostId(post_id), Some(&viewer))
                .await?;
            for comment in &detail.comments {
                print_comment(comment);
            }
        }
        Command::Communities => {
            for subforum in client.list_subforums().await? {
                println!(
                    "{}  r/{}  {}",
                    subforum.subforum_id.0,
                    subforum.name,
                    subforum.description.unwrap_or_default()
                );
            }
        }
        Command::CreatePost {
            subforum_id,
            title,
            body,
        } => {
            let viewer =
                viewer.ok_or_else(|| anyhow!("posting requires --user-id and --username"))?;
            client
                .create_post(&viewer, SubforumId(subforum_id), &title, &body)
                .await?;
            println!("post created in subforum {subforum_id}");
        }
        Command::Subscribe { subforum_id } => {
            let viewer =
                viewer.ok_or_else(|| anyhow!("subscribing requires --user-id and --username"))?;
            client.subscribe(&viewer, SubforumId(subforum_id)).await?;
            println!("subscribed to subforum {subforum_id}");
        }
        Command::Login { username, password } => {
            let viewer = client.login(&username, &password).await?;
            println!("{}", serde_json::to_string_pretty(&viewer)?);
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            client.register(&username, &email, &password).await?;
            println!("registered '{username}'");
        }
    }

    Ok(())
}

async fn vote(
    client: &Arc<ForumClient>,
    post_id: PostId,
    direction: VoteDirection,
    viewer: Option<Viewer>,
) -> Result<()> {
    let detail = client.fetch_post_detail(post_id, viewer.as_ref()).await?;
    let mut events = client.subscribe_events();
    let controller = client.vote_controller(&detail.post, viewer);

    println!(
        "before: score={} status={:?}",
        controller.displayed_score().await,
        controller.displayed_status().await
    );

    let outcome = controller.request_vote(direction).await;

    println!(
        "after:  score={} status={:?}",
        controller.displayed_score().await,
        controller.displayed_status().await
    );

    if let Err(err) = outcome {
        while let Ok(event) = events.try_recv() {
            if let ClientEvent::VoteFailed { reason, .. } = event {
                println!("notice: {reason}");
            }
        }
        return Err(err.into());
    }

    println!("vote confirmed");
    Ok(())
}

fn print_post(post: &PostSummary) {
    println!(
        "#{} [{}] {}  r/{} by u/{}  ({})",
        post.post_id.0,
        post.score,
        post.title,
        post.subforum_name,
        post.author_username,
        post.created_at.format("%Y-%m-%d"),
    );
}

fn print_comment(comment: &CommentPayload) {
    println!(
        "  u/{} ({}): {}",
        comment.author_username,
        comment.created_at.format("%Y-%m-%d"),
        comment.body
    );
}
