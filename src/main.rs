//! # Tweetfeed
//!
//! Terminal front-end for the tweetfeed client: mounts one view and prints
//! it as plain-text cards.
//!
//! ## Usage
//!
//! ```bash
//! # Home feed
//! TWEETFEED_TOKEN=... cargo run
//!
//! # Hashtag, profile, search and trends views
//! cargo run -- hashtag rust
//! cargo run -- user alice
//! cargo run -- search "hello world"
//! cargo run -- users alice
//! cargo run -- trends
//!
//! # With debug logging
//! RUST_LOG=debug cargo run
//! ```
//!
//! Obtain a token with the `login` binary.

use chrono::Utc;
use log::{error, info};
use std::process::ExitCode;

use tweetfeed::render::render_feed;
use tweetfeed::views::{mount_feed, Mount, ProfileView, SearchView, SidePanel};
use tweetfeed::{
    ApiClient, ClientConfig, FeedError, FeedFilter, Post, Redirect, SearchKind, SearchResults,
    Session, UserProfile,
};

fn print_posts(posts: &[Post], viewer: Option<&UserProfile>, base_url: &str) {
    if posts.is_empty() {
        println!("No posts yet.");
        return;
    }
    for card in render_feed(posts, viewer, base_url, Utc::now()) {
        println!("{}", card.to_text());
    }
}

fn print_redirect(redirect: Redirect) {
    match redirect {
        Redirect::Login => println!("Not logged in. Run the `login` binary and set TWEETFEED_TOKEN."),
        Redirect::Home => println!("This view is not available to you."),
        Redirect::Admin => println!("Logged in as an administrator."),
    }
}

async fn run(args: &[String]) -> Result<(), FeedError> {
    let config = ClientConfig::from_env()?;
    let session = Session::in_memory(config.token.clone());
    let client = ApiClient::new(&config, session)?;
    let base_url = client.base_url().to_string();

    let command = args.first().map(String::as_str).unwrap_or("home");
    let argument = args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
    info!("Running '{}' view", command);

    match command {
        "home" | "hashtag" => {
            let filter = if command == "home" {
                FeedFilter::Home
            } else {
                FeedFilter::Hashtag(argument.clone())
            };
            match mount_feed(&client, filter, config.engagement_strategy).await? {
                Mount::Ready(feed) => {
                    if command == "hashtag" {
                        println!("#{}\n", argument.trim_start_matches('#'));
                    }
                    let posts = feed.posts().await;
                    print_posts(&posts, feed.viewer(), &base_url);
                }
                Mount::Redirect(redirect) => print_redirect(redirect),
            }
        }
        "user" => match ProfileView::mount(&client, &argument, config.engagement_strategy).await? {
            Mount::Ready(view) => {
                let profile = view.profile();
                println!(
                    "@{} · {} followers · {} following{}",
                    profile.handle(),
                    view.follower_count(),
                    view.following_count(),
                    if view.is_following() {
                        " · you follow"
                    } else {
                        ""
                    }
                );
                if let Some(bio) = &profile.summary.bio {
                    println!("{}", bio);
                }
                println!();
                let posts = view.posts().posts().await;
                print_posts(&posts, Some(view.viewer()), &base_url);
            }
            Mount::Redirect(redirect) => print_redirect(redirect),
        },
        "search" | "users" => {
            let kind = if command == "users" {
                SearchKind::Users
            } else {
                SearchKind::Posts
            };
            let mut view = SearchView::new(&client);
            match view.search(&argument, kind).await? {
                SearchResults::Posts(posts) => {
                    print_posts(posts, client.session().identity().as_ref(), &base_url)
                }
                SearchResults::Users(users) => {
                    if users.is_empty() {
                        println!("No users found");
                    }
                    for user in users {
                        println!("@{} {}", user.handle, user.bio.as_deref().unwrap_or(""));
                    }
                }
            }
        }
        "trends" => {
            let panel = SidePanel::load(&client).await?;
            if panel.trends.is_empty() {
                println!("No trends yet");
            }
            for trend in &panel.trends {
                println!("#{} · {}", trend.tag, trend.count);
            }
            if !panel.suggested_users.is_empty() {
                println!("\nWho to follow:");
                for user in &panel.suggested_users {
                    println!("  @{}", user.handle);
                }
            }
        }
        other => {
            return Err(FeedError::InvalidInput(format!(
                "unknown command '{}' (expected home, hashtag, user, search, users or trends)",
                other
            )))
        }
    }

    Ok(())
}

/// Main entry point for the tweetfeed terminal client.
///
/// Logging is initialised with `env_logger`; set `RUST_LOG` to control it.
#[tokio::main]
async fn main() -> ExitCode {
    // Initialize the logging system
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
