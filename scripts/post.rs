//! Post Script
//!
//! This script posts a message from the terminal, optionally attaching an
//! image or video file, and prints the resulting card.

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use tweetfeed::segment::{validate_post_content, MAX_POST_CHARS};
use tweetfeed::{ApiClient, ClientConfig, Media, NewPost, PostCard, Session};

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim_end_matches(['\r', '\n']).to_string())
}

/// Guesses the MIME type of an attachment from its extension.
fn mime_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "mp4" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "mov" => Some("video/quicktime"),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    println!("🐦 Tweetfeed Post");
    println!("=================");

    let mut config = ClientConfig::from_env()?;
    if config.token.is_none() {
        let token = prompt("Enter your session token: ")?;
        config.token = Some(token.trim().to_string());
    }

    let client = ApiClient::new(&config, Session::in_memory(config.token.clone()))?;

    let content = prompt(&format!("What's happening? (max {} chars): ", MAX_POST_CHARS))?;
    let attachment = prompt("Attachment path (leave empty for none): ")?;
    validate_post_content(&content, !attachment.trim().is_empty())?;

    let media = if attachment.trim().is_empty() {
        Media::None
    } else {
        let path = Path::new(attachment.trim());
        let mime = mime_for(path).ok_or("unsupported attachment type")?;
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        println!("📤 Uploading {}...", file_name);
        client.upload_media(&file_name, mime, bytes).await?
    };

    println!("🚀 Posting...");
    let post = client
        .create_post(&NewPost::text(content).with_media(media))
        .await?;

    let viewer = client.me().await.ok();
    let card = PostCard::from_post(&post, viewer.as_ref(), client.base_url(), Utc::now());
    println!("\n✅ Posted:\n{}", card.to_text());

    Ok(())
}
