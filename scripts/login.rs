//! Login Script
//!
//! This script logs in with email and password and prints the session
//! token to export as `TWEETFEED_TOKEN` for the other binaries.

use std::io::{self, Write};

use tweetfeed::{ApiClient, ClientConfig, Redirect, Session};

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    println!("🐦 Tweetfeed Login");
    println!("==================");

    let config = ClientConfig::from_env()?;
    println!("📍 API: {}", config.api_base_url);

    let email = prompt("Email: ")?;
    let password = prompt("Password: ")?;

    let client = ApiClient::new(&config, Session::in_memory(None))?;
    let redirect = match client.login(&email, &password).await {
        Ok(redirect) => redirect,
        Err(e) => {
            eprintln!("❌ Login failed: {}", e.user_message());
            return Err(e.into());
        }
    };

    let token = client
        .session()
        .token()
        .ok_or("login succeeded but no token was stored")?;
    let handle = client
        .session()
        .identity()
        .map(|profile| profile.summary.handle)
        .unwrap_or_default();

    println!("\n✅ Logged in as @{}", handle);
    if redirect == Redirect::Admin {
        println!("🛡️  This account is an administrator");
    }
    println!("\n📝 Add this to your environment variables:");
    println!("export TWEETFEED_TOKEN=\"{}\"", token);

    Ok(())
}
