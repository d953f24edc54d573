use anyhow::{Result, anyhow};
use reqwest::Url;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::dto::ErrorDto;

/// `<server_url>/transcript/<video_id>?order=<order>`, with the id and order
/// percent-encoded.
pub fn transcript_url(config: &ClientConfig) -> Result<Url> {
    let mut url = Url::parse(&config.server_url)
        .map_err(|e| anyhow!("Invalid server URL {}: {}", config.server_url, e))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Server URL cannot be a base: {}", config.server_url))?
        .pop_if_empty()
        .push("transcript")
        .push(&config.video_id);
    if let Some(order) = &config.order {
        url.query_pairs_mut().append_pair("order", order);
    }
    Ok(url)
}

pub async fn request_transcript(client: &reqwest::Client, config: &ClientConfig) -> Result<Value> {
    let url = transcript_url(config)?;
    println!("🚀 Requesting transcript from: {url}");

    let request = client.get(url);

    let response = request
        .send()
        .await
        .map_err(|e| anyhow!("Failed to send request: {}", e))?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .map_err(|e| anyhow!("Failed to read response: {}", e))?;

    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorDto>(&response_text)
            .map(|body| body.error)
            .unwrap_or(response_text);
        return Err(anyhow!("Server returned error {}: {}", status, detail));
    }

    let json: Value = serde_json::from_str(&response_text)
        .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;

    Ok(json)
}

pub async fn check_server_health(client: &reqwest::Client, server_url: &str) -> Result<()> {
    println!("🔍 Checking server health at: {server_url}/health");

    let response = client
        .get(format!("{server_url}/health"))
        .send()
        .await
        .map_err(|e| anyhow!("Failed to connect to server: {}", e))?;

    if response.status().is_success() {
        println!("✅ Server is healthy");
        Ok(())
    } else {
        Err(anyhow!("Server health check failed: {}", response.status()))
    }
}

pub async fn run_client(config: ClientConfig) -> Result<()> {
    println!("📜 YouTube Transcript Client");
    println!("===========================");
    println!(
        "🎬 Video: {} (order: {})",
        config.video_id,
        config.order.as_deref().unwrap_or("unknown")
    );
    println!();

    let client = reqwest::Client::new();

    if let Err(e) = check_server_health(&client, &config.server_url).await {
        eprintln!("❌ {e}");
        eprintln!("💡 Make sure the server is running: youtube-transcript-api serve");
        return Err(e);
    }

    match request_transcript(&client, &config).await {
        Ok(result) => {
            println!("\n✅ Transcript retrieved!");
            println!("📝 Result:");
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Err(e) => {
            eprintln!("❌ Transcript request failed: {e}");
            return Err(e);
        }
    }

    Ok(())
}
