//! `wayfinder chat` — a small interactive REPL against a running gateway.

use std::sync::Arc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use wf_domain::config::Config;

pub async fn chat(config: Arc<Config>, url: Option<String>, user: String) -> anyhow::Result<()> {
    let base_url = url.unwrap_or_else(|| {
        format!("http://{}:{}", config.server.host, config.server.port)
    });
    let token = std::env::var(&config.server.api_token_env).ok();

    let client = reqwest::Client::new();
    let mut rl = DefaultEditor::new()?;

    println!("Connected to {base_url} as '{user}'. Type a message, or /quit to exit.");

    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let line = line.trim().to_owned();
                if line.is_empty() {
                    continue;
                }
                if line == "/quit" || line == "/exit" {
                    break;
                }
                let _ = rl.add_history_entry(&line);

                let mut req = client
                    .post(format!("{base_url}/v1/chat"))
                    .header("X-User-Id", &user)
                    .json(&serde_json::json!({ "userInput": line }));
                if let Some(ref token) = token {
                    req = req.header("Authorization", format!("Bearer {token}"));
                }

                match req.send().await {
                    Ok(resp) => {
                        let status = resp.status();
                        match resp.json::<serde_json::Value>().await {
                            Ok(body) => {
                                let message = body
                                    .get("message")
                                    .and_then(|m| m.as_str())
                                    .unwrap_or("(no message)");
                                if status.is_success() {
                                    println!("assistant> {message}");
                                } else {
                                    println!("error ({status})> {message}");
                                }
                            }
                            Err(e) => println!("error> unreadable response: {e}"),
                        }
                    }
                    Err(e) => println!("error> request failed: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("bye");
    Ok(())
}
