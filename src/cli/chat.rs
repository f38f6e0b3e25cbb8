use std::time::Duration;

use anyhow::{Result, anyhow};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::ai::ConversationTurn;
use crate::api::public::ErrorResponse;
use crate::api::public::chat::{ChatRequest, ChatResponse};
use crate::api::public::health::HealthResponse;

const HELP: &str = "Commands: /today, /tomorrow, /clear, /quit. Anything else is sent to the assistant.";

/// What a line typed at the prompt should do
#[derive(Debug, PartialEq)]
enum Input {
    Empty,
    Quit,
    Clear,
    Help,
    Message(String),
}

impl From<&str> for Input {
    fn from(line: &str) -> Self {
        let line = line.trim();
        match line {
            "" => Input::Empty,
            "/quit" | "/exit" => Input::Quit,
            "/clear" => Input::Clear,
            "/help" => Input::Help,
            "/today" => Input::Message(String::from("Check availability for today")),
            "/tomorrow" => Input::Message(String::from("Check availability for tomorrow")),
            other => Input::Message(other.to_string()),
        }
    }
}

/// HTTP client for the booking server that keeps the conversation
/// history locally and sends it along with every message.
pub struct ChatClient {
    backend_url: String,
    client: reqwest::Client,
    history: Vec<ConversationTurn>,
}

impl ChatClient {
    pub fn new(backend_url: &str) -> Self {
        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self
            .client
            .get(format!("{}/api/health", self.backend_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|_| self.unreachable())?;
        if !resp.status().is_success() {
            return Err(anyhow!("Server health check returned {}", resp.status()));
        }
        Ok(resp.json().await?)
    }

    /// Send a message and return the assistant's reply. Blank input
    /// returns `None` without contacting the server. History is only
    /// updated when the server answers successfully.
    pub async fn send(&mut self, message: &str) -> Result<Option<String>> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(None);
        }

        let payload = ChatRequest {
            message: message.to_string(),
            history: self.history.clone(),
        };
        let resp = self
            .client
            .post(format!("{}/api/chat", self.backend_url))
            .json(&payload)
            .send()
            .await
            .map_err(|_| self.unreachable())?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<ErrorResponse>()
                .await
                .map(|e| e.message)
                .unwrap_or_default();
            let msg = match status.as_u16() {
                400 => format!("The assistant couldn't use that request. {}", detail),
                503 => format!(
                    "The assistant is temporarily unavailable, please try again in a moment. {}",
                    detail
                ),
                _ => format!("Something went wrong on the server. {}", detail),
            };
            return Err(anyhow!(msg.trim_end().to_string()));
        }

        let ChatResponse { reply } = resp.json().await?;
        self.history.push(ConversationTurn::user(message));
        self.history.push(ConversationTurn::assistant(&reply));
        Ok(Some(reply))
    }

    fn unreachable(&self) -> anyhow::Error {
        anyhow!(
            "Could not reach the booking server at {}. Is `booker serve` running?",
            self.backend_url
        )
    }
}

pub async fn run(backend_url: &str) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut client = ChatClient::new(backend_url);

    match client.health().await {
        Ok(health) => println!("Connected to {} ({})", backend_url, health.status),
        Err(e) => println!("Warning: {}", e),
    }
    println!("{}", HELP);

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match Input::from(line.as_str()) {
                    Input::Empty => continue,
                    Input::Quit => break,
                    Input::Help => println!("{}", HELP),
                    Input::Clear => {
                        client.clear();
                        println!("Chat cleared.");
                    }
                    Input::Message(msg) => match client.send(&msg).await {
                        Ok(Some(reply)) => println!("{}", reply),
                        Ok(None) => {}
                        Err(e) => println!("Error: {}", e),
                    },
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
