//! Sources of user input for the `AwaitingUserInput` phase.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};

use crate::error::Result;

/// Yields the next user message, or `None` once input is exhausted.
#[async_trait]
pub trait InputSource: Send + Sync {
    async fn next_line(&self) -> Result<Option<String>>;
}

/// Reads lines from standard input, printing an optional prompt first.
pub struct StdinInput {
    prompt: Option<String>,
    reader: tokio::sync::Mutex<BufReader<Stdin>>,
}

impl StdinInput {
    pub fn new() -> Self {
        Self {
            prompt: None,
            reader: tokio::sync::Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InputSource for StdinInput {
    async fn next_line(&self) -> Result<Option<String>> {
        if let Some(prompt) = &self.prompt {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(prompt.as_bytes()).await?;
            stdout.flush().await?;
        }
        let mut line = String::new();
        let read = self.reader.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Fixed list of lines, handed out in order.
#[derive(Debug, Default)]
pub struct QueuedInput {
    lines: Mutex<VecDeque<String>>,
}

impl QueuedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: Mutex::new(lines.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl InputSource for QueuedInput {
    async fn next_line(&self) -> Result<Option<String>> {
        let mut lines = self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(lines.pop_front())
    }
}
