// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Message-source contract plus a JSON-lines adapter for offline history.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use core_types::ChatMessage;
use log::warn;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read message history {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Historical replay capability of the chat collaborator.
pub trait MessageSource {
    /// Messages created strictly after `after`, oldest first.
    fn history(&self, after: DateTime<Utc>) -> Result<Vec<ChatMessage>, SourceError>;
}

impl MessageSource for Vec<ChatMessage> {
    fn history(&self, after: DateTime<Utc>) -> Result<Vec<ChatMessage>, SourceError> {
        let mut messages: Vec<_> = self
            .iter()
            .filter(|msg| msg.created_at > after)
            .cloned()
            .collect();
        messages.sort_by_key(|msg| msg.created_at);
        Ok(messages)
    }
}

/// One JSON-encoded [`ChatMessage`] per line. Blank lines are skipped and
/// undecodable lines are logged and dropped.
pub struct JsonlMessageSource {
    path: PathBuf,
}

impl JsonlMessageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SourceError {
        SourceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl MessageSource for JsonlMessageSource {
    fn history(&self, after: DateTime<Utc>) -> Result<Vec<ChatMessage>, SourceError> {
        let file = File::open(&self.path).map_err(|err| self.io_error(err))?;
        let mut messages = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|err| self.io_error(err))?;
            if line.trim().is_empty() {
                continue;
            }
            match decode_line(&line) {
                Ok(msg) if msg.created_at > after => messages.push(msg),
                Ok(_) => {}
                Err(err) => warn!(
                    "[source] {}:{} skipped undecodable message: {}",
                    self.path.display(),
                    idx + 1,
                    err
                ),
            }
        }
        messages.sort_by_key(|msg| msg.created_at);
        Ok(messages)
    }
}

pub fn decode_line(line: &str) -> Result<ChatMessage, serde_json::Error> {
    serde_json::from_str(line.trim())
}
