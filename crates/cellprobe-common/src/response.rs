//! Command response records.
//!
//! The transport layer (serial handler + AT executor) produces one
//! [`CommandResponse`] per command it runs. A full inspection collects them in
//! a [`ResponseTable`] keyed by the literal command string, which is the only
//! input the extraction pipeline reads.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ── Status ──────────────────────────────────────────────────────────

/// Outcome of a single command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Final result code was `OK`.
    Success,
    /// `ERROR`, `+CME ERROR` or `+CMS ERROR`.
    Error,
    /// No final result code before the deadline.
    Timeout,
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Success => write!(f, "success"),
            ResponseStatus::Error => write!(f, "error"),
            ResponseStatus::Timeout => write!(f, "timeout"),
        }
    }
}

impl std::str::FromStr for ResponseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ResponseStatus::Success),
            "error" => Ok(ResponseStatus::Error),
            "timeout" => Ok(ResponseStatus::Timeout),
            other => Err(format!("unknown response status: {other}")),
        }
    }
}

// ── Command Response ────────────────────────────────────────────────

/// One command/response exchange as reported by the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Command string as sent, e.g. `AT+CGMI`. May be omitted inside a
    /// [`ResponseTable`] document, where the key supplies it.
    #[serde(default)]
    pub command: String,
    /// Response lines in arrival order.
    #[serde(default)]
    pub lines: Vec<String>,
    pub status: ResponseStatus,
    /// Time from send to final result code.
    #[serde(rename = "elapsed_s", with = "duration_secs", default)]
    pub elapsed: Duration,
    /// Code from `+CME ERROR: <n>` / `+CMS ERROR: <n>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
}

impl CommandResponse {
    /// A successful exchange with the given response lines.
    pub fn success<I, S>(command: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            lines: lines.into_iter().map(Into::into).collect(),
            status: ResponseStatus::Success,
            elapsed: Duration::ZERO,
            error_code: None,
            error_message: None,
            retry_count: 0,
        }
    }

    /// A failed exchange (error or timeout) with no payload.
    pub fn failure(command: impl Into<String>, status: ResponseStatus) -> Self {
        Self {
            command: command.into(),
            lines: Vec::new(),
            status,
            elapsed: Duration::ZERO,
            error_code: None,
            error_message: None,
            retry_count: 0,
        }
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn is_successful(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// All response lines joined with `\n`.
    pub fn response_text(&self) -> String {
        self.lines.join("\n")
    }

    /// Response lines without the command echo, the final `OK` and blank lines.
    pub fn payload_lines(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .map(|l| l.trim())
            .filter(move |l| !l.is_empty() && *l != "OK" && !l.eq_ignore_ascii_case(&self.command))
    }

    /// [`payload_lines`](Self::payload_lines) joined with `\n`.
    pub fn payload_text(&self) -> String {
        self.payload_lines().collect::<Vec<_>>().join("\n")
    }
}

impl fmt::Display for CommandResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs_f64();
        match self.status {
            ResponseStatus::Success => write!(
                f,
                "[{}] {} -> {} lines ({secs:.3}s)",
                self.status,
                self.command,
                self.lines.len()
            ),
            ResponseStatus::Error => match (&self.error_code, &self.error_message) {
                (Some(code), Some(msg)) => {
                    write!(f, "[{}] {} ({code}: {msg}) ({secs:.3}s)", self.status, self.command)
                }
                (Some(code), None) => {
                    write!(f, "[{}] {} ({code}) ({secs:.3}s)", self.status, self.command)
                }
                _ => write!(f, "[{}] {} ({secs:.3}s)", self.status, self.command),
            },
            ResponseStatus::Timeout => write!(
                f,
                "[{}] {} (after {} retries, {secs:.3}s)",
                self.status, self.command, self.retry_count
            ),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| serde::de::Error::custom(format!("invalid elapsed time {secs}: {e}")))
    }
}

// ── Response Table ──────────────────────────────────────────────────

/// Every response collected during one inspection, keyed by command string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, CommandResponse>",
    into = "BTreeMap<String, CommandResponse>"
)]
pub struct ResponseTable {
    entries: BTreeMap<String, CommandResponse>,
}

impl ResponseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a response under its own command string, replacing any earlier one.
    pub fn insert(&mut self, response: CommandResponse) {
        self.entries.insert(response.command.clone(), response);
    }

    pub fn with(mut self, response: CommandResponse) -> Self {
        self.insert(response);
        self
    }

    pub fn get(&self, command: &str) -> Option<&CommandResponse> {
        self.entries.get(command)
    }

    /// The response for `command`, only if it completed successfully.
    pub fn successful(&self, command: &str) -> Option<&CommandResponse> {
        self.entries.get(command).filter(|r| r.is_successful())
    }

    /// Payload text of the first successful command among `commands`.
    pub fn first_payload(&self, commands: &[&str]) -> Option<(&str, String)> {
        commands.iter().find_map(|cmd| {
            self.successful(cmd)
                .map(|r| (r.command.as_str(), r.payload_text()))
        })
    }

    pub fn contains(&self, command: &str) -> bool {
        self.entries.contains_key(command)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandResponse)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<BTreeMap<String, CommandResponse>> for ResponseTable {
    fn from(mut entries: BTreeMap<String, CommandResponse>) -> Self {
        for (command, response) in entries.iter_mut() {
            if response.command.is_empty() {
                response.command = command.clone();
            }
        }
        Self { entries }
    }
}

impl From<ResponseTable> for BTreeMap<String, CommandResponse> {
    fn from(table: ResponseTable) -> Self {
        table.entries
    }
}

impl FromIterator<CommandResponse> for ResponseTable {
    fn from_iter<I: IntoIterator<Item = CommandResponse>>(iter: I) -> Self {
        let mut table = ResponseTable::new();
        for response in iter {
            table.insert(response);
        }
        table
    }
}
