//! Canned command responses for the simulated runtime.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

const LS_LA: &str = "total 8
drwxr-xr-x 2 user user 4096 Jan 1 12:00 .
drwxr-xr-x 3 user user 4096 Jan 1 12:00 ..
-rw-r--r-- 1 user user   42 Jan 1 12:00 agent_output.txt";

/// Exact-match command table plus the two dynamic commands `date` and `echo`.
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: BTreeMap<String, String>,
}

impl CommandTable {
    /// The built-in table: `ls -la` and `pwd`.
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert("ls -la".to_string(), LS_LA.to_string());
        entries.insert("pwd".to_string(), "/tmp".to_string());
        Self { entries }
    }

    /// Add or replace an exact-match entry.
    pub fn insert(&mut self, command: impl Into<String>, output: impl Into<String>) {
        self.entries.insert(command.into(), output.into());
    }

    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (command, output) in entries {
            self.insert(command, output);
        }
    }

    /// Answer `command`. Table entries win over the dynamic commands, and
    /// anything unknown "succeeds" with a generic message.
    pub fn respond(&self, command: &str, now: DateTime<Utc>) -> String {
        if let Some(output) = self.entries.get(command) {
            return output.clone();
        }
        if command == "date" {
            return now.format("%Y-%m-%d %H:%M:%S").to_string();
        }
        if let Some(rest) = command.strip_prefix("echo ") {
            return unquote(rest.trim()).to_string();
        }
        format!("Command '{command}' executed successfully")
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn unquote(s: &str) -> &str {
    for quote in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}
