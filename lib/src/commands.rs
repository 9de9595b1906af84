//! Convenience wrappers for common CLI commands.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Connection, Error, json::parse_json_response};

/// A backend as reported by `backend.list -j -p`.
#[derive(Debug, Clone, PartialEq)]
pub struct Backend {
    pub name: String,
    pub kind: String,
    /// `probe`, `healthy`, `sick` or `auto`.
    pub admin_health: String,
    pub healthy: bool,
    pub last_change: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct BackendEntry {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    admin_health: String,
    #[serde(default)]
    probe_message: Value,
    #[serde(default)]
    last_change: Option<f64>,
}

impl Backend {
    fn from_entry(name: String, entry: BackendEntry) -> Self {
        let healthy = match entry.admin_health.as_str() {
            "healthy" => true,
            "sick" => false,
            _ => probe_says_healthy(&entry.probe_message),
        };
        let last_change = entry
            .last_change
            .filter(|stamp| stamp.is_finite() && *stamp >= 0.0)
            .and_then(|stamp| {
                let secs = stamp.trunc();
                let nanos = (((stamp - secs) * 1e9) as u32).min(999_999_999);
                DateTime::from_timestamp(secs as i64, nanos)
            });

        Self {
            name,
            kind: entry.kind,
            admin_health: entry.admin_health,
            healthy,
            last_change,
        }
    }
}

// Probed backends report `[good, window, "healthy"|"sick"]`, others a bare
// string.
fn probe_says_healthy(message: &Value) -> bool {
    let verdict = match message {
        Value::Array(parts) => parts.last(),
        other => Some(other),
    };
    verdict
        .and_then(Value::as_str)
        .is_some_and(|verdict| verdict.eq_ignore_ascii_case("healthy"))
}

/// Process ids as reported by `pid -j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pids {
    pub master: u32,
    /// Absent while the child is stopped.
    #[serde(default)]
    pub worker: Option<u32>,
}

impl Connection {
    /// Returns the welcome banner.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Connection::execute`].
    pub async fn banner(&self) -> Result<String, Error> {
        let body = self.request::<&str>("banner", &[]).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Returns the last panic message, empty when the child has not
    /// panicked.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Connection::execute`] other than
    /// [`Error::Cannot`], or [`Error::InvalidJsonResponse`].
    pub async fn panic_message(&self) -> Result<String, Error> {
        match self.json("panic.show", &["-j"]).await {
            Err(Error::Cannot) => Ok(String::new()),
            other => other,
        }
    }

    /// Clears the last panic, and its varnishstat counters when
    /// `include_counters` is set.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Connection::execute`].
    pub async fn clear_panic(&self, include_counters: bool) -> Result<(), Error> {
        let args: &[&str] = if include_counters { &["-z"] } else { &[] };
        self.request("panic.clear", args).await.map(drop)
    }

    /// Lists the configured backends, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Connection::execute`] or
    /// [`Error::InvalidJsonResponse`].
    pub async fn backend_list(&self) -> Result<Vec<Backend>, Error> {
        let entries: BTreeMap<String, BackendEntry> =
            self.json("backend.list", &["-j", "-p"]).await?;
        Ok(entries
            .into_iter()
            .map(|(name, entry)| Backend::from_entry(name, entry))
            .collect())
    }

    /// Returns the master and worker process ids.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Connection::execute`] or
    /// [`Error::InvalidJsonResponse`].
    pub async fn pid(&self) -> Result<Pids, Error> {
        self.json("pid", &["-j"]).await
    }

    async fn json<T: DeserializeOwned>(&self, command: &str, args: &[&str]) -> Result<T, Error> {
        let body = self.request(command, args).await?;
        parse_json_response(&body)
    }
}
