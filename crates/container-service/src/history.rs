//! Container history log

use logistics_common::ledger::{get_json, history_key, put_json};
use logistics_common::{ContainerHistory, Ledger, Result};
use std::str::FromStr;
use tracing::debug;

/// How much of the log an update keeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryRetention {
    /// Prepend to the stored log
    #[default]
    Cumulative,
    /// Replace the log with the latest update only
    LatestOnly,
}

impl FromStr for HistoryRetention {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cumulative" => Ok(HistoryRetention::Cumulative),
            "latest_only" | "latest-only" => Ok(HistoryRetention::LatestOnly),
            other => anyhow::bail!(
                "Unknown history retention: {} (expected cumulative or latest_only)",
                other
            ),
        }
    }
}

/// Start the log of a freshly created container
pub async fn start(ledger: &dyn Ledger, container_no: &str, entry: String) -> Result<()> {
    put_json(ledger, &history_key(container_no), &ContainerHistory::with_entry(entry)).await
}

/// Prepend `entry`, returning the resulting log length
pub async fn append(
    ledger: &dyn Ledger,
    container_no: &str,
    entry: String,
    retention: HistoryRetention,
) -> Result<usize> {
    let key = history_key(container_no);

    let mut history: ContainerHistory = match retention {
        HistoryRetention::Cumulative => get_json(ledger, &key).await?.unwrap_or_default(),
        HistoryRetention::LatestOnly => ContainerHistory::default(),
    };
    history.prepend(entry);

    put_json(ledger, &key, &history).await?;
    debug!("History of {} now holds {} entries", container_no, history.len());

    Ok(history.len())
}

/// Read the log of `container_no`, if any
pub async fn read(ledger: &dyn Ledger, container_no: &str) -> Result<Option<ContainerHistory>> {
    get_json(ledger, &history_key(container_no)).await
}
