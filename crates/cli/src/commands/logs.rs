use anyhow::Context;
use clap::Args;
use serde_json::Value;
use spindle_core::{
    types::{Address, BlockRange, Hash32, LogFilter},
    EndpointPool,
};
use tokio_util::sync::CancellationToken;

/// Topic value matching any topic at its position.
const WILDCARD_TOPIC: &str = "*";

#[derive(Args)]
pub struct LogsArgs {
    /// First block (inclusive)
    #[arg(long)]
    from: u64,

    /// Last block (inclusive)
    #[arg(long)]
    to: u64,

    /// Contract address to match (can be specified multiple times)
    #[arg(long)]
    address: Vec<String>,

    /// Topic per position, `*` for any (can be specified multiple times)
    #[arg(long)]
    topic: Vec<String>,

    /// Endpoints that must agree on the result (defaults to the configured value)
    #[arg(long)]
    replicas: Option<usize>,
}

impl LogsArgs {
    fn filter(&self) -> anyhow::Result<LogFilter> {
        let mut filter = LogFilter::new();
        for address in &self.address {
            let address: Address =
                address.parse().with_context(|| format!("invalid address {address}"))?;
            filter = filter.address(address);
        }
        for topic in &self.topic {
            filter = if topic == WILDCARD_TOPIC {
                filter.any_topic()
            } else {
                let topic: Hash32 = topic.parse().with_context(|| format!("invalid topic {topic}"))?;
                filter.topic(topic)
            };
        }
        Ok(filter)
    }

    pub async fn run(
        self,
        pool: &EndpointPool,
        default_replicas: usize,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Value> {
        let filter = self.filter()?;
        let range = BlockRange::new(self.from, self.to);
        let replicas = self.replicas.unwrap_or(default_replicas);

        tracing::info!(%range, replicas, "fetching logs");
        let logs = pool.get_logs(&filter, range, replicas, cancel).await?;
        tracing::info!(count = logs.len(), "logs fetched");

        Ok(serde_json::to_value(logs)?)
    }
}
