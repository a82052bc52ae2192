use crate::application::sink_registry::SinkRegistry;
use crate::config::SinkSettings;
use crate::infrastructure::core::HttpClientFactory;
use crate::infrastructure::observability::Metrics;
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::sinks::{CsvSink, DiscordSink, JsonlSink, SqliteSink, TelegramSink};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct SinkFactory;

impl SinkFactory {
    /// Build the registry from the enabled sinks: storage first, then alerts.
    ///
    /// Settings are expected to have passed `SinkSettings::validate`.
    pub async fn build_registry(
        settings: &SinkSettings,
        timeout: Duration,
        metrics: Option<Metrics>,
    ) -> Result<SinkRegistry> {
        let mut registry = SinkRegistry::new(timeout);
        if let Some(metrics) = metrics {
            registry = registry.with_metrics(metrics);
        }

        if settings.csv.enabled {
            registry.register_storage(Arc::new(CsvSink::new(&settings.csv.path)));
        }
        if settings.jsonl.enabled {
            registry.register_storage(Arc::new(JsonlSink::new(&settings.jsonl.path)));
        }
        if settings.sqlite.enabled {
            let db = Database::new(&settings.sqlite.db_url)
                .await
                .context("Failed to open SQLite sink database")?;
            registry.register_storage(Arc::new(SqliteSink::new(&db)));
        }

        if settings.discord.enabled || settings.telegram.enabled {
            let client = HttpClientFactory::create_client();
            if settings.discord.enabled {
                registry.register_alert(Arc::new(DiscordSink::new(
                    client.clone(),
                    &settings.discord.webhook_url,
                )));
            }
            if settings.telegram.enabled {
                registry.register_alert(Arc::new(TelegramSink::new(
                    client,
                    &settings.telegram.token,
                    &settings.telegram.chat_id,
                )));
            }
        }

        if registry.is_empty() {
            info!("SinkFactory: no sinks enabled, running as a dry run");
        } else {
            info!("SinkFactory: active sinks {:?}", registry.names());
        }
        Ok(registry)
    }
}
