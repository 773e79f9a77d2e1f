//! Optional telemetry write-path, default-off
//! (`features.clickhouse-enable`). Grounded in
//! `xcutr-service/internal/infrastructure/observability/clickhouse/client.go`
//! and `internal/application/service/services.go`'s
//! `go x.writeClckhouse(userID.String(), req.GetLanguage())`.
//!
//! The original's migration SQL has a syntax error (a trailing comma
//! before `VALUES`); this is corrected here per the owning
//! specification's Open Question resolution.

#[cfg(feature = "clickhouse-telemetry")]
use std::sync::Arc;

#[cfg(feature = "clickhouse-telemetry")]
use crate::config::ClickhouseSecrets;

#[cfg(feature = "clickhouse-telemetry")]
pub struct ClickhouseClient {
    client: clickhouse::Client,
}

#[cfg(feature = "clickhouse-telemetry")]
impl ClickhouseClient {
    pub fn connect(secrets: &ClickhouseSecrets) -> Self {
        let client = clickhouse::Client::default()
            .with_url(format!("http://{}:{}", secrets.host, secrets.port))
            .with_user(&secrets.username)
            .with_password(&secrets.password)
            .with_database(&secrets.database);
        Self { client }
    }

    pub async fn run_migrations(&self) -> Result<(), clickhouse::error::Error> {
        self.client
            .query(
                "CREATE TABLE IF NOT EXISTS user_services (
                    user_id String,
                    language String,
                    created_at DateTime DEFAULT now()
                ) ENGINE = MergeTree ORDER BY created_at",
            )
            .execute()
            .await
    }

    /// Records one execution. Corrected SQL relative to the original
    /// (no trailing comma before `VALUES`).
    async fn record_execution(
        &self,
        user_id: &str,
        language: &str,
    ) -> Result<(), clickhouse::error::Error> {
        self.client
            .query("INSERT INTO user_services (user_id, language) VALUES (?, ?)")
            .bind(user_id)
            .bind(language)
            .execute()
            .await
    }
}

/// Unifies the feature-gated and no-op telemetry paths behind one call
/// site, so `ExecutorService`'s fire-and-forget analytics write (spec.md
/// §4.2's "Telemetry side-effect") doesn't need `#[cfg(...)]` at every
/// call site. `Disabled` is also what's constructed when
/// `features.clickhouse-enable` is off, matching the feature's
/// default-off posture.
#[derive(Clone)]
pub enum Telemetry {
    #[cfg(feature = "clickhouse-telemetry")]
    Enabled(Arc<ClickhouseClient>),
    Disabled,
}

impl Telemetry {
    pub fn disabled() -> Self {
        Telemetry::Disabled
    }

    #[cfg(feature = "clickhouse-telemetry")]
    pub fn enabled(client: ClickhouseClient) -> Self {
        Telemetry::Enabled(Arc::new(client))
    }

    /// Fire-and-forget telemetry write, detached from the request's
    /// cancellation scope (a freestanding `tokio::spawn`, not a child of
    /// the request task), matching the original's
    /// `go x.writeClckhouse(...)`. No-ops when disabled.
    pub fn record_execution(&self, user_id: String, language: String) {
        match self {
            #[cfg(feature = "clickhouse-telemetry")]
            Telemetry::Enabled(client) => {
                let client = client.clone();
                tokio::spawn(async move {
                    if let Err(err) = client.record_execution(&user_id, &language).await {
                        tracing::warn!(error = %err, "failed to write clickhouse telemetry");
                    }
                });
            }
            Telemetry::Disabled => {}
        }
    }
}
