mod config;
mod repos;
mod services;
mod system;

pub use config::{Config, WebhookSettings};
pub use repos::interfaces::*;
pub use repos::{
    DeleteResult, DueNotificationsQuery, Repos, RepoResult, ScheduledNotificationRepoError,
};
pub use services::*;
use std::sync::Arc;
pub use system::{ISys, RealSys, StaticTimeSys};
use tracing::{info, warn};

#[derive(Clone)]
pub struct NettuContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub notifier: Arc<dyn INotifier>,
}

struct ContextParams {
    pub postgres_connection_string: String,
}

fn create_notifier(config: &Config) -> Arc<dyn INotifier> {
    match &config.webhook {
        Some(settings) => Arc::new(WebhookNotifier::new(
            settings.clone(),
            config.delivery_timeout_millis,
        )),
        None => Arc::new(LogNotifier {}),
    }
}

impl NettuContext {
    fn create_inmemory() -> Self {
        let config = Config::new();
        Self {
            repos: Repos::create_inmemory(),
            notifier: create_notifier(&config),
            config,
            sys: Arc::new(RealSys {}),
        }
    }

    async fn create(params: ContextParams) -> anyhow::Result<Self> {
        let repos = Repos::create_postgres(&params.postgres_connection_string).await?;
        let config = Config::new();
        Ok(Self {
            repos,
            notifier: create_notifier(&config),
            config,
            sys: Arc::new(RealSys {}),
        })
    }
}

/// Will setup the infrastructure context given the environment.
///
/// Uses postgres when `DATABASE_URL` is set and falls back to inmemory
/// repositories otherwise.
pub async fn setup_context() -> NettuContext {
    const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

    match std::env::var(PSQL_CONNECTION_STRING) {
        Ok(postgres_connection_string) => {
            info!("{} env var was provided. Going to use postgres.", PSQL_CONNECTION_STRING);
            match NettuContext::create(ContextParams {
                postgres_connection_string,
            })
            .await
            {
                Ok(ctx) => ctx,
                Err(e) => panic!("Postgres credentials must be set and valid. Err: {:?}", e),
            }
        }
        Err(_) => {
            warn!(
                "{} env var was not provided. Going to use inmemory repositories, nothing will survive a restart.",
                PSQL_CONNECTION_STRING
            );
            NettuContext::create_inmemory()
        }
    }
}

/// Context with inmemory repositories regardless of the environment
pub fn setup_inmemory_context() -> NettuContext {
    NettuContext::create_inmemory()
}
