use std::sync::Arc;

use anyhow::Context;

use codecamp_infra::store::seed;
use codecamp_infra::{
    AppConfig, CampRepository, InMemoryCampRepository, PostgresCampRepository, StoreBackend,
};

/// Shared handles every handler can reach through `Extension<Arc<AppServices>>`.
#[derive(Clone)]
pub struct AppServices {
    repository: Arc<dyn CampRepository>,
}

impl AppServices {
    pub fn new(repository: Arc<dyn CampRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &dyn CampRepository {
        self.repository.as_ref()
    }
}

/// Wire the repository backend chosen by `config` and load seed data if enabled.
///
/// - `StoreBackend::InMemory`: fresh in-process tables (dev and tests)
/// - `StoreBackend::Postgres`: connects, creates the schema if missing
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let repository: Arc<dyn CampRepository> = match &config.store {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory camp repository");
            let repo = InMemoryCampRepository::new();
            let repo = if config.seed_data {
                repo.with_speakers(seed::speakers())
            } else {
                repo
            };
            Arc::new(repo)
        }
        StoreBackend::Postgres { database_url } => {
            tracing::info!("using postgres camp repository");
            let repo = PostgresCampRepository::connect(database_url)
                .await
                .context("failed to connect to postgres")?;
            if config.seed_data {
                repo.load_speakers(&seed::speakers())
                    .await
                    .context("failed to load seed speakers")?;
            }
            Arc::new(repo)
        }
    };

    if config.seed_data {
        seed::seed_demo_camp(repository.as_ref())
            .await
            .context("failed to seed demo camp")?;
    }

    Ok(AppServices::new(repository))
}
