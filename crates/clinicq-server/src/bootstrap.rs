//! Record store construction for the queue server.
//!
//! Opens the backend named in configuration, runs migrations for
//! `PostgreSQL`, and seeds clinics into an empty store.

use clinicq_core::StoreBackend;
use clinicq_core::config::StoreConfig;
use clinicq_db::{
    DbError, MemoryStore, NewClinic, PostgresConfig, PostgresStore, Store, TicketStore,
};
use tracing::info;

/// Open the configured backend.
///
/// For `PostgreSQL` the pool handle is also returned so `main` can close
/// it after the engine has shut down.
pub async fn open_store(
    config: &StoreConfig,
) -> Result<(Store, Option<PostgresStore>), DbError> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory record store");
            Ok((Store::Memory(MemoryStore::new()), None))
        }
        StoreBackend::Postgres => {
            let pg_config = PostgresConfig::new(&config.postgres_url)
                .with_max_connections(config.max_connections)
                .with_connect_timeout(config.connect_timeout());
            let pg = PostgresStore::connect(&pg_config).await?;
            pg.run_migrations().await?;
            info!(
                max_connections = config.max_connections,
                "PostgreSQL record store ready"
            );
            Ok((Store::Postgres(pg.clone()), Some(pg)))
        }
    }
}

/// Insert `clinics` if the store has none yet. Returns how many were added.
pub async fn seed_clinics<S: TicketStore>(
    store: &S,
    clinics: &[NewClinic],
) -> Result<usize, DbError> {
    if !store.list_clinics().await?.is_empty() {
        return Ok(0);
    }
    for clinic in clinics {
        let id = store.insert_clinic(clinic).await?;
        info!(clinic_id = %id, name = %clinic.name, "Seeded clinic");
    }
    Ok(clinics.len())
}
