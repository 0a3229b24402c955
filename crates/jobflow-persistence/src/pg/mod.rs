//! Implementaciones Postgres (Diesel) de los repositorios del core.
//!
//! - `blueprints`: `PgBlueprintRepository` (tablas `blueprints` y `steps`).
//! - `jobs`: `PgJobRepository` (tabla `jobs`, guardado compare-and-swap por
//!   la columna `version`).
//!
//! Cada operación abre su propia transacción; las escrituras que deben ser
//! atómicas (`define_steps`, `save_job`) corren enteras dentro de ella. Los
//! errores transitorios de conexión/serialización se reintentan con un
//! backoff corto; los resultados de dominio (no encontrado, conflicto de
//! versión) nunca.

mod blueprints;
mod jobs;

use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use jobflow_core::JobEngine;
use log::warn;
use std::thread;
use std::time::Duration;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

pub use blueprints::{BlueprintRow, PgBlueprintRepository, StepRow};
pub use jobs::{JobRow, PgJobRepository};

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Engine respaldado por Postgres.
pub type PgJobEngine<P> = JobEngine<PgBlueprintRepository<P>, PgJobRepository<P>>;

/// Origen de conexiones de los repositorios Pg.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooled, PersistenceError>;
}

/// Conexión prestada por el pool.
pub type PgPooled = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooled, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("checkout: {e}")))
    }
}

/// Fragmentos de mensaje de Postgres que indican un fallo pasajero cuando
/// Diesel no lo clasifica.
const TRANSIENT_HINTS: &[&str] = &["deadlock detected",
                                   "could not serialize access",
                                   "terminating connection",
                                   "connection closed",
                                   "connection refused",
                                   "timeout"];

const MAX_RETRIES: u64 = 3;
const BACKOFF_STEP_MS: u64 = 15;

fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict | PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let msg = msg.to_lowercase();
            TRANSIENT_HINTS.iter().any(|hint| msg.contains(hint))
        }
        _ => false,
    }
}

/// Ejecuta `op` y la repite ante fallos pasajeros, esperando 15, 30 y 45 ms.
/// Conflictos de versión y demás resultados de dominio vuelven al primer intento.
fn with_retry<F, T>(mut op: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut retries = 0;
    loop {
        match op() {
            Err(e) if retries < MAX_RETRIES && is_retryable(&e) => {
                retries += 1;
                let wait = Duration::from_millis(BACKOFF_STEP_MS * retries);
                warn!("jobflow pg retry {retries}/{MAX_RETRIES} in {wait:?}: {e}");
                thread::sleep(wait);
            }
            outcome => return outcome,
        }
    }
}

/// Pool r2d2 para `database_url`, con el esquema de jobflow ya migrado.
/// Tamaños en 0 se suben a 1 y un mínimo mayor que el máximo se recorta.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let max_size = max_size.max(1);
    let min_idle = min_size.clamp(1, max_size);
    if min_idle != min_size.max(1) {
        warn!("pool min_size {min_size} above max_size {max_size}; using {min_idle}");
    }
    let pool = r2d2::Pool::builder().min_idle(Some(min_idle))
                                    .max_size(max_size)
                                    .build(ConnectionManager::<PgConnection>::new(database_url))
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    let mut conn = pool.get()
                       .map_err(|e| PersistenceError::TransientIo(format!("migration checkout: {e}")))?;
    run_pending_migrations(&mut conn)?;
    drop(conn);
    Ok(pool)
}

/// `build_pool` con la configuración de `DbConfig::from_env` (`.env` incluido).
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

/// Engine con ambos repositorios sobre el mismo pool.
pub fn pg_engine(pool: PgPool) -> PgJobEngine<PoolProvider> {
    let provider = PoolProvider { pool };
    JobEngine::new_with_stores(PgBlueprintRepository::new(provider.clone()), PgJobRepository::new(provider))
}
