//! jobflow-persistence
//!
//! Backend Postgres (Diesel + r2d2) de los repositorios de `jobflow-core`.
//!
//! Módulos:
//! - `pg`: `PgBlueprintRepository`, `PgJobRepository`, pool y retry.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel `blueprints`, `steps`, `jobs`.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, pg_engine, ConnectionProvider, PgBlueprintRepository, PgJobEngine, PgJobRepository, PgPool,
             PoolProvider};
