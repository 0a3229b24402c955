use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use jobflow_core::{BlueprintId, Job, JobId, JobRepository, JobState, Missing, StoreError};
use log::{debug, error};
use serde_json::Value;
use uuid::Uuid;

use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::jobs;

/// Fila de `jobs`. `state` guarda el código corto (`NS`, `S`, `F`) y `data`
/// el mapa índice -> payload con claves string.
#[derive(Queryable, Debug)]
pub struct JobRow {
    pub id: Uuid,
    pub blueprint_id: i64,
    pub current_execution_step: Option<i32>,
    pub state: String,
    pub data: Value,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = jobs)]
struct NewJobRow<'a> {
    id: Uuid,
    blueprint_id: i64,
    current_execution_step: Option<i32>,
    state: &'a str,
    data: Value,
    version: i64,
}

impl TryFrom<JobRow> for Job {
    type Error = PersistenceError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let state = JobState::from_code(&row.state).ok_or_else(|| PersistenceError::Decode(format!("job {} unknown state `{}`", row.id, row.state)))?;
        let current_execution_step = row.current_execution_step
                                        .map(usize::try_from)
                                        .transpose()
                                        .map_err(|_| PersistenceError::Decode(format!("job {} negative step index", row.id)))?;
        let data: BTreeMap<usize, Value> =
            serde_json::from_value(row.data).map_err(|e| PersistenceError::Decode(format!("job {} data: {e}", row.id)))?;
        let job = Job { id: JobId(row.id),
                        blueprint_id: BlueprintId(row.blueprint_id),
                        current_execution_step,
                        state,
                        data,
                        version: row.version,
                        updated_at: row.updated_at };
        job.check_invariants().map_err(PersistenceError::Decode)?;
        Ok(job)
    }
}

fn index_column(job: &Job) -> Result<Option<i32>, PersistenceError> {
    job.current_execution_step
       .map(i32::try_from)
       .transpose()
       .map_err(|_| PersistenceError::Decode(format!("job {} step index too large", job.id)))
}

fn data_column(job: &Job) -> Result<Value, PersistenceError> {
    serde_json::to_value(&job.data).map_err(|e| PersistenceError::Unknown(format!("ser: {e}")))
}

pub struct PgJobRepository<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgJobRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> JobRepository for PgJobRepository<P> {
    fn insert_job(&self, job: &Job) -> Result<Job, StoreError> {
        let current_execution_step = index_column(job)?;
        let data = data_column(job)?;
        let row: JobRow = with_retry(|| {
                              let mut conn = self.provider.connection()?;
                              let new_row = NewJobRow { id: job.id.0,
                                                        blueprint_id: job.blueprint_id.0,
                                                        current_execution_step,
                                                        state: job.state.code(),
                                                        data: data.clone(),
                                                        version: 0 };
                              diesel::insert_into(jobs::table).values(new_row)
                                                              .get_result(&mut conn)
                                                              .map_err(PersistenceError::from)
                          }).map_err(|e| match e {
                                PersistenceError::ForeignKeyViolation(_) => PersistenceError::Store(StoreError::NotFound(Missing::Blueprint(job.blueprint_id))),
                                other => other,
                            })?;
        debug!("insert_job id={} blueprint={}", row.id, row.blueprint_id);
        Ok(Job::try_from(row)?)
    }

    fn load_job(&self, id: JobId) -> Result<Job, StoreError> {
        let row: Option<JobRow> = with_retry(|| {
                                      let mut conn = self.provider.connection()?;
                                      jobs::table.find(id.0)
                                                 .first(&mut conn)
                                                 .optional()
                                                 .map_err(PersistenceError::from)
                                  })?;
        let row = row.ok_or(StoreError::NotFound(Missing::Job(id)))?;
        Ok(Job::try_from(row)?)
    }

    fn save_job(&self, job: &Job) -> Result<Job, StoreError> {
        let current_execution_step = index_column(job)?;
        let data = data_column(job)?;
        debug!("save_job:start job={} expected_version={}", job.id, job.version);
        // UPDATE ... WHERE id = $1 AND version = $2: si otro llamador guardó
        // antes, no se actualiza ninguna fila y se reporta conflicto.
        let saved = with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx| -> Result<Job, PersistenceError> {
                    let updated: Option<JobRow> =
                        diesel::update(jobs::table.filter(jobs::id.eq(job.id.0))
                                                  .filter(jobs::version.eq(job.version)))
                            .set((jobs::current_execution_step.eq(current_execution_step),
                                  jobs::state.eq(job.state.code()),
                                  jobs::data.eq(data.clone()),
                                  jobs::version.eq(job.version + 1),
                                  jobs::updated_at.eq(Utc::now())))
                            .get_result(tx)
                            .optional()?;
                    match updated {
                        Some(row) => Job::try_from(row),
                        None => {
                            let exists = jobs::table.find(job.id.0)
                                                    .select(jobs::id)
                                                    .first::<Uuid>(tx)
                                                    .optional()?
                                                    .is_some();
                            if exists {
                                Err(StoreError::VersionConflict(job.id).into())
                            } else {
                                Err(StoreError::NotFound(Missing::Job(job.id)).into())
                            }
                        }
                    }
                })
        }).inspect_err(|e| match e {
              PersistenceError::Store(_) => debug!("save_job:rejected job={} err={e}", job.id),
              other => error!("save_job:error job={} err={other:?}", job.id),
          })?;
        debug!("save_job:done job={} version={}", saved.id, saved.version);
        Ok(saved)
    }

    fn list_jobs(&self, blueprint_id: BlueprintId) -> Result<Vec<Job>, StoreError> {
        let rows: Vec<JobRow> = with_retry(|| {
                                    let mut conn = self.provider.connection()?;
                                    jobs::table.filter(jobs::blueprint_id.eq(blueprint_id.0))
                                               .order(jobs::updated_at.asc())
                                               .load(&mut conn)
                                               .map_err(PersistenceError::from)
                                })?;
        let jobs = rows.into_iter()
                       .map(Job::try_from)
                       .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn delete_jobs_for(&self, blueprint_id: BlueprintId) -> Result<usize, StoreError> {
        let deleted = with_retry(|| {
                          let mut conn = self.provider.connection()?;
                          diesel::delete(jobs::table.filter(jobs::blueprint_id.eq(blueprint_id.0))).execute(&mut conn)
                                                                                                   .map_err(PersistenceError::from)
                      })?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(state: &str, step: Option<i32>, data: Value) -> JobRow {
        JobRow { id: Uuid::new_v4(),
                 blueprint_id: 1,
                 current_execution_step: step,
                 state: state.to_string(),
                 data,
                 version: 3,
                 updated_at: Utc::now() }
    }

    #[test]
    fn decodes_valid_rows() {
        let job = Job::try_from(row("S", Some(2), json!({"2": {"abc": 123}}))).unwrap();
        assert_eq!(job.state, JobState::Started);
        assert_eq!(job.current_execution_step, Some(2));
        assert_eq!(job.data.get(&2), Some(&json!({"abc": 123})));
        assert_eq!(job.version, 3);
    }

    #[test]
    fn rejects_corrupt_rows() {
        assert!(matches!(Job::try_from(row("X", None, json!({}))), Err(PersistenceError::Decode(_))));
        assert!(matches!(Job::try_from(row("F", Some(1), json!({}))), Err(PersistenceError::Decode(_))));
        assert!(matches!(Job::try_from(row("S", Some(-1), json!({}))), Err(PersistenceError::Decode(_))));
        assert!(matches!(Job::try_from(row("NS", None, json!({"zero": 1}))), Err(PersistenceError::Decode(_))));
    }
}
