use chrono::{DateTime, Utc};
use diesel::prelude::*;
use jobflow_core::{Blueprint, BlueprintId, BlueprintRepository, ExecutionTable, Missing, Step, StepDraft, StepId, StoreError};
use log::debug;
use serde_json::Value;

use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::{blueprints, steps};

/// Fila de `blueprints`. `execution_table` es el JSON `{"0": {...}, ...}`.
#[derive(Queryable, Debug)]
pub struct BlueprintRow {
    pub id: i64,
    pub name: String,
    pub execution_table: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = blueprints)]
struct NewBlueprintRow<'a> {
    name: &'a str,
}

/// Fila de `steps`. `position` conserva el orden de `set_steps`.
#[derive(Queryable, Debug)]
pub struct StepRow {
    pub id: i64,
    pub blueprint_id: i64,
    pub name: String,
    pub return_value: Option<i32>,
    pub position: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = steps)]
struct NewStepRow<'a> {
    blueprint_id: i64,
    name: &'a str,
    return_value: Option<i32>,
    position: i32,
}

impl TryFrom<BlueprintRow> for Blueprint {
    type Error = PersistenceError;

    fn try_from(row: BlueprintRow) -> Result<Self, Self::Error> {
        let execution_table: ExecutionTable =
            serde_json::from_value(row.execution_table).map_err(|e| {
                                                            PersistenceError::Decode(format!("blueprint {} execution_table: {e}", row.id))
                                                        })?;
        Ok(Blueprint { id: BlueprintId(row.id),
                       name: row.name,
                       execution_table,
                       created_at: row.created_at })
    }
}

impl From<StepRow> for Step {
    fn from(row: StepRow) -> Self {
        Step { id: StepId(row.id),
               blueprint_id: BlueprintId(row.blueprint_id),
               name: row.name,
               return_value: row.return_value }
    }
}

pub struct PgBlueprintRepository<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgBlueprintRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

fn blueprint_exists(conn: &mut PgConnection, id: BlueprintId) -> Result<bool, PersistenceError> {
    let found = blueprints::table.find(id.0)
                                 .select(blueprints::id)
                                 .first::<i64>(conn)
                                 .optional()?;
    Ok(found.is_some())
}

impl<P: ConnectionProvider> BlueprintRepository for PgBlueprintRepository<P> {
    fn create_blueprint(&self, name: &str) -> Result<Blueprint, StoreError> {
        let row: BlueprintRow = with_retry(|| {
                                    let mut conn = self.provider.connection()?;
                                    diesel::insert_into(blueprints::table).values(NewBlueprintRow { name })
                                                                          .get_result(&mut conn)
                                                                          .map_err(PersistenceError::from)
                                })?;
        debug!("create_blueprint id={}", row.id);
        Ok(Blueprint::try_from(row)?)
    }

    fn load_blueprint(&self, id: BlueprintId) -> Result<Blueprint, StoreError> {
        let row: Option<BlueprintRow> = with_retry(|| {
                                            let mut conn = self.provider.connection()?;
                                            blueprints::table.find(id.0)
                                                             .first(&mut conn)
                                                             .optional()
                                                             .map_err(PersistenceError::from)
                                        })?;
        let row = row.ok_or(StoreError::NotFound(Missing::Blueprint(id)))?;
        Ok(Blueprint::try_from(row)?)
    }

    fn define_steps(&self, id: BlueprintId, draft: &StepDraft) -> Result<Blueprint, StoreError> {
        debug!("define_steps:start blueprint={id} steps={}", draft.len());
        // Transacción única: bloqueo de la fila, inserción de steps y
        // escritura de la tabla resuelta. Cualquier error revierte todo.
        let bp = with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx| -> Result<Blueprint, PersistenceError> {
                    let row: BlueprintRow = blueprints::table.find(id.0)
                                                             .for_update()
                                                             .first(tx)
                                                             .optional()?
                                                             .ok_or(StoreError::NotFound(Missing::Blueprint(id)))?;
                    if Blueprint::try_from(row)?.is_defined() {
                        return Err(StoreError::AlreadyDefined(id).into());
                    }

                    let mut new_rows = Vec::with_capacity(draft.len());
                    for (position, step) in draft.new_steps().enumerate() {
                        let position = i32::try_from(position).map_err(|_| PersistenceError::Decode(format!("step position {position} out of range")))?;
                        new_rows.push(NewStepRow { blueprint_id: id.0,
                                                   name: &step.name,
                                                   return_value: step.return_value,
                                                   position });
                    }
                    let mut inserted: Vec<StepRow> = diesel::insert_into(steps::table).values(&new_rows)
                                                                                      .get_results(tx)?;
                    inserted.sort_by_key(|r| r.position);
                    let persisted: Vec<Step> = inserted.into_iter().map(Step::from).collect();

                    let table = draft.resolve(&persisted)
                                     .map_err(|e| PersistenceError::Decode(e.to_string()))?;
                    let table_json = serde_json::to_value(&table).map_err(|e| PersistenceError::Unknown(format!("ser: {e}")))?;
                    let updated: BlueprintRow = diesel::update(blueprints::table.find(id.0))
                        .set(blueprints::execution_table.eq(table_json))
                        .get_result(tx)?;
                    Blueprint::try_from(updated)
                })
        })?;
        debug!("define_steps:done blueprint={id}");
        Ok(bp)
    }

    fn list_steps(&self, id: BlueprintId) -> Result<Vec<Step>, StoreError> {
        let rows: Option<Vec<StepRow>> = with_retry(|| {
                                             let mut conn = self.provider.connection()?;
                                             if !blueprint_exists(&mut conn, id)? {
                                                 return Ok(None);
                                             }
                                             steps::table.filter(steps::blueprint_id.eq(id.0))
                                                         .order(steps::position.asc())
                                                         .load(&mut conn)
                                                         .map(Some)
                                                         .map_err(PersistenceError::from)
                                         })?;
        let rows = rows.ok_or(StoreError::NotFound(Missing::Blueprint(id)))?;
        Ok(rows.into_iter().map(Step::from).collect())
    }

    fn load_step(&self, id: StepId) -> Result<Step, StoreError> {
        let row: Option<StepRow> = with_retry(|| {
                                       let mut conn = self.provider.connection()?;
                                       steps::table.find(id.0)
                                                   .first(&mut conn)
                                                   .optional()
                                                   .map_err(PersistenceError::from)
                                   })?;
        row.map(Step::from)
           .ok_or(StoreError::NotFound(Missing::Step(id)))
    }

    fn set_step_return_value(&self, id: StepId, value: Option<i32>) -> Result<Step, StoreError> {
        let row: Option<StepRow> = with_retry(|| {
                                       let mut conn = self.provider.connection()?;
                                       diesel::update(steps::table.find(id.0)).set(steps::return_value.eq(value))
                                                                              .get_result(&mut conn)
                                                                              .optional()
                                                                              .map_err(PersistenceError::from)
                                   })?;
        row.map(Step::from)
           .ok_or(StoreError::NotFound(Missing::Step(id)))
    }

    fn delete_blueprint(&self, id: BlueprintId) -> Result<(), StoreError> {
        // `steps` y `jobs` se borran por ON DELETE CASCADE.
        let deleted = with_retry(|| {
                          let mut conn = self.provider.connection()?;
                          diesel::delete(blueprints::table.find(id.0)).execute(&mut conn)
                                                                      .map_err(PersistenceError::from)
                      })?;
        if deleted == 0 {
            return Err(StoreError::NotFound(Missing::Blueprint(id)));
        }
        debug!("delete_blueprint id={id}");
        Ok(())
    }
}
