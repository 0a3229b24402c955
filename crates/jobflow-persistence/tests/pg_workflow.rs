//! Paridad con el backend en memoria sobre Postgres.
//! Requiere DATABASE_URL; sin ella los tests se saltan.


use jobflow_core::{Action, JobState, JobflowError, Missing, NewStep, StepSpec};
use jobflow_persistence::pg_engine;
use serde_json::json;
use test_support::with_pool;

fn three_steps() -> Vec<(usize, StepSpec)> {
    vec![(0, StepSpec::new(NewStep::named("one"), Action::GoToStep(1)).with_reject(Action::EndJob)),
         (1, StepSpec::new(NewStep::named("two"), Action::GoToStep(2)).with_reject(Action::EndJob)),
         (2, StepSpec::new(NewStep::named("three"), Action::EndJob))]
}

#[test]
fn pg_steps_are_listed_in_supplied_order() {
    let Some(pool) = with_pool(|p| p.clone()) else {
        eprintln!("skip pg_steps_are_listed_in_supplied_order (no DATABASE_URL)");
        return;
    };
    let engine = pg_engine(pool);
    let bp = engine.create_blueprint("pg-order").unwrap();
    // Orden de llegada distinto del orden de índices.
    let entries = vec![(1, StepSpec::new(NewStep::named("second"), Action::EndJob)),
                       (0, StepSpec::new(NewStep::named("first"), Action::GoToStep(1)))];
    let bp = engine.set_steps(bp.id, entries).unwrap();
    let steps = engine.steps(bp.id).unwrap();
    let names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["second", "first"]);
    assert_eq!(bp.execution_table.entry(0).unwrap().step_id, steps[1].id);

    let reloaded = engine.blueprint(bp.id).unwrap();
    assert_eq!(reloaded.execution_table, bp.execution_table);
    engine.delete_blueprint(bp.id).unwrap();
}

#[test]
fn pg_job_walks_to_finish_and_guards_terminal_state() {
    let Some(pool) = with_pool(|p| p.clone()) else {
        eprintln!("skip pg_job_walks_to_finish_and_guards_terminal_state (no DATABASE_URL)");
        return;
    };
    let engine = pg_engine(pool);
    let bp = engine.create_blueprint("pg-walk").unwrap();
    engine.set_steps(bp.id, three_steps()).unwrap();
    let steps = engine.steps(bp.id).unwrap();
    let job = engine.create_job(bp.id).unwrap();

    assert_eq!(engine.start(job.id).unwrap(), steps[0]);
    engine.accept_step(job.id).unwrap();
    engine.accept_step(job.id).unwrap();
    assert_eq!(engine.current_step(job.id).unwrap(), steps[2]);
    let done = engine.accept_step(job.id).unwrap();
    assert_eq!(done.state, JobState::Finished);
    assert_eq!(done.current_execution_step, None);
    assert_eq!(engine.accept_step(job.id), Err(JobflowError::AlreadyFinished(job.id)));
    assert_eq!(engine.job(job.id).unwrap().version, done.version);

    engine.delete_blueprint(bp.id).unwrap();
    assert_eq!(engine.job(job.id), Err(JobflowError::NotFound(Missing::Job(job.id))));
}

#[test]
fn pg_step_data_round_trip() {
    let Some(pool) = with_pool(|p| p.clone()) else {
        eprintln!("skip pg_step_data_round_trip (no DATABASE_URL)");
        return;
    };
    let engine = pg_engine(pool);
    let bp = engine.create_blueprint("pg-data").unwrap();
    engine.set_steps(bp.id, three_steps()).unwrap();
    let job = engine.create_job(bp.id).unwrap();
    engine.start(job.id).unwrap();

    engine.set_data_for_step(job.id, 0, json!({"abc": 123})).unwrap();
    assert_eq!(engine.get_data_for_step(job.id, 0).unwrap(), json!({"abc": 123}));
    assert_eq!(engine.get_data_for_step(job.id, 2),
               Err(JobflowError::NotFound(Missing::Data { index: 2 })));
    engine.delete_blueprint(bp.id).unwrap();
}

#[test]
fn pg_stale_save_is_a_version_conflict() {
    use jobflow_core::{JobRepository, StoreError};

    let Some(pool) = with_pool(|p| p.clone()) else {
        eprintln!("skip pg_stale_save_is_a_version_conflict (no DATABASE_URL)");
        return;
    };
    let engine = pg_engine(pool);
    let bp = engine.create_blueprint("pg-cas").unwrap();
    engine.set_steps(bp.id, three_steps()).unwrap();
    let job = engine.create_job(bp.id).unwrap();
    engine.start(job.id).unwrap();

    let stale = engine.job(job.id).unwrap();
    engine.accept_step(job.id).unwrap();
    assert_eq!(engine.job_store().save_job(&stale), Err(StoreError::VersionConflict(job.id)));
    assert_eq!(engine.job(job.id).unwrap().current_execution_step, Some(1));
    engine.delete_blueprint(bp.id).unwrap();
}

#[test]
fn pg_set_steps_twice_rolls_back() {
    let Some(pool) = with_pool(|p| p.clone()) else {
        eprintln!("skip pg_set_steps_twice_rolls_back (no DATABASE_URL)");
        return;
    };
    let engine = pg_engine(pool);
    let bp = engine.create_blueprint("pg-twice").unwrap();
    engine.set_steps(bp.id, three_steps()).unwrap();
    assert!(matches!(engine.set_steps(bp.id, three_steps()), Err(JobflowError::InvalidDefinition(_))));
    assert_eq!(engine.steps(bp.id).unwrap().len(), 3);
    engine.delete_blueprint(bp.id).unwrap();
}
