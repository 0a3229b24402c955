use jobflow_core::{Action, Blueprint, InMemoryBlueprintRepository, InMemoryJobRepository, JobEngine, JobState, JobflowError, Missing,
                   NewStep, StepSpec};
use serde_json::json;

type Engine = JobEngine<InMemoryBlueprintRepository, InMemoryJobRepository>;

fn linear_blueprint(engine: &Engine, names: &[&str]) -> Blueprint {
    let bp = engine.create_blueprint("linear").expect("blueprint");
    let last = names.len() - 1;
    let entries = names.iter().enumerate().map(|(i, name)| {
                                             let accept = if i == last { Action::EndJob } else { Action::GoToStep(i + 1) };
                                             (i, StepSpec::new(NewStep::named(*name), accept).with_reject(Action::EndJob))
                                         });
    engine.set_steps(bp.id, entries).expect("set_steps")
}

#[test]
fn blueprint_knows_its_steps_in_order() {
    let engine = Engine::default();
    let bp = linear_blueprint(&engine, &["collect", "review"]);
    let steps = engine.steps(bp.id).unwrap();
    let names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["collect", "review"]);
    assert_eq!(bp.execution_table.entry(0).unwrap().step_id, steps[0].id);
    assert_eq!(bp.execution_table.entry(1).unwrap().step_id, steps[1].id);
    assert!(steps.iter().all(|s| s.blueprint_id == bp.id));
}

#[test]
fn steps_execute_in_table_order() {
    // 0 -> GO_TO_STEP 1, 1 -> GO_TO_STEP 2, 2 -> END_JOB
    let engine = Engine::default();
    let bp = linear_blueprint(&engine, &["one", "two", "three"]);
    let steps = engine.steps(bp.id).unwrap();
    let job = engine.create_job(bp.id).unwrap();

    assert_eq!(engine.start(job.id).unwrap(), steps[0]);
    engine.accept_step(job.id).unwrap();
    assert_eq!(engine.current_step(job.id).unwrap(), steps[1]);
    engine.accept_step(job.id).unwrap();
    assert_eq!(engine.current_step(job.id).unwrap(), steps[2]);

    let done = engine.accept_step(job.id).unwrap();
    assert_eq!(done.state, JobState::Finished);
    assert_eq!(done.current_execution_step, None);
}

#[test]
fn accept_after_finish_raises_already_finished() {
    let engine = Engine::default();
    let bp = linear_blueprint(&engine, &["one", "two"]);
    let job = engine.create_job(bp.id).unwrap();
    engine.start(job.id).unwrap();
    engine.accept_step(job.id).unwrap();
    let finished = engine.accept_step(job.id).unwrap();
    assert_eq!(finished.state, JobState::Finished);
    assert_eq!(finished.current_execution_step, None);

    for _ in 0..3 {
        assert_eq!(engine.accept_step(job.id), Err(JobflowError::AlreadyFinished(job.id)));
    }
    // Ni estado, ni índice, ni versión cambian.
    assert_eq!(engine.job(job.id).unwrap(), finished);
}

#[test]
fn jobs_remember_step_data() {
    let engine = Engine::default();
    let bp = linear_blueprint(&engine, &["only"]);
    let job = engine.create_job(bp.id).unwrap();
    engine.start(job.id).unwrap();

    let data = json!({"abc": 123});
    engine.set_data_for_step(job.id, 0, data.clone()).unwrap();
    assert_eq!(engine.get_data_for_step(job.id, 0).unwrap(), data);
}

#[test]
fn missing_data_is_not_found() {
    let engine = Engine::default();
    let bp = linear_blueprint(&engine, &["only"]);
    let job = engine.create_job(bp.id).unwrap();
    assert_eq!(engine.get_data_for_step(job.id, 0),
               Err(JobflowError::NotFound(Missing::Data { index: 0 })));
}

#[test]
fn current_step_is_stable_between_accepts() {
    let engine = Engine::default();
    let bp = linear_blueprint(&engine, &["one", "two"]);
    let job = engine.create_job(bp.id).unwrap();
    engine.start(job.id).unwrap();
    engine.accept_step(job.id).unwrap();
    let a = engine.current_step(job.id).unwrap();
    let b = engine.current_step(job.id).unwrap();
    assert_eq!(a, b);
}

#[test]
fn set_steps_twice_is_rejected() {
    let engine = Engine::default();
    let bp = linear_blueprint(&engine, &["one"]);
    let again = vec![(0, StepSpec::new(NewStep::named("other"), Action::EndJob))];
    assert!(matches!(engine.set_steps(bp.id, again), Err(JobflowError::InvalidDefinition(_))));
    assert_eq!(engine.steps(bp.id).unwrap().len(), 1);
}

#[test]
fn jobs_advance_independently() {
    let engine = Engine::default();
    let bp = linear_blueprint(&engine, &["one", "two", "three"]);
    let a = engine.create_job(bp.id).unwrap();
    let b = engine.create_job(bp.id).unwrap();
    engine.start(a.id).unwrap();
    engine.start(b.id).unwrap();
    engine.accept_step(a.id).unwrap();
    engine.accept_step(a.id).unwrap();
    assert_eq!(engine.job(a.id).unwrap().current_execution_step, Some(2));
    assert_eq!(engine.job(b.id).unwrap().current_execution_step, Some(0));
    assert_eq!(engine.jobs_for(bp.id).unwrap().len(), 2);
}

#[test]
fn loops_back_to_earlier_step() {
    let engine = Engine::default();
    let bp = engine.create_blueprint("loop").unwrap();
    let bp = engine.set_steps(bp.id,
                              vec![(0, StepSpec::new(NewStep::named("draft"), Action::GoToStep(1))),
                                   (1, StepSpec::new(NewStep::named("review"), Action::EndJob)
                                           .with_reject(Action::GoToStep(0)))])
                   .unwrap();
    let job = engine.create_job(bp.id).unwrap();
    engine.start(job.id).unwrap();
    engine.accept_step(job.id).unwrap();
    let back = engine.reject_step(job.id).unwrap();
    assert_eq!(back.state, JobState::Started);
    assert_eq!(back.current_execution_step, Some(0));
    assert_eq!(engine.current_step(job.id).unwrap().name, "draft");
}

#[test]
fn delete_blueprint_cascades() {
    let engine = Engine::default();
    let bp = linear_blueprint(&engine, &["one", "two"]);
    let job = engine.create_job(bp.id).unwrap();
    engine.delete_blueprint(bp.id).unwrap();
    assert_eq!(engine.job(job.id), Err(JobflowError::NotFound(Missing::Job(job.id))));
    assert!(matches!(engine.steps(bp.id), Err(JobflowError::NotFound(Missing::Blueprint(_)))));
}
