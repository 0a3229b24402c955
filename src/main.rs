use jobflow::{run_demo, AppConfig, AppError, Backend, DemoReport};
use jobflow_core::JobEngine;
use jobflow_persistence::{build_dev_pool_from_env, pg_engine};
use log::{error, info};

fn run() -> Result<DemoReport, AppError> {
    let cfg = AppConfig::from_env()?;
    info!("backend seleccionado: {:?}", cfg.backend);
    match cfg.backend {
        Backend::Memory => run_demo(&JobEngine::in_memory()),
        Backend::Postgres => {
            let pool = build_dev_pool_from_env()?;
            run_demo(&pg_engine(pool))
        }
    }
}

fn main() {
    env_logger::init();
    match run() {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                error!("no se pudo serializar el reporte: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("{e}");
            eprintln!("jobflow-demo: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
