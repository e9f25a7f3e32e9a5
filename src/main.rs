mod actors;
mod api;
mod arms;
mod config;
mod errors;
mod policies;
mod repository;
mod simulation;

use actix::prelude::*;
use actix_web::{web::Data, App, HttpServer};
use actors::{
    cycle_worker::CycleWorker,
    report_store::{Flush, ReportStore},
};
use api::routes::{
    cancel_simulation, clear, create_simulation, delete_simulation, get_simulation,
    list_simulations, ping, running_simulations, simulation_curve, simulation_cycles,
};
use config::AppConfig;
use repository::Repository;
use tokio::sync::RwLock;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::from_env().expect("Cannot read config");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    let workers = config.runner.workers.max(1);
    info!(workers, "Starting cycle worker pool");
    let cycle_workers = SyncArbiter::start(workers, || CycleWorker);
    let report_store = ReportStore::new(config.report_store).start();

    let mut repository = Repository::new(config.runner, cycle_workers, report_store.clone());
    if let Err(err) = repository.load_reports().await {
        tracing::warn!(error = %err, "Could not load stored reports");
    }
    let repository = Data::new(RwLock::new(repository));

    HttpServer::new(move || {
        App::new()
            .app_data(repository.clone())
            .wrap(TracingLogger::default())
            .service(ping)
            .service(clear)
            .service(create_simulation)
            .service(list_simulations)
            .service(running_simulations)
            .service(cancel_simulation)
            .service(get_simulation)
            .service(simulation_cycles)
            .service(simulation_curve)
            .service(delete_simulation)
    })
    .bind((config.server.host, config.server.port))?
    .run()
    .await?;

    match report_store.send(Flush).await {
        Ok(Ok(())) => info!("Flushed simulation reports"),
        Ok(Err(err)) => tracing::warn!(error = %err, "Failed to flush simulation reports"),
        Err(err) => tracing::warn!(error = %err, "Report store unavailable at shutdown"),
    }
    Ok(())
}
