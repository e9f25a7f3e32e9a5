use tokio::sync::RwLock;

use super::errors::ApiResponseError;
use super::requests::SimulationRequest;
use super::responses::{
    CurveRowsResponse, CycleRowsResponse, ListSimulationsResponse, ListedSimulation,
    RunningSimulationsResponse, SimulationSummary,
};
use crate::repository::Repository;

use actix_web::{
    delete, get, post,
    web::{Data, Json, Path},
    HttpResponse, Responder, Result,
};
use uuid::Uuid;

fn parse_id(path: Path<String>) -> Result<Uuid, ApiResponseError> {
    Uuid::try_parse(&path.into_inner()).map_err(ApiResponseError::ErrorBadUuid)
}

#[get("ping")]
async fn ping() -> Result<impl Responder> {
    Ok(HttpResponse::Ok().finish())
}

#[delete("clear")]
async fn clear(repository: Data<RwLock<Repository>>) -> Result<impl Responder> {
    repository.write().await.clear();

    Ok(HttpResponse::Ok())
}

#[post("simulations")]
async fn create_simulation(
    repository: Data<RwLock<Repository>>,
    payload: Json<SimulationRequest>,
) -> Result<impl Responder> {
    let SimulationRequest {
        config,
        deadline_seconds,
    } = payload.into_inner();

    // the lock is only taken to register and to store, never across the run
    let job = repository
        .write()
        .await
        .start_simulation(config, deadline_seconds)
        .map_err(ApiResponseError::from)?;
    let simulation_id = job.simulation_id();
    let result = job.run().await;

    let mut repository = repository.write().await;
    let report = repository
        .finish_simulation(simulation_id, result)
        .map_err(ApiResponseError::from)?;

    Ok(Json(SimulationSummary {
        simulation_id,
        seed: report.seed,
        completed_cycles: report.completed_cycles,
        cancelled: report.cancelled,
        policies: report.summary(),
    }))
}

#[get("simulations")]
async fn list_simulations(repository: Data<RwLock<Repository>>) -> Result<impl Responder> {
    let simulations = repository
        .read()
        .await
        .list_reports()
        .map(|(&simulation_id, policies)| ListedSimulation {
            simulation_id,
            policies,
        })
        .collect();

    Ok(Json(ListSimulationsResponse { simulations }))
}

#[get("simulations/running")]
async fn running_simulations(repository: Data<RwLock<Repository>>) -> Result<impl Responder> {
    let simulation_ids = repository
        .read()
        .await
        .running_simulations()
        .copied()
        .collect();

    Ok(Json(RunningSimulationsResponse { simulation_ids }))
}

#[post("simulations/{simulation_id}/cancel")]
async fn cancel_simulation(
    repository: Data<RwLock<Repository>>,
    path: Path<String>,
) -> Result<impl Responder> {
    let simulation_id = parse_id(path)?;
    repository
        .read()
        .await
        .cancel_simulation(simulation_id)
        .map_err(ApiResponseError::from)?;

    Ok(HttpResponse::Ok())
}

#[get("simulations/{simulation_id}")]
async fn get_simulation(
    repository: Data<RwLock<Repository>>,
    path: Path<String>,
) -> Result<impl Responder> {
    let simulation_id = parse_id(path)?;
    let report = repository
        .read()
        .await
        .get_report(simulation_id)
        .cloned()
        .map_err(ApiResponseError::from)?;

    Ok(Json(report))
}

#[get("simulations/{simulation_id}/cycles")]
async fn simulation_cycles(
    repository: Data<RwLock<Repository>>,
    path: Path<String>,
) -> Result<impl Responder> {
    let simulation_id = parse_id(path)?;
    let rows = repository
        .read()
        .await
        .get_report(simulation_id)
        .map(|report| report.cycle_rows())
        .map_err(ApiResponseError::from)?;

    Ok(Json(CycleRowsResponse {
        simulation_id,
        rows,
    }))
}

#[get("simulations/{simulation_id}/curve")]
async fn simulation_curve(
    repository: Data<RwLock<Repository>>,
    path: Path<String>,
) -> Result<impl Responder> {
    let simulation_id = parse_id(path)?;
    let rows = repository
        .read()
        .await
        .get_report(simulation_id)
        .map(|report| report.curve_rows())
        .map_err(ApiResponseError::from)?;

    Ok(Json(CurveRowsResponse {
        simulation_id,
        rows,
    }))
}

#[delete("simulations/{simulation_id}")]
async fn delete_simulation(
    repository: Data<RwLock<Repository>>,
    path: Path<String>,
) -> Result<impl Responder> {
    let simulation_id = parse_id(path)?;
    repository
        .write()
        .await
        .delete_report(simulation_id)
        .map_err(ApiResponseError::from)?;

    Ok(HttpResponse::Ok())
}
