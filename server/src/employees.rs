//! Employee CRUD handlers. Each request opens one session, runs one data
//! operation against it, commits, and lets the session go.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        path::ErrorKind,
        rejection::PathRejection,
    },
    http::StatusCode,
    routing::{get, put},
};
use axum_extra::extract::WithRejection;
use entity::{MutableField, employee};
use platform_api::{ApiError, ApiResult};
use platform_db::{employees, open_session};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::http::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/employees", get(list_employees).post(create_employee))
        .route("/employees/", get(list_employees).post(create_employee))
        .route(
            "/employees/{employee_id}",
            get(get_employee).delete(delete_employee),
        )
        .route(
            "/employees/{employee_id}/{column}/{new_value}",
            put(update_employee),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeParams {
    pub name: String,
    pub department: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedEmployee {
    #[serde(rename = "Employees added")]
    pub name: String,
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct EmployeeList {
    pub status: u16,
    pub employees: Vec<employee::Model>,
}

#[derive(Debug, Serialize)]
pub struct EmployeeEnvelope {
    pub status: u16,
    pub employee: employee::Model,
}

#[derive(Debug, Serialize)]
pub struct UpdatedEmployee {
    pub status: &'static str,
    pub employee: employee::Model,
}

fn not_found(employee_id: &str) -> ApiError {
    ApiError::not_found(format!("Employee with ID {employee_id} not found"))
}

// Ids are issued as UUIDs, so anything that does not parse was never issued.
fn parse_id(employee_id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(employee_id).map_err(|_| not_found(employee_id))
}

// An id segment that does not even decode as UTF-8 was never issued either.
fn path_error(rejection: PathRejection) -> ApiError {
    if let PathRejection::FailedToDeserializePathParams(err) = &rejection {
        if let ErrorKind::InvalidUtf8InPathParam { key } = err.kind() {
            if key == "employee_id" {
                return ApiError::not_found("Employee with the given ID not found");
            }
        }
    }
    rejection.into()
}

pub async fn create_employee(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<CreateEmployeeParams>, ApiError>,
) -> ApiResult<Json<CreatedEmployee>> {
    let session = open_session(&state.pool).await?;
    let created = employees::insert(&session, params.name, params.department).await?;
    session.commit().await?;
    info!(employee_id = %created.id, "employee created");
    Ok(Json(CreatedEmployee {
        name: created.name,
        id: created.id,
    }))
}

/// An empty table is reported as not found rather than as an empty list.
pub async fn list_employees(State(state): State<AppState>) -> ApiResult<Json<EmployeeList>> {
    let session = open_session(&state.pool).await?;
    let rows = employees::list(&session).await?;
    session.commit().await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("Employees not found"));
    }
    Ok(Json(EmployeeList {
        status: StatusCode::OK.as_u16(),
        employees: rows,
    }))
}

pub async fn get_employee(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<EmployeeEnvelope>> {
    let Path(employee_id) = path.map_err(path_error)?;
    let id = parse_id(&employee_id)?;
    let session = open_session(&state.pool).await?;
    let found = employees::find(&session, id).await?;
    session.commit().await?;
    let employee = found.ok_or_else(|| not_found(&employee_id))?;
    Ok(Json(EmployeeEnvelope {
        status: StatusCode::OK.as_u16(),
        employee,
    }))
}

pub async fn update_employee(
    State(state): State<AppState>,
    path: Result<Path<(String, String, String)>, PathRejection>,
) -> ApiResult<Json<UpdatedEmployee>> {
    let Path((employee_id, column, new_value)) = path.map_err(path_error)?;
    let field: MutableField = column.parse()?;
    let id = parse_id(&employee_id)?;
    let session = open_session(&state.pool).await?;
    let Some(employee) = employees::update_field(&session, id, field, new_value).await? else {
        return Err(not_found(&employee_id));
    };
    session.commit().await?;
    info!(employee_id = %id, %field, "employee updated");
    Ok(Json(UpdatedEmployee {
        status: "success",
        employee,
    }))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(employee_id) = path.map_err(path_error)?;
    let id = parse_id(&employee_id)?;
    let session = open_session(&state.pool).await?;
    if !employees::delete(&session, id).await? {
        return Err(not_found(&employee_id));
    }
    session.commit().await?;
    info!(employee_id = %id, "employee deleted");
    Ok(StatusCode::NO_CONTENT)
}
