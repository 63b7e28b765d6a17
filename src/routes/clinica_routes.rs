// src/routes/clinica_routes.rs

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};

use crate::{
    domain::horario::HorarioClinica,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clinica", get(get_clinica))
        .route("/clinica", patch(update_clinica))
}

#[derive(Debug, Serialize)]
pub struct ClinicaResponse {
    pub data: ClinicaData,
}

#[derive(Debug, Serialize)]
pub struct ClinicaData {
    pub nombre: String,
    /// Operating hours and blocked intervals, from server config (read-only).
    pub horario: HorarioClinica,
}

pub(crate) async fn load_nombre_clinica(state: &AppState) -> Result<String, ApiError> {
    let nombre: Option<String> = sqlx::query_scalar(
        r#"
        SELECT nombre
        FROM clinica_config
        WHERE singleton_id = TRUE
        "#,
    )
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(nombre.unwrap_or_else(|| "Clínica".to_string()))
}

pub async fn get_clinica(
    State(state): State<AppState>,
    _auth: AuthContext, // require login for now (consistent + simplest)
) -> Result<Json<ClinicaResponse>, ApiError> {
    let nombre = load_nombre_clinica(&state).await?;
    Ok(Json(ClinicaResponse {
        data: ClinicaData {
            nombre,
            horario: state.agenda.horario().clone(),
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateClinicaRequest {
    pub nombre: String,
}

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.rol == 1 {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin can update clinic settings".into(),
        ))
    }
}

pub async fn update_clinica(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UpdateClinicaRequest>,
) -> Result<Json<ClinicaResponse>, ApiError> {
    ensure_admin(&auth)?;

    let nombre = req.nombre.trim();
    if nombre.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "nombre is required".into(),
        ));
    }
    if nombre.len() > 128 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "nombre is too long (max 128)".into(),
        ));
    }

    // Upsert singleton row (safe even if missing)
    let nombre: String = sqlx::query_scalar(
        r#"
        INSERT INTO clinica_config (singleton_id, nombre)
        VALUES (TRUE, $1)
        ON CONFLICT (singleton_id)
        DO UPDATE SET nombre = EXCLUDED.nombre
        RETURNING nombre
        "#,
    )
    .bind(nombre)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ClinicaResponse {
        data: ClinicaData {
            nombre,
            horario: state.agenda.horario().clone(),
        },
    }))
}
