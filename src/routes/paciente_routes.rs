// src/routes/paciente_routes.rs

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, OkData, OkResponse},
};

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PacienteRow {
    pub paciente_id: Uuid,
    pub nombre: String,
    pub apellidos: String,
    pub dni: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub fecha_nacimiento: Option<chrono::NaiveDate>,
    pub notas: Option<String>,
    pub activo: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pacientes", post(crear_paciente).get(buscar_pacientes))
        .route("/pacientes/{paciente_id}", get(obtener_paciente).patch(actualizar_paciente))
        .route("/pacientes/{paciente_id}/archivar", post(archivar_paciente))
        .route("/pacientes/{paciente_id}/restaurar", post(restaurar_paciente))
}

fn ensure_gestion(auth: &AuthContext) -> Result<(), ApiError> {
    // 1 admin, 3 recepcionista
    if auth.rol == 1 || auth.rol == 3 {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin/recepcionista can manage patients".into(),
        ))
    }
}

fn validar_nombre(campo: &'static str, valor: &str) -> Result<String, ApiError> {
    let v = valor.trim();
    if v.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("{campo} is required"),
        ));
    }
    Ok(v.to_string())
}

fn validar_telefono(telefono: &str) -> Result<String, ApiError> {
    let t = telefono.trim();
    let digitos = t.chars().filter(|c| c.is_ascii_digit()).count();
    if digitos < 6 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "telefono must contain at least 6 digits".into(),
        ));
    }
    Ok(t.to_string())
}

const PACIENTE_COLUMNS: &str = r#"
    paciente_id, nombre, apellidos, dni, telefono, email,
    fecha_nacimiento, notas, activo, created_at, updated_at
"#;

#[derive(Debug, Deserialize)]
pub struct CrearPacienteRequest {
    pub nombre: String,
    pub apellidos: String,
    pub dni: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub fecha_nacimiento: Option<chrono::NaiveDate>,
    pub notas: Option<String>,
}

pub async fn crear_paciente(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CrearPacienteRequest>,
) -> Result<Json<PacienteRow>, ApiError> {
    ensure_gestion(&auth)?;

    let nombre = validar_nombre("nombre", &req.nombre)?;
    let apellidos = validar_nombre("apellidos", &req.apellidos)?;
    let telefono = req.telefono.as_deref().map(validar_telefono).transpose()?;

    let row: PacienteRow = sqlx::query_as::<_, PacienteRow>(&format!(
        r#"
        INSERT INTO paciente (nombre, apellidos, dni, telefono, email, fecha_nacimiento, notas, activo)
        VALUES ($1, $2, $3, $4, $5, $6, $7, true)
        RETURNING {PACIENTE_COLUMNS}
        "#
    ))
    .bind(&nombre)
    .bind(&apellidos)
    .bind(req.dni.as_deref().map(str::trim))
    .bind(telefono)
    .bind(req.email.as_deref().map(str::trim))
    .bind(req.fecha_nacimiento)
    .bind(req.notas.as_deref())
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
pub struct BusquedaQuery {
    /// Matches name, surname or DNI (case-insensitive substring).
    pub q: Option<String>,
    pub incluir_archivados: Option<bool>,
    pub limit: Option<i64>,
}

pub async fn buscar_pacientes(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<BusquedaQuery>,
) -> Result<Json<Vec<PacienteRow>>, ApiError> {
    ensure_gestion(&auth)?;

    let limit = q.limit.unwrap_or(50).clamp(1, 200);
    let patron = q
        .q
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));

    let rows: Vec<PacienteRow> = sqlx::query_as::<_, PacienteRow>(&format!(
        r#"
        SELECT {PACIENTE_COLUMNS}
        FROM paciente
        WHERE ($1::text IS NULL
               OR nombre ILIKE $1 OR apellidos ILIKE $1 OR dni ILIKE $1)
          AND ($2::boolean OR activo = true)
        ORDER BY apellidos ASC, nombre ASC
        LIMIT $3
        "#
    ))
    .bind(patron)
    .bind(q.incluir_archivados.unwrap_or(false))
    .bind(limit)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(rows))
}

pub async fn obtener_paciente(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paciente_id): Path<Uuid>,
) -> Result<Json<PacienteRow>, ApiError> {
    ensure_gestion(&auth)?;

    let row: PacienteRow = sqlx::query_as::<_, PacienteRow>(&format!(
        r#"
        SELECT {PACIENTE_COLUMNS}
        FROM paciente
        WHERE paciente_id = $1
        "#
    ))
    .bind(paciente_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "paciente no encontrado".into()))?;

    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
pub struct ActualizarPacienteRequest {
    pub nombre: Option<String>,
    pub apellidos: Option<String>,
    pub dni: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub fecha_nacimiento: Option<chrono::NaiveDate>,
    pub notas: Option<String>,
}

pub async fn actualizar_paciente(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paciente_id): Path<Uuid>,
    Json(req): Json<ActualizarPacienteRequest>,
) -> Result<Json<PacienteRow>, ApiError> {
    ensure_gestion(&auth)?;

    let nombre = req
        .nombre
        .as_deref()
        .map(|s| validar_nombre("nombre", s))
        .transpose()?;
    let apellidos = req
        .apellidos
        .as_deref()
        .map(|s| validar_nombre("apellidos", s))
        .transpose()?;
    let telefono = req.telefono.as_deref().map(validar_telefono).transpose()?;

    let row: PacienteRow = sqlx::query_as::<_, PacienteRow>(&format!(
        r#"
        UPDATE paciente
        SET
          nombre     = COALESCE($2, nombre),
          apellidos  = COALESCE($3, apellidos),
          dni        = COALESCE($4, dni),
          telefono   = COALESCE($5, telefono),
          email      = COALESCE($6, email),
          fecha_nacimiento = COALESCE($7, fecha_nacimiento),
          notas      = COALESCE($8, notas),
          updated_at = now()
        WHERE paciente_id = $1
        RETURNING {PACIENTE_COLUMNS}
        "#
    ))
    .bind(paciente_id)
    .bind(nombre)
    .bind(apellidos)
    .bind(req.dni.as_deref().map(str::trim))
    .bind(telefono)
    .bind(req.email.as_deref().map(str::trim))
    .bind(req.fecha_nacimiento)
    .bind(req.notas)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "paciente no encontrado".into()))?;

    Ok(Json(row))
}

async fn set_activo(
    state: &AppState,
    paciente_id: Uuid,
    activo: bool,
) -> Result<Json<OkResponse>, ApiError> {
    let res = sqlx::query(
        r#"
        UPDATE paciente
        SET activo = $2, updated_at = now()
        WHERE paciente_id = $1
        "#,
    )
    .bind(paciente_id)
    .bind(activo)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if res.rows_affected() == 0 {
        return Err(ApiError::NotFound("NOT_FOUND", "paciente no encontrado".into()));
    }

    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}

pub async fn archivar_paciente(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paciente_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_gestion(&auth)?;
    set_activo(&state, paciente_id, false).await
}

pub async fn restaurar_paciente(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paciente_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_gestion(&auth)?;
    set_activo(&state, paciente_id, true).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validar_nombre() {
        assert_eq!(validar_nombre("nombre", "  Ana ").unwrap(), "Ana");
        assert!(validar_nombre("nombre", "").is_err());
        assert!(validar_nombre("nombre", "   ").is_err());
    }

    #[test]
    fn test_validar_telefono() {
        assert_eq!(validar_telefono("+51 987 654 321").unwrap(), "+51 987 654 321");
        assert!(validar_telefono("12345").is_err()); // too few digits
        assert!(validar_telefono("abc").is_err());
    }
}
