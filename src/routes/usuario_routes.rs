// src/routes/usuario_routes.rs

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::hash_password,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, OkData, OkResponse},
};

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.rol == 1 {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin can manage users".into(),
        ))
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UsuarioPublicRow {
    pub usuario_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub rol: i16,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CrearUsuarioRequest {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub rol: i16, // 1..3
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(listar_usuarios).post(crear_usuario))
        .route("/{usuario_id}/desactivar", post(desactivar_usuario))
        .route("/{usuario_id}/activar", post(activar_usuario))
}

fn validar_rol(rol: i16) -> Result<(), ApiError> {
    if !(1..=3).contains(&rol) {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "rol must be one of 1..3".into(),
        ));
    }
    Ok(())
}

fn validar_username(username: &str) -> Result<(), ApiError> {
    let u = username.trim();
    if u.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "username is required".into(),
        ));
    }
    if u.len() < 3 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "username must be at least 3 characters".into(),
        ));
    }
    Ok(())
}

fn validar_password(pw: &str) -> Result<(), ApiError> {
    if pw.trim().len() < 8 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

pub async fn listar_usuarios(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<UsuarioPublicRow>>, ApiError> {
    ensure_admin(&auth)?;

    let usuarios: Vec<UsuarioPublicRow> = sqlx::query_as::<_, UsuarioPublicRow>(
        r#"
        SELECT usuario_id, username, display_name, rol, is_active, created_at
        FROM usuario
        ORDER BY created_at DESC
        LIMIT 200
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(usuarios))
}

pub async fn crear_usuario(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CrearUsuarioRequest>,
) -> Result<Json<UsuarioPublicRow>, ApiError> {
    ensure_admin(&auth)?;

    validar_username(&req.username)?;
    validar_password(&req.password)?;
    validar_rol(req.rol)?;

    let display_name = req.display_name.trim();
    if display_name.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "display_name is required".into(),
        ));
    }

    let pw_hash = hash_password(req.password.trim())
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let usuario: UsuarioPublicRow = sqlx::query_as::<_, UsuarioPublicRow>(
        r#"
        INSERT INTO usuario (username, display_name, password_hash, rol, is_active)
        VALUES ($1, $2, $3, $4, true)
        RETURNING usuario_id, username, display_name, rol, is_active, created_at
        "#,
    )
    .bind(req.username.trim())
    .bind(display_name)
    .bind(&pw_hash)
    .bind(req.rol)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(usuario))
}

async fn set_active(
    state: &AppState,
    usuario_id: Uuid,
    is_active: bool,
) -> Result<Json<OkResponse>, ApiError> {
    let res = sqlx::query(
        r#"
        UPDATE usuario
        SET is_active = $2
        WHERE usuario_id = $1
        "#,
    )
    .bind(usuario_id)
    .bind(is_active)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if res.rows_affected() == 0 {
        return Err(ApiError::NotFound("NOT_FOUND", "usuario no encontrado".into()));
    }

    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}

pub async fn desactivar_usuario(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(usuario_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_admin(&auth)?;
    set_active(&state, usuario_id, false).await
}

pub async fn activar_usuario(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(usuario_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_admin(&auth)?;
    set_active(&state, usuario_id, true).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validar_rol_bounds() {
        assert!(validar_rol(1).is_ok());
        assert!(validar_rol(3).is_ok());
        assert!(validar_rol(0).is_err());
        assert!(validar_rol(4).is_err());
    }

    #[test]
    fn test_validar_username() {
        assert!(validar_username("ana").is_ok());
        assert!(validar_username("al").is_err()); // too short
        assert!(validar_username("   ").is_err());
    }

    #[test]
    fn test_validar_password() {
        assert!(validar_password("secreta123").is_ok());
        assert!(validar_password("corta").is_err());
    }
}
