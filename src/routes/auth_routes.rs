// src/routes/auth_routes.rs

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{Duration, Utc};

use crate::{
    auth::{new_access_token, token_fingerprint, verify_password},
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{
        AppState, ClinicaProfile, LoginRequest, LoginResponse, LoginResponseData, MeResponse,
        MeResponseData, OkData, OkResponse, SesionRow, SessionInfo, UserProfile, UsuarioRow,
        rol_a_string,
    },
    routes::clinica_routes::load_nombre_clinica,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "username and password are required".into(),
        ));
    }

    let usuario: UsuarioRow = sqlx::query_as::<_, UsuarioRow>(
        r#"
        SELECT usuario_id, username, display_name, password_hash, rol, is_active
        FROM usuario
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::invalid_credentials)?;

    if !usuario.is_active {
        return Err(ApiError::Forbidden("FORBIDDEN", "Account is disabled".into()));
    }

    if !verify_password(&req.password, &usuario.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let nombre_clinica = load_nombre_clinica(&state).await?;

    let access_token = new_access_token();
    let huella = token_fingerprint(&access_token);
    let expires_at = Utc::now() + Duration::hours(state.session_ttl_hours);

    let sesion: SesionRow = sqlx::query_as::<_, SesionRow>(
        r#"
        INSERT INTO sesion (usuario_id, token_hash, device_name, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING sesion_id, expires_at
        "#,
    )
    .bind(usuario.usuario_id)
    .bind(&huella)
    .bind(req.device_name.as_deref())
    .bind(expires_at)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(LoginResponse {
        data: LoginResponseData {
            access_token,
            expires_at: sesion.expires_at,
            usuario: UserProfile {
                usuario_id: usuario.usuario_id,
                username: usuario.username,
                display_name: usuario.display_name,
                rol: rol_a_string(usuario.rol),
            },
            clinica: ClinicaProfile {
                nombre: nombre_clinica,
            },
        },
    }))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MeResponse>, ApiError> {
    let usuario: UsuarioRow = sqlx::query_as::<_, UsuarioRow>(
        r#"
        SELECT usuario_id, username, display_name, password_hash, rol, is_active
        FROM usuario
        WHERE usuario_id = $1
        "#,
    )
    .bind(auth.usuario_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::session_expired)?;

    if !usuario.is_active {
        return Err(ApiError::session_expired());
    }

    let nombre_clinica = load_nombre_clinica(&state).await?;

    let sesion: SesionRow = sqlx::query_as::<_, SesionRow>(
        r#"
        SELECT sesion_id, expires_at
        FROM sesion
        WHERE sesion_id = $1
          AND usuario_id = $2
          AND revoked_at IS NULL
          AND expires_at > now()
        "#,
    )
    .bind(auth.sesion_id)
    .bind(auth.usuario_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::session_expired)?;

    Ok(Json(MeResponse {
        data: MeResponseData {
            usuario: UserProfile {
                usuario_id: usuario.usuario_id,
                username: usuario.username,
                display_name: usuario.display_name,
                rol: rol_a_string(usuario.rol),
            },
            clinica: ClinicaProfile {
                nombre: nombre_clinica,
            },
            session: SessionInfo {
                sesion_id: sesion.sesion_id,
                expires_at: sesion.expires_at,
            },
        },
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<OkResponse>, ApiError> {
    sqlx::query(
        r#"
        UPDATE sesion
        SET revoked_at = now()
        WHERE sesion_id = $1
          AND revoked_at IS NULL
        "#,
    )
    .bind(auth.sesion_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}
