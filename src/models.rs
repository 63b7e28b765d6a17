use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::PgCitaStore;
use crate::domain::agenda::Agenda;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub session_ttl_hours: i64,
    pub agenda: Agenda<PgCitaStore>,
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub device_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub data: LoginResponseData,
}

#[derive(Debug, Serialize)]
pub struct LoginResponseData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub usuario: UserProfile,
    pub clinica: ClinicaProfile,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub data: MeResponseData,
}

#[derive(Debug, Serialize)]
pub struct MeResponseData {
    pub usuario: UserProfile,
    pub clinica: ClinicaProfile,
    pub session: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub data: OkData,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub usuario_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub rol: String,
}

#[derive(Debug, Serialize)]
pub struct ClinicaProfile {
    pub nombre: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub sesion_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, sqlx::FromRow)]
pub struct UsuarioRow {
    pub usuario_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub rol: i16,
    pub is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SesionRow {
    pub sesion_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   Helpers
--------------------------*/

/// Single role stored as smallint: 1 admin, 2 dentista, 3 recepcionista.
pub fn rol_a_string(rol: i16) -> String {
    match rol {
        1 => "admin",
        2 => "dentista",
        3 => "recepcionista",
        _ => "desconocido",
    }
    .to_string()
}
