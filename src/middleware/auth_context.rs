use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use uuid::Uuid;

use crate::auth::token_fingerprint;
use crate::error::ApiError;
use crate::models::AppState;

/// Authenticated caller, resolved from the bearer token on every request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub usuario_id: Uuid,
    pub rol: i16,
    pub sesion_id: Uuid,
}

#[derive(Debug, sqlx::FromRow)]
struct SesionLookupRow {
    sesion_id: Uuid,
    usuario_id: Uuid,
    rol: i16,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
                TypedHeader::from_request_parts(parts, state)
                    .await
                    .map_err(|_| ApiError::session_expired())?;

            let huella = token_fingerprint(authz.token());

            // Session must be unexpired, unrevoked, and belong to an active user.
            let row: SesionLookupRow = sqlx::query_as::<_, SesionLookupRow>(
                r#"
                SELECT s.sesion_id, s.usuario_id, u.rol
                FROM sesion s
                JOIN usuario u ON u.usuario_id = s.usuario_id
                WHERE s.token_hash = $1
                  AND s.revoked_at IS NULL
                  AND s.expires_at > now()
                  AND u.is_active = true
                "#,
            )
            .bind(&huella)
            .fetch_optional(&state.db)
            .await
            .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
            .ok_or_else(ApiError::session_expired)?;

            // Touch last_seen_at (best-effort)
            let _ = sqlx::query(
                r#"
                UPDATE sesion
                SET last_seen_at = now()
                WHERE sesion_id = $1
                "#,
            )
            .bind(row.sesion_id)
            .execute(&state.db)
            .await;

            Ok(AuthContext {
                usuario_id: row.usuario_id,
                rol: row.rol,
                sesion_id: row.sesion_id,
            })
        }
    }
}
