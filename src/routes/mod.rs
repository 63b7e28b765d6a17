use crate::models::AppState;
use axum::Router;

pub mod auth_routes;
pub mod cita_routes;
pub mod clinica_routes;
pub mod paciente_routes;
pub mod usuario_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/auth", auth_routes::router())
        .nest("/api/v1/usuarios", usuario_routes::router())
        .nest("/api/v1", cita_routes::router())
        .nest("/api/v1", paciente_routes::router())
        .nest("/api/v1", clinica_routes::router())
        .with_state(state)
}
