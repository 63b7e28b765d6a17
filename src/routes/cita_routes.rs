// src/routes/cita_routes.rs

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::cita::{Cita, NuevaCita, Reprogramacion},
    domain::store::CitaFiltro,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::AppState,
    notify,
    routes::clinica_routes::load_nombre_clinica,
};

/*
Roles (usuario.rol):
1 admin
2 dentista
3 recepcionista
*/

fn is_admin(auth: &AuthContext) -> bool {
    auth.rol == 1
}
fn is_dentista(auth: &AuthContext) -> bool {
    auth.rol == 2
}
fn is_recepcionista(auth: &AuthContext) -> bool {
    auth.rol == 3
}

fn puede_gestionar_citas(auth: &AuthContext) -> bool {
    is_admin(auth) || is_recepcionista(auth)
}

fn ensure_gestion(auth: &AuthContext) -> Result<(), ApiError> {
    if puede_gestionar_citas(auth) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin/recepcionista can manage appointments".into(),
        ))
    }
}

fn ensure_lectura(auth: &AuthContext) -> Result<(), ApiError> {
    if puede_gestionar_citas(auth) || is_dentista(auth) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "You do not have permission to view the agenda".into(),
        ))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/citas", post(crear_cita).get(listar_citas))
        .route("/citas/dia", get(agenda_del_dia))
        .route("/citas/recordatorios", get(recordatorios_pendientes))
        .route("/citas/recordatorios/enviar_todos", post(enviar_todos_los_recordatorios))
        .route("/citas/{cita_id}", get(obtener_cita))
        .route("/citas/{cita_id}/confirmar", post(confirmar_cita))
        .route("/citas/{cita_id}/iniciar", post(iniciar_consulta))
        .route("/citas/{cita_id}/finalizar", post(finalizar_atencion))
        .route("/citas/{cita_id}/cancelar", post(cancelar_cita))
        .route("/citas/{cita_id}/reprogramar", post(reprogramar_cita))
        .route("/citas/{cita_id}/recordatorio", get(recordatorio_de_cita))
        .route("/citas/{cita_id}/recordatorio/enviado", post(marcar_recordatorio))
}

/* ============================================================
   Response DTOs
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct RecordatorioDto {
    pub cita_id: Uuid,
    pub paciente: String,
    pub mensaje: String,
    pub enlace_whatsapp: Option<String>,
}

/* ============================================================
   POST /citas (create) + queries
   ============================================================ */

pub async fn crear_cita(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(datos): Json<NuevaCita>,
) -> Result<Json<ApiOk<Cita>>, ApiError> {
    ensure_gestion(&auth)?;
    let cita = state.agenda.crear(datos).await?;
    Ok(Json(ApiOk { data: cita }))
}

pub async fn listar_citas(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(filtro): Query<CitaFiltro>,
) -> Result<Json<ApiOk<Vec<Cita>>>, ApiError> {
    ensure_lectura(&auth)?;
    let citas = state.agenda.listar(&filtro).await?;
    Ok(Json(ApiOk { data: citas }))
}

#[derive(Debug, Deserialize)]
pub struct DiaQuery {
    pub fecha: NaiveDate,
    pub dentista_id: Option<Uuid>,
}

pub async fn agenda_del_dia(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<DiaQuery>,
) -> Result<Json<ApiOk<Vec<Cita>>>, ApiError> {
    ensure_lectura(&auth)?;
    let filtro = CitaFiltro {
        fecha_inicio: Some(q.fecha),
        fecha_fin: Some(q.fecha),
        dentista_id: q.dentista_id,
        ..Default::default()
    };
    let citas = state.agenda.listar(&filtro).await?;
    Ok(Json(ApiOk { data: citas }))
}

pub async fn obtener_cita(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(cita_id): Path<Uuid>,
) -> Result<Json<ApiOk<Cita>>, ApiError> {
    ensure_lectura(&auth)?;
    let cita = state.agenda.obtener(cita_id).await?;
    Ok(Json(ApiOk { data: cita }))
}

/* ============================================================
   Lifecycle transitions
   ============================================================ */

pub async fn confirmar_cita(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(cita_id): Path<Uuid>,
) -> Result<Json<ApiOk<Cita>>, ApiError> {
    ensure_gestion(&auth)?;
    let cita = state.agenda.confirmar(cita_id).await?;
    Ok(Json(ApiOk { data: cita }))
}

pub async fn iniciar_consulta(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(cita_id): Path<Uuid>,
) -> Result<Json<ApiOk<Cita>>, ApiError> {
    // the dentist seats the patient; reception can do it on their behalf
    ensure_lectura(&auth)?;
    let cita = state.agenda.iniciar_consulta(cita_id).await?;
    Ok(Json(ApiOk { data: cita }))
}

pub async fn finalizar_atencion(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(cita_id): Path<Uuid>,
) -> Result<Json<ApiOk<Cita>>, ApiError> {
    ensure_lectura(&auth)?;
    let cita = state.agenda.finalizar_atencion(cita_id).await?;
    Ok(Json(ApiOk { data: cita }))
}

#[derive(Debug, Deserialize)]
pub struct CancelarRequest {
    pub motivo: String,
}

pub async fn cancelar_cita(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(cita_id): Path<Uuid>,
    Json(req): Json<CancelarRequest>,
) -> Result<Json<ApiOk<Cita>>, ApiError> {
    ensure_gestion(&auth)?;
    let cita = state.agenda.cancelar(cita_id, &req.motivo).await?;
    Ok(Json(ApiOk { data: cita }))
}

pub async fn reprogramar_cita(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(cita_id): Path<Uuid>,
    Json(req): Json<Reprogramacion>,
) -> Result<Json<ApiOk<Cita>>, ApiError> {
    ensure_gestion(&auth)?;
    let cita = state.agenda.reprogramar(cita_id, req).await?;
    Ok(Json(ApiOk { data: cita }))
}

/* ============================================================
   Reminders
   ============================================================ */

#[derive(Debug, sqlx::FromRow)]
struct PacienteContactoRow {
    nombre: String,
    apellidos: String,
    telefono: Option<String>,
}

async fn load_contacto(
    state: &AppState,
    paciente_id: Uuid,
) -> Result<PacienteContactoRow, ApiError> {
    sqlx::query_as::<_, PacienteContactoRow>(
        r#"
        SELECT nombre, apellidos, telefono
        FROM paciente
        WHERE paciente_id = $1
        "#,
    )
    .bind(paciente_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "paciente no encontrado".into()))
}

fn armar_recordatorio(clinica: &str, contacto: &PacienteContactoRow, cita: &Cita) -> RecordatorioDto {
    let paciente = format!("{} {}", contacto.nombre, contacto.apellidos);
    let mensaje = notify::mensaje_recordatorio(clinica, &contacto.nombre, cita);
    let enlace_whatsapp = contacto
        .telefono
        .as_deref()
        .map(|tel| notify::enlace_whatsapp(tel, &mensaje));
    RecordatorioDto {
        cita_id: cita.cita_id,
        paciente,
        mensaje,
        enlace_whatsapp,
    }
}

/// Reminder payload for one appointment: message text plus deep link.
/// Does not drop the latch; the UI confirms the send separately.
pub async fn recordatorio_de_cita(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(cita_id): Path<Uuid>,
) -> Result<Json<ApiOk<RecordatorioDto>>, ApiError> {
    ensure_lectura(&auth)?;
    let cita = state.agenda.obtener(cita_id).await?;
    let contacto = load_contacto(&state, cita.paciente_id).await?;
    let clinica = load_nombre_clinica(&state).await?;
    Ok(Json(ApiOk {
        data: armar_recordatorio(&clinica, &contacto, &cita),
    }))
}

pub async fn marcar_recordatorio(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(cita_id): Path<Uuid>,
) -> Result<Json<ApiOk<Cita>>, ApiError> {
    ensure_gestion(&auth)?;
    let cita = state.agenda.marcar_recordatorio_enviado(cita_id).await?;
    Ok(Json(ApiOk { data: cita }))
}

#[derive(Debug, Deserialize)]
pub struct RecordatoriosQuery {
    pub fecha: Option<NaiveDate>,
}

pub async fn recordatorios_pendientes(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<RecordatoriosQuery>,
) -> Result<Json<ApiOk<Vec<RecordatorioDto>>>, ApiError> {
    ensure_lectura(&auth)?;
    let filtro = CitaFiltro {
        fecha_inicio: q.fecha,
        fecha_fin: q.fecha,
        recordatorio_pendiente: Some(true),
        ..Default::default()
    };
    let citas = state.agenda.listar(&filtro).await?;
    let clinica = load_nombre_clinica(&state).await?;

    let mut data = Vec::with_capacity(citas.len());
    for cita in &citas {
        let contacto = load_contacto(&state, cita.paciente_id).await?;
        data.push(armar_recordatorio(&clinica, &contacto, cita));
    }
    Ok(Json(ApiOk { data }))
}

#[derive(Debug, Serialize)]
pub struct EnvioMasivoData {
    pub marcadas: usize,
    pub recordatorios: Vec<RecordatorioDto>,
}

/// Bulk "send all pending": builds every reminder payload, then drops the
/// latch on each one.
pub async fn enviar_todos_los_recordatorios(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<RecordatoriosQuery>,
) -> Result<Json<ApiOk<EnvioMasivoData>>, ApiError> {
    ensure_gestion(&auth)?;
    let clinica = load_nombre_clinica(&state).await?;

    let marcadas = state.agenda.marcar_recordatorios_enviados(q.fecha).await?;
    let mut recordatorios = Vec::with_capacity(marcadas.len());
    for cita in &marcadas {
        let contacto = load_contacto(&state, cita.paciente_id).await?;
        recordatorios.push(armar_recordatorio(&clinica, &contacto, cita));
    }

    Ok(Json(ApiOk {
        data: EnvioMasivoData {
            marcadas: recordatorios.len(),
            recordatorios,
        },
    }))
}
