use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::domain::cita::{Cita, NuevaCita};
use crate::domain::error::AgendaError;
use crate::domain::store::{CitaCambios, CitaFiltro, CitaStore};

pub async fn connect_pg(database_url: &str) -> anyhow::Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    Ok(pool)
}

const CITA_COLUMNS: &str = r#"
    cita_id, paciente_id, dentista_id, fecha, hora_inicio, hora_fin,
    estado, motivo, notas, motivo_cancelacion, motivo_reprogramacion,
    recordatorio_pendiente, recordatorio_enviado_en, created_at, updated_at
"#;

/// Postgres-backed appointment store.
#[derive(Clone)]
pub struct PgCitaStore {
    pool: sqlx::PgPool,
}

impl PgCitaStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        PgCitaStore { pool }
    }
}

fn db_err(e: sqlx::Error) -> AgendaError {
    AgendaError::Almacen(format!("db error: {e}"))
}

#[async_trait]
impl CitaStore for PgCitaStore {
    async fn create(&self, datos: &NuevaCita) -> Result<Cita, AgendaError> {
        sqlx::query_as::<_, Cita>(&format!(
            r#"
            INSERT INTO cita (
              paciente_id, dentista_id, fecha, hora_inicio, hora_fin,
              estado, motivo, notas, recordatorio_pendiente
            )
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7, true)
            RETURNING {CITA_COLUMNS}
            "#
        ))
        .bind(datos.paciente_id)
        .bind(datos.dentista_id)
        .bind(datos.fecha)
        .bind(datos.hora_inicio)
        .bind(datos.hora_fin)
        .bind(datos.motivo.trim())
        .bind(datos.notas.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Cita>, AgendaError> {
        sqlx::query_as::<_, Cita>(&format!(
            r#"
            SELECT {CITA_COLUMNS}
            FROM cita
            WHERE cita_id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn update(&self, id: Uuid, cambios: CitaCambios) -> Result<Cita, AgendaError> {
        // COALESCE covers the plain overwrites; hora_fin needs the flag/value
        // pair because a reschedule may clear it, and the reminder latch uses
        // COALESCE on the timestamp so a second mark keeps the first stamp.
        let row = sqlx::query_as::<_, Cita>(&format!(
            r#"
            UPDATE cita
            SET
              estado       = COALESCE($2, estado),
              fecha        = COALESCE($3, fecha),
              hora_inicio  = COALESCE($4, hora_inicio),
              hora_fin     = CASE WHEN $5 THEN $6 ELSE hora_fin END,
              notas        = COALESCE($7, notas),
              motivo_cancelacion    = COALESCE($8, motivo_cancelacion),
              motivo_reprogramacion = COALESCE($9, motivo_reprogramacion),
              recordatorio_pendiente = CASE WHEN $10 THEN false ELSE recordatorio_pendiente END,
              recordatorio_enviado_en = CASE WHEN $10 THEN COALESCE(recordatorio_enviado_en, now())
                                             ELSE recordatorio_enviado_en END,
              updated_at = now()
            WHERE cita_id = $1
            RETURNING {CITA_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(cambios.estado)
        .bind(cambios.fecha)
        .bind(cambios.hora_inicio)
        .bind(cambios.hora_fin.is_some())
        .bind(cambios.hora_fin.flatten())
        .bind(cambios.notas)
        .bind(cambios.motivo_cancelacion)
        .bind(cambios.motivo_reprogramacion)
        .bind(cambios.marcar_recordatorio_enviado)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.ok_or(AgendaError::NoEncontrada)
    }

    async fn list(&self, filtro: &CitaFiltro) -> Result<Vec<Cita>, AgendaError> {
        sqlx::query_as::<_, Cita>(&format!(
            r#"
            SELECT {CITA_COLUMNS}
            FROM cita
            WHERE ($1::date IS NULL OR fecha >= $1)
              AND ($2::date IS NULL OR fecha <= $2)
              AND ($3::smallint IS NULL OR estado = $3)
              AND ($4::uuid IS NULL OR dentista_id = $4)
              AND ($5::boolean IS NULL OR recordatorio_pendiente = $5)
            ORDER BY fecha ASC, hora_inicio ASC
            "#
        ))
        .bind(filtro.fecha_inicio)
        .bind(filtro.fecha_fin)
        .bind(filtro.estado)
        .bind(filtro.dentista_id)
        .bind(filtro.recordatorio_pendiente)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}
