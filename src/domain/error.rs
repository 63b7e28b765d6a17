use chrono::NaiveTime;
use thiserror::Error;

use crate::domain::cita::EstadoCita;

/// Domain-level failures. Every variant renders a message the UI can show
/// verbatim; none of these are retried.
#[derive(Debug, Error)]
pub enum AgendaError {
    #[error("{0}")]
    Validacion(String),

    /// The candidate interval overlaps a configured clinic block.
    #[error("el horario se superpone con un bloqueo de agenda: {etiqueta}")]
    Bloqueado { etiqueta: String },

    #[error("el horario está fuera del horario de atención ({apertura} - {cierre})")]
    FueraDeHorario {
        apertura: NaiveTime,
        cierre: NaiveTime,
    },

    #[error("la acción '{accion}' no está permitida para una cita en estado '{desde}'")]
    TransicionInvalida {
        desde: EstadoCita,
        accion: &'static str,
    },

    #[error("cita no encontrada")]
    NoEncontrada,

    /// Persistence collaborator failure, surfaced with the underlying message.
    #[error("error del almacén de datos: {0}")]
    Almacen(String),
}

impl AgendaError {
    pub fn validacion(msg: impl Into<String>) -> Self {
        AgendaError::Validacion(msg.into())
    }
}
