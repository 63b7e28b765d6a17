use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::AgendaError;

/// Appointment lifecycle state, stored as smallint.
///
/// `Reprogramada` is a transient label: a reschedule re-validates the new
/// interval and the row settles back into `Pendiente` semantics, so rows that
/// still carry the label behave as `Pendiente` for transition checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum EstadoCita {
    Pendiente = 0,
    Confirmada = 1,
    EnConsulta = 2,
    Atendida = 3,
    Cancelada = 4,
    Reprogramada = 5,
}

impl EstadoCita {
    pub fn etiqueta(&self) -> &'static str {
        match self {
            EstadoCita::Pendiente => "pendiente",
            EstadoCita::Confirmada => "confirmada",
            EstadoCita::EnConsulta => "en_consulta",
            EstadoCita::Atendida => "atendida",
            EstadoCita::Cancelada => "cancelada",
            EstadoCita::Reprogramada => "reprogramada",
        }
    }

    /// Terminal states admit no further transition or edit.
    pub fn es_terminal(&self) -> bool {
        matches!(self, EstadoCita::Atendida | EstadoCita::Cancelada)
    }

    /// Collapse the transient reschedule label for transition checks.
    pub fn normalizado(&self) -> EstadoCita {
        match self {
            EstadoCita::Reprogramada => EstadoCita::Pendiente,
            otro => *otro,
        }
    }

    /// Transition table. Legality is enforced here, not at the call site:
    /// the UI disables unavailable actions but the service re-validates.
    pub fn transiciones_validas(&self) -> &'static [EstadoCita] {
        match self.normalizado() {
            EstadoCita::Pendiente => &[EstadoCita::Confirmada, EstadoCita::Cancelada],
            EstadoCita::Confirmada => &[EstadoCita::EnConsulta, EstadoCita::Cancelada],
            EstadoCita::EnConsulta => &[EstadoCita::Atendida, EstadoCita::Cancelada],
            // terminal
            _ => &[],
        }
    }

    pub fn puede_pasar_a(&self, destino: EstadoCita) -> bool {
        self.transiciones_validas().contains(&destino)
    }
}

impl std::fmt::Display for EstadoCita {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.etiqueta())
    }
}

/// A scheduled patient-dentist encounter.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Cita {
    pub cita_id: Uuid,
    pub paciente_id: Uuid,
    pub dentista_id: Uuid,
    pub fecha: NaiveDate,
    pub hora_inicio: NaiveTime,
    pub hora_fin: Option<NaiveTime>,
    pub estado: EstadoCita,
    pub motivo: String,
    pub notas: Option<String>,
    pub motivo_cancelacion: Option<String>,
    pub motivo_reprogramacion: Option<String>,
    pub recordatorio_pendiente: bool,
    pub recordatorio_enviado_en: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking input, from the calendar slot selection or the explicit form.
#[derive(Debug, Clone, Deserialize)]
pub struct NuevaCita {
    pub paciente_id: Uuid,
    pub dentista_id: Uuid,
    pub fecha: NaiveDate,
    pub hora_inicio: NaiveTime,
    pub hora_fin: Option<NaiveTime>,
    pub motivo: String,
    pub notas: Option<String>,
}

impl NuevaCita {
    /// Field-level constraints for a booking. Schedule conflicts are checked
    /// separately against [`HorarioClinica`](crate::domain::horario::HorarioClinica).
    pub fn validar(&self, hoy: NaiveDate) -> Result<(), AgendaError> {
        if self.motivo.trim().is_empty() {
            return Err(AgendaError::validacion("el motivo de la cita es obligatorio"));
        }
        if self.fecha < hoy {
            return Err(AgendaError::validacion(
                "la fecha de la cita no puede ser anterior a hoy",
            ));
        }
        validar_orden_horas(self.hora_inicio, self.hora_fin)
    }
}

/// New date/time for a reschedule.
#[derive(Debug, Clone, Deserialize)]
pub struct Reprogramacion {
    pub fecha: NaiveDate,
    pub hora_inicio: NaiveTime,
    pub hora_fin: Option<NaiveTime>,
    pub motivo: Option<String>,
}

impl Reprogramacion {
    pub fn validar(&self, hoy: NaiveDate) -> Result<(), AgendaError> {
        if self.fecha < hoy {
            return Err(AgendaError::validacion(
                "la nueva fecha no puede ser anterior a hoy",
            ));
        }
        validar_orden_horas(self.hora_inicio, self.hora_fin)
    }
}

fn validar_orden_horas(inicio: NaiveTime, fin: Option<NaiveTime>) -> Result<(), AgendaError> {
    if let Some(fin) = fin {
        if fin <= inicio {
            return Err(AgendaError::validacion(
                "la hora de fin debe ser posterior a la hora de inicio",
            ));
        }
    }
    Ok(())
}
