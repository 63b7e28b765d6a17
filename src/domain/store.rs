use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::cita::{Cita, EstadoCita, NuevaCita};
use crate::domain::error::AgendaError;

/// List filters recognized by the persistence collaborator.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CitaFiltro {
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    pub estado: Option<EstadoCita>,
    pub dentista_id: Option<Uuid>,
    pub recordatorio_pendiente: Option<bool>,
}

/// Partial update applied by the lifecycle service. Only the fields the
/// state machine mutates are expressible here; everything else is immutable
/// once booked.
#[derive(Debug, Default, Clone)]
pub struct CitaCambios {
    pub estado: Option<EstadoCita>,
    pub fecha: Option<NaiveDate>,
    pub hora_inicio: Option<NaiveTime>,
    /// `Some(None)` clears the end time (open-ended reschedule).
    pub hora_fin: Option<Option<NaiveTime>>,
    pub notas: Option<String>,
    pub motivo_cancelacion: Option<String>,
    pub motivo_reprogramacion: Option<String>,
    /// One-way latch: drops `recordatorio_pendiente` and stamps the sent
    /// timestamp if not already set. Never resets.
    pub marcar_recordatorio_enviado: bool,
}

/// Persistence collaborator for appointments. The record of truth lives
/// behind this trait; the lifecycle service only holds validation and
/// transition rules.
#[async_trait]
pub trait CitaStore: Send + Sync {
    async fn create(&self, datos: &NuevaCita) -> Result<Cita, AgendaError>;
    async fn get(&self, id: Uuid) -> Result<Option<Cita>, AgendaError>;
    async fn update(&self, id: Uuid, cambios: CitaCambios) -> Result<Cita, AgendaError>;
    async fn list(&self, filtro: &CitaFiltro) -> Result<Vec<Cita>, AgendaError>;
}

#[cfg(test)]
pub mod mem {
    //! In-memory store used by the lifecycle tests.

    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    pub struct MemCitaStore {
        citas: Mutex<BTreeMap<Uuid, Cita>>,
    }

    #[async_trait]
    impl CitaStore for MemCitaStore {
        async fn create(&self, datos: &NuevaCita) -> Result<Cita, AgendaError> {
            let ahora = Utc::now();
            let cita = Cita {
                cita_id: Uuid::new_v4(),
                paciente_id: datos.paciente_id,
                dentista_id: datos.dentista_id,
                fecha: datos.fecha,
                hora_inicio: datos.hora_inicio,
                hora_fin: datos.hora_fin,
                estado: EstadoCita::Pendiente,
                motivo: datos.motivo.trim().to_string(),
                notas: datos.notas.clone(),
                motivo_cancelacion: None,
                motivo_reprogramacion: None,
                recordatorio_pendiente: true,
                recordatorio_enviado_en: None,
                created_at: ahora,
                updated_at: ahora,
            };
            self.citas
                .lock()
                .unwrap()
                .insert(cita.cita_id, cita.clone());
            Ok(cita)
        }

        async fn get(&self, id: Uuid) -> Result<Option<Cita>, AgendaError> {
            Ok(self.citas.lock().unwrap().get(&id).cloned())
        }

        async fn update(&self, id: Uuid, cambios: CitaCambios) -> Result<Cita, AgendaError> {
            let mut citas = self.citas.lock().unwrap();
            let cita = citas.get_mut(&id).ok_or(AgendaError::NoEncontrada)?;

            if let Some(estado) = cambios.estado {
                cita.estado = estado;
            }
            if let Some(fecha) = cambios.fecha {
                cita.fecha = fecha;
            }
            if let Some(hora_inicio) = cambios.hora_inicio {
                cita.hora_inicio = hora_inicio;
            }
            if let Some(hora_fin) = cambios.hora_fin {
                cita.hora_fin = hora_fin;
            }
            if let Some(notas) = cambios.notas {
                cita.notas = Some(notas);
            }
            if let Some(motivo) = cambios.motivo_cancelacion {
                cita.motivo_cancelacion = Some(motivo);
            }
            if let Some(motivo) = cambios.motivo_reprogramacion {
                cita.motivo_reprogramacion = Some(motivo);
            }
            if cambios.marcar_recordatorio_enviado && cita.recordatorio_pendiente {
                cita.recordatorio_pendiente = false;
                cita.recordatorio_enviado_en = Some(Utc::now());
            }
            cita.updated_at = Utc::now();
            Ok(cita.clone())
        }

        async fn list(&self, filtro: &CitaFiltro) -> Result<Vec<Cita>, AgendaError> {
            let citas = self.citas.lock().unwrap();
            Ok(citas
                .values()
                .filter(|c| filtro.fecha_inicio.is_none_or(|f| c.fecha >= f))
                .filter(|c| filtro.fecha_fin.is_none_or(|f| c.fecha <= f))
                .filter(|c| filtro.estado.is_none_or(|e| c.estado == e))
                .filter(|c| filtro.dentista_id.is_none_or(|d| c.dentista_id == d))
                .filter(|c| {
                    filtro
                        .recordatorio_pendiente
                        .is_none_or(|r| c.recordatorio_pendiente == r)
                })
                .cloned()
                .collect())
        }
    }
}
