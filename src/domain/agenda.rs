use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::cita::{Cita, EstadoCita, NuevaCita, Reprogramacion};
use crate::domain::error::AgendaError;
use crate::domain::horario::HorarioClinica;
use crate::domain::store::{CitaCambios, CitaFiltro, CitaStore};

/// Appointment lifecycle service.
///
/// Owns the transition rules and the temporal-conflict check; the persisted
/// record of truth lives behind the store. Every operation re-reads the
/// current state and re-validates instead of trusting the caller, since the
/// UI disabling an action is not a correctness guarantee.
#[derive(Clone)]
pub struct Agenda<S> {
    store: S,
    horario: HorarioClinica,
}

impl<S: CitaStore> Agenda<S> {
    pub fn new(store: S, horario: HorarioClinica) -> Self {
        Agenda { store, horario }
    }

    pub fn horario(&self) -> &HorarioClinica {
        &self.horario
    }

    /// Book a new appointment in `pendiente`.
    pub async fn crear(&self, datos: NuevaCita) -> Result<Cita, AgendaError> {
        self.crear_desde(datos, Utc::now().date_naive()).await
    }

    pub(crate) async fn crear_desde(
        &self,
        datos: NuevaCita,
        hoy: NaiveDate,
    ) -> Result<Cita, AgendaError> {
        datos.validar(hoy)?;
        self.horario.validar_intervalo(datos.hora_inicio, datos.hora_fin)?;

        let cita = self.store.create(&datos).await?;
        info!(cita_id = %cita.cita_id, fecha = %cita.fecha, "cita creada");
        Ok(cita)
    }

    pub async fn obtener(&self, id: Uuid) -> Result<Cita, AgendaError> {
        self.store.get(id).await?.ok_or(AgendaError::NoEncontrada)
    }

    pub async fn listar(&self, filtro: &CitaFiltro) -> Result<Vec<Cita>, AgendaError> {
        self.store.list(filtro).await
    }

    /// `pendiente → confirmada`.
    pub async fn confirmar(&self, id: Uuid) -> Result<Cita, AgendaError> {
        self.transicionar(id, "confirmar", EstadoCita::Confirmada).await
    }

    /// `confirmada → en_consulta`.
    pub async fn iniciar_consulta(&self, id: Uuid) -> Result<Cita, AgendaError> {
        self.transicionar(id, "iniciar_consulta", EstadoCita::EnConsulta).await
    }

    /// `en_consulta → atendida` (terminal).
    pub async fn finalizar_atencion(&self, id: Uuid) -> Result<Cita, AgendaError> {
        self.transicionar(id, "finalizar_atencion", EstadoCita::Atendida).await
    }

    /// Any non-terminal state → `cancelada` (terminal). The reason is
    /// mandatory and persisted verbatim; the row is never deleted.
    pub async fn cancelar(&self, id: Uuid, motivo: &str) -> Result<Cita, AgendaError> {
        let motivo = motivo.trim();
        if motivo.is_empty() {
            return Err(AgendaError::validacion(
                "el motivo de cancelación es obligatorio",
            ));
        }

        let cita = self.obtener(id).await?;
        if !cita.estado.puede_pasar_a(EstadoCita::Cancelada) {
            warn!(cita_id = %id, desde = %cita.estado, "cancelación rechazada");
            return Err(AgendaError::TransicionInvalida {
                desde: cita.estado,
                accion: "cancelar",
            });
        }

        let actualizada = self
            .store
            .update(
                id,
                CitaCambios {
                    estado: Some(EstadoCita::Cancelada),
                    motivo_cancelacion: Some(motivo.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        info!(cita_id = %id, "cita cancelada");
        Ok(actualizada)
    }

    /// Move a non-terminal appointment to a new date/time. The new interval
    /// is fully re-validated before committing; on failure the original
    /// date/time stay intact. On success the state settles back to
    /// `pendiente` (the `reprogramada` label is transient).
    pub async fn reprogramar(&self, id: Uuid, r: Reprogramacion) -> Result<Cita, AgendaError> {
        self.reprogramar_desde(id, r, Utc::now().date_naive()).await
    }

    pub(crate) async fn reprogramar_desde(
        &self,
        id: Uuid,
        r: Reprogramacion,
        hoy: NaiveDate,
    ) -> Result<Cita, AgendaError> {
        let cita = self.obtener(id).await?;
        if cita.estado.es_terminal() {
            warn!(cita_id = %id, desde = %cita.estado, "reprogramación rechazada");
            return Err(AgendaError::TransicionInvalida {
                desde: cita.estado,
                accion: "reprogramar",
            });
        }

        r.validar(hoy)?;
        self.horario.validar_intervalo(r.hora_inicio, r.hora_fin)?;

        let actualizada = self
            .store
            .update(
                id,
                CitaCambios {
                    estado: Some(EstadoCita::Pendiente),
                    fecha: Some(r.fecha),
                    hora_inicio: Some(r.hora_inicio),
                    hora_fin: Some(r.hora_fin),
                    motivo_reprogramacion: r.motivo.map(|m| m.trim().to_string()),
                    ..Default::default()
                },
            )
            .await?;
        info!(cita_id = %id, fecha = %actualizada.fecha, "cita reprogramada");
        Ok(actualizada)
    }

    /// Drop the pending-reminder latch for one appointment. Idempotent: a
    /// reminder already marked as sent stays sent, keeping its original
    /// timestamp.
    pub async fn marcar_recordatorio_enviado(&self, id: Uuid) -> Result<Cita, AgendaError> {
        // ensure the id exists so the caller gets NOT_FOUND, not a silent ok
        self.obtener(id).await?;
        self.store
            .update(
                id,
                CitaCambios {
                    marcar_recordatorio_enviado: true,
                    ..Default::default()
                },
            )
            .await
    }

    /// Bulk variant: mark every appointment with a pending reminder on the
    /// given date (all dates when `None`). Individual failures are logged and
    /// skipped; this is a best-effort side channel, not a primary transition.
    pub async fn marcar_recordatorios_enviados(
        &self,
        fecha: Option<NaiveDate>,
    ) -> Result<Vec<Cita>, AgendaError> {
        let filtro = CitaFiltro {
            fecha_inicio: fecha,
            fecha_fin: fecha,
            recordatorio_pendiente: Some(true),
            ..Default::default()
        };
        let pendientes = self.store.list(&filtro).await?;
        debug!(total = pendientes.len(), "marcando recordatorios como enviados");

        let mut marcadas = Vec::with_capacity(pendientes.len());
        for cita in pendientes {
            match self
                .store
                .update(
                    cita.cita_id,
                    CitaCambios {
                        marcar_recordatorio_enviado: true,
                        ..Default::default()
                    },
                )
                .await
            {
                Ok(c) => marcadas.push(c),
                Err(e) => {
                    warn!(cita_id = %cita.cita_id, error = %e, "no se pudo marcar el recordatorio")
                }
            }
        }
        Ok(marcadas)
    }

    /// Single entry point for the forward-path transitions. Looks up the
    /// required source state from the transition table on `EstadoCita`.
    async fn transicionar(
        &self,
        id: Uuid,
        accion: &'static str,
        destino: EstadoCita,
    ) -> Result<Cita, AgendaError> {
        let cita = self.obtener(id).await?;
        debug!(cita_id = %id, desde = %cita.estado, hasta = %destino, "validando transición");

        if !cita.estado.puede_pasar_a(destino) {
            warn!(cita_id = %id, desde = %cita.estado, hasta = %destino, "transición rechazada");
            return Err(AgendaError::TransicionInvalida {
                desde: cita.estado,
                accion,
            });
        }

        let actualizada = self
            .store
            .update(
                id,
                CitaCambios {
                    estado: Some(destino),
                    ..Default::default()
                },
            )
            .await?;
        info!(cita_id = %id, estado = %destino, "transición aplicada");
        Ok(actualizada)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

    use super::*;
    use crate::domain::horario::Bloqueo;
    use crate::domain::store::mem::MemCitaStore;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn agenda_sin_bloqueos() -> Agenda<MemCitaStore> {
        Agenda::new(MemCitaStore::default(), HorarioClinica::default())
    }

    fn agenda_con_almuerzo() -> Agenda<MemCitaStore> {
        let horario = HorarioClinica {
            bloqueos: vec![Bloqueo {
                inicio: t(13, 0),
                fin: t(15, 0),
                etiqueta: "Almuerzo".to_string(),
            }],
            ..HorarioClinica::default()
        };
        Agenda::new(MemCitaStore::default(), horario)
    }

    fn datos(fecha: NaiveDate, inicio: NaiveTime, fin: Option<NaiveTime>) -> NuevaCita {
        NuevaCita {
            paciente_id: Uuid::new_v4(),
            dentista_id: Uuid::new_v4(),
            fecha,
            hora_inicio: inicio,
            hora_fin: fin,
            motivo: "Limpieza".to_string(),
            notas: None,
        }
    }

    const HOY: (i32, u32, u32) = (2025, 6, 1);

    async fn cita_pendiente(agenda: &Agenda<MemCitaStore>) -> Cita {
        agenda
            .crear_desde(
                datos(d(2025, 6, 10), t(9, 0), Some(t(9, 30))),
                d(HOY.0, HOY.1, HOY.2),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn ciclo_completo_hasta_atendida() {
        let agenda = agenda_sin_bloqueos();
        let cita = cita_pendiente(&agenda).await;
        assert_eq!(cita.estado, EstadoCita::Pendiente);
        assert!(cita.recordatorio_pendiente);

        let cita = agenda.confirmar(cita.cita_id).await.unwrap();
        assert_eq!(cita.estado, EstadoCita::Confirmada);

        let cita = agenda.iniciar_consulta(cita.cita_id).await.unwrap();
        assert_eq!(cita.estado, EstadoCita::EnConsulta);

        let cita = agenda.finalizar_atencion(cita.cita_id).await.unwrap();
        assert_eq!(cita.estado, EstadoCita::Atendida);

        // terminal: the follow-up cancel must be rejected
        let err = agenda.cancelar(cita.cita_id, "ya no puedo").await.unwrap_err();
        assert!(matches!(err, AgendaError::TransicionInvalida { .. }));
        let relectura = agenda.obtener(cita.cita_id).await.unwrap();
        assert_eq!(relectura.estado, EstadoCita::Atendida);
    }

    #[tokio::test]
    async fn transiciones_fuera_de_orden_son_rechazadas() {
        let agenda = agenda_sin_bloqueos();
        let cita = cita_pendiente(&agenda).await;

        // pendiente no puede pasar directo a en_consulta ni a atendida
        assert!(matches!(
            agenda.iniciar_consulta(cita.cita_id).await,
            Err(AgendaError::TransicionInvalida { .. })
        ));
        assert!(matches!(
            agenda.finalizar_atencion(cita.cita_id).await,
            Err(AgendaError::TransicionInvalida { .. })
        ));

        // y la cita queda intacta
        let relectura = agenda.obtener(cita.cita_id).await.unwrap();
        assert_eq!(relectura.estado, EstadoCita::Pendiente);
    }

    #[tokio::test]
    async fn cancelada_es_terminal() {
        let agenda = agenda_sin_bloqueos();
        let cita = cita_pendiente(&agenda).await;

        let cita = agenda.cancelar(cita.cita_id, "viaje imprevisto").await.unwrap();
        assert_eq!(cita.estado, EstadoCita::Cancelada);
        assert_eq!(cita.motivo_cancelacion.as_deref(), Some("viaje imprevisto"));

        for resultado in [
            agenda.confirmar(cita.cita_id).await,
            agenda.iniciar_consulta(cita.cita_id).await,
            agenda.finalizar_atencion(cita.cita_id).await,
        ] {
            assert!(matches!(
                resultado,
                Err(AgendaError::TransicionInvalida { .. })
            ));
        }
    }

    #[tokio::test]
    async fn cancelar_sin_motivo_falla() {
        let agenda = agenda_sin_bloqueos();
        let cita = cita_pendiente(&agenda).await;

        let err = agenda.cancelar(cita.cita_id, "   ").await.unwrap_err();
        assert!(matches!(err, AgendaError::Validacion(_)));

        let relectura = agenda.obtener(cita.cita_id).await.unwrap();
        assert_eq!(relectura.estado, EstadoCita::Pendiente);
        assert!(relectura.motivo_cancelacion.is_none());
    }

    #[tokio::test]
    async fn crear_rechaza_fecha_pasada() {
        let agenda = agenda_sin_bloqueos();
        let err = agenda
            .crear_desde(
                datos(d(2025, 5, 31), t(9, 0), Some(t(9, 30))),
                d(HOY.0, HOY.1, HOY.2),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgendaError::Validacion(_)));
    }

    #[tokio::test]
    async fn crear_respeta_bloqueos_y_bordes() {
        let agenda = agenda_con_almuerzo();
        let hoy = d(HOY.0, HOY.1, HOY.2);

        // 12:30-13:15 pisa el almuerzo
        let err = agenda
            .crear_desde(datos(d(2025, 6, 10), t(12, 30), Some(t(13, 15))), hoy)
            .await
            .unwrap_err();
        match err {
            AgendaError::Bloqueado { etiqueta } => assert_eq!(etiqueta, "Almuerzo"),
            otro => panic!("unexpected error: {otro:?}"),
        }

        // 11:00-13:00 toca el borde, no hay superposición
        assert!(agenda
            .crear_desde(datos(d(2025, 6, 10), t(11, 0), Some(t(13, 0))), hoy)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn reprogramar_valida_y_normaliza_a_pendiente() {
        let agenda = agenda_con_almuerzo();
        let hoy = d(HOY.0, HOY.1, HOY.2);
        let cita = agenda
            .crear_desde(datos(d(2025, 6, 10), t(9, 0), Some(t(9, 30))), hoy)
            .await
            .unwrap();
        let cita = agenda.confirmar(cita.cita_id).await.unwrap();

        // hacia el almuerzo: rechazado, fecha/hora originales intactas
        let err = agenda
            .reprogramar_desde(
                cita.cita_id,
                Reprogramacion {
                    fecha: d(2025, 6, 12),
                    hora_inicio: t(13, 30),
                    hora_fin: Some(t(14, 0)),
                    motivo: None,
                },
                hoy,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgendaError::Bloqueado { .. }));
        let relectura = agenda.obtener(cita.cita_id).await.unwrap();
        assert_eq!(relectura.fecha, d(2025, 6, 10));
        assert_eq!(relectura.hora_inicio, t(9, 0));
        assert_eq!(relectura.estado, EstadoCita::Confirmada);

        // hacia un hueco libre: la cita vuelve a pendiente
        let cita = agenda
            .reprogramar_desde(
                cita.cita_id,
                Reprogramacion {
                    fecha: d(2025, 6, 12),
                    hora_inicio: t(10, 0),
                    hora_fin: None,
                    motivo: Some("pedido del paciente".to_string()),
                },
                hoy,
            )
            .await
            .unwrap();
        assert_eq!(cita.estado, EstadoCita::Pendiente);
        assert_eq!(cita.fecha, d(2025, 6, 12));
        assert!(cita.hora_fin.is_none());
        assert_eq!(
            cita.motivo_reprogramacion.as_deref(),
            Some("pedido del paciente")
        );
    }

    #[tokio::test]
    async fn reprogramar_una_cita_terminal_falla() {
        let agenda = agenda_sin_bloqueos();
        let cita = cita_pendiente(&agenda).await;
        agenda.cancelar(cita.cita_id, "no asistirá").await.unwrap();

        let err = agenda
            .reprogramar_desde(
                cita.cita_id,
                Reprogramacion {
                    fecha: d(2025, 6, 20),
                    hora_inicio: t(9, 0),
                    hora_fin: None,
                    motivo: None,
                },
                d(HOY.0, HOY.1, HOY.2),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgendaError::TransicionInvalida { .. }));
    }

    #[tokio::test]
    async fn recordatorio_es_un_cerrojo_de_un_solo_sentido() {
        let agenda = agenda_sin_bloqueos();
        let cita = cita_pendiente(&agenda).await;

        let cita = agenda.marcar_recordatorio_enviado(cita.cita_id).await.unwrap();
        assert!(!cita.recordatorio_pendiente);
        let enviado_en = cita.recordatorio_enviado_en.expect("timestamp de envío");

        // marcar de nuevo es un no-op: conserva el timestamp original
        let cita = agenda.marcar_recordatorio_enviado(cita.cita_id).await.unwrap();
        assert!(!cita.recordatorio_pendiente);
        assert_eq!(cita.recordatorio_enviado_en, Some(enviado_en));
    }

    #[tokio::test]
    async fn marcado_masivo_de_recordatorios() {
        let agenda = agenda_sin_bloqueos();
        let hoy = d(HOY.0, HOY.1, HOY.2);
        let a = agenda
            .crear_desde(datos(d(2025, 6, 10), t(9, 0), None), hoy)
            .await
            .unwrap();
        let b = agenda
            .crear_desde(datos(d(2025, 6, 10), t(10, 0), None), hoy)
            .await
            .unwrap();
        let otra_fecha = agenda
            .crear_desde(datos(d(2025, 6, 11), t(9, 0), None), hoy)
            .await
            .unwrap();

        let marcadas = agenda
            .marcar_recordatorios_enviados(Some(d(2025, 6, 10)))
            .await
            .unwrap();
        assert_eq!(marcadas.len(), 2);
        assert!(marcadas.iter().all(|c| !c.recordatorio_pendiente));
        assert!(marcadas.iter().any(|c| c.cita_id == a.cita_id));
        assert!(marcadas.iter().any(|c| c.cita_id == b.cita_id));

        // la cita de otra fecha sigue pendiente de recordatorio
        let relectura = agenda.obtener(otra_fecha.cita_id).await.unwrap();
        assert!(relectura.recordatorio_pendiente);

        // segunda pasada: ya no queda nada por marcar
        let segunda = agenda
            .marcar_recordatorios_enviados(Some(d(2025, 6, 10)))
            .await
            .unwrap();
        assert!(segunda.is_empty());
    }

    #[tokio::test]
    async fn operar_sobre_un_id_desconocido_devuelve_no_encontrada() {
        let agenda = agenda_sin_bloqueos();
        let id = Uuid::new_v4();
        assert!(matches!(
            agenda.confirmar(id).await,
            Err(AgendaError::NoEncontrada)
        ));
        assert!(matches!(
            agenda.marcar_recordatorio_enviado(id).await,
            Err(AgendaError::NoEncontrada)
        ));
    }
}
