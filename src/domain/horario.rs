use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::error::AgendaError;

/// A clinic-wide blackout window (lunch break, staff meeting, holiday hours).
/// Times are local clinic time; blocks apply to every calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bloqueo {
    pub inicio: NaiveTime,
    pub fin: NaiveTime,
    pub etiqueta: String,
}

/// Clinic operating hours plus the ordered list of blocked intervals.
/// Read-only input to the conflict check; loaded from config at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorarioClinica {
    pub apertura: NaiveTime,
    pub cierre: NaiveTime,
    pub bloqueos: Vec<Bloqueo>,
}

impl Default for HorarioClinica {
    fn default() -> Self {
        HorarioClinica {
            apertura: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            cierre: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            bloqueos: Vec::new(),
        }
    }
}

/// Half-open interval overlap: `[s, e)` intersects `[bs, be)`.
fn se_superponen(s: NaiveTime, e: NaiveTime, bs: NaiveTime, be: NaiveTime) -> bool {
    s < be && e > bs
}

impl HorarioClinica {
    /// Decide admissibility of a candidate interval.
    ///
    /// When no end time is given the interval degenerates to an instant, which
    /// still conflicts with any block that strictly contains it. Blocks are
    /// checked in configured order and the first match wins; adjacent
    /// intervals (end == block start, or start == block end) do not conflict.
    pub fn validar_intervalo(
        &self,
        inicio: NaiveTime,
        fin: Option<NaiveTime>,
    ) -> Result<(), AgendaError> {
        let fin = fin.unwrap_or(inicio);

        if inicio < self.apertura || fin > self.cierre {
            return Err(AgendaError::FueraDeHorario {
                apertura: self.apertura,
                cierre: self.cierre,
            });
        }

        for b in &self.bloqueos {
            if se_superponen(inicio, fin, b.inicio, b.fin) {
                return Err(AgendaError::Bloqueado {
                    etiqueta: b.etiqueta.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn horario_con_almuerzo() -> HorarioClinica {
        HorarioClinica {
            apertura: t(8, 0),
            cierre: t(20, 0),
            bloqueos: vec![Bloqueo {
                inicio: t(13, 0),
                fin: t(15, 0),
                etiqueta: "Almuerzo".to_string(),
            }],
        }
    }

    #[test]
    fn intervalo_libre_es_admitido() {
        let h = horario_con_almuerzo();
        assert!(h.validar_intervalo(t(9, 0), Some(t(9, 30))).is_ok());
    }

    #[test]
    fn superposicion_parcial_es_rechazada() {
        // 12:30-13:15 overlaps the 13:00-15:00 lunch block
        let h = horario_con_almuerzo();
        let err = h.validar_intervalo(t(12, 30), Some(t(13, 15))).unwrap_err();
        match err {
            AgendaError::Bloqueado { etiqueta } => assert_eq!(etiqueta, "Almuerzo"),
            otro => panic!("unexpected error: {otro:?}"),
        }
    }

    #[test]
    fn intervalo_contenido_es_rechazado() {
        let h = horario_con_almuerzo();
        assert!(h.validar_intervalo(t(13, 30), Some(t(14, 0))).is_err());
    }

    #[test]
    fn bordes_adyacentes_son_admitidos() {
        let h = horario_con_almuerzo();
        // ends exactly when the block starts
        assert!(h.validar_intervalo(t(11, 0), Some(t(13, 0))).is_ok());
        // starts exactly when the block ends
        assert!(h.validar_intervalo(t(15, 0), Some(t(15, 30))).is_ok());
    }

    #[test]
    fn instante_dentro_del_bloqueo_es_rechazado() {
        // zero-duration probe (no end time) inside the block
        let h = horario_con_almuerzo();
        assert!(h.validar_intervalo(t(14, 0), None).is_err());
        // the same probe at the block's start boundary is fine
        assert!(h.validar_intervalo(t(13, 0), None).is_ok());
    }

    #[test]
    fn fuera_del_horario_de_atencion_es_rechazado() {
        let h = horario_con_almuerzo();
        let err = h.validar_intervalo(t(7, 0), Some(t(7, 30))).unwrap_err();
        assert!(matches!(err, AgendaError::FueraDeHorario { .. }));
        assert!(h.validar_intervalo(t(19, 30), Some(t(20, 30))).is_err());
    }

    #[test]
    fn primer_bloqueo_que_coincide_gana() {
        let mut h = horario_con_almuerzo();
        h.bloqueos.push(Bloqueo {
            inicio: t(14, 0),
            fin: t(16, 0),
            etiqueta: "Mantenimiento".to_string(),
        });
        let err = h.validar_intervalo(t(14, 30), Some(t(14, 45))).unwrap_err();
        match err {
            AgendaError::Bloqueado { etiqueta } => assert_eq!(etiqueta, "Almuerzo"),
            otro => panic!("unexpected error: {otro:?}"),
        }
    }
}
