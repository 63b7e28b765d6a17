use std::env;

use chrono::NaiveTime;

use crate::domain::horario::{Bloqueo, HorarioClinica};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub session_ttl_hours: i64,
    pub horario: HorarioClinica,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(24);

        let apertura = env::var("CLINICA_APERTURA").unwrap_or_else(|_| "08:00".to_string());
        let cierre = env::var("CLINICA_CIERRE").unwrap_or_else(|_| "20:00".to_string());
        let bloqueos = env::var("CLINICA_BLOQUEOS").ok();
        let horario = parse_horario(&apertura, &cierre, bloqueos.as_deref())?;

        Ok(Self {
            database_url,
            bind_addr,
            session_ttl_hours,
            horario,
        })
    }
}

/// Schedule config from env strings. `bloqueos_json` is a JSON array like
/// `[{"inicio":"13:00","fin":"15:00","etiqueta":"Almuerzo"}]`.
fn parse_horario(
    apertura: &str,
    cierre: &str,
    bloqueos_json: Option<&str>,
) -> anyhow::Result<HorarioClinica> {
    let apertura = parse_hora(apertura)?;
    let cierre = parse_hora(cierre)?;
    if cierre <= apertura {
        anyhow::bail!("CLINICA_CIERRE must be after CLINICA_APERTURA");
    }

    let bloqueos: Vec<Bloqueo> = match bloqueos_json {
        Some(json) => serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("CLINICA_BLOQUEOS is not valid JSON: {e}"))?,
        None => Vec::new(),
    };
    for b in &bloqueos {
        if b.fin <= b.inicio {
            anyhow::bail!("block '{}' ends before it starts", b.etiqueta);
        }
    }

    Ok(HorarioClinica {
        apertura,
        cierre,
        bloqueos,
    })
}

fn parse_hora(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| anyhow::anyhow!("invalid time '{s}', expected HH:MM"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horario_por_defecto_sin_bloqueos() {
        let h = parse_horario("08:00", "20:00", None).unwrap();
        assert!(h.bloqueos.is_empty());
        assert_eq!(h.apertura, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    }

    #[test]
    fn bloqueos_desde_json() {
        let h = parse_horario(
            "09:00",
            "19:00",
            Some(r#"[{"inicio":"13:00:00","fin":"15:00:00","etiqueta":"Almuerzo"}]"#),
        )
        .unwrap();
        assert_eq!(h.bloqueos.len(), 1);
        assert_eq!(h.bloqueos[0].etiqueta, "Almuerzo");
    }

    #[test]
    fn horario_invertido_es_rechazado() {
        assert!(parse_horario("20:00", "08:00", None).is_err());
        assert!(parse_horario("08:00", "20:00", Some("not json")).is_err());
        assert!(parse_hora("25:00").is_err());
    }
}
