//! Reminder message construction and WhatsApp deep links.
//!
//! Pure string building: delivery happens in an external messaging channel,
//! the server only hands the UI a ready-to-open link.

use crate::domain::cita::Cita;

/// Human-readable reminder for an appointment.
pub fn mensaje_recordatorio(clinica: &str, paciente: &str, cita: &Cita) -> String {
    let horario = match cita.hora_fin {
        Some(fin) => format!(
            "{} a {}",
            cita.hora_inicio.format("%H:%M"),
            fin.format("%H:%M")
        ),
        None => format!("{}", cita.hora_inicio.format("%H:%M")),
    };
    format!(
        "Hola {paciente}! Le recordamos su cita en {clinica} el {} a las {horario}. Motivo: {}. Si necesita reprogramar, responda este mensaje.",
        cita.fecha.format("%d/%m/%Y"),
        cita.motivo,
    )
}

/// `https://wa.me/<digits>?text=<encoded>` deep link for the clinic staff to
/// open in the messaging app. Phone is reduced to its digits (wa.me rejects
/// `+`, spaces and dashes).
pub fn enlace_whatsapp(telefono: &str, mensaje: &str) -> String {
    let digitos: String = telefono.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("https://wa.me/{digitos}?text={}", codificar(mensaje))
}

/// Minimal percent-encoding for the `text` query parameter: RFC 3986
/// unreserved characters pass through, everything else is encoded byte-wise.
fn codificar(texto: &str) -> String {
    let mut out = String::with_capacity(texto.len() * 3);
    for b in texto.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::domain::cita::EstadoCita;

    fn cita_de_prueba() -> Cita {
        let ahora = Utc::now();
        Cita {
            cita_id: Uuid::new_v4(),
            paciente_id: Uuid::new_v4(),
            dentista_id: Uuid::new_v4(),
            fecha: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            hora_inicio: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            hora_fin: Some(NaiveTime::from_hms_opt(9, 30, 0).unwrap()),
            estado: EstadoCita::Pendiente,
            motivo: "Limpieza".to_string(),
            notas: None,
            motivo_cancelacion: None,
            motivo_reprogramacion: None,
            recordatorio_pendiente: true,
            recordatorio_enviado_en: None,
            created_at: ahora,
            updated_at: ahora,
        }
    }

    #[test]
    fn mensaje_incluye_fecha_horario_y_motivo() {
        let msg = mensaje_recordatorio("Clínica Sonrisa", "Ana", &cita_de_prueba());
        assert!(msg.contains("Ana"));
        assert!(msg.contains("10/06/2025"));
        assert!(msg.contains("09:00 a 09:30"));
        assert!(msg.contains("Limpieza"));
    }

    #[test]
    fn enlace_limpia_el_telefono_y_codifica_el_texto() {
        let enlace = enlace_whatsapp("+51 987-654-321", "Hola, ¿todo bien?");
        assert!(enlace.starts_with("https://wa.me/51987654321?text="));
        // no raw spaces or question marks in the payload
        let (_, texto) = enlace.split_once("text=").unwrap();
        assert!(!texto.contains(' '));
        assert!(!texto.contains('?'));
        assert!(texto.contains("Hola%2C"));
    }
}
