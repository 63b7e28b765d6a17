pub mod agenda;
pub mod cita;
pub mod error;
pub mod horario;
pub mod store;
