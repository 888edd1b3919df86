//! Reproducción de música por guild para Discord.
//!
//! [`audio`] contiene la máquina de estados de cada guild y su cola;
//! [`sources`] resuelve consultas con yt-dlp; [`bot`] conecta todo con
//! serenity y songbird.

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod sources;
pub mod ui;
