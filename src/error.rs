//! Errores del núcleo de reproducción.
//!
//! Todos son recuperables en el borde de la capa de comandos: se informan al
//! usuario y nunca tumban el proceso.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MusicError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MusicError {
    /// La cola alcanzó su capacidad máxima
    #[error("La cola está llena (máximo {max} canciones)")]
    QueueFull { max: usize },

    /// Posición inválida en una operación indexada
    #[error("Índice {index} fuera de rango (la cola tiene {len} canciones)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Fallo al unirse o moverse de canal de voz (incluye timeout)
    #[error("No se pudo conectar al canal de voz: {0}")]
    VoiceConnect(String),

    /// El player no pudo iniciar la pista o falló a mitad del stream
    #[error("Error de reproducción: {0}")]
    Playback(String),

    /// El resolver no pudo obtener metadatos o stream
    #[error("Error de descarga: {0}")]
    Download(String),

    #[error("No estoy conectado a un canal de voz")]
    NotConnected,

    #[error("No hay nada reproduciéndose")]
    NothingPlaying,

    #[error("La canción dura {duration}s, el máximo es {max}s")]
    TrackTooLong { duration: u64, max: u64 },

    #[error("Volumen inválido: {0} (debe estar entre 0 y 100)")]
    InvalidVolume(u8),

    /// La sesión fue retirada del registro; hay que pedir una nueva
    #[error("La sesión de esta guild se cerró, vuelve a intentarlo")]
    SessionClosed,
}

