use async_trait::async_trait;
use std::time::Duration;

use super::track::Track;

/// Anuncios que la sesión publica en su canal de texto
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    NowPlaying { track: Track, up_next: usize },
    PlaybackFailed { title: String, reason: String },
    IdleDisconnect { idle: Duration },
}

/// Destino de notificaciones de una guild.
///
/// Es de mejor esfuerzo: las implementaciones registran sus propios fallos y
/// nunca los propagan a la máquina de estados.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, notification: Notification);
}
