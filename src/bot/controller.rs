use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    audio::{Notifier, SessionRegistry, Track},
    error::{MusicError, Result},
    sources::{validators, TrackResolver},
};

/// Pista agregada por [`MusicController::play`]
#[derive(Debug, Clone, PartialEq)]
pub struct Enqueued {
    pub track: Track,
    /// Posición en la cola al agregarla (0 = la siguiente)
    pub position: usize,
}

/// Fachada que usa la capa de comandos para reproducir
pub struct MusicController {
    registry: Arc<SessionRegistry>,
    resolver: Arc<dyn TrackResolver>,
    max_song_duration: u64,
}

impl MusicController {
    pub fn new(
        registry: Arc<SessionRegistry>,
        resolver: Arc<dyn TrackResolver>,
        max_song_duration: u64,
    ) -> Self {
        Self {
            registry,
            resolver,
            max_song_duration,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Conecta si hace falta, resuelve la consulta y la encola.
    ///
    /// La capacidad se comprueba antes de resolver para no lanzar yt-dlp en
    /// vano; si nada sonaba, la pista empieza enseguida.
    ///
    /// `notifier` suele ser un [`ChannelNotifier`](super::ChannelNotifier)
    /// sobre el canal de texto del comando; con `None` se conserva el que la
    /// sesión ya tuviera. Si la sesión se retira del registro a mitad del
    /// comando, devuelve [`MusicError::SessionClosed`].
    pub async fn play(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        notifier: Option<Arc<dyn Notifier>>,
        query: &str,
        requester: UserId,
    ) -> Result<Enqueued> {
        let session = self.registry.get_or_create(guild_id);

        if notifier.is_some() {
            session.set_notifier(notifier).await;
        }

        if !session.is_connected().await {
            session.connect(voice_channel).await?;
        }

        if !session.has_room().await {
            return Err(MusicError::QueueFull {
                max: self.registry.config().max_queue_size,
            });
        }

        let query = validators::to_search_query(query);
        if validators::is_youtube_url(&query) {
            debug!("🔗 URL de YouTube en guild {}: {}", guild_id, query);
        }

        let track = self.resolver.resolve(&query, Some(requester)).await?;

        if !validators::validate_duration(track.duration(), self.max_song_duration) {
            return Err(MusicError::TrackTooLong {
                duration: track.duration(),
                max: self.max_song_duration,
            });
        }

        let position = session.enqueue_and_maybe_start(track.clone()).await?;
        info!(
            "➕ {} agregada en guild {} (posición {})",
            track.title(),
            guild_id,
            position
        );

        Ok(Enqueued { track, position })
    }
}
