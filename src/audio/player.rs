//! Frontera con el transporte de voz.
//!
//! El núcleo nunca habla con songbird directamente: pide un [`Player`] a un
//! [`VoiceConnector`] y le entrega pistas junto con un callback de fin de
//! pista. El callback puede dispararse desde cualquier contexto de ejecución;
//! la sesión se encarga de devolverlo a su propio dominio serializado.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};

use super::track::Track;
use crate::error::{MusicError, Result};

/// Se invoca una sola vez cuando la pista termina, se detiene o falla
pub type TrackEndCallback = Box<dyn FnOnce(Option<MusicError>) + Send + 'static>;

/// Crea enlaces de voz por guild
#[async_trait]
pub trait VoiceConnector: Send + Sync {
    /// Se une a `channel` y devuelve un player enlazado a esa conexión
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<Box<dyn Player>>;

    /// Libera cualquier conexión a medio establecer para la guild
    async fn release(&self, guild_id: GuildId);
}

/// Salida de audio de una guild
#[async_trait]
pub trait Player: Send + Sync {
    fn channel(&self) -> ChannelId;

    async fn move_to(&mut self, channel_id: ChannelId) -> Result<()>;

    /// Empieza a reproducir `track`; un error aquí es un fallo síncrono de arranque
    async fn play(&mut self, track: &Track, on_finished: TrackEndCallback) -> Result<()>;

    fn pause(&mut self);

    fn resume(&mut self);

    fn stop(&mut self);

    /// Volumen de 0 a 100
    fn set_volume(&mut self, volume: u8);

    fn volume(&self) -> u8;

    fn is_playing(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Oyentes no-bot en el canal, si se conocen
    fn listener_count(&self) -> Option<usize>;

    async fn disconnect(&mut self) -> Result<()>;
}
