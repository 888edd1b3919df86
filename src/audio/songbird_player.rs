//! Implementación de la frontera de voz sobre songbird.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::{
    cache::Cache,
    model::id::{ChannelId, GuildId},
};
use songbird::{
    input::HttpRequest, tracks::TrackHandle, Call, Event, EventContext,
    EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{
    player::{Player, TrackEndCallback, VoiceConnector},
    track::Track,
};
use crate::error::{MusicError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayState {
    Stopped,
    Playing,
    Paused,
}

/// Crea players uniéndose a canales de voz con el manager de songbird
pub struct SongbirdConnector {
    manager: Arc<Songbird>,
    cache: Arc<Cache>,
    http_client: reqwest::Client,
}

impl SongbirdConnector {
    pub fn new(manager: Arc<Songbird>, cache: Arc<Cache>) -> Self {
        Self {
            manager,
            cache,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl VoiceConnector for SongbirdConnector {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<Box<dyn Player>> {
        let call = self.manager.join(guild_id, channel_id).await.map_err(|e| {
            error!("Error al obtener handler de voz: {:?}", e);
            MusicError::VoiceConnect(e.to_string())
        })?;

        Ok(Box::new(SongbirdPlayer {
            guild_id,
            channel_id,
            call,
            manager: self.manager.clone(),
            cache: self.cache.clone(),
            http_client: self.http_client.clone(),
            current: None,
            state: Arc::new(Mutex::new(PlayState::Stopped)),
            volume: 50,
        }))
    }

    async fn release(&self, guild_id: GuildId) {
        if let Err(e) = self.manager.remove(guild_id).await {
            debug!("Nada que liberar en guild {}: {}", guild_id, e);
        }
    }
}

/// Player de una guild sobre una llamada de songbird
pub struct SongbirdPlayer {
    guild_id: GuildId,
    channel_id: ChannelId,
    call: Arc<tokio::sync::Mutex<Call>>,
    manager: Arc<Songbird>,
    cache: Arc<Cache>,
    http_client: reqwest::Client,
    current: Option<TrackHandle>,
    // Uno por pista, para que el fin de una pista vieja no pise a la nueva
    state: Arc<Mutex<PlayState>>,
    volume: u8,
}

fn gain(volume: u8) -> f32 {
    f32::from(volume.min(100)) / 100.0
}

#[async_trait]
impl Player for SongbirdPlayer {
    fn channel(&self) -> ChannelId {
        self.channel_id
    }

    async fn move_to(&mut self, channel_id: ChannelId) -> Result<()> {
        let call = self
            .manager
            .join(self.guild_id, channel_id)
            .await
            .map_err(|e| MusicError::VoiceConnect(e.to_string()))?;

        self.call = call;
        self.channel_id = channel_id;
        Ok(())
    }

    async fn play(&mut self, track: &Track, on_finished: TrackEndCallback) -> Result<()> {
        if let Some(previous) = self.current.take() {
            let _ = previous.stop();
        }

        let input = HttpRequest::new(self.http_client.clone(), track.stream_url().to_string());
        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input.into())
        };
        let _ = handle.set_volume(gain(self.volume));

        let state = Arc::new(Mutex::new(PlayState::Playing));
        let callback = Arc::new(Mutex::new(Some(on_finished)));

        for (event, errored) in [(TrackEvent::End, false), (TrackEvent::Error, true)] {
            let registered = handle.add_event(
                Event::Track(event),
                TrackEndHandler {
                    guild_id: self.guild_id,
                    callback: callback.clone(),
                    state: state.clone(),
                    errored,
                },
            );

            if let Err(e) = registered {
                let _ = handle.stop();
                return Err(MusicError::Playback(format!(
                    "Error al agregar event handler: {}",
                    e
                )));
            }
        }

        self.state = state;
        self.current = Some(handle);
        info!("🎵 Stream iniciado en guild {}: {}", self.guild_id, track.title());
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(handle) = &self.current {
            let _ = handle.pause();
            *self.state.lock() = PlayState::Paused;
        }
    }

    fn resume(&mut self) {
        if let Some(handle) = &self.current {
            let _ = handle.play();
            *self.state.lock() = PlayState::Playing;
        }
    }

    fn stop(&mut self) {
        if let Some(handle) = self.current.take() {
            let _ = handle.stop();
        }
        *self.state.lock() = PlayState::Stopped;
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        if let Some(handle) = &self.current {
            let _ = handle.set_volume(gain(self.volume));
        }
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn is_playing(&self) -> bool {
        *self.state.lock() == PlayState::Playing
    }

    fn is_paused(&self) -> bool {
        *self.state.lock() == PlayState::Paused
    }

    fn listener_count(&self) -> Option<usize> {
        let channel = self
            .cache
            .guild(self.guild_id)?
            .channels
            .get(&self.channel_id)?
            .clone();
        let members = channel.members(&self.cache).ok()?;

        Some(members.iter().filter(|member| !member.user.bot).count())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.stop();
        self.manager
            .remove(self.guild_id)
            .await
            .map_err(|e| MusicError::VoiceConnect(e.to_string()))
    }
}

/// Dispara el callback de fin de pista una sola vez (fin normal o error)
struct TrackEndHandler {
    guild_id: GuildId,
    callback: Arc<Mutex<Option<TrackEndCallback>>>,
    state: Arc<Mutex<PlayState>>,
    errored: bool,
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        *self.state.lock() = PlayState::Stopped;

        let error = self.errored.then(|| {
            let reason = match ctx {
                EventContext::Track(tracks) => tracks
                    .first()
                    .map(|(state, _)| format!("{:?}", state.playing)),
                _ => None,
            };
            MusicError::Playback(reason.unwrap_or_else(|| "error desconocido".to_string()))
        });

        if let Some(e) = &error {
            warn!("❌ Error en track para guild {}: {}", self.guild_id, e);
        } else {
            debug!("Track terminado en guild {}", self.guild_id);
        }

        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback(error);
        }

        None
    }
}
