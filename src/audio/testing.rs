//! Dobles de prueba para la frontera de voz y las notificaciones.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{collections::HashSet, sync::Arc, time::Duration};

use super::{
    notifier::{Notification, Notifier},
    player::{Player, TrackEndCallback, VoiceConnector},
    track::Track,
};
use crate::error::{MusicError, Result};

pub fn track(title: &str, duration: u64) -> Track {
    Track::new(
        title,
        format!("https://cdn.example.com/{title}.opus"),
        format!("https://example.com/watch/{title}"),
    )
    .with_duration(duration)
}

/// Deja correr las tareas reinyectadas (fin de pista, temporizadores)
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[derive(Default)]
struct VoiceState {
    connects: usize,
    releases: usize,
    disconnects: usize,
    stops: usize,
    play_attempts: usize,
    played: Vec<String>,
    failing: HashSet<String>,
    fail_connects: bool,
    fail_moves: bool,
    connect_delay: Option<Duration>,
    listeners: Option<usize>,
    channel: Option<ChannelId>,
    volume: Option<u8>,
    playing: bool,
    paused: bool,
    defer_stop_callbacks: bool,
    pending: Option<TrackEndCallback>,
    deferred: Vec<TrackEndCallback>,
}

/// Conector de voz en memoria; todos sus players comparten el mismo registro
#[derive(Default)]
pub struct FakeConnector {
    state: Arc<Mutex<VoiceState>>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_connects(&self) {
        self.state.lock().fail_connects = true;
    }

    pub fn fail_moves(&self) {
        self.state.lock().fail_moves = true;
    }

    pub fn delay_connects(&self, delay: Duration) {
        self.state.lock().connect_delay = Some(delay);
    }

    pub fn fail_track(&self, title: &str) {
        self.state.lock().failing.insert(title.to_string());
    }

    pub fn set_listeners(&self, listeners: Option<usize>) {
        self.state.lock().listeners = listeners;
    }

    /// Guarda los callbacks de `stop` para dispararlos más tarde
    pub fn defer_stop_callbacks(&self) {
        self.state.lock().defer_stop_callbacks = true;
    }

    /// Simula el fin natural de la pista en curso
    pub fn finish_current(&self, error: Option<MusicError>) -> bool {
        let callback = {
            let mut state = self.state.lock();
            state.playing = false;
            state.paused = false;
            state.pending.take()
        };

        match callback {
            Some(callback) => {
                callback(error);
                true
            }
            None => false,
        }
    }

    pub fn fire_deferred(&self) -> usize {
        let deferred: Vec<_> = self.state.lock().deferred.drain(..).collect();
        let count = deferred.len();
        for callback in deferred {
            callback(None);
        }
        count
    }

    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }
    pub fn releases(&self) -> usize {
        self.state.lock().releases
    }
    pub fn disconnects(&self) -> usize {
        self.state.lock().disconnects
    }
    pub fn stops(&self) -> usize {
        self.state.lock().stops
    }
    pub fn play_attempts(&self) -> usize {
        self.state.lock().play_attempts
    }
    pub fn played(&self) -> Vec<String> {
        self.state.lock().played.clone()
    }
    pub fn channel(&self) -> Option<ChannelId> {
        self.state.lock().channel
    }
    pub fn volume(&self) -> Option<u8> {
        self.state.lock().volume
    }
}

#[async_trait]
impl VoiceConnector for FakeConnector {
    async fn connect(&self, _guild_id: GuildId, channel_id: ChannelId) -> Result<Box<dyn Player>> {
        let delay = self.state.lock().connect_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.fail_connects {
            return Err(MusicError::VoiceConnect("canal lleno".to_string()));
        }
        state.connects += 1;
        state.channel = Some(channel_id);

        Ok(Box::new(FakePlayer {
            channel_id,
            state: self.state.clone(),
        }))
    }

    async fn release(&self, _guild_id: GuildId) {
        self.state.lock().releases += 1;
    }
}

struct FakePlayer {
    channel_id: ChannelId,
    state: Arc<Mutex<VoiceState>>,
}

impl FakePlayer {
    /// Corta la pista en curso y dispara (o guarda) su callback
    fn end_pending(&self) {
        let callback = {
            let mut state = self.state.lock();
            state.playing = false;
            state.paused = false;
            match state.pending.take() {
                Some(callback) if state.defer_stop_callbacks => {
                    state.deferred.push(callback);
                    None
                }
                other => other,
            }
        };

        if let Some(callback) = callback {
            callback(None);
        }
    }
}

#[async_trait]
impl Player for FakePlayer {
    fn channel(&self) -> ChannelId {
        self.channel_id
    }

    async fn move_to(&mut self, channel_id: ChannelId) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_moves {
            return Err(MusicError::VoiceConnect(format!("canal {} inaccesible", channel_id)));
        }
        state.channel = Some(channel_id);
        drop(state);
        self.channel_id = channel_id;
        Ok(())
    }

    async fn play(&mut self, track: &Track, on_finished: TrackEndCallback) -> Result<()> {
        self.end_pending();

        let mut state = self.state.lock();
        state.play_attempts += 1;
        if state.failing.contains(track.title()) {
            return Err(MusicError::Playback(format!("stream roto: {}", track.title())));
        }

        state.played.push(track.title().to_string());
        state.playing = true;
        state.paused = false;
        state.pending = Some(on_finished);
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        if state.playing {
            state.playing = false;
            state.paused = true;
        }
    }

    fn resume(&mut self) {
        let mut state = self.state.lock();
        if state.paused {
            state.playing = true;
            state.paused = false;
        }
    }

    fn stop(&mut self) {
        self.state.lock().stops += 1;
        self.end_pending();
    }

    fn set_volume(&mut self, volume: u8) {
        self.state.lock().volume = Some(volume);
    }

    fn volume(&self) -> u8 {
        self.state.lock().volume.unwrap_or_default()
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn listener_count(&self) -> Option<usize> {
        self.state.lock().listeners
    }

    async fn disconnect(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.disconnects += 1;
        state.channel = None;
        Ok(())
    }
}

/// Notificador que guarda todo lo publicado
#[derive(Default)]
pub struct RecordingNotifier {
    posted: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.posted.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post(&self, notification: Notification) {
        self.posted.lock().push(notification);
    }
}
