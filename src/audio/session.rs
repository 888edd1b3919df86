//! Máquina de estados de reproducción de una guild.
//!
//! Cada [`GuildSession`] es su propio dominio serializado: todas las
//! transiciones (comandos, fin de pista del player, temporizador de
//! inactividad) pasan por el mismo `Mutex` asíncrono. Los eventos que llegan
//! desde fuera (callback de fin de pista, temporizador) se reinyectan como
//! tareas que toman ese lock, y se descartan si ya no corresponden al estado
//! actual:
//!
//! - cada intento de reproducción lleva un número de generación; un fin de
//!   pista con una generación vieja no avanza la cola
//! - cada temporizador lleva un id; uno cancelado o reemplazado no desconecta
//!
//! Las notificaciones salen por un canal hacia una tarea aparte, así que un
//! notificador lento nunca retiene el lock de la sesión.

use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{
    collections::HashSet,
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{
    runtime::Handle,
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use super::{
    notifier::{Notification, Notifier},
    player::{Player, TrackEndCallback, VoiceConnector},
    queue::{MusicQueue, QueuePage, DEFAULT_HISTORY_SIZE, DEFAULT_MAX_SIZE},
    track::Track,
};
use crate::error::{MusicError, Result};

/// Parámetros por guild
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_queue_size: usize,
    pub history_size: usize,
    pub inactivity_timeout: Duration,
    pub connect_timeout: Duration,
    pub default_volume: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_SIZE,
            history_size: DEFAULT_HISTORY_SIZE,
            inactivity_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
            default_volume: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    /// Conectado sin pista actual
    Idle,
    Playing,
    Paused,
}

/// Resultado de un voto para saltar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipVote {
    pub votes: usize,
    pub required: usize,
    pub skipped: bool,
}

struct InactivityTimer {
    id: u64,
    handle: JoinHandle<()>,
}

struct SessionState {
    queue: MusicQueue,
    player: Option<Box<dyn Player>>,
    current: Option<Track>,
    status: SessionStatus,
    skip_votes: HashSet<UserId>,
    generation: u64,
    timer: Option<InactivityTimer>,
    timer_seq: u64,
    volume: u8,
    notifications: Option<mpsc::UnboundedSender<Notification>>,
    // Retirada del registro: no vuelve a conectarse
    closed: bool,
}

struct Shared {
    guild_id: GuildId,
    config: SessionConfig,
    connector: Arc<dyn VoiceConnector>,
    state: Mutex<SessionState>,
}

/// Sesión de reproducción de una guild; clonar comparte la misma sesión
#[derive(Clone)]
pub struct GuildSession {
    shared: Arc<Shared>,
}

impl GuildSession {
    pub fn new(guild_id: GuildId, config: SessionConfig, connector: Arc<dyn VoiceConnector>) -> Self {
        let state = SessionState {
            queue: MusicQueue::new(config.max_queue_size, config.history_size),
            player: None,
            current: None,
            status: SessionStatus::Disconnected,
            skip_votes: HashSet::new(),
            generation: 0,
            timer: None,
            timer_seq: 0,
            volume: config.default_volume.min(100),
            notifications: None,
            closed: false,
        };

        Self {
            shared: Arc::new(Shared {
                guild_id,
                config,
                connector,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.shared.guild_id
    }

    /// Conecta (o mueve) la sesión al canal de voz indicado
    pub async fn connect(&self, channel_id: ChannelId) -> Result<()> {
        let mut guard = self.shared.state.lock().await;
        let state = &mut *guard;
        let guild_id = self.shared.guild_id;
        let connect_timeout = self.shared.config.connect_timeout;

        if state.closed {
            return Err(MusicError::SessionClosed);
        }

        if let Some(player) = state.player.as_mut() {
            if player.channel() == channel_id {
                debug!("🔊 Guild {} ya está en el canal {}", guild_id, channel_id);
                return Ok(());
            }

            match tokio::time::timeout(connect_timeout, player.move_to(channel_id)).await {
                Ok(Ok(())) => info!("🔀 Guild {} movida al canal {}", guild_id, channel_id),
                Ok(Err(e)) => {
                    error!("❌ Error al mover la guild {} al canal {}: {}", guild_id, channel_id, e);
                    return Err(e);
                }
                Err(_) => {
                    return Err(MusicError::VoiceConnect(format!(
                        "tiempo agotado al moverse al canal {}",
                        channel_id
                    )))
                }
            }
        } else {
            let connecting = self.shared.connector.connect(guild_id, channel_id);
            let mut player = match tokio::time::timeout(connect_timeout, connecting).await {
                Ok(Ok(player)) => player,
                Ok(Err(e)) => {
                    error!("❌ Error al conectar la guild {}: {}", guild_id, e);
                    self.shared.connector.release(guild_id).await;
                    return Err(e);
                }
                Err(_) => {
                    warn!("⏱️ Timeout conectando la guild {} al canal {}", guild_id, channel_id);
                    self.shared.connector.release(guild_id).await;
                    return Err(MusicError::VoiceConnect(format!(
                        "tiempo agotado ({}s) al conectar al canal {}",
                        connect_timeout.as_secs(),
                        channel_id
                    )));
                }
            };

            player.set_volume(state.volume);
            state.player = Some(player);
            state.status = SessionStatus::Idle;
            info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
        }

        cancel_inactivity_timer(state);
        Ok(())
    }

    /// Suelta el enlace de voz y limpia la pista actual y los votos
    pub async fn disconnect(&self) {
        let mut state = self.shared.state.lock().await;
        self.disconnect_locked(&mut state).await;
    }

    /// Desconecta y cierra la sesión para siempre; las copias que aún se
    /// tengan de ella ya no pueden conectarse ni encolar
    pub async fn close(&self) {
        let mut state = self.shared.state.lock().await;
        state.closed = true;
        state.notifications = None;
        self.disconnect_locked(&mut state).await;
    }

    pub async fn is_closed(&self) -> bool {
        self.shared.state.lock().await.closed
    }

    /// Agrega a la cola y arranca la reproducción si la sesión está ociosa
    pub async fn enqueue_and_maybe_start(&self, track: Track) -> Result<usize> {
        let mut state = self.shared.state.lock().await;
        if state.closed {
            return Err(MusicError::SessionClosed);
        }
        let position = state.queue.add(track)?;

        if state.status == SessionStatus::Idle {
            self.advance_locked(&mut state).await;
        }

        Ok(position)
    }

    /// Pasa a la siguiente pista (o repite la actual en modo loop)
    pub async fn advance(&self) {
        let mut state = self.shared.state.lock().await;
        self.advance_locked(&mut state).await;
    }

    /// Detiene la pista actual y avanza; devuelve la pista saltada
    pub async fn skip(&self) -> Result<Track> {
        let mut state = self.shared.state.lock().await;
        self.skip_locked(&mut state).await
    }

    /// Vacía la cola, corta la pista actual y deja la sesión ociosa
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.shared.state.lock().await;
        if state.player.is_none() {
            return Err(MusicError::NotConnected);
        }

        state.queue.clear();
        state.generation += 1;
        state.current = None;
        if let Some(player) = state.player.as_mut() {
            player.stop();
        }
        info!("⏹️ Reproducción detenida en guild {}", self.shared.guild_id);

        self.advance_locked(&mut state).await;
        Ok(())
    }

    /// Pausa si está reproduciendo; devuelve si hubo cambio
    pub async fn pause(&self) -> bool {
        let mut state = self.shared.state.lock().await;
        if state.status != SessionStatus::Playing {
            return false;
        }
        if let Some(player) = state.player.as_mut() {
            player.pause();
        }
        state.status = SessionStatus::Paused;
        info!("⏸️ Reproducción pausada en guild {}", self.shared.guild_id);
        true
    }

    /// Reanuda si está en pausa; devuelve si hubo cambio
    pub async fn resume(&self) -> bool {
        let mut state = self.shared.state.lock().await;
        if state.status != SessionStatus::Paused {
            return false;
        }
        if let Some(player) = state.player.as_mut() {
            player.resume();
        }
        state.status = SessionStatus::Playing;
        info!("▶️ Reproducción reanudada en guild {}", self.shared.guild_id);
        true
    }

    /// Registra un voto y devuelve `(votos, requeridos)`
    pub async fn add_skip_vote(&self, user_id: UserId) -> (usize, usize) {
        let mut state = self.shared.state.lock().await;
        register_skip_vote(&mut state, user_id)
    }

    /// Registra un voto y salta si se alcanzó el quórum, todo bajo el mismo lock
    pub async fn vote_skip(&self, user_id: UserId) -> Result<SkipVote> {
        let mut state = self.shared.state.lock().await;
        if !matches!(state.status, SessionStatus::Playing | SessionStatus::Paused) {
            return Err(MusicError::NothingPlaying);
        }

        let (votes, required) = register_skip_vote(&mut state, user_id);
        let skipped = votes >= required;
        if skipped {
            info!("🗳️ Quórum alcanzado ({}/{}) en guild {}", votes, required, self.shared.guild_id);
            self.skip_locked(&mut state).await?;
        }

        Ok(SkipVote {
            votes,
            required,
            skipped,
        })
    }

    pub async fn set_volume(&self, volume: u8) -> Result<()> {
        if volume > 100 {
            return Err(MusicError::InvalidVolume(volume));
        }

        let mut state = self.shared.state.lock().await;
        state.volume = volume;
        if let Some(player) = state.player.as_mut() {
            player.set_volume(volume);
        }
        info!("🔊 Volumen ajustado a {}% en guild {}", volume, self.shared.guild_id);
        Ok(())
    }

    pub async fn volume(&self) -> u8 {
        self.shared.state.lock().await.volume
    }

    /// Canal de texto donde se publican los anuncios
    pub async fn set_notifier(&self, notifier: Option<Arc<dyn Notifier>>) {
        let sender = notifier.map(|notifier| spawn_notifier(self.shared.guild_id, notifier));
        self.shared.state.lock().await.notifications = sender;
    }

    // Accesores de estado

    pub async fn status(&self) -> SessionStatus {
        self.shared.state.lock().await.status
    }

    pub async fn is_connected(&self) -> bool {
        self.shared.state.lock().await.player.is_some()
    }

    pub async fn is_playing(&self) -> bool {
        let state = self.shared.state.lock().await;
        state.player.as_ref().is_some_and(|p| p.is_playing())
    }

    pub async fn is_paused(&self) -> bool {
        let state = self.shared.state.lock().await;
        state.player.as_ref().is_some_and(|p| p.is_paused())
    }

    pub async fn current_track(&self) -> Option<Track> {
        self.shared.state.lock().await.current.clone()
    }

    // Accesores de la cola

    pub async fn queue_len(&self) -> usize {
        self.shared.state.lock().await.queue.len()
    }

    /// Queda espacio para al menos una pista más
    pub async fn has_room(&self) -> bool {
        let state = self.shared.state.lock().await;
        state.queue.len() < state.queue.max_size()
    }

    pub async fn track_at(&self, index: usize) -> Result<Track> {
        self.shared.state.lock().await.queue.get(index).cloned()
    }

    pub async fn up_next(&self) -> Option<Track> {
        self.shared.state.lock().await.queue.peek().cloned()
    }

    pub async fn queue_tracks(&self) -> Vec<Track> {
        self.shared.state.lock().await.queue.tracks()
    }

    pub async fn queue_page(&self, page: usize, items_per_page: usize) -> QueuePage {
        self.shared.state.lock().await.queue.page(page, items_per_page)
    }

    pub async fn history(&self) -> Vec<Track> {
        self.shared.state.lock().await.queue.history()
    }

    /// Vacía la cola y devuelve cuántas pistas se quitaron
    pub async fn clear_queue(&self) -> usize {
        let mut state = self.shared.state.lock().await;
        let removed = state.queue.len();
        state.queue.clear();
        removed
    }

    pub async fn shuffle_queue(&self) {
        self.shared.state.lock().await.queue.shuffle();
    }

    pub async fn remove(&self, index: usize) -> Result<Track> {
        self.shared.state.lock().await.queue.remove(index)
    }

    pub async fn move_track(&self, from: usize, to: usize) -> Result<()> {
        self.shared.state.lock().await.queue.move_track(from, to)
    }

    pub async fn total_duration(&self) -> u64 {
        self.shared.state.lock().await.queue.total_duration()
    }

    pub async fn is_loop(&self) -> bool {
        self.shared.state.lock().await.queue.is_loop()
    }

    pub async fn set_loop(&self, enabled: bool) {
        self.shared.state.lock().await.queue.set_loop(enabled);
    }

    pub async fn is_loop_queue(&self) -> bool {
        self.shared.state.lock().await.queue.is_loop_queue()
    }

    pub async fn set_loop_queue(&self, enabled: bool) {
        self.shared.state.lock().await.queue.set_loop_queue(enabled);
    }

    // Transiciones internas (siempre con el lock tomado)

    async fn advance_locked(&self, state: &mut SessionState) {
        let guild_id = self.shared.guild_id;
        if state.player.is_none() {
            debug!("Guild {} sin conexión de voz, no se avanza", guild_id);
            return;
        }

        // Cota de fallos seguidos: cada candidata una vez (la cola, más la
        // actual si el modo loop la repite)
        let replays_current = state.queue.is_loop() && state.current.is_some();
        let mut attempts_left = (state.queue.len() + usize::from(replays_current)).max(1);

        loop {
            state.generation += 1;
            state.skip_votes.clear();

            let next = match &state.current {
                Some(current) if state.queue.is_loop() => {
                    debug!("🔂 Repitiendo track: {}", current.title());
                    Some(current.clone())
                }
                _ => state.queue.get_next(),
            };

            let Some(track) = next else {
                state.current = None;
                state.status = SessionStatus::Idle;
                info!("📭 Cola vacía en guild {}", guild_id);
                self.start_inactivity_timer(state);
                return;
            };

            state.current = Some(track.clone());
            let on_finished = self.track_end_callback(state.generation);

            let Some(player) = state.player.as_mut() else {
                return;
            };

            match player.play(&track, on_finished).await {
                Ok(()) => {
                    cancel_inactivity_timer(state);
                    state.status = SessionStatus::Playing;
                    info!("🎵 Reproduciendo en guild {}: {}", guild_id, track.title());

                    let up_next = state.queue.len();
                    notify(state, Notification::NowPlaying { track, up_next });
                    return;
                }
                Err(e) => {
                    warn!("❌ No se pudo reproducir '{}' en guild {}: {}", track.title(), guild_id, e);
                    state.current = None;
                    notify(
                        state,
                        Notification::PlaybackFailed {
                            title: track.title().to_string(),
                            reason: e.to_string(),
                        },
                    );

                    attempts_left -= 1;
                    if attempts_left == 0 {
                        error!("🚫 Demasiados fallos seguidos en guild {}, quedando ociosa", guild_id);
                        state.status = SessionStatus::Idle;
                        self.start_inactivity_timer(state);
                        return;
                    }
                }
            }
        }
    }

    async fn skip_locked(&self, state: &mut SessionState) -> Result<Track> {
        let skipped = match (&state.current, state.status) {
            (Some(track), SessionStatus::Playing | SessionStatus::Paused) => track.clone(),
            _ => return Err(MusicError::NothingPlaying),
        };

        // El fin de pista que dispara `stop` queda obsoleto
        state.generation += 1;
        if let Some(player) = state.player.as_mut() {
            player.stop();
        }
        info!("⏭️ Saltando '{}' en guild {}", skipped.title(), self.shared.guild_id);

        self.advance_locked(state).await;
        Ok(skipped)
    }

    async fn disconnect_locked(&self, state: &mut SessionState) {
        cancel_inactivity_timer(state);
        state.generation += 1;
        state.current = None;
        state.skip_votes.clear();
        state.status = SessionStatus::Disconnected;

        if let Some(mut player) = state.player.take() {
            player.stop();
            if let Err(e) = player.disconnect().await {
                error!("❌ Error al desconectar la guild {}: {}", self.shared.guild_id, e);
            }
            info!("👋 Desconectado del canal de voz en guild {}", self.shared.guild_id);
        }
    }

    /// Callback de fin de pista que vuelve al dominio de la sesión
    fn track_end_callback(&self, generation: u64) -> TrackEndCallback {
        let session = Arc::downgrade(&self.shared);
        let runtime = Handle::current();

        Box::new(move |error| {
            runtime.spawn(async move {
                if let Some(session) = upgrade(&session) {
                    session.on_track_end(generation, error).await;
                }
            });
        })
    }

    async fn on_track_end(&self, generation: u64, error: Option<MusicError>) {
        let mut state = self.shared.state.lock().await;

        let active = matches!(state.status, SessionStatus::Playing | SessionStatus::Paused);
        if generation != state.generation || !active {
            debug!(
                "Fin de pista obsoleto descartado en guild {} (gen {} vs {})",
                self.shared.guild_id, generation, state.generation
            );
            return;
        }

        if let Some(e) = error {
            warn!("❌ La pista falló durante la reproducción en guild {}: {}", self.shared.guild_id, e);
        }

        self.advance_locked(&mut state).await;
    }

    fn start_inactivity_timer(&self, state: &mut SessionState) {
        cancel_inactivity_timer(state);

        state.timer_seq += 1;
        let id = state.timer_seq;
        let delay = self.shared.config.inactivity_timeout;
        let session = Arc::downgrade(&self.shared);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(session) = upgrade(&session) {
                session.on_inactivity_timeout(id).await;
            }
        });

        state.timer = Some(InactivityTimer { id, handle });
        debug!(
            "⏲️ Temporizador de inactividad {} iniciado en guild {} ({}s)",
            id,
            self.shared.guild_id,
            delay.as_secs()
        );
    }

    async fn on_inactivity_timeout(&self, id: u64) {
        let mut state = self.shared.state.lock().await;

        if state.timer.as_ref().map(|t| t.id) != Some(id) {
            debug!("Temporizador {} ya no vigente en guild {}", id, self.shared.guild_id);
            return;
        }
        // Soltar el handle sin abortar: es esta misma tarea
        state.timer = None;

        if state.status != SessionStatus::Idle || state.player.is_none() {
            return;
        }

        let idle = self.shared.config.inactivity_timeout;
        info!("💤 Desconectando guild {} tras {}s de inactividad", self.shared.guild_id, idle.as_secs());
        notify(&state, Notification::IdleDisconnect { idle });
        self.disconnect_locked(&mut state).await;
    }
}

fn upgrade(shared: &Weak<Shared>) -> Option<GuildSession> {
    shared.upgrade().map(|shared| GuildSession { shared })
}

fn cancel_inactivity_timer(state: &mut SessionState) {
    if let Some(timer) = state.timer.take() {
        timer.handle.abort();
    }
}

fn register_skip_vote(state: &mut SessionState, user_id: UserId) -> (usize, usize) {
    state.skip_votes.insert(user_id);

    // Mitad de los oyentes no-bot; 1 si no se conocen
    let required = state
        .player
        .as_ref()
        .and_then(|p| p.listener_count())
        .map_or(1, |listeners| listeners / 2)
        .max(1);

    (state.skip_votes.len(), required)
}

/// Tarea que publica en orden lo que la sesión le envía; termina cuando se
/// suelta el emisor
fn spawn_notifier(guild_id: GuildId, notifier: Arc<dyn Notifier>) -> mpsc::UnboundedSender<Notification> {
    let (sender, mut receiver) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(notification) = receiver.recv().await {
            notifier.post(notification).await;
        }
        debug!("📪 Notificador liberado en guild {}", guild_id);
    });

    sender
}

fn notify(state: &SessionState, notification: Notification) {
    if let Some(sender) = &state.notifications {
        if sender.send(notification).is_err() {
            debug!("Notificación descartada: el notificador ya no existe");
        }
    }
}
