use serenity::{
    all::{ChannelId, CreateMessage, Http},
    async_trait,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    audio::{Notification, Notifier},
    ui::embeds,
};

/// Publica las notificaciones de una sesión como embeds en un canal de texto
pub struct ChannelNotifier {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn post(&self, notification: Notification) {
        let embed = match &notification {
            Notification::NowPlaying { track, up_next } => {
                embeds::create_now_playing_embed(track, *up_next)
            }
            Notification::PlaybackFailed { title, reason } => embeds::create_error_embed(
                "Error de reproducción",
                &format!("No se pudo reproducir **{}**: {}", title, reason),
            ),
            Notification::IdleDisconnect { idle } => embeds::create_idle_disconnect_embed(*idle),
        };

        match self
            .channel_id
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await
        {
            Ok(_) => debug!("📨 Notificación enviada a canal {}", self.channel_id),
            Err(e) => warn!(
                "No se pudo enviar notificación a canal {}: {:?}",
                self.channel_id, e
            ),
        }
    }
}
