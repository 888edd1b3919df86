//! # Bot Module
//!
//! Capa de Discord: el [`EventHandler`] que reacciona a la conexión y a los
//! cambios de voz del propio bot, las claves del `TypeMap` por las que la
//! capa de comandos encuentra el registro de sesiones y el controlador, y el
//! notificador que publica embeds en el canal de texto de cada guild.
//!
//! Los comandos de barra viven fuera de este crate. Esa capa es la que conoce
//! el canal de texto de la interacción, así que es ella quien construye el
//! [`ChannelNotifier`] y lo pasa a [`MusicController::play`]; la sesión lo
//! conserva para los anuncios de las pistas siguientes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use guild_music::bot::{ChannelNotifier, MusicControllerKey};
//! use serenity::all::{ChannelId, Context, GuildId, UserId};
//! use std::sync::Arc;
//!
//! async fn play_command(
//!     ctx: &Context,
//!     guild_id: GuildId,
//!     voice_channel: ChannelId,
//!     text_channel: ChannelId,
//!     user: UserId,
//!     query: &str,
//! ) {
//!     let Some(controller) = ctx.data.read().await.get::<MusicControllerKey>().cloned() else {
//!         return;
//!     };
//!     let notifier = Arc::new(ChannelNotifier::new(ctx.http.clone(), text_channel));
//!     let result = controller
//!         .play(guild_id, voice_channel, Some(notifier), query, user)
//!         .await;
//!     if let Err(e) = result {
//!         tracing::warn!("❌ /play falló: {}", e);
//!     }
//! }
//! ```

use serenity::{
    all::{Context, EventHandler, Ready, VoiceState},
    async_trait,
    prelude::TypeMapKey,
};
use std::sync::Arc;
use tracing::{info, warn};

pub mod controller;
pub mod notifier;

pub use controller::{Enqueued, MusicController};
pub use notifier::ChannelNotifier;

use crate::audio::SessionRegistry;

pub struct SessionRegistryKey;

impl TypeMapKey for SessionRegistryKey {
    type Value = Arc<SessionRegistry>;
}

pub struct MusicControllerKey;

impl TypeMapKey for MusicControllerKey {
    type Value = Arc<MusicController>;
}

/// Handler de eventos del gateway; el registro de sesiones vive en el
/// `TypeMap` del cliente bajo [`SessionRegistryKey`]
pub struct MusicBot;

#[async_trait]
impl EventHandler for MusicBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());
    }

    /// Si expulsan o desconectan al bot del canal de voz, la sesión de esa
    /// guild se cierra y se elimina
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            return;
        };

        let registry = ctx.data.read().await.get::<SessionRegistryKey>().cloned();
        match registry {
            Some(registry) => {
                info!("🔌 Bot desconectado en guild {}", guild_id);
                registry.remove(guild_id).await;
            }
            None => warn!("Registro de sesiones no inicializado"),
        }
    }
}
