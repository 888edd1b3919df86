//! # Audio Module
//!
//! Reproducción por guild: pistas, cola, la máquina de estados de cada
//! sesión y el registro que las reparte por guild.
//!
//! ## Architecture
//!
//! ### [`session`] - Guild Session
//! - Serializa comandos, fin de pista y temporizador de inactividad
//! - Avanza la cola con reintento acotado si una pista falla
//! - Desconecta tras el tiempo de inactividad configurado
//!
//! ### [`queue`] - Queue Management
//! - Cola acotada con modos loop / loop-queue e historial
//!
//! ### [`player`] - Voice Boundary
//! - Traits [`VoiceConnector`] y [`Player`]; [`songbird_player`] los
//!   implementa sobre songbird
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use guild_music::audio::{SessionConfig, SessionRegistry, VoiceConnector};
//! use serenity::all::{ChannelId, GuildId};
//! use std::sync::Arc;
//!
//! # async fn example(connector: Arc<dyn VoiceConnector>, track: guild_music::audio::Track) -> guild_music::error::Result<()> {
//! let registry = SessionRegistry::new(connector, SessionConfig::default());
//! let session = registry.get_or_create(GuildId::new(123456789));
//!
//! session.connect(ChannelId::new(42)).await?;
//! session.enqueue_and_maybe_start(track).await?;
//! session.skip().await?;
//! # Ok(())
//! # }
//! ```

pub mod notifier;
pub mod player;
pub mod queue;
pub mod registry;
pub mod session;
pub mod songbird_player;
pub mod track;

#[cfg(test)]
pub mod testing;

pub use notifier::{Notification, Notifier};
pub use player::{Player, TrackEndCallback, VoiceConnector};
pub use queue::{MusicQueue, QueuePage};
pub use registry::SessionRegistry;
pub use session::{GuildSession, SessionConfig, SessionStatus, SkipVote};
pub use songbird_player::{SongbirdConnector, SongbirdPlayer};
pub use track::{format_duration, Track};
