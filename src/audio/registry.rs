use dashmap::DashMap;
use futures::future::join_all;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    player::VoiceConnector,
    session::{GuildSession, SessionConfig},
};

/// Una [`GuildSession`] por guild, creada bajo demanda
pub struct SessionRegistry {
    sessions: DashMap<GuildId, GuildSession>,
    connector: Arc<dyn VoiceConnector>,
    config: SessionConfig,
}

impl SessionRegistry {
    pub fn new(connector: Arc<dyn VoiceConnector>, config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            connector,
            config,
        }
    }

    pub fn get_or_create(&self, guild_id: GuildId) -> GuildSession {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("🆕 Nueva sesión para guild {}", guild_id);
                GuildSession::new(guild_id, self.config.clone(), self.connector.clone())
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<GuildSession> {
        self.sessions.get(&guild_id).map(|s| s.clone())
    }

    /// Elimina la sesión del registro y la cierra (desconecta y bloquea
    /// nuevas conexiones desde clones que sigan vivos)
    pub async fn remove(&self, guild_id: GuildId) -> bool {
        // Sacarla del mapa antes del await: un `get_or_create` concurrente
        // ya recibe una sesión nueva
        let Some((_, session)) = self.sessions.remove(&guild_id) else {
            return false;
        };

        // Los clones que siguen vivos quedan cerrados y no reconectan
        session.close().await;
        info!("🧹 Sesión eliminada para guild {}", guild_id);
        true
    }

    /// Drena y desconecta todas las sesiones (apagado del proceso)
    pub async fn remove_all(&self) -> usize {
        let guilds: Vec<GuildId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        let removed = join_all(guilds.into_iter().map(|guild_id| self.remove(guild_id)))
            .await
            .into_iter()
            .filter(|removed| *removed)
            .count();

        info!("🧹 {} sesiones cerradas", removed);
        removed
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        session::SessionStatus,
        testing::{track, FakeConnector},
    };
    use crate::error::MusicError;
    use pretty_assertions::assert_eq;
    use serenity::model::id::ChannelId;

    fn registry(connector: &Arc<FakeConnector>) -> SessionRegistry {
        SessionRegistry::new(connector.clone(), SessionConfig::default())
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_session() {
        let connector = FakeConnector::new();
        let registry = registry(&connector);
        let guild = GuildId::new(1);

        let first = registry.get_or_create(guild);
        first.enqueue_and_maybe_start(track("A", 10)).await.unwrap();
        let second = registry.get_or_create(guild);

        assert_eq!(second.queue_len().await, 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_removed_session_cannot_reconnect() {
        let connector = FakeConnector::new();
        let registry = registry(&connector);
        let guild = GuildId::new(1);
        let held = registry.get_or_create(guild);
        held.connect(ChannelId::new(10)).await.unwrap();

        assert!(registry.remove(guild).await);

        assert_eq!(held.connect(ChannelId::new(10)).await, Err(MusicError::SessionClosed));
        assert_eq!(
            held.enqueue_and_maybe_start(track("A", 10)).await,
            Err(MusicError::SessionClosed)
        );
        assert_eq!(connector.connects(), 1);
        assert_eq!(connector.channel(), None);

        // Un nuevo pedido para la guild recibe una sesión utilizable
        let fresh = registry.get_or_create(guild);
        fresh.connect(ChannelId::new(10)).await.unwrap();
        assert!(fresh.is_connected().await);
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_guilds_are_isolated() {
        let connector = FakeConnector::new();
        let registry = registry(&connector);

        registry
            .get_or_create(GuildId::new(1))
            .enqueue_and_maybe_start(track("A", 10))
            .await
            .unwrap();

        assert_eq!(registry.get_or_create(GuildId::new(2)).queue_len().await, 0);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_disconnects_before_dropping() {
        let connector = FakeConnector::new();
        let registry = registry(&connector);
        let guild = GuildId::new(1);
        let session = registry.get_or_create(guild);
        session.connect(ChannelId::new(5)).await.unwrap();

        assert!(registry.remove(guild).await);
        assert!(!registry.remove(guild).await);

        assert_eq!(connector.disconnects(), 1);
        assert_eq!(session.status().await, SessionStatus::Disconnected);
        assert!(registry.get(guild).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_all_drains_every_session() {
        let connector = FakeConnector::new();
        let registry = registry(&connector);
        for id in 1..=3 {
            registry
                .get_or_create(GuildId::new(id))
                .connect(ChannelId::new(100 + id))
                .await
                .unwrap();
        }

        assert_eq!(registry.remove_all().await, 3);
        assert!(registry.is_empty());
        assert_eq!(connector.disconnects(), 3);
    }
}
