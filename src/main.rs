use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info, warn};

use guild_music::{
    audio::{SessionRegistry, SongbirdConnector},
    bot::{MusicBot, MusicController, MusicControllerKey, SessionRegistryKey},
    config::Config,
    sources::YtDlpResolver,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guild_music=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Guild Music v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!("{}", config.summary());

    let resolver = YtDlpResolver::new(
        config.ytdlp_path.clone(),
        config.cookies_file.clone(),
        config.search_timeout,
    );
    if let Err(e) = resolver.verify().await {
        warn!("⚠️ yt-dlp no disponible, /play fallará: {:#}", e);
    }

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let songbird = Songbird::serenity();
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(MusicBot)
        .register_songbird_with(songbird.clone())
        .await?;

    // El registro usa la caché del cliente para contar oyentes
    let connector = Arc::new(SongbirdConnector::new(songbird, client.cache.clone()));
    let registry = Arc::new(SessionRegistry::new(connector, config.session_config()));
    let controller = Arc::new(MusicController::new(
        registry.clone(),
        Arc::new(resolver),
        config.max_song_duration,
    ));

    {
        let mut data = client.data.write().await;
        data.insert::<SessionRegistryKey>(registry.clone());
        data.insert::<MusicControllerKey>(controller);
    }

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        registry.remove_all().await;
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
