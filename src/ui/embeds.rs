use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::audio::{format_duration, Track};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Guild Music";

/// Crea un embed para mostrar la canción actual
pub fn create_now_playing_embed(track: &Track, up_next: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(format!("**[{}]({})**", track.title(), track.webpage_url()))
        .color(colors::SUCCESS_GREEN)
        .field("⏱️ Duración", track.duration_formatted(), true)
        .field("🎤 Artista", track.uploader().unwrap_or("Desconocido"), true);

    if let Some(user) = track.requested_by() {
        embed = embed.field("👤 Solicitado por", format!("<@{}>", user), true);
    }

    let up_next = match up_next {
        0 => "Nada más en la cola".to_string(),
        1 => "1 canción en la cola".to_string(),
        n => format!("{} canciones en la cola", n),
    };
    embed = embed.field("📋 A continuación", up_next, false);

    if let Some(thumbnail) = track.thumbnail() {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de error
pub fn create_error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_idle_disconnect_embed(idle: Duration) -> CreateEmbed {
    CreateEmbed::default()
        .title("👋 Desconectado por inactividad")
        .description(format!(
            "No hubo música durante {}. ¡Usa /play para volver a llamarme!",
            format_duration(idle)
        ))
        .color(colors::NEUTRAL_GRAY)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use serenity::model::id::UserId;

    fn json(embed: CreateEmbed) -> Value {
        serde_json::to_value(embed).unwrap()
    }

    fn field<'a>(embed: &'a Value, name: &str) -> Option<&'a str> {
        embed["fields"]
            .as_array()?
            .iter()
            .find(|f| f["name"] == name)
            .and_then(|f| f["value"].as_str())
    }

    #[test]
    fn test_now_playing_embed() {
        let track = Track::new("Song", "https://cdn/song", "https://example.com/song")
            .with_duration(185)
            .with_uploader("Artist")
            .with_thumbnail("https://img/song.jpg")
            .with_requested_by(UserId::new(42));

        let embed = json(create_now_playing_embed(&track, 3));

        assert_eq!(embed["title"], "🎵 Reproduciendo Ahora");
        assert_eq!(embed["description"], "**[Song](https://example.com/song)**");
        assert_eq!(field(&embed, "⏱️ Duración"), Some("3:05"));
        assert_eq!(field(&embed, "🎤 Artista"), Some("Artist"));
        assert_eq!(field(&embed, "👤 Solicitado por"), Some("<@42>"));
        assert_eq!(field(&embed, "📋 A continuación"), Some("3 canciones en la cola"));
        assert_eq!(embed["thumbnail"]["url"], "https://img/song.jpg");
    }

    #[test]
    fn test_now_playing_embed_minimal_track() {
        let track = Track::new("Radio", "https://cdn/radio", "https://example.com/radio");

        let embed = json(create_now_playing_embed(&track, 0));

        assert_eq!(field(&embed, "⏱️ Duración"), Some("🔴 En vivo"));
        assert_eq!(field(&embed, "🎤 Artista"), Some("Desconocido"));
        assert_eq!(field(&embed, "👤 Solicitado por"), None);
        assert_eq!(field(&embed, "📋 A continuación"), Some("Nada más en la cola"));
        assert!(embed.get("thumbnail").is_none());
    }

    #[test]
    fn test_error_and_idle_embeds() {
        let error = json(create_error_embed("Error de reproducción", "stream roto"));
        assert_eq!(error["title"], "❌ Error de reproducción");
        assert_eq!(error["color"], 0xDC3545);

        let idle = json(create_idle_disconnect_embed(Duration::from_secs(300)));
        assert!(idle["description"].as_str().unwrap().contains("5:00"));
    }
}
