use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serenity::model::id::UserId;
use std::{path::PathBuf, time::Duration};
use tracing::{debug, info, warn};

use super::TrackResolver;
use crate::{
    audio::Track,
    error::{MusicError, Result},
};

/// Resuelve consultas con `yt-dlp -J`
pub struct YtDlpResolver {
    binary: String,
    cookies_file: Option<PathBuf>,
    timeout: Duration,
}

/// Subconjunto del JSON de `yt-dlp -J` que interesa
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    uploader: Option<String>,
    entries: Option<Vec<YtDlpInfo>>,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>, cookies_file: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            cookies_file,
            timeout,
        }
    }

    /// Comprueba que el binario existe y responde
    pub async fn verify(&self) -> anyhow::Result<String> {
        let output = tokio::process::Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("no se pudo ejecutar {}", self.binary))?;

        if !output.status.success() {
            anyhow::bail!("{} --version terminó con {}", self.binary, output.status);
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("✅ yt-dlp disponible: {}", version);
        Ok(version)
    }

    async fn extract(&self, query: &str) -> anyhow::Result<Vec<u8>> {
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args([
            "-J",
            "--no-playlist",
            "--no-warnings",
            "--default-search", "ytsearch",
            "-f", "bestaudio/best",
            "--socket-timeout", "30",
            "--retries", "3",
        ]);

        if let Some(cookies) = &self.cookies_file {
            cmd.arg("--cookies").arg(cookies);
        }

        cmd.arg(query).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "yt-dlp no respondió en {}",
                    humantime::format_duration(self.timeout)
                )
            })?
            .with_context(|| format!("no se pudo ejecutar {}", self.binary))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp info failed: {}", error.trim());
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str, requested_by: Option<UserId>) -> Result<Track> {
        debug!("🔍 Resolviendo con yt-dlp: {}", query);

        let raw = self.extract(query).await.map_err(|e| {
            warn!("❌ yt-dlp falló para {:?}: {:#}", query, e);
            MusicError::Download(e.to_string())
        })?;

        let track = parse_track(&raw, query)?;
        info!("✅ Resuelto: {} ({})", track.title(), track.duration_formatted());

        Ok(match requested_by {
            Some(user) => track.with_requested_by(user),
            None => track,
        })
    }
}

/// Construye la pista desde la salida de `yt-dlp -J`; una búsqueda o playlist
/// aporta su primera entrada
fn parse_track(raw: &[u8], query: &str) -> Result<Track> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(MusicError::Download(format!(
            "yt-dlp no devolvió información para: {}",
            query
        )));
    }

    let mut info: YtDlpInfo = serde_json::from_slice(raw)
        .map_err(|e| MusicError::Download(format!("Metadatos inválidos de yt-dlp: {}", e)))?;

    if let Some(entries) = info.entries.take() {
        info = entries
            .into_iter()
            .next()
            .ok_or_else(|| MusicError::Download("La playlist está vacía".to_string()))?;
    }

    let stream_url = info
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| MusicError::Download("No se encontró URL de streaming".to_string()))?;

    let mut track = Track::new(
        info.title.unwrap_or_else(|| "Unknown Title".to_string()),
        stream_url,
        info.webpage_url.unwrap_or_else(|| query.to_string()),
    )
    .with_duration(info.duration.map_or(0, |secs| secs.max(0.0).round() as u64));

    if let Some(thumbnail) = info.thumbnail {
        track = track.with_thumbnail(thumbnail);
    }
    if let Some(uploader) = info.uploader {
        track = track.with_uploader(uploader);
    }

    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_single_video() {
        let raw = br#"{
            "title": "Never Gonna Give You Up",
            "url": "https://rr1.googlevideo.com/audio",
            "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "duration": 212.6,
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg",
            "uploader": "Rick Astley"
        }"#;

        let track = parse_track(raw, "rick").unwrap();
        assert_eq!(track.title(), "Never Gonna Give You Up");
        assert_eq!(track.stream_url(), "https://rr1.googlevideo.com/audio");
        assert_eq!(track.webpage_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(track.duration(), 213);
        assert_eq!(track.thumbnail(), Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg"));
        assert_eq!(track.uploader(), Some("Rick Astley"));
        assert_eq!(track.requested_by(), None);
    }

    #[test]
    fn test_parse_search_takes_first_entry() {
        let raw = br#"{
            "_type": "playlist",
            "title": "ytsearch:lofi",
            "entries": [
                {"title": "Lofi 1", "url": "https://cdn/1", "duration": 60},
                {"title": "Lofi 2", "url": "https://cdn/2", "duration": 90}
            ]
        }"#;

        let track = parse_track(raw, "ytsearch:lofi").unwrap();
        assert_eq!(track.title(), "Lofi 1");
        assert_eq!(track.duration(), 60);
        // Sin webpage_url se usa la consulta
        assert_eq!(track.webpage_url(), "ytsearch:lofi");
    }

    #[test]
    fn test_parse_defaults() {
        let raw = br#"{"url": "https://cdn/live"}"#;

        let track = parse_track(raw, "https://example.com/live").unwrap();
        assert_eq!(track.title(), "Unknown Title");
        assert_eq!(track.duration(), 0);
        assert!(track.is_live());
    }

    #[test]
    fn test_parse_rejects_bad_output() {
        let cases: [(&[u8], &str); 5] = [
            (b"", "no devolvió"),
            (b"  \n", "no devolvió"),
            (b"not json", "Metadatos inválidos"),
            (br#"{"entries": []}"#, "playlist está vacía"),
            (br#"{"title": "Sin stream", "url": ""}"#, "URL de streaming"),
        ];

        for (raw, expected) in cases {
            match parse_track(raw, "q") {
                Err(MusicError::Download(message)) => {
                    assert!(message.contains(expected), "{message:?} no contiene {expected:?}")
                }
                other => panic!("se esperaba Download para {:?}, fue {:?}", raw, other),
            }
        }
    }

    #[tokio::test]
    async fn test_missing_binary_maps_to_download_error() {
        let resolver = YtDlpResolver::new(
            "/nonexistent/yt-dlp-binary",
            None,
            Duration::from_secs(5),
        );

        let result = resolver.resolve("ytsearch:anything", None).await;
        assert!(matches!(result, Err(MusicError::Download(_))));
        assert!(resolver.verify().await.is_err());
    }
}
