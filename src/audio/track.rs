use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::time::Duration;

/// Descriptor inmutable de una pista reproducible
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    title: String,
    stream_url: String,
    webpage_url: String,
    duration: u64,
    thumbnail: Option<String>,
    uploader: Option<String>,
    requested_by: Option<UserId>,
    added_at: DateTime<Utc>,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        stream_url: impl Into<String>,
        webpage_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            stream_url: stream_url.into(),
            webpage_url: webpage_url.into(),
            duration: 0,
            thumbnail: None,
            uploader: None,
            requested_by: None,
            added_at: Utc::now(),
        }
    }

    // Builders

    /// Duración en segundos; 0 significa desconocida o en vivo
    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.duration = seconds;
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_uploader(mut self, uploader: impl Into<String>) -> Self {
        self.uploader = Some(uploader.into());
        self
    }

    pub fn with_requested_by(mut self, user_id: UserId) -> Self {
        self.requested_by = Some(user_id);
        self
    }

    // Getters

    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }
    pub fn webpage_url(&self) -> &str {
        &self.webpage_url
    }
    pub fn duration(&self) -> u64 {
        self.duration
    }
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }
    pub fn uploader(&self) -> Option<&str> {
        self.uploader.as_deref()
    }
    pub fn requested_by(&self) -> Option<UserId> {
        self.requested_by
    }
    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    pub fn is_live(&self) -> bool {
        self.duration == 0
    }

    /// Duración en formato `M:SS` o `H:MM:SS`
    pub fn duration_formatted(&self) -> String {
        if self.is_live() {
            return "🔴 En vivo".to_string();
        }
        format_duration(Duration::from_secs(self.duration))
    }
}

/// Formatea una duración como `M:SS` o `H:MM:SS`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, remainder) = (total / 3600, total % 3600);
    let (minutes, seconds) = (remainder / 60, remainder % 60);

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
