pub mod validators;
pub mod ytdlp;

use async_trait::async_trait;
use serenity::model::id::UserId;

use crate::{audio::Track, error::Result};

pub use ytdlp::YtDlpResolver;

/// Convierte una consulta (URL o `ytsearch:` término) en una pista reproducible
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str, requested_by: Option<UserId>) -> Result<Track>;
}
