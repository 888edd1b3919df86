use regex::Regex;
use std::sync::LazyLock;

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^https?://",
        r"(?:(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,6}\.?|",
        r"localhost|",
        r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
        r"(?::\d+)?",
        r"(?:/?|[/?]\S+)$",
    ))
    .expect("URL_REGEX válida")
});

static YOUTUBE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.|music\.|m\.)?(youtube\.com|youtu\.be)/.+")
        .expect("YOUTUBE_REGEX válida")
});

const MAX_QUERY_CHARS: usize = 200;

pub fn is_url(text: &str) -> bool {
    URL_REGEX.is_match(text)
}

pub fn is_youtube_url(text: &str) -> bool {
    YOUTUBE_REGEX.is_match(text)
}

/// Colapsa espacios y recorta a 200 caracteres
pub fn sanitize_search_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_QUERY_CHARS)
        .collect()
}

/// Las URLs pasan tal cual; el resto se busca en YouTube
pub fn to_search_query(query: &str) -> String {
    let query = query.trim();
    if is_url(query) {
        query.to_string()
    } else {
        format!("ytsearch:{}", sanitize_search_query(query))
    }
}

/// Duración en segundos; 0 es un directo y se acepta
pub fn validate_duration(duration: u64, max: u64) -> bool {
    duration <= max
}
