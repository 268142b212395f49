use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComicSaverError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Pattern error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

impl ComicSaverError {
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script(msg.into())
    }

    pub fn selector(msg: impl Into<String>) -> Self {
        Self::Selector(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ComicSaverError>;
