use thiserror::Error;

pub type InspectResult<T> = Result<T, InspectError>;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Any status other than 200 or a followed redirect.
    #[error("http error: {status} ({url})")]
    Transport { status: u16, url: String },

    #[error("too many redirects (limit {limit}) while fetching {url}")]
    RedirectLoop { url: String, limit: usize },

    #[error("http {status} redirect without a Location header ({url})")]
    MissingLocation { status: u16, url: String },

    #[error("no such package: {0}")]
    PackageNotFound(String),

    #[error("Malformed index: {0}")]
    MalformedIndex(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<tempfile::PersistError> for InspectError {
    fn from(err: tempfile::PersistError) -> Self {
        InspectError::Io(err.error)
    }
}

impl From<quick_xml::events::attributes::AttrError> for InspectError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        InspectError::Xml(quick_xml::Error::InvalidAttr(err))
    }
}

impl InspectError {
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            InspectError::Http(_)
                | InspectError::Transport { .. }
                | InspectError::RedirectLoop { .. }
                | InspectError::MissingLocation { .. }
        )
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            InspectError::PackageNotFound(_)
                | InspectError::InvalidUrl(_)
                | InspectError::ConfigError(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, InspectError::PackageNotFound(_))
    }

    /// HTTP status carried by a transport failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            InspectError::Transport { status, .. } => Some(*status),
            InspectError::MissingLocation { status, .. } => Some(*status),
            InspectError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            InspectError::ConfigError(_) => 2,
            _ => 1,
        }
    }
}
