use thiserror::Error;

#[derive(Error, Debug)]
pub enum YouTubeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API key is invalid or missing")]
    InvalidApiKey,

    #[error("No public live stream found on the channel")]
    NoLiveStream,

    #[error("Invalid Video ID")]
    VideoNotFound,

    #[error("Video has no active live chat")]
    NoActiveChat,

    #[error("Live chat is disabled for this video")]
    LiveChatDisabled,

    #[error("Live chat has ended")]
    LiveChatEnded,

    #[error("Quota exceeded - please try again tomorrow")]
    QuotaExceeded,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Connection Cancelled")]
    UserCancelled,

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl YouTubeError {
    /// ネットワーク/HTTP層の失敗かどうか
    pub fn is_transport(&self) -> bool {
        matches!(self, YouTubeError::HttpError(_))
    }
}

impl From<YouTubeError> for String {
    fn from(err: YouTubeError) -> String {
        err.to_string()
    }
}
