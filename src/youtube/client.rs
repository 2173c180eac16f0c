use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::{errors::YouTubeError, types::*};
use crate::config::http_timeout;
use crate::util::{mask_api_key, truncate_for_log};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// 各エンドポイントのクォータコスト（units）
pub const SEARCH_QUOTA_COST: u64 = 100;
pub const VIDEOS_QUOTA_COST: u64 = 1;
pub const CHAT_MESSAGES_QUOTA_COST: u64 = 5;

/// YouTube Data API v3 クライアント（APIキー認証、読み取り専用）
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(api_key: String) -> Result<Self, YouTubeError> {
        Self::with_base_url(api_key, DEFAULT_API_BASE)
    }

    /// ベースURLを指定して作成（モックサーバー・プロキシ用）
    pub fn with_base_url(api_key: String, base_url: &str) -> Result<Self, YouTubeError> {
        let client = Client::builder().timeout(http_timeout()).build()?;

        log::debug!(
            "YouTube client created (base: {}, key: {})",
            base_url,
            mask_api_key(&api_key)
        );

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// チャンネルで配信中の公開ライブを検索し、最初の動画IDを返す
    ///
    /// 配信中のライブが無い場合は`Ok(None)`（手動入力へのフォールバック）
    pub async fn search_live_video(&self, channel_id: &str) -> Result<Option<String>, YouTubeError> {
        log::info!(
            "Searching live broadcast on channel: {} (quota cost: {} units)",
            channel_id,
            SEARCH_QUOTA_COST
        );

        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "id"),
                ("channelId", channel_id),
                ("type", "video"),
                ("eventType", "live"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let response = check_status(response, YouTubeError::NoLiveStream).await?;
        let data: SearchResponse = parse_body(response).await?;

        // 並び順はAPIの返却順のまま、先頭を採用
        let video_id = data.items.into_iter().next().and_then(|item| item.id.video_id);

        match &video_id {
            Some(id) => log::info!("Auto-detected public stream: {}", id),
            None => log::info!("No public live stream found on channel {}", channel_id),
        }
        Ok(video_id)
    }

    /// 動画IDからactiveLiveChatIdを取得
    pub async fn get_live_chat_id(&self, video_id: &str) -> Result<String, YouTubeError> {
        log::info!(
            "Fetching live chat ID for video: {} (quota cost: {} unit)",
            video_id,
            VIDEOS_QUOTA_COST
        );

        let url = format!("{}/videos", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "liveStreamingDetails"),
                ("id", video_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let response = check_status(response, YouTubeError::VideoNotFound).await?;
        let data: VideoResponse = parse_body(response).await?;

        let item = data.items.into_iter().next().ok_or_else(|| {
            log::warn!("Video not found: {}", video_id);
            YouTubeError::VideoNotFound
        })?;

        let chat_id = item
            .live_streaming_details
            .and_then(|details| details.active_live_chat_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                log::warn!("Video {} has no active live chat", video_id);
                YouTubeError::NoActiveChat
            })?;

        log::info!("Live chat ID retrieved: {}", chat_id);
        Ok(chat_id)
    }

    /// ライブチャットメッセージ取得
    ///
    /// `page_token`が`None`の場合はサーバー既定の位置（ライブの最新側）から取得する
    pub async fn get_live_chat_messages(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatMessagesResponse, YouTubeError> {
        log::debug!(
            "Fetching live chat messages for chat ID: {} (quota cost: ~{} units)",
            live_chat_id,
            CHAT_MESSAGES_QUOTA_COST
        );

        let url = format!("{}/liveChat/messages", self.base_url);

        let mut query_params = vec![
            ("liveChatId", live_chat_id),
            ("part", "snippet"),
            ("key", self.api_key.as_str()),
        ];

        // pageTokenがある場合は末尾に追加
        if let Some(token) = page_token {
            query_params.push(("pageToken", token));
            log::debug!("Using page token: {}", token);
        }

        let response = self.client.get(&url).query(&query_params).send().await?;
        let response = check_status(response, YouTubeError::LiveChatEnded).await?;

        let data: LiveChatMessagesResponse = parse_body(response).await?;
        log::info!(
            "Fetched {} messages (polling interval hint: {}ms)",
            data.items.len(),
            data.polling_interval_millis
        );
        Ok(data)
    }
}

/// 非200レスポンスをエラーに分類する
///
/// 404はエンドポイントごとに意味が異なるため`not_found`で受け取る
async fn check_status(response: Response, not_found: YouTubeError) -> Result<Response, YouTubeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let error = classify_error(status, &body, not_found);
    log::error!(
        "YouTube API error - status: {}, body: {}",
        status,
        truncate_for_log(&body, 300)
    );
    Err(error)
}

/// 本文をJSONとして解釈する。壊れた本文は通信エラーではなく`ParseError`にする
async fn parse_body<T: DeserializeOwned>(response: Response) -> Result<T, YouTubeError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        log::error!(
            "Failed to parse YouTube API response: {} (body: {})",
            e,
            truncate_for_log(&body, 300)
        );
        YouTubeError::ParseError(e.to_string())
    })
}

fn classify_error(status: StatusCode, body: &str, not_found: YouTubeError) -> YouTubeError {
    let parsed = ApiErrorResponse::parse(body);
    let has_reason = |reason: &str| match &parsed {
        Some(p) => p.has_reason(reason),
        None => body.contains(reason),
    };

    match status {
        StatusCode::BAD_REQUEST if has_reason("keyInvalid") => YouTubeError::InvalidApiKey,
        StatusCode::UNAUTHORIZED => YouTubeError::InvalidApiKey,
        StatusCode::FORBIDDEN => {
            if has_reason("quotaExceeded") {
                YouTubeError::QuotaExceeded
            } else if has_reason("rateLimitExceeded") {
                YouTubeError::RateLimitExceeded
            } else if has_reason("liveChatDisabled") {
                YouTubeError::LiveChatDisabled
            } else if has_reason("liveChatEnded") {
                YouTubeError::LiveChatEnded
            } else {
                YouTubeError::InvalidApiKey
            }
        }
        StatusCode::NOT_FOUND => not_found,
        status => {
            let message = parsed
                .as_ref()
                .map(|p| p.error.message.clone())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| truncate_for_log(body, 200));
            YouTubeError::ApiError {
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> YouTubeClient {
        YouTubeClient::with_base_url("test-key".to_string(), &server.url()).unwrap()
    }

    #[tokio::test]
    async fn test_search_live_video_takes_first_item() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("channelId".into(), "UC123".into()),
                Matcher::UrlEncoded("eventType".into(), "live".into()),
                Matcher::UrlEncoded("type".into(), "video".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": [{"id": {"videoId": "first"}}, {"id": {"videoId": "second"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let video_id = client.search_live_video("UC123").await.unwrap();

        assert_eq!(video_id.as_deref(), Some("first"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_live_video_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        assert_eq!(client.search_live_video("UC123").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_live_chat_id() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "vid1".into()),
                Matcher::UrlEncoded("part".into(), "liveStreamingDetails".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"items": [{"liveStreamingDetails": {"activeLiveChatId": "chat-1"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        assert_eq!(client.get_live_chat_id("vid1").await.unwrap(), "chat-1");
    }

    #[tokio::test]
    async fn test_get_live_chat_id_without_items() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.get_live_chat_id("nope").await.unwrap_err();
        assert!(matches!(err, YouTubeError::VideoNotFound));
        assert_eq!(err.to_string(), "Invalid Video ID");
    }

    #[tokio::test]
    async fn test_get_live_chat_id_without_active_chat() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": [{"liveStreamingDetails": {"actualEndTime": "2024-01-01T00:00:00Z"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.get_live_chat_id("ended").await.unwrap_err();
        assert!(matches!(err, YouTubeError::NoActiveChat));
    }

    #[tokio::test]
    async fn test_get_live_chat_messages_with_page_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/liveChat/messages")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("liveChatId".into(), "chat-1".into()),
                Matcher::UrlEncoded("pageToken".into(), "tok-1".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{
                    "pollingIntervalMillis": 6000,
                    "nextPageToken": "tok-2",
                    "items": [{"id": "m1", "snippet": {"displayMessage": "level 12345678"}}]
                }"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let page = client
            .get_live_chat_messages("chat-1", Some("tok-1"))
            .await
            .unwrap();

        assert_eq!(page.next_page_token.as_deref(), Some("tok-2"));
        assert_eq!(page.polling_interval_millis, 6000);
        assert_eq!(page.items[0].snippet.display_message, "level 12345678");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/liveChat/messages")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.get_live_chat_messages("chat-1", None).await.unwrap_err();

        assert!(matches!(err, YouTubeError::ParseError(_)));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_chat_error_classification() {
        let cases = [
            (
                403,
                r#"{"error": {"code": 403, "message": "q", "errors": [{"reason": "quotaExceeded"}]}}"#,
                "quota",
            ),
            (
                403,
                r#"{"error": {"code": 403, "message": "r", "errors": [{"reason": "rateLimitExceeded"}]}}"#,
                "rate",
            ),
            (
                403,
                r#"{"error": {"code": 403, "message": "d", "errors": [{"reason": "liveChatDisabled"}]}}"#,
                "disabled",
            ),
            (404, r#"{"error": {"code": 404, "message": "gone", "errors": []}}"#, "ended"),
            (400, "reason: keyInvalid", "key"),
            (500, r#"{"error": {"code": 500, "message": "backend error"}}"#, "api"),
        ];

        for (status, body, expected) in cases {
            let mut server = mockito::Server::new_async().await;
            let _mock = server
                .mock("GET", "/liveChat/messages")
                .match_query(Matcher::Any)
                .with_status(status)
                .with_body(body)
                .create_async()
                .await;

            let client = client_for(&server);
            let err = client.get_live_chat_messages("chat-1", None).await.unwrap_err();

            let matched = match expected {
                "quota" => matches!(err, YouTubeError::QuotaExceeded),
                "rate" => matches!(err, YouTubeError::RateLimitExceeded),
                "disabled" => matches!(err, YouTubeError::LiveChatDisabled),
                "ended" => matches!(err, YouTubeError::LiveChatEnded),
                "key" => matches!(err, YouTubeError::InvalidApiKey),
                "api" => matches!(
                    &err,
                    YouTubeError::ApiError { status: 500, message } if message == "backend error"
                ),
                _ => false,
            };
            assert!(matched, "status {} produced unexpected error: {:?}", status, err);
        }
    }

    #[tokio::test]
    async fn test_transport_error() {
        // 接続できないポート
        let client = YouTubeClient::with_base_url("test-key".to_string(), "http://127.0.0.1:9").unwrap();
        let err = client.search_live_video("UC123").await.unwrap_err();
        assert!(err.is_transport());
    }
}
