//! 配信解決: チャンネルID → 動画ID → activeLiveChatId

use std::future::Future;

use super::{client::YouTubeClient, errors::YouTubeError, video_id::extract_video_id};

/// 自動検索の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamLookup {
    /// 配信中の公開ライブが見つかった
    Live(String),
    /// 見つからなかった（限定公開配信などのため手動入力が必要）
    ManualInputRequired,
}

/// 解決済みの接続先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub video_id: String,
    pub live_chat_id: String,
}

pub struct StreamResolver<'a> {
    client: &'a YouTubeClient,
    channel_id: &'a str,
}

impl<'a> StreamResolver<'a> {
    pub fn new(client: &'a YouTubeClient, channel_id: &'a str) -> Self {
        Self { client, channel_id }
    }

    /// 配信中の公開ライブを検索する
    pub async fn find_live_video(&self) -> Result<StreamLookup, YouTubeError> {
        match self.client.search_live_video(self.channel_id).await? {
            Some(video_id) => Ok(StreamLookup::Live(video_id)),
            None => Ok(StreamLookup::ManualInputRequired),
        }
    }

    /// 動画IDからチャットIDを解決する
    pub async fn resolve_chat(&self, video_id: &str) -> Result<String, YouTubeError> {
        self.client.get_live_chat_id(video_id).await
    }

    /// 自動検索 → （必要なら手動入力）→ チャットID解決までを行う
    ///
    /// `prompt`は手動入力が必要な場合にだけ呼ばれ、入力文字列（URLまたはID）を返す。
    /// `None`や空文字はキャンセル扱い。再試行はしない。
    pub async fn resolve<F, Fut>(&self, prompt: F) -> Result<ResolvedStream, YouTubeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<String>>,
    {
        let video_id = match self.find_live_video().await? {
            StreamLookup::Live(video_id) => video_id,
            StreamLookup::ManualInputRequired => {
                log::info!("No public stream found, asking operator for a video URL or ID");
                let input = prompt()
                    .await
                    .map(|raw| raw.trim().to_string())
                    .filter(|raw| !raw.is_empty())
                    .ok_or(YouTubeError::UserCancelled)?;
                let video_id = extract_video_id(&input);
                log::info!("Using manually entered video: {}", video_id);
                video_id
            }
        };

        let live_chat_id = self.resolve_chat(&video_id).await?;
        Ok(ResolvedStream {
            video_id,
            live_chat_id,
        })
    }
}
