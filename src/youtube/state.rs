use std::time::Duration;

use super::client::CHAT_MESSAGES_QUOTA_COST;
use crate::config::PollSchedule;

/// 1回の接続におけるポーリング状態
///
/// チャットIDは接続中不変。ページトークンは取得ごとに置き換え、巻き戻さない。
#[derive(Debug, Clone)]
pub struct PollingState {
    /// 現在のライブチャットID
    pub live_chat_id: String,
    /// 次回リクエスト用のページトークン（Noneはサーバー既定の位置から）
    pub next_page_token: Option<String>,
    /// 直近レスポンスの推奨ポーリング間隔（ミリ秒）
    pub server_interval_millis: u64,
    /// ポーリング実施回数
    pub poll_count: u64,
    /// チャット取得で消費したクォータ（推定）
    pub quota_used: u64,
}

impl PollingState {
    pub fn new(live_chat_id: String) -> Self {
        Self {
            live_chat_id,
            next_page_token: None,
            server_interval_millis: 0,
            poll_count: 0,
            quota_used: 0,
        }
    }

    /// 状態を更新（API レスポンス受信後に呼び出す）
    ///
    /// 返されたトークンが無い場合も、そのままNoneに置き換える
    pub fn update(&mut self, next_page_token: Option<String>, polling_interval_millis: u64) {
        self.next_page_token = next_page_token;
        self.server_interval_millis = polling_interval_millis;
        self.poll_count += 1;
        self.quota_used += CHAT_MESSAGES_QUOTA_COST;
    }

    /// 次回ポーリングまでの待機時間
    pub fn next_delay(&self, schedule: &PollSchedule) -> Duration {
        schedule.delay_for(self.server_interval_millis)
    }
}
