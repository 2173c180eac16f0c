use super::{client::YouTubeClient, errors::YouTubeError, state::PollingState};
use crate::codes::LevelCodeExtractor;
use crate::config::PollSchedule;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::sleep;

/// ポーリング停止シグナル
///
/// 各ポーリングの前と待機中に確認される。クローンは同じシグナルを共有する。
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        // 待機者が1つだけなのでnotify_one（待機前に呼ばれてもpermitが残る）
        self.notify.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// `duration`だけ待つ。途中で停止された場合はtrueを返す
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_stopped() {
            return true;
        }

        tokio::select! {
            _ = sleep(duration) => self.is_stopped(),
            _ = self.notify.notified() => true,
        }
    }
}

/// ライブチャットのポーラー兼レベルコード抽出器
///
/// ページトークンと既出コード集合はこのポーラーだけが所有する。
pub struct ChatPoller {
    client: YouTubeClient,
    state: PollingState,
    extractor: LevelCodeExtractor,
    schedule: PollSchedule,
}

impl ChatPoller {
    pub fn new(client: YouTubeClient, live_chat_id: String, schedule: PollSchedule) -> Self {
        Self {
            client,
            state: PollingState::new(live_chat_id),
            extractor: LevelCodeExtractor::new(),
            schedule,
        }
    }

    pub fn state(&self) -> &PollingState {
        &self.state
    }

    pub fn extractor(&self) -> &LevelCodeExtractor {
        &self.extractor
    }

    /// 1ページ取得し、初出のレベルコードを発見順に返す
    pub async fn poll_once(&mut self) -> Result<Vec<String>, YouTubeError> {
        let response = self
            .client
            .get_live_chat_messages(
                &self.state.live_chat_id,
                self.state.next_page_token.as_deref(),
            )
            .await?;

        // メッセージはAPIの返却順に処理する
        let mut discovered = Vec::new();
        for item in &response.items {
            let fresh = self.extractor.ingest(&item.snippet.display_message);
            if !fresh.is_empty() {
                log::debug!("Message {} contained new codes: {:?}", item.id, fresh);
            }
            discovered.extend(fresh);
        }

        self.state
            .update(response.next_page_token, response.polling_interval_millis);

        log::info!(
            "Poll #{}: {} messages, {} new codes, {} seen (quota used: ~{} units)",
            self.state.poll_count,
            response.items.len(),
            discovered.len(),
            self.extractor.seen_count(),
            self.state.quota_used
        );

        Ok(discovered)
    }

    /// 停止されるかエラーが起きるまでポーリングを続ける
    ///
    /// 初出コードごとに`on_code`を呼ぶ。エラーは再試行せず、そのまま返す。
    pub async fn run<F>(&mut self, stop: &StopSignal, mut on_code: F) -> Result<(), YouTubeError>
    where
        F: FnMut(String),
    {
        log::info!("Polling started for chat {}", self.state.live_chat_id);

        while !stop.is_stopped() {
            for code in self.poll_once().await? {
                on_code(code);
            }

            let delay = self.state.next_delay(&self.schedule);
            log::debug!("Next poll in {:?}", delay);
            if stop.sleep(delay).await {
                break;
            }
        }

        log::info!("Polling loop ended");
        Ok(())
    }
}
