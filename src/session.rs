//! 接続セッション（バックグラウンドワーカー）
//!
//! 1回の接続試行につき1つのタスクで、配信解決とチャットポーリングを順に行う。
//! ワーカーはUIに直接触れず、`SessionEvent`をチャネル経由で前面側に送る。

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::PollSchedule;
use crate::youtube::{ChatPoller, StopSignal, StreamResolver, YouTubeClient, YouTubeError};

/// ワーカーから前面側への通知
#[derive(Debug)]
pub enum SessionEvent {
    /// 公開ライブが見つからず、オペレーターの入力待ち
    ManualInputRequired(ManualInputRequest),
    /// チャットIDの解決に成功
    Connected {
        video_id: String,
        live_chat_id: String,
    },
    /// 初出のレベルコード
    CodeDiscovered(String),
    /// 接続失敗・ポーリング中のエラー（オペレーター向けメッセージ）
    Failed(String),
    /// 停止要求により終了
    Stopped,
}

/// 手動入力の要求
///
/// 前面側が`answer`で応答するまでワーカーは待機する。応答せずに破棄した場合はキャンセル扱い。
#[derive(Debug)]
pub struct ManualInputRequest {
    reply: oneshot::Sender<Option<String>>,
}

impl ManualInputRequest {
    pub fn channel() -> (Self, oneshot::Receiver<Option<String>>) {
        let (reply, rx) = oneshot::channel();
        (Self { reply }, rx)
    }

    pub fn answer(self, input: Option<String>) {
        // ワーカーが既に終了していれば届かないが問題ない
        let _ = self.reply.send(input);
    }

    pub fn cancel(self) {
        self.answer(None);
    }
}

/// ワーカーの起動パラメータ
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub channel_id: String,
    pub schedule: PollSchedule,
}

/// 実行中セッションのハンドル
pub struct SessionHandle {
    stop: StopSignal,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// 停止を要求する（次のポーリング前または待機中に反映）
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// ワーカータスクを起動する
pub fn spawn_session(
    client: YouTubeClient,
    config: SessionConfig,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> SessionHandle {
    let stop = StopSignal::new();
    let worker_stop = stop.clone();

    let task = tokio::spawn(async move {
        let event = match connect_and_poll(&client, &config, &worker_stop, &events).await {
            Ok(()) => {
                log::info!("Session stopped by operator");
                SessionEvent::Stopped
            }
            Err(e) => {
                if e.is_transport() {
                    log::error!("Session ended by network error: {}", e);
                } else {
                    log::error!("Session ended: {}", e);
                }
                SessionEvent::Failed(e.into())
            }
        };
        let _ = events.send(event);
    });

    SessionHandle { stop, task }
}

async fn connect_and_poll(
    client: &YouTubeClient,
    config: &SessionConfig,
    stop: &StopSignal,
    events: &mpsc::UnboundedSender<SessionEvent>,
) -> Result<(), YouTubeError> {
    let resolver = StreamResolver::new(client, &config.channel_id);

    let resolved = resolver
        .resolve(move || async move {
            // 検索中に停止された場合はプロンプトを出さずにキャンセル扱い
            if stop.is_stopped() {
                log::info!("Stop requested before manual input prompt");
                return None;
            }
            let (request, reply) = ManualInputRequest::channel();
            if events.send(SessionEvent::ManualInputRequired(request)).is_err() {
                return None;
            }
            reply.await.ok().flatten()
        })
        .await?;

    log::info!(
        "Connected to video {} (chat {})",
        resolved.video_id,
        resolved.live_chat_id
    );
    let _ = events.send(SessionEvent::Connected {
        video_id: resolved.video_id,
        live_chat_id: resolved.live_chat_id.clone(),
    });

    let mut poller = ChatPoller::new(client.clone(), resolved.live_chat_id, config.schedule);
    poller
        .run(stop, |code| {
            log::info!("New level code: {}", code);
            let _ = events.send(SessionEvent::CodeDiscovered(code));
        })
        .await
}
