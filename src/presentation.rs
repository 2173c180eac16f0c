//! 表示側のポート
//!
//! ワーカーからの`SessionEvent`を前面側のスレッドで受け取り、
//! `PresentationPort`の各メソッドに振り分ける。GUI・端末・テスト用の実装はこのトレイトを実装する。

use chrono::{DateTime, Local};

use crate::session::{ManualInputRequest, SessionEvent};

pub trait PresentationPort {
    /// 初出のレベルコードを一覧に追加する
    fn on_code_discovered(&mut self, code: &str);

    fn on_connection_established(&mut self);

    /// エラーを表示し、接続操作を初期状態に戻す
    fn on_connection_failed(&mut self, message: &str);

    /// 動画URL/IDの入力をオペレーターに求める
    fn on_manual_input_required(&mut self, request: ManualInputRequest);

    fn on_connection_stopped(&mut self) {}
}

/// イベントを発生順にポートへ渡す
pub fn dispatch<P: PresentationPort + ?Sized>(port: &mut P, event: SessionEvent) {
    match event {
        SessionEvent::ManualInputRequired(request) => port.on_manual_input_required(request),
        SessionEvent::Connected { .. } => port.on_connection_established(),
        SessionEvent::CodeDiscovered(code) => port.on_code_discovered(&code),
        SessionEvent::Failed(message) => port.on_connection_failed(&message),
        SessionEvent::Stopped => port.on_connection_stopped(),
    }
}

/// 接続ボタンの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectState {
    #[default]
    Idle,
    Connecting,
    Connected,
}

impl ConnectState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectState::Idle => "Connect to Stream",
            ConnectState::Connecting => "Connecting...",
            ConnectState::Connected => "Connected (Listening)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: String,
    pub discovered_at: DateTime<Local>,
}

/// 表示中のコード一覧（UI側の状態。抽出器の既出集合とは独立）
///
/// 取り出した（コピーした）エントリは一覧から消えるが、既出集合には残るため再表示されない。
#[derive(Debug, Default)]
pub struct CodeQueue {
    entries: Vec<CodeEntry>,
}

impl CodeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 末尾に追加し、1始まりの番号を返す
    pub fn push(&mut self, code: impl Into<String>) -> usize {
        self.entries.push(CodeEntry {
            code: code.into(),
            discovered_at: Local::now(),
        });
        self.entries.len()
    }

    /// 1始まりの番号で取り出して一覧から削除する
    pub fn take(&mut self, number: usize) -> Option<CodeEntry> {
        if number == 0 || number > self.entries.len() {
            return None;
        }
        Some(self.entries.remove(number - 1))
    }

    pub fn entries(&self) -> &[CodeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingPort {
        calls: Vec<String>,
        manual_answer: Option<String>,
    }

    impl PresentationPort for RecordingPort {
        fn on_code_discovered(&mut self, code: &str) {
            self.calls.push(format!("code:{}", code));
        }

        fn on_connection_established(&mut self) {
            self.calls.push("connected".to_string());
        }

        fn on_connection_failed(&mut self, message: &str) {
            self.calls.push(format!("failed:{}", message));
        }

        fn on_manual_input_required(&mut self, request: ManualInputRequest) {
            self.calls.push("prompt".to_string());
            request.answer(self.manual_answer.clone());
        }
    }

    #[test]
    fn test_dispatch_preserves_order() {
        let mut port = RecordingPort::default();
        let events = vec![
            SessionEvent::Connected {
                video_id: "v".to_string(),
                live_chat_id: "c".to_string(),
            },
            SessionEvent::CodeDiscovered("111111".to_string()),
            SessionEvent::CodeDiscovered("222222".to_string()),
            SessionEvent::Failed("Live chat has ended".to_string()),
            SessionEvent::Stopped,
        ];

        for event in events {
            dispatch(&mut port, event);
        }

        assert_eq!(
            port.calls,
            vec![
                "connected",
                "code:111111",
                "code:222222",
                "failed:Live chat has ended",
            ]
        );
    }

    #[test]
    fn test_dispatch_manual_input_answers_worker() {
        let mut port = RecordingPort {
            manual_answer: Some("AbCdEfG".to_string()),
            ..Default::default()
        };

        let (request, mut reply) = ManualInputRequest::channel();
        dispatch(&mut port, SessionEvent::ManualInputRequired(request));

        assert_eq!(port.calls, vec!["prompt"]);
        assert_eq!(reply.try_recv().unwrap(), Some("AbCdEfG".to_string()));
    }

    #[test]
    fn test_code_queue_take_removes_entry() {
        let mut queue = CodeQueue::new();
        assert_eq!(queue.push("111111"), 1);
        assert_eq!(queue.push("222222"), 2);
        assert_eq!(queue.push("333333"), 3);

        let taken = queue.take(2).unwrap();
        assert_eq!(taken.code, "222222");

        let remaining: Vec<&str> = queue.entries().iter().map(|e| e.code.as_str()).collect();
        assert_eq!(remaining, vec!["111111", "333333"]);

        assert!(queue.take(0).is_none());
        assert!(queue.take(3).is_none());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_connect_state_labels() {
        assert_eq!(ConnectState::default(), ConnectState::Idle);
        assert_eq!(ConnectState::Idle.label(), "Connect to Stream");
        assert_eq!(ConnectState::Connected.label(), "Connected (Listening)");
    }
}
