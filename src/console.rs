//! 端末フロントエンド
//!
//! 標準入力のコマンドとワーカーからのイベントを1つのループで処理する。
//! コード一覧・接続状態・入力待ちのプロンプトはこのループだけが触る。

use std::fmt;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::keyring;
use crate::presentation::{dispatch, CodeQueue, ConnectState, PresentationPort};
use crate::session::{spawn_session, ManualInputRequest, SessionConfig, SessionEvent, SessionHandle};
use crate::util::mask_api_key;
use crate::youtube::api_key_manager::resolve_api_key;
use crate::youtube::YouTubeClient;

const HELP: &str = "\
Commands:
  connect        connect to the channel's live chat
  list           show queued level codes
  take <n>       copy code #n to the clipboard and remove it
  test           add a test entry
  stop           stop listening
  savekey <key>  store the API key in the OS keyring
  forgetkey      remove the stored API key
  help           show this help
  quit           exit";

/// 端末コマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    List,
    Take(usize),
    Test,
    Stop,
    SaveKey(String),
    ForgetKey,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let arg = parts.next();

        match (name.as_str(), arg) {
            ("connect" | "c", None) => Ok(Command::Connect),
            ("list" | "ls" | "l", None) => Ok(Command::List),
            ("take" | "t", Some(n)) => n
                .parse::<usize>()
                .map(Command::Take)
                .map_err(|_| format!("Invalid entry number: {}", n)),
            ("take" | "t", None) => Err("Usage: take <n>".to_string()),
            ("test", None) => Ok(Command::Test),
            ("stop", None) => Ok(Command::Stop),
            ("savekey", Some(key)) => Ok(Command::SaveKey(key.to_string())),
            ("savekey", None) => Err("Usage: savekey <key>".to_string()),
            ("forgetkey", None) => Ok(Command::ForgetKey),
            ("help" | "?", None) => Ok(Command::Help),
            ("quit" | "exit" | "q", None) => Ok(Command::Quit),
            ("", _) => Err(String::new()),
            _ => Err(format!("Unknown command: {} (type 'help')", line.trim())),
        }
    }
}

/// コードのコピー先
pub trait ClipboardSink {
    fn copy(&mut self, text: &str) -> Result<(), String>;
}

/// OSのクリップボード（初回コピー時に接続する）
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl ClipboardSink for SystemClipboard {
    fn copy(&mut self, text: &str) -> Result<(), String> {
        let mut clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new().map_err(|e| e.to_string())?,
        };
        let result = clipboard.set_text(text.to_string()).map_err(|e| e.to_string());
        // 保持し続けないと環境によってはコピー内容が消える
        self.inner = Some(clipboard);
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// 端末版のPresentationPort実装
pub struct ConsoleView<W: Write> {
    out: W,
    clipboard: Box<dyn ClipboardSink>,
    queue: CodeQueue,
    state: ConnectState,
    pending_prompt: Option<ManualInputRequest>,
}

impl<W: Write> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self::with_clipboard(out, Box::new(SystemClipboard::default()))
    }

    pub fn with_clipboard(out: W, clipboard: Box<dyn ClipboardSink>) -> Self {
        Self {
            out,
            clipboard,
            queue: CodeQueue::new(),
            state: ConnectState::Idle,
            pending_prompt: None,
        }
    }

    pub fn state(&self) -> ConnectState {
        self.state
    }

    pub fn queue(&self) -> &CodeQueue {
        &self.queue
    }

    pub fn has_pending_prompt(&self) -> bool {
        self.pending_prompt.is_some()
    }

    fn set_state(&mut self, state: ConnectState) {
        self.state = state;
        self.print(format_args!("[{}]", state.label()));
    }

    fn take_pending_prompt(&mut self) -> Option<ManualInputRequest> {
        self.pending_prompt.take()
    }

    fn print(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{}", args).and_then(|_| self.out.flush()) {
            log::error!("Failed to write to console: {}", e);
        }
    }

    fn print_list(&mut self) {
        if self.queue.is_empty() {
            self.print(format_args!("(no codes queued)"));
            return;
        }

        let lines: Vec<String> = self
            .queue
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                format!(
                    "  [{}] {}  ({})",
                    i + 1,
                    entry.code,
                    entry.discovered_at.format("%H:%M:%S")
                )
            })
            .collect();
        for line in lines {
            self.print(format_args!("{}", line));
        }
    }

    fn take(&mut self, number: usize) {
        match self.queue.take(number) {
            Some(entry) => {
                log::info!("Code {} taken from queue", entry.code);
                match self.clipboard.copy(&entry.code) {
                    Ok(()) => self.print(format_args!("Copied {}", entry.code)),
                    Err(e) => {
                        // クリップボードが無い環境（ヘッドレス等）ではコードだけを1行で出す
                        log::warn!("Clipboard unavailable: {}", e);
                        self.print(format_args!("{}", entry.code));
                    }
                }
            }
            None => self.print(format_args!("No entry #{}", number)),
        }
    }
}

impl<W: Write> PresentationPort for ConsoleView<W> {
    fn on_code_discovered(&mut self, code: &str) {
        let number = self.queue.push(code);
        self.print(format_args!("  [{}] {}", number, code));
    }

    fn on_connection_established(&mut self) {
        self.set_state(ConnectState::Connected);
    }

    fn on_connection_failed(&mut self, message: &str) {
        if let Some(request) = self.pending_prompt.take() {
            request.cancel();
        }
        self.print(format_args!("! {}", message));
        self.set_state(ConnectState::Idle);
    }

    fn on_manual_input_required(&mut self, request: ManualInputRequest) {
        if let Some(previous) = self.pending_prompt.replace(request) {
            previous.cancel();
        }
        self.print(format_args!(
            "No Public Stream found.\nEnter Video ID or URL for Unlisted Stream (empty line cancels):"
        ));
    }

    fn on_connection_stopped(&mut self) {
        self.set_state(ConnectState::Idle);
    }
}

/// 端末アプリ本体（前面側のディスパッチャ）
pub struct ConsoleApp<W: Write> {
    config: AppConfig,
    view: ConsoleView<W>,
    session: Option<SessionHandle>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<W: Write> ConsoleApp<W> {
    pub fn new(config: AppConfig, out: W, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self::with_view(config, ConsoleView::new(out), events)
    }

    pub fn with_view(
        config: AppConfig,
        view: ConsoleView<W>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            config,
            view,
            session: None,
            events,
        }
    }

    pub fn view(&self) -> &ConsoleView<W> {
        &self.view
    }

    /// 入力1行を処理する。入力待ちのプロンプトがあればその応答として扱う
    ///
    /// プロンプト中でも`stop`と`quit`は入力のキャンセルとして扱う
    pub fn handle_line(&mut self, line: &str) -> Flow {
        if let Some(request) = self.view.take_pending_prompt() {
            match Command::parse(line) {
                Ok(Command::Stop) => {
                    request.cancel();
                    self.stop();
                }
                Ok(Command::Quit) => {
                    request.cancel();
                    self.shutdown();
                    return Flow::Quit;
                }
                _ => request.answer(Some(line.trim().to_string())),
            }
            return Flow::Continue;
        }

        match Command::parse(line) {
            Ok(command) => self.execute(command),
            Err(message) => {
                if !message.is_empty() {
                    self.view.print(format_args!("{}", message));
                }
                Flow::Continue
            }
        }
    }

    /// ワーカーからのイベントを処理する
    pub fn handle_event(&mut self, event: SessionEvent) {
        if matches!(event, SessionEvent::Failed(_) | SessionEvent::Stopped) {
            self.session = None;
        }
        dispatch(&mut self.view, event);
    }

    /// 標準入力が閉じた・終了コマンド時の後始末
    pub fn shutdown(&mut self) {
        if let Some(request) = self.view.take_pending_prompt() {
            request.cancel();
        }
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }

    fn execute(&mut self, command: Command) -> Flow {
        match command {
            Command::Connect => self.connect(),
            Command::List => self.view.print_list(),
            Command::Take(number) => self.view.take(number),
            // テスト用エントリは抽出器を通さない
            Command::Test => self.view.on_code_discovered("12345678 (Test)"),
            Command::Stop => self.stop(),
            Command::SaveKey(key) => match keyring::save_api_key(&key) {
                Ok(()) => self
                    .view
                    .print(format_args!("API key {} saved", mask_api_key(&key))),
                Err(e) => self.view.print(format_args!("! {}", e)),
            },
            Command::ForgetKey => match keyring::delete_api_key() {
                Ok(()) => self.view.print(format_args!("Stored API key removed")),
                Err(e) => self.view.print(format_args!("! {}", e)),
            },
            Command::Help => self.view.print(format_args!("{}", HELP)),
            Command::Quit => {
                self.shutdown();
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    fn connect(&mut self) {
        if self.view.state() != ConnectState::Idle {
            let label = self.view.state().label();
            self.view.print(format_args!("Already {}", label));
            return;
        }

        let Some((api_key, _source)) = resolve_api_key(self.config.api_key.as_deref()) else {
            self.view.on_connection_failed(
                "API key is not configured (set LEVEL_QUEUE_API_KEY or use 'savekey <key>')",
            );
            return;
        };

        let client = match YouTubeClient::with_base_url(api_key, &self.config.api_base) {
            Ok(client) => client,
            Err(e) => {
                self.view.on_connection_failed(&format!("Error: {}", e));
                return;
            }
        };

        self.view.set_state(ConnectState::Connecting);
        let session_config = SessionConfig {
            channel_id: self.config.channel_id.clone(),
            schedule: self.config.schedule,
        };
        self.session = Some(spawn_session(client, session_config, self.events.clone()));
    }

    fn stop(&mut self) {
        if let Some(request) = self.view.take_pending_prompt() {
            request.cancel();
        }
        match &self.session {
            Some(session) if !session.is_finished() => {
                session.stop();
                self.view.print(format_args!("Stopping..."));
            }
            _ => self.view.print(format_args!("Not connected")),
        }
    }
}

/// 端末アプリを実行する（標準入力が閉じるかquitで終了）
pub async fn run(config: AppConfig) -> io::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = ConsoleApp::new(config, io::stdout(), tx);

    app.view.print(format_args!(
        "GD Level Queue - channel {}\n{}",
        app.config.channel_id, HELP
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if app.handle_line(&line) == Flow::Quit {
                        break;
                    }
                }
                None => {
                    app.shutdown();
                    break;
                }
            },
            Some(event) = rx.recv() => app.handle_event(event),
        }
    }

    log::info!("Console closed");
    Ok(())
}
