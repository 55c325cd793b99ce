//! 読み上げキュープレイヤー（アクタ実装）
//!
//! 翻訳済みキャプションを順番に読み上げる直列キュー。状態は
//! Idle → Playing → CoolingDown → … の一方向に遷移し、再生中も
//! コマンド（投入・有効切替・状態照会）を受け付け続けます。
//!
//! ゲーティング規則:
//! - 無効中の投入は破棄
//! - 訳文が空（空白のみ含む）なら破棄
//! - 自分自身の発話は読み上げない
//! - 有効化時点より古いキャプションは読み上げない
//! - 同一発話IDで同一訳文の再投入は重複として破棄（訳文が変われば再キュー）
//!
//! 再生1件ごとにウォッチドッグを張り、時間超過したらその項目を諦めて
//! 次へ進みます。完了後は短いクールダウンを挟みます。
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::captions::CaptionEntry;
use crate::config::SpeechConfig;
use crate::util::now_ms;

use super::error::SpeechError;
use super::synth::SpeechSynthesizer;

/// 合成済み音声を実際に出力する先
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, audio: Bytes) -> Result<(), SpeechError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Idle,
    Playing,
    CoolingDown,
}

/// 状態照会の応答
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub status: PlayerStatus,
    pub enabled: bool,
    pub queued: usize,
}

#[derive(Debug, Clone)]
struct QueueItem {
    utterance_id: String,
    text: String,
    language: String,
    /// 話者別の声を使いたい場合の上書き（無指定なら設定既定）
    voice_id: Option<String>,
}

enum PlayerCommand {
    Offer(CaptionEntry),
    SetEnabled(bool),
    Status(oneshot::Sender<PlayerSnapshot>),
}

/// アクタへのハンドル。クローンして複数箇所から共有できる
#[derive(Clone)]
pub struct TtsQueuePlayer {
    tx: mpsc::Sender<PlayerCommand>,
}

impl TtsQueuePlayer {
    /// アクタタスクを起動しハンドルを返す
    pub fn spawn(
        config: SpeechConfig,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AudioSink>,
        local_user_id: String,
        target_lang: String,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.player.queue_depth);
        let actor = PlayerActor {
            rx,
            synthesizer,
            sink,
            local_user_id,
            target_lang,
            voice_id: config.synthesis.voice_id.clone(),
            watchdog: config.watchdog(),
            cooldown: config.cooldown(),
            enabled: false,
            enabled_since_ms: 0,
            spoken: HashMap::new(),
            queue: VecDeque::new(),
        };
        tokio::spawn(actor.run());
        Self { tx }
    }

    /// 読み上げの有効/無効を切り替える
    pub async fn set_enabled(&self, enabled: bool) {
        let _ = self.tx.send(PlayerCommand::SetEnabled(enabled)).await;
    }

    /// キャプションを読み上げ候補として投入する
    pub async fn offer(&self, entry: CaptionEntry) {
        let _ = self.tx.send(PlayerCommand::Offer(entry)).await;
    }

    /// 現在の状態を取得する（アクタ停止後は `None`）
    pub async fn status(&self) -> Option<PlayerSnapshot> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(PlayerCommand::Status(tx)).await.is_err() {
            return None;
        }
        rx.await.ok()
    }
}

struct PlayerActor {
    rx: mpsc::Receiver<PlayerCommand>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    local_user_id: String,
    target_lang: String,
    voice_id: String,
    watchdog: std::time::Duration,
    cooldown: std::time::Duration,
    enabled: bool,
    enabled_since_ms: i64,
    // 発話ID -> 最後に読み上げた訳文
    spoken: HashMap<String, String>,
    queue: VecDeque<QueueItem>,
}

impl PlayerActor {
    async fn run(mut self) {
        loop {
            let item = match self.next_item() {
                Some(item) => item,
                None => {
                    // Idle: コマンドを待つ。全ハンドルが閉じたら終了
                    match self.rx.recv().await {
                        Some(cmd) => {
                            self.handle_command(cmd, PlayerStatus::Idle);
                            continue;
                        }
                        None => return,
                    }
                }
            };

            if !self.play_with_watchdog(item).await {
                return;
            }
            if !self.cool_down().await {
                return;
            }
        }
    }

    fn next_item(&mut self) -> Option<QueueItem> {
        if !self.enabled {
            return None;
        }
        self.queue.pop_front()
    }

    /// 1項目を再生する。アクタを継続すべきなら true
    async fn play_with_watchdog(&mut self, item: QueueItem) -> bool {
        let mut play = Box::pin(play_item(
            self.synthesizer.clone(),
            self.sink.clone(),
            item.clone(),
            self.voice_id.clone(),
        ));
        let watchdog = sleep(self.watchdog);
        tokio::pin!(watchdog);

        loop {
            tokio::select! {
                result = &mut play => {
                    if let Err(err) = result {
                        warn!(utterance_id = %item.utterance_id, error = %err, "playback failed, skipping");
                    }
                    return true;
                }
                _ = &mut watchdog => {
                    warn!(utterance_id = %item.utterance_id, "playback watchdog fired, skipping item");
                    return true;
                }
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            let was_enabled = self.enabled;
                            self.handle_command(cmd, PlayerStatus::Playing);
                            // 無効化は進行中の再生も打ち切る
                            if was_enabled && !self.enabled {
                                return true;
                            }
                        }
                        None => return false,
                    }
                }
            }
        }
    }

    /// クールダウン中もコマンドを処理する。アクタを継続すべきなら true
    async fn cool_down(&mut self) -> bool {
        let pause = sleep(self.cooldown);
        tokio::pin!(pause);

        loop {
            tokio::select! {
                _ = &mut pause => return true,
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd, PlayerStatus::CoolingDown),
                        None => return false,
                    }
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: PlayerCommand, status: PlayerStatus) {
        match cmd {
            PlayerCommand::Offer(entry) => self.accept_offer(entry),
            PlayerCommand::SetEnabled(enabled) => self.set_enabled(enabled),
            PlayerCommand::Status(reply) => {
                let _ = reply.send(PlayerSnapshot {
                    status: if self.enabled {
                        status
                    } else {
                        PlayerStatus::Idle
                    },
                    enabled: self.enabled,
                    queued: self.queue.len(),
                });
            }
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            self.enabled_since_ms = now_ms();
        } else {
            // 無効化は完全な後片付け: 残キューと既読上げ記録を捨てる
            self.queue.clear();
            self.spoken.clear();
        }
    }

    fn accept_offer(&mut self, entry: CaptionEntry) {
        if !self.enabled {
            return;
        }
        let translated = match &entry.translated_text {
            Some(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => return,
        };
        if entry.speaker_user_id == self.local_user_id {
            return;
        }
        if entry.ts < self.enabled_since_ms {
            debug!(utterance_id = %entry.utterance_id, "caption predates enablement, skipping");
            return;
        }
        if self.spoken.get(&entry.utterance_id) == Some(&translated) {
            return;
        }

        self.spoken
            .insert(entry.utterance_id.clone(), translated.clone());
        self.queue.push_back(QueueItem {
            utterance_id: entry.utterance_id,
            text: translated,
            language: self.target_lang.clone(),
            voice_id: None,
        });
    }
}

/// 音声を合成しきってからシンクへ渡す
async fn play_item(
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    item: QueueItem,
    default_voice_id: String,
) -> Result<(), SpeechError> {
    let voice_id = item.voice_id.as_deref().unwrap_or(&default_voice_id);
    let mut rx = synthesizer
        .synthesize(&item.text, &item.language, voice_id)
        .await?;

    let mut audio = BytesMut::new();
    while let Some(chunk) = rx.recv().await {
        audio.extend_from_slice(&chunk);
    }
    if audio.is_empty() {
        return Err(SpeechError::Synthesis {
            message: "synthesis produced no audio".to_string(),
        });
    }

    sink.play(audio.freeze()).await
}
