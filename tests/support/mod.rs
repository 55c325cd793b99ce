//! テスト用のモック群（各テストバイナリから `mod support;` で共有）
#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use caption_translator_api::speech::{AudioSink, SpeechError, SpeechSynthesizer};
use caption_translator_api::translation::{
    ChatStreamRequest, StreamingChatClient, TranslateBackend, TranslationError,
};

/// NDJSONの1行（チャットストリームの増分形状）を組み立てる
pub fn ndjson(content: &str) -> String {
    format!("{}\n", serde_json::json!({ "message": { "content": content } }))
}

/// チャットストリームの応答シナリオ
pub enum ChatScript {
    /// バイトチャンク列を順に流して正常終了
    Chunks(Vec<String>),
    /// チャンク列を流したあと読み取りエラーで途切れる
    ChunksThenError(Vec<String>),
    /// モデル未登録エラー
    NotFound,
    /// リクエスト失敗
    Fail,
}

/// 呼び出しごとにシナリオを1つ消費するチャットクライアント
pub struct MockChatClient {
    scripts: Mutex<VecDeque<ChatScript>>,
    pub models: Mutex<Vec<String>>,
}

impl MockChatClient {
    pub fn with_scripts(scripts: Vec<ChatScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            models: Mutex::new(Vec::new()),
        }
    }

    /// 1回だけ正常応答するクライアント
    pub fn single(chunks: Vec<String>) -> Self {
        Self::with_scripts(vec![ChatScript::Chunks(chunks)])
    }

    pub fn requested_models(&self) -> Vec<String> {
        self.models.lock().clone()
    }
}

#[async_trait]
impl StreamingChatClient for MockChatClient {
    async fn open_stream(
        &self,
        request: ChatStreamRequest,
    ) -> Result<mpsc::Receiver<Result<Bytes, TranslationError>>, TranslationError> {
        self.models.lock().push(request.model.clone());
        let script = self
            .scripts
            .lock()
            .pop_front()
            .unwrap_or(ChatScript::Fail);
        match script {
            ChatScript::NotFound => Err(TranslationError::ModelNotFound {
                model: request.model,
            }),
            ChatScript::Fail => Err(TranslationError::Request {
                message: "mock chat failure".to_string(),
            }),
            ChatScript::Chunks(chunks) => {
                let (tx, rx) = mpsc::channel(8);
                tokio::spawn(async move {
                    for chunk in chunks {
                        if tx.send(Ok(Bytes::from(chunk))).await.is_err() {
                            break;
                        }
                    }
                });
                Ok(rx)
            }
            ChatScript::ChunksThenError(chunks) => {
                let (tx, rx) = mpsc::channel(8);
                tokio::spawn(async move {
                    for chunk in chunks {
                        if tx.send(Ok(Bytes::from(chunk))).await.is_err() {
                            return;
                        }
                    }
                    let _ = tx
                        .send(Err(TranslationError::Request {
                            message: "mock mid-stream failure".to_string(),
                        }))
                        .await;
                });
                Ok(rx)
            }
        }
    }
}

/// 常に固定の訳文を返すフォールバックバックエンド
pub struct FixedTranslateBackend {
    reply: String,
    pub calls: Mutex<u32>,
}

impl FixedTranslateBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock()
    }
}

#[async_trait]
impl TranslateBackend for FixedTranslateBackend {
    async fn translate(
        &self,
        _text: &str,
        _source_lang: &str,
        _target_lang: &str,
    ) -> Result<String, TranslationError> {
        *self.calls.lock() += 1;
        Ok(self.reply.clone())
    }
}

/// 常に失敗するフォールバックバックエンド
pub struct FailingTranslateBackend;

#[async_trait]
impl TranslateBackend for FailingTranslateBackend {
    async fn translate(
        &self,
        _text: &str,
        _source_lang: &str,
        _target_lang: &str,
    ) -> Result<String, TranslationError> {
        Err(TranslationError::Request {
            message: "mock fallback failure".to_string(),
        })
    }
}

/// 合成したフレーズを記録し、`[phrase]` 形式のバイト列を返すシンセサイザ
pub struct MockSynthesizer {
    pub calls: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn synthesized(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        phrase: &str,
        _language: &str,
        _voice_id: &str,
    ) -> Result<mpsc::Receiver<Bytes>, SpeechError> {
        self.calls.lock().push(phrase.to_string());
        let (tx, rx) = mpsc::channel(4);
        let payload = Bytes::from(format!("[{phrase}]"));
        tokio::spawn(async move {
            let _ = tx.send(payload).await;
        });
        Ok(rx)
    }
}

/// 再生した音声を記録するシンク（`delay` で再生時間を模擬）
pub struct RecordingSink {
    pub played: Mutex<Vec<Bytes>>,
    delay: Duration,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            played: Mutex::new(Vec::new()),
            delay,
        }
    }

    pub fn play_count(&self) -> usize {
        self.played.lock().len()
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, audio: Bytes) -> Result<(), SpeechError> {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.played.lock().push(audio);
        Ok(())
    }
}

/// 決して完了しないシンク（ウォッチドッグの検証用）
pub struct PendingSink;

#[async_trait]
impl AudioSink for PendingSink {
    async fn play(&self, _audio: Bytes) -> Result<(), SpeechError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}
