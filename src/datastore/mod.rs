//! 永続化レイヤ（外部データストアのインタフェース）
//!
//! データストア本体は外部コラボレータであり、ここではそれが提示する
//! インタフェースだけを定義します。書き込みは常にベストエフォートで、
//! 失敗しても主応答を遅延・失敗させてはいけません（呼び出し側でログのみ）。
mod error;
mod memory;
mod rest;

use async_trait::async_trait;
use serde::Serialize;

pub use error::DatastoreError;
pub use memory::MemoryTranscriptStore;
pub use rest::RestTranscriptStore;

/// 文字起こしの新規レコード
#[derive(Debug, Clone)]
pub struct NewTranscription {
    pub user_id: String,
    pub meeting_id: String,
    pub sender: String,
    pub text: String,
    pub source_lang: String,
    pub created_at_ms: i64,
}

/// 永続化済みの文字起こし
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionRecord {
    pub id: String,
    pub user_id: String,
    pub meeting_id: String,
    pub sender: String,
    pub text: String,
    pub source_lang: String,
    pub created_at_ms: i64,
}

/// 翻訳結果の新規レコード
#[derive(Debug, Clone)]
pub struct NewTranslation {
    pub user_id: String,
    pub source_lang: String,
    pub target_lang: String,
    pub original_text: String,
    pub translated_text: String,
}

/// 永続化済みの翻訳結果
#[derive(Debug, Clone, Serialize)]
pub struct TranslationRecord {
    pub id: String,
    pub user_id: String,
    pub source_lang: String,
    pub target_lang: String,
    pub original_text: String,
    pub translated_text: String,
    pub created_at_ms: i64,
}

/// データストア最小インタフェース
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn insert_transcription(
        &self,
        record: NewTranscription,
    ) -> Result<TranscriptionRecord, DatastoreError>;

    async fn insert_translation(&self, record: NewTranslation) -> Result<(), DatastoreError>;

    /// 指定ミーティングの最新1件（作成時刻の降順）
    async fn latest_transcription(
        &self,
        meeting_id: &str,
    ) -> Result<Option<TranscriptionRecord>, DatastoreError>;

    /// 指定ユーザの最新翻訳1件（作成時刻の降順）
    async fn latest_translation(
        &self,
        user_id: &str,
    ) -> Result<Option<TranslationRecord>, DatastoreError>;
}
