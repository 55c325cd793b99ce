//! インメモリ実装（テスト・データストア未設定時の既定）
use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::util::now_ms;

use super::error::DatastoreError;
use super::{
    NewTranscription, NewTranslation, TranscriptStore, TranscriptionRecord, TranslationRecord,
};

#[derive(Debug, Default)]
pub struct MemoryTranscriptStore {
    transcriptions: Mutex<Vec<TranscriptionRecord>>,
    translations: Mutex<Vec<TranslationRecord>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcription_count(&self) -> usize {
        self.transcriptions.lock().len()
    }

    pub fn translation_count(&self) -> usize {
        self.translations.lock().len()
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn insert_transcription(
        &self,
        record: NewTranscription,
    ) -> Result<TranscriptionRecord, DatastoreError> {
        let stored = TranscriptionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: record.user_id,
            meeting_id: record.meeting_id,
            sender: record.sender,
            text: record.text,
            source_lang: record.source_lang,
            created_at_ms: record.created_at_ms,
        };
        self.transcriptions.lock().push(stored.clone());
        Ok(stored)
    }

    async fn insert_translation(&self, record: NewTranslation) -> Result<(), DatastoreError> {
        let stored = TranslationRecord {
            id: Uuid::new_v4().to_string(),
            user_id: record.user_id,
            source_lang: record.source_lang,
            target_lang: record.target_lang,
            original_text: record.original_text,
            translated_text: record.translated_text,
            created_at_ms: now_ms(),
        };
        self.translations.lock().push(stored);
        Ok(())
    }

    async fn latest_transcription(
        &self,
        meeting_id: &str,
    ) -> Result<Option<TranscriptionRecord>, DatastoreError> {
        let transcriptions = self.transcriptions.lock();
        Ok(transcriptions
            .iter()
            .filter(|t| t.meeting_id == meeting_id)
            .max_by_key(|t| t.created_at_ms)
            .cloned())
    }

    async fn latest_translation(
        &self,
        user_id: &str,
    ) -> Result<Option<TranslationRecord>, DatastoreError> {
        let translations = self.translations.lock();
        Ok(translations
            .iter()
            .filter(|t| t.user_id == user_id)
            .max_by_key(|t| t.created_at_ms)
            .cloned())
    }
}
