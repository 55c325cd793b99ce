//! キャプションストア
//!
//! 発話ID単位でマージされる、時系列順・有界の可変バッファ。
//! 取り込みタスクとHTTPハンドラの両方から触られるため、
//! read-merge-write を `parking_lot::Mutex` でひとまとめに保護します。
use parking_lot::Mutex;

/// ストアに保持されるキャプション1件
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionEntry {
    pub utterance_id: String,
    pub speaker_user_id: String,
    pub speaker_name: Option<String>,
    pub source_lang: String,
    pub text: String,
    pub translated_text: Option<String>,
    pub is_final: bool,
    pub ts: i64,
}

/// リアセンブラが生成する正規化済み更新
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionUpdate {
    pub utterance_id: String,
    pub speaker_user_id: String,
    pub speaker_name: Option<String>,
    pub source_lang: String,
    pub text: String,
    pub is_final: bool,
    pub ts: i64,
}

#[derive(Debug)]
pub struct CaptionStore {
    entries: Mutex<Vec<CaptionEntry>>,
    max_entries: usize,
}

impl CaptionStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            max_entries,
        }
    }

    /// 発話IDでマージするupsert
    ///
    /// - 未登録なら追加、登録済みなら提供フィールドを上書き
    ///   （`speaker_name` が無い更新は既存値を保持、翻訳は常に保持）
    /// - ts昇順へ再ソートし、上限超過分は古いものから破棄
    /// - マージ後のエントリ複製を返す
    pub fn upsert(&self, update: CaptionUpdate) -> CaptionEntry {
        let mut entries = self.entries.lock();

        let merged = match entries
            .iter_mut()
            .find(|e| e.utterance_id == update.utterance_id)
        {
            Some(existing) => {
                existing.speaker_user_id = update.speaker_user_id;
                if let Some(name) = update.speaker_name {
                    existing.speaker_name = Some(name);
                }
                existing.source_lang = update.source_lang;
                existing.text = update.text;
                existing.is_final = update.is_final;
                existing.ts = update.ts;
                existing.clone()
            }
            None => {
                let entry = CaptionEntry {
                    utterance_id: update.utterance_id,
                    speaker_user_id: update.speaker_user_id,
                    speaker_name: update.speaker_name,
                    source_lang: update.source_lang,
                    text: update.text,
                    translated_text: None,
                    is_final: update.is_final,
                    ts: update.ts,
                };
                entries.push(entry.clone());
                entry
            }
        };

        entries.sort_by_key(|e| e.ts);
        if entries.len() > self.max_entries {
            let overflow = entries.len() - self.max_entries;
            entries.drain(..overflow);
        }

        merged
    }

    /// 対象エントリへ翻訳テキストを設定（未登録ならno-op）
    pub fn update_translation(&self, utterance_id: &str, translated: &str) -> Option<CaptionEntry> {
        let mut entries = self.entries.lock();
        entries
            .iter_mut()
            .find(|e| e.utterance_id == utterance_id)
            .map(|entry| {
                entry.translated_text = Some(translated.to_string());
                entry.clone()
            })
    }

    /// 現在の並び順のスナップショットを返す
    pub fn snapshot(&self) -> Vec<CaptionEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// 全キャプションを破棄
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
