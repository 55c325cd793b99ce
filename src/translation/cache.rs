//! 翻訳キャッシュ
//!
//! `(source, target, text)` の完全一致でのみヒットする有界キャッシュ。
//! 挿入後に上限を超えた分は、挿入の古い順に追い出します。
use std::collections::HashMap;

use parking_lot::Mutex;

use crate::util::now_ms;

/// キャッシュキー（完全一致のみ）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source_lang: String,
    pub target_lang: String,
    pub text: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    inserted_at_ms: i64,
    /// 同一ミリ秒での挿入でも追い出し順が決まるよう単調増加の連番を併記
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    next_seq: u64,
}

#[derive(Debug)]
pub struct TranslationCache {
    state: Mutex<CacheState>,
    max_entries: usize,
}

impl TranslationCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_entries,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.state.lock().entries.get(key).map(|e| e.value.clone())
    }

    /// 挿入し、上限超過分を古い順に追い出す
    pub fn insert(&self, key: CacheKey, value: String) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at_ms: now_ms(),
                seq,
            },
        );

        if state.entries.len() > self.max_entries {
            let overflow = state.entries.len() - self.max_entries;
            let mut order: Vec<(CacheKey, i64, u64)> = state
                .entries
                .iter()
                .map(|(k, e)| (k.clone(), e.inserted_at_ms, e.seq))
                .collect();
            order.sort_by_key(|(_, ts, seq)| (*ts, *seq));
            for (key, _, _) in order.into_iter().take(overflow) {
                state.entries.remove(&key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// 全エントリを破棄（ライフサイクル終了時）
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }
}
