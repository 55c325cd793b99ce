//! キャプションのワイヤイベント定義
//!
//! トランスポート層はJSONをそのまま渡してくるため、全フィールドを
//! Optionで受けてから `CaptionReassembler` 側で検証します。
//! `text` が文字列以外の場合はデシリアライズ自体が失敗し、イベントは破棄されます。
use serde::Deserialize;

/// イベント種別（partial: 途中経過 / final: 確定）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionEventKind {
    Partial,
    Final,
}

/// トランスポートから届くキャプションイベント
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionEvent {
    #[serde(default)]
    pub v: Option<u32>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub speaker_user_id: Option<String>,
    #[serde(default)]
    pub speaker_name: Option<String>,
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default)]
    pub utterance_id: Option<String>,
    #[serde(default)]
    pub chunk_index: Option<usize>,
    #[serde(default)]
    pub chunk_count: Option<usize>,
}

impl CaptionEvent {
    /// 既知のイベント種別へ変換（未知の種別はNone）
    pub fn event_kind(&self) -> Option<CaptionEventKind> {
        match self.kind.as_deref() {
            Some("caption.partial") => Some(CaptionEventKind::Partial),
            Some("caption.final") => Some(CaptionEventKind::Final),
            _ => None,
        }
    }
}
