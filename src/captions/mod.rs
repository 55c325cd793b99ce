//! キャプション取り込みモジュール
//!
//! - `CaptionEvent` はトランスポート経由で届くワイヤイベント
//! - `CaptionReassembler` は分割チャンクの再結合とpartialのスロットルを担当
//! - `CaptionStore` は発話ID単位でマージされる有界バッファ
mod event;
mod reassembler;
mod store;

pub use event::{CaptionEvent, CaptionEventKind};
pub use reassembler::CaptionReassembler;
pub use store::{CaptionEntry, CaptionStore, CaptionUpdate};
