//! 小さな共通ユーティリティ
use chrono::Utc;

/// 現在時刻をミリ秒で返す（キャプションtsと同じ時間軸）
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
