//! スライディングウィンドウ式レートリミッタ
//!
//! 呼び出し元ごとに `(count, window_start)` を保持。ウィンドウ経過後の
//! リクエストはカウント1の新規ウィンドウで受理、ウィンドウ内は上限到達で拒否。
//! 表自体も有界で、上限超過時は期限切れ→古い順に破棄します。
use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    window: Duration,
    max_requests: u32,
    max_callers: usize,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32, max_callers: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
            max_requests,
            max_callers,
        }
    }

    /// リクエストを受理するか判定（受理時はカウントを消費）
    pub fn check(&self, caller: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock();

        if let Some(window) = windows.get_mut(caller) {
            if now.duration_since(window.started_at) <= self.window {
                if window.count >= self.max_requests {
                    return false;
                }
                window.count += 1;
                return true;
            }
        }

        // 新規またはウィンドウ経過後はカウント1で開始
        windows.insert(
            caller.to_string(),
            Window {
                count: 1,
                started_at: now,
            },
        );

        if windows.len() > self.max_callers {
            Self::prune(&mut windows, self.window, self.max_callers, now);
        }
        true
    }

    /// 期限切れウィンドウを捨て、なお超過していれば古い順に削る
    fn prune(
        windows: &mut HashMap<String, Window>,
        window_len: Duration,
        max_callers: usize,
        now: Instant,
    ) {
        windows.retain(|_, w| now.duration_since(w.started_at) <= window_len);
        if windows.len() <= max_callers {
            return;
        }

        let mut order: Vec<(String, Instant)> = windows
            .iter()
            .map(|(k, w)| (k.clone(), w.started_at))
            .collect();
        order.sort_by_key(|(_, started)| *started);
        let overflow = windows.len() - max_callers;
        for (caller, _) in order.into_iter().take(overflow) {
            windows.remove(&caller);
        }
    }

    pub fn tracked_callers(&self) -> usize {
        self.windows.lock().len()
    }

    /// 全ウィンドウを破棄（ライフサイクル終了時）
    pub fn reset(&self) {
        self.windows.lock().clear();
    }
}
