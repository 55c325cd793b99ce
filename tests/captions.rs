use std::time::Duration;

use caption_translator_api::captions::{CaptionReassembler, CaptionStore, CaptionUpdate};
use caption_translator_api::config::CaptionPipelineConfig;

fn caption_json(kind: &str, utterance: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "v": 1,
        "type": kind,
        "speakerUserId": "user-1",
        "speakerName": "Alice",
        "sourceLang": "es",
        "text": text,
        "ts": 1_000,
        "utteranceId": utterance,
    })
}

fn test_config() -> CaptionPipelineConfig {
    CaptionPipelineConfig {
        partial_throttle_ms: 50,
        ..CaptionPipelineConfig::default()
    }
}

#[test]
fn final_event_is_normalized() {
    let mut reassembler = CaptionReassembler::new(test_config());
    let update = reassembler
        .accept_json(&caption_json("caption.final", "utt-1", "  hola mundo  "))
        .expect("final event accepted");

    assert_eq!(update.utterance_id, "utt-1");
    assert_eq!(update.speaker_user_id, "user-1");
    assert_eq!(update.speaker_name.as_deref(), Some("Alice"));
    assert_eq!(update.source_lang, "es");
    assert_eq!(update.text, "hola mundo");
    assert!(update.is_final);
    assert_eq!(update.ts, 1_000);
}

#[test]
fn missing_source_lang_defaults_to_auto() {
    let mut reassembler = CaptionReassembler::new(test_config());
    let mut event = caption_json("caption.final", "utt-1", "hola");
    event.as_object_mut().unwrap().remove("sourceLang");

    let update = reassembler.accept_json(&event).expect("accepted");
    assert_eq!(update.source_lang, "auto");
}

#[test]
fn invalid_events_are_dropped() {
    let mut reassembler = CaptionReassembler::new(test_config());

    // バージョン不一致
    let mut event = caption_json("caption.final", "utt-1", "hola");
    event["v"] = serde_json::json!(2);
    assert!(reassembler.accept_json(&event).is_none());

    // 未知の種別
    let mut event = caption_json("caption.final", "utt-1", "hola");
    event["type"] = serde_json::json!("caption.unknown");
    assert!(reassembler.accept_json(&event).is_none());

    // 発話ID欠落
    let mut event = caption_json("caption.final", "", "hola");
    event["utteranceId"] = serde_json::json!("");
    assert!(reassembler.accept_json(&event).is_none());

    // textが文字列でない
    let mut event = caption_json("caption.final", "utt-1", "hola");
    event["text"] = serde_json::json!(42);
    assert!(reassembler.accept_json(&event).is_none());

    // 空白のみのtext
    assert!(reassembler
        .accept_json(&caption_json("caption.final", "utt-1", "   "))
        .is_none());
}

#[test]
fn oversized_text_is_dropped() {
    let config = CaptionPipelineConfig {
        max_event_text_len: 10,
        ..test_config()
    };
    let mut reassembler = CaptionReassembler::new(config);

    assert!(reassembler
        .accept_json(&caption_json("caption.final", "utt-1", "0123456789A"))
        .is_none());
    assert!(reassembler
        .accept_json(&caption_json("caption.final", "utt-1", "0123456789"))
        .is_some());
}

#[test]
fn partials_are_throttled_but_finals_pass() {
    let mut reassembler = CaptionReassembler::new(test_config());

    assert!(reassembler
        .accept_json(&caption_json("caption.partial", "utt-1", "ho"))
        .is_some());
    // スロットル間隔内のpartialは別発話でも落ちる
    assert!(reassembler
        .accept_json(&caption_json("caption.partial", "utt-2", "bo"))
        .is_none());
    // finalはスロットルの影響を受けない
    assert!(reassembler
        .accept_json(&caption_json("caption.final", "utt-3", "listo"))
        .is_some());

    std::thread::sleep(Duration::from_millis(60));
    assert!(reassembler
        .accept_json(&caption_json("caption.partial", "utt-2", "bon"))
        .is_some());
}

#[test]
fn chunked_event_reassembles_in_index_order() {
    let mut reassembler = CaptionReassembler::new(test_config());

    let chunk = |index: usize, text: &str| {
        let mut event = caption_json("caption.final", "utt-1", text);
        event["chunkIndex"] = serde_json::json!(index);
        event["chunkCount"] = serde_json::json!(3);
        event
    };

    // 順不同で到着しても全スロットが埋まるまで出力されない
    assert!(reassembler.accept_json(&chunk(2, "tres")).is_none());
    assert!(reassembler.accept_json(&chunk(0, "uno ")).is_none());
    assert_eq!(reassembler.pending_groups(), 1);

    let update = reassembler
        .accept_json(&chunk(1, "dos "))
        .expect("complete group emits");
    assert_eq!(update.text, "uno dos tres");
    assert_eq!(reassembler.pending_groups(), 0);
}

#[test]
fn chunk_index_out_of_range_is_dropped() {
    let mut reassembler = CaptionReassembler::new(test_config());

    let mut event = caption_json("caption.final", "utt-1", "x");
    event["chunkIndex"] = serde_json::json!(3);
    event["chunkCount"] = serde_json::json!(3);
    assert!(reassembler.accept_json(&event).is_none());
    assert_eq!(reassembler.pending_groups(), 0);
}

#[test]
fn chunk_count_redeclaration_does_not_corrupt_group() {
    let mut reassembler = CaptionReassembler::new(test_config());

    let chunk = |index: usize, count: usize, text: &str| {
        let mut event = caption_json("caption.final", "utt-1", text);
        event["chunkIndex"] = serde_json::json!(index);
        event["chunkCount"] = serde_json::json!(count);
        event
    };

    // 2スロットのグループを開始
    assert!(reassembler.accept_json(&chunk(0, 2, "hola ")).is_none());
    // 同じ発話がより大きなchunkCountとその範囲のindexで届いても
    // 既存グループの外を書こうとしてはならない
    assert!(reassembler.accept_json(&chunk(4, 5, "ruido")).is_none());
    assert_eq!(reassembler.pending_groups(), 1);

    // 元の宣言どおりの断片でグループは完成する
    let update = reassembler
        .accept_json(&chunk(1, 2, "mundo"))
        .expect("original declaration completes");
    assert_eq!(update.text, "hola mundo");
    assert_eq!(reassembler.pending_groups(), 0);
}

#[test]
fn text_length_limit_counts_characters_not_bytes() {
    let config = CaptionPipelineConfig {
        max_event_text_len: 10,
        ..test_config()
    };
    let mut reassembler = CaptionReassembler::new(config);

    // 10文字（UTF-8では30バイト）の日本語は受理される
    assert!(reassembler
        .accept_json(&caption_json("caption.final", "utt-1", "こんにちは世界ですよ"))
        .is_some());
    // 11文字は上限超過
    assert!(reassembler
        .accept_json(&caption_json("caption.final", "utt-2", "こんにちは世界ですよね"))
        .is_none());
}

#[test]
fn rejected_partial_does_not_consume_throttle_slot() {
    let mut reassembler = CaptionReassembler::new(test_config());

    // 空白のみのpartialは破棄され、スロットル枠を消費しない
    assert!(reassembler
        .accept_json(&caption_json("caption.partial", "utt-1", "   "))
        .is_none());
    // 直後の正当なpartialはそのまま通る
    assert!(reassembler
        .accept_json(&caption_json("caption.partial", "utt-1", "hola"))
        .is_some());
}

fn update(utterance: &str, text: &str, ts: i64, is_final: bool) -> CaptionUpdate {
    CaptionUpdate {
        utterance_id: utterance.to_string(),
        speaker_user_id: "user-1".to_string(),
        speaker_name: None,
        source_lang: "es".to_string(),
        text: text.to_string(),
        is_final,
        ts,
    }
}

#[test]
fn store_merges_by_utterance_and_keeps_translation() {
    let store = CaptionStore::new(20);

    let mut partial = update("utt-1", "hola", 100, false);
    partial.speaker_name = Some("Alice".to_string());
    store.upsert(partial);

    store.update_translation("utt-1", "hello");

    // speaker_name無しの更新でも既存の名前と翻訳は残る
    let merged = store.upsert(update("utt-1", "hola mundo", 200, true));
    assert_eq!(merged.speaker_name.as_deref(), Some("Alice"));
    assert_eq!(merged.translated_text.as_deref(), Some("hello"));
    assert_eq!(merged.text, "hola mundo");
    assert!(merged.is_final);
    assert_eq!(store.len(), 1);
}

#[test]
fn store_trims_oldest_beyond_capacity() {
    let store = CaptionStore::new(3);

    for i in 0..5 {
        store.upsert(update(&format!("utt-{i}"), "texto", i as i64, true));
    }

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 3);
    let ids: Vec<&str> = snapshot.iter().map(|e| e.utterance_id.as_str()).collect();
    assert_eq!(ids, vec!["utt-2", "utt-3", "utt-4"]);
    // ts昇順を維持
    assert!(snapshot.windows(2).all(|w| w[0].ts <= w[1].ts));
}

#[test]
fn store_translation_update_for_unknown_id_is_noop() {
    let store = CaptionStore::new(20);
    assert!(store.update_translation("missing", "hello").is_none());
    assert!(store.is_empty());
}

#[test]
fn store_clear_drops_everything() {
    let store = CaptionStore::new(20);
    store.upsert(update("utt-1", "hola", 100, true));
    store.clear();
    assert!(store.is_empty());
}
