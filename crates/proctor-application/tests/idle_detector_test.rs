mod support;

use proctor_application::idle_detector::IDLE_NUDGES;
use proctor_application::protocol::OutboundEvent;
use proctor_application::{IdleDetector, IdlePolicy, SessionStore};
use proctor_core::clock::Clock;
use proctor_core::problem::ProblemCatalog;
use proctor_interaction::ClientSideSpeech;
use std::sync::Arc;
use std::time::Duration;
use support::{BrokenSpeech, CountingRepository, ManualClock, RecordingSink};

const WRITTEN_CODE: &str = "function twoSum(nums, target) {\n    const seen = new Map();\n    for (let i = 0; i < nums.length; i++) {\n";

fn policy() -> IdlePolicy {
    IdlePolicy {
        check_interval: Duration::from_secs(10),
        threshold: Duration::from_secs(120),
        min_code_length: 50,
    }
}

struct Harness {
    clock: Arc<ManualClock>,
    store: Arc<SessionStore>,
    sink: Arc<RecordingSink>,
    detector: Arc<IdleDetector>,
}

async fn harness(code: &str, speech_fails: bool) -> Harness {
    harness_with(code, speech_fails, true).await
}

async fn harness_with(code: &str, speech_fails: bool, started: bool) -> Harness {
    let clock = Arc::new(ManualClock::new());
    let store = support::store(Arc::new(CountingRepository::default()), clock.clone());
    store.get_or_create("s-1", None).await.unwrap();
    let code = code.to_string();
    let now = clock.now();
    store
        .update("s-1", move |s| {
            s.current_code = code;
            if started {
                s.start(now)?;
            }
            Ok(())
        })
        .await
        .unwrap();

    let sink = Arc::new(RecordingSink::default());
    let detector = if speech_fails {
        IdleDetector::new(
            store.clone(),
            sink.clone(),
            Arc::new(BrokenSpeech::default()),
            clock.clone(),
            policy(),
            true,
        )
    } else {
        IdleDetector::new(
            store.clone(),
            sink.clone(),
            Arc::new(ClientSideSpeech),
            clock.clone(),
            policy(),
            false,
        )
    };
    Harness {
        clock,
        store,
        sink,
        detector: Arc::new(detector),
    }
}

#[tokio::test]
async fn test_no_nudge_before_threshold() {
    let h = harness(WRITTEN_CODE, false).await;
    h.clock.advance_secs(120);
    assert!(h.detector.evaluate("s-1").await.unwrap().is_none());
    assert!(h.sink.events().is_empty());
}

#[tokio::test]
async fn test_nudge_fires_once_per_idle_stretch() {
    let h = harness(WRITTEN_CODE, false).await;
    h.clock.advance_secs(121);

    let nudge = h.detector.evaluate("s-1").await.unwrap().expect("due");
    assert!(!nudge.is_hint);
    assert!(IDLE_NUDGES.contains(&nudge.content.as_str()));

    for _ in 0..5 {
        h.clock.advance_secs(10);
        assert!(h.detector.evaluate("s-1").await.unwrap().is_none());
    }

    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0].1, OutboundEvent::ChatResponse(p) if !p.speak));
    let transcript = h.store.read("s-1", |s| s.chat_history().len()).await.unwrap();
    assert_eq!(transcript, 2);
}

#[tokio::test]
async fn test_activity_rearms_the_nudge() {
    let h = harness(WRITTEN_CODE, false).await;
    h.clock.advance_secs(121);
    assert!(h.detector.evaluate("s-1").await.unwrap().is_some());

    let now = h.clock.now();
    h.store
        .update_volatile("s-1", |s| s.touch(now))
        .await
        .unwrap();
    h.clock.advance_secs(60);
    assert!(h.detector.evaluate("s-1").await.unwrap().is_none());

    h.clock.advance_secs(61);
    assert!(h.detector.evaluate("s-1").await.unwrap().is_some());
    assert_eq!(h.sink.events().len(), 2);
}

#[tokio::test]
async fn test_short_code_is_never_nudged() {
    let h = harness("function twoSum() {}", false).await;
    h.clock.advance_secs(600);
    assert!(h.detector.evaluate("s-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_session_not_started_is_never_nudged() {
    let h = harness_with(WRITTEN_CODE, false, false).await;
    h.clock.advance_secs(600);
    assert!(h.detector.evaluate("s-1").await.unwrap().is_none());
    assert!(h.sink.events().is_empty());
}

#[tokio::test]
async fn test_untouched_starter_code_is_never_nudged() {
    let catalog = ProblemCatalog::builtin();
    let starter = &catalog.get("two-sum").unwrap().initial_code;
    assert!(starter.chars().count() > policy().min_code_length);

    let h = harness(starter, false).await;
    h.clock.advance_secs(600);
    assert!(h.detector.evaluate("s-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_speech_failure_does_not_block_delivery() {
    let h = harness(WRITTEN_CODE, true).await;
    h.clock.advance_secs(121);

    let nudge = h.detector.evaluate("s-1").await.unwrap();
    assert!(nudge.is_some());

    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0].1, OutboundEvent::ChatResponse(p) if p.speak));
    let nudged = h.store.read("s-1", |s| s.idle_nudge_sent).await.unwrap();
    assert!(nudged);
}

#[tokio::test(start_paused = true)]
async fn test_watch_checks_periodically_and_stops_on_unwatch() {
    let h = harness(WRITTEN_CODE, false).await;
    h.clock.advance_secs(121);

    h.detector.watch("s-1").await;
    h.detector.watch("s-1").await;
    assert!(h.detector.is_watching("s-1").await);

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(h.sink.events().len(), 1);

    h.detector.unwatch("s-1").await;
    assert!(!h.detector.is_watching("s-1").await);

    let now = h.clock.now();
    h.store.update_volatile("s-1", |s| s.touch(now)).await.unwrap();
    h.clock.advance_secs(500);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.sink.events().len(), 1, "no checks after unwatch");
}

#[tokio::test(start_paused = true)]
async fn test_watch_ends_when_session_is_evicted() {
    let h = harness(WRITTEN_CODE, false).await;
    h.detector.watch("s-1").await;
    h.store.evict("s-1").await;

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(!h.detector.is_watching("s-1").await);
}
