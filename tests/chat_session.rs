// tests/chat_session.rs
//
// Chat session ordering, transcript rendering, and supersession of in-flight queries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crypto_jobs_dashboard::relay::{
    AskOutcome, ChatExchange, ChatSession, ClassifiedResponse, QueryRelay, Role, GREETING,
};

/// Echoes the query back as text.
struct Echo;

#[async_trait]
impl QueryRelay for Echo {
    async fn relay(&self, query: &str, _history: &[ChatExchange]) -> ClassifiedResponse {
        ClassifiedResponse::Text {
            text: format!("echo: {query}"),
        }
    }
    fn name(&self) -> &'static str {
        "echo"
    }
}

/// Blocks "slow" queries until released.
struct Gate {
    release: Notify,
}

#[async_trait]
impl QueryRelay for Gate {
    async fn relay(&self, query: &str, _history: &[ChatExchange]) -> ClassifiedResponse {
        if query == "slow" {
            self.release.notified().await;
        }
        ClassifiedResponse::Text {
            text: query.to_string(),
        }
    }
    fn name(&self) -> &'static str {
        "gate"
    }
}

#[tokio::test]
async fn exchanges_are_logged_in_order_with_monotonic_seq() {
    let session = ChatSession::new();
    for q in ["one", "two", "three"] {
        assert!(matches!(session.ask(&Echo, q).await, AskOutcome::Answered(_)));
    }
    let log = session.exchanges();
    let seqs: Vec<u64> = log.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
    assert_eq!(log[2].query, "three");
    assert!(!session.is_busy());
}

#[tokio::test]
async fn newer_query_supersedes_in_flight_one() {
    let session = Arc::new(ChatSession::new());
    let relay = Arc::new(Gate {
        release: Notify::new(),
    });

    let slow = {
        let session = session.clone();
        let relay = relay.clone();
        tokio::spawn(async move { session.ask(relay.as_ref(), "slow").await })
    };
    // Let the slow query register before the fast one starts.
    while !session.is_busy() {
        tokio::task::yield_now().await;
    }

    let fast = session.ask(relay.as_ref(), "fast").await;
    relay.release.notify_waiters();

    assert!(matches!(fast, AskOutcome::Answered(ref e) if e.query == "fast"));
    assert_eq!(slow.await.unwrap(), AskOutcome::Superseded { seq: 1 });

    let log = session.exchanges();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].query, "fast");
}

#[test]
fn stale_finish_is_dropped() {
    let session = ChatSession::new();
    let first = session.begin();
    let second = session.begin();
    assert!(first.cancel_token().is_cancelled());

    let answer = |t: &str| ClassifiedResponse::Text { text: t.into() };
    assert!(session.finish(first, "old", answer("old")).is_none());
    let kept = session.finish(second, "new", answer("new")).unwrap();
    assert_eq!(kept.seq, 2);
    assert_eq!(session.exchanges().len(), 1);
}

#[tokio::test]
async fn transcript_renders_each_response_kind() {
    struct Fixed(ClassifiedResponse);

    #[async_trait]
    impl QueryRelay for Fixed {
        async fn relay(&self, _q: &str, _h: &[ChatExchange]) -> ClassifiedResponse {
            self.0.clone()
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    let session = ChatSession::new();
    session
        .ask(
            &Fixed(ClassifiedResponse::Error {
                message: "bad column".into(),
                code: None,
                detail: None,
            }),
            "q1",
        )
        .await;
    session
        .ask(
            &Fixed(ClassifiedResponse::Number {
                value: serde_json::Number::from(7),
            }),
            "q2",
        )
        .await;
    session
        .ask(
            &Fixed(ClassifiedResponse::Chart {
                url: "http://x/c.png".into(),
            }),
            "q3",
        )
        .await;
    session
        .ask(
            &Fixed(ClassifiedResponse::Table {
                columns: vec![],
                rows: vec![],
            }),
            "q4",
        )
        .await;

    let t = session.transcript();
    assert_eq!(t.len(), 9);
    assert_eq!(t[0].role, Role::Assistant);
    assert_eq!(t[0].content, GREETING);
    assert_eq!(t[1].role, Role::User);
    assert_eq!(t[1].content, "q1");
    assert_eq!(t[2].content, "Error: bad column");
    assert_eq!(t[4].content, "7");
    assert_eq!(t[6].content, "See the chart below!");
    assert_eq!(t[8].content, "See the dataframe below!");
}

#[tokio::test]
async fn capacity_drops_oldest_exchanges() {
    let session = ChatSession::with_capacity(2);
    for q in ["a", "b", "c"] {
        session.ask(&Echo, q).await;
    }
    let queries: Vec<String> = session.exchanges().into_iter().map(|e| e.query).collect();
    assert_eq!(queries, vec!["b", "c"]);
    assert_eq!(session.latest().map(|e| e.seq), Some(3));
}

/// Never answers.
struct Hang;

#[async_trait]
impl QueryRelay for Hang {
    async fn relay(&self, _query: &str, _history: &[ChatExchange]) -> ClassifiedResponse {
        std::future::pending().await
    }
    fn name(&self) -> &'static str {
        "hang"
    }
}

#[tokio::test]
async fn dropped_query_leaves_the_session_idle() {
    let session = ChatSession::new();
    let out = tokio::time::timeout(Duration::from_millis(50), session.ask(&Hang, "q")).await;
    assert!(out.is_err());
    assert!(!session.is_busy());
    assert!(session.exchanges().is_empty());

    // The next query starts cleanly and is answered.
    match session.ask(&Echo, "again").await {
        AskOutcome::Answered(ex) => assert_eq!(ex.seq, 2),
        other => panic!("expected answer, got {other:?}"),
    }
}
