// SPDX-License-Identifier: MIT

use super::*;
use hew_core::FakeClock;
use std::time::Duration;

fn broker() -> (QuestionBroker<FakeClock>, Arc<Storage<FakeClock>>, SessionId) {
    let storage = Arc::new(Storage::in_memory(FakeClock::new()).unwrap());
    let session = storage.create_session("/srv/p", "").unwrap();
    (QuestionBroker::new(storage.clone()), storage, session.id)
}

fn question(prompt: &str) -> Question {
    Question { prompt: prompt.to_string(), options: vec!["yes".to_string(), "no".to_string()] }
}

/// Wait until the session has a pending row, so the answering side knows
/// `ask` has registered itself.
async fn wait_for_pending(broker: &QuestionBroker<FakeClock>, session: &SessionId) -> PendingQuestion {
    for _ in 0..100 {
        if let Some(pending) = broker.get_first(session).unwrap() {
            return pending;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no pending question appeared");
}

#[tokio::test]
async fn ask_suspends_until_answered() {
    let (broker, _storage, session) = broker();

    let asking = {
        let broker = broker.clone();
        let session = session;
        tokio::spawn(async move {
            broker
                .ask(&session, vec![question("apply the migration?")], Some("db-tool"), &CancellationToken::new())
                .await
        })
    };

    let pending = wait_for_pending(&broker, &session).await;
    assert_eq!(pending.state, QuestionState::Pending);
    assert_eq!(pending.questions[0].prompt, "apply the migration?");
    assert_eq!(pending.tool.as_deref(), Some("db-tool"));

    broker.answer(&pending.id, vec!["yes".to_string()]).unwrap();

    let answers = asking.await.unwrap().unwrap();
    assert_eq!(answers, vec!["yes".to_string()]);

    // Row persisted as answered; no longer pending.
    assert!(!broker.has_pending(&session).unwrap());
}

#[tokio::test]
async fn skip_rejects_with_the_skipped_error() {
    let (broker, _storage, session) = broker();

    let asking = {
        let broker = broker.clone();
        tokio::spawn(async move {
            broker.ask(&session, vec![question("q")], None, &CancellationToken::new()).await
        })
    };

    let pending = wait_for_pending(&broker, &session).await;
    broker.skip(&pending.id).unwrap();

    let result = asking.await.unwrap();
    assert!(matches!(result, Err(AskError::Skipped)), "got {result:?}");
}

#[tokio::test]
async fn reject_carries_a_custom_message() {
    let (broker, _storage, session) = broker();

    let asking = {
        let broker = broker.clone();
        tokio::spawn(async move {
            broker.ask(&session, vec![question("q")], None, &CancellationToken::new()).await
        })
    };

    let pending = wait_for_pending(&broker, &session).await;
    broker.reject(&pending.id, Some("not in this repo".to_string())).unwrap();

    match asking.await.unwrap() {
        Err(AskError::Rejected(message)) => assert_eq!(message, "not in this repo"),
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_rejects_the_waiting_side() {
    let (broker, _storage, session) = broker();
    let cancel = CancellationToken::new();

    let asking = {
        let broker = broker.clone();
        let cancel = cancel.clone();
        tokio::spawn(
            async move { broker.ask(&session, vec![question("q")], None, &cancel).await },
        )
    };

    wait_for_pending(&broker, &session).await;
    cancel.cancel();

    let result = asking.await.unwrap();
    assert!(matches!(result, Err(AskError::Cancelled)), "got {result:?}");

    // The row stays pending: the UI may still answer it later, it just
    // wakes nobody.
    assert!(broker.has_pending(&session).unwrap());
}

#[tokio::test]
async fn answering_a_row_with_no_resolver_records_but_wakes_nobody() {
    let (broker, storage, session) = broker();

    // A row left over from a previous process: no in-memory resolver.
    storage
        .conn()
        .unwrap()
        .execute(
            "INSERT INTO pending_questions (id, session_id, state, questions, created_at)
             VALUES ('qst-orphan', ?1, 'pending', '[{\"prompt\":\"old?\"}]', 0)",
            rusqlite::params![session.as_str()],
        )
        .unwrap();

    broker.answer(&QuestionId::from_string("qst-orphan"), vec!["ok".to_string()]).unwrap();

    let row = storage.get_question(&QuestionId::from_string("qst-orphan")).unwrap().unwrap();
    assert_eq!(row.state, QuestionState::Answered);
    assert_eq!(row.answers, Some(vec!["ok".to_string()]));
}

#[tokio::test]
async fn answer_of_unknown_question_is_not_found() {
    let (broker, _storage, _session) = broker();
    let err = broker
        .answer(&QuestionId::from_string("qst-missing"), vec![])
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn pending_reads_are_ordered_oldest_first() {
    let (broker, storage, session) = broker();

    for (i, prompt) in ["first", "second"].iter().enumerate() {
        storage
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO pending_questions (id, session_id, state, questions, created_at)
                 VALUES (?1, ?2, 'pending', ?3, ?4)",
                rusqlite::params![
                    format!("qst-{i}"),
                    session.as_str(),
                    format!("[{{\"prompt\":\"{prompt}\"}}]"),
                    i as u64
                ],
            )
            .unwrap();
    }

    let pending = broker.get_pending(&session).unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].questions[0].prompt, "first");
    assert_eq!(broker.get_first(&session).unwrap().unwrap().questions[0].prompt, "first");
    assert!(broker.has_pending(&session).unwrap());
}
