// SPDX-License-Identifier: MIT

//! Persistence survives process boundaries; resolvers do not.

use hew_core::FakeClock;
use hew_storage::{QuestionBroker, Role, Storage};
use std::sync::Arc;

#[tokio::test]
async fn sessions_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hew.db");

    let session_id = {
        let storage = Storage::open(&path, FakeClock::new()).unwrap();
        let session = storage.create_session("/srv/p", "long running work").unwrap();
        let message = storage.append_message(&session.id, None, Role::User).unwrap();
        storage
            .add_part(&message.id, hew_storage::PartKind::Text, "hello", 0)
            .unwrap();
        session.id
    };

    let reopened = Storage::open(&path, FakeClock::new()).unwrap();
    let session = reopened.get_session(&session_id).unwrap().unwrap();
    assert_eq!(session.title, "long running work");
    assert_eq!(reopened.count_messages(&session_id).unwrap(), 1);
}

#[tokio::test]
async fn pending_questions_outlive_their_resolvers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hew.db");

    let (session_id, question_id) = {
        let storage = Arc::new(Storage::open(&path, FakeClock::new()).unwrap());
        let broker = QuestionBroker::new(storage.clone());
        let session = storage.create_session("/srv/p", "").unwrap();

        let asking = {
            let broker = broker.clone();
            let session_id = session.id;
            tokio::spawn(async move {
                broker
                    .ask(
                        &session_id,
                        vec![hew_storage::Question {
                            prompt: "continue?".to_string(),
                            options: vec![],
                        }],
                        None,
                        &tokio_util::sync::CancellationToken::new(),
                    )
                    .await
            })
        };

        // Wait for the row, then simulate process death by aborting the
        // asking task and dropping the broker.
        let pending = loop {
            if let Some(p) = broker.get_first(&session.id).unwrap() {
                break p;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        };
        asking.abort();
        (session.id, pending.id)
    };

    // A fresh process sees the row, still pending, and can settle it.
    let storage = Arc::new(Storage::open(&path, FakeClock::new()).unwrap());
    let broker = QuestionBroker::new(storage.clone());
    let pending = broker.get_pending(&session_id).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, question_id);

    broker.answer(&question_id, vec!["yes".to_string()]).unwrap();
    assert!(!broker.has_pending(&session_id).unwrap());
}
