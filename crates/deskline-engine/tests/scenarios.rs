// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end coordination scenarios against the in-memory and SQLite stores.

use deskline_core::{
    AgentId, BlobRef, ClosingFeedback, ConversationStatus, DesklineError, MediaKind,
    MessagePayload, Notice, Sender,
};
use deskline_engine::{ClaimOutcome, CloseOutcome, ShareOutcome, ViewFilter};
use deskline_test_utils::TestHarness;
use tracing_test::traced_test;

fn feedback(status: &str) -> ClosingFeedback {
    ClosingFeedback {
        communication_status: Some(status.to_string()),
        ..ClosingFeedback::default()
    }
}

#[tokio::test]
async fn claim_append_close_happy_path() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let b = TestHarness::agent("b");
    let c = h.queued("cust-1").await.unwrap();

    let outcome = h.desk.claim(&c.id, &a).await.unwrap();
    let ClaimOutcome::Claimed { conversation, resumed } = outcome else {
        panic!("expected a fresh claim");
    };
    assert!(!resumed);
    assert_eq!(conversation.status, ConversationStatus::Active);
    assert_eq!(conversation.owner_agent_id, Some(AgentId::from("a")));
    assert!(conversation.started_at.is_some());

    assert_eq!(
        h.desk.claim(&c.id, &b).await.unwrap(),
        ClaimOutcome::AlreadyOwned {
            owner: AgentId::from("a")
        }
    );

    h.desk.send_text(&c.id, &a, "hello").await.unwrap();
    let agent_entries: Vec<_> = h
        .desk
        .messages(&c.id, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.notice.is_none())
        .collect();
    assert_eq!(agent_entries.len(), 1);
    assert_eq!(agent_entries[0].payload, MessagePayload::text("hello"));

    // Feedback arrives from the presentation layer with its legacy key.
    let fb: ClosingFeedback = serde_json::from_str(r#"{"statusComunicacao":"SIM"}"#).unwrap();
    let closed = h.desk.close(&c.id, &a, fb).await.unwrap();
    let convo = closed.conversation();
    assert_eq!(convo.status, ConversationStatus::Closed);
    assert_eq!(convo.owner_agent_id, None);
    assert!(convo.shared_with.is_empty());
    assert!(convo.closed_at.is_some());
    assert_eq!(
        convo
            .closing_feedback
            .as_ref()
            .and_then(|f| f.communication_status.as_deref()),
        Some("SIM")
    );
}

#[tokio::test]
async fn claim_writes_welcome_with_intake() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.queued("Ana").await.unwrap();
    h.desk.claim(&c.id, &a).await.unwrap();

    let log = h.desk.messages(&c.id, None).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].notice, Some(Notice::Welcome));
    assert_eq!(log[0].sender, Sender::System);
    let MessagePayload::Text { text } = &log[0].payload else {
        panic!("welcome should be text");
    };
    assert!(text.contains("Ana"));
    assert!(text.contains("Phone: N/A"));
    assert!(text.contains("GPRS - V2COM"));

    let convo = h.desk.conversation(&c.id).await.unwrap();
    assert_eq!(
        convo.last_message.map(|m| m.text),
        Some(h.desk.settings().messages.claim_summary.clone())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_have_exactly_one_winner() {
    for _ in 0..10 {
        let h = TestHarness::new().await.unwrap();
        let c = h.queued("cust").await.unwrap();

        let mut handles = Vec::new();
        for id in ["a", "b", "c", "d"] {
            let desk = h.desk.clone();
            let conv = c.id.clone();
            handles.push(tokio::spawn(async move {
                desk.claim(&conv, &TestHarness::agent(id)).await.unwrap()
            }));
        }
        let mut claimed = 0;
        let mut lost = 0;
        for handle in handles {
            match handle.await.unwrap() {
                ClaimOutcome::Claimed { resumed: false, .. } => claimed += 1,
                ClaimOutcome::AlreadyOwned { .. } => lost += 1,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!((claimed, lost), (1, 3));
    }
}

#[tokio::test]
async fn sqlite_concurrent_claims_have_exactly_one_winner() {
    let h = TestHarness::builder().with_sqlite().build().await.unwrap();
    let c = h.queued("cust").await.unwrap();
    let (a, b) = (TestHarness::agent("a"), TestHarness::agent("b"));
    let (ra, rb) = tokio::join!(h.desk.claim(&c.id, &a), h.desk.claim(&c.id, &b));
    let outcomes = [ra.unwrap(), rb.unwrap()];
    assert_eq!(outcomes.iter().filter(|o| o.is_claimed()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, ClaimOutcome::AlreadyOwned { .. }))
            .count(),
        1
    );
}

#[tokio::test]
async fn capacity_limit_then_release_by_close() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let mut owned = Vec::new();
    for i in 0..3 {
        owned.push(h.active_for(&format!("cust-{i}"), &a).await.unwrap());
    }

    let fourth = h.queued("cust-4").await.unwrap();
    let before = h.desk.conversation(&fourth.id).await.unwrap();
    assert_eq!(
        h.desk.claim(&fourth.id, &a).await.unwrap(),
        ClaimOutcome::CapacityExceeded { active: 3, limit: 3 }
    );
    // Failure leaves state untouched.
    assert_eq!(h.desk.conversation(&fourth.id).await.unwrap(), before);
    assert!(h.desk.messages(&fourth.id, None).await.unwrap().is_empty());

    h.desk.close(&owned[0].id, &a, feedback("SIM")).await.unwrap();
    assert!(h.desk.claim(&fourth.id, &a).await.unwrap().is_claimed());
}

#[tokio::test]
async fn capacity_is_checked_before_ownership() {
    let h = TestHarness::builder().with_capacity(1).build().await.unwrap();
    let a = TestHarness::agent("a");
    let b = TestHarness::agent("b");
    let mine = h.active_for("cust-a", &a).await.unwrap();
    let theirs = h.active_for("cust-b", &b).await.unwrap();

    assert_eq!(
        h.desk.claim(&theirs.id, &a).await.unwrap(),
        ClaimOutcome::CapacityExceeded { active: 1, limit: 1 }
    );
    // The owner's own reclaim stays a no-op even at the limit.
    assert!(matches!(
        h.desk.claim(&mine.id, &a).await.unwrap(),
        ClaimOutcome::Claimed { resumed: true, .. }
    ));
    // With room left, the same conflict reports the owner.
    h.desk.close(&mine.id, &a, feedback("SIM")).await.unwrap();
    assert_eq!(
        h.desk.claim(&theirs.id, &a).await.unwrap(),
        ClaimOutcome::AlreadyOwned {
            owner: AgentId::from("b")
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_by_one_agent_respect_capacity() {
    let h = TestHarness::builder().with_capacity(2).build().await.unwrap();
    let a = TestHarness::agent("a");
    let mut ids = Vec::new();
    for i in 0..6 {
        ids.push(h.queued(&format!("cust-{i}")).await.unwrap().id);
    }

    let mut handles = Vec::new();
    for id in ids {
        let desk = h.desk.clone();
        let a = a.clone();
        handles.push(tokio::spawn(async move { desk.claim(&id, &a).await.unwrap() }));
    }
    let mut claimed = 0;
    for handle in handles {
        if handle.await.unwrap().is_claimed() {
            claimed += 1;
        }
    }
    assert_eq!(claimed, 2);
    assert_eq!(h.desk.active_count(&a.agent_id).await.unwrap(), 2);
}

#[tokio::test]
async fn reclaim_by_owner_is_idempotent() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.active_for("cust", &a).await.unwrap();
    let again = h.desk.claim(&c.id, &a).await.unwrap();
    assert!(matches!(again, ClaimOutcome::Claimed { resumed: true, .. }));
    // No second welcome.
    assert_eq!(h.desk.messages(&c.id, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn pending_intake_is_claimable() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.desk.open_conversation("cust", "Ana").await.unwrap();
    assert!(h.desk.claim(&c.id, &a).await.unwrap().is_claimed());

    let log = h.desk.messages(&c.id, None).await.unwrap();
    let MessagePayload::Text { text } = &log[0].payload else {
        panic!("welcome should be text");
    };
    assert_eq!(text, "Hi Ana, your support session is starting.");

    let err = h
        .desk
        .submit_intake(&c.id, TestHarness::intake("Ana"))
        .await
        .unwrap_err();
    assert!(matches!(err, DesklineError::InvalidTransition { .. }));
}

#[tokio::test]
async fn share_grants_access_and_strangers_are_denied() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let b = TestHarness::agent("b");
    let stranger = TestHarness::agent("c");
    let c = h.active_for("cust", &a).await.unwrap();

    let shared = h.desk.share(&c.id, &a, "b@x.com").await.unwrap();
    assert!(matches!(shared, ShareOutcome::Shared(_)));
    assert_eq!(
        h.desk.share(&c.id, &a, "B@X.com").await.unwrap(),
        ShareOutcome::AlreadyShared
    );
    assert_eq!(
        h.desk.share(&c.id, &b, "c@x.com").await.unwrap(),
        ShareOutcome::NotOwner,
        "grantees may not re-share"
    );

    h.desk.send_text(&c.id, &b, "from b").await.unwrap();
    let err = h.desk.send_text(&c.id, &stranger, "intrusion").await.unwrap_err();
    assert!(matches!(err, DesklineError::AccessDenied { .. }));

    // Grantees cannot close, and do not count against their own capacity.
    let err = h.desk.close(&c.id, &b, feedback("SIM")).await.unwrap_err();
    assert!(matches!(err, DesklineError::NotOwner { .. }));
    assert_eq!(h.desk.active_count(&b.agent_id).await.unwrap(), 0);

    let log = h.desk.messages(&c.id, None).await.unwrap();
    assert!(log.iter().any(|m| m.notice == Some(Notice::Shared)));
    assert!(log.iter().any(|m| m.sender == Sender::Agent(AgentId::from("b"))));
}

#[tokio::test]
async fn close_purges_every_media_blob() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.active_for("cust", &a).await.unwrap();

    let photo = h.blobs.put(format!("{}/photo.jpg", c.id)).await;
    let clip = h.blobs.put(format!("{}/clip.mp4", c.id)).await;
    h.desk
        .attach_media(&c.id, &a, photo.clone(), MediaKind::Image, "photo.jpg")
        .await
        .unwrap();
    h.desk
        .attach_media(&c.id, &a, clip.clone(), MediaKind::from_mime("video/mp4"), "clip.mp4")
        .await
        .unwrap();

    let outcome = h.desk.close(&c.id, &a, feedback("SIM")).await.unwrap();
    let CloseOutcome::Closed { conversation, purge } = outcome else {
        panic!("expected fresh close");
    };
    assert_eq!(conversation.status, ConversationStatus::Closed);
    assert_eq!(purge.deleted, 2);
    assert!(purge.failed.is_empty());
    assert!(!h.blobs.contains(&photo).await);
    assert!(!h.blobs.contains(&clip).await);

    let log = h.desk.messages(&c.id, None).await.unwrap();
    assert_eq!(log.last().and_then(|m| m.notice), Some(Notice::Closing));
}

#[tokio::test]
async fn standalone_purge_refuses_open_conversations() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.active_for("cust", &a).await.unwrap();
    let photo = h.blobs.put(format!("{}/photo.jpg", c.id)).await;
    h.desk
        .attach_media(&c.id, &a, photo.clone(), MediaKind::Image, "photo.jpg")
        .await
        .unwrap();

    let err = h.desk.purge_all(&c.id).await.unwrap_err();
    assert!(matches!(
        err,
        DesklineError::InvalidTransition {
            from: ConversationStatus::Active,
            to: ConversationStatus::Closed,
        }
    ));
    assert!(h.blobs.contains(&photo).await);
    assert!(h.blobs.delete_attempts().await.is_empty());
    assert_eq!(h.status(&c).await.unwrap(), ConversationStatus::Active);

    let queued = h.queued("cust-2").await.unwrap();
    assert!(h.desk.purge_all(&queued.id).await.is_err());
}

#[tokio::test]
async fn standalone_purge_after_close_is_a_no_op() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.active_for("cust", &a).await.unwrap();
    let photo = h.blobs.put(format!("{}/photo.jpg", c.id)).await;
    h.desk
        .attach_media(&c.id, &a, photo.clone(), MediaKind::Image, "photo.jpg")
        .await
        .unwrap();
    h.desk.close(&c.id, &a, feedback("SIM")).await.unwrap();
    assert_eq!(h.blobs.delete_attempts().await.len(), 1);

    let report = h.desk.purge_all(&c.id).await.unwrap();
    assert_eq!(report.attempted(), 0);
    assert_eq!(h.blobs.delete_attempts().await.len(), 1);
}

#[tokio::test]
#[traced_test]
async fn failed_blob_deletion_is_logged_and_close_completes() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.active_for("cust", &a).await.unwrap();

    let stuck = h.blobs.put("stuck.jpg").await;
    let fine = h.blobs.put("fine.jpg").await;
    let flaky = h.blobs.put("flaky.jpg").await;
    h.blobs.fail_always(&stuck).await;
    h.blobs.fail_deletes(&flaky, 1).await;
    for blob in [&stuck, &fine, &flaky] {
        h.desk
            .attach_media(&c.id, &a, blob.clone(), MediaKind::Image, blob.as_str())
            .await
            .unwrap();
    }

    let outcome = h.desk.close(&c.id, &a, feedback("NAO")).await.unwrap();
    let CloseOutcome::Closed { purge, .. } = outcome else {
        panic!("expected fresh close");
    };
    assert_eq!(purge.deleted, 2, "flaky blob succeeds on retry");
    assert_eq!(purge.failed, vec![BlobRef::from("stuck.jpg")]);
    assert_eq!(h.status(&c).await.unwrap(), ConversationStatus::Closed);
    assert!(logs_contain("blob deletion failed"));
}

#[tokio::test]
async fn close_is_idempotent_and_closed_is_terminal() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let b = TestHarness::agent("b");
    let c = h.active_for("cust", &a).await.unwrap();
    let blob = h.blobs.put("one.jpg").await;
    h.desk
        .attach_media(&c.id, &a, blob, MediaKind::Image, "one.jpg")
        .await
        .unwrap();

    h.desk.close(&c.id, &a, feedback("SIM")).await.unwrap();
    let attempts = h.blobs.delete_attempts().await.len();

    let again = h.desk.close(&c.id, &a, feedback("NAO")).await.unwrap();
    assert!(matches!(again, CloseOutcome::AlreadyClosed(_)));
    assert_eq!(h.blobs.delete_attempts().await.len(), attempts, "no second purge");
    assert_eq!(
        again
            .conversation()
            .closing_feedback
            .as_ref()
            .and_then(|f| f.communication_status.as_deref()),
        Some("SIM"),
        "feedback is immutable"
    );

    assert!(matches!(
        h.desk.send_text(&c.id, &a, "late").await,
        Err(DesklineError::ConversationClosed { .. })
    ));
    assert!(matches!(
        h.desk.append_customer(&c.id, "cust", "hello?").await,
        Err(DesklineError::ConversationClosed { .. })
    ));
    assert_eq!(
        h.desk.claim(&c.id, &b).await.unwrap(),
        ClaimOutcome::NotClaimable {
            status: ConversationStatus::Closed
        }
    );
    assert!(matches!(
        h.desk.update_intake(&c.id, &a, TestHarness::intake("x")).await,
        Err(DesklineError::ConversationClosed { .. })
    ));
}

#[tokio::test]
async fn close_retry_after_failed_final_write() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.active_for("cust", &a).await.unwrap();

    h.memory.fail_next_updates(1);
    assert!(h.desk.close(&c.id, &a, feedback("SIM")).await.is_err());
    assert_eq!(h.status(&c).await.unwrap(), ConversationStatus::Active);

    h.desk.close(&c.id, &a, feedback("SIM")).await.unwrap();
    let closing = h
        .desk
        .messages(&c.id, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.notice == Some(Notice::Closing))
        .count();
    assert_eq!(closing, 1, "closing notice written once across retries");
}

#[tokio::test]
async fn welcome_failure_does_not_undo_claim() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.queued("cust").await.unwrap();

    h.memory.fail_next_appends(1);
    assert!(h.desk.claim(&c.id, &a).await.unwrap().is_claimed());
    assert_eq!(h.status(&c).await.unwrap(), ConversationStatus::Active);
    assert!(h.desk.messages(&c.id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn summary_failure_does_not_fail_append() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.active_for("cust", &a).await.unwrap();

    h.memory.fail_next_updates(1);
    let msg = h.desk.send_text(&c.id, &a, "still delivered").await.unwrap();
    assert_eq!(msg.payload, MessagePayload::text("still delivered"));
}

#[tokio::test]
async fn customer_messages_mark_unread_and_agent_replies_clear_it() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.active_for("cust", &a).await.unwrap();

    h.desk.append_customer(&c.id, "cust", "help").await.unwrap();
    let convo = h.desk.conversation(&c.id).await.unwrap();
    assert!(convo.unread_by_agent);
    assert_eq!(convo.last_message.map(|m| m.text), Some("help".to_string()));

    assert!(matches!(
        h.desk.append_customer(&c.id, "someone-else", "hi").await,
        Err(DesklineError::AccessDenied { .. })
    ));

    h.desk.send_text(&c.id, &a, "on it").await.unwrap();
    assert!(!h.desk.conversation(&c.id).await.unwrap().unread_by_agent);
}

#[tokio::test]
async fn audio_attachment_uses_audio_summary() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.active_for("cust", &a).await.unwrap();
    h.desk
        .attach_media(&c.id, &a, BlobRef::from("note.webm"), MediaKind::from_mime("audio/webm"), "note.webm")
        .await
        .unwrap();
    let convo = h.desk.conversation(&c.id).await.unwrap();
    assert_eq!(
        convo.last_message.map(|m| m.text),
        Some(h.desk.settings().messages.audio_summary.clone())
    );
}

#[tokio::test]
async fn closing_warning_sets_flag_and_claim_clears_it() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.active_for("cust", &a).await.unwrap();
    assert!(!c.closing_warning_sent);

    let warned = h.desk.send_closing_warning(&c.id, &a).await.unwrap();
    assert!(warned.closing_warning_sent);
    let log = h.desk.messages(&c.id, None).await.unwrap();
    assert_eq!(log.last().and_then(|m| m.notice), Some(Notice::ClosingWarning));

    let stranger = TestHarness::agent("z");
    assert!(matches!(
        h.desk.send_closing_warning(&c.id, &stranger).await,
        Err(DesklineError::AccessDenied { .. })
    ));
}

#[tokio::test]
async fn intake_edit_by_grantee_updates_name() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let b = TestHarness::agent("b");
    let c = h.active_for("cust", &a).await.unwrap();
    h.desk.share(&c.id, &a, "b").await.unwrap();

    let updated = h
        .desk
        .update_intake(&c.id, &b, TestHarness::intake("Beatriz"))
        .await
        .unwrap();
    assert_eq!(updated.customer_name, "Beatriz");
    assert_eq!(updated.intake.map(|i| i.name), Some("Beatriz".to_string()));
}

#[tokio::test]
async fn message_log_is_ordered() {
    let h = TestHarness::builder().with_sqlite().build().await.unwrap();
    let a = TestHarness::agent("a");
    let b = TestHarness::agent("b");
    let c = h.active_for("cust", &a).await.unwrap();
    h.desk.share(&c.id, &a, "b@x.com").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..10 {
        let desk = h.desk.clone();
        let (ctx, id) = (if i % 2 == 0 { a.clone() } else { b.clone() }, c.id.clone());
        handles.push(tokio::spawn(async move {
            desk.send_text(&id, &ctx, format!("m{i}")).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let log = h.desk.messages(&c.id, None).await.unwrap();
    assert_eq!(log.len(), 12, "welcome, share notice, ten messages");
    assert!(log.windows(2).all(|w| w[0].timestamp <= w[1].timestamp && w[0].seq < w[1].seq));
}

#[tokio::test]
async fn views_order_and_filter() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let b = TestHarness::agent("b");

    let first = h.queued("first").await.unwrap();
    let second = h.queued("second").await.unwrap();
    let queue = h.desk.queue_view(&ViewFilter::new()).await.unwrap();
    assert_eq!(
        queue.iter().map(|c| c.id.clone()).collect::<Vec<_>>(),
        vec![first.id.clone(), second.id.clone()]
    );
    assert!(h
        .desk
        .queue_view(&ViewFilter::new().service_option("field"))
        .await
        .unwrap()
        .is_empty());

    let older = h.active_for("older", &a).await.unwrap();
    let newer = h.active_for("newer", &a).await.unwrap();
    h.desk.send_text(&older.id, &a, "bump").await.unwrap();
    let active = h.desk.active_view(Some(&a), &ViewFilter::new()).await.unwrap();
    assert_eq!(active[0].id, older.id, "most recent activity first");
    assert_eq!(active[1].id, newer.id);

    assert!(h.desk.active_view(Some(&b), &ViewFilter::new()).await.unwrap().is_empty());
    h.desk.share(&newer.id, &a, "b@x.com").await.unwrap();
    let for_b = h.desk.active_view(Some(&b), &ViewFilter::new()).await.unwrap();
    assert_eq!(for_b.len(), 1);
    assert_eq!(h.desk.active_view(None, &ViewFilter::new()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn watcher_follows_changes() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let mut watcher = h.desk.watch_views(ViewFilter::new(), None).await.unwrap();
    assert!(watcher.current().waiting.is_empty());

    let c = h.queued("cust").await.unwrap();
    let view = loop {
        let view = watcher.changed().await.unwrap();
        if !view.waiting.is_empty() {
            break view;
        }
    };
    assert_eq!(view.waiting[0].id, c.id);

    h.desk.claim(&c.id, &a).await.unwrap();
    let view = loop {
        let view = watcher.changed().await.unwrap();
        if !view.active.is_empty() {
            break view;
        }
    };
    assert!(view.waiting.is_empty());
    watcher.stop().await;
}

#[tokio::test]
async fn handling_time_spans_queue_to_close() {
    let h = TestHarness::new().await.unwrap();
    let a = TestHarness::agent("a");
    let c = h.active_for("cust", &a).await.unwrap();
    let closed = h.desk.close(&c.id, &a, feedback("SIM")).await.unwrap();
    let elapsed = closed.conversation().handling_time().unwrap();
    assert!(elapsed >= chrono::Duration::zero());
}
