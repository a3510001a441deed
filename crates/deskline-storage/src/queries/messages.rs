// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only message log operations.

use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use deskline_core::{
    BlobRef, ConversationId, ConversationStatus, DesklineError, MediaKind, Message, MessageId,
    MessagePayload, NewMessage, Notice, Sender,
};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, fmt_ts, map_tr_err, parse_ts};

/// Result of an append attempt.
#[derive(Debug)]
pub enum AppendResult {
    Missing,
    Closed,
    Appended(Message),
}

const SELECT_MESSAGE: &str = "SELECT id, conversation_id, seq, sender_kind, sender_id, notice, timestamp,
            text, media_url, media_kind, file_name
     FROM messages";

/// Append a message, assigning the next `seq` and a non-decreasing timestamp.
///
/// The parent status check and the insert share one transaction, so an
/// append either lands before closure or is rejected.
pub async fn append_message(
    db: &Database,
    message: NewMessage,
) -> Result<AppendResult, DesklineError> {
    db.connection()
        .call(move |conn| -> Result<AppendResult, rusqlite::Error> {
            let tx = conn.transaction()?;

            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM conversations WHERE id = ?1",
                    params![message.conversation_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(status) = status else {
                return Ok(AppendResult::Missing);
            };

            // Idempotent resubmission by message id.
            let existing = tx
                .query_row(
                    &format!("{SELECT_MESSAGE} WHERE id = ?1 AND conversation_id = ?2"),
                    params![message.id.as_str(), message.conversation_id.as_str()],
                    row_to_message,
                )
                .optional()?;
            if let Some(existing) = existing {
                return Ok(AppendResult::Appended(existing));
            }

            if status == ConversationStatus::Closed.to_string() {
                return Ok(AppendResult::Closed);
            }

            let (last_seq, last_ts): (i64, Option<String>) = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0), MAX(timestamp) FROM messages WHERE conversation_id = ?1",
                params![message.conversation_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let mut timestamp = Utc::now().trunc_subsecs(6);
            if let Some(raw) = last_ts {
                let last = parse_ts(1, &raw)?;
                if last > timestamp {
                    timestamp = last;
                }
            }

            let stored = Message {
                id: message.id,
                conversation_id: message.conversation_id,
                seq: last_seq as u64 + 1,
                sender: message.sender,
                notice: message.notice,
                timestamp,
                payload: message.payload,
            };
            insert_row(&tx, &stored)?;
            tx.commit()?;
            Ok(AppendResult::Appended(stored))
        })
        .await
        .map_err(map_tr_err)
}

/// List messages for a conversation by position, optionally after `after_seq`.
pub async fn list_messages(
    db: &Database,
    conversation_id: &ConversationId,
    after_seq: Option<u64>,
) -> Result<Vec<Message>, DesklineError> {
    let conversation_id = conversation_id.clone();
    let after = after_seq.unwrap_or(0) as i64;
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_MESSAGE} WHERE conversation_id = ?1 AND seq > ?2 ORDER BY seq ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id.as_str(), after], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

fn insert_row(tx: &rusqlite::Transaction<'_>, message: &Message) -> Result<(), rusqlite::Error> {
    let (text, media_url, media_kind, file_name) = match &message.payload {
        MessagePayload::Text { text } => (Some(text.as_str()), None, None, None),
        MessagePayload::Media {
            url,
            kind,
            file_name,
        } => (
            None,
            Some(url.as_str()),
            Some(kind.to_string()),
            Some(file_name.as_str()),
        ),
    };
    tx.execute(
        "INSERT INTO messages
         (id, conversation_id, seq, sender_kind, sender_id, notice, timestamp, text, media_url, media_kind, file_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            message.id.as_str(),
            message.conversation_id.as_str(),
            message.seq as i64,
            message.sender.kind(),
            message.sender.id(),
            message.notice.map(|n| n.to_string()),
            fmt_ts(&message.timestamp),
            text,
            media_url,
            media_kind,
            file_name,
        ],
    )?;
    Ok(())
}

fn row_to_message(row: &Row<'_>) -> Result<Message, rusqlite::Error> {
    let sender_kind: String = row.get(3)?;
    let sender_id: String = row.get(4)?;
    let sender = Sender::from_parts(&sender_kind, &sender_id).ok_or_else(|| {
        conversion_error(3, format!("unknown sender kind: {sender_kind}"))
    })?;

    let notice = row
        .get::<_, Option<String>>(5)?
        .map(|raw| Notice::from_str(&raw).map_err(|e| conversion_error(5, e.to_string())))
        .transpose()?;

    let timestamp: DateTime<Utc> = parse_ts(6, &row.get::<_, String>(6)?)?;

    let text: Option<String> = row.get(7)?;
    let media_url: Option<String> = row.get(8)?;
    let payload = match (text, media_url) {
        (_, Some(url)) => {
            let kind: String = row.get(9)?;
            MessagePayload::Media {
                url: BlobRef::from(url),
                kind: MediaKind::from_str(&kind).map_err(|e| conversion_error(9, e.to_string()))?,
                file_name: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
            }
        }
        (Some(text), None) => MessagePayload::Text { text },
        (None, None) => return Err(conversion_error(7, "message has no payload".to_string())),
    };

    Ok(Message {
        id: MessageId::from(row.get::<_, String>(0)?),
        conversation_id: ConversationId::from(row.get::<_, String>(1)?),
        seq: row.get::<_, i64>(2)? as u64,
        sender,
        notice,
        timestamp,
        payload,
    })
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations::{CasResult, conditional_update, insert_conversation};
    use deskline_core::{
        AgentId, Conversation, ConversationPatch, Precondition,
    };
    use tempfile::tempdir;

    async fn setup() -> (Database, Conversation, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let mut convo = Conversation::new_pending("cust-1", "Ana", Utc::now());
        convo.status = ConversationStatus::Active;
        convo.owner_agent_id = Some(AgentId::from("a"));
        insert_conversation(&db, &convo).await.unwrap();
        (db, convo, dir)
    }

    fn text(convo: &Conversation, body: &str) -> NewMessage {
        NewMessage::new(
            convo.id.clone(),
            Sender::Agent(AgentId::from("a")),
            MessagePayload::text(body),
        )
    }

    #[tokio::test]
    async fn appends_get_consecutive_positions() {
        let (db, convo, _dir) = setup().await;
        for body in ["one", "two", "three"] {
            append_message(&db, text(&convo, body)).await.unwrap();
        }
        let log = list_messages(&db, &convo.id, None).await.unwrap();
        assert_eq!(log.iter().map(|m| m.seq).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(log.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        let tail = list_messages(&db, &convo.id, Some(2)).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].payload, MessagePayload::text("three"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn resubmitting_same_id_is_idempotent() {
        let (db, convo, _dir) = setup().await;
        let msg = text(&convo, "hello");
        let first = append_message(&db, msg.clone()).await.unwrap();
        let second = append_message(&db, msg).await.unwrap();
        match (first, second) {
            (AppendResult::Appended(a), AppendResult::Appended(b)) => assert_eq!(a, b),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(list_messages(&db, &convo.id, None).await.unwrap().len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn media_payload_round_trips() {
        let (db, convo, _dir) = setup().await;
        let msg = NewMessage::new(
            convo.id.clone(),
            Sender::Customer("cust-1".into()),
            MessagePayload::Media {
                url: BlobRef::from("conv/photo.jpg"),
                kind: MediaKind::Image,
                file_name: "photo.jpg".into(),
            },
        );
        append_message(&db, msg.clone()).await.unwrap();
        let log = list_messages(&db, &convo.id, None).await.unwrap();
        assert_eq!(log[0].payload, msg.payload);
        assert_eq!(log[0].sender, msg.sender);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn rejects_missing_and_closed_parents() {
        let (db, convo, _dir) = setup().await;
        let orphan = NewMessage::new(
            ConversationId::from("ghost"),
            Sender::System,
            MessagePayload::text("x"),
        );
        assert!(matches!(
            append_message(&db, orphan).await.unwrap(),
            AppendResult::Missing
        ));

        for status in [ConversationStatus::Active, ConversationStatus::Closed] {
            let result = conditional_update(
                &db,
                &convo.id,
                &Precondition::any(),
                &ConversationPatch {
                    status: Some(status),
                    ..ConversationPatch::default()
                },
            )
            .await
            .unwrap();
            assert!(matches!(result, CasResult::Applied(_)));
        }
        assert!(matches!(
            append_message(&db, text(&convo, "late")).await.unwrap(),
            AppendResult::Closed
        ));
        db.close().await.unwrap();
    }
}
