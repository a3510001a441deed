// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation document operations.

use chrono::Utc;
use deskline_core::{
    Conversation, ConversationId, ConversationPatch, ConversationQuery, DesklineError,
    Precondition,
};
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::{Database, fmt_ts, from_json, map_tr_err, to_json};

/// Result of a compare-and-set against one stored document.
#[derive(Debug)]
pub enum CasResult {
    Missing,
    Rejected(Conversation),
    Applied(Conversation),
}

/// Insert a new conversation document.
pub async fn insert_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), DesklineError> {
    let conversation = conversation.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversations
                 (id, status, owner_agent_id, queued_at, last_message_at, revision, body, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    conversation.id.as_str(),
                    conversation.status.to_string(),
                    conversation.owner_agent_id.as_ref().map(|a| a.as_str()),
                    conversation.queued_at.as_ref().map(fmt_ts),
                    conversation.last_message.as_ref().map(|m| fmt_ts(&m.timestamp)),
                    conversation.revision as i64,
                    to_json(&conversation)?,
                    fmt_ts(&conversation.created_at),
                    fmt_ts(&conversation.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &ConversationId,
) -> Result<Option<Conversation>, DesklineError> {
    let id = id.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            read_body(conn, &id)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply `patch` if the stored document still satisfies `expected`.
///
/// Read, check, and write happen inside one transaction on the single
/// writer thread, so no other write can interleave.
pub async fn conditional_update(
    db: &Database,
    id: &ConversationId,
    expected: &Precondition,
    patch: &ConversationPatch,
) -> Result<CasResult, DesklineError> {
    let id = id.clone();
    let expected = expected.clone();
    let patch = patch.clone();
    db.connection()
        .call(move |conn| -> Result<CasResult, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(mut conversation) = read_body(&tx, &id)? else {
                return Ok(CasResult::Missing);
            };
            if !expected.matches(&conversation) || !patch.permits(&conversation) {
                return Ok(CasResult::Rejected(conversation));
            }

            let previous_revision = conversation.revision;
            patch.apply(&mut conversation, Utc::now());
            let updated = tx.execute(
                "UPDATE conversations
                 SET status = ?1, owner_agent_id = ?2, queued_at = ?3, last_message_at = ?4,
                     revision = ?5, body = ?6, updated_at = ?7
                 WHERE id = ?8 AND revision = ?9",
                params![
                    conversation.status.to_string(),
                    conversation.owner_agent_id.as_ref().map(|a| a.as_str()),
                    conversation.queued_at.as_ref().map(fmt_ts),
                    conversation.last_message.as_ref().map(|m| fmt_ts(&m.timestamp)),
                    conversation.revision as i64,
                    to_json(&conversation)?,
                    fmt_ts(&conversation.updated_at),
                    id.as_str(),
                    previous_revision as i64,
                ],
            )?;
            if updated != 1 {
                // Unreachable with a single writer; kept so a second writer
                // would surface as a lost race rather than a silent overwrite.
                let current = read_body(&tx, &id)?;
                return Ok(current.map_or(CasResult::Missing, CasResult::Rejected));
            }
            tx.commit()?;
            Ok(CasResult::Applied(conversation))
        })
        .await
        .map_err(map_tr_err)
}

/// List conversations matching `query`, oldest first.
pub async fn list_conversations(
    db: &Database,
    query: &ConversationQuery,
) -> Result<Vec<Conversation>, DesklineError> {
    let query = query.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<Conversation>, rusqlite::Error> {
            let statuses: Vec<String> = query.statuses.iter().map(|s| s.to_string()).collect();
            let sql = if statuses.is_empty() {
                "SELECT body FROM conversations ORDER BY created_at ASC, id ASC".to_string()
            } else {
                let placeholders = vec!["?"; statuses.len()].join(", ");
                format!(
                    "SELECT body FROM conversations WHERE status IN ({placeholders})
                     ORDER BY created_at ASC, id ASC"
                )
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(statuses.iter()), |row| {
                row.get::<_, String>(0)
            })?;

            let mut conversations = Vec::new();
            for raw in rows {
                let conversation: Conversation = from_json(0, &raw?)?;
                if query.matches(&conversation) {
                    conversations.push(conversation);
                }
            }
            Ok(conversations)
        })
        .await
        .map_err(map_tr_err)
}

fn read_body(
    conn: &rusqlite::Connection,
    id: &ConversationId,
) -> Result<Option<Conversation>, rusqlite::Error> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT body FROM conversations WHERE id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|raw| from_json(0, &raw)).transpose()
}
