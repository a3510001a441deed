// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the engine, storage backends, and the CLI.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a conversation. Assigned at creation, never changes.
    ConversationId
);
string_id!(
    /// Unique identifier for a message.
    MessageId
);
string_id!(
    /// Identifier of a support agent.
    AgentId
);
string_id!(
    /// Reference to a media object held by the blob store.
    BlobRef
);

impl ConversationId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl MessageId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    DocumentStore,
    BlobStore,
}

/// Lifecycle status of a conversation.
///
/// `pending_intake` and `queued` are both unclaimed and claimable. `closed` is terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    PendingIntake,
    Queued,
    Active,
    Closed,
}

impl ConversationStatus {
    pub const ALL: [ConversationStatus; 4] = [
        Self::PendingIntake,
        Self::Queued,
        Self::Active,
        Self::Closed,
    ];

    /// Statuses from which a claim can start.
    pub const CLAIMABLE: [ConversationStatus; 2] = [Self::PendingIntake, Self::Queued];

    /// Every status except the terminal one.
    pub const OPEN: [ConversationStatus; 3] = [Self::PendingIntake, Self::Queued, Self::Active];

    pub fn is_claimable(self) -> bool {
        matches!(self, Self::PendingIntake | Self::Queued)
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }

    /// Whether `self -> next` is an allowed lifecycle edge.
    ///
    /// `active -> active` covers in-place edits; no other status may be re-entered.
    pub fn can_transition_to(self, next: ConversationStatus) -> bool {
        use ConversationStatus::*;
        matches!(
            (self, next),
            (PendingIntake, Queued)
                | (PendingIntake, Active)
                | (Queued, Active)
                | (Active, Active)
                | (Active, Closed)
        )
    }
}

/// Explicit per-call identity of the agent issuing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentContext {
    pub agent_id: AgentId,
    pub email: String,
}

impl AgentContext {
    pub fn new(agent_id: impl Into<AgentId>, email: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            email: email.into(),
        }
    }

    /// Whether a share grant identifier designates this agent.
    ///
    /// Grants may name either the agent id or the email; emails compare
    /// case-insensitively.
    pub fn matches_grantee(&self, grantee: &str) -> bool {
        grantee == self.agent_id.as_str() || grantee.eq_ignore_ascii_case(&self.email)
    }
}

/// Kind of media carried by a media message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Classifies a MIME type; anything that is not video or audio is an image.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("video") {
            Self::Video
        } else if mime.starts_with("audio") {
            Self::Audio
        } else {
            Self::Image
        }
    }
}

/// Author of a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Sender {
    Agent(AgentId),
    Customer(String),
    /// The coordinating process itself (welcome, closing notices).
    System,
}

impl Sender {
    /// Stable identifier string stored alongside the message.
    pub fn id(&self) -> &str {
        match self {
            Sender::Agent(id) => id.as_str(),
            Sender::Customer(id) => id,
            Sender::System => "system",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Sender::Agent(_) => "agent",
            Sender::Customer(_) => "customer",
            Sender::System => "system",
        }
    }

    /// Rebuilds a sender from its stored `(kind, id)` pair.
    pub fn from_parts(kind: &str, id: &str) -> Option<Self> {
        match kind {
            "agent" => Some(Sender::Agent(AgentId::from(id))),
            "customer" => Some(Sender::Customer(id.to_string())),
            "system" => Some(Sender::System),
            _ => None,
        }
    }
}

/// Marks log entries that the lifecycle itself produced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    Welcome,
    Shared,
    ClosingWarning,
    Closing,
}

/// Exactly one payload per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePayload {
    Text {
        text: String,
    },
    Media {
        url: BlobRef,
        kind: MediaKind,
        file_name: String,
    },
}

impl MessagePayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn media_ref(&self) -> Option<&BlobRef> {
        match self {
            MessagePayload::Media { url, .. } => Some(url),
            MessagePayload::Text { .. } => None,
        }
    }
}

/// One immutable entry of a conversation's message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    /// Position within the conversation, starting at 1.
    pub seq: u64,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    pub timestamp: DateTime<Utc>,
    pub payload: MessagePayload,
}

/// A message as submitted for appending; the store assigns `seq` and `timestamp`.
///
/// The caller chooses `id`, so resubmitting the same `NewMessage` after an
/// ambiguous failure never produces a duplicate entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: Sender,
    pub notice: Option<Notice>,
    pub payload: MessagePayload,
}

impl NewMessage {
    pub fn new(conversation_id: ConversationId, sender: Sender, payload: MessagePayload) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            sender,
            notice: None,
            payload,
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }
}

/// Denormalized excerpt of the latest log entry. Eventually consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessageSummary {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Customer-provided intake form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeFields {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub distributor: String,
    pub region: String,
    /// Requested service; the category queue filters work on.
    pub service_option: String,
    pub site_code: String,
    pub component: String,
    pub controller_model: String,
    pub comm_mode: String,
    #[serde(default)]
    pub comm_subtype: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
}

impl IntakeFields {
    /// Communication mode as displayed to agents: `GPRS - <subtype>` when known.
    pub fn communication_display(&self) -> String {
        match &self.comm_subtype {
            Some(sub) if self.comm_mode == "GPRS" && !sub.is_empty() => {
                format!("{} - {}", self.comm_mode, sub)
            }
            _ => self.comm_mode.clone(),
        }
    }
}

/// Post-closure notes recorded once, when the owner closes the conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingFeedback {
    /// Whether communication with the customer's equipment was restored.
    #[serde(default, alias = "statusComunicacao")]
    pub communication_status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// One customer contact and its coordination state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub customer_id: String,
    pub customer_name: String,
    pub status: ConversationStatus,
    pub owner_agent_id: Option<AgentId>,
    /// Agent ids or emails granted write access besides the owner.
    #[serde(default)]
    pub shared_with: BTreeSet<String>,
    #[serde(default)]
    pub intake: Option<IntakeFields>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub queued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_message: Option<LastMessageSummary>,
    #[serde(default)]
    pub closing_feedback: Option<ClosingFeedback>,
    #[serde(default)]
    pub closing_warning_sent: bool,
    #[serde(default)]
    pub unread_by_agent: bool,
    /// Incremented by the store on every applied write.
    #[serde(default)]
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// A fresh conversation awaiting intake data.
    pub fn new_pending(
        customer_id: impl Into<String>,
        customer_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConversationId::generate(),
            customer_id: customer_id.into(),
            customer_name: customer_name.into(),
            status: ConversationStatus::PendingIntake,
            owner_agent_id: None,
            shared_with: BTreeSet::new(),
            intake: None,
            created_at: now,
            queued_at: None,
            started_at: None,
            closed_at: None,
            last_message: None,
            closing_feedback: None,
            closing_warning_sent: false,
            unread_by_agent: false,
            revision: 0,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, agent: &AgentId) -> bool {
        self.owner_agent_id.as_ref() == Some(agent)
    }

    /// Whether the agent owns this conversation or holds a share grant on it.
    pub fn is_participant(&self, ctx: &AgentContext) -> bool {
        self.is_owned_by(&ctx.agent_id) || self.shared_with.iter().any(|g| ctx.matches_grantee(g))
    }

    /// Write access: `status == active` and the agent is owner or grantee.
    pub fn can_write(&self, ctx: &AgentContext) -> bool {
        self.status == ConversationStatus::Active && self.is_participant(ctx)
    }

    /// Time from entering the queue to closure, for closed conversations.
    pub fn handling_time(&self) -> Option<chrono::Duration> {
        match (self.status, self.queued_at, self.closed_at) {
            (ConversationStatus::Closed, Some(queued), Some(closed)) => Some(closed - queued),
            _ => None,
        }
    }
}
