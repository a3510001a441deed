// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations.

use std::path::Path;

use deskline_core::{
    AgentContext, BlobRef, ClosingFeedback, Conversation, ConversationId, DesklineError,
    IntakeFields, MediaKind, Message, MessagePayload,
};
use deskline_engine::{ClaimOutcome, CloseOutcome, Desk, QueueView, ShareOutcome, ViewFilter};
use deskline_storage::FsBlobStore;
use tracing::info;

use crate::shutdown::install_signal_handler;
use crate::{Cli, Commands, FilterArgs};

/// Runs one subcommand. `media` is the same blob store the desk purges from.
pub async fn run(desk: &Desk, media: &FsBlobStore, cli: &Cli) -> Result<(), DesklineError> {
    let out = Output { json: cli.json };
    match &cli.command {
        Commands::Open { customer, name } => {
            let convo = desk.open_conversation(customer, name).await?;
            out.conversation(&convo);
        }
        Commands::Intake { conversation, data } => {
            let convo = desk
                .submit_intake(&id(conversation), parse_intake(data)?)
                .await?;
            out.conversation(&convo);
        }
        Commands::Queue(filter) => {
            let waiting = desk.queue_view(&view_filter(filter)).await?;
            out.conversations(&waiting);
        }
        Commands::Active { mine, filter } => {
            let ctx = if *mine { Some(agent(cli)?) } else { None };
            let active = desk.active_view(ctx.as_ref(), &view_filter(filter)).await?;
            out.conversations(&active);
        }
        Commands::Claim { conversation } => {
            let outcome = desk.claim(&id(conversation), &agent(cli)?).await?;
            match &outcome {
                ClaimOutcome::Claimed { conversation, .. } => {
                    out.line(&outcome.user_message());
                    out.conversation(conversation);
                }
                other => out.refusal(&other.user_message()),
            }
        }
        Commands::Share {
            conversation,
            grantee,
        } => {
            let outcome = desk.share(&id(conversation), &agent(cli)?, grantee).await?;
            match &outcome {
                ShareOutcome::Shared(convo) => {
                    out.line(&outcome.user_message());
                    out.conversation(convo);
                }
                other => out.refusal(&other.user_message()),
            }
        }
        Commands::Send { conversation, text } => {
            let message = desk.send_text(&id(conversation), &agent(cli)?, text).await?;
            out.message(&message);
        }
        Commands::Attach {
            conversation,
            file,
            mime,
        } => {
            let conversation = id(conversation);
            let ctx = agent(cli)?;
            let blob = upload(media, &conversation, file).await?;
            let file_name = file_name(file);
            let message = desk
                .attach_media(&conversation, &ctx, blob, MediaKind::from_mime(mime), file_name)
                .await?;
            out.message(&message);
        }
        Commands::Warn { conversation } => {
            let convo = desk.send_closing_warning(&id(conversation), &agent(cli)?).await?;
            out.conversation(&convo);
        }
        Commands::EditIntake { conversation, data } => {
            let convo = desk
                .update_intake(&id(conversation), &agent(cli)?, parse_intake(data)?)
                .await?;
            out.conversation(&convo);
        }
        Commands::Close {
            conversation,
            communication_status,
            notes,
        } => {
            let feedback = ClosingFeedback {
                communication_status: communication_status.clone(),
                notes: notes.clone(),
                ..ClosingFeedback::default()
            };
            let outcome = desk.close(&id(conversation), &agent(cli)?, feedback).await?;
            match &outcome {
                CloseOutcome::Closed { purge, .. } => out.line(&format!(
                    "Conversation closed. {} media file(s) removed.",
                    purge.deleted + purge.missing
                )),
                CloseOutcome::AlreadyClosed(_) => out.line("This conversation was already closed."),
            }
            out.conversation(outcome.conversation());
        }
        Commands::Log {
            conversation,
            after,
        } => {
            for message in desk.messages(&id(conversation), *after).await? {
                out.message(&message);
            }
        }
        Commands::Watch { mine, filter } => {
            let ctx = if *mine { Some(agent(cli)?) } else { None };
            watch(desk, &out, view_filter(filter), ctx).await?;
        }
    }
    Ok(())
}

async fn watch(
    desk: &Desk,
    out: &Output,
    filter: ViewFilter,
    agent: Option<AgentContext>,
) -> Result<(), DesklineError> {
    let cancel = install_signal_handler();
    let mut watcher = desk.watch_views(filter, agent).await?;
    out.view(&watcher.current());
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            view = watcher.changed() => match view {
                Some(view) => out.view(&view),
                None => break,
            },
        }
    }
    watcher.stop().await;
    info!("watch stopped");
    Ok(())
}

/// Copies a local file under the media root; returns its reference.
async fn upload(
    media: &FsBlobStore,
    conversation: &ConversationId,
    file: &Path,
) -> Result<BlobRef, DesklineError> {
    let bytes = tokio::fs::read(file).await.map_err(|e| {
        DesklineError::Validation(format!("cannot read {}: {e}", file.display()))
    })?;
    let blob = BlobRef::from(format!(
        "{conversation}/{}-{}",
        uuid::Uuid::new_v4(),
        file_name(file)
    ));
    media.write(&blob, &bytes).await?;
    Ok(blob)
}

fn file_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string())
}

fn id(raw: &str) -> ConversationId {
    ConversationId::from(raw)
}

fn agent(cli: &Cli) -> Result<AgentContext, DesklineError> {
    let agent = cli
        .agent
        .clone()
        .ok_or_else(|| DesklineError::Validation("--agent is required for this command".into()))?;
    let email = cli.email.clone().unwrap_or_default();
    Ok(AgentContext::new(agent, email))
}

fn parse_intake(data: &str) -> Result<IntakeFields, DesklineError> {
    serde_json::from_str(data)
        .map_err(|e| DesklineError::Validation(format!("intake data is not valid JSON: {e}")))
}

fn view_filter(args: &FilterArgs) -> ViewFilter {
    let mut filter = ViewFilter::new();
    if let Some(option) = &args.service_option {
        filter = filter.service_option(option);
    }
    if let Some(region) = &args.region {
        filter = filter.region(region);
    }
    filter
}

/// Human or JSON rendering of command results.
struct Output {
    json: bool,
}

impl Output {
    fn line(&self, text: &str) {
        if !self.json {
            println!("{text}");
        }
    }

    fn refusal(&self, text: &str) {
        if self.json {
            println!("{}", serde_json::json!({ "refused": text }));
        } else {
            println!("{text}");
        }
    }

    fn conversation(&self, c: &Conversation) {
        if self.json {
            self.print_json(c);
            return;
        }
        let owner = c.owner_agent_id.as_ref().map_or("-", |a| a.as_str());
        let summary = c.last_message.as_ref().map_or("", |m| m.text.as_str());
        println!(
            "{}  {:<14}  {:<12}  {}  {}",
            c.id,
            c.status.to_string(),
            owner,
            c.customer_name,
            summary
        );
    }

    fn conversations(&self, list: &[Conversation]) {
        if self.json {
            self.print_json(&list);
            return;
        }
        if list.is_empty() {
            println!("(none)");
        }
        for c in list {
            self.conversation(c);
        }
    }

    fn message(&self, m: &Message) {
        if self.json {
            self.print_json(m);
            return;
        }
        let body = match &m.payload {
            MessagePayload::Text { text } => text.clone(),
            MessagePayload::Media { kind, file_name, .. } => format!("[{kind}] {file_name}"),
        };
        println!(
            "#{:<4} {}  {:<8} {}",
            m.seq,
            m.timestamp.format("%Y-%m-%d %H:%M:%S"),
            m.sender.id(),
            body
        );
    }

    fn view(&self, view: &QueueView) {
        if self.json {
            println!(
                "{}",
                serde_json::json!({ "waiting": view.waiting, "active": view.active })
            );
            return;
        }
        println!("--- waiting ({}) ---", view.waiting.len());
        for c in &view.waiting {
            self.conversation(c);
        }
        println!("--- active ({}) ---", view.active.len());
        for c in &view.active {
            self.conversation(c);
        }
    }

    fn print_json<T: serde::Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("deskline: cannot render output: {e}"),
        }
    }
}
