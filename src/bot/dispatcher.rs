//! Inbox polling and command dispatch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::classifier::{classify, Command};
use super::BotContext;
use crate::database::models::Conversation;
use crate::platform::{InboundMessage, PlatformClient};
use crate::services::diary::DiaryApi;
use crate::utils::text::{last_token, normalize_homework};

/// How many inbox threads one poll fetches.
const INBOX_PAGE_COUNT: usize = 10;

/// The bot's control loop: approves pending conversation requests, fetches
/// new messages, classifies them and sends replies until shut down.
///
/// A failure handling one message is logged and never aborts the loop or
/// affects other messages.
pub struct PollingDispatcher<P: PlatformClient, D: DiaryApi> {
    ctx: Arc<BotContext<P, D>>,
    poll_interval: Duration,
}

impl<P: PlatformClient, D: DiaryApi> PollingDispatcher<P, D> {
    pub fn new(ctx: Arc<BotContext<P, D>>) -> Self {
        Self {
            ctx,
            poll_interval: Duration::from_secs(2),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs the polling loop until the shutdown flag flips.
    ///
    /// Cancellation is cooperative: it is checked between iterations, so
    /// an in-flight iteration always drains before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Polling dispatcher started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.poll_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Polling dispatcher stopped");
    }

    /// One polling iteration: approve pending requests, then process every
    /// new message from a bounded inbox page.
    pub async fn poll_once(&self) {
        self.approve_pending_requests().await;

        let threads = match self.ctx.platform.inbox_threads(INBOX_PAGE_COUNT).await {
            Ok(threads) => threads,
            Err(err) => {
                error!("Inbox fetch failed, skipping iteration: {err}");
                return;
            }
        };

        for thread in threads {
            for message in &thread.messages {
                if message.sender_id == self.ctx.account_id {
                    continue;
                }
                if let Err(err) = self.handle_message(message).await {
                    error!(
                        "Failed to handle message {} in thread {}: {err:#}",
                        message.item_id, message.thread_id
                    );
                }
            }
        }
    }

    /// Best effort; a failed approval is retried implicitly next poll.
    async fn approve_pending_requests(&self) {
        let pending = match self.ctx.platform.pending_threads().await {
            Ok(pending) => pending,
            Err(err) => {
                warn!("Could not fetch pending conversation requests: {err}");
                return;
            }
        };

        for thread_id in pending {
            match self.ctx.platform.approve_pending_thread(&thread_id).await {
                Ok(()) => info!("Approved pending conversation {thread_id}"),
                Err(err) => warn!("Could not approve conversation {thread_id}: {err}"),
            }
        }
    }

    /// Marks the message seen, classifies it and sends the reply.
    ///
    /// Seen-before-reply: if the send fails the message is not reprocessed
    /// on the next poll, at the cost of a possibly unanswered message
    /// (at-least-once handling).
    async fn handle_message(&self, message: &InboundMessage) -> Result<()> {
        self.ctx
            .platform
            .mark_thread_seen(&message.thread_id, &message.item_id)
            .await?;

        let command = classify(&message.text, &self.ctx.settings.commands);
        debug!(
            "Message {} in thread {} classified as {:?}",
            message.item_id, message.thread_id, command
        );

        let reply = match command {
            Command::Login => self.handle_login(message).await?,
            Command::Help => self
                .ctx
                .settings
                .answers
                .render_help(&self.ctx.settings.commands),
            Command::TomorrowHomework | Command::AllHomework => {
                self.handle_homework(message, command).await?
            }
            Command::Unknown => self.ctx.settings.answers.unknown_command.clone(),
        };

        self.ctx
            .platform
            .send_text(&message.thread_id, &reply)
            .await?;
        Ok(())
    }

    /// Remembers the class login carried as the last token of the message.
    async fn handle_login(&self, message: &InboundMessage) -> Result<String> {
        let answers = &self.ctx.settings.answers;

        let candidate = match last_token(&message.text) {
            Some(candidate) => candidate,
            None => return Ok(answers.empty_login.clone()),
        };

        // A bare command ("увійти" with no argument) ends with the keyword
        // itself; there is no login to check.
        let lowered = candidate.to_lowercase();
        let is_keyword = self
            .ctx
            .settings
            .commands
            .login
            .iter()
            .any(|keyword| keyword.to_lowercase() == lowered);
        if is_keyword {
            return Ok(answers.empty_login.clone());
        }

        if self.ctx.diary.class_login_exists(candidate).await? {
            Conversation::upsert(&self.ctx.db.pool, &message.thread_id, candidate).await?;
            info!(
                "Thread {} now bound to class login {}",
                message.thread_id, candidate
            );
            Ok(answers.login_saved.clone())
        } else {
            Ok(answers.render_wrong_login(candidate))
        }
    }

    /// Relays homework for the thread's remembered class login.
    async fn handle_homework(
        &self,
        message: &InboundMessage,
        command: Command,
    ) -> Result<String> {
        let answers = &self.ctx.settings.answers;

        let conversation =
            Conversation::find_by_thread_id(&self.ctx.db.pool, &message.thread_id).await?;
        let Some(conversation) = conversation else {
            return Ok(answers.no_login_set.clone());
        };

        let (raw, empty_answer) = match command {
            Command::TomorrowHomework => (
                self.ctx
                    .diary
                    .tomorrow_homework(&conversation.class_login)
                    .await?,
                &answers.empty_tomorrow_homework,
            ),
            _ => (
                self.ctx
                    .diary
                    .all_homework(&conversation.class_login)
                    .await?,
                &answers.empty_all_homework,
            ),
        };

        Ok(normalize_homework(&raw).unwrap_or_else(|| empty_answer.clone()))
    }
}
