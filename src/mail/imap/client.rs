//! IMAP session operations: folders, listing and message fetch.

use async_imap::types::Fetch;
use futures::TryStreamExt;

use crate::error::{DigestError, DigestResult};
use crate::mail::parser::{parse_attachment, parse_header, parse_message};
use crate::mail::types::{AttachmentData, Message, MessageHeader};
use crate::mail::{MailSession, order_recent, sort_mailboxes};

use super::{ImapClient, session_error};

impl ImapClient {
    async fn ensure_selected(&mut self, mailbox: &str) -> DigestResult<u32> {
        let selected = self
            .session
            .examine(mailbox)
            .await
            .map_err(|e| session_error(&format!("select '{}'", mailbox), e))?;
        self.selected = Some(mailbox.to_string());
        Ok(selected.exists)
    }

    /// Fetch one message's raw bytes (peek, so `\Seen` stays untouched).
    async fn fetch_raw(&mut self, mailbox: &str, uid: u32) -> DigestResult<(Vec<u8>, Option<i64>)> {
        if self.selected.as_deref() != Some(mailbox) {
            self.ensure_selected(mailbox).await?;
        }

        let fetches: Vec<Fetch> = self
            .session
            .uid_fetch(uid.to_string(), "(UID INTERNALDATE BODY.PEEK[])")
            .await
            .map_err(|e| session_error("fetch message", e))?
            .try_collect()
            .await
            .map_err(|e| session_error("fetch message", e))?;

        fetches
            .iter()
            .find(|f| f.uid == Some(uid))
            .and_then(|f| {
                let internal = f.internal_date().map(|d| d.timestamp());
                f.body().map(|body| (body.to_vec(), internal))
            })
            .ok_or_else(|| DigestError::NotFound {
                mailbox: mailbox.to_string(),
                uid,
            })
    }
}

/// Sequence set covering the newest `limit` of `exists` messages.
fn recent_range(exists: u32, limit: usize) -> String {
    let limit = u32::try_from(limit).unwrap_or(u32::MAX);
    let start = exists.saturating_sub(limit.saturating_sub(1)).max(1);
    format!("{}:{}", start, exists)
}

impl MailSession for ImapClient {
    async fn list_mailboxes(&mut self) -> DigestResult<Vec<String>> {
        let names: Vec<_> = self
            .session
            .list(Some(""), Some("*"))
            .await
            .map_err(|e| session_error("list mailboxes", e))?
            .try_collect()
            .await
            .map_err(|e| session_error("list mailboxes", e))?;

        let mut folders: Vec<String> = names.iter().map(|n| n.name().to_string()).collect();
        sort_mailboxes(&mut folders);
        Ok(folders)
    }

    async fn list_recent(&mut self, mailbox: &str, limit: usize) -> DigestResult<Vec<MessageHeader>> {
        let exists = self.ensure_selected(mailbox).await?;
        if exists == 0 || limit == 0 {
            return Ok(Vec::new());
        }

        // Sequence numbers follow arrival order, so the tail of the mailbox
        // holds the newest messages
        let range = recent_range(exists, limit);

        let fetches: Vec<Fetch> = self
            .session
            .fetch(&range, "(UID INTERNALDATE BODY.PEEK[HEADER])")
            .await
            .map_err(|e| session_error("fetch headers", e))?
            .try_collect()
            .await
            .map_err(|e| session_error("fetch headers", e))?;

        let headers = fetches
            .iter()
            .filter_map(|fetch| {
                let uid = fetch.uid?;
                let internal = fetch.internal_date().map(|d| d.timestamp());
                parse_header(uid, fetch.header()?, internal)
            })
            .collect::<Vec<_>>();

        tracing::info!("Listed {} headers from {} on {}", headers.len(), mailbox, self.server);
        Ok(order_recent(headers, limit))
    }

    async fn fetch_message(&mut self, mailbox: &str, uid: u32) -> DigestResult<Message> {
        let (raw, internal) = self.fetch_raw(mailbox, uid).await?;
        let message = parse_message(uid, &raw, internal).ok_or_else(|| DigestError::NotFound {
            mailbox: mailbox.to_string(),
            uid,
        })?;
        tracing::debug!(
            "Fetched uid {} ({} bytes, {} attachments)",
            uid,
            raw.len(),
            message.attachments.len()
        );
        Ok(message)
    }

    async fn fetch_attachment(
        &mut self,
        mailbox: &str,
        uid: u32,
        index: usize,
    ) -> DigestResult<AttachmentData> {
        let (raw, _) = self.fetch_raw(mailbox, uid).await?;
        parse_attachment(&raw, index).ok_or_else(|| DigestError::NotFound {
            mailbox: mailbox.to_string(),
            uid,
        })
    }

    async fn logout(mut self) {
        if let Err(e) = self.session.logout().await {
            tracing::debug!("IMAP logout failed: {:?}", e);
        }
    }
}
