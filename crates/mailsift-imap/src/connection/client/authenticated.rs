//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{Authenticated, Selected};
use super::{Client, Completion, Rejected};
use crate::command::Command;
use crate::parser::UntaggedResponse;
use crate::types::{Mailbox, MailboxInfo, ResponseCode};
use crate::{Error, Result};

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox.
    ///
    /// On refusal the error is [`Error::Select`] and the client stays
    /// authenticated.
    pub async fn select(
        mut self,
        mailbox: &str,
    ) -> std::result::Result<Client<S, Selected>, Rejected<Self>> {
        match self.run_select(mailbox).await {
            Ok(info) => Ok(self.transition(Selected::new(info))),
            Err(error) => Err(Rejected {
                error,
                client: self,
            }),
        }
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Issues SELECT and gathers the mailbox metadata.
    pub(super) async fn run_select(&mut self, mailbox: &str) -> Result<MailboxInfo> {
        let command = Command::Select {
            mailbox: Mailbox::new(mailbox),
        };

        let completion = self.execute(&command).await.map_err(|e| {
            let error = e.refused_as(|reason| Error::Select {
                mailbox: mailbox.to_string(),
                reason,
            });
            tracing::warn!(mailbox, error = %error, "select failed");
            error
        })?;

        let info = mailbox_info(mailbox, completion);
        tracing::info!(
            mailbox,
            exists = info.exists,
            uid_validity = info.uid_validity.map(crate::types::UidValidity::get),
            "mailbox selected"
        );
        Ok(info)
    }
}

/// Builds mailbox metadata from the data a SELECT returned.
pub(super) fn mailbox_info(mailbox: &str, completion: Completion) -> MailboxInfo {
    let mut info = MailboxInfo::new(mailbox);

    for response in completion.data {
        match response {
            UntaggedResponse::Exists(n) => info.exists = n,
            UntaggedResponse::Recent(n) => info.recent = n,
            UntaggedResponse::Flags(flags) => info.flags = flags,
            UntaggedResponse::Ok {
                code: Some(code), ..
            } => match code {
                ResponseCode::UidValidity(v) => info.uid_validity = Some(v),
                ResponseCode::UidNext(v) => info.uid_next = Some(v),
                ResponseCode::Unseen(v) => info.unseen = Some(v),
                ResponseCode::PermanentFlags(flags) => {
                    info.permanent_flags = flags.into_iter().collect();
                }
                _ => {}
            },
            _ => {}
        }
    }

    info.read_only = matches!(completion.code, Some(ResponseCode::ReadOnly));
    info
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;
    use crate::parser::{Response, ResponseParser};
    use crate::types::Flag;

    fn untagged(line: &[u8]) -> UntaggedResponse {
        match ResponseParser::parse(line).unwrap() {
            Response::Untagged(u) => u,
            other => panic!("expected untagged, got {other:?}"),
        }
    }

    #[test]
    fn select_data_fills_mailbox_info() {
        let completion = Completion {
            data: vec![
                untagged(b"* 172 EXISTS\r\n"),
                untagged(b"* 1 RECENT\r\n"),
                untagged(b"* OK [UNSEEN 12] Message 12 is first unseen\r\n"),
                untagged(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n"),
                untagged(b"* OK [UIDNEXT 4392] Predicted next UID\r\n"),
                untagged(b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n"),
                untagged(b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n"),
            ],
            code: Some(ResponseCode::ReadWrite),
            text: "SELECT completed".into(),
        };

        let info = mailbox_info("INBOX", completion);
        assert_eq!(info.name, "INBOX");
        assert_eq!(info.exists, 172);
        assert_eq!(info.recent, 1);
        assert_eq!(info.unseen.unwrap().get(), 12);
        assert_eq!(info.uid_validity.unwrap().get(), 3857529045);
        assert_eq!(info.uid_next.unwrap().get(), 4392);
        assert_eq!(info.flags.len(), 5);
        assert!(info.permanent_flags.contains(&Flag::Wildcard));
        assert!(!info.read_only);
    }

    #[test]
    fn read_only_code() {
        let completion = Completion {
            code: Some(ResponseCode::ReadOnly),
            ..Completion::default()
        };
        assert!(mailbox_info("Archive", completion).read_only);
    }
}
