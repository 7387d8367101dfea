//! Implementation for the selected state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{Authenticated, Selected};
use super::{Client, Rejected};
use crate::command::{Command, FetchItems, SearchCriteria};
use crate::parser::UntaggedResponse;
use crate::stream_fetch::{FetchStream, OwnedFetchStream};
use crate::types::{MailboxInfo, SeqNum, SequenceSet};
use crate::{Error, Result};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the name of the selected mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        self.state.mailbox()
    }

    /// Returns the metadata reported when the mailbox was selected.
    #[must_use]
    pub const fn info(&self) -> &MailboxInfo {
        self.state.info()
    }

    /// Searches the mailbox.
    ///
    /// `None` searches with `ALL`. Returns sequence numbers in the order
    /// the server listed them. A refusal is reported as [`Error::Search`].
    pub async fn search(&mut self, criteria: Option<SearchCriteria>) -> Result<Vec<SeqNum>> {
        let completion = self
            .execute(&Command::search(criteria))
            .await
            .map_err(|e| e.refused_as(Error::Search))?;

        let ids: Vec<SeqNum> = completion
            .data
            .into_iter()
            .filter_map(|response| match response {
                UntaggedResponse::Search(ids) => Some(ids),
                _ => None,
            })
            .flatten()
            .collect();

        tracing::debug!(mailbox = self.mailbox(), found = ids.len(), "search finished");
        Ok(ids)
    }

    /// Starts a FETCH and returns a stream over its messages.
    ///
    /// A FETCH refused outright is reported as [`Error::Fetch`], either here
    /// or as the stream's only item.
    pub async fn fetch(
        &mut self,
        sequence: &SequenceSet,
        items: FetchItems,
    ) -> Result<FetchStream<'_, S>> {
        let tag = self.start_fetch(sequence, items).await?;
        Ok(FetchStream::new(self, tag))
    }

    /// Streams envelope, flags and size for the given messages.
    pub async fn fetch_envelopes(&mut self, sequence: &SequenceSet) -> Result<FetchStream<'_, S>> {
        self.fetch(sequence, FetchItems::envelope()).await
    }

    /// Fetches the raw RFC 822 bytes of one message without setting `\Seen`.
    pub async fn fetch_body(&mut self, seq: SeqNum) -> Result<Vec<u8>> {
        let sequence = SequenceSet::from(seq);
        let mut stream = self.fetch(&sequence, FetchItems::full_body()).await?;

        let mut body = None;
        while let Some(message) = stream.next().await {
            let message = message?;
            if message.seq == seq && body.is_none() {
                body = message.into_body();
            }
        }

        body.ok_or_else(|| Error::Fetch(format!("no body returned for message {seq}")))
    }

    /// Starts a FETCH whose responses are read by a producer task.
    ///
    /// The client moves into the task and is returned by
    /// [`OwnedFetchStream::finish`]. `capacity` bounds how many decoded
    /// messages may wait in the channel.
    pub async fn fetch_owned(
        mut self,
        sequence: &SequenceSet,
        items: FetchItems,
        capacity: usize,
    ) -> std::result::Result<OwnedFetchStream<S>, Rejected<Self>>
    where
        S: Send + 'static,
    {
        match self.start_fetch(sequence, items).await {
            Ok(tag) => Ok(OwnedFetchStream::spawn(self, tag, capacity)),
            Err(error) => Err(Rejected {
                error,
                client: self,
            }),
        }
    }

    /// Leaves the mailbox without expunging (RFC 3691).
    pub async fn unselect(
        mut self,
    ) -> std::result::Result<Client<S, Authenticated>, Rejected<Self>> {
        match self.execute(&Command::Unselect).await {
            Ok(_) => {
                tracing::debug!(mailbox = self.mailbox(), "mailbox unselected");
                Ok(self.transition(Authenticated))
            }
            Err(error) => Err(Rejected {
                error,
                client: self,
            }),
        }
    }

    /// Selects another mailbox.
    ///
    /// A failed SELECT deselects the current mailbox (RFC 3501 section
    /// 6.3.1), so on refusal the client comes back authenticated.
    pub async fn select(
        mut self,
        mailbox: &str,
    ) -> std::result::Result<Self, Rejected<Client<S, Authenticated>>> {
        match self.run_select(mailbox).await {
            Ok(info) => Ok(self.transition(Selected::new(info))),
            Err(error) => Err(Rejected {
                error,
                client: self.transition(Authenticated),
            }),
        }
    }

    async fn start_fetch(
        &mut self,
        sequence: &SequenceSet,
        items: FetchItems,
    ) -> Result<crate::types::Tag> {
        let command = Command::Fetch {
            sequence: sequence.clone(),
            items,
        };
        let tag = self
            .send(&command)
            .await
            .map_err(|e| e.refused_as(Error::Fetch))?;
        self.in_flight = Some(tag.clone());
        Ok(tag)
    }
}
