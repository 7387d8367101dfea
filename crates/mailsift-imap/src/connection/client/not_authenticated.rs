//! Implementation for the not-authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{Authenticated, NotAuthenticated};
use super::{Client, Rejected, new_client};
use crate::command::Command;
use crate::connection::framed::FramedStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::ResponseCode;
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting and any capabilities it carries. A BYE
    /// greeting is an error; so is PREAUTH, since LOGIN is then impossible.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed.read_response().await?;
        let mut client = new_client(framed);

        match ResponseParser::parse(&greeting)? {
            Response::Untagged(UntaggedResponse::Ok { code, text }) => {
                if let Some(ResponseCode::Capability(caps)) = code {
                    client.capabilities = caps;
                }
                tracing::debug!(greeting = %text, "connected");
            }
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => return Err(Error::Bye(text)),
            Response::Untagged(UntaggedResponse::PreAuth { .. }) => {
                return Err(Error::InvalidState(
                    "server pre-authenticated the connection".into(),
                ));
            }
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        Ok(client)
    }

    /// Authenticates with the server using LOGIN.
    ///
    /// On success the client moves to [`Authenticated`]. If the server
    /// refuses the credentials the error is [`Error::Auth`] and the client
    /// comes back unauthenticated inside [`Rejected`].
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> std::result::Result<Client<S, Authenticated>, Rejected<Self>> {
        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };

        match self.execute(&command).await {
            Ok(_) => {
                tracing::info!(user = username, "logged in");
                Ok(self.transition(Authenticated))
            }
            Err(e) => {
                let error = e.refused_as(Error::Auth);
                tracing::warn!(user = username, error = %error, "login failed");
                Err(Rejected {
                    error,
                    client: self,
                })
            }
        }
    }
}
