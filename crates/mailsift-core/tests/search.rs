//! End-to-end tests for the searches over a scripted IMAP server.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailsift_core::{Error, MailConfig, Mailsift};
use mailsift_imap::{Session, SessionConfig};

/// Replays a server script and records what the client wrote.
struct MockStream {
    responses: Cursor<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_lines(sent: &Arc<Mutex<Vec<u8>>>) -> Vec<String> {
    String::from_utf8_lossy(&sent.lock().unwrap())
        .split("\r\n")
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn mailsift() -> Mailsift {
    Mailsift::new(MailConfig::new("imap.example.com", "user", "secret")).unwrap()
}

async fn open_session(script: &str) -> (Session<MockStream>, Arc<Mutex<Vec<u8>>>) {
    let (mock, sent) = MockStream::new(script.as_bytes());
    let session = Session::from_stream(mock, &SessionConfig::new("imap.example.com"))
        .await
        .unwrap();
    (session, sent)
}

fn envelope(subject: &str, from: &str) -> String {
    format!(
        "(\"Tue, 1 Jul 2025 10:00:00 +0000\" \"{subject}\" ((NIL NIL \"{from}\" \"x.com\")) NIL NIL \
         ((NIL NIL \"b\" \"x.com\") (NIL NIL \"c\" \"x.com\")) NIL NIL NIL \"<{from}@x.com>\")"
    )
}

fn body_fetch(seq: u32, body: &str) -> String {
    format!("* {seq} FETCH (BODY[] {{{}}}\r\n{body})\r\n", body.len())
}

const GREETING_AND_LOGIN: &str = "* OK [CAPABILITY IMAP4rev1 IDLE UNSELECT] ready\r\n\
                                  A0001 OK logged in\r\n";

const SELECT_THREE: &str = "* 3 EXISTS\r\n\
                            * OK [UIDVALIDITY 7] ok\r\n\
                            A0002 OK [READ-WRITE] SELECT completed\r\n\
                            * SEARCH 1 2 3\r\n\
                            A0003 OK SEARCH completed\r\n";

#[tokio::test]
async fn test_title_search_fetches_matching_bodies_newest_first() {
    let first = "Subject: hello world\r\nX-Mailsift-Key: k1\r\n\r\nfirst body\r\n";
    let third = "Subject: hello again\r\n\
                 Content-Type: multipart/mixed; boundary=b\r\n\r\n\
                 --b\r\nContent-Type: text/plain\r\n\r\nthird body\r\n\
                 --b\r\nContent-Disposition: attachment; filename=\"r.txt\"\r\n\r\nreport\r\n\
                 --b--\r\n";
    let script = format!(
        "{GREETING_AND_LOGIN}{SELECT_THREE}\
         * 1 FETCH (ENVELOPE {} FLAGS (\\Seen) RFC822.SIZE 100)\r\n\
         * 2 FETCH (ENVELOPE {} FLAGS () RFC822.SIZE 200)\r\n\
         * 3 FETCH (ENVELOPE {} FLAGS () RFC822.SIZE 300)\r\n\
         A0004 OK FETCH completed\r\n\
         {}A0005 OK FETCH completed\r\n\
         {}A0006 OK FETCH completed\r\n\
         * BYE logging out\r\n\
         A0007 OK LOGOUT completed\r\n",
        envelope("hello world", "a"),
        envelope("unrelated", "z"),
        envelope("hello again", "d"),
        body_fetch(3, third),
        body_fetch(1, first),
    );
    let (session, sent) = open_session(&script).await;

    let results = mailsift().search_by_title_on(session, "hello").await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].seq_num, 3);
    assert_eq!(results[0].title, "hello again");
    assert_eq!(results[0].from, "d@x.com");
    assert_eq!(results[0].body, "third body");
    assert_eq!(results[0].attachments.len(), 1);
    assert_eq!(results[0].attachments[0].filename, "r.txt");
    assert_eq!(results[0].attachments[0].data, b"report");

    assert_eq!(results[1].seq_num, 1);
    assert_eq!(results[1].from, "a@x.com");
    assert_eq!(results[1].to_emails, vec!["b@x.com", "c@x.com"]);
    assert_eq!(results[1].key, "k1");
    assert_eq!(results[1].flags, vec!["\\Seen"]);
    assert_eq!(results[1].size, 100);

    assert_eq!(
        sent_lines(&sent),
        vec![
            "A0001 LOGIN user secret",
            "A0002 SELECT INBOX",
            "A0003 SEARCH ALL",
            "A0004 FETCH 1,2,3 (ENVELOPE FLAGS RFC822.SIZE)",
            "A0005 FETCH 3 BODY.PEEK[]",
            "A0006 FETCH 1 BODY.PEEK[]",
            "A0007 LOGOUT",
        ]
    );
}

#[tokio::test]
async fn test_title_search_without_matches_skips_body_fetch() {
    let script = format!(
        "{GREETING_AND_LOGIN}{SELECT_THREE}\
         * 1 FETCH (ENVELOPE {} FLAGS () RFC822.SIZE 1)\r\n\
         * 2 FETCH (ENVELOPE (\"date\" \"short\") FLAGS () RFC822.SIZE 2)\r\n\
         * 3 FETCH (ENVELOPE {} FLAGS () RFC822.SIZE 3)\r\n\
         A0004 OK FETCH completed\r\n\
         * BYE logging out\r\n\
         A0005 OK LOGOUT completed\r\n",
        envelope("one", "a"),
        envelope("three", "a"),
    );
    let (session, sent) = open_session(&script).await;

    let results = mailsift().search_by_title_on(session, "missing").await.unwrap();

    assert!(results.is_empty());
    assert_eq!(sent_lines(&sent).last().map(String::as_str), Some("A0005 LOGOUT"));
}

#[tokio::test]
async fn test_recent_search_fetches_newest_range() {
    let script = format!(
        "{GREETING_AND_LOGIN}\
         * 5 EXISTS\r\n\
         A0002 OK [READ-ONLY] SELECT completed\r\n\
         * 3 FETCH (ENVELOPE {} INTERNALDATE \"01-Jul-2025 10:00:00 +0000\" FLAGS () RFC822.SIZE 30)\r\n\
         * 4 FETCH (ENVELOPE {} INTERNALDATE \"02-Jul-2025 10:00:00 +0000\" FLAGS () RFC822.SIZE 40)\r\n\
         * 5 FETCH (ENVELOPE {} INTERNALDATE \"03-Jul-2025 10:00:00 +0000\" FLAGS () RFC822.SIZE 50)\r\n\
         A0003 OK FETCH completed\r\n\
         * BYE logging out\r\n\
         A0004 OK LOGOUT completed\r\n",
        envelope("three", "a"),
        envelope("four", "a"),
        envelope("five", "a"),
    );
    let (session, sent) = open_session(&script).await;

    let results = mailsift().search_by_recent_on(session, 2).await.unwrap();

    let seqs: Vec<u32> = results.iter().map(|r| r.seq_num).collect();
    assert_eq!(seqs, vec![3, 4, 5]);
    assert_eq!(results[2].title, "five");
    assert_eq!(results[2].date_str, "2025-07-03 10:00:00");
    assert_eq!(results[2].date, 1_751_536_800);
    assert!(results[2].body.is_empty());

    assert_eq!(
        sent_lines(&sent),
        vec![
            "A0001 LOGIN user secret",
            "A0002 SELECT INBOX",
            "A0003 FETCH 3:5 (ENVELOPE INTERNALDATE FLAGS RFC822.SIZE)",
            "A0004 LOGOUT",
        ]
    );
}

#[tokio::test]
async fn test_recent_search_on_empty_mailbox() {
    let script = format!(
        "{GREETING_AND_LOGIN}\
         * 0 EXISTS\r\n\
         A0002 OK [READ-WRITE] SELECT completed\r\n\
         * BYE logging out\r\n\
         A0003 OK LOGOUT completed\r\n"
    );
    let (session, sent) = open_session(&script).await;

    let results = mailsift().search_by_recent_on(session, 10).await.unwrap();

    assert!(results.is_empty());
    assert_eq!(
        sent_lines(&sent),
        vec!["A0001 LOGIN user secret", "A0002 SELECT INBOX", "A0003 LOGOUT"]
    );
}

#[tokio::test]
async fn test_recent_search_with_short_mailbox() {
    let script = format!(
        "{GREETING_AND_LOGIN}\
         * 3 EXISTS\r\n\
         A0002 OK [READ-ONLY] SELECT completed\r\n\
         * 3 FETCH (ENVELOPE {} INTERNALDATE \"01-Jul-2025 10:00:00 +0000\" FLAGS () RFC822.SIZE 30)\r\n\
         A0003 OK FETCH completed\r\n\
         * BYE logging out\r\n\
         A0004 OK LOGOUT completed\r\n",
        envelope("three", "a"),
    );
    let (session, sent) = open_session(&script).await;
    let results = mailsift().search_by_recent_on(session, 3).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].seq_num, 3);
    assert_eq!(
        sent_lines(&sent)[2],
        "A0003 FETCH 3 (ENVELOPE INTERNALDATE FLAGS RFC822.SIZE)"
    );

    let script = format!(
        "{GREETING_AND_LOGIN}\
         * 3 EXISTS\r\n\
         A0002 OK [READ-ONLY] SELECT completed\r\n\
         * BYE logging out\r\n\
         A0003 OK LOGOUT completed\r\n"
    );
    let (session, sent) = open_session(&script).await;
    let results = mailsift().search_by_recent_on(session, 10).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(
        sent_lines(&sent),
        vec!["A0001 LOGIN user secret", "A0002 SELECT INBOX", "A0003 LOGOUT"]
    );
}

#[tokio::test]
async fn test_title_search_skips_message_without_body() {
    let first = "Subject: hello world\r\n\r\nfirst body\r\n";
    let script = format!(
        "{GREETING_AND_LOGIN}{SELECT_THREE}\
         * 1 FETCH (ENVELOPE {} FLAGS () RFC822.SIZE 100)\r\n\
         * 2 FETCH (ENVELOPE {} FLAGS () RFC822.SIZE 200)\r\n\
         * 3 FETCH (ENVELOPE {} FLAGS () RFC822.SIZE 300)\r\n\
         A0004 OK FETCH completed\r\n\
         A0005 OK FETCH completed\r\n\
         {}A0006 OK FETCH completed\r\n\
         * BYE logging out\r\n\
         A0007 OK LOGOUT completed\r\n",
        envelope("hello world", "a"),
        envelope("unrelated", "z"),
        envelope("hello again", "d"),
        body_fetch(1, first),
    );
    let (session, sent) = open_session(&script).await;

    let results = mailsift().search_by_title_on(session, "hello").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].seq_num, 1);
    assert_eq!(results[0].body, "first body");
    assert_eq!(sent_lines(&sent).last().map(String::as_str), Some("A0007 LOGOUT"));
}

#[tokio::test]
async fn test_lost_connection_during_body_fetch_is_an_error() {
    let script = format!(
        "{GREETING_AND_LOGIN}{SELECT_THREE}\
         * 1 FETCH (ENVELOPE {} FLAGS () RFC822.SIZE 100)\r\n\
         A0004 OK FETCH completed\r\n",
        envelope("hello world", "a"),
    );
    let (session, sent) = open_session(&script).await;

    let err = mailsift().search_by_title_on(session, "hello").await.unwrap_err();

    assert!(matches!(err, Error::Imap(ref e) if e.is_fatal()));
    assert_eq!(
        sent_lines(&sent).last().map(String::as_str),
        Some("A0005 FETCH 1 BODY.PEEK[]")
    );
}

#[tokio::test]
async fn test_content_search_matches_body_or_key() {
    let first = "X-Mailsift-Key: ticket-9\r\n\r\nnothing here\r\n";
    let second = "Content-Type: text/plain; charset=gb2312\r\n\
                  Content-Transfer-Encoding: base64\r\n\r\nxOO6ww==\r\n";
    let third = "\r\nunrelated\r\n";
    let script = format!(
        "{GREETING_AND_LOGIN}{SELECT_THREE}\
         * 1 FETCH (ENVELOPE {} FLAGS () RFC822.SIZE 1)\r\n\
         * 2 FETCH (ENVELOPE {} FLAGS () RFC822.SIZE 2)\r\n\
         * 3 FETCH (ENVELOPE {} FLAGS () RFC822.SIZE 3)\r\n\
         A0004 OK FETCH completed\r\n\
         {}A0005 OK FETCH completed\r\n\
         {}A0006 OK FETCH completed\r\n\
         {}A0007 OK FETCH completed\r\n\
         * BYE logging out\r\n\
         A0008 OK LOGOUT completed\r\n",
        envelope("one", "a"),
        envelope("two", "a"),
        envelope("three", "a"),
        body_fetch(3, third),
        body_fetch(2, second),
        body_fetch(1, first),
    );

    let (session, _) = open_session(&script).await;
    let results = mailsift().search_by_content_on(session, "你好").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].seq_num, 2);
    assert_eq!(results[0].body, "你好");

    let (session, _) = open_session(&script).await;
    let results = mailsift().search_by_content_on(session, "ticket-9").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].seq_num, 1);
    assert_eq!(results[0].key, "ticket-9");
}

#[tokio::test]
async fn test_failed_search_still_logs_out() {
    let script = format!(
        "{GREETING_AND_LOGIN}\
         * 3 EXISTS\r\n\
         A0002 OK [READ-WRITE] SELECT completed\r\n\
         A0003 NO search not allowed\r\n\
         * BYE logging out\r\n\
         A0004 OK LOGOUT completed\r\n"
    );
    let (session, sent) = open_session(&script).await;

    let err = mailsift().search_by_title_on(session, "x").await.unwrap_err();

    assert!(matches!(err, Error::Imap(mailsift_imap::Error::Search(_))));
    assert_eq!(sent_lines(&sent).last().map(String::as_str), Some("A0004 LOGOUT"));
}

#[tokio::test]
async fn test_missing_mailbox_still_logs_out() {
    let script = format!(
        "{GREETING_AND_LOGIN}\
         A0002 NO [NONEXISTENT] no such mailbox\r\n\
         * BYE logging out\r\n\
         A0003 OK LOGOUT completed\r\n"
    );
    let (session, sent) = open_session(&script).await;

    let err = mailsift().search_by_recent_on(session, 5).await.unwrap_err();

    assert!(matches!(err, Error::Imap(mailsift_imap::Error::Select { .. })));
    assert_eq!(sent_lines(&sent).last().map(String::as_str), Some("A0003 LOGOUT"));
}

#[tokio::test]
async fn test_health_check() {
    let script = format!(
        "{GREETING_AND_LOGIN}\
         * BYE logging out\r\n\
         A0002 OK LOGOUT completed\r\n"
    );
    let (session, sent) = open_session(&script).await;
    assert!(mailsift().is_health_on(session).await);
    assert_eq!(sent_lines(&sent), vec!["A0001 LOGIN user secret", "A0002 LOGOUT"]);

    let script = "* OK ready\r\nA0001 NO [AUTHENTICATIONFAILED] bad password\r\n";
    let (session, sent) = open_session(script).await;
    assert!(!mailsift().is_health_on(session).await);
    assert_eq!(sent_lines(&sent), vec!["A0001 LOGIN user secret"]);
}
