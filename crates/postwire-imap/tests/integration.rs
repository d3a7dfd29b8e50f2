//! Integration tests for the IMAP client.
//!
//! Each test runs the client against a scripted server on an in-memory
//! duplex pipe. The server answers one reply per command line it reads and
//! records every line, so tests can assert exactly what went over the wire.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

use postwire_imap::{
    Client, Config, Error, FetchItems, Flag, ProtocolState, SearchCriteria, Security, StoreMode,
    UidSet,
};

const GREETING: &str = "* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] server ready\r\n";

/// Starts a server that sends `greeting`, then writes `replies[i]` after the
/// i-th command line. Once the replies run out it keeps reading until the
/// client closes, and returns every line it received.
fn serve(greeting: &str, replies: Vec<String>) -> (DuplexStream, JoinHandle<Vec<String>>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let greeting = greeting.to_string();
    let handle = tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();
        write.write_all(greeting.as_bytes()).await.unwrap();
        let mut received = Vec::new();
        for reply in replies {
            let Ok(Some(line)) = lines.next_line().await else {
                return received;
            };
            received.push(line);
            write.write_all(reply.as_bytes()).await.unwrap();
        }
        while let Ok(Some(line)) = lines.next_line().await {
            received.push(line);
        }
        received
    });
    (client, handle)
}

fn config() -> Config {
    Config::builder("mail.test")
        .security(Security::None)
        .port(143)
        .command_timeout(Duration::from_secs(5))
        .build()
}

fn replies(lines: &[&str]) -> Vec<String> {
    lines.iter().map(ToString::to_string).collect()
}

async fn logged_in(extra: &[&str]) -> (Client<DuplexStream>, JoinHandle<Vec<String>>) {
    let mut script = vec!["A001 OK LOGIN completed\r\n"];
    script.extend_from_slice(extra);
    let (stream, server) = serve(GREETING, replies(&script));
    let mut client = Client::from_stream(stream, &config()).await.unwrap();
    client.login("user", "secret").await.unwrap();
    (client, server)
}

const SELECT_INBOX: &str = "* 2 EXISTS\r\n\
    * 0 RECENT\r\n\
    * FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
    * OK [UIDVALIDITY 1700000000] UIDs valid\r\n\
    * OK [UIDNEXT 43] next\r\n\
    A002 OK [READ-WRITE] SELECT completed\r\n";

#[tokio::test]
async fn session_tags_are_sequential() {
    let (mut client, server) = logged_in(&[
        "* LIST (\\HasNoChildren) \"/\" INBOX\r\n\
         * LIST (\\HasNoChildren \\Sent) \"/\" \"Sent Items\"\r\n\
         A002 OK LIST completed\r\n",
        "* 2 EXISTS\r\n* 0 RECENT\r\nA003 OK [READ-WRITE] SELECT completed\r\n",
        "* BYE logging out\r\nA004 OK LOGOUT completed\r\n",
    ])
    .await;

    assert_eq!(client.capabilities(), ["IMAP4rev1", "AUTH=PLAIN"]);
    let folders = client.list("", "*").await.unwrap();
    assert_eq!(folders.len(), 2);
    assert_eq!(folders[1].name, "Sent Items");
    assert_eq!(folders[1].delimiter.as_deref(), Some("/"));

    let status = client.select("INBOX").await.unwrap();
    assert_eq!(status.exists, 2);
    assert_eq!(client.selected_mailbox(), Some("INBOX"));

    client.logout().await.unwrap();
    assert_eq!(*client.state(), ProtocolState::Logout);

    let received = server.await.unwrap();
    assert_eq!(
        received,
        [
            "A001 LOGIN user secret",
            "A002 LIST \"\" \"*\"",
            "A003 SELECT INBOX",
            "A004 LOGOUT",
        ]
    );
}

#[tokio::test]
async fn fetch_before_select_sends_nothing() {
    let (mut client, server) = logged_in(&["A002 OK NOOP completed\r\n"]).await;

    let err = client
        .uid_fetch(&UidSet::Single(1), FetchItems::Fast)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoFolderSelected));

    client.noop().await.unwrap();
    client.disconnect().await;

    let received = server.await.unwrap();
    assert_eq!(received, ["A001 LOGIN user secret", "A002 NOOP"]);
}

#[tokio::test]
async fn list_before_login_is_invalid_state() {
    let (stream, server) = serve(GREETING, Vec::new());
    let mut client = Client::from_stream(stream, &config()).await.unwrap();

    let err = client.list("", "*").await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    client.disconnect().await;
    assert!(server.await.unwrap().is_empty());
}

#[tokio::test]
async fn login_rejected() {
    let (stream, _server) = serve(
        GREETING,
        replies(&["A001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n"]),
    );
    let mut client = Client::from_stream(stream, &config()).await.unwrap();

    let err = client.login("user", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailed(msg) if msg.contains("Invalid credentials")));
    assert_eq!(*client.state(), ProtocolState::NotAuthenticated);
}

#[tokio::test]
async fn preauth_greeting_skips_login() {
    let (stream, _server) = serve("* PREAUTH [CAPABILITY IMAP4rev1] hello\r\n", Vec::new());
    let client = Client::from_stream(stream, &config()).await.unwrap();
    assert_eq!(*client.state(), ProtocolState::Authenticated);
}

#[tokio::test]
async fn select_missing_folder() {
    let (mut client, _server) =
        logged_in(&["A002 NO [NONEXISTENT] Mailbox doesn't exist\r\n"]).await;

    let err = client.select("Nope").await.unwrap_err();
    assert!(matches!(err, Error::FolderNotFound(name) if name == "Nope"));
    assert_eq!(*client.state(), ProtocolState::Authenticated);
}

#[tokio::test]
async fn select_reports_mailbox_status() {
    let (mut client, _server) = logged_in(&[SELECT_INBOX]).await;

    let status = client.select("INBOX").await.unwrap();
    assert_eq!(status.exists, 2);
    assert_eq!(status.recent, 0);
    assert_eq!(status.uid_validity, Some(1_700_000_000));
    assert_eq!(status.uid_next, Some(43));
    assert_eq!(status.flags.len(), 5);
    assert!(!status.read_only);
}

#[tokio::test]
async fn body_literal_is_read_by_length() {
    let body = "Subject: hi\r\n\r\nA003 OK not the completion\r\n";
    let fetch = format!(
        "* 1 FETCH (UID 42 BODY[] {{{}}}\r\n{body})\r\nA003 OK FETCH completed\r\n",
        body.len()
    );
    let (mut client, server) = logged_in(&[SELECT_INBOX, fetch.as_str()]).await;

    client.select("INBOX").await.unwrap();
    let fetched = client.fetch_body_peek(42).await.unwrap();
    assert_eq!(fetched, body.as_bytes());

    client.disconnect().await;
    let received = server.await.unwrap();
    assert_eq!(received[2], "A003 UID FETCH 42 BODY.PEEK[]");
}

#[tokio::test]
async fn fetch_body_skips_unsolicited_flag_update() {
    let fetch = "* 1 FETCH (FLAGS (\\Seen))\r\n\
        * 2 FETCH (UID 42 BODY[] {5}\r\nhello)\r\n\
        A003 OK FETCH completed\r\n";
    let (mut client, _server) = logged_in(&[SELECT_INBOX, fetch]).await;

    client.select("INBOX").await.unwrap();
    let fetched = client.fetch_body(42).await.unwrap();
    assert_eq!(fetched, b"hello");
}

#[tokio::test]
async fn fetch_body_missing_message() {
    let (mut client, _server) =
        logged_in(&[SELECT_INBOX, "A003 OK FETCH completed\r\n"]).await;

    client.select("INBOX").await.unwrap();
    let err = client.fetch_body(7).await.unwrap_err();
    assert!(matches!(err, Error::MessageFetchFailed(_)));
}

#[tokio::test]
async fn summary_fetch_parses_envelopes() {
    let fetch = "* 1 FETCH (UID 41 FLAGS (\\Seen) RFC822.SIZE 2048 \
        INTERNALDATE \"17-Jul-1996 02:44:25 -0700\" \
        ENVELOPE (\"Wed, 17 Jul 1996 02:23:25 -0700\" \"Meeting\" \
        ((\"Alice\" NIL \"alice\" \"example.com\")) NIL NIL \
        ((NIL NIL \"bob\" \"example.org\")) NIL NIL NIL \"<1@example.com>\"))\r\n\
        * 2 FETCH (UID 42 FLAGS () RFC822.SIZE 10 \
        INTERNALDATE \"18-Jul-1996 02:44:25 -0700\" \
        ENVELOPE (NIL NIL NIL NIL NIL NIL NIL NIL NIL NIL))\r\n\
        A003 OK FETCH completed\r\n";
    let (mut client, _server) = logged_in(&[SELECT_INBOX, fetch]).await;

    client.select("INBOX").await.unwrap();
    let messages = client
        .uid_fetch(&UidSet::Range(41, 42), FetchItems::summary())
        .await
        .unwrap();

    assert_eq!(messages.len(), 2);
    let (seq, first) = &messages[0];
    assert_eq!(*seq, 1);
    assert_eq!(first.uid, Some(41));
    assert_eq!(first.size, Some(2048));
    assert_eq!(first.flags.as_deref(), Some(&[Flag::Seen][..]));
    let envelope = first.envelope.as_ref().unwrap();
    assert_eq!(envelope.subject.as_deref(), Some("Meeting"));
    assert_eq!(envelope.from[0].name.as_deref(), Some("Alice"));
    assert_eq!(envelope.from[0].email().as_deref(), Some("alice@example.com"));
    assert_eq!(envelope.to[0].email().as_deref(), Some("bob@example.org"));
    assert!(envelope.cc.is_empty());

    let (_, second) = &messages[1];
    assert_eq!(second.flags.as_deref(), Some(&[][..]));
    assert!(second.envelope.as_ref().unwrap().subject.is_none());
}

#[tokio::test]
async fn search_and_expunge() {
    let (mut client, server) = logged_in(&[
        SELECT_INBOX,
        "* SEARCH 3 5 8\r\nA003 OK SEARCH completed\r\n",
        "* 3 EXPUNGE\r\n* 3 EXPUNGE\r\n* 5 EXPUNGE\r\nA004 OK EXPUNGE completed\r\n",
    ])
    .await;

    client.select("INBOX").await.unwrap();
    let hits = client
        .uid_search(SearchCriteria::Unseen.and(SearchCriteria::From("alice".into())))
        .await
        .unwrap();
    assert_eq!(hits, [3, 5, 8]);

    let expunged = client.expunge().await.unwrap();
    assert_eq!(expunged, [3, 3, 5]);

    client.disconnect().await;
    let received = server.await.unwrap();
    assert_eq!(received[2], "A003 UID SEARCH (UNSEEN) (FROM alice)");
    assert_eq!(received[3], "A004 EXPUNGE");
}

#[tokio::test]
async fn move_is_copy_then_delete_flag() {
    let (mut client, server) = logged_in(&[
        SELECT_INBOX,
        "A003 OK COPY completed\r\n",
        "* 1 FETCH (UID 5 FLAGS (\\Seen \\Deleted))\r\nA004 OK STORE completed\r\n",
    ])
    .await;

    client.select("INBOX").await.unwrap();
    client
        .move_messages(&UidSet::Single(5), "Archive")
        .await
        .unwrap();

    client.disconnect().await;
    let received = server.await.unwrap();
    assert_eq!(
        &received[2..],
        ["A003 UID COPY 5 Archive", "A004 UID STORE 5 +FLAGS (\\Deleted)"]
    );
}

#[tokio::test]
async fn failed_copy_does_not_flag() {
    let (mut client, server) = logged_in(&[
        SELECT_INBOX,
        "A003 NO [TRYCREATE] no such mailbox\r\n",
    ])
    .await;

    client.select("INBOX").await.unwrap();
    let err = client
        .move_messages(&UidSet::Single(5), "Missing")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FolderNotFound(name) if name == "Missing"));

    client.disconnect().await;
    assert_eq!(server.await.unwrap().len(), 3);
}

#[tokio::test]
async fn store_flags_returns_after_ok() {
    let (mut client, server) = logged_in(&[
        SELECT_INBOX,
        "* 2 FETCH (UID 42 FLAGS (\\Seen))\r\nA003 OK STORE completed\r\n",
    ])
    .await;

    client.select("INBOX").await.unwrap();
    client
        .store_flags(&UidSet::Single(42), &[Flag::Seen], StoreMode::Add)
        .await
        .unwrap();

    client.disconnect().await;
    assert_eq!(
        server.await.unwrap()[2],
        "A003 UID STORE 42 +FLAGS (\\Seen)"
    );
}

#[tokio::test]
async fn examined_mailbox_refuses_writes() {
    let (mut client, server) = logged_in(&[
        "* 1 EXISTS\r\nA002 OK [READ-ONLY] EXAMINE completed\r\n",
    ])
    .await;

    let status = client.examine("INBOX").await.unwrap();
    assert!(status.read_only);
    let err = client.expunge().await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    client.disconnect().await;
    assert_eq!(server.await.unwrap().len(), 2);
}

#[tokio::test]
async fn close_returns_to_authenticated() {
    let (mut client, _server) =
        logged_in(&[SELECT_INBOX, "A003 OK CLOSE completed\r\n"]).await;

    client.select("INBOX").await.unwrap();
    client.close().await.unwrap();
    assert_eq!(*client.state(), ProtocolState::Authenticated);
    assert!(matches!(client.close().await, Err(Error::NoFolderSelected)));
}

#[tokio::test]
async fn server_closing_fails_pending_command() {
    let (stream, server) = tokio::io::duplex(4096);
    let server = tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        write.write_all(GREETING.as_bytes()).await.unwrap();
        let mut lines = BufReader::new(read).lines();
        // Returning drops both halves and closes the pipe mid-command.
        lines.next_line().await.unwrap()
    });

    let mut client = Client::from_stream(stream, &config()).await.unwrap();
    let err = client.login("user", "secret").await.unwrap_err();
    assert!(matches!(err, Error::ConnectionFailed { host, port: 143 } if host == "mail.test"));
    assert!(!client.is_connected());

    let err = client.list("", "*").await.unwrap_err();
    assert!(matches!(err, Error::ConnectionFailed { .. }));
    assert_eq!(
        server.await.unwrap().as_deref(),
        Some("A001 LOGIN user secret")
    );
}

#[tokio::test]
async fn command_timeout_abandons_connection() {
    let (stream, server) = serve(GREETING, Vec::new());
    let config = Config::builder("mail.test")
        .security(Security::None)
        .command_timeout(Duration::from_millis(100))
        .build();
    let mut client = Client::from_stream(stream, &config).await.unwrap();

    let err = client.login("user", "secret").await.unwrap_err();
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(100)));
    assert_eq!(*client.state(), ProtocolState::Logout);

    let err = client.noop().await.unwrap_err();
    assert!(matches!(err, Error::ConnectionFailed { .. }));
    assert_eq!(server.await.unwrap(), ["A001 LOGIN user secret"]);
}

#[tokio::test]
async fn untagged_bye_moves_to_logout() {
    let (mut client, _server) = logged_in(&[
        "* BYE server shutting down\r\nA002 OK NOOP completed\r\n",
    ])
    .await;

    client.noop().await.unwrap();
    assert_eq!(*client.state(), ProtocolState::Logout);
}
