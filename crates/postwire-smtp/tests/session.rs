//! Scripted-server tests for the SMTP client.
//!
//! The server reads one command line per scripted reply and records it.
//! After a `354` reply it reads the DATA payload up to the lone `.` line.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

use postwire_smtp::{Address, Client, Config, Error, Security, SmtpState};

const EHLO_FULL: &str = "250-smtp.test greets client.test\r\n\
    250-SIZE 35882577\r\n\
    250-8BITMIME\r\n\
    250-AUTH LOGIN PLAIN\r\n\
    250 PIPELINING\r\n";

fn serve(greeting: &str, replies: &[&str]) -> (DuplexStream, JoinHandle<Vec<String>>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let greeting = greeting.to_string();
    let replies: Vec<String> = replies.iter().map(ToString::to_string).collect();
    let handle = tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();
        write.write_all(greeting.as_bytes()).await.unwrap();
        let mut received = Vec::new();
        let mut in_data = false;
        for reply in replies {
            loop {
                let Ok(Some(line)) = lines.next_line().await else {
                    return received;
                };
                let end_of_data = line == ".";
                received.push(line);
                if !in_data || end_of_data {
                    break;
                }
            }
            in_data = reply.starts_with("354");
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
    Config::builder("smtp.test")
        .security(Security::None)
        .ehlo_hostname("client.test")
        .command_timeout(Duration::from_secs(5))
        .build()
}

fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

async fn ready(replies: &[&str]) -> (Client<DuplexStream>, JoinHandle<Vec<String>>) {
    let mut script = vec![EHLO_FULL];
    script.extend_from_slice(replies);
    let (stream, server) = serve("220 smtp.test ESMTP ready\r\n", &script);
    let mut client = Client::from_stream(stream, &config()).await.unwrap();
    client.ehlo("client.test").await.unwrap();
    (client, server)
}

#[tokio::test]
async fn auth_login_sends_two_base64_lines() {
    let (mut client, server) = ready(&[
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "235 2.7.0 Authentication successful\r\n",
    ])
    .await;

    assert_eq!(client.server_info().hostname, "smtp.test");
    assert_eq!(client.server_info().size_limit(), Some(35_882_577));
    client.auth_login("user", "secret").await.unwrap();
    assert_eq!(client.state(), SmtpState::Authenticated);

    drop(client);
    assert_eq!(
        server.await.unwrap(),
        ["EHLO client.test", "AUTH LOGIN", "dXNlcg==", "c2VjcmV0"]
    );
}

#[tokio::test]
async fn auth_login_rejected() {
    let (mut client, _server) = ready(&[
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "535 5.7.8 Authentication credentials invalid\r\n",
    ])
    .await;

    let err = client.auth_login("user", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailed(msg) if msg.starts_with("535")));
    assert_eq!(client.state(), SmtpState::Ready);
}

#[tokio::test]
async fn auth_login_unexpected_challenge_reply() {
    let (mut client, server) = ready(&["504 5.5.4 Unrecognized authentication type\r\n"]).await;

    let err = client.auth_login("user", "secret").await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailed(_)));

    drop(client);
    assert_eq!(server.await.unwrap(), ["EHLO client.test", "AUTH LOGIN"]);
}

#[tokio::test]
async fn plain_used_when_login_not_offered() {
    let (stream, server) = serve(
        "220 smtp.test ESMTP\r\n",
        &["250-smtp.test\r\n250 AUTH PLAIN\r\n", "235 ok\r\n"],
    );
    let mut client = Client::from_stream(stream, &config()).await.unwrap();
    client.ehlo("client.test").await.unwrap();
    client.authenticate("user", "secret").await.unwrap();

    drop(client);
    assert_eq!(
        server.await.unwrap(),
        ["EHLO client.test", "AUTH PLAIN AHVzZXIAc2VjcmV0"]
    );
}

#[tokio::test]
async fn send_runs_full_transaction() {
    let (mut client, server) = ready(&[
        "250 2.1.0 Sender OK\r\n",
        "250 2.1.5 Recipient OK\r\n",
        "251 2.1.5 Will forward\r\n",
        "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
        "250 2.0.0 Queued as 12345\r\n",
    ])
    .await;

    let message = b"Subject: Hi\r\n\r\nline one\n.hidden dot\r\n";
    client
        .send(
            &addr("alice@example.com"),
            &[addr("bob@example.org"), addr("carol@example.net")],
            message,
        )
        .await
        .unwrap();

    drop(client);
    let size = postwire_smtp::prepare_data(message).len();
    assert_eq!(
        server.await.unwrap(),
        [
            "EHLO client.test".to_string(),
            format!("MAIL FROM:<alice@example.com> SIZE={size}"),
            "RCPT TO:<bob@example.org>".to_string(),
            "RCPT TO:<carol@example.net>".to_string(),
            "DATA".to_string(),
            "Subject: Hi".to_string(),
            String::new(),
            "line one".to_string(),
            "..hidden dot".to_string(),
            ".".to_string(),
        ]
    );
}

#[tokio::test]
async fn rejected_recipient_resets_transaction() {
    let (mut client, server) = ready(&[
        "250 OK\r\n",
        "250 OK\r\n",
        "550 5.1.1 No such user\r\n",
        "250 Reset OK\r\n",
    ])
    .await;

    let err = client
        .send(
            &addr("alice@example.com"),
            &[addr("bob@example.org"), addr("ghost@example.org")],
            b"hello",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RecipientRejected(email) if email == "ghost@example.org"));
    assert_eq!(client.state(), SmtpState::Ready);

    drop(client);
    let received = server.await.unwrap();
    assert_eq!(received.last().map(String::as_str), Some("RSET"));
    assert!(!received.iter().any(|l| l == "DATA"));
}

#[tokio::test]
async fn deferred_recipient_is_send_failure() {
    let (mut client, _server) = ready(&[
        "250 OK\r\n",
        "451 4.3.0 Try again later\r\n",
        "250 Reset OK\r\n",
    ])
    .await;

    let err = client
        .send(&addr("alice@example.com"), &[addr("bob@example.org")], b"x")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SendFailed(msg) if msg.contains("451")));
}

#[tokio::test]
async fn final_dot_refused() {
    let (mut client, _server) = ready(&[
        "250 OK\r\n",
        "250 OK\r\n",
        "354 go ahead\r\n",
        "554 5.7.1 Message rejected as spam\r\n",
    ])
    .await;

    let err = client
        .send(&addr("alice@example.com"), &[addr("bob@example.org")], b"buy now")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SendFailed(msg) if msg.contains("spam")));
}

#[tokio::test]
async fn oversized_message_is_refused_before_mail_from() {
    let (stream, server) = serve(
        "220 smtp.test\r\n",
        &["250-smtp.test\r\n250 SIZE 10\r\n"],
    );
    let mut client = Client::from_stream(stream, &config()).await.unwrap();
    client.ehlo("client.test").await.unwrap();

    let err = client
        .send(
            &addr("alice@example.com"),
            &[addr("bob@example.org")],
            b"this body is longer than ten bytes",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MessageTooLarge { limit: 10, .. }));

    drop(client);
    assert_eq!(server.await.unwrap(), ["EHLO client.test"]);
}

#[tokio::test]
async fn send_before_ehlo_is_invalid_state() {
    let (stream, _server) = serve("220 smtp.test\r\n", &[]);
    let mut client = Client::from_stream(stream, &config()).await.unwrap();
    assert_eq!(client.state(), SmtpState::Connected);

    let err = client
        .send(&addr("alice@example.com"), &[addr("bob@example.org")], b"x")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn quit_disconnects() {
    let (mut client, server) = ready(&["221 2.0.0 Bye\r\n"]).await;

    client.quit().await.unwrap();
    assert_eq!(client.state(), SmtpState::Disconnected);
    let err = client.noop().await.unwrap_err();
    assert!(matches!(err, Error::ConnectionFailed { .. }));

    assert_eq!(server.await.unwrap(), ["EHLO client.test", "QUIT"]);
}

#[tokio::test]
async fn refusing_greeting() {
    let (stream, _server) = serve("554 No SMTP service here\r\n", &[]);
    let err = Client::from_stream(stream, &config()).await.unwrap_err();
    assert!(matches!(err, Error::ConnectionFailed { host, port: 25 } if host == "smtp.test"));
}

#[tokio::test]
async fn multi_line_greeting_skips_garbage() {
    let (stream, _server) = serve(
        "220-smtp.test first line\r\nnot a reply line\r\n220 second line\r\n",
        &[],
    );
    let client = Client::from_stream(stream, &config()).await.unwrap();
    assert_eq!(
        client.server_info().greeting,
        "smtp.test first line\nsecond line"
    );
}

#[tokio::test]
async fn silent_server_times_out() {
    let (stream, _server) = serve("220 smtp.test\r\n", &[]);
    let config = Config::builder("smtp.test")
        .security(Security::None)
        .command_timeout(Duration::from_millis(100))
        .build();
    let mut client = Client::from_stream(stream, &config).await.unwrap();

    let err = client.ehlo("client.test").await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert_eq!(client.state(), SmtpState::Disconnected);
    assert!(matches!(
        client.ehlo("client.test").await,
        Err(Error::ConnectionFailed { .. })
    ));
}

#[tokio::test]
async fn overlong_reply_line_is_protocol_error() {
    let long = format!("250-{}\r\n250 OK\r\n", "x".repeat(600));
    let (mut client, _server) = ready(&[long.as_str()]).await;

    let err = client.noop().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(client.state(), SmtpState::Disconnected);
}
