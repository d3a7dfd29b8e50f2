//! Service tests against scripted IMAP and SMTP servers.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

use postwire::{
    Account, FolderType, MailServiceError, OutgoingMessage, SmtpError, fetch_message,
    list_folders, login, submit,
};

/// Sends `greeting`, then `replies[i]` after the i-th line received.
/// Returns every line received once the client goes away. After a
/// `354` reply, lines up to the lone `.` count as one command.
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

fn account() -> Account {
    let mut account = Account::with_email("me@example.org");
    account.imap.password = "secret".into();
    account.smtp.password = "secret".into();
    account
}

async fn imap_session(
    replies: &[&str],
) -> (postwire_imap::Client<DuplexStream>, JoinHandle<Vec<String>>) {
    let mut script = vec!["A001 OK LOGIN completed\r\n"];
    script.extend_from_slice(replies);
    let (stream, server) = serve("* OK [CAPABILITY IMAP4rev1] ready\r\n", &script);
    let config = postwire_imap::Config::builder("imap.example.org")
        .security(postwire_imap::Security::None)
        .command_timeout(Duration::from_secs(5))
        .build();
    let mut client = postwire_imap::Client::from_stream(stream, &config)
        .await
        .unwrap();
    login(&mut client, &account()).await.unwrap();
    (client, server)
}

#[tokio::test]
async fn folders_carry_roles_and_hierarchy() {
    let (mut client, server) = imap_session(&[
        "* LIST (\\HasNoChildren) \"/\" INBOX\r\n\
         * LIST (\\Noselect \\HasChildren) \"/\" Archive\r\n\
         * LIST (\\HasNoChildren \\Sent) \"/\" \"Archive/Sent Items\"\r\n\
         A002 OK LIST completed\r\n",
    ])
    .await;

    let folders = list_folders(&mut client).await.unwrap();
    assert_eq!(folders.len(), 3);

    assert_eq!(folders[0].path, "INBOX");
    assert_eq!(folders[0].folder_type, FolderType::Inbox);
    assert!(folders[0].selectable);

    assert_eq!(folders[1].name, "Archive");
    assert!(!folders[1].selectable);
    assert!(folders[1].has_children);
    assert_eq!(folders[1].folder_type, FolderType::Archive);

    assert_eq!(folders[2].name, "Sent Items");
    assert_eq!(folders[2].path, "Archive/Sent Items");
    assert_eq!(folders[2].delimiter.as_deref(), Some("/"));
    assert_eq!(folders[2].folder_type, FolderType::Sent);

    client.disconnect().await;
    let received = server.await.unwrap();
    assert_eq!(received[0], "A001 LOGIN me@example.org secret");
    assert_eq!(received[1], "A002 LIST \"\" \"*\"");
}

const MULTIPART: &str = "From: Alice <alice@example.org>\r\n\
    To: me@example.org\r\n\
    Subject: Report\r\n\
    Message-ID: <r1@example.org>\r\n\
    Date: Tue, 14 Nov 2023 09:30:00 +0100\r\n\
    MIME-Version: 1.0\r\n\
    Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
    \r\n\
    --b1\r\n\
    Content-Type: text/plain; charset=utf-8\r\n\
    \r\n\
    See attached.\r\n\
    --b1\r\n\
    Content-Type: application/pdf; name=\"report.pdf\"\r\n\
    Content-Disposition: attachment; filename=\"report.pdf\"\r\n\
    Content-Transfer-Encoding: base64\r\n\
    \r\n\
    JVBERi0xLjQ=\r\n\
    --b1--\r\n";

#[tokio::test]
async fn fetch_message_parses_mime() {
    let fetch = format!(
        "* 3 FETCH (UID 77 BODY[] {{{}}}\r\n{MULTIPART})\r\nA003 OK FETCH completed\r\n",
        MULTIPART.len()
    );
    let (mut client, server) = imap_session(&[
        "* 3 EXISTS\r\nA002 OK [READ-ONLY] EXAMINE completed\r\n",
        fetch.as_str(),
    ])
    .await;

    let message = fetch_message(&mut client, "INBOX", 77).await.unwrap();
    assert_eq!(message.uid, 77);
    assert_eq!(message.subject, "Report");
    assert_eq!(message.from[0].address, "alice@example.org");
    assert_eq!(message.from[0].name.as_deref(), Some("Alice"));
    assert_eq!(message.message_id.as_deref(), Some("r1@example.org"));
    assert!(message.date.is_some());
    assert_eq!(
        message.body_text.as_deref().map(str::trim_end),
        Some("See attached.")
    );
    assert_eq!(message.attachments.len(), 1);
    assert_eq!(message.attachments[0].filename, "report.pdf");
    assert_eq!(message.attachments[0].data, b"%PDF-1.4");
    assert_eq!(message.size, MULTIPART.len());

    client.disconnect().await;
    let received = server.await.unwrap();
    assert_eq!(received[1], "A002 EXAMINE INBOX");
    assert_eq!(received[2], "A003 UID FETCH 77 BODY.PEEK[]");
}

#[tokio::test]
async fn fetch_message_missing_folder() {
    let (mut client, _server) =
        imap_session(&["A002 NO [NONEXISTENT] Mailbox doesn't exist\r\n"]).await;

    let err = fetch_message(&mut client, "Nope", 1).await.unwrap_err();
    assert!(matches!(err, MailServiceError::FolderNotFound(_)));
}

#[tokio::test]
async fn fetch_message_missing_uid() {
    let (mut client, _server) = imap_session(&[
        "* 3 EXISTS\r\nA002 OK [READ-ONLY] EXAMINE completed\r\n",
        "A003 OK FETCH completed\r\n",
    ])
    .await;

    let err = fetch_message(&mut client, "INBOX", 404).await.unwrap_err();
    assert!(matches!(err, MailServiceError::MessageFetch { uid: 404, .. }));
}

#[tokio::test]
async fn login_rejected_maps_to_authentication() {
    let (stream, _server) = serve(
        "* OK [CAPABILITY IMAP4rev1] ready\r\n",
        &["A001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n"],
    );
    let config = postwire_imap::Config::builder("imap.example.org")
        .security(postwire_imap::Security::None)
        .build();
    let mut client = postwire_imap::Client::from_stream(stream, &config)
        .await
        .unwrap();

    let err = login(&mut client, &account()).await.unwrap_err();
    assert!(matches!(err, MailServiceError::Authentication(_)));
}

const EHLO: &str = "250-smtp.example.org\r\n\
    250-SIZE 1000000\r\n\
    250 AUTH LOGIN PLAIN\r\n";

async fn smtp_session(
    replies: &[&str],
) -> (postwire_smtp::Client<DuplexStream>, JoinHandle<Vec<String>>) {
    let mut script = vec![EHLO];
    script.extend_from_slice(replies);
    let (stream, server) = serve("220 smtp.example.org ESMTP\r\n", &script);
    let config = postwire_smtp::Config::builder("smtp.example.org")
        .security(postwire_smtp::Security::None)
        .command_timeout(Duration::from_secs(5))
        .build();
    let mut client = postwire_smtp::Client::from_stream(stream, &config)
        .await
        .unwrap();
    client.ehlo("localhost").await.unwrap();
    (client, server)
}

#[tokio::test]
async fn submit_authenticates_and_sends() {
    let (mut client, server) = smtp_session(&[
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "235 2.7.0 Accepted\r\n",
        "250 2.1.0 OK\r\n",
        "250 2.1.5 OK\r\n",
        "250 2.1.5 OK\r\n",
        "354 Go ahead\r\n",
        "250 2.0.0 Queued\r\n",
    ])
    .await;

    let prepared = OutgoingMessage::new("Me <me@example.org>", "Hi", "Hello Bob")
        .to("bob@example.org")
        .bcc("carol@example.org")
        .prepare()
        .unwrap();
    submit(&mut client, &account().smtp, &prepared).await.unwrap();

    drop(client);
    let received = server.await.unwrap();
    assert_eq!(received[1], "AUTH LOGIN");
    assert_eq!(
        received[4],
        format!(
            "MAIL FROM:<me@example.org> SIZE={}",
            postwire_smtp::prepare_data(&prepared.data).len()
        )
    );
    assert_eq!(received[5], "RCPT TO:<bob@example.org>");
    assert_eq!(received[6], "RCPT TO:<carol@example.org>");
    assert_eq!(received[7], "DATA");
    assert!(received.iter().any(|l| l == "Subject: Hi"));
    assert!(!received.iter().any(|l| l.starts_with("Bcc:")));
    assert_eq!(received.last().map(String::as_str), Some("."));
}

#[tokio::test]
async fn submit_without_username_skips_auth() {
    let (mut client, server) = smtp_session(&[
        "250 OK\r\n",
        "250 OK\r\n",
        "354 Go ahead\r\n",
        "250 Queued\r\n",
    ])
    .await;

    let mut smtp = account().smtp;
    smtp.username.clear();
    let prepared = OutgoingMessage::new("me@example.org", "Hi", "Hello")
        .to("bob@example.org")
        .prepare()
        .unwrap();
    submit(&mut client, &smtp, &prepared).await.unwrap();

    drop(client);
    let received = server.await.unwrap();
    assert!(received[1].starts_with("MAIL FROM:<me@example.org>"));
}

#[tokio::test]
async fn submit_rejected_recipient() {
    let (mut client, _server) = smtp_session(&[
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "235 2.7.0 Accepted\r\n",
        "250 2.1.0 OK\r\n",
        "550 5.1.1 No such user\r\n",
        "250 2.0.0 Reset\r\n",
    ])
    .await;

    let prepared = OutgoingMessage::new("me@example.org", "Hi", "Hello")
        .to("ghost@example.org")
        .prepare()
        .unwrap();
    let err = submit(&mut client, &account().smtp, &prepared)
        .await
        .unwrap_err();
    assert!(matches!(err, SmtpError::RecipientRejected(e) if e == "ghost@example.org"));
}
