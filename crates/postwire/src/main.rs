//! postwire - command line mail client.
//!
//! Lists IMAP folders, prints messages and sends mail using the account
//! stored in `<config dir>/postwire/account.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use postwire::{Account, OutgoingMessage, connect_imap, fetch_message, list_folders, send_email};
use postwire_mime::{Mailbox, OutgoingAttachment, mime_type_for};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "postwire", version, about = "IMAP/SMTP mail client")]
struct Cli {
    /// Account file to use instead of the default location.
    #[arg(long, global = true, env = "POSTWIRE_ACCOUNT")]
    account: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write an account file with provider defaults for an address.
    Init {
        /// Email address.
        email: String,
        /// Display name for outgoing mail.
        #[arg(long)]
        name: Option<String>,
        /// Password for both servers.
        #[arg(long, env = "POSTWIRE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Overwrite an existing account file.
        #[arg(long)]
        force: bool,
    },

    /// List folders on the IMAP server.
    Folders,

    /// Print one message.
    Show {
        /// Message UID.
        uid: u32,
        /// Folder holding the message.
        #[arg(long, default_value = "INBOX")]
        folder: String,
        /// Write attachments into this directory.
        #[arg(long, value_name = "DIR")]
        save_attachments: Option<PathBuf>,
    },

    /// Send a message. The body is read from stdin unless given.
    Send {
        /// Recipient, repeatable.
        #[arg(long, required = true)]
        to: Vec<String>,
        /// Carbon copy recipient, repeatable.
        #[arg(long)]
        cc: Vec<String>,
        /// Blind carbon copy recipient, repeatable.
        #[arg(long)]
        bcc: Vec<String>,
        /// Subject line.
        #[arg(long, short)]
        subject: String,
        /// Plain text body.
        #[arg(long, short, conflicts_with = "body_file")]
        body: Option<String>,
        /// Read the plain text body from a file.
        #[arg(long, value_name = "FILE")]
        body_file: Option<PathBuf>,
        /// HTML alternative read from a file.
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,
        /// File to attach, repeatable.
        #[arg(long = "attach", value_name = "FILE")]
        attachments: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postwire=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let path = match cli.account {
        Some(path) => path,
        None => Account::default_path()?,
    };

    match cli.command {
        Commands::Init {
            email,
            name,
            password,
            force,
        } => init(&path, &email, name, password, force).await,
        Commands::Folders => folders(&load(&path).await?).await,
        Commands::Show {
            uid,
            folder,
            save_attachments,
        } => show(&load(&path).await?, &folder, uid, save_attachments.as_deref()).await,
        Commands::Send {
            to,
            cc,
            bcc,
            subject,
            body,
            body_file,
            html,
            attachments,
        } => {
            let account = load(&path).await?;
            let body = match (body, body_file) {
                (Some(body), _) => body,
                (None, Some(file)) => read_text(&file).await?,
                (None, None) => {
                    let mut body = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut body)
                        .await
                        .context("reading body from stdin")?;
                    body
                }
            };

            let mut message = OutgoingMessage::new(account.sender(), subject, body);
            message.to = to;
            message.cc = cc;
            message.bcc = bcc;
            if let Some(file) = html {
                message = message.html(read_text(&file).await?);
            }
            for file in attachments {
                message = message.attach(read_attachment(&file).await?);
            }

            send_email(&account, &message).await?;
            info!("message sent");
            Ok(())
        }
    }
}

async fn load(path: &Path) -> Result<Account> {
    let account = Account::load(path)
        .await
        .with_context(|| {
            format!(
                "loading {} (create it with `postwire init <email>`)",
                path.display()
            )
        })?;
    account.validate().context("account file is incomplete")?;
    Ok(account)
}

async fn init(
    path: &Path,
    email: &str,
    name: Option<String>,
    password: Option<String>,
    force: bool,
) -> Result<()> {
    if !force && tokio::fs::try_exists(path).await? {
        bail!("{} already exists, use --force to replace it", path.display());
    }

    let mut account = Account::with_email(email);
    if let Some(name) = name {
        account.name = name;
    }
    if let Some(password) = password {
        account.imap.password.clone_from(&password);
        account.smtp.password = password;
    }
    account.validate()?;
    account.save(path).await?;

    println!("Wrote {}", path.display());
    println!(
        "  IMAP {}:{} ({})",
        account.imap.host,
        account.imap.effective_port(),
        account.imap.security.display_name()
    );
    println!(
        "  SMTP {}:{} ({})",
        account.smtp.host,
        account.smtp.effective_port(),
        account.smtp.security.display_name()
    );
    Ok(())
}

async fn folders(account: &Account) -> Result<()> {
    let mut client = connect_imap(account).await?;
    let folders = list_folders(&mut client).await?;
    for folder in &folders {
        let mut notes = Vec::new();
        if !folder.folder_type.label().is_empty() {
            notes.push(folder.folder_type.label());
        }
        if !folder.selectable {
            notes.push("noselect");
        }
        if notes.is_empty() {
            println!("{}", folder.path);
        } else {
            println!("{}  [{}]", folder.path, notes.join(", "));
        }
    }
    if let Err(e) = client.logout().await {
        warn!(error = %e, "LOGOUT failed");
    }
    Ok(())
}

async fn show(account: &Account, folder: &str, uid: u32, save_to: Option<&Path>) -> Result<()> {
    let mut client = connect_imap(account).await?;
    let message = fetch_message(&mut client, folder, uid).await?;
    if let Err(e) = client.logout().await {
        warn!(error = %e, "LOGOUT failed");
    }

    println!("From:    {}", format_mailboxes(&message.from));
    println!("To:      {}", format_mailboxes(&message.to));
    if !message.cc.is_empty() {
        println!("Cc:      {}", format_mailboxes(&message.cc));
    }
    if let Some(date) = message.date {
        println!("Date:    {}", date.to_rfc2822());
    }
    println!("Subject: {}", message.subject);
    println!();
    match (&message.body_text, &message.body_html) {
        (Some(text), _) => println!("{text}"),
        (None, Some(html)) => println!("{html}"),
        (None, None) => println!("(no text body)"),
    }

    if !message.attachments.is_empty() {
        println!();
        for attachment in &message.attachments {
            println!(
                "[{}] {} ({} bytes)",
                attachment.content_type, attachment.filename, attachment.size
            );
        }
    }

    if let Some(dir) = save_to {
        tokio::fs::create_dir_all(dir).await?;
        for attachment in &message.attachments {
            // Final path component only.
            let Some(name) = Path::new(&attachment.filename).file_name() else {
                warn!(filename = %attachment.filename, "skipping attachment without a usable name");
                continue;
            };
            let target = dir.join(name);
            tokio::fs::write(&target, &attachment.data)
                .await
                .with_context(|| format!("writing {}", target.display()))?;
            info!(path = %target.display(), "attachment saved");
        }
    }
    Ok(())
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

async fn read_attachment(path: &Path) -> Result<OutgoingAttachment> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let content_type = mime_type_for(&filename);
    Ok(OutgoingAttachment::new(filename, content_type, data))
}

fn format_mailboxes(list: &[Mailbox]) -> String {
    list.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
