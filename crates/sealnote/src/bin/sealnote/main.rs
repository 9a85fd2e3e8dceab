#![deny(missing_docs)]
#![deny(unsafe_code)]

//! sealnote command line: password protected accounts that encrypt,
//! sign, and decode short messages and contact cards.

use sealnote_api::prelude::*;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

mod cmd_account;
mod cmd_contact;
mod cmd_init;
mod cmd_message;

/// Passwords plus whatever stdin text followed them.
pub(crate) struct Secrets {
    pub passwords: Vec<String>,
    rest: Option<String>,
}

impl Secrets {
    /// Read `prompts.len()` passwords, one per prompt. In piped mode
    /// they are the first newline delimited lines of stdin.
    pub async fn read(piped: bool, prompts: &[&str]) -> SealResult<Self> {
        if piped {
            let input = read_stdin().await?;
            let mut lines = input.split('\n');
            let mut passwords = Vec::with_capacity(prompts.len());
            for _ in prompts {
                match lines.next() {
                    Some(line) => {
                        passwords.push(line.trim_end_matches('\r').to_string())
                    }
                    None => {
                        return Err(format!(
                            "expected {} newline delimited passwords on stdin",
                            prompts.len()
                        )
                        .into())
                    }
                }
            }
            let rest = lines.collect::<Vec<_>>().join("\n");
            Ok(Self {
                passwords,
                rest: Some(rest),
            })
        } else {
            let mut passwords = Vec::with_capacity(prompts.len());
            for prompt in prompts {
                passwords.push(read_interactive_password(prompt).await?);
            }
            Ok(Self {
                passwords,
                rest: None,
            })
        }
    }

    /// The message text: the rest of piped stdin, or all of stdin.
    pub async fn message(self) -> SealResult<String> {
        let text = match self.rest {
            Some(rest) => rest,
            None => read_stdin().await?,
        };
        Ok(trim_newline(text))
    }
}

fn trim_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

pub(crate) async fn read_interactive_password(
    prompt: &str,
) -> SealResult<String> {
    let prompt = prompt.to_owned();
    tokio::task::spawn_blocking(move || {
        rpassword::prompt_password(prompt).map_err(SealError::from)
    })
    .await?
}

pub(crate) async fn read_stdin() -> SealResult<String> {
    use tokio::io::AsyncReadExt;

    let mut buf = String::new();
    tokio::io::stdin().read_to_string(&mut buf).await?;
    Ok(buf)
}

/// Find the live account named `name` and unlock it with `password`.
pub(crate) async fn unlock(
    updater: &VaultUpdater,
    name: &str,
    password: &str,
) -> SealResult<UnlockedAccount> {
    let vault = updater.vault();
    let idx = vault
        .find(name)
        .ok_or_else(|| SealError::from(format!("no account named {name:?}")))?;
    vault.accounts()[idx].unlock(password).await
}

/// Look up a contact of `account` by nickname.
pub(crate) fn contact_index(
    account: &UnlockedAccount,
    nickname: &str,
) -> SealResult<usize> {
    account
        .contacts()
        .iter()
        .position(|c| c.nickname == nickname)
        .ok_or_else(|| format!("no contact named {nickname:?}").into())
}

pub(crate) fn describe_peer(peer: &Peer) -> String {
    match peer {
        Peer::Me => "me".to_string(),
        Peer::Contact(c) => format!("contact {:?}", c.nickname),
        Peer::Unknown(shared) => format!(
            "unknown sender with identity key {}",
            BinData::from(shared.dsa().as_bytes())
        ),
    }
}

#[derive(Debug, StructOpt)]
pub(crate) struct OptPiped {
    /// Instead of the normal "interactive" method of password
    /// retrieval, read passwords from stdin, one per line,
    /// followed by any message text. Be careful how you make
    /// use of this, for example, make sure it is not saved
    /// in your `~/.bash_history`.
    #[structopt(short = "p", long, verbatim_doc_comment)]
    pub piped: bool,
}

#[derive(Debug, StructOpt)]
pub(crate) struct OptAccount {
    #[structopt(flatten)]
    pub piped: OptPiped,

    /// The account name.
    pub account: String,
}

#[derive(Debug, StructOpt)]
pub(crate) struct OptAddContact {
    #[structopt(flatten)]
    pub piped: OptPiped,

    /// The account name.
    pub account: String,

    /// Nickname for the new contact.
    pub nickname: String,

    /// The base64url contact card.
    pub card: String,

    /// Freeform note to keep with the contact.
    #[structopt(short = "n", long, default_value = "")]
    pub note: String,
}

#[derive(Debug, StructOpt)]
pub(crate) struct OptRemoveContact {
    #[structopt(flatten)]
    pub piped: OptPiped,

    /// The account name.
    pub account: String,

    /// Nickname of the contact to remove.
    pub nickname: String,
}

#[derive(Debug, StructOpt)]
pub(crate) struct OptEncrypt {
    #[structopt(flatten)]
    pub piped: OptPiped,

    /// The account name.
    pub account: String,

    /// Nickname of the recipient. Omit to encrypt a note to yourself.
    #[structopt(short = "t", long)]
    pub to: Option<String>,
}

#[derive(Debug, StructOpt)]
pub(crate) struct OptDecode {
    #[structopt(flatten)]
    pub piped: OptPiped,

    /// The account name.
    pub account: String,

    /// The base64url message or contact card.
    pub data: String,
}

#[derive(Debug, StructOpt)]
enum Cmd {
    /// Set up a new sealnote root directory.
    Init,

    /// Create a new account.
    CreateAccount(OptAccount),

    /// List accounts, and any in the bin.
    List,

    /// Print a contact card for an account.
    Share(OptAccount),

    /// Add a contact to an account from a contact card.
    AddContact(OptAddContact),

    /// Remove a contact from an account.
    RemoveContact(OptRemoveContact),

    /// Encrypt the message read from stdin.
    Encrypt(OptEncrypt),

    /// Sign the message read from stdin.
    Sign(OptAccount),

    /// Decode a message or contact card.
    Decode(OptDecode),

    /// Move an account to the bin.
    DeleteAccount {
        /// The account name.
        name: String,
    },

    /// Restore an account from the bin.
    RestoreAccount {
        /// The account name.
        name: String,
    },

    /// Change an account's password.
    /// Piped passwords: current, then new.
    #[structopt(verbatim_doc_comment)]
    Passwd(OptAccount),
}

#[derive(Debug, StructOpt)]
#[structopt(about = "password protected message sealing")]
struct Opt {
    /// Sealnote root config and vault directory.
    #[structopt(short = "r", long, default_value = ".", env = "SEALNOTE_ROOT")]
    root: PathBuf,

    /// The subcommand to execute
    #[structopt(subcommand)]
    cmd: Cmd,
}

async fn open(root: &Path) -> SealResult<VaultUpdater> {
    let (_config, updater) = sealnote::open_root(root).await?;
    Ok(updater)
}

async fn exec() -> SealResult<()> {
    let opt = Opt::from_args();
    let Opt { root, cmd } = opt;

    if let Cmd::Init = cmd {
        tokio::fs::DirBuilder::new()
            .recursive(true)
            .create(&root)
            .await?;
    }
    let root = dunce::canonicalize(&root)?;

    match cmd {
        Cmd::Init => cmd_init::exec(root).await,
        Cmd::CreateAccount(opt) => {
            cmd_account::create(open(&root).await?, opt).await
        }
        Cmd::List => cmd_account::list(open(&root).await?).await,
        Cmd::DeleteAccount { name } => {
            cmd_account::delete(open(&root).await?, name).await
        }
        Cmd::RestoreAccount { name } => {
            cmd_account::restore(open(&root).await?, name).await
        }
        Cmd::Passwd(opt) => cmd_account::passwd(open(&root).await?, opt).await,
        Cmd::Share(opt) => cmd_contact::share(open(&root).await?, opt).await,
        Cmd::AddContact(opt) => cmd_contact::add(open(&root).await?, opt).await,
        Cmd::RemoveContact(opt) => {
            cmd_contact::remove(open(&root).await?, opt).await
        }
        Cmd::Encrypt(opt) => {
            cmd_message::encrypt(open(&root).await?, opt).await
        }
        Cmd::Sign(opt) => cmd_message::sign(open(&root).await?, opt).await,
        Cmd::Decode(opt) => cmd_message::decode(open(&root).await?, opt).await,
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    if let Err(e) = exec().await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
