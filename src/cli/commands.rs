//! Subcommands of the `xhs` binary
//!
//! Each command maps onto one platform operation and yields the JSON value
//! the binary prints.

use crate::{
    client::{ListQuery, Pager, XhsApi},
    config::Settings,
};
use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use serde_json::{Value, json};
use std::{path::PathBuf, time::Duration};
use url::Url;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Harvest a fresh session with the headless browser
    Refresh,

    /// Send an SMS login code
    SendCode {
        /// Phone number
        phone: String,
    },

    /// Log in with an SMS code and store the session
    Login {
        /// Phone number
        phone: String,
        /// Code received by SMS
        code: String,
    },

    /// Obtain `web_session` for the stored cookies
    Activate,

    /// List a user's posts
    UserNotes {
        /// User ID
        user_id: String,
        #[arg(long)]
        xsec_token: String,
        #[arg(long)]
        xsec_source: Option<String>,
        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Fetch one post
    Note {
        /// Post ID
        note_id: String,
        #[arg(long)]
        xsec_token: String,
        #[arg(long)]
        xsec_source: Option<String>,
    },

    /// List a post's comments
    Comments {
        /// Post ID
        note_id: String,
        #[arg(long)]
        xsec_token: String,
        #[command(flatten)]
        paging: PagingArgs,
    },

    /// List the replies to one comment
    SubComments {
        /// Post ID
        note_id: String,
        /// Top-level comment ID
        comment_id: String,
        #[arg(long)]
        xsec_token: String,
        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Fetch every post listed in a file of post URLs, one per line
    BatchNotes {
        /// File of post URLs
        file: PathBuf,
        /// Pause between posts, in milliseconds
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct PagingArgs {
    /// Cursor to start from; empty for the first page
    #[arg(long, default_value = "")]
    pub cursor: String,

    /// Keep fetching until the listing is exhausted
    #[arg(long)]
    pub all: bool,

    /// Stop after this many pages (with --all)
    #[arg(long, value_name = "N")]
    pub max_pages: Option<usize>,
}

/// Global options that override loaded settings
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Cookie file
    #[arg(long, global = true, value_name = "FILE")]
    pub cookie_path: Option<PathBuf>,

    /// Proxy for API calls and the browser (http://host:port, socks5://host:port)
    #[arg(short, long, global = true, value_name = "PROXY")]
    pub proxy: Option<String>,

    /// Signing service endpoint
    #[arg(long, global = true, value_name = "URL")]
    pub signer_url: Option<String>,
}

impl Overrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.cookie_path {
            settings.session.cookie_path = path.clone();
        }
        if let Some(proxy) = &self.proxy {
            settings.network.proxy = Some(proxy.clone());
        }
        if let Some(url) = &self.signer_url {
            settings.signer.endpoint = url.clone();
        }
    }
}

/// Run one command
pub async fn execute(api: &XhsApi, command: Command) -> Result<Value> {
    match command {
        Command::Refresh => {
            let session = api.sessions().refresh().await?;
            Ok(json!({"refreshed": true, "cookies": session.len()}))
        }
        Command::SendCode { phone } => Ok(api.send_phone_code(&phone).await?),
        Command::Login { phone, code } => Ok(api.phone_login(&phone, &code).await?),
        Command::Activate => Ok(api.activate_web_session().await?),
        Command::UserNotes {
            user_id,
            xsec_token,
            xsec_source,
            paging,
        } => {
            let query = ListQuery::UserNotes {
                user_id,
                xsec_token,
                xsec_source,
            };
            walk(api, query, &paging).await
        }
        Command::Note {
            note_id,
            xsec_token,
            xsec_source,
        } => Ok(api
            .get_note_by_id(&note_id, &xsec_token, xsec_source.as_deref())
            .await?),
        Command::Comments {
            note_id,
            xsec_token,
            paging,
        } => {
            walk(
                api,
                ListQuery::Comments {
                    note_id,
                    xsec_token,
                },
                &paging,
            )
            .await
        }
        Command::SubComments {
            note_id,
            comment_id,
            xsec_token,
            paging,
        } => {
            let query = ListQuery::SubComments {
                note_id,
                comment_id,
                xsec_token,
            };
            walk(api, query, &paging).await
        }
        Command::BatchNotes { file, delay_ms } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            batch_notes(api, &content, Duration::from_millis(delay_ms)).await
        }
    }
}

/// One page's `data`, or with `--all` every page up to `--max-pages`
pub async fn walk(api: &XhsApi, query: ListQuery, paging: &PagingArgs) -> Result<Value> {
    let mut pager = Pager::resume(api, query, paging.cursor.as_str());

    if !paging.all {
        let page = pager.next_page().await?;
        return Ok(page.map(|page| page.data).unwrap_or(Value::Null));
    }

    let mut pages = Vec::new();
    while let Some(page) = pager.next_page().await? {
        pages.push(page.data);
        if paging.max_pages.is_some_and(|max| pages.len() >= max) {
            break;
        }
    }

    Ok(json!({
        "pages": pages,
        "cursor": pager.cursor(),
        "done": pager.is_done(),
    }))
}

/// Post coordinates extracted from a share or explore URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteLink {
    pub note_id: String,
    pub xsec_token: String,
    pub xsec_source: Option<String>,
}

impl NoteLink {
    /// Parse `https://www.xiaohongshu.com/explore/<id>?xsec_token=..&xsec_source=..`
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("Invalid post URL: {}", raw))?;

        let note_id = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string)
            .with_context(|| format!("No post ID in {}", raw))?;

        let mut xsec_token = None;
        let mut xsec_source = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "xsec_token" => xsec_token = Some(value.into_owned()),
                "xsec_source" => xsec_source = Some(value.into_owned()),
                _ => {}
            }
        }

        let Some(xsec_token) = xsec_token.filter(|token| !token.is_empty()) else {
            bail!("No xsec_token in {}", raw);
        };

        Ok(Self {
            note_id,
            xsec_token,
            xsec_source: xsec_source.filter(|source| !source.is_empty()),
        })
    }
}

/// Fetch each listed post, skipping the ones that fail
///
/// Blank lines and `#` comments are ignored. A cookie store failure aborts
/// the batch.
pub async fn batch_notes(api: &XhsApi, content: &str, delay: Duration) -> Result<Value> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    let mut notes = Vec::new();
    let mut failed = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let link = match NoteLink::parse(line) {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", line, e);
                failed.push(json!({"url": line, "error": e.to_string()}));
                continue;
            }
        };

        match api
            .get_note_by_id(&link.note_id, &link.xsec_token, link.xsec_source.as_deref())
            .await
        {
            Ok(note) => {
                tracing::info!("Fetched post {} ({}/{})", link.note_id, index + 1, lines.len());
                notes.push(note);
            }
            Err(e) if e.is_io() => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Skipping post {}: {}", link.note_id, e);
                failed.push(json!({"url": line, "error": e.to_string()}));
            }
        }
    }

    Ok(json!({"notes": notes, "failed": failed}))
}
