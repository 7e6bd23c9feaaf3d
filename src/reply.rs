//! Reply values and their shared decoration.
//!
//! Handlers build a `Reply` and never send it themselves; delivery turns it into whatever the
//! platform expects.

use serde::Serialize;

pub const DEFAULT_COLOR: u32 = 0x2f3136;
pub const DEFAULT_FOOTER: &str = "Intelix System";

/// Decoration applied uniformly to every reply, success or error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Theme {
    pub color: u32,
    pub footer: String,
    pub thumbnail_url: Option<String>,
    pub ephemeral: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            color: DEFAULT_COLOR,
            footer: DEFAULT_FOOTER.to_string(),
            thumbnail_url: None,
            ephemeral: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyKind {
    Notice,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub title: String,
    pub body: String,
    pub color: u32,
    pub footer: String,
    pub thumbnail_url: Option<String>,
    pub ephemeral: bool,
}

impl Reply {
    pub fn is_error(&self) -> bool {
        self.kind == ReplyKind::Error
    }

    /// Renders the reply as a platform embed object.
    pub fn to_embed(&self) -> Embed {
        Embed {
            title: self.title.clone(),
            description: self.body.clone(),
            color: self.color,
            footer: EmbedFooter { text: self.footer.clone() },
            thumbnail: self.thumbnail_url.clone().map(|url| EmbedThumbnail { url }),
        }
    }

    /// Renders the reply for a terminal.
    pub fn to_plain_text(&self) -> String {
        format!("{}\n\n{}\n\n-- {}", self.title, self.body, self.footer)
    }
}

impl Theme {
    /// A reply carrying the outcome of a command, favourable or not.
    pub fn notice(&self, title: &str, body: String) -> Reply {
        self.build(ReplyKind::Notice, title, body)
    }

    /// The generic error reply: the raw error text in a code block.
    pub fn error(&self, err: &dyn std::error::Error) -> Reply {
        self.build(ReplyKind::Error, "❌ Error", format!("```{}```", err))
    }

    fn build(&self, kind: ReplyKind, title: &str, body: String) -> Reply {
        Reply {
            kind,
            title: title.to_string(),
            body,
            color: self.color,
            footer: self.footer.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            ephemeral: self.ephemeral,
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub footer: EmbedFooter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedThumbnail>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct EmbedThumbnail {
    pub url: String,
}
