//! Command line surface.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::config::defaults::DEFAULT_CONFIG_PATH;
use crate::delivery::{PRIVATE, PUBLIC};

/// IRC status/control bot and its one-shot message sender.
#[derive(Debug, Parser)]
#[command(name = "smirc", version, about)]
pub struct Cli {
    /// Configuration file; `<path>.local` is layered on top when present.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Deliver to every room.
    #[arg(long)]
    pub public: bool,

    /// Deliver to the home channel.
    #[arg(long)]
    pub private: bool,

    /// Deliver to one named room.
    #[arg(long)]
    pub to: Option<String>,

    /// Run the persistent bot instead of sending a message.
    #[arg(long)]
    pub bot: bool,

    /// Log as JSON lines.
    #[arg(long)]
    pub log_json: bool,

    /// Message text; read from stdin when empty.
    #[arg(trailing_var_arg = true)]
    pub message: Vec<String>,
}

impl Cli {
    fn named_target(&self) -> Option<&str> {
        self.to.as_deref().filter(|t| !t.is_empty())
    }

    /// The delivery type set for sender mode.
    ///
    /// With no targeting flag at all both public and private are used.
    /// `--public` overrides `--to`.
    pub fn delivery_kind(&self) -> Vec<String> {
        let explicit = self.public || self.private || self.named_target().is_some();
        let (public, private) = if explicit {
            (self.public, self.private)
        } else {
            (true, true)
        };

        let mut kind = Vec::new();
        if public {
            kind.push(PUBLIC.to_string());
        }
        if private {
            kind.push(PRIVATE.to_string());
        }
        if let Some(to) = self.named_target() {
            if public {
                info!("public overrides --to");
            } else {
                kind.push(to.to_string());
            }
        }
        kind
    }

    /// Message text from the trailing arguments, if any were given.
    pub fn message_text(&self) -> Option<String> {
        (!self.message.is_empty()).then(|| self.message.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("smirc").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_to_public_and_private() {
        let cli = parse(&[]);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(cli.delivery_kind(), vec!["pub", "priv"]);
        assert!(cli.message_text().is_none());
    }

    #[test]
    fn explicit_flags_narrow_the_set() {
        assert_eq!(parse(&["--private"]).delivery_kind(), vec!["priv"]);
        assert_eq!(parse(&["--to", "#ops"]).delivery_kind(), vec!["#ops"]);
        assert_eq!(
            parse(&["--private", "--to", "#ops"]).delivery_kind(),
            vec!["priv", "#ops"]
        );
    }

    #[test]
    fn public_overrides_to() {
        assert_eq!(parse(&["--public", "--to", "#ops"]).delivery_kind(), vec!["pub"]);
    }

    #[test]
    fn trailing_words_form_the_message() {
        let cli = parse(&["--bot", "disk", "is", "full"]);
        assert!(cli.bot);
        assert_eq!(cli.message_text().as_deref(), Some("disk is full"));
    }
}
