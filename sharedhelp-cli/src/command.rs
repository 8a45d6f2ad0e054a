//! Command-line parsing.
//!
//! `--config <path>` may appear anywhere and is consumed by the config loader.

use sharedhelp_core::{ChangeKind, Title};

use crate::CliError;

pub const USAGE: &str = "\
Usage: sharedhelp [--config <path>] <command>

Commands:
  render <page> [--json] [--lang <code>]
                                   Show the mirrored copy of Help:<page>
  purge <page> [--lang <code>]     Drop this site's cached copy of Help:<page>
                                   --lang defaults to the site's content language
  dispatch <page> [--kind <kind>]  Fan out a change of Help:<page> (authority only)
                                   kind: created | edited | edited-links | deleted | purged
  purge-site <page> [--touch-links]
                                   Clear this site's caches for Help:<page>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Render {
        title: Title,
        json: bool,
        lang: Option<String>,
    },
    Purge {
        title: Title,
        lang: Option<String>,
    },
    Dispatch { title: Title, kind: ChangeKind },
    PurgeSite { title: Title, touch_links: bool },
    Help,
}

impl Command {
    /// Parse the arguments after the program name.
    pub fn parse(args: &[String]) -> Result<Self, CliError> {
        let args = strip_config_flag(args);
        let Some((name, rest)) = args.split_first() else {
            return Ok(Self::Help);
        };

        match name.as_str() {
            "render" => {
                let title = page_arg(rest)?;
                Ok(Self::Render {
                    title,
                    json: has_flag(rest, "--json"),
                    lang: lang_arg(rest)?,
                })
            }
            "purge" => Ok(Self::Purge {
                title: page_arg(rest)?,
                lang: lang_arg(rest)?,
            }),
            "dispatch" => {
                let title = page_arg(rest)?;
                let kind = match flag_value(rest, "--kind") {
                    Some(kind) => parse_kind(kind)?,
                    None => ChangeKind::Edited {
                        affects_links: false,
                    },
                };
                Ok(Self::Dispatch { title, kind })
            }
            "purge-site" => {
                let title = page_arg(rest)?;
                Ok(Self::PurgeSite {
                    title,
                    touch_links: has_flag(rest, "--touch-links"),
                })
            }
            "help" | "--help" | "-h" => Ok(Self::Help),
            other => Err(CliError::Usage(format!("unknown command '{}'", other))),
        }
    }
}

/// Flags that take a value, so the next argument is not the page name.
const VALUE_FLAGS: &[&str] = &["--kind", "--lang"];

fn strip_config_flag(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            iter.next();
            continue;
        }
        out.push(arg.clone());
    }
    out
}

/// First positional argument, as a Help title. A leading `Help:` is optional.
fn page_arg(rest: &[String]) -> Result<Title, CliError> {
    let mut skip_next = false;
    for arg in rest {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        let name = arg.strip_prefix("Help:").unwrap_or(arg);
        return Title::help(name)
            .ok_or_else(|| CliError::Usage(format!("invalid page name '{}'", arg)));
    }
    Err(CliError::Usage("missing page name".to_string()))
}

fn lang_arg(rest: &[String]) -> Result<Option<String>, CliError> {
    if !has_flag(rest, "--lang") {
        return Ok(None);
    }
    match flag_value(rest, "--lang") {
        Some(lang) if !lang.is_empty() && !lang.starts_with("--") => Ok(Some(lang.to_string())),
        _ => Err(CliError::Usage("--lang needs a language code".to_string())),
    }
}

fn has_flag(rest: &[String], flag: &str) -> bool {
    rest.iter().any(|arg| arg == flag)
}

fn flag_value<'a>(rest: &'a [String], flag: &str) -> Option<&'a str> {
    let pos = rest.iter().position(|arg| arg == flag)?;
    rest.get(pos + 1).map(String::as_str)
}

fn parse_kind(kind: &str) -> Result<ChangeKind, CliError> {
    match kind {
        "created" => Ok(ChangeKind::Created),
        "edited" => Ok(ChangeKind::Edited {
            affects_links: false,
        }),
        "edited-links" => Ok(ChangeKind::Edited {
            affects_links: true,
        }),
        "deleted" => Ok(ChangeKind::Deleted),
        "purged" => Ok(ChangeKind::Purged),
        other => Err(CliError::Usage(format!("unknown change kind '{}'", other))),
    }
}
