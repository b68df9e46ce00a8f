//! Topic/filter tokenization (C1).
//!
//! `subs.c`'s `sub__topic_tokenise` produces an owned NUL-separated copy of
//! the filter plus a pointer array into it. A Rust filter string already
//! supports borrowed, non-owning slices, so tokenizing here just borrows
//! `&str` levels out of the input instead of copying it — the natural
//! simplification of that design for a language with string slices.

use smallvec::SmallVec;

use crate::subs::error::SubsError;

/// Levels plus an optional `$share/<group>/...` group name, borrowed from
/// the input filter.
pub struct Tokenized<'a> {
    pub levels: SmallVec<[&'a str; 8]>,
    pub share_group: Option<&'a str>,
}

/// Tokenize a subscription filter (SUBSCRIBE/UNSUBSCRIBE), validating
/// wildcard placement and the `$share/` form.
pub fn tokenize_filter(filter: &str) -> Result<Tokenized<'_>, SubsError> {
    if filter.is_empty() {
        return Err(SubsError::Inval("topic filter cannot be empty"));
    }
    if filter.len() > 65535 {
        return Err(SubsError::Inval("topic filter exceeds maximum length"));
    }

    let (share_group, rest) = match filter.strip_prefix("$share/") {
        Some(after) => {
            let slash = after
                .find('/')
                .ok_or(SubsError::Inval("invalid $share/ form"))?;
            let group = &after[..slash];
            let actual = &after[slash + 1..];
            if group.is_empty() {
                return Err(SubsError::Inval("shared subscription group cannot be empty"));
            }
            if group.contains('/') || group.contains('+') || group.contains('#') {
                return Err(SubsError::Inval(
                    "shared subscription group cannot contain '/', '+' or '#'",
                ));
            }
            if actual.is_empty() {
                return Err(SubsError::Inval("shared subscription filter cannot be empty"));
            }
            (Some(group), actual)
        }
        None => (None, filter),
    };

    let levels: SmallVec<[&str; 8]> = rest.split('/').collect();
    for (i, level) in levels.iter().enumerate() {
        if level.len() > 65535 {
            return Err(SubsError::Inval("topic level exceeds maximum length"));
        }
        if level.contains('#') && *level != "#" {
            return Err(SubsError::Inval(
                "multi-level wildcard must occupy an entire level",
            ));
        }
        if *level == "#" && i != levels.len() - 1 {
            return Err(SubsError::Inval("multi-level wildcard must be the last level"));
        }
        if level.contains('+') && *level != "+" {
            return Err(SubsError::Inval(
                "single-level wildcard must occupy an entire level",
            ));
        }
    }

    Ok(Tokenized {
        levels,
        share_group,
    })
}

/// Tokenize a published topic. Published topics carry no share group and
/// `+`/`#` are ordinary bytes here; rejecting wildcards in published topics
/// is enforced by `topic::validation::validate_topic_name`, upstream of
/// this crate's boundary.
pub fn tokenize_topic(topic: &str) -> SmallVec<[&str; 8]> {
    topic.split('/').collect()
}
