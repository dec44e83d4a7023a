use crate::brief::Entry;
use crate::error::EntryError;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

// A key starts after start-of-text or a delimiter, so it never begins inside a
// word or a longer number; the digit run is greedy and so never truncated.
static ISSUE_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[-:_\[(\s])([A-Z][A-Z0-9]*)-([0-9]+)").expect("invalid issue key regex")
});

/// A project key plus item number, e.g. `ABC` / `123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IssueRef {
    pub project_key: String,
    pub number: String,
}

impl IssueRef {
    pub fn new(project_key: &str, number: &str) -> Self {
        Self {
            project_key: project_key.to_string(),
            number: number.to_string(),
        }
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.project_key, self.number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    ActivityName,
    Tags,
    Both,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ActivityName => "activity name",
            Self::Tags => "tags",
            Self::Both => "activity name and tags",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch {
    Resolved(IssueRef),
    Ambiguous {
        source: KeySource,
        candidates: Vec<IssueRef>,
    },
    NotFound,
}

impl KeyMatch {
    pub fn into_result(self) -> Result<IssueRef, EntryError> {
        match self {
            Self::Resolved(issue) => Ok(issue),
            Self::Ambiguous {
                source: KeySource::Both,
                candidates,
            } => Err(EntryError::ConflictingKeys {
                candidates: candidates.iter().map(ToString::to_string).collect(),
            }),
            Self::Ambiguous { source, candidates } => Err(EntryError::TooManyKeys {
                origin: source,
                candidates: candidates.iter().map(ToString::to_string).collect(),
            }),
            Self::NotFound => Err(EntryError::KeysNotFound),
        }
    }
}

pub fn find_keys(text: &str) -> BTreeSet<IssueRef> {
    ISSUE_KEY_REGEX
        .captures_iter(text)
        .map(|captures| IssueRef::new(&captures[1], &captures[2]))
        .collect()
}

/// Picks the single issue an entry refers to. The same key given in both the
/// activity name and a tag is fine; several different keys are never guessed.
pub fn resolve_key(activity_name: &str, tags: &[&str]) -> KeyMatch {
    let from_name = find_keys(activity_name);
    let from_tags = tags
        .iter()
        .flat_map(|tag| find_keys(tag))
        .collect::<BTreeSet<_>>();

    if from_name.len() > 1 {
        return KeyMatch::Ambiguous {
            source: KeySource::ActivityName,
            candidates: from_name.into_iter().collect(),
        };
    }
    if from_tags.len() > 1 {
        return KeyMatch::Ambiguous {
            source: KeySource::Tags,
            candidates: from_tags.into_iter().collect(),
        };
    }

    let union = from_name.union(&from_tags).cloned().collect::<Vec<_>>();
    match union.len() {
        0 => KeyMatch::NotFound,
        1 => union
            .into_iter()
            .next()
            .map_or(KeyMatch::NotFound, KeyMatch::Resolved),
        _ => KeyMatch::Ambiguous {
            source: KeySource::Both,
            candidates: union,
        },
    }
}

pub fn resolve_entry_key(entry: &Entry) -> KeyMatch {
    let tags = entry.tag_tokens().collect::<Vec<_>>();
    resolve_key(&entry.activity_name, &tags)
}

#[cfg(test)]
mod tests {
    use super::{IssueRef, KeyMatch, KeySource, find_keys, resolve_key};
    use crate::error::EntryError;

    #[test]
    fn finds_key_in_activity_name() {
        assert_eq!(
            resolve_key("Feature ABC-123 work", &[]),
            KeyMatch::Resolved(IssueRef::new("ABC", "123"))
        );
    }

    #[test]
    fn finds_key_after_delimiters() {
        let keys = find_keys("[INT-7] client:EXO-12 x_OPS-3 (QA2-99)");
        let rendered = keys.iter().map(ToString::to_string).collect::<Vec<_>>();

        assert_eq!(rendered, vec!["EXO-12", "INT-7", "OPS-3", "QA2-99"]);
    }

    #[test]
    fn legacy_encodings_still_match() {
        assert_eq!(
            resolve_key("Client work [12310:555:INT-7]", &[]),
            KeyMatch::Resolved(IssueRef::new("INT", "7"))
        );
        assert_eq!(
            resolve_key("Client", &["exo__CLIENT-12__3456"]),
            KeyMatch::Resolved(IssueRef::new("CLIENT", "12"))
        );
    }

    #[test]
    fn ignores_dates_lowercase_and_embedded_keys() {
        assert!(find_keys("2017-08-01 standup").is_empty());
        assert!(find_keys("abc-123").is_empty());
        assert!(find_keys("xABC-123").is_empty());
    }

    #[test]
    fn keeps_the_full_digit_run() {
        let keys = find_keys("ABC-12345x");
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec![IssueRef::new("ABC", "12345")]);
    }

    #[test]
    fn same_key_in_name_and_tags_is_accepted() {
        assert_eq!(
            resolve_key("ABC-123 work", &["misc", "ABC-123"]),
            KeyMatch::Resolved(IssueRef::new("ABC", "123"))
        );
    }

    #[test]
    fn key_only_in_tags_is_accepted() {
        assert_eq!(
            resolve_key("Client meetings", &["billable", "OPS-9"]),
            KeyMatch::Resolved(IssueRef::new("OPS", "9"))
        );
    }

    #[test]
    fn conflicting_name_and_tag_keys_fail() {
        let result = resolve_key("ABC-1 work", &["XYZ-2"]);

        assert_eq!(
            result,
            KeyMatch::Ambiguous {
                source: KeySource::Both,
                candidates: vec![IssueRef::new("ABC", "1"), IssueRef::new("XYZ", "2")],
            }
        );
        assert!(matches!(
            result.into_result(),
            Err(EntryError::ConflictingKeys { .. })
        ));
    }

    #[test]
    fn two_keys_in_one_source_fail() {
        let in_name = resolve_key("ABC-1 and ABC-2", &[]);
        assert!(matches!(
            in_name.into_result(),
            Err(EntryError::TooManyKeys {
                origin: KeySource::ActivityName,
                ..
            })
        ));

        let in_tags = resolve_key("work", &["ABC-1", "DEF-2"]);
        assert!(matches!(
            in_tags.into_result(),
            Err(EntryError::TooManyKeys {
                origin: KeySource::Tags,
                ..
            })
        ));
    }

    #[test]
    fn repeated_key_in_one_source_counts_once() {
        assert_eq!(
            resolve_key("ABC-1 follow-up for ABC-1", &[]),
            KeyMatch::Resolved(IssueRef::new("ABC", "1"))
        );
    }

    #[test]
    fn no_key_is_not_found() {
        assert_eq!(resolve_key("Lunch", &["personal"]), KeyMatch::NotFound);
        assert!(matches!(
            KeyMatch::NotFound.into_result(),
            Err(EntryError::KeysNotFound)
        ));
    }
}
