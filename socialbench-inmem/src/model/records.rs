/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The `|`-separated file layout of baselines and change batches.
//!
//! Baseline files have no header and no collection column. Every line of a change batch
//! starts with the collection it belongs to, for example
//! ```text
//! Comments|1402|2010-02-14 11:09:43|nice!|17|1399
//! Likes|17|1402
//! ```

use std::{
    fs::File,
    io::{BufRead, BufReader},
    num::ParseIntError,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use chrono::NaiveDateTime;
use thiserror::Error;

use super::{ChangeRecord, Comment, Post, Timestamp, User};

pub const USERS_FILE: &str = "csv-users-initial.csv";
pub const FRIENDS_FILE: &str = "csv-friends-initial.csv";
pub const POSTS_FILE: &str = "csv-posts-initial.csv";
pub const COMMENTS_FILE: &str = "csv-comments-initial.csv";
pub const LIKES_FILE: &str = "csv-likes-initial.csv";

/// Every baseline file with the collection its lines belong to, in load order.
pub const BASELINE: [(&str, Collection); 5] = [
    (USERS_FILE, Collection::Users),
    (FRIENDS_FILE, Collection::Friends),
    (POSTS_FILE, Collection::Posts),
    (COMMENTS_FILE, Collection::Comments),
    (LIKES_FILE, Collection::Likes),
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Friends,
    Posts,
    Comments,
    Likes,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("unknown collection {0:?}")]
    UnknownCollection(String),
    #[error("{collection:?} records need {expected} fields, found {found}")]
    FieldCount {
        collection: Collection,
        expected: usize,
        found: usize,
    },
    #[error("invalid id {value:?}")]
    Id {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("invalid timestamp {value:?}, expected YYYY-MM-DD HH:MM:SS")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

#[derive(Debug, Error)]
#[error("baseline file {0:?} is missing")]
pub struct MissingBaselineFile(pub PathBuf);

impl FromStr for Collection {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Users" => Ok(Self::Users),
            "Friends" => Ok(Self::Friends),
            "Posts" => Ok(Self::Posts),
            "Comments" => Ok(Self::Comments),
            "Likes" => Ok(Self::Likes),
            other => Err(RecordError::UnknownCollection(other.to_owned())),
        }
    }
}

fn parse_id(value: &str) -> Result<i64, RecordError> {
    value.trim().parse().map_err(|source| RecordError::Id {
        value: value.to_owned(),
        source,
    })
}

/// Parse a UTC timestamp such as `2010-02-14 11:09:43` into seconds since the epoch.
pub fn parse_timestamp(value: &str) -> Result<Timestamp, RecordError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
        .map(|t| t.and_utc().timestamp())
        .map_err(|source| RecordError::Timestamp {
            value: value.to_owned(),
            source,
        })
}

fn require(collection: Collection, fields: &[&str], expected: usize) -> Result<(), RecordError> {
    if fields.len() < expected {
        Err(RecordError::FieldCount {
            collection,
            expected,
            found: fields.len(),
        })
    } else {
        Ok(())
    }
}

/// Build a record of `collection` from its fields.
///
/// Free text (user names, content) may itself contain `|`, so the fields between the
/// fixed leading and trailing columns are joined back together.
pub fn parse_record(collection: Collection, fields: &[&str]) -> Result<ChangeRecord, RecordError> {
    let record = match collection {
        Collection::Users => {
            require(collection, fields, 2)?;
            ChangeRecord::User(User {
                id: parse_id(fields[0])?,
                name: fields[1..].join("|"),
            })
        }
        Collection::Friends => {
            require(collection, fields, 2)?;
            ChangeRecord::Friend(parse_id(fields[0])?, parse_id(fields[1])?)
        }
        Collection::Posts => {
            require(collection, fields, 4)?;
            let last = fields.len() - 1;
            ChangeRecord::Post(Post {
                id: parse_id(fields[0])?,
                timestamp: parse_timestamp(fields[1])?,
                content: fields[2..last].join("|"),
                submitter: parse_id(fields[last])?,
            })
        }
        Collection::Comments => {
            require(collection, fields, 5)?;
            let last = fields.len() - 1;
            ChangeRecord::Comment(Comment {
                id: parse_id(fields[0])?,
                timestamp: parse_timestamp(fields[1])?,
                content: fields[2..last - 1].join("|"),
                submitter: parse_id(fields[last - 1])?,
                parent: parse_id(fields[last])?,
            })
        }
        Collection::Likes => {
            require(collection, fields, 2)?;
            ChangeRecord::Like {
                person: parse_id(fields[0])?,
                comment: parse_id(fields[1])?,
            }
        }
    };
    Ok(record)
}

/// Invoke `f` on every non-empty line of `path` together with its 1-based line number.
fn for_each_line<F>(path: &Path, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str) -> Result<(), RecordError>,
{
    let file = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("could not read {}", path.display()))?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        f(line).with_context(|| format!("{}:{}", path.display(), i + 1))?;
    }
    Ok(())
}

/// Read every line of a baseline file as a record of `collection`.
pub fn read_collection(path: &Path, collection: Collection) -> anyhow::Result<Vec<ChangeRecord>> {
    let mut records = Vec::new();
    for_each_line(path, |line| {
        let fields: Vec<&str> = line.split('|').collect();
        records.push(parse_record(collection, &fields)?);
        Ok(())
    })?;
    Ok(records)
}

/// Ensure all baseline files exist under `directory`.
pub fn check_baseline(directory: &Path) -> Result<(), MissingBaselineFile> {
    for (name, _) in BASELINE {
        let path = directory.join(name);
        if !path.is_file() {
            return Err(MissingBaselineFile(path));
        }
    }
    Ok(())
}

/// Read the whole baseline stored under `directory`.
pub fn read_baseline(directory: &Path) -> anyhow::Result<Vec<ChangeRecord>> {
    check_baseline(directory)?;

    let mut records = Vec::new();
    for (name, collection) in BASELINE {
        records.extend(read_collection(&directory.join(name), collection)?);
    }
    Ok(records)
}

/// Read one change batch, where every line is prefixed by its collection.
pub fn read_change_batch(path: &Path) -> anyhow::Result<Vec<ChangeRecord>> {
    let mut records = Vec::new();
    for_each_line(path, |line| {
        let mut fields = line.split('|');
        let collection: Collection = fields.next().unwrap_or_default().parse()?;
        let fields: Vec<&str> = fields.collect();
        records.push(parse_record(collection, &fields)?);
        Ok(())
    })?;
    Ok(records)
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("1970-01-01 00:00:00", 0)]
    #[case("1970-01-01 00:01:40", 100)]
    #[case("2010-02-14 11:09:43", 1_266_145_783)]
    fn timestamps_are_utc(#[case] text: &str, #[case] expected: Timestamp) {
        assert_eq!(parse_timestamp(text).unwrap(), expected);
    }

    #[test]
    fn bad_timestamp() {
        assert!(matches!(
            parse_timestamp("2010-02-14T11:09:43"),
            Err(RecordError::Timestamp { .. })
        ));
    }

    #[test]
    fn content_may_contain_separators() {
        let record = parse_record(
            Collection::Comments,
            &["5", "1970-01-01 00:00:05", "a", "b|c", "2", "4"],
        )
        .unwrap();
        assert_eq!(
            record,
            ChangeRecord::Comment(Comment {
                id: 5,
                timestamp: 5,
                content: "a|b|c".into(),
                submitter: 2,
                parent: 4,
            })
        );

        let record =
            parse_record(Collection::Posts, &["4", "1970-01-01 00:00:04", "", "2"]).unwrap();
        assert_eq!(
            record,
            ChangeRecord::Post(Post {
                id: 4,
                timestamp: 4,
                content: String::new(),
                submitter: 2,
            })
        );
    }

    #[test]
    fn malformed_fields() {
        assert!(matches!(
            parse_record(Collection::Friends, &["1"]),
            Err(RecordError::FieldCount { expected: 2, found: 1, .. })
        ));
        assert!(matches!(
            parse_record(Collection::Likes, &["x", "1"]),
            Err(RecordError::Id { .. })
        ));
        assert!(matches!(
            "Votes".parse::<Collection>(),
            Err(RecordError::UnknownCollection(_))
        ));
    }

    fn write_baseline(dir: &Path) {
        std::fs::write(dir.join(USERS_FILE), "1|Alice\n2|Bob\n").unwrap();
        std::fs::write(dir.join(FRIENDS_FILE), "1|2\n").unwrap();
        std::fs::write(dir.join(POSTS_FILE), "10|1970-01-01 00:00:10|hello|1\n").unwrap();
        std::fs::write(dir.join(COMMENTS_FILE), "11|1970-01-01 00:00:11|hi|2|10\r\n").unwrap();
        std::fs::write(dir.join(LIKES_FILE), "").unwrap();
    }

    #[test]
    fn baseline_in_load_order() {
        let dir = tempfile::tempdir().unwrap();
        write_baseline(dir.path());

        let records = read_baseline(dir.path()).unwrap();
        assert_eq!(records.len(), 5);
        assert!(matches!(records[0], ChangeRecord::User(ref u) if u.name == "Alice"));
        assert_eq!(records[2], ChangeRecord::Friend(1, 2));
        assert!(matches!(records[4], ChangeRecord::Comment(ref c) if c.parent == 10));
    }

    #[test]
    fn missing_baseline_file_is_named() {
        let dir = tempfile::tempdir().unwrap();
        write_baseline(dir.path());
        std::fs::remove_file(dir.path().join(LIKES_FILE)).unwrap();

        let err = read_baseline(dir.path()).unwrap_err();
        assert!(err.to_string().contains(LIKES_FILE));
        assert!(check_baseline(dir.path()).is_err());
    }

    #[test]
    fn change_batch_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("change01.csv");
        std::fs::write(
            &path,
            "Users|3|Carol\n\nFriends|3|1\nLikes|3|11\nComments|12|1970-01-01 00:00:12|x|3|11\n",
        )
        .unwrap();

        let records = read_change_batch(&path).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[1], ChangeRecord::Friend(3, 1));
        assert_eq!(
            records[2],
            ChangeRecord::Like {
                person: 3,
                comment: 11
            }
        );
    }

    #[test]
    fn errors_name_file_and_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("change02.csv");
        std::fs::write(&path, "Likes|1|2\nVotes|1|2\n").unwrap();

        let err = read_change_batch(&path).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("change02.csv:2"), "{}", message);
        assert!(message.contains("Votes"), "{}", message);
    }
}
