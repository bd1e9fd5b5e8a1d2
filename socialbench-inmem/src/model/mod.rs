/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The social network: users, their posts and comments, friendships and likes.
//!
//! The network only grows. All mutations go through [`SocialNetwork::apply_all`], which
//! reports the genuinely new items as a [`Delta`] for derived structures to consume.

pub mod records;

use hashbrown::{HashMap, HashSet, hash_map::Entry};
use thiserror::Error;

pub type PersonId = i64;
pub type SubmissionId = i64;
/// Seconds since the Unix epoch, UTC.
pub type Timestamp = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: PersonId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: SubmissionId,
    pub timestamp: Timestamp,
    pub content: String,
    pub submitter: PersonId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: SubmissionId,
    pub timestamp: Timestamp,
    pub content: String,
    pub submitter: PersonId,
    /// The post or comment this comment replies to.
    pub parent: SubmissionId,
}

/// One insertion into the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRecord {
    User(User),
    Friend(PersonId, PersonId),
    Post(Post),
    Comment(Comment),
    Like {
        person: PersonId,
        comment: SubmissionId,
    },
}

impl ChangeRecord {
    /// Records are applied in this order so that references resolve within one batch.
    fn order(&self) -> u8 {
        match self {
            Self::User(_) => 0,
            Self::Friend(..) => 1,
            Self::Post(_) => 2,
            Self::Comment(_) => 3,
            Self::Like { .. } => 4,
        }
    }
}

/// An undirected friendship, stored with the smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Friendship {
    pub low: PersonId,
    pub high: PersonId,
}

impl Friendship {
    /// Returns `None` for a self loop.
    pub fn new(a: PersonId, b: PersonId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("person {0} does not exist")]
    UnknownPerson(PersonId),
    #[error("comment {comment} replies to submission {parent}, which does not exist")]
    UnknownParent {
        comment: SubmissionId,
        parent: SubmissionId,
    },
    #[error("comment {0} does not exist")]
    UnknownComment(SubmissionId),
    #[error("submission id {0} is used by both a post and a comment")]
    DuplicateSubmission(SubmissionId),
    #[error("person {0} cannot befriend themselves")]
    SelfFriendship(PersonId),
}

#[derive(Debug, Clone)]
pub struct PostInfo {
    pub timestamp: Timestamp,
    pub content: String,
    pub submitter: PersonId,
}

#[derive(Debug, Clone)]
pub struct CommentInfo {
    pub timestamp: Timestamp,
    pub content: String,
    pub submitter: PersonId,
    pub parent: SubmissionId,
    /// The post at the root of this comment's thread.
    pub root: SubmissionId,
}

/// The items an application of records actually added. Records that were already
/// present are not reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub users: Vec<PersonId>,
    pub friendships: Vec<Friendship>,
    pub posts: Vec<SubmissionId>,
    /// In insertion order, so a reply always follows its parent.
    pub comments: Vec<SubmissionId>,
    pub likes: Vec<(PersonId, SubmissionId)>,
}

impl Delta {
    pub fn len(&self) -> usize {
        self.users.len()
            + self.friendships.len()
            + self.posts.len()
            + self.comments.len()
            + self.likes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct SocialNetwork {
    users: HashMap<PersonId, String>,
    posts: HashMap<SubmissionId, PostInfo>,
    comments: HashMap<SubmissionId, CommentInfo>,
    friends: HashMap<PersonId, HashSet<PersonId>>,
    likes_by_person: HashMap<PersonId, HashSet<SubmissionId>>,
    likes_by_comment: HashMap<SubmissionId, HashSet<PersonId>>,
}

impl SocialNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert every record, resolving references among the records themselves.
    ///
    /// Users are added first, then friendships, posts, comments (a reply may precede its
    /// parent in `records`) and finally likes. On error the network keeps the records
    /// applied so far.
    pub fn apply_all(&mut self, mut records: Vec<ChangeRecord>) -> Result<Delta, ModelError> {
        records.sort_by_key(ChangeRecord::order);

        let mut delta = Delta::default();
        let mut comments = Vec::new();
        let mut likes = Vec::new();

        for record in records {
            match record {
                ChangeRecord::User(user) => self.add_user(user, &mut delta),
                ChangeRecord::Friend(a, b) => self.add_friendship(a, b, &mut delta)?,
                ChangeRecord::Post(post) => self.add_post(post, &mut delta)?,
                ChangeRecord::Comment(comment) => comments.push(comment),
                ChangeRecord::Like { person, comment } => likes.push((person, comment)),
            }
        }

        self.add_comments(comments, &mut delta)?;
        for (person, comment) in likes {
            self.add_like(person, comment, &mut delta)?;
        }
        Ok(delta)
    }

    fn add_user(&mut self, user: User, delta: &mut Delta) {
        if let Entry::Vacant(entry) = self.users.entry(user.id) {
            entry.insert(user.name);
            delta.users.push(user.id);
        }
    }

    fn require_person(&self, person: PersonId) -> Result<(), ModelError> {
        if self.users.contains_key(&person) {
            Ok(())
        } else {
            Err(ModelError::UnknownPerson(person))
        }
    }

    fn add_friendship(
        &mut self,
        a: PersonId,
        b: PersonId,
        delta: &mut Delta,
    ) -> Result<(), ModelError> {
        let friendship = Friendship::new(a, b).ok_or(ModelError::SelfFriendship(a))?;
        self.require_person(a)?;
        self.require_person(b)?;

        if self.friends.entry(a).or_default().insert(b) {
            self.friends.entry(b).or_default().insert(a);
            delta.friendships.push(friendship);
        }
        Ok(())
    }

    fn add_post(&mut self, post: Post, delta: &mut Delta) -> Result<(), ModelError> {
        self.require_person(post.submitter)?;
        if self.comments.contains_key(&post.id) {
            return Err(ModelError::DuplicateSubmission(post.id));
        }

        if let Entry::Vacant(entry) = self.posts.entry(post.id) {
            entry.insert(PostInfo {
                timestamp: post.timestamp,
                content: post.content,
                submitter: post.submitter,
            });
            delta.posts.push(post.id);
        }
        Ok(())
    }

    /// The root post of the thread `submission` belongs to, if it exists.
    fn root_of(&self, submission: SubmissionId) -> Option<SubmissionId> {
        if self.posts.contains_key(&submission) {
            Some(submission)
        } else {
            self.comments.get(&submission).map(|c| c.root)
        }
    }

    fn add_comments(
        &mut self,
        mut pending: Vec<Comment>,
        delta: &mut Delta,
    ) -> Result<(), ModelError> {
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();

            for comment in pending {
                match self.root_of(comment.parent) {
                    Some(root) => self.add_comment(comment, root, delta)?,
                    None => deferred.push(comment),
                }
            }

            if deferred.len() == before {
                let comment = &deferred[0];
                return Err(ModelError::UnknownParent {
                    comment: comment.id,
                    parent: comment.parent,
                });
            }
            pending = deferred;
        }
        Ok(())
    }

    fn add_comment(
        &mut self,
        comment: Comment,
        root: SubmissionId,
        delta: &mut Delta,
    ) -> Result<(), ModelError> {
        self.require_person(comment.submitter)?;
        if self.posts.contains_key(&comment.id) {
            return Err(ModelError::DuplicateSubmission(comment.id));
        }

        if let Entry::Vacant(entry) = self.comments.entry(comment.id) {
            entry.insert(CommentInfo {
                timestamp: comment.timestamp,
                content: comment.content,
                submitter: comment.submitter,
                parent: comment.parent,
                root,
            });
            delta.comments.push(comment.id);
        }
        Ok(())
    }

    fn add_like(
        &mut self,
        person: PersonId,
        comment: SubmissionId,
        delta: &mut Delta,
    ) -> Result<(), ModelError> {
        self.require_person(person)?;
        if !self.comments.contains_key(&comment) {
            return Err(ModelError::UnknownComment(comment));
        }

        if self.likes_by_person.entry(person).or_default().insert(comment) {
            self.likes_by_comment.entry(comment).or_default().insert(person);
            delta.likes.push((person, comment));
        }
        Ok(())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn user_name(&self, person: PersonId) -> Option<&str> {
        self.users.get(&person).map(String::as_str)
    }

    pub fn post(&self, id: SubmissionId) -> Option<&PostInfo> {
        self.posts.get(&id)
    }

    pub fn posts(&self) -> impl ExactSizeIterator<Item = (SubmissionId, &PostInfo)> {
        self.posts.iter().map(|(id, info)| (*id, info))
    }

    pub fn comment(&self, id: SubmissionId) -> Option<&CommentInfo> {
        self.comments.get(&id)
    }

    pub fn comments(&self) -> impl ExactSizeIterator<Item = (SubmissionId, &CommentInfo)> {
        self.comments.iter().map(|(id, info)| (*id, info))
    }

    pub fn friends_of(&self, person: PersonId) -> impl Iterator<Item = PersonId> + use<'_> {
        self.friends.get(&person).into_iter().flatten().copied()
    }

    pub fn are_friends(&self, a: PersonId, b: PersonId) -> bool {
        self.friends.get(&a).is_some_and(|f| f.contains(&b))
    }

    pub fn friendship_count(&self) -> usize {
        self.friends.values().map(HashSet::len).sum::<usize>() / 2
    }

    /// The people who like `comment`.
    pub fn likers(&self, comment: SubmissionId) -> Option<&HashSet<PersonId>> {
        self.likes_by_comment.get(&comment)
    }

    /// The comments `person` likes.
    pub fn liked_by(&self, person: PersonId) -> Option<&HashSet<SubmissionId>> {
        self.likes_by_person.get(&person)
    }

    pub fn likes(&self, person: PersonId, comment: SubmissionId) -> bool {
        self.liked_by(person).is_some_and(|l| l.contains(&comment))
    }

    pub fn like_count(&self) -> usize {
        self.likes_by_person.values().map(HashSet::len).sum()
    }
}

///////////
// Tests //
///////////
