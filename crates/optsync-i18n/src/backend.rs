//! Translation backend boundary

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::TranslationError;
use crate::types::{LanguageCode, PostId};

/// Posts linked as translations of each other, one per language
pub type TranslationGroup = BTreeMap<LanguageCode, PostId>;

/// The translation plugin's operations, as opaque remote calls
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Backend name used in error messages
    fn name(&self) -> &str;

    /// Whether the backend is installed and active
    ///
    /// Checked before every operation.
    fn is_available(&self) -> bool;

    /// Assign a language to a post
    ///
    /// # Errors
    /// Returns [`TranslationError::NotFound`] for unknown posts
    async fn set_post_language(&self, post: PostId, language: &LanguageCode) -> Result<(), TranslationError>;

    /// Language of a post, `None` if unassigned
    ///
    /// # Errors
    /// Returns [`TranslationError::NotFound`] for unknown posts
    async fn post_language(&self, post: PostId) -> Result<Option<LanguageCode>, TranslationError>;

    /// Link posts as translations of each other
    ///
    /// # Errors
    /// Returns [`TranslationError::NotFound`] if any post is unknown
    async fn save_translations(&self, group: &TranslationGroup) -> Result<(), TranslationError>;

    /// Group the post belongs to (including itself once linked)
    ///
    /// # Errors
    /// Returns [`TranslationError::NotFound`] for unknown posts
    async fn translations(&self, post: PostId) -> Result<TranslationGroup, TranslationError>;
}

#[derive(Debug, Default)]
struct State {
    posts: BTreeSet<PostId>,
    languages: HashMap<PostId, LanguageCode>,
    groups: HashMap<PostId, TranslationGroup>,
}

impl State {
    fn require(&self, post: PostId) -> Result<(), TranslationError> {
        if self.posts.contains(&post) {
            Ok(())
        } else {
            Err(TranslationError::NotFound(post))
        }
    }
}

/// Backend held in memory, for tests and local runs
#[derive(Debug)]
pub struct InMemoryBackend {
    state: RwLock<State>,
    available: AtomicBool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self {
            state: RwLock::default(),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryBackend {
    /// Available backend with no posts
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Available backend knowing `posts`
    #[must_use]
    pub fn with_posts(posts: impl IntoIterator<Item = PostId>) -> Self {
        let backend = Self::default();
        backend.state.write().posts.extend(posts);
        backend
    }

    /// Register a post
    pub fn add_post(&self, post: PostId) {
        self.state.write().posts.insert(post);
    }

    /// Simulate the plugin being deactivated or reactivated
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl TranslationBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn set_post_language(&self, post: PostId, language: &LanguageCode) -> Result<(), TranslationError> {
        let mut state = self.state.write();
        state.require(post)?;
        state.languages.insert(post, language.clone());
        Ok(())
    }

    async fn post_language(&self, post: PostId) -> Result<Option<LanguageCode>, TranslationError> {
        let state = self.state.read();
        state.require(post)?;
        Ok(state.languages.get(&post).cloned())
    }

    async fn save_translations(&self, group: &TranslationGroup) -> Result<(), TranslationError> {
        let mut state = self.state.write();
        for post in group.values() {
            state.require(*post)?;
        }

        // Members leaving a previous group are dropped from it.
        let members: BTreeSet<PostId> = group.values().copied().collect();
        let previous: Vec<TranslationGroup> = members
            .iter()
            .filter_map(|post| state.groups.get(post).cloned())
            .collect();
        for old in previous {
            let remaining: TranslationGroup = old
                .into_iter()
                .filter(|(_, post)| !members.contains(post))
                .collect();
            for post in remaining.values() {
                if remaining.len() < 2 {
                    state.groups.remove(post);
                } else {
                    state.groups.insert(*post, remaining.clone());
                }
            }
        }

        for post in &members {
            state.groups.insert(*post, group.clone());
        }
        Ok(())
    }

    async fn translations(&self, post: PostId) -> Result<TranslationGroup, TranslationError> {
        let state = self.state.read();
        state.require(post)?;
        Ok(state.groups.get(&post).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(code: &str) -> LanguageCode {
        LanguageCode::parse(code).unwrap()
    }

    #[tokio::test]
    async fn relinking_removes_old_membership() {
        let backend = InMemoryBackend::with_posts([PostId(1), PostId(2), PostId(3)]);
        let first: TranslationGroup = [(lang("ko"), PostId(1)), (lang("en"), PostId(2))].into();
        backend.save_translations(&first).await.unwrap();

        let second: TranslationGroup = [(lang("ko"), PostId(1)), (lang("en"), PostId(3))].into();
        backend.save_translations(&second).await.unwrap();

        assert_eq!(backend.translations(PostId(1)).await.unwrap(), second);
        assert!(backend.translations(PostId(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_post_is_not_found() {
        let backend = InMemoryBackend::new();
        let err = backend.post_language(PostId(9)).await.unwrap_err();
        assert_eq!(err, TranslationError::NotFound(PostId(9)));
    }
}
