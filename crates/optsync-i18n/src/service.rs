//! Request handlers for translation linking
//!
//! Each operation has a `try_` form returning a typed result and a plain
//! form that renders any error as an unsuccessful [`TranslationResponse`],
//! ready for a transport layer to serialize.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{TranslationBackend, TranslationGroup};
use crate::error::TranslationError;
use crate::types::{LanguageCode, PostId};

/// Link posts across languages: `{"posts": {"ko": 12, "en": 13}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTranslationsRequest {
    /// Language code to post
    pub posts: BTreeMap<String, PostId>,
}

/// Assign a language to one post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetLanguageRequest {
    /// Target post
    pub post_id: PostId,
    /// Language code, short (`ko`) or full (`ko_KR`)
    pub language: String,
}

/// Outcome of a translation operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResponse {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable summary
    pub message: String,
    /// Machine-readable error code on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Post the request targeted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,
    /// Language of `post_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<LanguageCode>,
    /// Linked posts by language
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub translations: BTreeMap<LanguageCode, PostId>,
}

impl TranslationResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            post_id: None,
            language: None,
            translations: BTreeMap::new(),
        }
    }

    fn failure(error: &TranslationError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            error: Some(error.code().to_owned()),
            ..Self::ok(String::new())
        }
    }

    fn render(result: Result<Self, TranslationError>) -> Self {
        result.unwrap_or_else(|error| {
            tracing::warn!(%error, code = error.code(), "translation request failed");
            Self::failure(&error)
        })
    }
}

/// Translation linking over a backend
#[derive(Debug)]
pub struct TranslationService<B> {
    backend: Arc<B>,
}

impl<B> Clone for TranslationService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: TranslationBackend> TranslationService<B> {
    /// Service over `backend`
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    fn ensure_available(&self) -> Result<(), TranslationError> {
        if self.backend.is_available() {
            Ok(())
        } else {
            Err(TranslationError::DependencyUnavailable(
                self.backend.name().to_owned(),
            ))
        }
    }

    /// Link two or more posts as translations of each other
    ///
    /// Each post is assigned its language, then the group is saved.
    ///
    /// # Errors
    /// - [`TranslationError::DependencyUnavailable`] if the backend is inactive
    /// - [`TranslationError::InvalidRequest`] for fewer than two posts, a
    ///   repeated post, or two codes naming the same language
    /// - [`TranslationError::NotFound`] for unknown posts, in which case no
    ///   post is changed
    pub async fn try_link_translations(
        &self,
        request: &LinkTranslationsRequest,
    ) -> Result<TranslationResponse, TranslationError> {
        self.ensure_available()?;
        if request.posts.len() < 2 {
            return Err(TranslationError::InvalidRequest(
                "at least two posts are required".to_owned(),
            ));
        }

        let mut group = TranslationGroup::new();
        let mut seen = BTreeSet::new();
        for (code, post) in &request.posts {
            let language = LanguageCode::parse(code)?;
            if !seen.insert(*post) {
                return Err(TranslationError::InvalidRequest(format!(
                    "post {post} appears more than once"
                )));
            }
            if group.insert(language.clone(), *post).is_some() {
                return Err(TranslationError::InvalidRequest(format!(
                    "language {language} appears more than once"
                )));
            }
        }

        // Every post must exist before any of them is touched.
        for post in group.values() {
            self.backend.post_language(*post).await?;
        }
        for (language, post) in &group {
            self.backend.set_post_language(*post, language).await?;
        }
        self.backend.save_translations(&group).await?;

        let summary = group
            .iter()
            .map(|(language, post)| format!("{language}={post}"))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(posts = %summary, "translations linked");

        Ok(TranslationResponse {
            translations: group,
            ..TranslationResponse::ok(format!("Translations linked: {summary}"))
        })
    }

    /// [`Self::try_link_translations`], rendering errors into the response
    pub async fn link_translations(&self, request: &LinkTranslationsRequest) -> TranslationResponse {
        TranslationResponse::render(self.try_link_translations(request).await)
    }

    /// Assign a language to a post
    ///
    /// # Errors
    /// - [`TranslationError::DependencyUnavailable`] if the backend is inactive
    /// - [`TranslationError::InvalidRequest`] for an empty language
    /// - [`TranslationError::NotFound`] for unknown posts
    pub async fn try_set_language(
        &self,
        request: &SetLanguageRequest,
    ) -> Result<TranslationResponse, TranslationError> {
        self.ensure_available()?;
        let language = LanguageCode::parse(&request.language)?;
        self.backend
            .set_post_language(request.post_id, &language)
            .await?;
        tracing::info!(post = %request.post_id, %language, "language assigned");

        Ok(TranslationResponse {
            post_id: Some(request.post_id),
            language: Some(language.clone()),
            ..TranslationResponse::ok(format!(
                "Language of post {} set to {language}",
                request.post_id
            ))
        })
    }

    /// [`Self::try_set_language`], rendering errors into the response
    pub async fn set_language(&self, request: &SetLanguageRequest) -> TranslationResponse {
        TranslationResponse::render(self.try_set_language(request).await)
    }

    /// Language of a post plus its linked variants
    ///
    /// # Errors
    /// - [`TranslationError::DependencyUnavailable`] if the backend is inactive
    /// - [`TranslationError::NotFound`] for unknown posts
    pub async fn try_get_translations(
        &self,
        post: PostId,
    ) -> Result<TranslationResponse, TranslationError> {
        self.ensure_available()?;
        let language = self.backend.post_language(post).await?;
        let translations = self.backend.translations(post).await?;
        tracing::debug!(%post, linked = translations.len(), "translations fetched");

        Ok(TranslationResponse {
            post_id: Some(post),
            language,
            translations,
            ..TranslationResponse::ok(format!("Translations of post {post}"))
        })
    }

    /// [`Self::try_get_translations`], rendering errors into the response
    pub async fn get_translations(&self, post: PostId) -> TranslationResponse {
        TranslationResponse::render(self.try_get_translations(post).await)
    }
}
