//! optsync Translation Linking
//!
//! Transport-agnostic handlers for linking content across languages. The
//! translation plugin itself sits behind [`TranslationBackend`]; every
//! handler checks [`TranslationBackend::is_available`] first and reports a
//! missing plugin as [`TranslationError::DependencyUnavailable`].
//!
//! # Operations
//!
//! - [`TranslationService::link_translations`]: link two or more posts
//! - [`TranslationService::set_language`]: assign a language to a post
//! - [`TranslationService::get_translations`]: language plus linked posts

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod backend;
mod error;
mod service;
mod types;

pub use backend::{InMemoryBackend, TranslationBackend, TranslationGroup};
pub use error::TranslationError;
pub use service::{
    LinkTranslationsRequest, SetLanguageRequest, TranslationResponse, TranslationService,
};
pub use types::{LanguageCode, PostId};
