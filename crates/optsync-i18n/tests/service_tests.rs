use std::collections::BTreeMap;
use std::sync::Arc;

use optsync_i18n::{
    InMemoryBackend, LanguageCode, LinkTranslationsRequest, PostId, SetLanguageRequest,
    TranslationError, TranslationService,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn service(posts: &[u64]) -> (Arc<InMemoryBackend>, TranslationService<InMemoryBackend>) {
    let backend = Arc::new(InMemoryBackend::with_posts(posts.iter().copied().map(PostId)));
    (Arc::clone(&backend), TranslationService::new(backend))
}

fn link(pairs: &[(&str, u64)]) -> LinkTranslationsRequest {
    LinkTranslationsRequest {
        posts: pairs.iter().map(|(l, p)| ((*l).to_owned(), PostId(*p))).collect(),
    }
}

#[tokio::test]
async fn test_link_assigns_languages_and_groups() {
    let (_, service) = service(&[12, 13]);
    let response = service.link_translations(&link(&[("ko", 12), ("en", 13)])).await;
    assert!(response.success, "{}", response.message);

    let fetched = service.get_translations(PostId(12)).await;
    assert!(fetched.success);
    assert_eq!(fetched.language.as_ref().map(LanguageCode::as_str), Some("ko_KR"));
    assert_eq!(
        serde_json::to_value(&fetched.translations).unwrap(),
        json!({"en_US": 13, "ko_KR": 12})
    );
}

#[tokio::test]
async fn test_link_requires_two_posts() {
    let (_, service) = service(&[12]);
    let err = service
        .try_link_translations(&link(&[("ko", 12)]))
        .await
        .unwrap_err();
    assert!(matches!(err, TranslationError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_link_rejects_duplicate_language_after_normalization() {
    let (_, service) = service(&[1, 2]);
    let err = service
        .try_link_translations(&link(&[("ko", 1), ("ko_KR", 2)]))
        .await
        .unwrap_err();
    assert!(matches!(err, TranslationError::InvalidRequest(_)), "{err}");
}

#[tokio::test]
async fn test_unknown_post_leaves_known_posts_untouched() {
    let (_, service) = service(&[11]);
    let err = service
        .try_link_translations(&link(&[("en", 11), ("fr", 99)]))
        .await
        .unwrap_err();
    assert!(matches!(err, TranslationError::NotFound(PostId(99))), "{err}");

    let fetched = service.get_translations(PostId(11)).await;
    assert!(fetched.success);
    assert!(fetched.language.is_none());
    assert!(fetched.translations.is_empty());
}

#[tokio::test]
async fn test_unavailable_backend_is_reported_not_called() {
    let (backend, service) = service(&[1, 2]);
    backend.set_available(false);

    let response = service.link_translations(&link(&[("ko", 1), ("en", 2)])).await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("dependency_unavailable"));

    backend.set_available(true);
    let fetched = service.get_translations(PostId(1)).await;
    assert!(fetched.language.is_none());
    assert!(fetched.translations.is_empty());
}

#[tokio::test]
async fn test_set_language_normalizes_and_echoes() {
    let (_, service) = service(&[7]);
    let response = service
        .set_language(&SetLanguageRequest {
            post_id: PostId(7),
            language: "en".to_owned(),
        })
        .await;

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "success": true,
            "message": "Language of post 7 set to en_US",
            "post_id": 7,
            "language": "en_US"
        })
    );
}

#[tokio::test]
async fn test_set_language_rejects_empty_and_unknown() {
    let (_, service) = service(&[7]);

    let empty = service
        .try_set_language(&SetLanguageRequest {
            post_id: PostId(7),
            language: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(empty.status_hint(), 400);

    let missing = service
        .set_language(&SetLanguageRequest {
            post_id: PostId(99),
            language: "ko".to_owned(),
        })
        .await;
    assert!(!missing.success);
    assert_eq!(missing.error.as_deref(), Some("not_found"));
}

#[test]
fn test_request_wire_format() {
    let request: LinkTranslationsRequest =
        serde_json::from_value(json!({"posts": {"ko": 12, "en": 13}})).unwrap();
    assert_eq!(
        request.posts,
        BTreeMap::from([("en".to_owned(), PostId(13)), ("ko".to_owned(), PostId(12))])
    );
}
