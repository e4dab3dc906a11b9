//! Suggestion Client Tests

use anistream::api::suggest::{SuggestionError, MAX_SUGGESTIONS};
use anistream::SuggestionClient;
use mockito::{Matcher, Server};

#[tokio::test]
async fn test_suggest_posts_title_with_key() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/suggest")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "title": "Frieren",
            "count": MAX_SUGGESTIONS
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"suggestions": [
                "1. Mushoku Tensei",
                "2) \"Violet Evergarden\"",
                "- Frieren",
                "* Made in Abyss",
                "",
                "violet evergarden"
            ]}"#,
        )
        .create_async()
        .await;

    let client = SuggestionClient::new(format!("{}/suggest", server.url()), Some("sk-test".into()));
    let titles = client.suggest(" Frieren ").await.unwrap();

    mock.assert_async().await;
    assert_eq!(
        titles,
        vec!["Mushoku Tensei", "Violet Evergarden", "Made in Abyss"]
    );
}

#[tokio::test]
async fn test_plain_list_is_capped() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"["A", "B", "C", "D", "E", "F", "G"]"#)
        .create_async()
        .await;

    let client = SuggestionClient::new(server.url(), None);
    let titles = client.suggest("Z").await.unwrap();
    assert_eq!(titles.len(), MAX_SUGGESTIONS);
}

#[tokio::test]
async fn test_numeric_titles_survive() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"["86 Eighty-Six", "1. 7 Seeds"]"#)
        .create_async()
        .await;

    let client = SuggestionClient::new(server.url(), None);
    let titles = client.suggest("Gundam").await.unwrap();
    assert_eq!(titles, vec!["86 Eighty-Six", "7 Seeds"]);
}

#[tokio::test]
async fn test_http_error() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/")
        .with_status(401)
        .create_async()
        .await;

    let client = SuggestionClient::new(server.url(), Some("bad".into()));
    let err = client.suggest("Frieren").await.unwrap_err();
    assert!(matches!(err, SuggestionError::Http(401)));
}

#[tokio::test]
async fn test_unexpected_body() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"{"answer": "Try Mushishi"}"#)
        .create_async()
        .await;

    let client = SuggestionClient::new(server.url(), None);
    let err = client.suggest("Frieren").await.unwrap_err();
    assert!(matches!(err, SuggestionError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_empty_title_and_missing_endpoint() {
    let client = SuggestionClient::new("", None);
    assert!(matches!(
        client.suggest("  ").await.unwrap_err(),
        SuggestionError::EmptyTitle
    ));
    assert!(matches!(
        client.suggest("Frieren").await.unwrap_err(),
        SuggestionError::NotConfigured
    ));
}
