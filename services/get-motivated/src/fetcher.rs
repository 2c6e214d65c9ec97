//! Random post fetcher
//!
//! Calls `/r/{subreddit}/random` with a bearer token and opens the first
//! post's URL. The endpoint answers with an array of listings: the post
//! listing first, then its comments. Only `[0].data.children[0].data` is
//! read, so the comment listing's shape does not matter.

use std::future::Future;
use std::pin::Pin;

use reddit_auth::TokenProvider;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::browser::UrlOpener;
use crate::error::{Error, Result};
use crate::poller::PostSource;

/// The fields of a post this program cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub url: String,
    pub title: Option<String>,
}

/// Pull the first post out of a `/random` response body.
pub fn extract_post(body: &Value) -> Result<Post> {
    let post = body
        .pointer("/0/data/children/0/data")
        .ok_or_else(|| Error::Content("response has no post at [0].data.children[0]".into()))?;

    let url = post
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| Error::Content("post has no url".into()))?;

    Ok(Post {
        url: url.to_string(),
        title: post.get("title").and_then(Value::as_str).map(str::to_string),
    })
}

pub struct ContentFetcher<O> {
    tokens: TokenProvider,
    client: reqwest::Client,
    random_url: String,
    opener: O,
}

impl<O: UrlOpener> ContentFetcher<O> {
    pub fn new(
        tokens: TokenProvider,
        client: reqwest::Client,
        api_base: &str,
        subreddit: &str,
        opener: O,
    ) -> Self {
        let random_url = format!("{}/r/{subreddit}/random", api_base.trim_end_matches('/'));
        Self {
            tokens,
            client,
            random_url,
            opener,
        }
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Fetch one random post and open it. Returns the URL that was opened.
    pub async fn fetch_and_open(&self) -> Result<String> {
        let token = self.tokens.get_token().await?;

        let response = self
            .client
            .get(&self.random_url)
            .header(AUTHORIZATION, format!("bearer {token}"))
            .header(USER_AGENT, self.tokens.user_agent())
            .send()
            .await
            .map_err(|e| Error::Content(format!("random post request failed: {e}")))
            .inspect_err(|e| error!(error = %e, "unable to get content"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            let e = Error::Content(format!("random post endpoint returned {status}: {body}"));
            error!(error = %e, "unable to get content");
            return Err(e);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Content(format!("random post response is not JSON: {e}")))
            .inspect_err(|e| error!(error = %e, "unable to get content"))?;

        let post = extract_post(&body).inspect_err(|e| error!(error = %e, "unable to get content"))?;
        debug!(url = %post.url, title = ?post.title, "fetched random post");

        self.opener
            .open(&post.url)
            .inspect_err(|e| error!(error = %e, "unable to open post"))?;
        info!(url = %post.url, title = post.title.as_deref().unwrap_or(""), "post opened in browser");

        Ok(post.url)
    }
}

impl<O: UrlOpener> PostSource for ContentFetcher<O> {
    fn next_post(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(self.fetch_and_open())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::RecordingBrowser;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use reddit_auth::{Credentials, TokenCache, now_millis};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    const POST_BODY: &str = r#"[{"data":{"children":[{"data":{"url":"https://example.com/x"}}]}}]"#;

    #[derive(Default)]
    struct Seen {
        token_calls: usize,
        content_calls: usize,
        authorization: Option<String>,
        user_agent: Option<String>,
    }

    /// Mock Reddit: token endpoint always hands out `T1`; the random endpoint
    /// serves `content` with `status`.
    async fn start_reddit(
        status: StatusCode,
        content: &'static str,
    ) -> (String, Arc<Mutex<Seen>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Seen::default()));
        let token_seen = seen.clone();
        let content_seen = seen.clone();

        let app = axum::Router::new()
            .route(
                "/api/v1/access_token",
                post(move || {
                    let seen = token_seen.clone();
                    async move {
                        seen.lock().unwrap().token_calls += 1;
                        r#"{"access_token":"T1","expires_in":3600}"#
                    }
                }),
            )
            .route(
                "/r/GetMotivated/random",
                get(move |headers: HeaderMap| {
                    let seen = content_seen.clone();
                    async move {
                        let header = |name: &str| {
                            headers
                                .get(name)
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string)
                        };
                        let mut seen = seen.lock().unwrap();
                        seen.content_calls += 1;
                        seen.authorization = header("authorization");
                        seen.user_agent = header("user-agent");
                        (status, content)
                    }
                }),
            );
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        (format!("http://{addr}"), seen)
    }

    fn fetcher(
        base: &str,
        cache_path: &std::path::Path,
        opener: RecordingBrowser,
    ) -> ContentFetcher<RecordingBrowser> {
        let client = reqwest::Client::new();
        let tokens = TokenProvider::new(
            client.clone(),
            format!("{base}/api/v1/access_token"),
            "TestAgent/1.0",
            Credentials::new("avilay", "hunter2", "cid", "csecret"),
            TokenCache::new(cache_path),
        );
        ContentFetcher::new(tokens, client, base, "GetMotivated", opener)
    }

    #[test]
    fn extract_post_reads_first_child() {
        let body: Value = serde_json::from_str(
            r#"[
                {"kind":"Listing","data":{"children":[{"kind":"t3","data":{"url":"https://i.redd.it/a.jpg","title":"Keep going"}}]}},
                {"kind":"Listing","data":{"children":[{"kind":"t1","data":{"body":"nice"}}]}}
            ]"#,
        )
        .unwrap();
        let post = extract_post(&body).unwrap();
        assert_eq!(post.url, "https://i.redd.it/a.jpg");
        assert_eq!(post.title.as_deref(), Some("Keep going"));
    }

    #[test]
    fn extract_post_rejects_malformed_shapes() {
        for raw in [
            "[]",
            "{}",
            r#"[{"data":{"children":[]}}]"#,
            r#"[{"data":{"children":[{"data":{}}]}}]"#,
            r#"[{"data":{"children":[{"data":{"url":""}}]}}]"#,
            r#"[{"data":{"children":[{"data":{"url":42}}]}}]"#,
        ] {
            let body: Value = serde_json::from_str(raw).unwrap();
            let err = extract_post(&body).unwrap_err();
            assert!(matches!(err, Error::Content(_)), "{raw}: got {err:?}");
        }
    }

    #[tokio::test]
    async fn fetches_opens_and_caches_token() {
        let (base, seen) = start_reddit(StatusCode::OK, POST_BODY).await;
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("token.json");
        let fetcher = fetcher(&base, &cache_path, RecordingBrowser::default());

        let before = now_millis();
        let url = fetcher.fetch_and_open().await.unwrap();

        assert_eq!(url, "https://example.com/x");
        assert_eq!(
            *fetcher.opener().opened.lock().unwrap(),
            vec!["https://example.com/x".to_string()]
        );

        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.token_calls, 1);
            assert_eq!(seen.content_calls, 1);
            assert_eq!(seen.authorization.as_deref(), Some("bearer T1"));
            assert_eq!(seen.user_agent.as_deref(), Some("TestAgent/1.0"));
        }

        let cached = TokenCache::new(&cache_path).load().await.unwrap().unwrap();
        assert_eq!(cached.access_token, "T1");
        let expected = before + 3_600_000;
        assert!(
            cached.expires >= expected && cached.expires < expected + 60_000,
            "expires {} not ~now+3600s",
            cached.expires
        );
    }

    #[tokio::test]
    async fn second_fetch_reuses_cached_token() {
        let (base, seen) = start_reddit(StatusCode::OK, POST_BODY).await;
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(
            &base,
            &dir.path().join("token.json"),
            RecordingBrowser::default(),
        );

        fetcher.fetch_and_open().await.unwrap();
        fetcher.fetch_and_open().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.token_calls, 1);
        assert_eq!(seen.content_calls, 2);
    }

    #[tokio::test]
    async fn non_success_status_is_content_error() {
        let (base, _) = start_reddit(StatusCode::SERVICE_UNAVAILABLE, "try later").await;
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(
            &base,
            &dir.path().join("token.json"),
            RecordingBrowser::default(),
        );

        let err = fetcher.fetch_and_open().await.unwrap_err();
        match err {
            Error::Content(msg) => assert!(msg.contains("503"), "got: {msg}"),
            other => panic!("expected Content, got {other:?}"),
        }
        assert!(fetcher.opener().opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_listing_is_content_error() {
        let (base, _) = start_reddit(StatusCode::OK, "[]").await;
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(
            &base,
            &dir.path().join("token.json"),
            RecordingBrowser::default(),
        );

        let err = fetcher.fetch_and_open().await.unwrap_err();
        assert!(matches!(err, Error::Content(_)), "got: {err:?}");
        assert!(fetcher.opener().opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_json_body_is_content_error() {
        let (base, _) = start_reddit(StatusCode::OK, "<html>blocked</html>").await;
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(
            &base,
            &dir.path().join("token.json"),
            RecordingBrowser::default(),
        );

        let err = fetcher.fetch_and_open().await.unwrap_err();
        assert!(matches!(err, Error::Content(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn browser_failure_is_content_error() {
        let (base, _) = start_reddit(StatusCode::OK, POST_BODY).await;
        let dir = tempfile::tempdir().unwrap();
        let opener = RecordingBrowser {
            fail: true,
            ..Default::default()
        };
        let fetcher = fetcher(&base, &dir.path().join("token.json"), opener);

        let err = fetcher.fetch_and_open().await.unwrap_err();
        assert!(matches!(err, Error::Content(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn token_failure_is_auth_error() {
        // Nothing listens here, so the token exchange cannot succeed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(
            &format!("http://{addr}"),
            &dir.path().join("token.json"),
            RecordingBrowser::default(),
        );

        let err = fetcher.fetch_and_open().await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)), "got: {err:?}");
    }

    #[test]
    fn random_url_trims_trailing_slash() {
        let client = reqwest::Client::new();
        let tokens = TokenProvider::new(
            client.clone(),
            "http://127.0.0.1:1/api/v1/access_token",
            "TestAgent/1.0",
            Credentials::new("u", "p", "c", "s"),
            TokenCache::new("/tmp/unused-token.json"),
        );
        let fetcher = ContentFetcher::new(
            tokens,
            client,
            "https://oauth.reddit.com/",
            "GetMotivated",
            RecordingBrowser::default(),
        );
        assert_eq!(
            fetcher.random_url,
            "https://oauth.reddit.com/r/GetMotivated/random"
        );
    }
}
