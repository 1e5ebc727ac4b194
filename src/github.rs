use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, LINK};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::error::SyncError;
use crate::members::{Member, parse_members};

const PAGE_SIZE: u32 = 100;
const API_VERSION: &str = "2022-11-28";

#[derive(Debug)]
pub struct GithubClient {
    http: Client,
    token: String,
    base_url: String,
}

impl GithubClient {
    /// Builds a client for `base_url`. Fails with `MissingCredential`
    /// before touching the network when no usable token is given.
    pub fn new(token: Option<&str>, base_url: &str) -> Result<Self, SyncError> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(SyncError::MissingCredential)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(API_VERSION),
        );

        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|source| SyncError::Http {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Lists every member of `org`, following `Link: rel="next"` until the
    /// last page.
    pub async fn list_members(&self, org: &str) -> Result<Vec<Member>, SyncError> {
        let mut next = Some(format!(
            "{}/orgs/{}/members?per_page={PAGE_SIZE}",
            self.base_url, org
        ));
        let mut members = Vec::new();
        let mut page = 0;

        while let Some(url) = next.take() {
            page += 1;
            let response = self.get(&url).await?;
            next = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_next_link);

            let body: Value = response.json().await.map_err(|source| SyncError::Http {
                url: url.clone(),
                source,
            })?;
            let loaded = parse_members(&body)?;
            for (idx, err) in &loaded.rejected {
                tracing::warn!("Skipping member #{} on page {}: {}", idx, page, err);
            }
            tracing::debug!("Fetched {} members from page {}", loaded.members.len(), page);
            members.extend(loaded.members);
        }

        tracing::info!("Fetched {} members of {} over {} page(s)", members.len(), org, page);
        Ok(members)
    }

    /// Looks up the display name on a user's public profile.
    pub async fn fetch_display_name(&self, login: &str) -> Result<Option<String>, SyncError> {
        let url = format!("{}/users/{}", self.base_url, login);
        let profile: UserProfile = self
            .get(&url)
            .await?
            .json()
            .await
            .map_err(|source| SyncError::Http {
                url: url.clone(),
                source,
            })?;

        Ok(profile
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()))
    }

    /// Fills in missing display names one profile at a time. A failed
    /// lookup leaves that member without a name.
    pub async fn fill_display_names(&self, members: &mut [Member]) {
        for member in members.iter_mut().filter(|member| member.name.is_none()) {
            match self.fetch_display_name(&member.login).await {
                Ok(Some(name)) => {
                    tracing::debug!("Resolved display name for '{}': {}", member.login, name);
                    member.name = Some(name);
                }
                Ok(None) => tracing::debug!("'{}' has no display name", member.login),
                Err(err) => tracing::warn!("Profile lookup for '{}' failed: {}", member.login, err),
            }
        }
    }

    async fn get(&self, url: &str) -> Result<Response, SyncError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| SyncError::Http {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("GitHub HTTP error {status} from {url}: {body}");
            return Err(SyncError::RemoteFetchFailed {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }
}

/// Extracts the `rel="next"` target from a `Link` header value.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .map(str::to_string)
    })
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    #[serde(default)]
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves canned GitHub responses on a loopback port and returns its base URL.
    async fn spawn_fake_github() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let link_base = base.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let base = link_base.clone();
                tokio::spawn(async move {
                    let mut request: Vec<u8> = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        let n = socket.read(&mut buf).await.unwrap();
                        if n == 0 {
                            return;
                        }
                        request.extend_from_slice(&buf[..n]);
                    }
                    let request = String::from_utf8_lossy(&request).to_lowercase();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let (status, link, body) = if request.contains("authorization: bearer token") {
                        route(&path, &base)
                    } else {
                        ("401 Unauthorized", None, r#"{"message":"Bad credentials"}"#.to_string())
                    };

                    let mut response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                        body.len()
                    );
                    if let Some(link) = link {
                        response.push_str(&format!("Link: {link}\r\n"));
                    }
                    response.push_str("\r\n");
                    response.push_str(&body);
                    socket.write_all(response.as_bytes()).await.unwrap();
                    let _ = socket.shutdown().await;
                });
            }
        });

        base
    }

    fn route(path: &str, base: &str) -> (&'static str, Option<String>, String) {
        match path {
            "/orgs/acme/members?per_page=100" => (
                "200 OK",
                Some(format!(
                    r#"<{base}/orgs/acme/members?per_page=100&page=2>; rel="next", <{base}/orgs/acme/members?per_page=100&page=2>; rel="last""#
                )),
                r#"[{"login":"jane-doe","id":1},{"login":"octocat","id":2}]"#.to_string(),
            ),
            "/orgs/acme/members?per_page=100&page=2" => (
                "200 OK",
                Some(format!(
                    r#"<{base}/orgs/acme/members?per_page=100>; rel="first""#
                )),
                r#"[{"login":"sam_ops","id":3}]"#.to_string(),
            ),
            "/orgs/broken/members?per_page=100" => (
                "500 Internal Server Error",
                None,
                r#"{"message":"boom"}"#.to_string(),
            ),
            "/users/jane-doe" => (
                "200 OK",
                None,
                r#"{"login":"jane-doe","name":"Jane Doe"}"#.to_string(),
            ),
            "/users/sam_ops" => (
                "200 OK",
                None,
                r#"{"login":"sam_ops","name":null}"#.to_string(),
            ),
            _ => ("404 Not Found", None, r#"{"message":"Not Found"}"#.to_string()),
        }
    }

    #[tokio::test]
    async fn list_members_follows_every_page() {
        let base = spawn_fake_github().await;
        let client = GithubClient::new(Some("token"), &base).unwrap();

        let members = client.list_members("acme").await.unwrap();

        let logins: Vec<&str> = members.iter().map(|m| m.login.as_str()).collect();
        assert_eq!(logins, vec!["jane-doe", "octocat", "sam_ops"]);
    }

    #[tokio::test]
    async fn error_status_is_a_remote_fetch_failure() {
        let base = spawn_fake_github().await;
        let client = GithubClient::new(Some("token"), &base).unwrap();

        match client.list_members("broken").await {
            Err(SyncError::RemoteFetchFailed { url, status }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(url.ends_with("/orgs/broken/members?per_page=100"));
            }
            other => panic!("expected a remote fetch failure, got {other:?}"),
        }

        assert!(matches!(
            client.fetch_display_name("octocat").await,
            Err(SyncError::RemoteFetchFailed { status, .. }) if status == StatusCode::NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn wrong_token_is_rejected() {
        let base = spawn_fake_github().await;
        let client = GithubClient::new(Some("other"), &base).unwrap();

        assert!(matches!(
            client.list_members("acme").await,
            Err(SyncError::RemoteFetchFailed { status, .. }) if status == StatusCode::UNAUTHORIZED
        ));
    }

    #[tokio::test]
    async fn failed_profile_lookup_leaves_name_empty() {
        let base = spawn_fake_github().await;
        let client = GithubClient::new(Some("token"), &base).unwrap();
        let mut members = client.list_members("acme").await.unwrap();

        client.fill_display_names(&mut members).await;

        let names: Vec<Option<&str>> = members.iter().map(|m| m.name.as_deref()).collect();
        assert_eq!(names, vec![Some("Jane Doe"), None, None]);
    }

    #[test]
    fn finds_next_link_among_relations() {
        let header = r#"<https://api.github.com/organizations/1/members?per_page=100&page=2>; rel="next", <https://api.github.com/organizations/1/members?per_page=100&page=5>; rel="last""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.github.com/organizations/1/members?per_page=100&page=2")
        );
    }

    #[test]
    fn last_page_has_no_next_link() {
        let header = r#"<https://api.github.com/x?page=1>; rel="first", <https://api.github.com/x?page=4>; rel="prev""#;
        assert_eq!(parse_next_link(header), None);
        assert_eq!(parse_next_link(""), None);
    }

    #[test]
    fn missing_token_fails_before_building_a_client() {
        assert!(matches!(
            GithubClient::new(None, "https://api.github.com"),
            Err(SyncError::MissingCredential)
        ));
        assert!(matches!(
            GithubClient::new(Some("   "), "https://api.github.com"),
            Err(SyncError::MissingCredential)
        ));
    }

    #[test]
    fn base_url_is_normalized() {
        let client = GithubClient::new(Some("token"), "https://ghe.example.com/api/v3/").unwrap();
        assert_eq!(client.base_url, "https://ghe.example.com/api/v3");
    }
}
