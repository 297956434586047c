//! GitHub Actions repository variables as a variable store
//!
//! Uses the REST endpoints under
//! `/repos/{owner}/{repo}/actions/variables`. Requests are blocking and run
//! on tokio's blocking pool, one at a time, each bounded by the configured
//! timeout.

use crate::config::schema::GithubConfig;
use crate::error::{CacheError, CacheResult};
use crate::store::{CreateOutcome, VariableStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

/// Largest page size the variables API accepts
const PAGE_SIZE: usize = 30;

#[derive(Debug, Serialize)]
struct VariableBody<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct Variable {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct VariablePage {
    total_count: usize,
    variables: Vec<Variable>,
}

/// URL and credentials shared by every request
#[derive(Debug, Clone)]
struct Endpoint {
    variables_url: String,
    token: String,
    api_version: String,
}

impl Endpoint {
    fn variable_url(&self, name: &str) -> String {
        format!("{}/{}", self.variables_url, name)
    }

    fn page_url(&self, page: usize) -> String {
        format!("{}?per_page={}&page={}", self.variables_url, PAGE_SIZE, page)
    }

    fn authorize<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        request
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", self.api_version.as_str())
    }
}

/// Repository variables of one GitHub repository
pub struct GithubVariables {
    agent: Agent,
    endpoint: Endpoint,
}

impl GithubVariables {
    pub fn new(config: &GithubConfig, token: impl Into<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            endpoint: Endpoint {
                variables_url: variables_url(config),
                token: token.into(),
                api_version: config.api_version.clone(),
            },
        }
    }

    /// Run a blocking request on the blocking pool
    async fn request<T, F>(&self, operation: &'static str, call: F) -> CacheResult<T>
    where
        F: FnOnce(&Agent, &Endpoint) -> CacheResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();

        tokio::task::spawn_blocking(move || call(&agent, &endpoint))
            .await
            .map_err(|e| CacheError::Internal(format!("{} request task failed: {}", operation, e)))?
    }
}

/// Collection URL for the configured repository
pub fn variables_url(config: &GithubConfig) -> String {
    format!(
        "{}/repos/{}/{}/actions/variables",
        config.api_url.trim_end_matches('/'),
        config.owner,
        config.repo
    )
}

fn read_body(operation: &str, response: &mut Response<Body>) -> CacheResult<String> {
    response
        .body_mut()
        .read_to_string()
        .map_err(|e| CacheError::remote(operation, e))
}

fn unexpected(operation: &str, mut response: Response<Body>) -> CacheError {
    let status = response.status();
    let body = read_body(operation, &mut response).unwrap_or_default();
    CacheError::remote(operation, format!("HTTP {}: {}", status, body.trim()))
}

fn parse_variable(body: &str) -> CacheResult<String> {
    let variable: Variable = serde_json::from_str(body)?;
    Ok(variable.value)
}

fn parse_page(body: &str) -> CacheResult<VariablePage> {
    Ok(serde_json::from_str(body)?)
}

#[async_trait]
impl VariableStore for GithubVariables {
    async fn get(&self, name: &str) -> CacheResult<Option<String>> {
        let name = name.to_string();
        self.request("get", move |agent, endpoint| {
            let mut response = endpoint
                .authorize(agent.get(&endpoint.variable_url(&name)))
                .call()
                .map_err(|e| CacheError::remote("get", e))?;

            if !response.status().is_success() {
                debug!("GET {} returned {}", name, response.status());
                return Ok(None);
            }

            let body = read_body("get", &mut response)?;
            parse_variable(&body).map(Some)
        })
        .await
    }

    async fn create(&self, name: &str, value: &str) -> CacheResult<CreateOutcome> {
        let body = serde_json::to_string(&VariableBody { name, value })?;
        self.request("create", move |agent, endpoint| {
            let response = endpoint
                .authorize(agent.post(&endpoint.variables_url))
                .header("Content-Type", "application/json")
                .send(body.as_str())
                .map_err(|e| CacheError::remote("create", e))?;

            match response.status().as_u16() {
                409 => Ok(CreateOutcome::AlreadyExists),
                _ if response.status().is_success() => Ok(CreateOutcome::Created),
                _ => Err(unexpected("create", response)),
            }
        })
        .await
    }

    async fn update(&self, name: &str, value: &str) -> CacheResult<()> {
        let url_name = name.to_string();
        let body = serde_json::to_string(&VariableBody { name, value })?;
        self.request("update", move |agent, endpoint| {
            let response = endpoint
                .authorize(agent.patch(&endpoint.variable_url(&url_name)))
                .header("Content-Type", "application/json")
                .send(body.as_str())
                .map_err(|e| CacheError::remote("update", e))?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(unexpected("update", response))
            }
        })
        .await
    }

    async fn list(&self) -> CacheResult<Vec<String>> {
        self.request("list", |agent, endpoint| {
            let mut names = Vec::new();
            let mut page = 1;

            loop {
                let mut response = endpoint
                    .authorize(agent.get(&endpoint.page_url(page)))
                    .call()
                    .map_err(|e| CacheError::remote("list", e))?;

                if !response.status().is_success() {
                    return Err(unexpected("list", response));
                }

                let parsed = parse_page(&read_body("list", &mut response)?)?;
                let fetched = parsed.variables.len();
                names.extend(parsed.variables.into_iter().map(|v| v.name));

                if fetched < PAGE_SIZE || names.len() >= parsed.total_count {
                    break;
                }
                page += 1;
            }

            debug!("Listed {} repository variables", names.len());
            Ok(names)
        })
        .await
    }

    async fn delete(&self, name: &str) -> CacheResult<()> {
        let name = name.to_string();
        self.request("delete", move |agent, endpoint| {
            let response = endpoint
                .authorize(agent.delete(&endpoint.variable_url(&name)))
                .call()
                .map_err(|e| CacheError::remote("delete", e))?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(unexpected("delete", response))
            }
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "github"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// Requests seen by a [`serve`] stub, as `METHOD /path?query` plus body
    type Seen = Arc<Mutex<Vec<(String, String)>>>;

    /// Answer one connection per canned `(status, body)` response, in order.
    ///
    /// Every response closes its connection so each request arrives on a
    /// fresh accept.
    fn serve(responses: Vec<(u16, String)>) -> (GithubConfig, Seen) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Seen = Arc::default();
        let log = Arc::clone(&seen);

        thread::spawn(move || {
            for (status, body) in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut content_length = 0;
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    if header.trim().is_empty() {
                        break;
                    }
                    if let Some((name, value)) = header.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().unwrap();
                        }
                    }
                }
                let mut request_body = vec![0; content_length];
                reader.read_exact(&mut request_body).unwrap();

                let target = request_line
                    .split_whitespace()
                    .take(2)
                    .collect::<Vec<_>>()
                    .join(" ");
                log.lock()
                    .unwrap()
                    .push((target, String::from_utf8(request_body).unwrap()));

                let mut stream = reader.into_inner();
                write!(
                    stream,
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                )
                .unwrap();
                stream.flush().unwrap();
            }
        });

        let config = GithubConfig {
            api_url: format!("http://{}", addr),
            owner: "cbl".to_string(),
            repo: "ci".to_string(),
            ..GithubConfig::default()
        };
        (config, seen)
    }

    fn page(names: impl Iterator<Item = String>, total_count: usize) -> String {
        let variables: Vec<_> = names
            .map(|name| serde_json::json!({"name": name, "value": "{}"}))
            .collect();
        serde_json::json!({"total_count": total_count, "variables": variables}).to_string()
    }

    fn requests(seen: &Seen) -> Vec<(String, String)> {
        seen.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn get_returns_value_on_success() {
        let (config, seen) = serve(vec![(
            200,
            r#"{"name":"_A","value":"{\"build_status\":\"pass\"}"}"#.to_string(),
        )]);
        let vars = GithubVariables::new(&config, "token");

        let value = vars.get("_A").await.unwrap();

        assert_eq!(value.as_deref(), Some(r#"{"build_status":"pass"}"#));
        assert_eq!(
            requests(&seen)[0].0,
            "GET /repos/cbl/ci/actions/variables/_A"
        );
    }

    #[tokio::test]
    async fn non_success_get_is_absent() {
        let (config, _) = serve(vec![
            (404, r#"{"message":"Not Found"}"#.to_string()),
            (500, r#"{"message":"Server Error"}"#.to_string()),
        ]);
        let vars = GithubVariables::new(&config, "token");

        assert_eq!(vars.get("_A").await.unwrap(), None);
        assert_eq!(vars.get("_A").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreachable_server_is_remote_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let config = GithubConfig {
            api_url: format!("http://{}", addr),
            ..GithubConfig::default()
        };

        let err = GithubVariables::new(&config, "token")
            .get("_A")
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::RemoteStore { .. }));
    }

    #[tokio::test]
    async fn create_reports_conflict_as_existing() {
        let (config, seen) = serve(vec![
            (201, "{}".to_string()),
            (409, r#"{"message":"Already exists"}"#.to_string()),
        ]);
        let vars = GithubVariables::new(&config, "token");

        assert_eq!(vars.create("_A", "{}").await.unwrap(), CreateOutcome::Created);
        assert_eq!(
            vars.create("_A", "{}").await.unwrap(),
            CreateOutcome::AlreadyExists
        );

        let seen = requests(&seen);
        assert_eq!(seen[0].0, "POST /repos/cbl/ci/actions/variables");
        assert_eq!(seen[0].1, r#"{"name":"_A","value":"{}"}"#);
    }

    #[tokio::test]
    async fn create_fails_on_other_errors() {
        let (config, _) = serve(vec![(403, r#"{"message":"Forbidden"}"#.to_string())]);
        let err = GithubVariables::new(&config, "token")
            .create("_A", "{}")
            .await
            .unwrap_err();

        match err {
            CacheError::RemoteStore { operation, reason } => {
                assert_eq!(operation, "create");
                assert!(reason.contains("403"));
                assert!(reason.contains("Forbidden"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn conflicting_create_falls_back_to_patch() {
        let (config, seen) = serve(vec![
            (404, "{}".to_string()),
            (409, "{}".to_string()),
            (204, String::new()),
        ]);
        let store = crate::store::CacheStore::new(Box::new(GithubVariables::new(&config, "token")));
        let key = crate::cache::CacheKey::from_workflow_name("mainline (clang-19)");
        let fingerprint = crate::cache::Fingerprint {
            linux_sha: "be59bee58790f9d137cfc11973e856e4f8ab3888".to_string(),
            clang_version: "clang version 19.1.7".to_string(),
            patches_hash: "e3b0c442".to_string(),
        };

        let decision = crate::cache::decide(&store, &key, &fingerprint).await.unwrap();

        assert_eq!(
            decision,
            crate::cache::Decision::Miss(crate::cache::MissReason::NoEntry)
        );
        let seen = requests(&seen);
        let targets: Vec<_> = seen.iter().map(|(target, _)| target.as_str()).collect();
        assert_eq!(
            targets,
            [
                "GET /repos/cbl/ci/actions/variables/_MAINLINECLANG19",
                "POST /repos/cbl/ci/actions/variables",
                "PATCH /repos/cbl/ci/actions/variables/_MAINLINECLANG19",
            ]
        );
        assert!(seen[2].1.contains(r#"\"build_status\":\"presuite\""#));
    }

    #[tokio::test]
    async fn update_and_delete_fail_on_non_success() {
        let (config, seen) = serve(vec![
            (204, String::new()),
            (422, r#"{"message":"Invalid"}"#.to_string()),
            (204, String::new()),
            (404, r#"{"message":"Not Found"}"#.to_string()),
        ]);
        let vars = GithubVariables::new(&config, "token");

        vars.update("_A", "1").await.unwrap();
        let err = vars.update("_A", "1").await.unwrap_err();
        assert!(matches!(err, CacheError::RemoteStore { ref operation, .. } if operation == "update"));

        vars.delete("_A").await.unwrap();
        let err = vars.delete("_A").await.unwrap_err();
        assert!(matches!(err, CacheError::RemoteStore { ref operation, .. } if operation == "delete"));

        let seen = requests(&seen);
        assert_eq!(seen[0].0, "PATCH /repos/cbl/ci/actions/variables/_A");
        assert_eq!(seen[0].1, r#"{"name":"_A","value":"1"}"#);
        assert_eq!(seen[2].0, "DELETE /repos/cbl/ci/actions/variables/_A");
    }

    #[tokio::test]
    async fn list_follows_pages_until_total_count() {
        let (config, seen) = serve(vec![
            (200, page((0..30).map(|i| format!("_V{i}")), 31)),
            (200, page(std::iter::once("_LAST".to_string()), 31)),
        ]);
        let vars = GithubVariables::new(&config, "token");

        let names = vars.list().await.unwrap();

        assert_eq!(names.len(), 31);
        assert_eq!(names[0], "_V0");
        assert_eq!(names[30], "_LAST");
        let targets: Vec<_> = requests(&seen).into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            targets,
            [
                "GET /repos/cbl/ci/actions/variables?per_page=30&page=1",
                "GET /repos/cbl/ci/actions/variables?per_page=30&page=2",
            ]
        );
    }

    #[tokio::test]
    async fn list_stops_on_full_final_page() {
        let (config, seen) = serve(vec![(200, page((0..30).map(|i| format!("_V{i}")), 30))]);
        let vars = GithubVariables::new(&config, "token");

        assert_eq!(vars.list().await.unwrap().len(), 30);
        assert_eq!(requests(&seen).len(), 1);
    }

    #[tokio::test]
    async fn purge_deletes_listed_cache_keys() {
        let (config, seen) = serve(vec![
            (
                200,
                page(
                    ["_MAINLINECLANG19", "LLVM_TOT_VERSION", "_NEXTCLANG20"]
                        .into_iter()
                        .map(str::to_string),
                    3,
                ),
            ),
            (204, String::new()),
            (204, String::new()),
        ]);
        let store = crate::store::CacheStore::new(Box::new(GithubVariables::new(&config, "token")));

        let purged = store.purge().await.unwrap();

        assert_eq!(purged, ["_MAINLINECLANG19", "_NEXTCLANG20"]);
        let targets: Vec<_> = requests(&seen).into_iter().map(|(t, _)| t).collect();
        assert_eq!(targets[1], "DELETE /repos/cbl/ci/actions/variables/_MAINLINECLANG19");
        assert_eq!(targets[2], "DELETE /repos/cbl/ci/actions/variables/_NEXTCLANG20");
    }

    #[test]
    fn builds_variable_urls() {
        let config = GithubConfig::default();
        let vars = GithubVariables::new(&config, "token");

        assert_eq!(
            vars.endpoint.variables_url,
            "https://api.github.com/repos/ClangBuiltLinux/continuous-integration2/actions/variables"
        );
        assert!(vars
            .endpoint
            .variable_url("_MAINLINECLANG19")
            .ends_with("/actions/variables/_MAINLINECLANG19"));
        assert!(vars.endpoint.page_url(2).ends_with("?per_page=30&page=2"));
    }

    #[test]
    fn trailing_slash_in_api_url_is_ignored() {
        let config = GithubConfig {
            api_url: "https://ghe.example.com/api/v3/".to_string(),
            ..GithubConfig::default()
        };
        assert!(variables_url(&config).starts_with("https://ghe.example.com/api/v3/repos/"));
    }

    #[test]
    fn parses_variable_value() {
        let body = r#"{"name":"_X","value":"{\"build_status\":\"pass\"}","created_at":"2024-01-01T00:00:00Z"}"#;
        assert_eq!(parse_variable(body).unwrap(), r#"{"build_status":"pass"}"#);
    }

    #[test]
    fn parses_variable_page() {
        let body = r#"{"total_count":2,"variables":[{"name":"_A","value":"1"},{"name":"B","value":"2"}]}"#;
        let page = parse_page(body).unwrap();
        assert_eq!(page.total_count, 2);
        let names: Vec<_> = page.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["_A", "B"]);
    }

    #[test]
    fn variable_body_shape() {
        let body = serde_json::to_string(&VariableBody {
            name: "_A",
            value: "{}",
        })
        .unwrap();
        assert_eq!(body, r#"{"name":"_A","value":"{}"}"#);
    }
}
