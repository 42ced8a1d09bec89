use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::RefCell;
use url::Url;

use crate::api::error::ApiError;
use crate::api::transport::{HttpRequest, Method, Transport};

/// The one configured HTTP client every component talks through.
///
/// Holds the backend base URL and the bearer credential attached to each
/// request. The credential sits behind a `RefCell`: login and bootstrap set
/// it, logout clears it, and a request reads whatever is current at the moment
/// it is built.
pub struct ApiClient {
    base_url: Url,
    transport: Box<dyn Transport>,
    credential: RefCell<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: Url, transport: Box<dyn Transport>) -> Self {
        Self {
            base_url,
            transport,
            credential: RefCell::new(None),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn set_credential(&self, token: &str) {
        *self.credential.borrow_mut() = Some(token.to_string());
    }

    pub fn clear_credential(&self) {
        self.credential.borrow_mut().take();
    }

    pub fn credential(&self) -> Option<String> {
        self.credential.borrow().clone()
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        self.send(Method::Get, path, &[], query, None)
    }

    pub fn post<B, T>(&self, path: &str, query: &[(&str, &str)], body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
        self.send(Method::Post, path, &[], query, Some(body))
    }

    /// `segments` are appended to `path` one escaped segment each, so ids
    /// containing `/`, `?` or `#` stay a single path segment.
    pub fn delete<T: DeserializeOwned>(&self, path: &str, segments: &[&str]) -> Result<T, ApiError> {
        self.send(Method::Delete, path, segments, &[], None)
    }

    fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let url = self.url(path, segments, query)?;

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(token) = self.credential() {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };

        let resp = self.transport.execute(&request).map_err(|e| {
            warn!("{} {} failed: {e:#}", method.as_str(), path);
            ApiError::Transport(e.to_string())
        })?;

        debug!("{} {} -> {}", method.as_str(), path, resp.status);

        if !resp.is_success() {
            return Err(ApiError::from_status(resp.status, &resp.body));
        }

        // an empty 2xx body (e.g. a DELETE ack) reads as JSON null
        let text = if resp.body.trim().is_empty() {
            "null"
        } else {
            resp.body.as_str()
        };
        serde_json::from_str(text).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    fn url(&self, path: &str, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{path}"))
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))?;
        if !segments.is_empty() {
            // the url crate silently drops "." and ".." segments
            if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
                return Err(ApiError::InvalidUrl(format!("{path}: invalid path segment {bad:?}")));
            }
            url.path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(format!("{path}: base cannot take path segments")))?
                .pop_if_empty()
                .extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().copied());
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::{HttpResponse, MockTransport};

    fn client_with(mock: MockTransport) -> ApiClient {
        ApiClient::new(Url::parse("http://localhost:8001").unwrap(), Box::new(mock))
    }

    #[test]
    fn attaches_bearer_only_when_credential_set() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| r.header("Authorization").is_none())
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "{}")));
        mock.expect_execute()
            .withf(|r| r.header("authorization") == Some("Bearer t1"))
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "{}")));

        let client = client_with(mock);
        let _: Value = client.get("/api/templates", &[]).unwrap();
        client.set_credential("t1");
        let _: Value = client.get("/api/templates", &[]).unwrap();
    }

    #[test]
    fn cleared_credential_is_not_sent() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| r.header("Authorization").is_none())
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "{}")));

        let client = client_with(mock);
        client.set_credential("t1");
        client.clear_credential();
        assert_eq!(client.credential(), None);
        let _: Value = client.get("/api/campaigns", &[]).unwrap();
    }

    #[test]
    fn builds_url_from_base_path_and_query() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| {
                r.url.path() == "/api/emails/inbox" && r.query_param("account_id").as_deref() == Some("acc 1")
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"emails":[]}"#)));

        let client = client_with(mock);
        let _: Value = client.get("/api/emails/inbox", &[("account_id", "acc 1")]).unwrap();
    }

    #[test]
    fn no_query_means_no_question_mark() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| r.url.as_str() == "http://localhost:8001/api/emails/drafts")
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "{}")));

        let client = client_with(mock);
        let _: Value = client.get("/api/emails/drafts", &[]).unwrap();
    }

    #[test]
    fn delete_escapes_id_as_one_segment() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| {
                r.method == Method::Delete
                    && r.url.path() == "/api/emails/drafts/a%2Fb%23c"
                    && r.url.query().is_none()
                    && r.url.fragment().is_none()
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "")));
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/emails/drafts/..%2F..%2Ftemplates")
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "")));

        let client = client_with(mock);
        let _: Value = client.delete("/api/emails/drafts", &["a/b#c"]).unwrap();
        let _: Value = client.delete("/api/emails/drafts", &["../../templates"]).unwrap();
    }

    #[test]
    fn dot_segments_are_refused_before_sending() {
        let mut mock = MockTransport::new();
        mock.expect_execute().never();
        let client = client_with(mock);

        for id in ["..", ".", ""] {
            let err = client.delete::<Value>("/api/emails/drafts", &[id]).unwrap_err();
            assert!(matches!(err, ApiError::InvalidUrl(_)), "{id:?}: {err:?}");
        }
    }

    #[test]
    fn maps_statuses_and_bodies_to_errors() {
        let mut replies = std::collections::VecDeque::from(vec![
            Ok(HttpResponse::new(401, r#"{"detail":"Could not validate credentials"}"#)),
            Ok(HttpResponse::new(200, "<html>")),
            Err(anyhow::anyhow!("connection refused")),
        ]);
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(3)
            .returning(move |_| replies.pop_front().unwrap());

        let client = client_with(mock);
        let e1 = client.get::<Value>("/api/user/profile", &[]).unwrap_err();
        assert_eq!(
            e1,
            ApiError::Unauthorized {
                detail: Some("Could not validate credentials".into())
            }
        );
        let e2 = client.get::<Value>("/api/user/profile", &[]).unwrap_err();
        assert!(matches!(e2, ApiError::Malformed(_)));
        let e3 = client.get::<Value>("/api/user/profile", &[]).unwrap_err();
        assert!(matches!(e3, ApiError::Transport(_)));
    }

    #[test]
    fn empty_success_body_reads_as_null() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| r.method == Method::Delete)
            .times(1)
            .returning(|_| Ok(HttpResponse::new(204, "")));

        let client = client_with(mock);
        let v: Value = client.delete("/api/emails/drafts", &["d1"]).unwrap();
        assert_eq!(v, Value::Null);
    }

    #[test]
    fn post_sends_json_body() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| r.method == Method::Post && r.body == Some(serde_json::json!({"session_id": "abc"})))
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "{}")));

        let client = client_with(mock);
        let _: Value = client
            .post("/api/auth/session", &[], &serde_json::json!({"session_id": "abc"}))
            .unwrap();
    }
}
