//! Gmail message source over the Gmail v1 REST API.
//!
//! Obtaining OAuth2 credentials is outside this crate: the source expects a
//! ready access token, either in the configuration, in the
//! `GMAIL_ACCESS_TOKEN` environment variable or in a token JSON file.

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::config::GmailConfig;
use crate::models::Message;
use crate::sources::{MessageSource, SourceError};
use crate::utils::HttpClient;

/// Environment variable holding an OAuth2 access token
const ACCESS_TOKEN_VAR: &str = "GMAIL_ACCESS_TOKEN";

/// System label Gmail uses for unread messages
const UNREAD_LABEL: &str = "UNREAD";

/// Gmail emits unpadded base64url, but tolerate padding anyway
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Gmail message source
#[derive(Debug, Clone)]
pub struct GmailSource {
    client: HttpClient,
    base_url: String,
    user: String,
}

impl GmailSource {
    /// Build a client from configuration; fails when no access token is found.
    pub fn new(config: &GmailConfig) -> Result<Self, SourceError> {
        let token = resolve_access_token(config)?;
        let client =
            HttpClient::new(Duration::from_secs(config.timeout_secs))?.bearer(token);

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/users/{}/messages", self.base_url, self.user)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<T, SourceError> {
        let text = self.send(request, action).await?;
        serde_json::from_str(&text)
            .map_err(|e| SourceError::Parse(format!("Failed to {}: {}", action, e)))
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<String, SourceError> {
        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to {}: {}", action, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(format!(
                "Gmail returned status {} while trying to {}: {}",
                status,
                action,
                body.trim()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to {}: {}", action, e)))
    }

    /// Ids of all unread messages matching the label, across result pages.
    async fn list_unread_ids(&self, label: &str) -> Result<Vec<String>, SourceError> {
        let query = format!("label:{} is:unread", label);
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&self.messages_url()).query(&[("q", &query)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: ListMessagesResponse =
                self.send_json(request, "list unread messages").await?;
            ids.extend(page.messages.into_iter().map(|m| m.id));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(ids)
    }

    async fn get_message(&self, id: &str) -> Result<Message, SourceError> {
        let url = format!("{}/{}", self.messages_url(), id);
        let request = self.client.get(&url).query(&[("format", "full")]);
        let raw: GmailMessage = self
            .send_json(request, &format!("fetch message {}", id))
            .await?;

        let payload = raw.payload.unwrap_or_default();
        let subject = payload.header("Subject").unwrap_or_default().to_string();
        let body = match html_body(&payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Message {} ({:?}) has no usable HTML body: {}", raw.id, subject, e);
                Vec::new()
            }
        };

        Ok(Message::new(raw.id, subject, body))
    }
}

#[async_trait]
impl MessageSource for GmailSource {
    fn id(&self) -> &str {
        "gmail"
    }

    async fn list_unread(&self, label: &str) -> Result<Vec<Message>, SourceError> {
        let start = Instant::now();
        let ids = self.list_unread_ids(label).await?;
        tracing::debug!("Listed {} unread message ids under {:?}", ids.len(), label);

        let mut messages = Vec::with_capacity(ids.len());
        for id in &ids {
            messages.push(self.get_message(id).await?);
        }

        tracing::info!(
            "{} unread messages found (took {:.0} sec)",
            messages.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(messages)
    }

    async fn batch_clear_unread(&self, ids: &[String]) -> Result<(), SourceError> {
        let url = format!("{}/batchModify", self.messages_url());
        let request = self.client.post(&url).json(&BatchModifyRequest {
            ids,
            remove_label_ids: [UNREAD_LABEL],
        });
        self.send(request, "batch-modify messages").await?;
        Ok(())
    }

    async fn list_labels(&self) -> Result<Vec<String>, SourceError> {
        let url = format!("{}/users/{}/labels", self.base_url, self.user);
        let response: LabelsResponse = self.send_json(self.client.get(&url), "list labels").await?;
        Ok(response.labels.into_iter().map(|l| l.name).collect())
    }
}

/// Pick the access token: configuration first, then environment, then token file.
fn resolve_access_token(config: &GmailConfig) -> Result<String, SourceError> {
    if let Some(token) = config.access_token.as_ref().filter(|t| !t.is_empty()) {
        return Ok(token.clone());
    }
    if let Ok(token) = std::env::var(ACCESS_TOKEN_VAR) {
        if !token.is_empty() {
            return Ok(token);
        }
    }
    if let Some(path) = &config.token_file {
        return read_token_file(path);
    }
    Err(SourceError::Auth(format!(
        "no Gmail access token: set gmail.access_token, gmail.token_file or {}",
        ACCESS_TOKEN_VAR
    )))
}

fn read_token_file(path: &Path) -> Result<String, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SourceError::Auth(format!("cannot read token file {}: {}", path.display(), e))
    })?;
    let token: TokenFile = serde_json::from_str(&content).map_err(|e| {
        SourceError::Auth(format!("invalid token file {}: {}", path.display(), e))
    })?;
    Ok(token.access_token)
}

/// Decoded bytes of the first `text/html` part, searched depth-first.
fn html_body(payload: &MessagePart) -> Result<Vec<u8>, SourceError> {
    let data = find_html_data(payload)
        .ok_or_else(|| SourceError::Parse("no text/html part".to_string()))?;
    BASE64_URL
        .decode(data.trim())
        .map_err(|e| SourceError::Parse(format!("base64: {}", e)))
}

fn find_html_data(part: &MessagePart) -> Option<&str> {
    if part.mime_type.eq_ignore_ascii_case("text/html") {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
            return Some(data);
        }
    }
    part.parts.iter().find_map(find_html_data)
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListMessagesResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailMessage {
    id: String,
    #[serde(default)]
    payload: Option<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<MessagePartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

impl MessagePart {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct MessagePartBody {
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelsResponse {
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Debug, Deserialize)]
struct Label {
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchModifyRequest<'a> {
    ids: &'a [String],
    remove_label_ids: [&'static str; 1],
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn test_config(base_url: &str) -> GmailConfig {
        GmailConfig {
            api_base_url: base_url.to_string(),
            access_token: Some("test-token".to_string()),
            ..GmailConfig::default()
        }
    }

    fn encode(html: &str) -> String {
        BASE64_URL.encode(html)
    }

    #[test]
    fn test_missing_token_is_client_init_error() {
        let config = GmailConfig {
            access_token: None,
            token_file: Some("/nonexistent/token.json".into()),
            ..GmailConfig::default()
        };
        // The token file is consulted only when the env var is unset
        if std::env::var(ACCESS_TOKEN_VAR).is_err() {
            let err = GmailSource::new(&config).unwrap_err();
            assert!(matches!(err, SourceError::Auth(_)));
        }
    }

    #[test]
    fn test_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, r#"{"access_token":"from-file","token_type":"Bearer"}"#).unwrap();

        assert_eq!(read_token_file(&path).unwrap(), "from-file");
    }

    #[test]
    fn test_find_html_in_nested_parts() {
        let payload: MessagePart = serde_json::from_value(json!({
            "mimeType": "multipart/alternative",
            "headers": [{"name": "subject", "value": "New articles"}],
            "parts": [
                {"mimeType": "text/plain", "body": {"data": encode("plain")}},
                {"mimeType": "text/html", "body": {"data": encode("<h3>html</h3>")}}
            ]
        }))
        .unwrap();

        assert_eq!(payload.header("Subject"), Some("New articles"));
        assert_eq!(html_body(&payload).unwrap(), b"<h3>html</h3>");
    }

    #[test]
    fn test_no_html_part() {
        let payload: MessagePart = serde_json::from_value(json!({
            "mimeType": "text/plain",
            "body": {"data": encode("plain only")}
        }))
        .unwrap();

        assert!(html_body(&payload).is_err());
    }

    #[test]
    fn test_padded_base64_accepted() {
        let payload: MessagePart = serde_json::from_value(json!({
            "mimeType": "text/html",
            "body": {"data": "PHA-Pz8-PC9wPg=="}
        }))
        .unwrap();

        assert_eq!(html_body(&payload).unwrap(), b"<p>??></p>");
    }

    #[tokio::test]
    async fn test_list_unread_follows_pages() {
        let mut server = mockito::Server::new_async().await;

        let first = server
            .mock("GET", "/users/me/messages")
            .match_header("authorization", "Bearer test-token")
            .match_query(Matcher::Regex("^q=[^&]*$".to_string()))
            .with_header("content-type", "application/json")
            .with_body(json!({"messages": [{"id": "m1"}], "nextPageToken": "p2"}).to_string())
            .create_async()
            .await;
        let second = server
            .mock("GET", "/users/me/messages")
            .match_query(Matcher::UrlEncoded("pageToken".into(), "p2".into()))
            .with_header("content-type", "application/json")
            .with_body(json!({"messages": [{"id": "m2"}]}).to_string())
            .create_async()
            .await;

        let mut fetches = Vec::new();
        for id in ["m1", "m2"] {
            let mock = server
                .mock("GET", format!("/users/me/messages/{}", id).as_str())
                .match_query(Matcher::UrlEncoded("format".into(), "full".into()))
                .with_header("content-type", "application/json")
                .with_body(
                    json!({
                        "id": id,
                        "payload": {
                            "mimeType": "text/html",
                            "headers": [{"name": "Subject", "value": format!("Subject {}", id)}],
                            "body": {"data": encode(&format!("<p>{}</p>", id))}
                        }
                    })
                    .to_string(),
                )
                .create_async()
                .await;
            fetches.push(mock);
        }

        let source = GmailSource::new(&test_config(&server.url())).unwrap();
        let messages = source.list_unread("alerts").await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "m1");
        assert_eq!(messages[0].subject, "Subject m1");
        assert_eq!(messages[1].body, b"<p>m2</p>");
    }

    #[tokio::test]
    async fn test_message_without_html_gets_empty_body() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/users/me/messages")
            .match_query(Matcher::Any)
            .with_body(json!({"messages": [{"id": "m1"}]}).to_string())
            .create_async()
            .await;
        let _fetch = server
            .mock("GET", "/users/me/messages/m1")
            .match_query(Matcher::Any)
            .with_body(json!({"id": "m1", "payload": {"mimeType": "text/plain"}}).to_string())
            .create_async()
            .await;

        let source = GmailSource::new(&test_config(&server.url())).unwrap();
        let messages = source.list_unread("alerts").await.unwrap();

        assert_eq!(messages.len(), 1);
        assert!(messages[0].body.is_empty());
        assert_eq!(messages[0].subject, "");
    }

    #[tokio::test]
    async fn test_batch_clear_unread_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/users/me/messages/batchModify")
            .match_body(Matcher::Json(json!({
                "ids": ["m1", "m2"],
                "removeLabelIds": ["UNREAD"]
            })))
            .with_status(204)
            .create_async()
            .await;

        let source = GmailSource::new(&test_config(&server.url())).unwrap();
        source
            .batch_clear_unread(&["m1".to_string(), "m2".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _labels = server
            .mock("GET", "/users/me/labels")
            .with_status(401)
            .with_body("invalid credentials")
            .create_async()
            .await;

        let source = GmailSource::new(&test_config(&server.url())).unwrap();
        let err = source.list_labels().await.unwrap_err();

        match err {
            SourceError::Api(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("invalid credentials"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_labels() {
        let mut server = mockito::Server::new_async().await;
        let _labels = server
            .mock("GET", "/users/me/labels")
            .with_header("content-type", "application/json")
            .with_body(
                json!({"labels": [
                    {"id": "INBOX", "name": "INBOX", "type": "system"},
                    {"id": "Label_1", "name": "[-oss-]-_ml-in-se", "type": "user"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let source = GmailSource::new(&test_config(&server.url())).unwrap();
        let labels = source.list_labels().await.unwrap();

        assert_eq!(labels, vec!["INBOX", "[-oss-]-_ml-in-se"]);
    }
}
