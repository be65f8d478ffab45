//! Integration tests for the REST API.

#![allow(clippy::unwrap_used)]

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use tempmail::{AppState, Settings};
use tempmail_core::{Attachment, Database, Message};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const MASTER_KEY: &str = "master-secret";
const INBOX: &str = "box@omailg.com";

struct TestServer {
    base: String,
    client: Client,
    state: AppState,
    db: Database,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    async fn start() -> Self {
        Self::with_settings(Settings {
            master_key: Some(MASTER_KEY.to_string()),
            ..Settings::default()
        })
        .await
    }

    async fn with_settings(settings: Settings) -> Self {
        let db = Database::in_memory().await.unwrap();
        let state = AppState::new(db.clone(), &settings);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        let serving = state.clone();
        tokio::spawn(async move {
            tempmail::serve(listener, serving, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            client: Client::new(),
            state,
            db,
            _shutdown: tx,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(format!("{}{path}", self.base))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(format!("{}{path}", self.base))
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(format!("{}{path}", self.base))
    }

    /// Issue an API key through the master-key route and return its secret.
    async fn api_key(&self) -> String {
        let (status, body) = send(
            self.post("/api-keys")
                .header("x-master-key", MASTER_KEY)
                .json(&json!({ "name": "test" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["result"]["key"].as_str().unwrap().to_string()
    }

    async fn insert(&self, id: &str, to: &str, received_at: i64) {
        self.state
            .messages
            .insert(&Message {
                id: id.to_string(),
                from_address: "sender@example.com".to_string(),
                to_address: to.to_string(),
                subject: Some(format!("Message {id}")),
                received_at,
                expires_at: None,
                html_content: None,
                text_content: Some("hello".to_string()),
                has_attachments: false,
                attachment_count: 0,
            })
            .await
            .unwrap();
    }
}

async fn send(request: RequestBuilder) -> (StatusCode, Value) {
    let response = request.send().await.unwrap();
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

fn item_ids(body: &Value) -> Vec<String> {
    body["result"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_and_domains() {
    let server = TestServer::start().await;

    let (status, body) = send(server.get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["status"], "ok");
    assert_eq!(body["result"]["services"]["database"]["status"], "ok");

    let (status, body) = send(server.get("/domains")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["public"], json!(["omailg.com"]));
    assert_eq!(body["result"]["stats"]["public"], 1);
}

#[tokio::test]
async fn test_unknown_route_uses_envelope() {
    let server = TestServer::start().await;
    let (status, body) = send(server.get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_api_key_is_required() {
    let server = TestServer::start().await;
    let path = format!("/emails/{INBOX}");

    let (status, body) = send(server.get(&path)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(server.get(&path).header("x-api-key", "tm_bogus")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let key = server.api_key().await;
    let (status, body) = send(server.get(&path).header("x-api-key", &key)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["items"], json!([]));
    assert!(body["result"]["nextCursor"].is_null());
}

#[tokio::test]
async fn test_master_key_routes() {
    let server = TestServer::start().await;

    let (status, _) = send(server.get("/api-keys")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(server.get("/api-keys").header("x-master-key", "wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // An empty body is accepted.
    let (status, body) = send(server.post("/api-keys").header("x-master-key", MASTER_KEY)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["result"]["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("ak_"));
    assert!(body["result"]["key"].as_str().unwrap().starts_with("tm_"));

    let (status, body) = send(
        server
            .post("/api-keys")
            .header("x-master-key", MASTER_KEY)
            .json(&json!({ "expires_in_days": 400 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(server.get("/api-keys").header("x-master-key", MASTER_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"].as_array().unwrap().len(), 1);
    assert!(body["result"][0].get("key").is_none());

    let (status, body) = send(
        server
            .post(&format!("/api-keys/{id}/revoke"))
            .header("x-master-key", MASTER_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["is_active"], false);

    let (status, _) = send(
        server
            .delete(&format!("/api-keys/{id}"))
            .header("x-master-key", MASTER_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        server
            .get(&format!("/api-keys/{id}"))
            .header("x-master-key", MASTER_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_master_key_not_configured() {
    let server = TestServer::with_settings(Settings::default()).await;
    let (status, body) = send(server.get("/api-keys").header("x-master-key", "anything")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Master key not configured");
}

#[tokio::test]
async fn test_authenticated_request_records_use() {
    let server = TestServer::start().await;
    let issued = server.state.api_keys.issue(None, None, 0).await.unwrap();
    assert!(issued.api_key.last_used_at.is_none());

    let (status, _) = send(
        server
            .get(&format!("/emails/{INBOX}"))
            .header("x-api-key", &issued.secret),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let stored = server
        .state
        .api_keys
        .get(&issued.api_key.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.last_used_at.is_some());
}

#[tokio::test]
async fn test_revoked_and_expired_keys_are_rejected() {
    let server = TestServer::start().await;
    let path = format!("/emails/{INBOX}");

    let revoked = server.state.api_keys.issue(None, None, 0).await.unwrap();
    server.state.api_keys.revoke(&revoked.api_key.id).await.unwrap();
    let (status, _) = send(server.get(&path).header("x-api-key", &revoked.secret)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let long_ago = tempmail_core::now() - 10 * 24 * 60 * 60;
    let expired = server
        .state
        .api_keys
        .issue(None, Some(1), long_ago)
        .await
        .unwrap();
    let (status, body) = send(server.get(&path).header("x-api-key", &expired.secret)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "API key has expired");
}

#[tokio::test]
async fn test_pagination_follows_cursors() {
    let server = TestServer::start().await;
    let key = server.api_key().await;
    for i in 1..=25 {
        server.insert(&format!("m{i:02}"), INBOX, i).await;
    }

    let path = format!("/emails/{INBOX}");
    let mut cursor: Option<String> = None;
    let mut pages = Vec::new();
    loop {
        let mut request = server
            .get(&path)
            .header("x-api-key", &key)
            .query(&[("limit", "10")]);
        if let Some(cursor) = &cursor {
            request = request.query(&[("cursor", cursor.as_str())]);
        }
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["locked"], false);
        assert_eq!(body["result"]["isPrivate"], false);

        pages.push(item_ids(&body));
        match body["result"]["nextCursor"].as_str() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    let expected = |range: std::ops::RangeInclusive<i64>| -> Vec<String> {
        range.rev().map(|i| format!("m{i:02}")).collect()
    };
    assert_eq!(pages, vec![expected(16..=25), expected(6..=15), expected(1..=5)]);
}

#[tokio::test]
async fn test_default_limit_and_ties() {
    let server = TestServer::start().await;
    let key = server.api_key().await;
    for i in 0..12 {
        server.insert(&format!("t{i:02}"), INBOX, 100).await;
    }

    let (status, body) = send(
        server
            .get(&format!("/emails/{INBOX}"))
            .header("x-api-key", &key),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids = item_ids(&body);
    assert_eq!(ids.len(), 10);
    assert_eq!(ids[0], "t11");
    assert_eq!(ids[9], "t02");
    assert!(body["result"]["nextCursor"].is_string());
}

#[tokio::test]
async fn test_listing_rejects_bad_input() {
    let server = TestServer::start().await;
    let key = server.api_key().await;
    let path = format!("/emails/{INBOX}");

    for query in [
        [("limit", "0")],
        [("limit", "101")],
        [("limit", "ten")],
        [("cursor", "%%%not-a-cursor")],
    ] {
        let (status, body) = send(server.get(&path).header("x-api-key", &key).query(&query)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query:?}");
        assert_eq!(body["success"], false);
    }

    let (status, body) = send(
        server
            .get("/emails/box@example.com")
            .header("x-api-key", &key),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Domain not supported");

    let (status, _) = send(server.get("/emails/not-an-address").header("x-api-key", &key)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lock_gates_reads_and_only_owner_unlocks() {
    let server = TestServer::start().await;
    let owner = server.api_key().await;
    let other = server.api_key().await;
    server.insert("m1", INBOX, 1).await;

    let lock = format!("/inbox/{INBOX}/lock");
    let (status, _) = send(
        server
            .post(&lock)
            .header("x-api-key", &owner)
            .json(&json!({ "password": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        server
            .post(&lock)
            .header("x-api-key", &owner)
            .json(&json!({ "password": "hunter2hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        server
            .get(&format!("/inbox/{INBOX}/status"))
            .header("x-api-key", &other),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!({ "locked": true, "isPrivate": true }));

    let listing = format!("/emails/{INBOX}");
    let (status, _) = send(server.get(&listing).header("x-api-key", &other)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = send(
        server
            .get(&listing)
            .header("x-api-key", &other)
            .header("x-inbox-password", "wrong-password"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid inbox password");
    let (status, body) = send(
        server
            .get(&listing)
            .header("x-api-key", &other)
            .header("x-inbox-password", "hunter2hunter2"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item_ids(&body), vec!["m1"]);
    assert_eq!(body["result"]["locked"], true);

    // Single-message routes resolve the inbox through the message id.
    let (status, _) = send(server.get("/inbox/m1").header("x-api-key", &owner)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(server.delete("/inbox/m1").header("x-api-key", &owner)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unlock = format!("/inbox/{INBOX}/unlock");
    let (status, _) = send(server.post(&unlock).header("x-api-key", &other)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(server.post(&unlock).header("x-api-key", &owner)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(server.post(&unlock).header("x-api-key", &owner)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(server.get("/inbox/m1").header("x-api-key", &other)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["textContent"], "hello");
}

#[tokio::test]
async fn test_relock_transfers_ownership() {
    let server = TestServer::start().await;
    let first = server.api_key().await;
    let second = server.api_key().await;
    let lock = format!("/inbox/{INBOX}/lock");
    let unlock = format!("/inbox/{INBOX}/unlock");

    for key in [&first, &second] {
        let (status, _) = send(
            server
                .post(&lock)
                .header("x-api-key", key)
                .json(&json!({ "password": "password-123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = send(server.post(&unlock).header("x-api-key", &first)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(server.post(&unlock).header("x-api-key", &second)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_lock_routes_reject_unserved_domains() {
    let server = TestServer::start().await;
    let key = server.api_key().await;
    let foreign = "box@example.com";

    let (status, body) = send(
        server
            .post(&format!("/inbox/{foreign}/lock"))
            .header("x-api-key", &key)
            .json(&json!({ "password": "password-123" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Domain not supported");

    for path in [
        format!("/inbox/{foreign}/unlock"),
        format!("/inbox/{foreign}/status"),
    ] {
        let request = if path.ends_with("status") {
            server.get(&path)
        } else {
            server.post(&path)
        };
        let (status, body) = send(request.header("x-api-key", &key)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        assert_eq!(body["error"], "Domain not supported");
    }

    let address = tempmail_core::EmailAddress::parse(foreign).unwrap();
    assert!(server.state.locks.details(&address).await.unwrap().is_none());
}

#[tokio::test]
async fn test_single_message_and_bulk_delete() {
    let server = TestServer::start().await;
    let key = server.api_key().await;
    server.insert("m1", INBOX, 1).await;
    server.insert("m2", INBOX, 2).await;
    server.insert("m3", INBOX, 3).await;

    let (status, _) = send(server.get("/inbox/missing").header("x-api-key", &key)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(server.delete("/inbox/m1").header("x-api-key", &key)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(server.delete("/inbox/m1").header("x-api-key", &key)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        server
            .delete(&format!("/emails/{INBOX}"))
            .header("x-api-key", &key),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["deletedCount"], 2);
}

#[tokio::test]
async fn test_attachment_routes() {
    let server = TestServer::start().await;
    let key = server.api_key().await;
    server.insert("m1", INBOX, 1).await;
    for (id, created_at) in [("a1", 1), ("a2", 2)] {
        server
            .state
            .attachments
            .insert(&Attachment {
                id: id.to_string(),
                email_id: "m1".to_string(),
                filename: format!("{id}.txt"),
                content_type: "text/plain".to_string(),
                size: 5,
                storage_key: format!("m1/{id}"),
                created_at,
            })
            .await
            .unwrap();
    }

    let (status, body) = send(
        server
            .get("/attachments/email/m1")
            .header("x-api-key", &key),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"].as_array().unwrap().len(), 2);
    assert_eq!(body["result"][0]["filename"], "a1.txt");

    let (status, body) = send(server.get("/attachments/a2").header("x-api-key", &key)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["contentType"], "text/plain");

    let (status, _) = send(server.delete("/attachments/a1").header("x-api-key", &key)).await;
    assert_eq!(status, StatusCode::OK);
    let message = server.state.messages.get("m1").await.unwrap().unwrap();
    assert_eq!(message.attachment_count, 1);
    assert!(message.has_attachments);

    let (status, _) = send(server.get("/attachments/a1").header("x-api-key", &key)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        server
            .get("/attachments/email/missing")
            .header("x-api-key", &key),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Attachment routes honour the lock of the owning inbox.
    let (status, _) = send(
        server
            .post(&format!("/inbox/{INBOX}/lock"))
            .header("x-api-key", &key)
            .json(&json!({ "password": "attach-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(server.get("/attachments/a2").header("x-api-key", &key)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(
        server
            .get("/attachments/a2")
            .header("x-api-key", &key)
            .header("x-inbox-password", "attach-pass"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_ingest() {
    let server = TestServer::start().await;
    let key = server.api_key().await;

    let mail = json!({
        "from": "sender@example.com",
        "to": "Box@OMAILG.com",
        "subject": "Welcome",
        "text": "Your code is 123456",
    });
    let (status, _) = send(server.post("/ingest").json(&mail)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        server
            .post("/ingest")
            .header("x-master-key", MASTER_KEY)
            .json(&mail),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"]["toAddress"], INBOX);
    let id = body["result"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        server
            .get(&format!("/emails/{INBOX}"))
            .header("x-api-key", &key),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item_ids(&body), vec![id]);

    let (status, _) = send(
        server
            .post("/ingest")
            .header("x-master-key", MASTER_KEY)
            .json(&json!({ "from": "a@b.com", "to": "box@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_storage_failure_is_not_an_allow() {
    let server = TestServer::start().await;
    let key = server.api_key().await;
    server.db.close().await;

    let (status, body) = send(
        server
            .get(&format!("/emails/{INBOX}"))
            .header("x-api-key", &key),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    let (status, body) = send(server.get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["status"], "degraded");
    assert_eq!(body["result"]["services"]["database"]["status"], "error");
}
