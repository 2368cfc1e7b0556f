use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use penghuni_api::models::Occupancy;
use penghuni_server::app::build_router;
use penghuni_server::services::BusEvent;
use penghuni_server::tests::{RecordingBus, create_test_context};
use serde_json::Value;
use tokio::sync::mpsc::Sender;
use tower::ServiceExt;

pub struct MockApp {
    pub router: Router,
    pub bus: Arc<RecordingBus>,
    pub sender: Sender<BusEvent>,
}

impl MockApp {
    /// App over a recording bus that has already reported a broker connection.
    pub async fn new() -> Self {
        let (context, bus, sender) = create_test_context();
        let router = build_router(&context);

        let app = Self {
            router,
            bus,
            sender,
        };

        app.sender.send(BusEvent::Connected).await.unwrap();
        app.wait_for(|status| status["mqtt_connected"] == Value::Bool(true)).await;

        app
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri).method(method);

        let body = match body {
            Some(value) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_string(&value).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::POST, uri, None).await
    }

    /// Plays the broker delivering `payload` on `topic`.
    pub async fn publish(&self, topic: &str, payload: &str) {
        self.sender
            .send(BusEvent::Message {
                topic: topic.to_string(),
                payload: payload.as_bytes().to_vec(),
            })
            .await
            .unwrap();
    }

    /// Reports presence and waits until the house has applied it.
    pub async fn presence(&self, room: &str, present: bool) -> Occupancy {
        self.publish(&format!("smarthome/deteksi/{}", room), if present { "1" } else { "0" })
            .await;

        let canonical = if room == "jemuran" { "ruang_cuci" } else { room };
        let bit = if present { 1 } else { 0 };
        let status = self
            .wait_for(|status| status["presence"][canonical] == Value::from(bit))
            .await;

        serde_json::from_value(status["status"].clone()).unwrap()
    }

    /// Polls `/api/status` until `check` holds.
    pub async fn wait_for(&self, check: impl Fn(&Value) -> bool) -> Value {
        for _ in 0..100 {
            let (_, status) = self.get("/api/status").await;
            if check(&status) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("House never reached the expected state");
    }

    /// Waits until `topic` has seen `count` publishes and returns them.
    pub async fn published_to(&self, topic: &str, count: usize) -> Vec<String> {
        for _ in 0..100 {
            let payloads = self.bus.published_to(topic);
            if payloads.len() >= count {
                return payloads;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Expected {} publishes on {}", count, topic);
    }

    /// Polls `/api/logs` until an entry with `details` shows up and returns the log.
    pub async fn wait_for_log(&self, details: &str) -> Vec<Value> {
        for _ in 0..100 {
            let (_, body) = self.get("/api/logs").await;
            let logs = body.as_array().cloned().unwrap_or_default();
            if logs.iter().any(|log| log["details"] == Value::from(details)) {
                return logs;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("No log entry reading {:?}", details);
    }
}
