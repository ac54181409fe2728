use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::models::{EquipmentRecord, RoomRecord};

use super::error::{Entity, LookupError};
use super::EquipmentLookup;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const EQUIPMENT_EXPAND: &str = "expand=type,room,warehouse,author";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client for the inventory service.
pub struct InventoryClient {
    http: reqwest::Client,
    base_url: RwLock<String>,
}

impl InventoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!("Falling back to default HTTP client: {err}");
                reqwest::Client::new()
            });
        Self {
            http,
            base_url: RwLock::new(base_url.into()),
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_base_url(&self, base_url: impl Into<String>) {
        *self
            .base_url
            .write()
            .unwrap_or_else(PoisonError::into_inner) = base_url.into();
    }

    /// `GET {base}/inventory/equipment/scan/{code}/` with relations expanded.
    pub async fn scan_equipment(&self, code: &str) -> Result<EquipmentRecord, LookupError> {
        let mut url = self.endpoint(&["inventory", "equipment", "scan", code])?;
        url.set_query(Some(EQUIPMENT_EXPAND));
        self.get_json(url, Entity::Equipment).await
    }

    /// `GET {base}/university/rooms/scan/{uid}/`.
    pub async fn scan_room(&self, uid: &str) -> Result<RoomRecord, LookupError> {
        let url = self.endpoint(&["university", "rooms", "scan", uid])?;
        self.get_json(url, Entity::Room).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, LookupError> {
        let base = self.base_url();
        let mut url = Url::parse(base.trim())
            .map_err(|err| LookupError::InvalidBaseUrl(format!("{base}: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| LookupError::InvalidBaseUrl(base.clone()))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        entity: Entity,
    ) -> Result<T, LookupError> {
        debug!("GET {url}");
        let response = self
            .http
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(entity));
        }

        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
                message: error_message(&bytes, status),
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl EquipmentLookup for InventoryClient {
    async fn scan_equipment(&self, code: &str) -> Result<EquipmentRecord, LookupError> {
        InventoryClient::scan_equipment(self, code).await
    }
}

/// Pull `detail` or `error.message` out of an error body, else the reason phrase.
fn error_message(body: &[u8], status: StatusCode) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    };
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return fallback();
    };
    value
        .get("detail")
        .and_then(|d| d.as_str())
        .or_else(|| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
        })
        .map(str::to_string)
        .unwrap_or_else(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned response; resolves to the request line it received.
    async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            let text = String::from_utf8_lossy(&request).to_string();
            text.lines().next().unwrap_or_default().to_string()
        });

        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn scan_equipment_hits_expanded_endpoint() {
        let (base, server) =
            serve_once("200 OK", r#"{"name": "Projector", "inn": 7, "status": "new"}"#).await;
        let client = InventoryClient::new(base);

        let record = client.scan_equipment("INV-0042").await.unwrap();
        assert_eq!(record.name.as_deref(), Some("Projector"));
        assert_eq!(record.inventory_number.as_deref(), Some("7"));

        let request_line = server.await.unwrap();
        assert_eq!(
            request_line,
            "GET /inventory/equipment/scan/INV-0042/?expand=type,room,warehouse,author HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn specs_arrive_in_service_order() {
        let (base, _server) =
            serve_once("200 OK", r#"{"specs": {"ram": 16, "cpu": "i7", "ports": 4}}"#).await;
        let record = InventoryClient::new(base)
            .scan_equipment("INV-0042")
            .await
            .unwrap();

        let keys: Vec<&str> = record.specs.keys().map(String::as_str).collect();
        assert_eq!(keys, ["ram", "cpu", "ports"]);

        let card = crate::card::EquipmentCard::from_record(&record);
        let names: Vec<&str> = card.specs.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, ["ram", "cpu", "ports"]);
    }

    #[tokio::test]
    async fn path_segments_are_encoded() {
        let (base, server) = serve_once("200 OK", "{}").await;
        let client = InventoryClient::new(format!("{base}/api/"));

        client.scan_equipment("a/b c").await.unwrap();

        let request_line = server.await.unwrap();
        assert!(
            request_line.starts_with("GET /api/inventory/equipment/scan/a%2Fb%20c/?"),
            "{request_line}"
        );
    }

    #[tokio::test]
    async fn not_found_is_distinguished_from_server_errors() {
        let (base, _server) = serve_once("404 Not Found", r#"{"detail": "Not found."}"#).await;
        let err = InventoryClient::new(base)
            .scan_equipment("INV-0042")
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::NotFound(Entity::Equipment)));

        let (base, _server) =
            serve_once("500 Internal Server Error", r#"{"detail": "database down"}"#).await;
        let err = InventoryClient::new(base)
            .scan_equipment("INV-0042")
            .await
            .unwrap_err();
        match err {
            LookupError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "database down");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let (base, _server) = serve_once("200 OK", "<html>").await;
        let err = InventoryClient::new(base)
            .scan_equipment("X")
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Decode(_)));
    }

    #[tokio::test]
    async fn scan_room_reads_room_record() {
        let (base, server) =
            serve_once("200 OK", r#"{"uid": "r-1", "number": "204", "floor": 2}"#).await;
        let room = InventoryClient::new(base).scan_room("r-1").await.unwrap();
        assert_eq!(room.number.as_deref(), Some("204"));
        assert_eq!(
            server.await.unwrap(),
            "GET /university/rooms/scan/r-1/ HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = InventoryClient::new(format!("http://{addr}"))
            .scan_equipment("X")
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Transport(_)));
    }

    #[test]
    fn base_url_is_swappable() {
        let client = InventoryClient::new(DEFAULT_BASE_URL);
        client.set_base_url("https://inventory.example.org");
        assert_eq!(client.base_url(), "https://inventory.example.org");

        client.set_base_url("not a url");
        assert!(matches!(
            client.endpoint(&["x"]),
            Err(LookupError::InvalidBaseUrl(_))
        ));
    }
}
