//! HTTP record client tests against a local single-purpose server

use city_ingest::config::{PipelineConfig, ServiceConfig};
use city_ingest::{HttpRecordClient, IngestConfig, IngestionCoordinator, RecordClient};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// One request as seen by the server
#[derive(Debug, Clone)]
struct CapturedRequest {
    head: String,
    body: String,
}

/// Minimal HTTP/1.1 responder: one request per connection
///
/// Answers 500 when the body contains `reject_marker`, 200 otherwise.
async fn spawn_server(reject_marker: Option<&'static str>) -> (String, Arc<Mutex<Vec<CapturedRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&captured);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let sink = Arc::clone(&sink);
            tokio::spawn(async move {
                serve(stream, sink, reject_marker).await;
            });
        }
    });

    (format!("http://{}", address), captured)
}

async fn serve(
    mut stream: TcpStream,
    sink: Arc<Mutex<Vec<CapturedRequest>>>,
    reject_marker: Option<&'static str>,
) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let read = stream.read(&mut chunk).await.unwrap();
        if read == 0 {
            return;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(position) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await.unwrap();
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    let body = String::from_utf8_lossy(&buffer[header_end..]).to_string();
    let rejected = reject_marker.is_some_and(|marker| body.contains(marker));
    sink.lock().unwrap().push(CapturedRequest { head, body });

    let (status_line, payload) = if rejected {
        ("HTTP/1.1 500 Internal Server Error", "{\"serverErrorCode\":\"INTERNAL_ERROR\"}")
    } else {
        ("HTTP/1.1 200 OK", "{\"records\":[]}")
    };
    let response = format!(
        "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        payload.len(),
        payload
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn service_config(endpoint: String) -> ServiceConfig {
    ServiceConfig {
        endpoint,
        container: "iCloud.test.cities".to_string(),
        api_token: Some("secret".to_string()),
        request_timeout_secs: 5,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_write_request_reaches_service() {
    let (endpoint, captured) = spawn_server(None).await;
    let client = HttpRecordClient::new(&service_config(endpoint)).unwrap();

    let request = client
        .build_write_request("records/modify", "{\"operations\":[]}".to_string())
        .unwrap();
    let response = client.execute(request).await.unwrap();

    assert_eq!(response.status, 200);
    assert!(response.is_success());

    let requests = captured.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let head = requests[0].head.to_ascii_lowercase();
    assert!(head.starts_with(
        "post /database/1/icloud.test.cities/development/public/records/modify http/1.1"
    ));
    assert!(head.contains("content-type: application/json"));
    assert!(head.contains("connection: close"));
    assert!(head.contains("authorization: bearer secret"));
    assert_eq!(requests[0].body, "{\"operations\":[]}");
}

#[tokio::test]
async fn test_server_error_is_returned_as_response() {
    let (endpoint, _captured) = spawn_server(Some("reject-me")).await;
    let client = HttpRecordClient::new(&service_config(endpoint)).unwrap();

    let request = client
        .build_write_request("records/modify", "reject-me".to_string())
        .unwrap();
    let response = client.execute(request).await.unwrap();

    assert_eq!(response.status, 500);
    assert!(!response.is_success());
    assert!(response.body.contains("INTERNAL_ERROR"));
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpRecordClient::new(&service_config(format!("http://{}", address))).unwrap();
    let request = client
        .build_write_request("records/modify", "{}".to_string())
        .unwrap();

    assert!(client.execute(request).await.is_err());
}

#[tokio::test]
async fn test_pipeline_over_http() {
    let (endpoint, captured) = spawn_server(Some("\"city-4\"")).await;
    let config = IngestConfig::default()
        .with_service(service_config(endpoint))
        .with_pipeline(PipelineConfig::default().with_max_in_flight(4));
    let client = Arc::new(HttpRecordClient::new(&config.service).unwrap());
    let coordinator = IngestionCoordinator::from_config(client, &config);

    let input: String = (0..20)
        .map(|i| format!("US,city-{i},City {i},IL,{},39.8,-89.6\n", 1000 + i))
        .collect();

    let report = coordinator
        .run(std::io::Cursor::new(input), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.rows_dispatched, 20);
    assert_eq!(report.rows_submitted, 19);
    assert_eq!(report.rows_failed, 1);
    assert_eq!(report.rejected, 1);
    assert_eq!(captured.lock().unwrap().len(), 20);
}
