use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use zip::write::SimpleFileOptions;
use zip_manifest::{HttpOptions, ManifestReader};

const MANIFEST: &str = r#"{"name": "vendor/remote"}"#;

fn options() -> HttpOptions {
    HttpOptions {
        timeout: Duration::from_secs(5),
        max_retry: 1,
    }
}

fn archive() -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("pkg/composer.json", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(MANIFEST.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// Serve `body` over plain HTTP/1.1, one request per connection.
///
/// Range requests are answered with 206 only when `ranges` is set; the HEAD
/// response then advertises `Accept-Ranges: bytes`.
async fn serve(body: Vec<u8>, ranges: bool) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = Arc::new(body);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(respond(stream, body.clone(), ranges));
        }
    });

    format!("http://{addr}/package.zip")
}

async fn respond(mut stream: TcpStream, body: Arc<Vec<u8>>, ranges: bool) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&chunk[..n]),
        }
    }
    let request = String::from_utf8_lossy(&request).into_owned();

    let range = request.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if !name.eq_ignore_ascii_case("range") {
            return None;
        }
        let (start, end) = value.trim().strip_prefix("bytes=")?.split_once('-')?;
        Some((start.parse::<usize>().ok()?, end.parse::<usize>().ok()?))
    });

    let accept_ranges = if ranges { "Accept-Ranges: bytes\r\n" } else { "" };
    let (status, payload, extra) = match range {
        _ if request.starts_with("HEAD") => ("200 OK", &[][..], String::new()),
        Some((start, end)) if ranges && start <= end && end < body.len() => (
            "206 Partial Content",
            &body[start..=end],
            format!("Content-Range: bytes {start}-{end}/{}\r\n", body.len()),
        ),
        _ => ("200 OK", &body[..], String::new()),
    };
    let length = if request.starts_with("HEAD") {
        body.len()
    } else {
        payload.len()
    };

    let head = format!(
        "HTTP/1.1 {status}\r\n{accept_ranges}{extra}Content-Length: {length}\r\nConnection: close\r\n\r\n"
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(payload).await;
    let _ = stream.shutdown().await;
}

#[tokio::test]
async fn reads_manifest_with_range_requests() {
    let url = serve(archive(), true).await;
    let content = ManifestReader::default()
        .with_http_options(options())
        .read_url(&url)
        .await
        .unwrap();
    assert_eq!(content.as_deref(), Some(MANIFEST.as_bytes()));
}

#[tokio::test]
async fn closed_port_is_not_found() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let content = ManifestReader::default()
        .with_http_options(options())
        .read_url(&format!("http://{addr}/package.zip"))
        .await
        .unwrap();
    assert_eq!(content, None);
}

#[tokio::test]
async fn server_without_range_support_is_not_found() {
    let url = serve(archive(), false).await;
    let content = ManifestReader::default()
        .with_http_options(options())
        .read_url(&url)
        .await
        .unwrap();
    assert_eq!(content, None);
}
