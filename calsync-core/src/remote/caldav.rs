//! CalDAV client built on reqwest.
//!
//! Speaks the small subset of CalDAV the engine needs: a calendar-query
//! REPORT to list ETags, a calendar-multiget REPORT to download objects,
//! PUT to upload and a conditional DELETE.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, ETAG, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use tracing::{debug, info};

use super::multistatus::{
    MultistatusEntry, if_match_value, parse_etag_listing, parse_multistatus, strip_etag,
};
use super::request::{calendar_multiget, calendar_query_etags};
use super::{CreatedObject, DeleteOutcome, FetchOutcome, Remote, RemoteObject, RemoteSnapshot};
use crate::config::Config;
use crate::error::{CalSyncError, CalSyncResult};

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Credentials handed to the client by whoever acquired them.
#[derive(Clone, Default)]
pub enum Credentials {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::None => write!(f, "None"),
            Credentials::Basic { username, .. } => write!(f, "Basic({username}, ***)"),
            Credentials::Bearer(_) => write!(f, "Bearer(***)"),
        }
    }
}

/// Status, ETag header and body of one exchange.
struct DavResponse {
    status: StatusCode,
    etag: Option<String>,
    body: String,
}

pub struct CalDavClient {
    http: reqwest::Client,
    report: Method,
    server_url: String,
    collection_path: String,
    credentials: Credentials,
    debug_raw: bool,
    etag_poll_attempts: u32,
    etag_poll_interval: Duration,
}

impl CalDavClient {
    pub fn new(config: &Config, credentials: Credentials) -> CalSyncResult<Self> {
        Self::with_builder(config, credentials, reqwest::Client::builder())
    }

    fn with_builder(
        config: &Config,
        credentials: Credentials,
        builder: reqwest::ClientBuilder,
    ) -> CalSyncResult<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.custom_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                CalSyncError::Config(format!("Invalid custom header name '{}': {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                CalSyncError::Config(format!("Invalid value for custom header '{}': {}", name, e))
            })?;
            default_headers.insert(name, value);
        }

        let http = builder
            .timeout(config.general.request_timeout)
            .danger_accept_invalid_certs(config.general.insecure_ssl)
            .default_headers(default_headers)
            .build()?;

        let report = Method::from_bytes(b"REPORT")
            .map_err(|e| CalSyncError::Config(format!("Invalid HTTP method: {}", e)))?;

        Ok(CalDavClient {
            http,
            report,
            server_url: config.server_url(),
            collection_path: config.general.path.clone(),
            credentials,
            debug_raw: config.general.debug_raw,
            etag_poll_attempts: config.general.etag_poll_attempts,
            etag_poll_interval: config.general.etag_poll_interval,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}{}", self.server_url, self.collection_path)
    }

    fn object_url(&self, href: &str) -> String {
        format!("{}{}", self.server_url, href)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, String)],
        content_type: &str,
        body: Option<String>,
    ) -> CalSyncResult<DavResponse> {
        let mut builder = self
            .http
            .request(method.clone(), url)
            .header(CONTENT_TYPE, content_type);

        for (name, value) in headers {
            builder = builder.header(*name, value.as_str());
        }

        builder = match &self.credentials {
            Credentials::None => builder,
            Credentials::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
            Credentials::Bearer(token) => builder.bearer_auth(token),
        };

        if let Some(body) = body {
            builder = builder.body(body);
        }

        let request = builder.build()?;

        debug!("> {} {}", method, url);
        debug!("> Headers: {:?}", self.sanitized(request.headers()));
        if let Some(body) = request.body().and_then(|b| b.as_bytes()) {
            debug!("> {}", String::from_utf8_lossy(body));
        }

        let response = self.http.execute(request).await?;
        let status = response.status();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(strip_etag)
            .filter(|e| !e.is_empty());
        let body = response.text().await?;

        debug!(
            "< Status: {} ({})",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        );
        if !body.is_empty() {
            debug!("< {}", body);
        }

        Ok(DavResponse { status, etag, body })
    }

    fn sanitized(&self, headers: &HeaderMap) -> Vec<(String, String)> {
        headers
            .iter()
            .filter(|(name, _)| self.debug_raw || *name != AUTHORIZATION)
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }

    fn ensure_success(&self, response: &DavResponse, url: &str) -> CalSyncResult<()> {
        if response.status.is_success() {
            return Ok(());
        }
        Err(CalSyncError::HttpStatus {
            status: response.status.as_u16(),
            reason: response
                .status
                .canonical_reason()
                .unwrap_or("unknown")
                .to_string(),
            url: url.to_string(),
        })
    }

    /// Look up the ETag of a single object with a multiget REPORT.
    async fn lookup_etag(&self, href: &str) -> CalSyncResult<Option<String>> {
        let url = self.collection_url();
        let body = calendar_multiget([href], false);
        let response = self
            .send(self.report.clone(), &url, &[], XML_CONTENT_TYPE, Some(body))
            .await?;
        self.ensure_success(&response, &url)?;

        if response.body.trim().is_empty() {
            return Ok(None);
        }

        let etag = parse_multistatus(&response.body, false)?
            .into_iter()
            .find_map(|entry| match entry {
                MultistatusEntry::Found { etag, .. } => Some(etag),
                MultistatusEntry::NotFound { .. } => None,
            });
        Ok(etag)
    }
}

impl Remote for CalDavClient {
    async fn list_etags(&self) -> CalSyncResult<RemoteSnapshot> {
        let url = self.collection_url();
        info!("Listing objects in {}...", url);

        let response = self
            .send(
                self.report.clone(),
                &url,
                &[("Depth", "1".to_string())],
                XML_CONTENT_TYPE,
                Some(calendar_query_etags()),
            )
            .await?;
        self.ensure_success(&response, &url)?;

        if response.body.trim().is_empty() {
            return Ok(RemoteSnapshot::new());
        }

        parse_etag_listing(&response.body)
    }

    async fn fetch(&self, hrefs: &BTreeSet<String>) -> CalSyncResult<FetchOutcome> {
        let mut outcome = FetchOutcome::default();
        if hrefs.is_empty() {
            return Ok(outcome);
        }

        let url = self.collection_url();
        let body = calendar_multiget(hrefs.iter().map(String::as_str), true);
        let response = self
            .send(self.report.clone(), &url, &[], XML_CONTENT_TYPE, Some(body))
            .await?;
        self.ensure_success(&response, &url)?;

        for entry in parse_multistatus(&response.body, true)? {
            match entry {
                MultistatusEntry::Found { href, etag, data } => {
                    outcome.objects.push(RemoteObject {
                        href,
                        etag,
                        data: data.unwrap_or_default(),
                    });
                }
                MultistatusEntry::NotFound { href } => outcome.not_found.push(href),
            }
        }

        Ok(outcome)
    }

    async fn create(&self, hash: &str, data: &str) -> CalSyncResult<CreatedObject> {
        let url = self.object_url(&format!("{}{}.ics", self.collection_path, hash));
        let response = self
            .send(
                Method::PUT,
                &url,
                &[],
                CALENDAR_CONTENT_TYPE,
                Some(data.to_string()),
            )
            .await?;
        self.ensure_success(&response, &url)?;

        // Record the href the way the server lists it: percent-encoded.
        let href = url::Url::parse(&url)
            .map(|u| u.path().to_string())
            .map_err(|e| CalSyncError::Config(format!("Invalid object URL {}: {}", url, e)))?;

        let etag = match response.etag {
            Some(etag) => etag,
            None => {
                let href_ref = href.as_str();
                poll_etag(
                    href_ref,
                    self.etag_poll_attempts,
                    self.etag_poll_interval,
                    move || self.lookup_etag(href_ref),
                )
                .await?
            }
        };

        Ok(CreatedObject { href, etag })
    }

    async fn delete(&self, href: &str, etag: &str) -> CalSyncResult<DeleteOutcome> {
        let url = self.object_url(href);
        let response = self
            .send(
                Method::DELETE,
                &url,
                &[("If-Match", if_match_value(etag))],
                XML_CONTENT_TYPE,
                None,
            )
            .await?;

        match response.status {
            StatusCode::PRECONDITION_FAILED => Ok(DeleteOutcome::PreconditionFailed),
            StatusCode::NOT_FOUND => {
                debug!("{} was already deleted on the server", href);
                Ok(DeleteOutcome::Deleted)
            }
            _ => {
                self.ensure_success(&response, &url)?;
                Ok(DeleteOutcome::Deleted)
            }
        }
    }
}

/// Ask `lookup` for the ETag of `href` until it reports one, at most
/// `attempts` times with `interval` between tries.
///
/// Some servers answer a PUT without an ETag header and only expose the
/// tag once the object becomes visible to REPORT queries.
pub async fn poll_etag<F, Fut>(
    href: &str,
    attempts: u32,
    interval: Duration,
    mut lookup: F,
) -> CalSyncResult<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CalSyncResult<Option<String>>>,
{
    for attempt in 1..=attempts {
        if let Some(etag) = lookup().await? {
            return Ok(etag);
        }

        debug!("No ETag for {} yet (attempt {}/{})", href, attempt, attempts);

        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    Err(CalSyncError::EtagTimeout {
        href: href.to_string(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// One request as the stub server saw it.
    #[derive(Debug)]
    struct SeenRequest {
        method: String,
        path: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl SeenRequest {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Canned answer for one request.
    struct Reply {
        status: &'static str,
        headers: Vec<(&'static str, &'static str)>,
        body: String,
    }

    fn reply(status: &'static str) -> Reply {
        Reply {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    impl Reply {
        fn header(mut self, name: &'static str, value: &'static str) -> Self {
            self.headers.push((name, value));
            self
        }

        fn body(mut self, body: &str) -> Self {
            self.body = body.to_string();
            self
        }
    }

    /// Serves `replies` in order, one connection each, on a local port.
    async fn serve(replies: Vec<Reply>) -> (SocketAddr, Arc<Mutex<Vec<SeenRequest>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = seen.clone();
        tokio::spawn(async move {
            for reply in replies {
                let (stream, _) = listener.accept().await.unwrap();
                let mut reader = BufReader::new(stream);

                let mut request_line = String::new();
                reader.read_line(&mut request_line).await.unwrap();
                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or_default().to_string();
                let path = parts.next().unwrap_or_default().to_string();

                let mut headers = Vec::new();
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).await.unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        headers.push((name.trim().to_string(), value.trim().to_string()));
                    }
                }

                let length = headers
                    .iter()
                    .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.parse::<usize>().ok())
                    .unwrap_or(0);
                let mut body = vec![0; length];
                reader.read_exact(&mut body).await.unwrap();

                log.lock().unwrap().push(SeenRequest {
                    method,
                    path,
                    headers,
                    body: String::from_utf8(body).unwrap(),
                });

                let mut response = format!("HTTP/1.1 {}\r\n", reply.status);
                for (name, value) in &reply.headers {
                    response.push_str(&format!("{}: {}\r\n", name, value));
                }
                response.push_str(&format!(
                    "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    reply.body.len(),
                    reply.body
                ));

                let mut stream = reader.into_inner();
                stream.write_all(response.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;
            }
        });

        (addr, seen)
    }

    fn stub_client(addr: SocketAddr, extra: &str, credentials: Credentials) -> CalDavClient {
        let toml = format!(
            "[general]\nhostname = \"{addr}\"\npath = \"cal\"\nhttps = false\n\
             etag_poll_attempts = 3\netag_poll_interval = \"1ms\"\n{extra}"
        );
        let config = Config::from_toml_str(&toml, &Default::default()).unwrap();
        CalDavClient::with_builder(&config, credentials, reqwest::Client::builder().no_proxy())
            .unwrap()
    }

    const LISTING: &str = r#"<?xml version="1.0"?>
<multistatus xmlns="DAV:">
  <response><href>/cal/a.ics</href><propstat><prop><getetag>"e1"</getetag></prop></propstat></response>
  <response><href>/cal/b.ics</href><propstat><prop><getetag>W/"e2"</getetag></prop></propstat></response>
</multistatus>"#;

    const MULTIGET: &str = r#"<?xml version="1.0"?>
<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <response>
    <href>/cal/a.ics</href>
    <propstat><prop><getetag>"e1"</getetag><C:calendar-data>BEGIN:VCALENDAR
END:VCALENDAR</C:calendar-data></prop></propstat>
  </response>
  <response><href>/cal/gone.ics</href><status>HTTP/1.1 404 Not Found</status></response>
</multistatus>"#;

    #[tokio::test]
    async fn test_list_etags_sends_report_with_depth_and_headers() {
        let (addr, seen) = serve(vec![reply("207 Multi-Status").body(LISTING)]).await;
        let client = stub_client(
            addr,
            "[custom_headers]\nX-Client = \"calsync\"\n",
            Credentials::Basic {
                username: "alice".into(),
                password: "secret".into(),
            },
        );

        let snapshot = client.list_etags().await.unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["/cal/a.ics"], "e1");
        assert_eq!(snapshot["/cal/b.ics"], "W/\"e2\"");

        let seen = seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.method, "REPORT");
        assert_eq!(request.path, "/cal/");
        assert_eq!(request.header("Depth"), Some("1"));
        assert_eq!(request.header("X-Client"), Some("calsync"));
        assert_eq!(request.header("Authorization"), Some("Basic YWxpY2U6c2VjcmV0"));
        assert!(request.body.contains("calendar-query"), "{}", request.body);
    }

    #[tokio::test]
    async fn test_list_etags_empty_body_is_empty_collection() {
        let (addr, _seen) = serve(vec![reply("207 Multi-Status")]).await;
        let client = stub_client(addr, "", Credentials::None);

        assert!(client.list_etags().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_splits_found_and_not_found() {
        let (addr, seen) = serve(vec![reply("207 Multi-Status").body(MULTIGET)]).await;
        let client = stub_client(addr, "", Credentials::Bearer("tok".into()));

        let hrefs: BTreeSet<String> = ["/cal/a.ics".to_string(), "/cal/gone.ics".to_string()]
            .into_iter()
            .collect();
        let outcome = client.fetch(&hrefs).await.unwrap();

        assert_eq!(outcome.objects.len(), 1);
        assert_eq!(outcome.objects[0].etag, "e1");
        assert!(outcome.objects[0].data.starts_with("BEGIN:VCALENDAR"));
        assert_eq!(outcome.not_found, vec!["/cal/gone.ics".to_string()]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].header("Authorization"), Some("Bearer tok"));
        assert!(seen[0].body.contains("<D:href>/cal/gone.ics</D:href>"), "{}", seen[0].body);
    }

    #[tokio::test]
    async fn test_create_uses_etag_header() {
        let (addr, seen) = serve(vec![reply("201 Created").header("ETag", "\"new1\"")]).await;
        let client = stub_client(addr, "", Credentials::None);

        let created = client.create("abc123", "BEGIN:VCALENDAR\n").await.unwrap();

        assert_eq!(created.href, "/cal/abc123.ics");
        assert_eq!(created.etag, "new1");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "PUT");
        assert_eq!(seen[0].path, "/cal/abc123.ics");
        assert_eq!(seen[0].body, "BEGIN:VCALENDAR\n");
        assert!(seen[0].header("Content-Type").unwrap().starts_with("text/calendar"));
    }

    #[tokio::test]
    async fn test_create_without_etag_polls_until_listed() {
        let listed = r#"<multistatus xmlns="DAV:"><response><href>/cal/abc123.ics</href><propstat><prop><getetag>"late"</getetag></prop></propstat></response></multistatus>"#;
        let (addr, seen) = serve(vec![
            reply("201 Created"),
            reply("207 Multi-Status"),
            reply("207 Multi-Status").body(listed),
        ])
        .await;
        let client = stub_client(addr, "", Credentials::None);

        let created = client.create("abc123", "BEGIN:VCALENDAR\n").await.unwrap();

        assert_eq!(created.etag, "late");
        let seen = seen.lock().unwrap();
        let methods: Vec<&str> = seen.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(methods, vec!["PUT", "REPORT", "REPORT"]);
        assert!(seen[1].body.contains("/cal/abc123.ics"));
    }

    #[tokio::test]
    async fn test_create_without_etag_times_out() {
        let (addr, _seen) = serve(vec![
            reply("204 No Content"),
            reply("207 Multi-Status"),
            reply("207 Multi-Status"),
            reply("207 Multi-Status"),
        ])
        .await;
        let client = stub_client(addr, "", Credentials::None);

        let err = client.create("abc123", "BEGIN:VCALENDAR\n").await.unwrap_err();

        assert!(matches!(err, CalSyncError::EtagTimeout { attempts: 3, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_delete_sends_quoted_if_match() {
        let (addr, seen) = serve(vec![reply("204 No Content")]).await;
        let client = stub_client(addr, "", Credentials::None);

        let outcome = client.delete("/cal/a.ics", "e1").await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, "DELETE");
        assert_eq!(seen[0].path, "/cal/a.ics");
        assert_eq!(seen[0].header("If-Match"), Some("\"e1\""));
    }

    #[tokio::test]
    async fn test_delete_sends_weak_etag_unchanged() {
        let (addr, seen) = serve(vec![reply("204 No Content")]).await;
        let client = stub_client(addr, "", Credentials::None);

        client.delete("/cal/b.ics", "W/\"e2\"").await.unwrap();

        assert_eq!(seen.lock().unwrap()[0].header("If-Match"), Some("W/\"e2\""));
    }

    #[tokio::test]
    async fn test_delete_precondition_failed_is_conflict() {
        let (addr, _seen) = serve(vec![reply("412 Precondition Failed")]).await;
        let client = stub_client(addr, "", Credentials::None);

        let outcome = client.delete("/cal/a.ics", "e1").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::PreconditionFailed);
    }

    #[tokio::test]
    async fn test_delete_not_found_counts_as_deleted() {
        let (addr, _seen) = serve(vec![reply("404 Not Found")]).await;
        let client = stub_client(addr, "", Credentials::None);

        let outcome = client.delete("/cal/a.ics", "e1").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
    }

    #[tokio::test]
    async fn test_server_error_is_http_status() {
        let (addr, _seen) = serve(vec![reply("500 Internal Server Error")]).await;
        let client = stub_client(addr, "", Credentials::None);

        let err = client.delete("/cal/a.ics", "e1").await.unwrap_err();

        match err {
            CalSyncError::HttpStatus { status, reason, url } => {
                assert_eq!(status, 500);
                assert_eq!(reason, "Internal Server Error");
                assert!(url.ends_with("/cal/a.ics"), "{url}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_listing_is_http_status() {
        let (addr, _seen) = serve(vec![reply("403 Forbidden")]).await;
        let client = stub_client(addr, "", Credentials::None);

        let err = client.list_etags().await.unwrap_err();
        assert!(matches!(err, CalSyncError::HttpStatus { status: 403, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_poll_etag_returns_once_visible() {
        let calls = Cell::new(0);

        let etag = poll_etag("/cal/a.ics", 5, Duration::ZERO, || {
            calls.set(calls.get() + 1);
            let seen = calls.get();
            async move { Ok((seen >= 3).then(|| "e1".to_string())) }
        })
        .await
        .unwrap();

        assert_eq!(etag, "e1");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_poll_etag_gives_up_after_attempts() {
        let calls = Cell::new(0);

        let err = poll_etag("/cal/a.ics", 4, Duration::ZERO, || {
            calls.set(calls.get() + 1);
            async { Ok(None) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, CalSyncError::EtagTimeout { attempts: 4, .. }));
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn test_poll_etag_propagates_lookup_errors() {
        let err = poll_etag("/cal/a.ics", 3, Duration::ZERO, || async {
            Err(CalSyncError::HttpStatus {
                status: 500,
                reason: "Internal Server Error".into(),
                url: "https://dav.example.com/cal/".into(),
            })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, CalSyncError::HttpStatus { status: 500, .. }));
    }

    #[test]
    fn test_client_urls() {
        let config = Config::from_toml_str(
            "[general]\nhostname = \"dav.example.com\"\npath = \"cal\"\n",
            &Default::default(),
        )
        .unwrap();
        let client = CalDavClient::new(&config, Credentials::None).unwrap();

        assert_eq!(client.collection_url(), "https://dav.example.com/cal/");
        assert_eq!(
            client.object_url("/cal/abc.ics"),
            "https://dav.example.com/cal/abc.ics"
        );
    }

    #[test]
    fn test_authorization_is_sanitized() {
        let config = Config::from_toml_str(
            "[general]\nhostname = \"dav.example.com\"\npath = \"cal\"\n",
            &Default::default(),
        )
        .unwrap();
        let client = CalDavClient::new(&config, Credentials::None).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic c2VjcmV0"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE));

        let logged = client.sanitized(&headers);
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].0, "content-type");
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = Credentials::Basic {
            username: "alice".into(),
            password: "hunter2".into(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("alice"));
        assert!(!printed.contains("hunter2"));
    }
}
