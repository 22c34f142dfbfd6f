//! wiremock stand-in for the splitting service

use super::fixtures::panels_zip;
use figsplit_batch::Config;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Result page the service answers a successful upload with
pub fn result_page(server: &MockServer) -> String {
    format!(
        "<html>\n<body>\n<h2>Split complete</h2>\n\
         <a href=\"{}/out/panels.zip\" download>Download the panels</a>\n\
         </body>\n</html>\n",
        server.uri()
    )
}

/// Start a service where every upload succeeds and the archive holds two panels
pub async fn healthy_service() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/modified_uploader"))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page(&server)))
        .with_priority(10)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/out/panels.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(panels_zip(&[
            ("panel_1.jpg", b"first panel"),
            ("panel_2.jpg", b"second panel"),
        ])))
        .mount(&server)
        .await;
    server
}

/// Make uploads whose body contains `marker` fail with `status`
pub async fn fail_uploads_containing(server: &MockServer, marker: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path("/modified_uploader"))
        .and(body_string_contains(marker))
        .respond_with(ResponseTemplate::new(status))
        .with_priority(1)
        .mount(server)
        .await;
}

/// Make uploads whose body contains `marker` answer 200 with a page lacking a link
pub async fn no_link_for_uploads_containing(server: &MockServer, marker: &str) {
    Mock::given(method("POST"))
        .and(path("/modified_uploader"))
        .and(body_string_contains(marker))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>queue full</html>"))
        .with_priority(1)
        .mount(server)
        .await;
}

/// Number of uploads the service received whose body contains `marker`
pub async fn uploads_containing(server: &MockServer, marker: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method == wiremock::http::Method::POST)
        .filter(|r| String::from_utf8_lossy(&r.body).contains(marker))
        .count()
}

/// Run configuration pointing at `server`
pub fn config_for(root: &Path, server: &MockServer) -> Config {
    let mut config = Config::new(root);
    config.service.endpoint = server.uri();
    config.service.request_timeout = Duration::from_secs(5);
    config.dispatch.chunk_size = 2;
    config.dispatch.worker_count = 2;
    config
}
