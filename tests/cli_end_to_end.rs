use std::io::Write;

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use tempfile::NamedTempFile;

fn page_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write page");
    file
}

fn beacon_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pageview-beacon"));
    cmd.env_remove("PAGEVIEW_CONFIG_FILE").env_remove("RUST_LOG");
    cmd
}

#[test]
fn fire_sends_page_metadata() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/tracking")
            .query_param("title", "Apex Triggers & Bulkification")
            .query_param("referrer", "https://www.google.com/")
            .query_param("bot", "true")
            .query_param("language", "fr-FR")
            .query_param("site", "notes");
        then.status(200).body("{}");
    });

    let page = page_file(
        r#"<html><body><h1 class="post-title">Apex Triggers &amp; Bulkification</h1></body></html>"#,
    );

    beacon_cmd()
        .arg("fire")
        .arg("--page")
        .arg(page.path())
        .args(["--referrer", "https://www.google.com/"])
        .args(["--user-agent", "Mozilla/5.0 (compatible; bingbot/2.0)"])
        .args(["--language", "fr-FR"])
        .args(["--site", "notes"])
        .args(["--endpoint", &server.url("/tracking")])
        .assert()
        .success();

    mock.assert();
}

#[test]
fn fire_succeeds_when_collector_is_down() {
    beacon_cmd()
        .arg("fire")
        .args(["--endpoint", "http://127.0.0.1:9/tracking"])
        .args(["--timeout-seconds", "2"])
        .assert()
        .success();
}

#[test]
fn preview_omits_missing_title() {
    let page = page_file("<html><body><h1>Tag archive</h1></body></html>");

    let assert = beacon_cmd()
        .arg("preview")
        .arg("--page")
        .arg(page.path())
        .args(["--endpoint", "https://collector.example.com/tracking"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.starts_with("https://collector.example.com/tracking?"));
    assert!(!stdout.contains("title="), "{stdout}");
    assert!(stdout.contains("bot=false"));
}

#[test]
fn preview_jsonp_adds_callback() {
    beacon_cmd()
        .arg("preview")
        .args(["--title", "Flows"])
        .args(["--transport", "jsonp"])
        .args(["--endpoint", "https://collector.example.com/tracking"])
        .assert()
        .success()
        .stdout(contains("title=Flows"))
        .stdout(contains("callback=pageview_"));
}

#[test]
fn missing_endpoint_fails_fast() {
    beacon_cmd()
        .arg("preview")
        .env_remove("PAGEVIEW__BEACON__ENDPOINT")
        .assert()
        .failure()
        .stderr(contains("beacon.endpoint"));
}

#[test]
fn unreadable_page_is_reported() {
    beacon_cmd()
        .arg("fire")
        .args(["--page", "/definitely/not/here.html"])
        .args(["--endpoint", "https://collector.example.com/tracking"])
        .assert()
        .failure()
        .stderr(contains("failed to read page"));
}
