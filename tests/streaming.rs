use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use strike::app::{self, Location};
use strike::notes::{NoteStore, UnavailableSource};
use strike::stream::{TransportEvent, DOCTYPE, HTML_CONTENT_TYPE, PAYLOAD_CONTENT_TYPE};
use strike::{
    from_payload, h, island, props, render, to_html, to_payload, BufferedTransport, Handler,
    RenderMode, RenderOptions, StreamState, StrikeError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn small_tree() -> strike::Result<strike::Node> {
    h!(
        "html",
        h!("body", island("Counter", props! { "start" => 1 }, vec!["1".into()]))
    )
}

/// Extract the payload pushed by the payload script. The script pushes a
/// string literal holding the JSON text, so it is decoded twice.
fn pushed_json(body: &str) -> serde_json::Value {
    let open = "<script>self.__rsc=self.__rsc||[];__rsc.push(";
    let start = body.find(open).expect("push script present") + open.len();
    let end = body[start..].rfind(")</script>").expect("push script closed") + start;
    let text: String =
        serde_json::from_str(&body[start..end]).expect("pushed value is a string literal");
    serde_json::from_str(&text).expect("pushed text is JSON")
}

// ============================================================================
// Full-page mode
// ============================================================================

#[tokio::test]
async fn full_page_writes_html_flushes_then_pushes() {
    let mut transport = BufferedTransport::new();
    let report = render(
        small_tree,
        RenderMode::FullPage,
        &mut transport,
        &RenderOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(
        report.states,
        vec![
            StreamState::ShellStarted,
            StreamState::BodyFlushed,
            StreamState::PayloadPushed,
            StreamState::Done,
        ]
    );

    let html = to_html(&small_tree().unwrap()).unwrap();
    let events = transport.events();
    assert_eq!(events[0], TransportEvent::Start(HTML_CONTENT_TYPE));
    assert_eq!(events[1], TransportEvent::Write(DOCTYPE.to_string()));
    assert_eq!(events[2], TransportEvent::Write(html));
    assert_eq!(events[3], TransportEvent::Flush, "flush must precede the push");
    match &events[4] {
        TransportEvent::Write(script) => assert!(script.starts_with("<script>")),
        other => panic!("expected push script, got {other:?}"),
    }
    assert_eq!(events.len(), 5);
    assert_eq!(report.bytes_written, transport.body().len());
}

#[tokio::test]
async fn pushed_payload_matches_the_tree() {
    let mut transport = BufferedTransport::new();
    render(
        small_tree,
        RenderMode::FullPage,
        &mut transport,
        &RenderOptions::default(),
    )
    .await
    .unwrap();

    let body = transport.body();
    assert!(
        body.contains(r#"__rsc.push("{\"$strike\":\"element\""#),
        "payload is pushed as JSON text"
    );
    let pushed = pushed_json(&body);
    assert_eq!(pushed, to_payload(&small_tree().unwrap()).unwrap());
    assert_eq!(from_payload(&pushed).unwrap(), small_tree().unwrap());
}

#[tokio::test]
async fn unflushable_transport_skips_body_flushed() {
    let mut transport = BufferedTransport::unflushable();
    let report = render(
        small_tree,
        RenderMode::FullPage,
        &mut transport,
        &RenderOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(
        report.states,
        vec![
            StreamState::ShellStarted,
            StreamState::PayloadPushed,
            StreamState::Done,
        ]
    );
    assert!(!transport.events().contains(&TransportEvent::Flush));
}

#[tokio::test]
async fn flush_delay_is_applied_after_flush() {
    let opts = RenderOptions {
        flush_delay: Duration::from_millis(50),
        ..Default::default()
    };
    let started = Instant::now();
    let mut transport = BufferedTransport::new();
    render(small_tree, RenderMode::FullPage, &mut transport, &opts)
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn script_breakout_in_text_is_neutralised() {
    let tree = || h!("p", "</script><script>alert(1)</script>");
    let mut transport = BufferedTransport::new();
    render(tree, RenderMode::FullPage, &mut transport, &RenderOptions::default())
        .await
        .unwrap();

    let body = transport.body();
    assert_eq!(body.matches("</script>").count(), 1, "only the push script closes");
    assert_eq!(
        pushed_json(&body)["children"][0],
        "</script><script>alert(1)</script>"
    );
}

// ============================================================================
// Payload-only mode
// ============================================================================

#[tokio::test]
async fn payload_only_writes_json_and_no_html() {
    let mut transport = BufferedTransport::new();
    let report = render(
        small_tree,
        RenderMode::PayloadOnly,
        &mut transport,
        &RenderOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.states, vec![StreamState::Done]);
    assert_eq!(transport.content_type(), Some(PAYLOAD_CONTENT_TYPE));
    let body = transport.body();
    assert!(!body.contains(DOCTYPE));
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value, to_payload(&small_tree().unwrap()).unwrap());
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn construction_failure_writes_nothing() {
    let mut transport = BufferedTransport::new();
    let err = render(
        || h!(""),
        RenderMode::FullPage,
        &mut transport,
        &RenderOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, StrikeError::Construction(_)));
    assert!(transport.events().is_empty());
}

#[tokio::test]
async fn late_payload_failure_keeps_flushed_shell() {
    // Map attributes are skipped in HTML off-island, so only the payload
    // sees the handler.
    let tree = || {
        h!(
            "div",
            props! { "meta" => props! { "cb" => Handler::new("cb", || {}) } },
            "shell"
        )
    };
    let mut transport = BufferedTransport::new();
    let err = render(tree, RenderMode::FullPage, &mut transport, &RenderOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, StrikeError::Serialization(_)));
    let body = transport.body();
    assert_eq!(body, format!("{DOCTYPE}<div>shell</div>"));
    assert_eq!(transport.events().last(), Some(&TransportEvent::Flush));
}

#[tokio::test]
async fn lookup_failure_aborts_before_output() {
    let notes = UnavailableSource("database offline".into());
    let location = Location::new("/", "");
    let mut transport = BufferedTransport::new();
    let err = render(
        || app::page(&location, &notes),
        RenderMode::FullPage,
        &mut transport,
        &RenderOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, StrikeError::Lookup(_)));
    assert!(transport.events().is_empty());
}

#[tokio::test]
async fn demo_page_streams_in_both_modes() {
    let notes = NoteStore::seeded();
    let location = Location::new("/", "");

    let mut full = BufferedTransport::new();
    render(
        || app::page(&location, &notes),
        RenderMode::FullPage,
        &mut full,
        &RenderOptions::default(),
    )
    .await
    .unwrap();
    let body = full.body();
    assert!(body.starts_with("<!doctype html><html lang=\"en\">"));
    assert!(body.contains("component-export=\"SidebarNoteContent\""));
    assert!(body.ends_with(")</script>"));

    let mut payload = BufferedTransport::new();
    render(
        || app::page(&location, &notes),
        RenderMode::PayloadOnly,
        &mut payload,
        &RenderOptions::default(),
    )
    .await
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&payload.body()).unwrap();
    assert_eq!(value["tag_type"], "html");
    assert_eq!(pushed_json(&body), value);
}
