// tests/store_supabase.rs
//
// PostgREST wire contract of the Supabase backend, checked against a mock server.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use market_digest::event::{build_event, ImpactLevel};
use market_digest::ingest::types::RawItem;
use market_digest::market::CalendarFilter;
use market_digest::store::supabase::SupabaseStore;
use market_digest::store::{EventFilter, EventStore, MarketStore};
use market_digest::summarize::SummaryResult;

fn store(server: &MockServer) -> SupabaseStore {
    SupabaseStore::new(&server.uri(), "service-key", Duration::from_secs(5)).unwrap()
}

fn sample_event() -> market_digest::event::Event {
    let item = RawItem {
        source: "markets".into(),
        title: "Treasury yields climb".into(),
        link: "https://a/7".into(),
        published_at: None,
        description: "10-year at 4.3%".into(),
    };
    build_event(
        &item,
        SummaryResult::truncated("10-year at 4.3%", "none"),
        chrono::Utc::now(),
    )
}

fn event_row(id: &str, ts: &str) -> Value {
    json!({
        "id": id,
        "title": format!("title {id}"),
        "summary": "s",
        "impact_level": "High",
        "affected_sectors": ["Energy"],
        "sources": [{ "url": "https://a/1", "name": "markets", "ts": ts }],
        "reasoning": "Auto-summarized by none",
        "model_used": "none",
        "provenance": { "source_count": 1 },
        "timestamp": ts
    })
}

#[tokio::test]
async fn upsert_posts_merge_on_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/events"))
        .and(query_param("on_conflict", "id"))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let e = sample_event();
    store(&server).upsert(&e).await.unwrap();

    let reqs = server.received_requests().await.unwrap();
    assert_eq!(reqs.len(), 1);
    let prefer = reqs[0]
        .headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(prefer.contains("resolution=merge-duplicates"));

    let body: Value = serde_json::from_slice(&reqs[0].body).unwrap();
    assert_eq!(body[0]["id"], e.id.as_str());
    assert_eq!(body[0]["model_used"], "none");
    assert_eq!(body[0]["sources"][0]["url"], "https://a/7");
}

#[tokio::test]
async fn upsert_rejection_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"message\":\"Invalid API key\"}"))
        .mount(&server)
        .await;

    let err = store(&server).upsert(&sample_event()).await.unwrap_err();
    assert!(format!("{err:#}").contains("401"));
}

#[tokio::test]
async fn query_maps_filter_to_postgrest_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/events"))
        .and(query_param("impact_level", "eq.High"))
        .and(query_param("affected_sectors", "cs.{\"Energy\"}"))
        .and(query_param("order", "timestamp.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            event_row("evt-b", "2025-10-24T14:00:00Z"),
            event_row("evt-a", "2025-10-24T10:00:00Z"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let got = store(&server)
        .query(&EventFilter {
            impact_level: Some(ImpactLevel::High),
            sector: Some("Energy".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<_> = got.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["evt-b", "evt-a"]);
    assert_eq!(got[0].sources[0].name, "markets");
}

#[tokio::test]
async fn query_tolerates_rows_in_older_shapes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            event_row("evt-new", "2025-10-24T14:00:00Z"),
            {
                "id": "evt-old",
                "title": "Legacy row",
                "summary": "written before sources had names",
                "sources": [{ "url": "https://a/0", "ts": "Fri, 24 Oct 2025 09:00:00 GMT" }],
                "reasoning": null,
                "model_used": null,
                "provenance": null,
                "timestamp": "2025-10-24T09:00:00+00:00"
            },
            {
                "id": "evt-001",
                "title": "Fed Signals Rate Cut",
                "summary": "demo",
                "sentiment": "bullish",
                "impact_level": "High",
                "sources": [{ "name": "Bloomberg", "url": "https://bloomberg.com", "ts": "2025-10-23T10:30:00Z" }],
                "model_used": "GPT-4 Turbo",
                "provenance": { "weights": { "Bloomberg": 0.4 } },
                "timestamp": "2025-10-23T12:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    let got = store(&server).query(&EventFilter::default()).await.unwrap();
    let ids: Vec<_> = got.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["evt-new", "evt-old", "evt-001"]);
    assert_eq!(got[1].sources[0].name, "");
    assert_eq!(got[1].model_used, "");
    assert_eq!(got[2].provenance.source_count, 0);
}

#[tokio::test]
async fn query_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(store(&server)
        .query(&EventFilter::default())
        .await
        .is_err());
}

#[tokio::test]
async fn stock_and_calendar_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/stocks"))
        .and(query_param("ticker", "eq.AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "ticker": "AAPL", "name": "Apple Inc.", "price": 178.45, "changePercent": 1.33 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/stocks"))
        .and(query_param("ticker", "eq.ZZZZ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/calendar_events"))
        .and(query_param("country", "eq.US"))
        .and(query_param("order", "date.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "cal-001", "date": "2025-10-28", "country": "US", "event": "GDP Growth Rate QoQ", "importance": "High" }
        ])))
        .mount(&server)
        .await;

    let s = store(&server);
    let aapl = s.stock("aapl").await.unwrap().unwrap();
    assert_eq!(aapl.change_percent, 1.33);
    assert!(s.stock("zzzz").await.unwrap().is_none());

    let cal = s
        .calendar(&CalendarFilter {
            country: Some("US".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(cal.len(), 1);
    assert_eq!(cal[0].importance, ImpactLevel::High);
}
