// tests/ingest_normalize.rs
use post_snapshot_mailer::ingest::normalize::{normalize, NormalizeError, ID};
use post_snapshot_mailer::ingest::types::{PublishedAt, RawItem, NO_TEXT};
use serde_json::{json, Value};

fn raw(v: Value) -> RawItem {
    v.as_object().cloned().unwrap()
}

#[test]
fn id_and_full_text_scenario() {
    let p = normalize(&raw(json!({"id": "42", "full_text": "hello"})), "acme").unwrap();
    assert_eq!(p.id, "42");
    assert_eq!(p.text, "hello");
    assert_eq!(p.reference_url, "https://x.com/acme/status/42");
    assert_eq!(p.published_at, PublishedAt::Unparsed);
    assert_eq!(p.metrics.likes, 0);
}

#[test]
fn every_id_synonym_is_accepted() {
    for key in ID.keys {
        let mut item = RawItem::new();
        item.insert(key.to_string(), json!("77"));
        let p = normalize(&item, "acme").unwrap_or_else(|_| panic!("{key} should be an id"));
        assert_eq!(p.reference_url, "https://x.com/acme/status/77");
    }
}

#[test]
fn first_synonym_wins() {
    let p = normalize(&raw(json!({"statusId": "2", "id": "1"})), "acme").unwrap();
    assert_eq!(p.id, "1");
}

#[test]
fn missing_identifier_is_rejected() {
    let items = [
        json!({}),
        json!({"text": "hi", "url": "https://x.com/acme/status/5"}),
        json!({"id": null, "id_str": ""}),
        json!({"id": {"nested": 1}}),
    ];
    for v in items {
        assert!(matches!(
            normalize(&raw(v), "acme"),
            Err(NormalizeError::MissingIdentifier(_))
        ));
    }
}

#[test]
fn source_urls_are_never_trusted() {
    let p = normalize(
        &raw(json!({
            "id": "9",
            "url": "https://nitter.example/acme/status/9#m",
            "tweet_url": "https://twitter.com/acme/status/9",
            "link": "https://mirror.example/x",
            "permalink": "/acme/status/9"
        })),
        "acme",
    )
    .unwrap();
    assert_eq!(p.reference_url, "https://x.com/acme/status/9");
}

#[test]
fn missing_text_uses_sentinel() {
    let p = normalize(&raw(json!({"id": "1", "text": "   "})), "acme").unwrap();
    assert_eq!(p.text, NO_TEXT);
}

#[test]
fn unparseable_date_is_not_rejected() {
    let p = normalize(&raw(json!({"id": "1", "createdAt": "32/13/2026"})), "acme").unwrap();
    assert_eq!(p.published_at, PublishedAt::Unparsed);
}

#[test]
fn platform_date_is_parsed() {
    let p = normalize(
        &raw(json!({"id": "1", "created_at": "Mon Oct 19 15:04:00 +0000 2026"})),
        "acme",
    )
    .unwrap();
    match p.published_at {
        PublishedAt::At(ts) => assert_eq!(ts.to_rfc3339(), "2026-10-19T15:04:00+00:00"),
        PublishedAt::Unparsed => panic!("date should parse"),
    }
}

#[test]
fn normalization_is_idempotent() {
    let item = raw(json!({
        "rest_id": 123,
        "content": "hi&amp;  there",
        "date": "not a date",
        "likes": "7"
    }));
    let a = normalize(&item, "acme").unwrap();
    let b = normalize(&item, "acme").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.text, "hi& there");
}

#[test]
fn comparison_and_generic_text_is_kept_verbatim() {
    let p = normalize(
        &raw(json!({"id": "1", "text": "if a<b and c>d we ship Vec<u8> today"})),
        "acme",
    )
    .unwrap();
    assert_eq!(p.text, "if a<b and c>d we ship Vec<u8> today");

    let p = normalize(&raw(json!({"id": "2", "full_text": "generic Vec&lt;u8&gt; rocks"})), "acme").unwrap();
    assert_eq!(p.text, "generic Vec<u8> rocks");
}
