use chrono::{TimeZone, Utc};
use serde_json::json;

use docsync_core::models::{
    BatchResponse, DeleteItem, ItemResult, ItemStatus, SyncItem, SyncRequest, UpsertItem,
};
use docsync_core::{build_external_id, content_hash};

// ─── Wire shape ───────────────────────────────────────────

#[test]
fn upsert_serializes_with_op_tag_and_camel_case() {
    let item = SyncItem::Upsert(UpsertItem {
        external_id: build_external_id("vault", "notes/a.md"),
        title: Some("a".into()),
        content_markdown: "# A".into(),
        content_hash: content_hash("# A"),
        updated_at_source: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        metadata: Default::default(),
    });
    let value = serde_json::to_value(&item).unwrap();

    assert_eq!(value["op"], "upsert");
    assert_eq!(value["externalId"], "vault::notes/a.md");
    assert_eq!(value["contentMarkdown"], "# A");
    assert_eq!(value["updatedAtSource"], "2024-01-01T00:00:00Z");
    assert!(value.get("external_id").is_none());
}

#[test]
fn delete_parses_from_client_json() {
    let item: SyncItem = serde_json::from_value(json!({
        "op": "delete",
        "externalId": "vault::gone.md",
        "deletedAtSource": "2024-01-02T00:00:00Z"
    }))
    .unwrap();

    match item {
        SyncItem::Delete(DeleteItem {
            external_id,
            deleted_at_source,
            updated_at_source,
            ..
        }) => {
            assert_eq!(external_id, "vault::gone.md");
            assert_eq!(deleted_at_source, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
            assert!(updated_at_source.is_none());
        }
        other => panic!("expected delete, got {other:?}"),
    }
}

#[test]
fn optional_upsert_fields_may_be_omitted() {
    let item: SyncItem = serde_json::from_value(json!({
        "op": "upsert",
        "externalId": "vault::a.md",
        "contentMarkdown": "",
        "contentHash": "abc"
    }))
    .unwrap();
    assert!(item.validate().is_ok());
    assert!(!item.is_delete());
}

// ─── Invalid items ────────────────────────────────────────

#[test]
fn unknown_op_fails_to_parse() {
    let parsed: Result<SyncItem, _> = serde_json::from_value(json!({
        "op": "rename",
        "externalId": "vault::a.md"
    }));
    assert!(parsed.is_err());
}

#[test]
fn delete_without_timestamp_fails_to_parse() {
    let parsed: Result<SyncItem, _> = serde_json::from_value(json!({
        "op": "delete",
        "externalId": "vault::a.md"
    }));
    assert!(parsed.is_err());
}

#[test]
fn unparseable_timestamp_fails_to_parse() {
    let parsed: Result<SyncItem, _> = serde_json::from_value(json!({
        "op": "upsert",
        "externalId": "vault::a.md",
        "contentMarkdown": "x",
        "contentHash": "h",
        "updatedAtSource": "yesterday"
    }));
    assert!(parsed.is_err());
}

#[test]
fn blank_identity_fails_validation() {
    let item: SyncItem = serde_json::from_value(json!({
        "op": "upsert",
        "externalId": "  ",
        "contentMarkdown": "x",
        "contentHash": "h"
    }))
    .unwrap();
    assert!(item.validate().is_err());

    let item: SyncItem = serde_json::from_value(json!({
        "op": "upsert",
        "externalId": "vault::a.md",
        "contentMarkdown": "x",
        "contentHash": ""
    }))
    .unwrap();
    assert!(item.validate().is_err());
}

// ─── Envelope ─────────────────────────────────────────────

#[test]
fn envelope_keeps_items_raw_when_requested() {
    let body = json!({
        "sourceScopeId": "vault",
        "agentId": "laptop",
        "sentAt": "2024-01-01T00:00:00Z",
        "items": [{"op": "upsert"}, 42]
    });
    let request: SyncRequest<serde_json::Value> = serde_json::from_value(body).unwrap();
    assert_eq!(request.items.len(), 2);
    assert!(request.source_name.is_none());
}

#[test]
fn batch_response_counts_follow_results() {
    let mut response = BatchResponse::default();
    response.push(ItemResult::accepted("a"));
    response.push(ItemResult::skipped("b", "unchanged"));
    response.push(ItemResult::rejected("c", "invalid_item"));
    response.push(ItemResult::accepted("d"));

    assert_eq!((response.accepted, response.skipped, response.rejected), (2, 1, 1));
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["itemResults"][1]["status"], "skipped");
    assert_eq!(value["itemResults"][1]["externalId"], "b");
    assert!(value["itemResults"][0].get("reason").is_none());

    let back: BatchResponse = serde_json::from_value(value).unwrap();
    assert_eq!(back.item_results[2].status, ItemStatus::Rejected);
}
