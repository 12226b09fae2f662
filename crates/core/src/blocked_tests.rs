// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn reply_is_extracted_from_rpc_variants() {
    let token = ReplyToken::new(5);
    assert_eq!(Blocked::StartReply { reply: token }.reply(), Some(token));
    assert_eq!(Blocked::StopReply { reply: token }.reply(), Some(token));
    assert_eq!(Blocked::RestartReply { reply: token }.reply(), Some(token));
}

#[test]
fn structural_variants_have_no_reply() {
    assert_eq!(Blocked::Job { job: JobId::new(1) }.reply(), None);
    assert_eq!(
        Blocked::Event {
            event: EventId::new(1)
        }
        .reply(),
        None
    );
}

#[test]
fn references_event_matches_only_that_event() {
    let blocked = Blocked::Event {
        event: EventId::new(7),
    };
    assert!(blocked.references_event(EventId::new(7)));
    assert!(!blocked.references_event(EventId::new(8)));
    assert!(!Blocked::Job { job: JobId::new(7) }.references_event(EventId::new(7)));
}

#[test]
fn serde_uses_type_tags() {
    let blocked = Blocked::Job { job: JobId::new(3) };
    let json = serde_json::to_string(&blocked).unwrap();
    assert_eq!(json, r#"{"type":"job","job":3}"#);

    let restored: Blocked = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, blocked);
}
