//! Property-based tests for the tab-state codec.
//!
//! These tests verify that any tab state survives encode then decode, that
//! decoding arbitrary bytes never panics and is deterministic, and that
//! upgrading keeps what the user sees.

use proptest::prelude::*;
use tabstate::services::contents_state;
use tabstate::services::tab_state_codec::{decode, TabStateCodec, TabStateCodecTrait};
use tabstate::types::errors::DecodeError;
use tabstate::types::tab_state::{Channel, Generation, NavigationEntry, NavigationHistory, TabState};

// --- Arbitrary strategies for tab-state types ---

fn arb_generation() -> impl Strategy<Value = Generation> {
    prop_oneof![
        Just(Generation::V0),
        Just(Generation::V1),
        Just(Generation::V2),
    ]
}

fn arb_channel() -> impl Strategy<Value = Option<Channel>> {
    proptest::option::of(prop_oneof![
        Just(Channel::Stable),
        Just(Channel::Beta),
        Just(Channel::Dev),
        Just(Channel::Canary),
    ])
}

fn arb_entry() -> impl Strategy<Value = NavigationEntry> {
    (
        (
            "https://[a-z]{1,12}\\.[a-z]{2,3}/[a-z0-9/]{0,20}",
            // Any printable text, including CJK and right-to-left scripts.
            "\\PC{0,40}",
            proptest::collection::vec(any::<u8>(), 0..64),
            any::<i32>(),
        ),
        (
            any::<bool>(),
            "[a-z:/.]{0,30}",
            any::<i32>(),
            any::<bool>(),
            any::<i64>(),
            100i32..600i32,
        ),
    )
        .prop_map(
            |(
                (virtual_url, title, page_state, transition_type),
                (has_post_data, referrer_url, referrer_policy, overriding, timestamp, status),
            )| NavigationEntry {
                page_state,
                transition_type,
                has_post_data,
                referrer_url,
                referrer_policy,
                original_request_url: virtual_url.clone(),
                is_overriding_user_agent: overriding,
                timestamp_micros: timestamp,
                http_status_code: status,
                ..NavigationEntry::new(0, &virtual_url, &title)
            },
        )
}

fn arb_history() -> impl Strategy<Value = NavigationHistory> {
    (proptest::collection::vec(arb_entry(), 1..5), any::<bool>())
        .prop_flat_map(|(entries, off_the_record)| {
            let count = entries.len() as i32;
            (Just(entries), Just(off_the_record), 0..count)
        })
        .prop_map(|(mut entries, off_the_record, current_index)| {
            for (i, entry) in entries.iter_mut().enumerate() {
                entry.index = i as i32;
            }
            NavigationHistory::new(off_the_record, current_index, entries)
                .expect("current index is in range by construction")
        })
}

fn arb_tab_state() -> impl Strategy<Value = TabState> {
    (
        arb_history(),
        arb_generation(),
        any::<i64>(),
        any::<i32>(),
        proptest::option::of("[a-z]{1,8}(\\.[a-z]{1,8}){0,3}"),
        any::<i32>(),
        (
            proptest::option::of(0i32..20),
            any::<i32>(),
            any::<i32>(),
            proptest::option::of(0i64..i64::MAX),
        ),
    )
        .prop_map(
            |(
                history,
                generation,
                timestamp,
                parent_id,
                opener,
                theme_color,
                (launch_type, root_id, user_agent, last_navigation),
            )| {
                let contents = contents_state::encode(history, generation)
                    .expect("generated history always fits");
                TabState::new(contents)
                    .with_timestamp_millis(timestamp)
                    .with_parent_id(parent_id)
                    .with_opener_app_id(opener)
                    .with_theme_color(theme_color)
                    .with_launch_type_at_creation(launch_type)
                    .with_root_id(root_id)
                    .with_user_agent(user_agent)
                    .with_last_navigation_committed_timestamp_millis(last_navigation)
            },
        )
}

// **Property: encode/decode round-trip**
//
// *For any* tab state, encoding then decoding SHALL produce an equal state,
// regardless of the channel hint.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn tab_state_encode_decode_roundtrip(state in arb_tab_state(), hint in arb_channel()) {
        let bytes = TabStateCodec::default()
            .encode(&state)
            .expect("Encoding should succeed for any generated state");

        let decoded = decode(&bytes, hint)
            .expect("Decoding an encoded state should succeed");

        prop_assert_eq!(decoded, state);
    }

    #[test]
    fn decode_is_deterministic_and_never_panics(
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
        hint in arb_channel(),
    ) {
        let first = decode(&bytes, hint);
        let second = decode(&bytes, hint);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn upgrade_keeps_visible_state(state in arb_tab_state()) {
        let codec = TabStateCodec::default();

        let upgraded = codec.upgrade(&state).expect("Upgrade should succeed");

        prop_assert_eq!(upgraded.contents_state().version(), Generation::LATEST);
        prop_assert_eq!(upgraded.virtual_url(), state.virtual_url());
        prop_assert_eq!(upgraded.display_title(), state.display_title());
        prop_assert_eq!(upgraded.is_incognito(), state.is_incognito());
        prop_assert_eq!(upgraded.parent_id(), state.parent_id());
    }

    #[test]
    fn record_cut_after_version_keeps_history(
        state in arb_tab_state(),
        cut in 1usize..=33,
    ) {
        let bytes = TabStateCodec::default().encode(&state).expect("Encoding should succeed");

        // The 33 bytes after the version field are all optional: a cut there
        // either ends the record cleanly or splits a field, never the history.
        match decode(&bytes[..bytes.len() - cut], Some(Channel::Beta)) {
            Ok(decoded) => {
                prop_assert_eq!(decoded.contents_state(), state.contents_state());
            }
            Err(err) => {
                prop_assert!(matches!(err, DecodeError::Truncated(_)), "unexpected {:?}", err);
            }
        }
    }
}
