//! The event translator (spec §4.4): fixed tables mapping extension wire
//! events to internal event kinds, and GUI intents to extension requests.

use crate::wire::event_names as ev;

/// What an incoming extension message means internally, independent of its
/// wire spelling. `Unknown` events are logged and dropped by the caller;
/// `NoOp` events are recognized but intentionally produce no mutation or
/// fan-out (spec §4.4, §4.7 "No-op events are not fanned out").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalEventKind {
    TabActivated,
    TabUpdated,
    TabCreated,
    NoOp,
    AllTabsSync,
    TabRemoved,
    GroupUpsert,
    GroupRemoved,
    Unknown,
}

/// Classify a wire event name per the fixed table in spec §4.4.
pub fn classify_extension_event(event: &str) -> InternalEventKind {
    match event {
        ev::EXT_TAB_ACTIVATED => InternalEventKind::TabActivated,
        ev::EXT_TAB_UPDATED => InternalEventKind::TabUpdated,
        ev::EXT_TAB_CREATED => InternalEventKind::TabCreated,
        ev::EXT_TAB_HIGHLIGHTED | ev::EXT_TAB_ZOOM_CHANGED => InternalEventKind::NoOp,
        ev::EXT_ALL_TABS_INFO_RESPONSE => InternalEventKind::AllTabsSync,
        ev::EXT_TAB_REMOVED => InternalEventKind::TabRemoved,
        ev::EXT_TAB_GROUP_CREATED | ev::EXT_TAB_GROUP_UPDATED => InternalEventKind::GroupUpsert,
        ev::EXT_TAB_GROUP_REMOVED => InternalEventKind::GroupRemoved,
        _ => InternalEventKind::Unknown,
    }
}

/// Whether applying an event of this kind should trigger a GUI fan-out
/// (spec §4.7 fan-out policy, tested by spec §8 "Fan-out completeness").
pub fn fans_out(kind: InternalEventKind) -> bool {
    !matches!(kind, InternalEventKind::NoOp | InternalEventKind::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_every_table_entry() {
        assert_eq!(classify_extension_event(ev::EXT_TAB_ACTIVATED), InternalEventKind::TabActivated);
        assert_eq!(classify_extension_event(ev::EXT_TAB_UPDATED), InternalEventKind::TabUpdated);
        assert_eq!(classify_extension_event(ev::EXT_TAB_CREATED), InternalEventKind::TabCreated);
        assert_eq!(classify_extension_event(ev::EXT_TAB_HIGHLIGHTED), InternalEventKind::NoOp);
        assert_eq!(classify_extension_event(ev::EXT_TAB_ZOOM_CHANGED), InternalEventKind::NoOp);
        assert_eq!(
            classify_extension_event(ev::EXT_ALL_TABS_INFO_RESPONSE),
            InternalEventKind::AllTabsSync
        );
        assert_eq!(classify_extension_event(ev::EXT_TAB_REMOVED), InternalEventKind::TabRemoved);
        assert_eq!(classify_extension_event(ev::EXT_TAB_GROUP_CREATED), InternalEventKind::GroupUpsert);
        assert_eq!(classify_extension_event(ev::EXT_TAB_GROUP_UPDATED), InternalEventKind::GroupUpsert);
        assert_eq!(classify_extension_event(ev::EXT_TAB_GROUP_REMOVED), InternalEventKind::GroupRemoved);
    }

    #[test]
    fn unknown_event_name_is_unknown() {
        assert_eq!(classify_extension_event("Extension::WS::Nonsense"), InternalEventKind::Unknown);
    }

    #[test]
    fn fan_out_completeness_matches_spec_set() {
        use InternalEventKind::*;
        for kind in [AllTabsSync, TabActivated, TabUpdated, TabCreated, TabRemoved, GroupUpsert, GroupRemoved] {
            assert!(fans_out(kind), "{kind:?} should fan out");
        }
        assert!(!fans_out(NoOp));
        assert!(!fans_out(Unknown));
    }
}
