//! The broker (spec §4.7): the central hub that owns the tab/task stores,
//! applies incoming events, fans out snapshots to the GUI, and queues
//! outbound intents for the extension.
//!
//! Grounded on the teacher's `ShiftServer` (`server_layer::server`): a
//! single struct owning all shared mutable state behind one lock, with one
//! method per inbound message variant. Unlike `ShiftServer`, which is
//! driven from a single-threaded `tokio::select!` loop, this broker is
//! shared across real OS threads (spec §5), so its state lives behind an
//! explicit `Mutex` rather than behind single ownership.

use std::sync::{Arc, Mutex};

use lotab_protocol::wire::{
    self, event_names, AllTabsInfoData, CloseTabsRequestData, TabGroupMutationData, TabGroupRemovedData,
    TabMutationData, TabRemovedData, TabSelectedData, TabWire, TaskWire,
};
use lotab_protocol::{classify_extension_event, fans_out, Envelope, InternalEventKind};
use tracing::{debug, warn};

use crate::model::{TabStore, TaskStore, NO_TASK};

/// Write side of the GUI UDS transport, injected so the broker does not
/// depend on the concrete socket type (spec §4.5 "Writes may happen from
/// the broker thread or the WS thread; the implementation must serialize
/// writes").
pub trait FrameSink: Send + Sync {
    fn send_frame(&self, payload: &[u8]) -> std::io::Result<()>;
}

struct Stores {
    tabs: TabStore,
    tasks: TaskStore,
}

/// The single-slot "latest-wins" mailbox to the extension (spec §3, §9).
/// The WS thread drains this by polling `take` off its own 100ms socket
/// read-timeout (spec §4.6's quantum); there is no separate wakeup here
/// because the only thread allowed to touch the WS library is the WS
/// thread itself (spec §5), and it is already blocked in a timed socket
/// read rather than idle.
#[derive(Default)]
struct PendingWs {
    message: Mutex<Option<Envelope>>,
}

impl PendingWs {
    fn install(&self, envelope: Envelope) {
        *self.message.lock().unwrap() = Some(envelope);
    }

    /// Take the pending message, if any, leaving the slot empty.
    pub fn take(&self) -> Option<Envelope> {
        self.message.lock().unwrap().take()
    }
}

/// Outcome of handling one extension-originated frame, used by the WS
/// server loop to decide whether to keep the session alive (spec §4.7
/// "Identity mismatch ... mark the session for close").
#[derive(Debug, PartialEq, Eq)]
pub enum ExtensionFrameOutcome {
    Continue,
    CloseConnection,
}

pub struct Broker {
    stores: Mutex<Stores>,
    pending_ws: PendingWs,
    gui_sink: Mutex<Option<Arc<dyn FrameSink>>>,
    allowed_browser_id: Option<String>,
}

impl Broker {
    pub fn new(allowed_browser_id: Option<String>) -> Self {
        Self {
            stores: Mutex::new(Stores {
                tabs: TabStore::new(),
                tasks: TaskStore::new(),
            }),
            pending_ws: PendingWs::default(),
            gui_sink: Mutex::new(None),
            allowed_browser_id,
        }
    }

    pub fn set_gui_sink(&self, sink: Option<Arc<dyn FrameSink>>) {
        *self.gui_sink.lock().unwrap() = sink;
    }

    pub fn gui_connected(&self) -> bool {
        self.gui_sink.lock().unwrap().is_some()
    }

    /// Take the single pending outbound extension message, if any (spec §4.6
    /// `ServerWritable`: "drains at most one frame from PendingWsMessage").
    pub fn take_pending_ws_message(&self) -> Option<Envelope> {
        self.pending_ws.take()
    }

    /// Handle one decoded extension frame (spec §4.7). Returns whether the
    /// connection should be kept open.
    pub fn handle_extension_frame(&self, identity: Option<&str>, raw: &[u8]) -> ExtensionFrameOutcome {
        let envelope: Envelope = match serde_json::from_slice(raw) {
            Ok(e) => e,
            Err(err) => {
                warn!(%err, "dropping malformed extension frame");
                return ExtensionFrameOutcome::Continue;
            }
        };

        if let Some(allowed) = &self.allowed_browser_id {
            match identity {
                Some(token) if token == allowed => {}
                _ => {
                    warn!("dropping extension message: identity mismatch, closing session");
                    return ExtensionFrameOutcome::CloseConnection;
                }
            }
        }

        self.apply_extension_event(&envelope);
        ExtensionFrameOutcome::Continue
    }

    fn apply_extension_event(&self, envelope: &Envelope) {
        let kind = classify_extension_event(&envelope.event);
        match kind {
            InternalEventKind::AllTabsSync => self.apply_all_tabs_sync(envelope),
            InternalEventKind::TabCreated | InternalEventKind::TabUpdated | InternalEventKind::TabActivated => {
                self.apply_tab_mutation(envelope)
            }
            InternalEventKind::TabRemoved => self.apply_tab_removed(envelope),
            InternalEventKind::GroupUpsert => self.apply_group_upsert(envelope),
            InternalEventKind::GroupRemoved => self.apply_group_removed(envelope),
            InternalEventKind::NoOp => debug!(event = %envelope.event, "no-op extension event"),
            InternalEventKind::Unknown => warn!(event = %envelope.event, "unknown extension event, dropping"),
        }

        if fans_out(kind) {
            self.fan_out_to_gui();
        }
    }

    /// spec §4.7: groups first (so tabs can resolve group refs), tabs next,
    /// active-ids last (so activation reflects the freshly synced tab set).
    /// `AllTabsInfoResponse` is additive, never authoritative (spec §9 open
    /// question, resolved in favor of the source's additive behavior).
    fn apply_all_tabs_sync(&self, envelope: &Envelope) {
        let data: AllTabsInfoData = match serde_json::from_value(envelope.data.clone()) {
            Ok(d) => d,
            Err(err) => {
                warn!(%err, "malformed AllTabsInfoResponse payload, dropping");
                return;
            }
        };
        let mut stores = self.stores.lock().unwrap();
        for group in &data.groups {
            stores.tasks.incorporate(group.id, group.title.as_deref(), group.color.as_deref());
        }
        for tab in &data.tabs {
            let task_ext_id = tab
                .group_id
                .filter(|id| stores.tasks.find_by_external(*id).is_some())
                .unwrap_or(NO_TASK);
            stores.tabs.upsert(tab.id, tab.title.as_deref(), task_ext_id);
        }
        if let Some(active_ids) = &envelope.active_tab_ids {
            stores.tabs.apply_active(active_ids);
        }
    }

    fn apply_tab_mutation(&self, envelope: &Envelope) {
        let data: TabMutationData = match serde_json::from_value(envelope.data.clone()) {
            Ok(d) => d,
            Err(err) => {
                warn!(%err, event = %envelope.event, "malformed tab mutation payload, dropping");
                return;
            }
        };
        let mut stores = self.stores.lock().unwrap();
        let task_ext_id = data
            .group_id
            .filter(|id| stores.tasks.find_by_external(*id).is_some())
            .unwrap_or(NO_TASK);
        stores.tabs.upsert(data.id, data.title.as_deref(), task_ext_id);
        if let Some(active_ids) = &envelope.active_tab_ids {
            stores.tabs.apply_active(active_ids);
        }
    }

    fn apply_tab_removed(&self, envelope: &Envelope) {
        let data: TabRemovedData = match serde_json::from_value(envelope.data.clone()) {
            Ok(d) => d,
            Err(err) => {
                warn!(%err, "malformed TabRemoved payload, dropping");
                return;
            }
        };
        let mut stores = self.stores.lock().unwrap();
        stores.tabs.remove(data.tab_id);
        if let Some(active_ids) = &envelope.active_tab_ids {
            stores.tabs.apply_active(active_ids);
        }
    }

    fn apply_group_upsert(&self, envelope: &Envelope) {
        let data: TabGroupMutationData = match serde_json::from_value(envelope.data.clone()) {
            Ok(d) => d,
            Err(err) => {
                warn!(%err, "malformed tab group payload, dropping");
                return;
            }
        };
        let mut stores = self.stores.lock().unwrap();
        stores.tasks.incorporate(data.id, data.title.as_deref(), data.color.as_deref());
    }

    fn apply_group_removed(&self, envelope: &Envelope) {
        let data: TabGroupRemovedData = match serde_json::from_value(envelope.data.clone()) {
            Ok(d) => d,
            Err(err) => {
                warn!(%err, "malformed TabGroupRemoved payload, dropping");
                return;
            }
        };
        let mut stores = self.stores.lock().unwrap();
        stores.tasks.remove(data.id);
    }

    /// spec §4.7 "HotkeyToggle": emit both snapshots, then ToggleGuiRequest.
    pub fn handle_hotkey_toggle(&self) {
        self.fan_out_to_gui();
        self.send_to_gui(&wire::toggle_gui_request_envelope());
    }

    /// Handle one decoded GUI intent (spec §4.4, §4.7).
    pub fn handle_gui_envelope(&self, envelope: &Envelope) {
        match envelope.event.as_str() {
            event_names::GUI_TAB_SELECTED => {
                let data: TabSelectedData = match serde_json::from_value(envelope.data.clone()) {
                    Ok(d) => d,
                    Err(err) => {
                        warn!(%err, "malformed TabSelected payload, dropping");
                        return;
                    }
                };
                self.pending_ws
                    .install(wire::activate_tab_request_envelope(data.tab_id));
            }
            event_names::GUI_CLOSE_TABS_REQUEST => {
                let data: CloseTabsRequestData = match serde_json::from_value(envelope.data.clone()) {
                    Ok(d) => d,
                    Err(err) => {
                        warn!(%err, "malformed CloseTabsRequest payload, dropping");
                        return;
                    }
                };
                self.pending_ws
                    .install(wire::close_tabs_request_envelope(data.tab_ids));
            }
            other => warn!(event = other, "unknown GUI intent, dropping"),
        }
    }

    /// spec §4.7 fan-out policy: one `TabsUpdate` and one `TasksUpdate`,
    /// built under the lock so each snapshot is internally consistent, then
    /// written after the lock is released (spec §5 "no lock held across
    /// any blocking I/O call").
    pub fn fan_out_to_gui(&self) {
        let (tabs, tasks) = {
            let stores = self.stores.lock().unwrap();
            (stores.tabs.snapshot(), stores.tasks.snapshot())
        };
        let tabs_wire = tabs
            .into_iter()
            .map(|t| TabWire {
                id: t.id,
                title: t.title,
                active: t.active,
                task_id: t.task_ext_id,
            })
            .collect();
        let tasks_wire = tasks
            .into_iter()
            .map(|t| TaskWire {
                id: t.external_id,
                name: t.name,
                color: t.color,
            })
            .collect();
        self.send_to_gui(&wire::tabs_update_envelope(tabs_wire));
        self.send_to_gui(&wire::tasks_update_envelope(tasks_wire));
    }

    fn send_to_gui(&self, envelope: &Envelope) {
        let sink = self.gui_sink.lock().unwrap().clone();
        let Some(sink) = sink else {
            return;
        };
        let Ok(json) = envelope.to_json() else {
            warn!(event = %envelope.event, "failed to serialize outbound envelope");
            return;
        };
        if let Err(err) = sink.send_frame(json.as_bytes()) {
            warn!(%err, "failed to send frame to GUI");
        }
    }

    #[cfg(test)]
    pub(crate) fn tabs_snapshot(&self) -> Vec<crate::model::TabRecord> {
        self.stores.lock().unwrap().tabs.snapshot()
    }

    #[cfg(test)]
    pub(crate) fn tasks_snapshot(&self) -> Vec<crate::model::TaskRecord> {
        self.stores.lock().unwrap().tasks.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingSink {
        frames: StdMutex<Vec<String>>,
    }

    impl FrameSink for RecordingSink {
        fn send_frame(&self, payload: &[u8]) -> std::io::Result<()> {
            self.frames.lock().unwrap().push(String::from_utf8_lossy(payload).into_owned());
            Ok(())
        }
    }

    fn envelope_with(event: &str, data: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({"event": event, "data": data})).unwrap()
    }

    #[test]
    fn s1_initial_sync_with_groups() {
        let broker = Broker::new(None);
        let sink = Arc::new(RecordingSink::default());
        broker.set_gui_sink(Some(sink.clone()));

        let raw = serde_json::to_vec(&serde_json::json!({
            "event": event_names::EXT_ALL_TABS_INFO_RESPONSE,
            "data": {
                "tabs": [{"id": 501, "title": "Grouped Tab", "groupId": 10}],
                "groups": [{"id": 10, "title": "Work Group", "color": "blue"}]
            },
            "activeTabIds": [501]
        }))
        .unwrap();
        assert_eq!(broker.handle_extension_frame(None, &raw), ExtensionFrameOutcome::Continue);

        let tasks = broker.tasks_snapshot();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].external_id, 10);
        assert_eq!(tasks[0].name, "Work Group");
        assert_eq!(tasks[0].color, "blue");

        let tabs = broker.tabs_snapshot();
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].id, 501);
        assert_eq!(tabs[0].title, "Grouped Tab");
        assert!(tabs[0].active);
        assert_eq!(tabs[0].task_ext_id, 10);

        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].contains(event_names::DAEMON_TABS_UPDATE));
        assert!(frames[1].contains(event_names::DAEMON_TASKS_UPDATE));
    }

    #[test]
    fn s2_selection_round_trip() {
        let broker = Broker::new(None);
        let envelope = Envelope::new(
            event_names::GUI_TAB_SELECTED,
            serde_json::json!({"tabId": 999}),
        );
        broker.handle_gui_envelope(&envelope);
        let pending = broker.take_pending_ws_message().unwrap();
        assert_eq!(pending.event, event_names::DAEMON_ACTIVATE_TAB_REQUEST);
        assert_eq!(pending.data["tabId"], 999);
    }

    #[test]
    fn s3_hotkey_toggle_order() {
        let broker = Broker::new(None);
        let sink = Arc::new(RecordingSink::default());
        broker.set_gui_sink(Some(sink.clone()));
        broker.handle_hotkey_toggle();
        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[0].contains(event_names::DAEMON_TABS_UPDATE));
        assert!(frames[1].contains(event_names::DAEMON_TASKS_UPDATE));
        assert!(frames[2].contains(event_names::DAEMON_TOGGLE_GUI_REQUEST));
    }

    #[test]
    fn s4_tab_removal_empties_store() {
        let broker = Broker::new(None);
        let sink = Arc::new(RecordingSink::default());
        broker.set_gui_sink(Some(sink.clone()));
        broker.handle_extension_frame(
            None,
            &envelope_with(
                event_names::EXT_ALL_TABS_INFO_RESPONSE,
                serde_json::json!({"tabs": [{"id": 501, "title": "Grouped Tab"}], "groups": []}),
            ),
        );
        broker.handle_extension_frame(
            None,
            &envelope_with(event_names::EXT_TAB_REMOVED, serde_json::json!({"tabId": 501})),
        );
        assert!(broker.tabs_snapshot().is_empty());
        let frames = sink.frames.lock().unwrap();
        let last_tabs_update = frames.iter().rev().find(|f| f.contains(event_names::DAEMON_TABS_UPDATE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(last_tabs_update).unwrap();
        assert_eq!(value["data"]["tabs"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn s5_identity_filter_drops_mismatched_session() {
        let broker = Broker::new(Some("AAA".to_string()));
        let raw = envelope_with(event_names::EXT_TAB_CREATED, serde_json::json!({"id": 777, "title": "Valid"}));
        assert_eq!(broker.handle_extension_frame(Some("AAA"), &raw), ExtensionFrameOutcome::Continue);
        assert_eq!(broker.tabs_snapshot().len(), 1);

        let raw2 = envelope_with(event_names::EXT_TAB_CREATED, serde_json::json!({"id": 888, "title": "Invalid"}));
        assert_eq!(broker.handle_extension_frame(Some("BBB"), &raw2), ExtensionFrameOutcome::CloseConnection);
        assert_eq!(broker.tabs_snapshot().len(), 1);
    }

    #[test]
    fn no_op_events_do_not_fan_out() {
        let broker = Broker::new(None);
        let sink = Arc::new(RecordingSink::default());
        broker.set_gui_sink(Some(sink.clone()));
        broker.handle_extension_frame(
            None,
            &envelope_with(event_names::EXT_TAB_HIGHLIGHTED, serde_json::json!({"id": 1})),
        );
        assert!(sink.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_events_are_dropped_without_fan_out() {
        let broker = Broker::new(None);
        let sink = Arc::new(RecordingSink::default());
        broker.set_gui_sink(Some(sink.clone()));
        broker.handle_extension_frame(None, &envelope_with("Extension::WS::Nonsense", serde_json::json!({})));
        assert!(sink.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn stale_group_reference_falls_back_to_no_task() {
        let broker = Broker::new(None);
        broker.handle_extension_frame(
            None,
            &envelope_with(event_names::EXT_TAB_CREATED, serde_json::json!({"id": 42, "title": "T", "groupId": 999})),
        );
        assert_eq!(broker.tabs_snapshot()[0].task_ext_id, NO_TASK);
    }

    #[test]
    fn fan_out_is_skipped_when_gui_not_connected() {
        let broker = Broker::new(None);
        // No sink installed; should not panic and should simply drop the frame.
        broker.handle_extension_frame(
            None,
            &envelope_with(event_names::EXT_TAB_CREATED, serde_json::json!({"id": 1, "title": "T"})),
        );
        assert!(!broker.gui_connected());
    }
}
