//! Wire-level JSON types shared by both transports.
//!
//! Every payload on the wire is a JSON object with an `event` field and
//! (usually) a `data` field. Unlike the teacher's `tab-protocol`, where each
//! message is a fixed Rust enum serialized directly, this protocol's `data`
//! shape is event-dependent and sometimes carries fields (`activeTabIds`)
//! outside of `data` — so messages are decoded in two steps: an envelope,
//! then a per-event payload pulled out of `envelope.data`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical event-name strings, grouped the way spec §4.4 groups them.
/// Mirrors the teacher's `tab_protocol::message_header` approach of naming
/// the wire vocabulary as constants rather than scattering string literals.
pub mod event_names {
    // Extension (browser) -> daemon, over the WebSocket transport.
    pub const EXT_TAB_ACTIVATED: &str = "Extension::WS::TabActivated";
    pub const EXT_TAB_UPDATED: &str = "Extension::WS::TabUpdated";
    pub const EXT_TAB_CREATED: &str = "Extension::WS::TabCreated";
    pub const EXT_TAB_HIGHLIGHTED: &str = "Extension::WS::TabHighlighted";
    pub const EXT_TAB_ZOOM_CHANGED: &str = "Extension::WS::TabZoomChanged";
    pub const EXT_ALL_TABS_INFO_RESPONSE: &str = "Extension::WS::AllTabsInfoResponse";
    pub const EXT_TAB_REMOVED: &str = "Extension::WS::TabRemoved";
    pub const EXT_TAB_GROUP_CREATED: &str = "Extension::WS::TabGroupCreated";
    pub const EXT_TAB_GROUP_UPDATED: &str = "Extension::WS::TabGroupUpdated";
    pub const EXT_TAB_GROUP_REMOVED: &str = "Extension::WS::TabGroupRemoved";

    // GUI -> daemon, over the UDS transport.
    pub const GUI_TAB_SELECTED: &str = "GUI::UDS::TabSelected";
    pub const GUI_CLOSE_TABS_REQUEST: &str = "GUI::UDS::CloseTabsRequest";

    // Daemon -> GUI, over the UDS transport.
    pub const DAEMON_TABS_UPDATE: &str = "Daemon::UDS::TabsUpdate";
    pub const DAEMON_TASKS_UPDATE: &str = "Daemon::UDS::TasksUpdate";
    pub const DAEMON_TOGGLE_GUI_REQUEST: &str = "Daemon::UDS::ToggleGuiRequest";

    // Daemon -> extension, over the WebSocket transport.
    pub const DAEMON_ALL_TABS_INFO_REQUEST: &str = "Daemon::WS::AllTabsInfoRequest";
    pub const DAEMON_ACTIVATE_TAB_REQUEST: &str = "Daemon::WS::ActivateTabRequest";
    pub const DAEMON_CLOSE_TABS_REQUEST: &str = "Daemon::WS::CloseTabsRequest";
}

/// The outer shape of every frame on either transport.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(rename = "activeTabIds", default, skip_serializing_if = "Option::is_none")]
    pub active_tab_ids: Option<Vec<u64>>,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
            active_tab_ids: None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---- payloads nested under `data` for extension -> daemon events ----

#[derive(Debug, Clone, Deserialize)]
pub struct ExtTabInfo {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "groupId", default)]
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtGroupInfo {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AllTabsInfoData {
    #[serde(default)]
    pub tabs: Vec<ExtTabInfo>,
    #[serde(default)]
    pub groups: Vec<ExtGroupInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TabMutationData {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "groupId", default)]
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TabRemovedData {
    #[serde(rename = "tabId")]
    pub tab_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TabGroupMutationData {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TabGroupRemovedData {
    pub id: i64,
}

// ---- payloads nested under `data` for GUI -> daemon intents ----

#[derive(Debug, Clone, Deserialize)]
pub struct TabSelectedData {
    #[serde(rename = "tabId")]
    pub tab_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseTabsRequestData {
    #[serde(rename = "tabIds")]
    pub tab_ids: Vec<u64>,
}

// ---- payloads the daemon emits ----

#[derive(Debug, Clone, Serialize)]
pub struct TabWire {
    pub id: u64,
    pub title: String,
    pub active: bool,
    pub task_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskWire {
    pub id: i64,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TabsUpdateData {
    pub tabs: Vec<TabWire>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TasksUpdateData {
    pub tasks: Vec<TaskWire>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivateTabRequestData {
    #[serde(rename = "tabId")]
    pub tab_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloseTabsRequestOutData {
    #[serde(rename = "tabIds")]
    pub tab_ids: Vec<u64>,
}

pub fn tabs_update_envelope(tabs: Vec<TabWire>) -> Envelope {
    Envelope::new(
        event_names::DAEMON_TABS_UPDATE,
        serde_json::to_value(TabsUpdateData { tabs }).expect("TabsUpdateData always serializes"),
    )
}

pub fn tasks_update_envelope(tasks: Vec<TaskWire>) -> Envelope {
    Envelope::new(
        event_names::DAEMON_TASKS_UPDATE,
        serde_json::to_value(TasksUpdateData { tasks }).expect("TasksUpdateData always serializes"),
    )
}

pub fn toggle_gui_request_envelope() -> Envelope {
    Envelope::new(event_names::DAEMON_TOGGLE_GUI_REQUEST, Value::String("toggle".to_string()))
}

pub fn all_tabs_info_request_envelope() -> Envelope {
    Envelope::new(event_names::DAEMON_ALL_TABS_INFO_REQUEST, Value::Null)
}

pub fn activate_tab_request_envelope(tab_id: u64) -> Envelope {
    Envelope::new(
        event_names::DAEMON_ACTIVATE_TAB_REQUEST,
        serde_json::to_value(ActivateTabRequestData { tab_id })
            .expect("ActivateTabRequestData always serializes"),
    )
}

pub fn close_tabs_request_envelope(tab_ids: Vec<u64>) -> Envelope {
    Envelope::new(
        event_names::DAEMON_CLOSE_TABS_REQUEST,
        serde_json::to_value(CloseTabsRequestOutData { tab_ids })
            .expect("CloseTabsRequestOutData always serializes"),
    )
}
