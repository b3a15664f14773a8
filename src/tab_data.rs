/// Data structures for Tab Pilot, shaped like the chrome extension API objects
use serde::{Deserialize, Serialize};

pub type TabId = i32;
pub type WindowId = i32;
pub type GroupId = i32;

/// Group id the browser reports for tabs that are not in any group
pub const GROUP_ID_UNGROUPED: GroupId = -1;

/// Information about a browser tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Absent for privileged tabs (devtools, some browser pages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TabId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub window_id: WindowId,
    #[serde(default = "ungrouped")]
    pub group_id: GroupId,
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
}

fn ungrouped() -> GroupId {
    GROUP_ID_UNGROUPED
}

impl Tab {
    pub fn new(id: TabId, window_id: WindowId, title: &str, url: &str) -> Tab {
        Tab {
            id: Some(id),
            title: title.to_string(),
            url: url.to_string(),
            window_id,
            group_id: GROUP_ID_UNGROUPED,
            index: 0,
            active: false,
            pinned: false,
        }
    }

    pub fn in_group(mut self, group_id: GroupId) -> Tab {
        self.group_id = group_id;
        self
    }

    pub fn is_grouped(&self) -> bool {
        self.group_id != GROUP_ID_UNGROUPED
    }
}

/// A browser window, optionally populated with its tabs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WindowId>,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

/// The fixed palette tab groups can be coloured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    #[default]
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

impl GroupColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupColor::Grey => "grey",
            GroupColor::Blue => "blue",
            GroupColor::Red => "red",
            GroupColor::Yellow => "yellow",
            GroupColor::Green => "green",
            GroupColor::Pink => "pink",
            GroupColor::Purple => "purple",
            GroupColor::Cyan => "cyan",
            GroupColor::Orange => "orange",
        }
    }
}

/// A tab group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroup {
    pub id: GroupId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub color: GroupColor,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub window_id: WindowId,
}

impl TabGroup {
    pub fn new(id: GroupId, title: &str) -> TabGroup {
        TabGroup {
            id,
            title: Some(title.to_string()),
            color: GroupColor::default(),
            collapsed: false,
            window_id: 0,
        }
    }

    /// Title if the group has a non-empty one
    pub fn named_title(&self) -> Option<&str> {
        self.title.as_deref().filter(|title| !title.is_empty())
    }
}

/// Does this tab satisfy the active free-text query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub tab: Tab,
    pub matched: bool,
}

/// Suggested destination group for a tab, awaiting confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct GroupProposal {
    pub tab: Tab,
    pub group: Option<TabGroup>,
}
