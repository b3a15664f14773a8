/// Browser state snapshot and the panel state built on top of it
///
/// A snapshot is never patched: every browser event produces a fresh one, and
/// the panel state derived from it is rebuilt through `PanelState::apply`.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::tab_data::{GroupId, GroupProposal, Tab, TabGroup, TabId, Window, WindowId};

/// Windows, groups and tabs at one point in time
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowserSnapshot {
    pub current_window_id: Option<WindowId>,
    pub current_tab_id: Option<TabId>,
    pub windows: Vec<Window>,
    groups: BTreeMap<GroupId, TabGroup>,
    tabs: Vec<Tab>,
}

/// Tabs of one group within one window
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBucket<'a> {
    pub group_id: GroupId,
    pub group: Option<&'a TabGroup>,
    pub tabs: Vec<&'a Tab>,
}

/// Groups of one window, in the order their tabs were first seen
#[derive(Debug, Clone, PartialEq)]
pub struct WindowBucket<'a> {
    pub window_id: WindowId,
    pub groups: Vec<GroupBucket<'a>>,
}

impl BrowserSnapshot {
    /// Build a snapshot. A tab id seen twice keeps its first occurrence so
    /// every tab lands in exactly one bucket.
    pub fn new(
        current_window_id: Option<WindowId>,
        current_tab_id: Option<TabId>,
        windows: Vec<Window>,
        groups: Vec<TabGroup>,
        tabs: Vec<Tab>,
    ) -> Self {
        let mut seen = HashSet::new();
        let tabs = tabs
            .into_iter()
            .filter(|tab| tab.id.is_none_or(|id| seen.insert(id)))
            .collect();

        BrowserSnapshot {
            current_window_id,
            current_tab_id,
            windows,
            groups: groups.into_iter().map(|group| (group.id, group)).collect(),
            tabs,
        }
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == Some(id))
    }

    pub fn open_tab_ids(&self) -> HashSet<TabId> {
        self.tabs.iter().filter_map(|tab| tab.id).collect()
    }

    pub fn group(&self, id: GroupId) -> Option<&TabGroup> {
        self.groups.get(&id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &TabGroup> {
        self.groups.values()
    }

    /// Groups that have a non-empty title
    pub fn titled_groups(&self) -> Vec<TabGroup> {
        self.groups
            .values()
            .filter(|group| group.named_title().is_some())
            .cloned()
            .collect()
    }

    pub fn groups_by_title(&self) -> HashMap<&str, &TabGroup> {
        self.groups
            .values()
            .filter_map(|group| group.named_title().map(|title| (title, group)))
            .collect()
    }

    /// Tabs bucketed by window, then by group
    pub fn buckets(&self) -> Vec<WindowBucket<'_>> {
        let mut windows: Vec<WindowBucket<'_>> = Vec::new();

        for tab in &self.tabs {
            let window_pos = match windows.iter().position(|w| w.window_id == tab.window_id) {
                Some(pos) => pos,
                None => {
                    windows.push(WindowBucket {
                        window_id: tab.window_id,
                        groups: Vec::new(),
                    });
                    windows.len() - 1
                }
            };

            let groups = &mut windows[window_pos].groups;
            match groups.iter_mut().find(|g| g.group_id == tab.group_id) {
                Some(bucket) => bucket.tabs.push(tab),
                None => groups.push(GroupBucket {
                    group_id: tab.group_id,
                    group: self.groups.get(&tab.group_id),
                    tabs: vec![tab],
                }),
            }
        }

        windows
    }
}

/// Changes the panel state can undergo
#[derive(Debug, Clone, PartialEq)]
pub enum PanelAction {
    /// A fresh snapshot after a browser event. `seq` is the order in which
    /// the read was started; a read older than the last applied one is dropped.
    Refresh { seq: u64, snapshot: BrowserSnapshot },
    /// The user's selection replaced wholesale
    Select(BTreeSet<TabId>),
    /// A query verdict arrived for one tab
    Matched(TabId),
    ClearSelection,
    /// The categorizer settled
    Proposals(Vec<GroupProposal>),
    /// The proposal for this tab was applied or dismissed
    ProposalCommitted(TabId),
}

/// Everything the panel renders from. Selections and proposals only ever
/// reference tabs open in `snapshot`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PanelState {
    pub snapshot: BrowserSnapshot,
    pub selected: BTreeSet<TabId>,
    pub proposals: Option<Vec<GroupProposal>>,
    /// `seq` of the snapshot currently shown
    pub refresh_seq: u64,
}

impl PanelState {
    /// The state after `action`; `self` is left untouched
    pub fn apply(&self, action: PanelAction) -> PanelState {
        let mut next = self.clone();

        match action {
            PanelAction::Refresh { seq, snapshot } => {
                if seq < self.refresh_seq {
                    return next;
                }
                next.refresh_seq = seq;
                next.snapshot = snapshot;
            }
            PanelAction::Select(ids) => next.selected = ids,
            PanelAction::Matched(id) => {
                next.selected.insert(id);
            }
            PanelAction::ClearSelection => next.selected.clear(),
            PanelAction::Proposals(proposals) => next.proposals = Some(proposals),
            PanelAction::ProposalCommitted(tab_id) => {
                if let Some(proposals) = next.proposals.as_mut() {
                    if let Some(pos) = proposals.iter().position(|p| p.tab.id == Some(tab_id)) {
                        proposals.remove(pos);
                    }
                }
            }
        }

        next.prune();
        next
    }

    /// Drop selections and proposals for tabs that are no longer open
    fn prune(&mut self) {
        let open = self.snapshot.open_tab_ids();

        self.selected.retain(|id| open.contains(id));
        if let Some(proposals) = self.proposals.as_mut() {
            proposals.retain(|p| p.tab.id.is_some_and(|id| open.contains(&id)));
        }
    }

    /// Selected tabs as they appear in the current snapshot
    pub fn selected_tabs(&self) -> Vec<Tab> {
        self.selected
            .iter()
            .filter_map(|id| self.snapshot.tab(*id))
            .cloned()
            .collect()
    }
}
