/// Propose a destination group for each tab from the titled groups on hand

use std::collections::HashMap;

use log::{debug, warn};

use crate::classify::{ClassificationRequest, Classifier, ResponseShape};
use crate::executor::{ExecutorError, MAX_CONCURRENT_CLASSIFICATIONS, run_bounded};
use crate::tab_data::{GroupProposal, Tab, TabGroup};

/// Answer meaning "no group fits"
pub const NO_GROUP: &str = "none";

/// Prompt asking which of `titles` best fits `tab`
pub fn group_prompt(tab: &Tab, titles: &[&str]) -> String {
    let titles_json = serde_json::to_string(titles).unwrap_or_default();
    format!(
        "Which group does the tab \"{}\" with url \"{}\" best fit in, given the following groups? {}. \
         Respond with just the name of the group, or with \"{}\" if unsure.",
        tab.title, tab.url, titles_json, NO_GROUP
    )
}

/// Look up the group a classification answer names. Matching is exact and
/// case-sensitive; `none` never resolves.
pub fn resolve_group<'a>(answer: &str, groups_by_title: &HashMap<&str, &'a TabGroup>) -> Option<&'a TabGroup> {
    if answer == NO_GROUP {
        return None;
    }
    groups_by_title.get(answer).copied()
}

/// Classify every tab against the titled `groups` and propose one group (or
/// none) per tab, in input order. A failed classification yields a proposal
/// with no group rather than dropping the tab.
pub async fn categorize<C: Classifier>(
    classifier: &C,
    model: &str,
    tabs: &[Tab],
    groups: &[TabGroup],
) -> Result<Vec<GroupProposal>, ExecutorError> {
    // Later groups win when titles collide
    let groups_by_title: HashMap<&str, &TabGroup> = groups
        .iter()
        .filter_map(|group| group.named_title().map(|title| (title, group)))
        .collect();

    let titles: Vec<&str> = groups
        .iter()
        .filter_map(TabGroup::named_title)
        .collect();

    if titles.is_empty() {
        debug!("No titled groups, proposing no group for {} tabs", tabs.len());
        return Ok(tabs
            .iter()
            .map(|tab| GroupProposal {
                tab: tab.clone(),
                group: None,
            })
            .collect());
    }

    let groups_by_title = &groups_by_title;
    let titles = &titles;
    let tasks = tabs.iter().map(move |tab| {
        move || async move {
            let request = ClassificationRequest::new(model, group_prompt(tab, titles), ResponseShape::Text)
                .named("tab_group");

            let group = match classifier.classify(request).await {
                Ok(value) => {
                    let answer = value.as_str().unwrap_or(NO_GROUP);
                    debug!("Tab {:?} {:?} fits group {:?}", tab.id, tab.title, answer);
                    resolve_group(answer, groups_by_title).cloned()
                }
                Err(e) => {
                    warn!("Categorize failed for tab {:?}: {}", tab.id, e);
                    None
                }
            };

            GroupProposal {
                tab: tab.clone(),
                group,
            }
        }
    });

    run_bounded(tasks, MAX_CONCURRENT_CLASSIFICATIONS).await
}
