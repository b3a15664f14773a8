/// Reusable UI components

use yew::prelude::*;

use crate::tab_data::{GROUP_ID_UNGROUPED, Tab, TabGroup};

#[derive(Properties, PartialEq)]
pub struct TabTitleProps {
    pub tab: Tab,
    #[prop_or_default]
    pub onclick: Option<Callback<MouseEvent>>,
}

#[function_component(TabTitle)]
pub fn tab_title(props: &TabTitleProps) -> Html {
    let title = if props.tab.title.is_empty() {
        props.tab.url.clone()
    } else {
        props.tab.title.clone()
    };

    html! {
        <span class="tab-title" title={props.tab.url.clone()} onclick={props.onclick.clone()}>
            {title}
        </span>
    }
}

#[derive(Properties, PartialEq)]
pub struct GroupTagProps {
    pub group: Option<TabGroup>,
    #[prop_or_default]
    pub onclick: Option<Callback<MouseEvent>>,
}

/// A group's title in its colour, or "Ungrouped"
#[function_component(GroupTag)]
pub fn group_tag(props: &GroupTagProps) -> Html {
    match &props.group {
        Some(group) if group.id != GROUP_ID_UNGROUPED => {
            let class = classes!("group-tag", format!("group-tag-{}", group.color.as_str()));
            html! {
                <span class={class} onclick={props.onclick.clone()}>
                    {group.named_title().unwrap_or("Unnamed Group")}
                </span>
            }
        }
        _ => html! {
            <em class="group-tag-none" onclick={props.onclick.clone()}>{"Ungrouped"}</em>
        },
    }
}
