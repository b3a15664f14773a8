/// Side panel: tab tree, natural-language query, group proposals, settings

use std::cell::RefCell;
use std::rc::Rc;

use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::batch::BatchState;
use crate::browser::{Browser, ChromeBrowser, load_snapshot, subscribe_browser_events};
use crate::categorizer::categorize;
use crate::classify::ChatClient;
use crate::matcher::match_tabs;
use crate::snapshot::{GroupBucket, PanelAction, PanelState, WindowBucket};
use crate::storage::{Settings, SettingsStore, SyncSettingsStore};
use crate::tab_data::{GroupId, GroupProposal, Tab, TabId, WindowId};
use crate::ui::components::{GroupTag, TabTitle};

impl Reducible for PanelState {
    type Action = PanelAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        Rc::new(self.apply(action))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum SettingsField {
    Endpoint,
    ApiKey,
    Model,
}

#[function_component(SidePanel)]
pub fn side_panel() -> Html {
    let panel = use_reducer(PanelState::default);
    let settings = use_state(Settings::default);
    let error = use_state(|| None::<String>);
    let query = use_state(String::new);
    let query_batch = use_mut_ref(BatchState::<Vec<Tab>>::default);
    let categorize_batch = use_mut_ref(BatchState::<Vec<GroupProposal>>::default);
    let rerender = use_force_update();
    let refresh_seq = use_mut_ref(|| 0u64);

    // Load settings, take the first snapshot and follow browser events
    {
        let dispatcher = panel.dispatcher();
        let settings = settings.clone();
        let error = error.clone();
        let refresh_seq = refresh_seq.clone();

        use_effect_with((), move |_| {
            {
                let error = error.clone();
                spawn_local(async move {
                    match SyncSettingsStore.load().await {
                        Ok(loaded) => settings.set(loaded),
                        Err(e) => error.set(Some(format!("Failed to load settings: {}", e))),
                    }
                });
            }

            spawn_local(refresh(dispatcher.clone(), error.clone(), next_seq(&refresh_seq)));
            subscribe_browser_events(move || {
                spawn_local(refresh(dispatcher.clone(), error.clone(), next_seq(&refresh_seq)));
            });
            || ()
        });
    }

    let on_query_input = {
        let query = query.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                query.set(input.value());
            }
        })
    };

    // Query tabs handler
    let on_query_submit = {
        let dispatcher = panel.dispatcher();
        let tabs = panel.snapshot.tabs().to_vec();
        let query = query.clone();
        let settings = settings.clone();
        let error = error.clone();
        let query_batch = query_batch.clone();
        let rerender = rerender.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();

            let client = ChatClient::new(&settings);
            if let Some(config_error) = client.configuration_error() {
                error.set(Some(config_error.to_string()));
                return;
            }
            if let Err(e) = query_batch.borrow_mut().start() {
                log::warn!("Query ignored: {}", e);
                return;
            }
            error.set(None);
            dispatcher.dispatch(PanelAction::ClearSelection);
            rerender.force_update();

            let dispatcher = dispatcher.clone();
            let tabs = tabs.clone();
            let query_text = (*query).clone();
            let model = settings.model().to_string();
            let error = error.clone();
            let query_batch = query_batch.clone();
            let rerender = rerender.clone();

            spawn_local(async move {
                let on_match = {
                    let dispatcher = dispatcher.clone();
                    move |id: TabId| dispatcher.dispatch(PanelAction::Matched(id))
                };
                let result = match_tabs(&client, &model, &query_text, &tabs, on_match).await;

                match &result {
                    Ok(matches) => log::info!("{} of {} tabs match {:?}", matches.len(), tabs.len(), query_text),
                    Err(e) => error.set(Some(format!("Query failed: {}", e))),
                }
                query_batch.borrow_mut().settle(result);
                rerender.force_update();
            });
        })
    };

    // Categorize selected tabs handler
    let on_categorize = {
        let dispatcher = panel.dispatcher();
        let selected_tabs = panel.selected_tabs();
        let groups = panel.snapshot.titled_groups();
        let settings = settings.clone();
        let error = error.clone();
        let categorize_batch = categorize_batch.clone();
        let rerender = rerender.clone();

        Callback::from(move |_| {
            let client = ChatClient::new(&settings);
            if let Some(config_error) = client.configuration_error() {
                error.set(Some(config_error.to_string()));
                return;
            }
            if let Err(e) = categorize_batch.borrow_mut().start() {
                log::warn!("Categorize ignored: {}", e);
                return;
            }
            error.set(None);
            rerender.force_update();

            let dispatcher = dispatcher.clone();
            let tabs = selected_tabs.clone();
            let groups = groups.clone();
            let model = settings.model().to_string();
            let error = error.clone();
            let categorize_batch = categorize_batch.clone();
            let rerender = rerender.clone();

            spawn_local(async move {
                let result = categorize(&client, &model, &tabs, &groups).await;

                match &result {
                    Ok(proposals) => dispatcher.dispatch(PanelAction::Proposals(proposals.clone())),
                    Err(e) => error.set(Some(format!("Categorize failed: {}", e))),
                }
                categorize_batch.borrow_mut().settle(result);
                rerender.force_update();
            });
        })
    };

    let on_activate = {
        let error = error.clone();
        Callback::from(move |tab_id: TabId| {
            let error = error.clone();
            spawn_local(async move {
                if let Err(e) = ChromeBrowser.activate_tab(tab_id).await {
                    error.set(Some(e.to_string()));
                }
            });
        })
    };

    let on_close = {
        let error = error.clone();
        Callback::from(move |tab_id: TabId| {
            let error = error.clone();
            spawn_local(async move {
                if let Err(e) = ChromeBrowser.remove_tab(tab_id).await {
                    error.set(Some(e.to_string()));
                }
            });
        })
    };

    let on_toggle_selected = {
        let dispatcher = panel.dispatcher();
        let selected = panel.selected.clone();
        Callback::from(move |tab_id: TabId| {
            let mut ids = selected.clone();
            if !ids.insert(tab_id) {
                ids.remove(&tab_id);
            }
            dispatcher.dispatch(PanelAction::Select(ids));
        })
    };

    // Commit a proposal: move the tab into the proposed group
    let on_commit = {
        let dispatcher = panel.dispatcher();
        let error = error.clone();
        Callback::from(move |(tab_id, group_id): (TabId, Option<GroupId>)| {
            let dispatcher = dispatcher.clone();
            let error = error.clone();
            spawn_local(async move {
                match ChromeBrowser.group_tab(tab_id, group_id).await {
                    Ok(()) => dispatcher.dispatch(PanelAction::ProposalCommitted(tab_id)),
                    Err(e) => error.set(Some(e.to_string())),
                }
            });
        })
    };

    let on_settings_input = {
        let settings = settings.clone();
        let error = error.clone();
        move |field: SettingsField| {
            let settings = settings.clone();
            let error = error.clone();
            Callback::from(move |e: InputEvent| {
                let Some(input) = e.target_dyn_into::<HtmlInputElement>() else {
                    return;
                };
                let mut updated = (*settings).clone();
                match field {
                    SettingsField::Endpoint => updated.base_url = input.value(),
                    SettingsField::ApiKey => updated.api_key = input.value(),
                    SettingsField::Model => updated.model = input.value(),
                }
                settings.set(updated.clone());

                let error = error.clone();
                spawn_local(async move {
                    if let Err(e) = SyncSettingsStore.save(&updated).await {
                        error.set(Some(format!("Failed to save settings: {}", e)));
                    }
                });
            })
        }
    };

    let query_running = query_batch.borrow().is_running();
    let categorize_running = categorize_batch.borrow().is_running();
    let current_tab_id = panel.snapshot.current_tab_id;
    let current_window_id = panel.snapshot.current_window_id;

    html! {
        <div class="side-panel">
            <div id="top-panel">
                <form onsubmit={on_query_submit}>
                    <input
                        type="text"
                        name="tab-query"
                        placeholder="Query Tabs..."
                        value={(*query).clone()}
                        oninput={on_query_input}
                        disabled={query_running}
                        class="search-input"
                    />
                    if query_running {
                        <Spinner />
                    }
                </form>
            </div>

            if let Some(message) = (*error).clone() {
                <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                    {message}
                </Alert>
            }

            <main id="tabs">
                {for panel.snapshot.buckets().into_iter().enumerate().map(|(i, window)| {
                    render_window(i, window, current_window_id, current_tab_id, &panel, &on_activate, &on_close, &on_toggle_selected)
                })}
            </main>

            <div id="bottom-panel">
                <section id="organizer" class="subpanel">
                    if !panel.selected.is_empty() {
                        <div id="list-selected">
                            <label>{"Selected"}</label>
                            {for panel.selected_tabs().into_iter().map(|tab| render_selected(tab, current_tab_id, &on_activate))}
                        </div>
                    }
                    if let Some(proposals) = panel.proposals.clone() {
                        <div id="list-proposals">
                            <label>{"Proposals"}</label>
                            {for proposals.into_iter().map(|proposal| render_proposal(proposal, current_tab_id, &on_activate, &on_commit))}
                        </div>
                    }
                </section>

                <section id="controls" class="subpanel">
                    <Button onclick={on_categorize} disabled={categorize_running} variant={ButtonVariant::Secondary} block={true}>
                        {"Categorize Tabs"}
                    </Button>
                    if categorize_running {
                        <Spinner />
                    }
                </section>

                <section id="panel-settings" class="subpanel">
                    <label>{"Endpoint"}</label>
                    <input
                        type="text"
                        value={settings.base_url.clone()}
                        oninput={on_settings_input(SettingsField::Endpoint)}
                    />
                    <label>{"API Key"}</label>
                    <input
                        type="password"
                        value={settings.api_key.clone()}
                        oninput={on_settings_input(SettingsField::ApiKey)}
                    />
                    <label>{"Model"}</label>
                    <input
                        type="text"
                        value={settings.model.clone()}
                        oninput={on_settings_input(SettingsField::Model)}
                    />
                </section>
            </div>
        </div>
    }
}

fn next_seq(counter: &RefCell<u64>) -> u64 {
    let mut seq = counter.borrow_mut();
    *seq += 1;
    *seq
}

// Reads can overlap; the reducer drops a result older than the one shown
async fn refresh(
    dispatcher: UseReducerDispatcher<PanelState>,
    error: UseStateHandle<Option<String>>,
    seq: u64,
) {
    match load_snapshot(&ChromeBrowser).await {
        Ok(snapshot) => dispatcher.dispatch(PanelAction::Refresh { seq, snapshot }),
        Err(e) => error.set(Some(format!("Failed to read tabs: {}", e))),
    }
}

#[allow(clippy::too_many_arguments)]
fn render_window(
    ordinal: usize,
    window: WindowBucket<'_>,
    current_window_id: Option<WindowId>,
    current_tab_id: Option<TabId>,
    panel: &PanelState,
    on_activate: &Callback<TabId>,
    on_close: &Callback<TabId>,
    on_toggle_selected: &Callback<TabId>,
) -> Html {
    let is_current = current_window_id == Some(window.window_id);

    html! {
        <div class="item-window">
            <div class="label-window">
                {format!("Window {} ", ordinal)}
                <label class="window-id">{window.window_id}</label>
            </div>
            {for window.groups.into_iter().map(|group| {
                render_group(group, is_current, current_tab_id, panel, on_activate, on_close, on_toggle_selected)
            })}
        </div>
    }
}

fn render_group(
    bucket: GroupBucket<'_>,
    in_current_window: bool,
    current_tab_id: Option<TabId>,
    panel: &PanelState,
    on_activate: &Callback<TabId>,
    on_close: &Callback<TabId>,
    on_toggle_selected: &Callback<TabId>,
) -> Html {
    let expanded = in_current_window && !bucket.group.is_some_and(|g| g.collapsed);

    html! {
        <div class={classes!("item-group", expanded.then_some("expanded"))}>
            <div class="label-group"><GroupTag group={bucket.group.cloned()} /></div>
            {for bucket.tabs.into_iter().map(|tab| {
                render_tab(tab, current_tab_id, panel, on_activate, on_close, on_toggle_selected)
            })}
        </div>
    }
}

fn render_tab(
    tab: &Tab,
    current_tab_id: Option<TabId>,
    panel: &PanelState,
    on_activate: &Callback<TabId>,
    on_close: &Callback<TabId>,
    on_toggle_selected: &Callback<TabId>,
) -> Html {
    let Some(id) = tab.id else {
        return html! {
            <div class="item-tab"><TabTitle tab={tab.clone()} /></div>
        };
    };

    let class = classes!("item-tab", (current_tab_id == Some(id)).then_some("active"));

    html! {
        <div class={class} key={id}>
            <input
                type="checkbox"
                checked={panel.selected.contains(&id)}
                onclick={on_toggle_selected.reform(move |_: MouseEvent| id)}
            />
            <TabTitle tab={tab.clone()} onclick={on_activate.reform(move |_: MouseEvent| id)} />
            <button class="tab-close" title="Close" onclick={on_close.reform(move |_: MouseEvent| id)}>
                {"×"}
            </button>
        </div>
    }
}

fn render_selected(tab: Tab, current_tab_id: Option<TabId>, on_activate: &Callback<TabId>) -> Html {
    let onclick = tab.id.map(|id| on_activate.reform(move |_: MouseEvent| id));
    let class = classes!("item-selected", (tab.id.is_some() && tab.id == current_tab_id).then_some("active"));

    html! {
        <div class={class}>
            <TabTitle tab={tab} onclick={onclick} />
        </div>
    }
}

fn render_proposal(
    proposal: GroupProposal,
    current_tab_id: Option<TabId>,
    on_activate: &Callback<TabId>,
    on_commit: &Callback<(TabId, Option<GroupId>)>,
) -> Html {
    let Some(id) = proposal.tab.id else {
        return html! {};
    };
    let group_id = proposal.group.as_ref().map(|g| g.id);
    let class = classes!("item-proposal", (current_tab_id == Some(id)).then_some("active"));

    html! {
        <div class={class} key={id}>
            <TabTitle tab={proposal.tab} onclick={on_activate.reform(move |_: MouseEvent| id)} />
            <GroupTag group={proposal.group} onclick={on_commit.reform(move |_: MouseEvent| (id, group_id))} />
        </div>
    }
}
