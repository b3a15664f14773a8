/// Natural-language tab search: one boolean classification per tab

use log::{debug, warn};

use crate::classify::{ClassificationRequest, Classifier, ResponseShape};
use crate::executor::{ExecutorError, MAX_CONCURRENT_CLASSIFICATIONS, run_bounded};
use crate::tab_data::{QueryMatch, Tab, TabId};

const SCHEMA_NAME: &str = "tab_matches_query";

/// Prompt asking whether `tab` satisfies `query`
pub fn match_prompt(query: &str, tab: &Tab) -> String {
    let description = serde_json::to_string_pretty(tab).unwrap_or_else(|_| format!("{:?}", tab));
    format!(
        "Respond with lowercase 'true' or 'false', and nothing else. \
         Given the query: \"{}\", does the following browser tab match?\n{}",
        query, description
    )
}

/// Classify every tab against `query` and return the ones that match.
///
/// `on_match` is called with each matching tab's id as soon as its verdict
/// arrives, so callers can show progress before the batch settles. Tabs
/// whose classification fails count as non-matching.
pub async fn match_tabs<C, F>(
    classifier: &C,
    model: &str,
    query: &str,
    tabs: &[Tab],
    on_match: F,
) -> Result<Vec<Tab>, ExecutorError>
where
    C: Classifier,
    F: Fn(TabId),
{
    if tabs.is_empty() {
        return Ok(Vec::new());
    }

    let on_match = &on_match;
    let tasks = tabs.iter().map(move |tab| {
        move || async move {
            let request = ClassificationRequest::new(model, match_prompt(query, tab), ResponseShape::Boolean)
                .named(SCHEMA_NAME);

            let matched = match classifier.classify(request).await {
                Ok(value) => value.as_bool().unwrap_or(false),
                Err(e) => {
                    warn!("Match failed for tab {:?}: {}", tab.id, e);
                    false
                }
            };
            debug!("Tab {:?} {:?} matches {:?}: {}", tab.id, tab.title, query, matched);

            if matched {
                if let Some(id) = tab.id {
                    on_match(id);
                }
            }

            QueryMatch {
                tab: tab.clone(),
                matched,
            }
        }
    });

    let verdicts = run_bounded(tasks, MAX_CONCURRENT_CLASSIFICATIONS).await?;

    Ok(verdicts
        .into_iter()
        .filter(|verdict| verdict.matched)
        .map(|verdict| verdict.tab)
        .collect())
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::classify::{ClassificationValue, ClassifyError};
    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    /// Answers `true` for tabs whose title is in `matching`
    struct TitleStub {
        matching: Vec<&'static str>,
        failing: Vec<&'static str>,
        calls: Cell<usize>,
    }

    impl TitleStub {
        fn new(matching: Vec<&'static str>) -> Self {
            TitleStub {
                matching,
                failing: Vec::new(),
                calls: Cell::new(0),
            }
        }
    }

    impl Classifier for TitleStub {
        async fn classify(&self, request: ClassificationRequest) -> crate::classify::Result<ClassificationValue> {
            self.calls.set(self.calls.get() + 1);
            assert_eq!(request.shape, ResponseShape::Boolean);
            assert_eq!(request.schema_name, SCHEMA_NAME);

            if self.failing.iter().any(|title| request.prompt.contains(title)) {
                return Err(ClassifyError::Transport("connection reset".into()));
            }
            let matched = self.matching.iter().any(|title| request.prompt.contains(title));
            Ok(ClassificationValue::Boolean(matched))
        }
    }

    fn shopping_tabs() -> Vec<Tab> {
        vec![
            Tab::new(1, 1, "Rust Book", "https://doc.rust-lang.org/book/"),
            Tab::new(2, 1, "Cart - Online Store", "https://store.example.com/cart"),
            Tab::new(3, 1, "Inbox", "https://mail.example.com/"),
        ]
    }

    #[test]
    fn test_prompt_embeds_query_and_tab() {
        let tab = Tab::new(2, 1, "Cart - Online Store", "https://store.example.com/cart");

        let prompt = match_prompt("shopping", &tab);

        assert!(prompt.contains("\"shopping\""));
        assert!(prompt.contains("\"title\": \"Cart - Online Store\""));
        assert!(prompt.contains("\"url\": \"https://store.example.com/cart\""));
        assert!(prompt.contains("\"windowId\": 1"));
    }

    #[tokio::test]
    async fn test_no_tabs_never_calls_classifier() {
        let stub = TitleStub::new(vec!["anything"]);

        let matches = match_tabs(&stub, "m", "shopping", &[], |_| {}).await.unwrap();

        assert!(matches.is_empty());
        assert_eq!(stub.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_shopping_query_selects_one_tab() {
        let stub = TitleStub::new(vec!["Cart - Online Store"]);
        let tabs = shopping_tabs();
        let reported = RefCell::new(Vec::new());

        let matches = match_tabs(&stub, "m", "shopping", &tabs, |id| reported.borrow_mut().push(id))
            .await
            .unwrap();

        assert_eq!(matches, vec![tabs[1].clone()]);
        assert_eq!(*reported.borrow(), vec![2]);
        assert_eq!(stub.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_failed_classification_is_no_match() {
        let mut stub = TitleStub::new(vec!["Rust Book", "Inbox"]);
        stub.failing.push("Inbox");
        let tabs = shopping_tabs();

        let matches = match_tabs(&stub, "m", "reading", &tabs, |_| {}).await.unwrap();

        assert_eq!(matches, vec![tabs[0].clone()]);
    }

    #[tokio::test]
    async fn test_tab_without_id_is_returned_but_not_reported() {
        let stub = TitleStub::new(vec!["Settings"]);
        let mut tab = Tab::new(0, 1, "Settings", "chrome://settings");
        tab.id = None;
        let reported = RefCell::new(Vec::new());

        let matches = match_tabs(&stub, "m", "settings", &[tab.clone()], |id| reported.borrow_mut().push(id))
            .await
            .unwrap();

        assert_eq!(matches, vec![tab]);
        assert!(reported.borrow().is_empty());
    }

    /// Earlier tabs answer later, so progress arrives in completion order
    struct SlowFirst;

    impl Classifier for SlowFirst {
        async fn classify(&self, request: ClassificationRequest) -> crate::classify::Result<ClassificationValue> {
            let delay = if request.prompt.contains("\"id\": 1,") { 50 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(ClassificationValue::Boolean(true))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_matches_reported_as_they_resolve() {
        let tabs = vec![
            Tab::new(1, 1, "First", "https://one.example.com/"),
            Tab::new(2, 1, "Second", "https://two.example.com/"),
        ];
        let reported = RefCell::new(Vec::new());

        let matches = match_tabs(&SlowFirst, "m", "q", &tabs, |id| reported.borrow_mut().push(id))
            .await
            .unwrap();

        assert_eq!(*reported.borrow(), vec![2, 1]);
        assert_eq!(matches, tabs);
    }
}
