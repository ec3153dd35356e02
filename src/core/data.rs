use std::{cell::RefCell, collections::HashSet, rc::Rc, time::Duration};

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{
    core::{fetch::Fetch, prefs::Language},
    error::{Error, Result},
};

pub const PROJECTS_DIR: &str = "assets/data";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: u32,
    pub title: String,
    pub short_description: String,
    pub description: String,
    #[serde(default)]
    pub project_tags: Vec<String>,
    #[serde(rename = "imgURL", default)]
    pub img_url: Vec<Media>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<String>,
    #[serde(default)]
    pub objectif: Vec<String>,
    #[serde(default)]
    pub tech_used: Vec<TechGroup>,
    #[serde(default)]
    pub features: Vec<Highlight>,
    #[serde(default)]
    pub challenges: Vec<Highlight>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<String>,
    #[serde(default)]
    pub what_learned: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsive: Option<Responsive>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

/// WebP variants at 480, 768, 1280 and 1920 px widths.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Responsive {
    pub mobile: Option<String>,
    pub tablet: Option<String>,
    pub desktop: Option<String>,
    pub large: Option<String>,
}

impl Responsive {
    pub fn srcset(&self) -> String {
        [
            (&self.mobile, 480),
            (&self.tablet, 768),
            (&self.desktop, 1280),
            (&self.large, 1920),
        ]
        .into_iter()
        .filter_map(|(url, width)| url.as_ref().map(|url| format!("{} {}w", url, width)))
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TechGroup {
    pub title: String,
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Highlight {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

impl Project {
    pub fn has_hero(&self) -> bool {
        self.hero_image.is_some() || !self.img_url.is_empty()
    }
}

pub fn projects_path(language: Language) -> String {
    format!("{}/Projects_{}.json", PROJECTS_DIR, language.code())
}

/// Decodes a project collection and checks the record invariants.
pub fn parse_projects(body: &[u8]) -> Result<Vec<Project>> {
    let projects = serde_json::from_slice::<Vec<Project>>(body)?;
    let mut ids = HashSet::new();
    for project in &projects {
        if !ids.insert(project.id) {
            return Err(Error::Validation(format!("duplicate project id {}", project.id)));
        }
        if let Some(media) = project.img_url.iter().find(|media| media.url.trim().is_empty()) {
            return Err(Error::Validation(format!(
                "project {} has gallery entry \"{}\" without url",
                project.id, media.title
            )));
        }
    }
    Ok(projects)
}

pub type ProjectList = Rc<Vec<Project>>;
type SharedLoad = Shared<LocalBoxFuture<'static, ProjectList>>;

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retries: 3,
            delay: Duration::ZERO,
        }
    }
}

struct LoadState {
    language: Language,
    load: Option<SharedLoad>,
    published: bool,
}

/// Per-language, retried, shared project loading.
///
/// The first [`DataService::projects`] call for a language starts one request;
/// every other caller, concurrent or later, shares its result until the
/// language changes. A language change supersedes the pending load: callers
/// still waiting on it move to the new language and its result is never
/// published.
pub struct DataService<F: Fetch + 'static> {
    fetcher: Rc<F>,
    policy: RetryPolicy,
    state: RefCell<LoadState>,
    generation: watch::Sender<u64>,
    latest: watch::Sender<Option<ProjectList>>,
}

impl<F: Fetch + 'static> DataService<F> {
    pub fn new(fetcher: Rc<F>, language: Language, policy: RetryPolicy) -> Self {
        DataService {
            fetcher,
            policy,
            state: RefCell::new(LoadState {
                language,
                load: None,
                published: false,
            }),
            generation: watch::channel(0).0,
            latest: watch::channel(None).0,
        }
    }

    pub fn language(&self) -> Language {
        self.state.borrow().language
    }

    pub fn set_language(&self, language: Language) {
        let mut state = self.state.borrow_mut();
        if state.language == language {
            return;
        }
        tracing::info!(from = %state.language, to = %language, "Switching project language");
        state.language = language;
        state.load = None;
        state.published = false;
        drop(state);
        self.latest.send_replace(None);
        self.generation.send_modify(|generation| *generation += 1);
    }

    /// Replays the last published collection to new subscribers, then every
    /// later one. Holds `None` until a load for the current language completes.
    pub fn subscribe(&self) -> watch::Receiver<Option<ProjectList>> {
        self.latest.subscribe()
    }

    pub async fn projects(&self) -> ProjectList {
        loop {
            let mut changes = self.generation.subscribe();
            let generation = *changes.borrow_and_update();
            let load = self.current_load();
            tokio::select! {
                projects = load => {
                    if *self.generation.borrow() != generation {
                        continue;
                    }
                    let mut state = self.state.borrow_mut();
                    if !state.published {
                        state.published = true;
                        self.latest.send_replace(Some(projects.clone()));
                    }
                    return projects;
                }
                _ = changes.changed() => {
                    tracing::debug!("Pending project load superseded");
                }
            }
        }
    }

    pub async fn project_by_id(&self, id: u32) -> Option<Project> {
        self.projects()
            .await
            .iter()
            .find(|project| project.id == id)
            .cloned()
    }

    fn current_load(&self) -> SharedLoad {
        let mut state = self.state.borrow_mut();
        if let Some(load) = &state.load {
            return load.clone();
        }
        let path = projects_path(state.language);
        let load = load_projects(self.fetcher.clone(), path, self.policy)
            .boxed_local()
            .shared();
        state.load = Some(load.clone());
        load
    }
}

async fn load_projects<F: Fetch>(fetcher: Rc<F>, path: String, policy: RetryPolicy) -> ProjectList {
    let attempts = policy.retries + 1;
    for attempt in 1..=attempts {
        let result = match fetcher.get(&path).await {
            Ok(body) => parse_projects(&body),
            Err(error) => Err(error),
        };
        match result {
            Ok(projects) => {
                tracing::info!(%path, count = projects.len(), "Projects data loaded");
                return Rc::new(projects);
            }
            Err(error) if attempt < attempts => {
                tracing::warn!(%path, attempt, "Projects data load failed, retrying: {}", error);
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            Err(error) => {
                tracing::error!(%path, attempts, "Projects data unavailable: {}", error);
            }
        }
    }
    Rc::new(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::{cell::Cell, collections::HashMap};

    const PROJECTS_EN: &str = r#"[
        {"id": 1, "title": "Folio", "shortDescription": "Portfolio", "description": "Site",
         "projectTags": ["angular", "scss"],
         "imgURL": [{"url": "a.png", "title": "Home", "type": "image",
                     "responsive": {"mobile": "a-480.webp", "large": "a-1920.webp"}}]},
        {"id": 2, "title": "Weather", "shortDescription": "App", "description": "Forecasts",
         "techUsed": [{"title": "Frontend", "names": ["TypeScript"]}],
         "metrics": [{"label": "Lighthouse", "value": "98"}]}
    ]"#;
    const PROJECTS_IT: &str = r#"[{"id": 1, "title": "Folio", "shortDescription": "Portfolio", "description": "Sito"}]"#;

    enum Reply {
        Json(&'static str),
        Fail,
        Hang,
    }

    struct ScriptedFetcher {
        replies: HashMap<String, Reply>,
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptedFetcher {
        fn new(replies: Vec<(Language, Reply)>) -> (Self, Rc<RefCell<Vec<String>>>) {
            let calls = Rc::new(RefCell::new(Vec::new()));
            let fetcher = ScriptedFetcher {
                replies: replies
                    .into_iter()
                    .map(|(language, reply)| (projects_path(language), reply))
                    .collect(),
                calls: calls.clone(),
            };
            (fetcher, calls)
        }
    }

    #[async_trait(?Send)]
    impl Fetch for ScriptedFetcher {
        async fn get(&self, path: &str) -> Result<Vec<u8>> {
            self.calls.borrow_mut().push(path.to_string());
            match self.replies.get(path) {
                Some(Reply::Json(body)) => Ok(body.as_bytes().to_vec()),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(Error::fetch(path, "timed out"))
                }
                Some(Reply::Fail) | None => Err(Error::fetch(path, "connection refused")),
            }
        }
    }

    fn service(replies: Vec<(Language, Reply)>) -> (DataService<ScriptedFetcher>, Rc<RefCell<Vec<String>>>) {
        let (fetcher, calls) = ScriptedFetcher::new(replies);
        (DataService::new(Rc::new(fetcher), Language::En, RetryPolicy::default()), calls)
    }

    #[actix_web::test]
    async fn finds_projects_by_id() {
        let (service, calls) = service(vec![(Language::En, Reply::Json(PROJECTS_EN))]);
        let project = service.project_by_id(2).await.unwrap();
        assert_eq!(project.title, "Weather");
        assert_eq!(project.tech_used[0].names, vec!["TypeScript"]);
        assert!(service.project_by_id(99).await.is_none());
        assert_eq!(calls.borrow().len(), 1);
    }

    #[actix_web::test]
    async fn repeated_and_concurrent_calls_share_one_fetch() {
        let (service, calls) = service(vec![(Language::En, Reply::Json(PROJECTS_EN))]);
        let (first, second) = futures::join!(service.projects(), service.projects());
        assert!(Rc::ptr_eq(&first, &second));
        let third = service.projects().await;
        assert!(Rc::ptr_eq(&first, &third));
        assert_eq!(*calls.borrow(), vec!["assets/data/Projects_en.json"]);
    }

    #[actix_web::test]
    async fn failures_retry_three_times_then_settle_empty() {
        let (service, calls) = service(vec![(Language::En, Reply::Fail)]);
        let mut receiver = service.subscribe();
        assert!(service.projects().await.is_empty());
        assert_eq!(calls.borrow().len(), 4);

        assert!(receiver.has_changed().unwrap());
        assert_eq!(receiver.borrow_and_update().as_ref().map(|list| list.len()), Some(0));

        assert!(service.projects().await.is_empty());
        assert_eq!(calls.borrow().len(), 4);
    }

    #[actix_web::test]
    async fn malformed_payload_is_retried_like_network_errors() {
        let (service, calls) = service(vec![(Language::En, Reply::Json("{\"not\": \"a list\"}"))]);
        assert!(service.projects().await.is_empty());
        assert_eq!(calls.borrow().len(), 4);
    }

    #[actix_web::test]
    async fn language_change_refetches_once() {
        let (service, calls) = service(vec![
            (Language::En, Reply::Json(PROJECTS_EN)),
            (Language::It, Reply::Json(PROJECTS_IT)),
        ]);
        assert_eq!(service.projects().await.len(), 2);
        service.set_language(Language::It);
        service.set_language(Language::It);
        assert_eq!(service.projects().await.len(), 1);
        assert_eq!(service.projects().await[0].description, "Sito");
        assert_eq!(
            *calls.borrow(),
            vec!["assets/data/Projects_en.json", "assets/data/Projects_it.json"]
        );
    }

    #[actix_web::test]
    async fn language_change_supersedes_pending_load() {
        let (service, calls) = service(vec![
            (Language::En, Reply::Hang),
            (Language::It, Reply::Json(PROJECTS_IT)),
        ]);
        let receiver = service.subscribe();
        let switched = Cell::new(false);
        let (projects, _) = futures::join!(service.projects(), async {
            tokio::task::yield_now().await;
            service.set_language(Language::It);
            switched.set(true);
        });
        assert!(switched.get());
        assert_eq!(projects[0].description, "Sito");
        assert_eq!(
            *calls.borrow(),
            vec!["assets/data/Projects_en.json", "assets/data/Projects_it.json"]
        );
        assert_eq!(receiver.borrow().as_ref().map(|list| list.len()), Some(1));
    }

    #[actix_web::test]
    async fn late_subscribers_get_the_last_value() {
        let (service, _) = service(vec![(Language::En, Reply::Json(PROJECTS_EN))]);
        service.projects().await;
        let receiver = service.subscribe();
        assert_eq!(receiver.borrow().as_ref().map(|list| list.len()), Some(2));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let body = br#"[{"id": 1, "title": "a", "shortDescription": "", "description": ""},
                        {"id": 1, "title": "b", "shortDescription": "", "description": ""}]"#;
        let error = parse_projects(body).unwrap_err();
        assert!(error.is_parse());
        assert!(matches!(error, Error::Validation(_)));
    }

    #[test]
    fn gallery_fields_decode() {
        let projects = parse_projects(PROJECTS_EN.as_bytes()).unwrap();
        let media = &projects[0].img_url[0];
        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(
            media.responsive.as_ref().unwrap().srcset(),
            "a-480.webp 480w, a-1920.webp 1920w"
        );
        assert!(projects[0].has_hero());
        assert!(!projects[1].has_hero());
    }
}
