//! Presentation: routing, project list, project detail, navigation and the
//! language/theme controls, rendered as plain text.

use std::{cell::RefCell, fmt::Write as _, rc::Rc};

use tokio::sync::watch;

use crate::core::{
    data::{DataService, Project, RetryPolicy},
    fetch::Fetch,
    i18n::{Translations, Translator},
    prefs::{Language, Preferences, Theme},
    reveal::{ElementBox, ElementId, RevealController, RevealHost, RevealOptions, Viewport},
};

pub const LINE_HEIGHT: f64 = 24.0;
pub const HERO_SECTION: &str = "#hero-section";
const REVEALABLE_CLASS: &str = "animate-on-scroll";

pub const NAV_LINKS: [(&str, &str, &str); 4] = [
    ("#hero-section", "nav.home", "Home"),
    ("#about-section", "nav.about", "About"),
    ("#projects-section", "nav.projects", "Projects"),
    ("#contact-section", "nav.contact", "Contact"),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Portfolio,
    /// `project/:id`; `None` when the parameter is missing or not a number.
    Project(Option<u32>),
}

impl Route {
    /// Unknown paths redirect to the portfolio page.
    pub fn resolve(path: &str) -> Route {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or("")
            .trim_matches('/');
        if path.is_empty() {
            return Route::Portfolio;
        }
        match path.split_once('/') {
            Some(("project", id)) if !id.contains('/') => Route::Project(parse_project_id(id)),
            None if path == "project" => Route::Project(None),
            _ => {
                tracing::debug!(path, "Unknown route, redirecting to portfolio");
                Route::Portfolio
            }
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Portfolio => "Portfolio",
            Route::Project(_) => "Project Details",
        }
    }
}

/// Numeric route parameter. Integral decimal forms such as `2.0` or `2e0`
/// name the same project as `2`.
pub fn parse_project_id(param: &str) -> Option<u32> {
    let value = param.trim().parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) {
        Some(value as u32)
    } else {
        None
    }
}

/// Turns a `browse` target into a route path: a bare project id becomes
/// `/project/{id}`, anything else is taken as a path.
pub fn route_path(target: &str) -> String {
    if !target.is_empty() && target.bytes().all(|byte| byte.is_ascii_digit()) {
        format!("/project/{}", target)
    } else {
        target.to_string()
    }
}

/// Viewport heights must be finite and positive for scrolling to end.
pub fn parse_viewport_height(value: &str) -> Result<f64, String> {
    match value.trim().parse::<f64>() {
        Ok(height) if height.is_finite() && height > 0.0 => Ok(height),
        Ok(height) => Err(format!("viewport height must be a positive number of px, got {}", height)),
        Err(error) => Err(error.to_string()),
    }
}

pub struct NavMenu {
    active: String,
}

impl NavMenu {
    pub fn new(hash: Option<&str>) -> Self {
        let mut menu = NavMenu {
            active: HERO_SECTION.to_string(),
        };
        if let Some(hash) = hash {
            menu.on_hash_change(hash);
        }
        menu
    }

    pub fn on_hash_change(&mut self, hash: &str) {
        self.active = if hash.is_empty() {
            HERO_SECTION.to_string()
        } else {
            hash.to_string()
        };
    }

    pub fn is_active(&self, href: &str) -> bool {
        self.active == href
    }

    pub fn render(&self, t: &Translations) -> String {
        NAV_LINKS
            .iter()
            .map(|(href, key, default)| {
                let label = t.t_or(key, default);
                if self.is_active(href) {
                    format!("[{}]", label)
                } else {
                    label
                }
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LanguageOption {
    pub language: Language,
    pub label: &'static str,
    pub selected: bool,
}

pub fn language_options(current: Language) -> Vec<LanguageOption> {
    Language::ALL
        .into_iter()
        .map(|language| LanguageOption {
            language,
            label: language.label(),
            selected: language == current,
        })
        .collect()
}

pub fn render_project_list(projects: &[Project], t: &Translations) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## {}", t.t_or("projects.title", "Projects"));
    if projects.is_empty() {
        let _ = writeln!(out, "{}", t.t_or("projects.empty", "No projects to show."));
        return out;
    }
    for project in projects {
        let _ = writeln!(out, "* {} - {}", project.title, project.short_description);
        if !project.project_tags.is_empty() {
            let tags: Vec<String> = project.project_tags.iter().map(|tag| format!("#{}", tag)).collect();
            let _ = writeln!(out, "  {}", tags.join(" "));
        }
        let _ = writeln!(out, "  -> /project/{}", project.id);
    }
    out
}

pub struct PageSection {
    pub heading: Option<String>,
    pub lines: Vec<String>,
    classes: RefCell<Vec<String>>,
}

impl PageSection {
    fn new(heading: Option<String>, lines: Vec<String>, revealable: bool) -> Self {
        let classes = if revealable {
            vec![REVEALABLE_CLASS.to_string()]
        } else {
            Vec::new()
        };
        PageSection {
            heading,
            lines,
            classes: RefCell::new(classes),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.borrow().iter().any(|name| name == class)
    }

    fn height(&self) -> f64 {
        let heading = usize::from(self.heading.is_some());
        (self.lines.len() + heading + 1) as f64 * LINE_HEIGHT
    }
}

/// Rendered detail template; section index doubles as element id.
pub struct DetailPage {
    sections: Vec<PageSection>,
}

impl DetailPage {
    pub fn build(project: &Project, t: &Translations) -> Self {
        let mut sections = Vec::new();
        let mut header = vec![project.short_description.clone()];
        if !project.project_tags.is_empty() {
            header.push(project.project_tags.join(", "));
        }
        if let Some(hero) = project.hero_image.as_ref().or(project.img_url.first().map(|media| &media.url)) {
            header.push(format!("hero: {}", hero));
        }
        sections.push(PageSection::new(Some(project.title.clone()), header, false));

        let mut revealable = |key: &str, default: &str, lines: Vec<String>| {
            if !lines.is_empty() {
                sections.push(PageSection::new(Some(t.t_or(key, default)), lines, true));
            }
        };
        revealable("detail.description", "Description", vec![project.description.clone()]);
        revealable("detail.objectives", "Objectives", bullets(&project.objectif));
        revealable(
            "detail.techUsed",
            "Technologies",
            project
                .tech_used
                .iter()
                .map(|group| format!("- {}: {}", group.title, group.names.join(", ")))
                .collect(),
        );
        revealable(
            "detail.features",
            "Features",
            project
                .features
                .iter()
                .map(|feature| format!("- {}: {}", feature.title, feature.description))
                .collect(),
        );
        revealable(
            "detail.challenges",
            "Challenges",
            project
                .challenges
                .iter()
                .map(|challenge| format!("- {}: {}", challenge.title, challenge.description))
                .collect(),
        );
        revealable(
            "detail.metrics",
            "Metrics",
            project
                .metrics
                .iter()
                .map(|metric| format!("- {}: {}", metric.label, metric.value))
                .collect(),
        );
        revealable("detail.results", "Results", project.results.iter().cloned().collect());
        revealable("detail.whatLearned", "What I learned", bullets(&project.what_learned));
        revealable(
            "detail.gallery",
            "Gallery",
            project
                .img_url
                .iter()
                .map(|media| {
                    let alt = media.alt_text.as_deref().unwrap_or(&media.title);
                    match media.responsive.as_ref().map(|variants| variants.srcset()) {
                        Some(srcset) if !srcset.is_empty() => {
                            format!("- {} ({}) [{}]", alt, media.url, srcset)
                        }
                        _ => format!("- {} ({})", alt, media.url),
                    }
                })
                .collect(),
        );
        DetailPage { sections }
    }

    pub fn sections(&self) -> &[PageSection] {
        &self.sections
    }

    pub fn layout(&self) -> Vec<ElementBox> {
        let mut top = 0.0;
        self.sections
            .iter()
            .enumerate()
            .map(|(id, section)| {
                let element = ElementBox {
                    id,
                    top,
                    height: section.height(),
                };
                top += element.height;
                element
            })
            .collect()
    }

    pub fn height(&self) -> f64 {
        self.sections.iter().map(PageSection::height).sum()
    }

    /// Revealable sections stay hidden until they carry `revealed_class`.
    pub fn render(&self, revealed_class: &str) -> String {
        let mut out = String::new();
        for section in &self.sections {
            if section.has_class(REVEALABLE_CLASS) && !section.has_class(revealed_class) {
                continue;
            }
            if let Some(heading) = &section.heading {
                let _ = writeln!(out, "## {}", heading);
            }
            for line in &section.lines {
                let _ = writeln!(out, "{}", line);
            }
            out.push('\n');
        }
        out
    }
}

fn bullets(items: &[String]) -> Vec<String> {
    items.iter().map(|item| format!("- {}", item)).collect()
}

impl RevealHost for DetailPage {
    fn query(&self, selector: &str) -> Vec<ElementId> {
        let Some(class) = selector.strip_prefix('.') else {
            return Vec::new();
        };
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, section)| section.has_class(class))
            .map(|(id, _)| id)
            .collect()
    }

    fn add_class(&self, element: ElementId, class: &str) {
        if let Some(section) = self.sections.get(element) {
            if !section.has_class(class) {
                section.classes.borrow_mut().push(class.to_string());
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DetailState {
    Loading,
    NotFound,
    Loaded(Project),
}

pub struct ProjectDetailView<F: Fetch + 'static> {
    data: Rc<DataService<F>>,
    options: RevealOptions,
    state: DetailState,
    page: Option<Rc<DetailPage>>,
    reveal: Option<RevealController<DetailPage>>,
}

impl<F: Fetch + 'static> ProjectDetailView<F> {
    pub fn new(data: Rc<DataService<F>>, options: RevealOptions) -> Self {
        ProjectDetailView {
            data,
            options,
            state: DetailState::Loading,
            page: None,
            reveal: None,
        }
    }

    pub async fn load(&mut self, id: Option<u32>, t: &Translations) -> &DetailState {
        self.destroy();
        self.state = DetailState::Loading;
        let Some(id) = id else {
            self.state = DetailState::NotFound;
            return &self.state;
        };
        match self.data.project_by_id(id).await {
            Some(project) => {
                let page = Rc::new(DetailPage::build(&project, t));
                let reveal = RevealController::new(page.clone(), self.options.clone());
                reveal.activate();
                self.page = Some(page);
                self.reveal = Some(reveal);
                self.state = DetailState::Loaded(project);
            }
            None => {
                tracing::info!(id, "Project not found");
                self.state = DetailState::NotFound;
            }
        }
        &self.state
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn page(&self) -> Option<&DetailPage> {
        self.page.as_deref()
    }

    /// Reports the viewport position to the reveal controller.
    pub fn scroll_to(&self, viewport: Viewport) -> usize {
        match (&self.page, &self.reveal) {
            (Some(page), Some(reveal)) => reveal.on_visibility(&viewport.entries(&page.layout())),
            _ => 0,
        }
    }

    /// Scrolls from top to bottom in half-viewport steps.
    pub fn scroll_through(&self, viewport_height: f64) -> usize {
        let Some(page) = &self.page else {
            return 0;
        };
        if !viewport_height.is_finite() || viewport_height <= 0.0 {
            tracing::warn!(viewport_height, "Ignoring scroll with an unusable viewport height");
            return 0;
        }
        let step = (viewport_height / 2.0).max(LINE_HEIGHT);
        let mut revealed = 0;
        let mut scroll_top = 0.0;
        loop {
            revealed += self.scroll_to(Viewport {
                scroll_top,
                height: viewport_height,
            });
            if scroll_top + viewport_height >= page.height() {
                break;
            }
            scroll_top += step;
        }
        revealed
    }

    pub fn render(&self, t: &Translations) -> String {
        match (&self.state, &self.page) {
            (DetailState::Loaded(_), Some(page)) => page.render(&self.options.class),
            (DetailState::NotFound, _) => {
                format!("{}\n", t.t_or("detail.notFound", "Project not found."))
            }
            _ => format!("{}\n", t.t_or("detail.loading", "Loading...")),
        }
    }

    /// Idempotent. Dropping the view tears the reveal controller down too.
    pub fn destroy(&mut self) {
        if let Some(reveal) = self.reveal.take() {
            reveal.teardown();
        }
        self.page = None;
    }
}

/// Root of the site: owns the preference context and wires language changes
/// through to data loading and translations.
pub struct App<F: Fetch + 'static> {
    pub prefs: Preferences,
    pub nav: NavMenu,
    data: Rc<DataService<F>>,
    translator: Translator<F>,
    translations: Translations,
    language: watch::Receiver<Language>,
    reveal_options: RevealOptions,
}

impl<F: Fetch + 'static> App<F> {
    pub async fn start(prefs: Preferences, fetcher: F, policy: RetryPolicy) -> Self {
        let fetcher = Rc::new(fetcher);
        let language = prefs.language.get();
        let translator = Translator::new(fetcher.clone(), Language::default());
        let translations = translator.use_language(language).await;
        App {
            nav: NavMenu::new(None),
            data: Rc::new(DataService::new(fetcher, language, policy)),
            language: prefs.language.subscribe(),
            prefs,
            translator,
            translations,
            reveal_options: RevealOptions::default(),
        }
    }

    pub fn data(&self) -> &Rc<DataService<F>> {
        &self.data
    }

    pub fn translations(&self) -> &Translations {
        &self.translations
    }

    /// Applies a language change seen on the preference store, if any.
    pub async fn sync_language(&mut self) {
        if !self.language.has_changed().unwrap_or(false) {
            return;
        }
        let language = *self.language.borrow_and_update();
        self.data.set_language(language);
        self.translations = self.translator.use_language(language).await;
    }

    /// Returns the screen-reader announcement, or `None` if nothing changed.
    pub async fn change_language(&mut self, language: Language) -> Option<String> {
        if language == self.prefs.language.get() {
            return None;
        }
        self.prefs.language.set(language);
        self.sync_language().await;
        let template = self
            .translations
            .t_or("language.announce", "Language set to {{language}}");
        Some(template.replace("{{language}}", language.label()))
    }

    pub fn toggle_theme(&self) -> Theme {
        self.prefs.theme.toggle()
    }

    pub fn language_options(&self) -> Vec<LanguageOption> {
        language_options(self.prefs.language.get())
    }

    pub fn detail_view(&self) -> ProjectDetailView<F> {
        ProjectDetailView::new(self.data.clone(), self.reveal_options.clone())
    }

    pub async fn render(&mut self, path: &str, viewport_height: f64) -> String {
        self.sync_language().await;
        let route = Route::resolve(path);
        let t = &self.translations;
        let mut out = String::new();
        let _ = writeln!(out, "# {}", t.t_or(route_title_key(&route), route.title()));
        let _ = writeln!(out, "{}", self.nav.render(t));
        let selector: Vec<String> = self
            .language_options()
            .iter()
            .map(|option| {
                if option.selected {
                    format!("[{}]", option.label)
                } else {
                    option.label.to_string()
                }
            })
            .collect();
        let _ = writeln!(out, "{} | {}: {}\n", selector.join(" "), t.t_or("theme.label", "Theme"), self.prefs.theme.get());

        match route {
            Route::Portfolio => {
                let _ = writeln!(out, "{}\n", t.t_or("hero.title", "Hi, welcome to my portfolio"));
                let about = t.t_or("about.text", "");
                if !about.is_empty() {
                    let _ = writeln!(out, "## {}\n{}\n", t.t_or("about.title", "About"), about);
                }
                let projects = self.data.projects().await;
                out.push_str(&render_project_list(&projects, t));
                let _ = writeln!(out, "\n## {}", t.t_or("contact.title", "Contact"));
                let _ = writeln!(out, "{}", t.t_or("contact.text", ""));
            }
            Route::Project(id) => {
                let mut view = self.detail_view();
                view.load(id, t).await;
                view.scroll_through(viewport_height);
                out.push_str(&view.render(t));
            }
        }
        out
    }
}

fn route_title_key(route: &Route) -> &'static str {
    match route {
        Route::Portfolio => "titles.portfolio",
        Route::Project(_) => "titles.project",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::prefs::{DocumentRoot, MemoryStorage, SystemHints, THEME_ATTRIBUTE},
        error::{Error, Result},
    };
    use async_trait::async_trait;

    const PROJECTS_EN: &str = r#"[
        {"id": 1, "title": "Folio", "shortDescription": "Portfolio site", "description": "Angular SPA",
         "projectTags": ["angular"], "objectif": ["Show work"],
         "features": [{"title": "Themes", "description": "Dark and light"}],
         "whatLearned": ["Intersection observers"],
         "imgURL": [{"url": "folio.png", "title": "Home", "altText": "Home page"}]},
        {"id": 2, "title": "Weather", "shortDescription": "Forecasts", "description": "Rust CLI"}
    ]"#;
    const PROJECTS_IT: &str = r#"[{"id": 1, "title": "Folio", "shortDescription": "Sito", "description": "SPA"}]"#;
    const I18N_IT: &str = r#"{"nav": {"projects": "Progetti"}, "language": {"announce": "Lingua: {{language}}"}}"#;

    #[derive(Default)]
    struct Site;

    #[async_trait(?Send)]
    impl Fetch for Site {
        async fn get(&self, path: &str) -> Result<Vec<u8>> {
            let body = match path {
                "assets/data/Projects_en.json" => PROJECTS_EN,
                "assets/data/Projects_it.json" => PROJECTS_IT,
                "assets/i18n/it.json" => I18N_IT,
                "assets/i18n/en.json" => "{}",
                _ => return Err(Error::fetch(path, "not found")),
            };
            Ok(body.as_bytes().to_vec())
        }
    }

    fn prefs() -> Preferences {
        Preferences::init(
            Rc::new(MemoryStorage::new()),
            Rc::new(DocumentRoot::new()),
            &SystemHints::default(),
        )
    }

    fn data() -> Rc<DataService<Site>> {
        Rc::new(DataService::new(Rc::new(Site::default()), Language::En, RetryPolicy::default()))
    }

    #[test]
    fn resolves_routes() {
        assert_eq!(Route::resolve(""), Route::Portfolio);
        assert_eq!(Route::resolve("/"), Route::Portfolio);
        assert_eq!(Route::resolve("/project/2"), Route::Project(Some(2)));
        assert_eq!(Route::resolve("project/2?ref=home#top"), Route::Project(Some(2)));
        assert_eq!(Route::resolve("/project/2.0"), Route::Project(Some(2)));
        assert_eq!(Route::resolve("/project/2.5"), Route::Project(None));
        assert_eq!(Route::resolve("/project/-1"), Route::Project(None));
        assert_eq!(Route::resolve("/project/NaN"), Route::Project(None));
        assert_eq!(Route::resolve("/project/abc"), Route::Project(None));
        assert_eq!(Route::resolve("/project/"), Route::Project(None));
        assert_eq!(Route::resolve("/project/2/extra"), Route::Portfolio);
        assert_eq!(Route::resolve("/nowhere"), Route::Portfolio);
    }

    #[test]
    fn browse_targets_and_viewport_heights() {
        assert_eq!(route_path("2"), "/project/2");
        assert_eq!(route_path("/project/2"), "/project/2");
        assert_eq!(route_path("/"), "/");
        assert_eq!(parse_viewport_height("900"), Ok(900.0));
        assert!(parse_viewport_height("NaN").is_err());
        assert!(parse_viewport_height("inf").is_err());
        assert!(parse_viewport_height("0").is_err());
        assert!(parse_viewport_height("-300").is_err());
        assert!(parse_viewport_height("tall").is_err());
    }

    #[test]
    fn nav_menu_tracks_hash() {
        let mut nav = NavMenu::new(None);
        assert!(nav.is_active(HERO_SECTION));
        nav.on_hash_change("#contact-section");
        assert!(nav.is_active("#contact-section"));
        nav.on_hash_change("");
        assert!(nav.is_active(HERO_SECTION));
        let rendered = nav.render(&Translations::empty(Language::En));
        assert!(rendered.starts_with("[Home] | About"));
    }

    #[actix_web::test]
    async fn invalid_or_missing_ids_are_not_found() {
        let t = Translations::empty(Language::En);
        let mut view = ProjectDetailView::new(data(), RevealOptions::default());
        assert_eq!(view.load(None, &t).await, &DetailState::NotFound);
        assert_eq!(view.load(Some(99), &t).await, &DetailState::NotFound);
        assert_eq!(view.render(&t), "Project not found.\n");
        assert_eq!(view.scroll_through(600.0), 0);
    }

    #[actix_web::test]
    async fn loaded_detail_reveals_sections_while_scrolling() {
        let t = Translations::empty(Language::En);
        let mut view = ProjectDetailView::new(data(), RevealOptions::default());
        assert!(matches!(view.load(Some(1), &t).await, DetailState::Loaded(project) if project.title == "Folio"));

        let before = view.render(&t);
        assert!(before.contains("## Folio"));
        assert!(!before.contains("## Description"));

        let first = view.scroll_to(Viewport { scroll_top: 0.0, height: 300.0 });
        assert!(first >= 1);
        let rest = view.scroll_through(300.0);
        let page = view.page().unwrap();
        let revealable = page.query(".animate-on-scroll").len();
        assert_eq!(first + rest, revealable);
        assert_eq!(page.query(".is-visible").len(), revealable);
        // revealing is one-shot
        assert_eq!(view.scroll_through(300.0), 0);

        let after = view.render(&t);
        assert!(after.contains("## Features\n- Themes: Dark and light"));
        assert!(after.contains("- Home page (folio.png)"));
    }

    #[actix_web::test]
    async fn unusable_viewport_heights_do_not_scroll() {
        let t = Translations::empty(Language::En);
        let mut view = ProjectDetailView::new(data(), RevealOptions::default());
        view.load(Some(1), &t).await;
        for height in [f64::NAN, f64::INFINITY, 0.0, -300.0] {
            assert_eq!(view.scroll_through(height), 0);
        }
        assert_eq!(view.page().unwrap().query(".is-visible").len(), 0);
        assert!(view.scroll_through(300.0) > 0);
    }

    #[actix_web::test]
    async fn destroy_is_idempotent() {
        let t = Translations::empty(Language::En);
        let mut view = ProjectDetailView::new(data(), RevealOptions::default());
        view.load(Some(2), &t).await;
        view.destroy();
        view.destroy();
        assert!(view.page().is_none());
        assert_eq!(view.scroll_to(Viewport { scroll_top: 0.0, height: 600.0 }), 0);
    }

    #[actix_web::test]
    async fn language_change_refetches_and_retranslates() {
        let mut app = App::start(prefs(), Site::default(), RetryPolicy::default()).await;
        let portfolio = app.render("/", 600.0).await;
        assert!(portfolio.contains("* Weather - Forecasts"));
        assert!(portfolio.contains("[English] Italiano Français"));

        assert_eq!(app.change_language(Language::It).await.as_deref(), Some("Lingua: Italiano"));
        assert_eq!(app.change_language(Language::It).await, None);
        assert_eq!(app.data().language(), Language::It);

        let portfolio = app.render("/", 600.0).await;
        assert!(portfolio.contains("* Folio - Sito"));
        assert!(!portfolio.contains("Weather"));
        assert!(portfolio.contains("Progetti"));
        assert_eq!(
            app.prefs.document.attribute("lang").as_deref(),
            Some("it")
        );
    }

    #[actix_web::test]
    async fn theme_toggle_updates_document() {
        let app = App::start(prefs(), Site::default(), RetryPolicy::default()).await;
        assert_eq!(app.toggle_theme(), Theme::Dark);
        assert_eq!(app.prefs.document.attribute(THEME_ATTRIBUTE).as_deref(), Some("dark"));
        assert_eq!(app.toggle_theme(), Theme::Light);
        assert_eq!(app.prefs.document.attribute(THEME_ATTRIBUTE), None);
    }

    #[actix_web::test]
    async fn renders_detail_route_fully_scrolled() {
        let mut app = App::start(prefs(), Site::default(), RetryPolicy::default()).await;
        let detail = app.render("/project/1", 200.0).await;
        assert!(detail.starts_with("# Project Details"));
        assert!(detail.contains("## What I learned\n- Intersection observers"));
        let missing = app.render("/project/x", 200.0).await;
        assert!(missing.contains("Project not found."));
    }
}
