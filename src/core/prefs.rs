//! Persisted user preferences (active language, active theme).
//!
//! Each store resolves its value once at start-up in priority order:
//! persisted choice, then an environment hint, then a hard default. Changes
//! are written through to [`Storage`] and applied to the [`DocumentRoot`].
//! Storage failures never escape a store; the in-memory value still applies.

use serde::{Deserialize, Serialize};
use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap},
    fmt,
    fs::File,
    io::{BufReader, BufWriter, ErrorKind},
    path::PathBuf,
    rc::Rc,
    str::FromStr,
};
use tokio::sync::watch;

use crate::error::{Error, Result};

pub const LANGUAGE_KEY: &str = "lang";
pub const THEME_KEY: &str = "theme";
pub const THEME_ATTRIBUTE: &str = "data-theme";
pub const LANG_ATTRIBUTE: &str = "lang";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    It,
    Fr,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::It, Language::Fr];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::It => "it",
            Language::Fr => "fr",
        }
    }

    /// Name shown in the language selector.
    pub fn label(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::It => "Italiano",
            Language::Fr => "Français",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.code() == code)
    }

    /// Primary subtag of a locale such as `it-IT` or `fr_FR.UTF-8`.
    pub fn from_locale(locale: &str) -> Option<Self> {
        let primary = locale
            .split(|c| c == '-' || c == '_' || c == '.')
            .next()
            .unwrap_or("")
            .to_lowercase();
        Self::from_code(&primary)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unsupported language \"{}\"", s))
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    #[default]
    Light,
}

impl Theme {
    pub fn name(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unsupported theme \"{}\"", other)),
        }
    }
}

/// String key-value persistence, the local-storage analogue.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Keeps all keys in one JSON object file.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStorage { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match File::open(&self.path) {
            Ok(file) => Ok(serde_json::from_reader(BufReader::new(file))?),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(error) => Err(error.into()),
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &values)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    values: RefCell<HashMap<String, String>>,
    unavailable: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every read and write fails, like disabled local storage.
    pub fn unavailable() -> Self {
        MemoryStorage {
            values: RefCell::default(),
            unavailable: true,
        }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if self.unavailable {
            return Err(Error::storage("storage is unavailable"));
        }
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.unavailable {
            return Err(Error::storage("storage is unavailable"));
        }
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Attributes of the document root element (`<html lang=".." data-theme="..">`).
#[derive(Default, Debug)]
pub struct DocumentRoot {
    attributes: RefCell<BTreeMap<String, String>>,
}

impl DocumentRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_attribute(&self, name: &str) {
        self.attributes.borrow_mut().remove(name);
    }
}

/// Environment hints consulted when nothing is persisted.
#[derive(Clone, Debug, Default)]
pub struct SystemHints {
    pub locale: Option<String>,
    pub prefers_dark: Option<bool>,
}

impl SystemHints {
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let locale = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .into_iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.is_empty());
        // COLORFGBG is "fg;bg" or "fg;default;bg"; ANSI backgrounds 0-6 and 8 are dark.
        let prefers_dark = lookup("COLORFGBG")
            .and_then(|value| value.rsplit(';').next().map(str::to_string))
            .and_then(|bg| bg.parse::<u8>().ok())
            .map(|bg| bg <= 6 || bg == 8);
        SystemHints {
            locale,
            prefers_dark,
        }
    }
}

fn read_persisted(storage: &dyn Storage, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(key, "Could not read preference: {}", error);
            None
        }
    }
}

fn write_persisted(storage: &dyn Storage, key: &str, value: &str) {
    if let Err(error) = storage.set(key, value) {
        tracing::warn!(key, value, "Could not persist preference: {}", error);
    }
}

pub struct LanguageStore {
    storage: Rc<dyn Storage>,
    document: Rc<DocumentRoot>,
    current: watch::Sender<Language>,
}

impl LanguageStore {
    pub fn init(storage: Rc<dyn Storage>, document: Rc<DocumentRoot>, hints: &SystemHints) -> Self {
        let language = read_persisted(storage.as_ref(), LANGUAGE_KEY)
            .and_then(|code| Language::from_code(&code))
            .or_else(|| hints.locale.as_deref().and_then(Language::from_locale))
            .unwrap_or_default();
        document.set_attribute(LANG_ATTRIBUTE, language.code());
        tracing::debug!(%language, "Resolved language");
        let (current, _) = watch::channel(language);
        LanguageStore {
            storage,
            document,
            current,
        }
    }

    pub fn get(&self) -> Language {
        *self.current.borrow()
    }

    pub fn set(&self, language: Language) {
        if self.get() == language {
            return;
        }
        write_persisted(self.storage.as_ref(), LANGUAGE_KEY, language.code());
        self.document.set_attribute(LANG_ATTRIBUTE, language.code());
        self.current.send_replace(language);
        tracing::info!(%language, "Language set to {}", language.label());
    }

    /// Receiver that sees the current language and every later change.
    pub fn subscribe(&self) -> watch::Receiver<Language> {
        self.current.subscribe()
    }
}

pub struct ThemeStore {
    storage: Rc<dyn Storage>,
    document: Rc<DocumentRoot>,
    current: Cell<Theme>,
}

impl ThemeStore {
    pub fn init(storage: Rc<dyn Storage>, document: Rc<DocumentRoot>, hints: &SystemHints) -> Self {
        let theme = read_persisted(storage.as_ref(), THEME_KEY)
            .and_then(|name| name.parse::<Theme>().ok())
            .or_else(|| {
                hints
                    .prefers_dark
                    .map(|dark| if dark { Theme::Dark } else { Theme::Light })
            })
            .unwrap_or_default();
        let store = ThemeStore {
            storage,
            document,
            current: Cell::new(theme),
        };
        store.apply(theme);
        store
    }

    pub fn get(&self) -> Theme {
        self.current.get()
    }

    pub fn is_dark(&self) -> bool {
        self.get() == Theme::Dark
    }

    pub fn set(&self, theme: Theme) {
        self.current.set(theme);
        self.apply(theme);
        write_persisted(self.storage.as_ref(), THEME_KEY, theme.name());
    }

    pub fn toggle(&self) -> Theme {
        let theme = self.get().toggled();
        self.set(theme);
        theme
    }

    // Light relies on the stylesheet's :root defaults.
    fn apply(&self, theme: Theme) {
        match theme {
            Theme::Dark => self.document.set_attribute(THEME_ATTRIBUTE, "dark"),
            Theme::Light => self.document.remove_attribute(THEME_ATTRIBUTE),
        }
    }
}

/// Owned preference context handed to the views.
pub struct Preferences {
    pub language: LanguageStore,
    pub theme: ThemeStore,
    pub document: Rc<DocumentRoot>,
}

impl Preferences {
    pub fn init(storage: Rc<dyn Storage>, document: Rc<DocumentRoot>, hints: &SystemHints) -> Self {
        Preferences {
            language: LanguageStore::init(storage.clone(), document.clone(), hints),
            theme: ThemeStore::init(storage, document.clone(), hints),
            document,
        }
    }
}
