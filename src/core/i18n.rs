use std::{cell::RefCell, collections::HashMap, rc::Rc};

use serde_json::{Map, Value};

use crate::{
    core::{fetch::Fetch, prefs::Language},
    error::{Error, Result},
};

pub const I18N_DIR: &str = "assets/i18n";

pub fn bundle_path(language: Language) -> String {
    format!("{}/{}.json", I18N_DIR, language.code())
}

/// One language's string table, flat or nested.
#[derive(Clone, Debug, Default)]
pub struct Bundle {
    entries: Map<String, Value>,
}

impl Bundle {
    pub fn parse(body: &[u8]) -> Result<Self> {
        match serde_json::from_slice::<Value>(body)? {
            Value::Object(entries) => Ok(Bundle { entries }),
            other => Err(Error::Validation(format!(
                "translation bundle must be an object, found {}",
                kind_of(&other)
            ))),
        }
    }

    /// Resolves `nav.projects` as a flat key first, then as a nested path.
    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(Value::String(text)) = self.entries.get(key) {
            return Some(text);
        }
        let mut parts = key.split('.');
        let mut node = self.entries.get(parts.next()?)?;
        for part in parts {
            node = node.as_object()?.get(part)?;
        }
        node.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Active bundle plus the default-language bundle used for missing keys.
#[derive(Clone, Debug)]
pub struct Translations {
    pub language: Language,
    active: Rc<Bundle>,
    fallback: Rc<Bundle>,
}

impl Translations {
    /// No strings at all; every lookup falls through to its default.
    pub fn empty(language: Language) -> Self {
        let bundle = Rc::new(Bundle::default());
        Translations {
            language,
            active: bundle.clone(),
            fallback: bundle,
        }
    }

    /// Missing keys fall back to the default language, then to the key itself.
    pub fn t(&self, key: &str) -> String {
        self.active
            .get(key)
            .or_else(|| self.fallback.get(key))
            .unwrap_or(key)
            .to_string()
    }

    pub fn t_or(&self, key: &str, default: &str) -> String {
        self.active
            .get(key)
            .or_else(|| self.fallback.get(key))
            .unwrap_or(default)
            .to_string()
    }

    /// Like [`Translations::t`], substituting `{{name}}` placeholders.
    pub fn t_with(&self, key: &str, params: &[(&str, &str)]) -> String {
        params
            .iter()
            .fold(self.t(key), |text, (name, value)| {
                text.replace(&format!("{{{{{}}}}}", name), value)
            })
    }
}

pub struct Translator<F: Fetch> {
    fetcher: Rc<F>,
    default_language: Language,
    bundles: RefCell<HashMap<Language, Rc<Bundle>>>,
}

impl<F: Fetch> Translator<F> {
    pub fn new(fetcher: Rc<F>, default_language: Language) -> Self {
        Translator {
            fetcher,
            default_language,
            bundles: RefCell::new(HashMap::new()),
        }
    }

    pub async fn use_language(&self, language: Language) -> Translations {
        let active = self.bundle(language).await;
        let fallback = if language == self.default_language {
            active.clone()
        } else {
            self.bundle(self.default_language).await
        };
        Translations {
            language,
            active,
            fallback,
        }
    }

    async fn bundle(&self, language: Language) -> Rc<Bundle> {
        if let Some(bundle) = self.bundles.borrow().get(&language) {
            return bundle.clone();
        }
        let path = bundle_path(language);
        let bundle = match self.fetcher.get(&path).await.and_then(|body| Bundle::parse(&body)) {
            Ok(bundle) => Rc::new(bundle),
            // Not cached, so the next switch to this language tries again.
            Err(error) => {
                tracing::warn!(%path, "Translations unavailable: {}", error);
                return Rc::new(Bundle::default());
            }
        };
        self.bundles.borrow_mut().insert(language, bundle.clone());
        bundle
    }
}
