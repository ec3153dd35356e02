pub mod data;
pub mod fetch;
pub mod i18n;
pub mod prefs;
pub mod reveal;
pub mod settings;
