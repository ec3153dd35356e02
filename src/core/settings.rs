use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, ErrorKind, Read},
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    path::Path,
    time::Duration,
};

use crate::error::{Error, Result};

pub const DEFAULT_SETTINGS_PATH: &str = "core/settings.json";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Settings {
    pub ipv4_addr: Ipv4Setting,
    pub port: U16Setting,
    pub dist_path: StrSetting,
    pub assets_url: StrSetting,
    pub prefs_path: StrSetting,
    pub fetch_retries: U32Setting,
    pub retry_delay_ms: U64Setting,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StrSetting {
    pub name: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct U16Setting {
    pub name: String,
    pub value: u16,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct U32Setting {
    pub name: String,
    pub value: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct U64Setting {
    pub name: String,
    pub value: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Ipv4Setting {
    pub name: String,
    pub value: Ipv4Addr,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => {
                let mut buffer = Vec::new();
                let mut reader = BufReader::new(file);
                match reader.read_to_end(&mut buffer) {
                    Ok(_) => match serde_json::from_slice::<Settings>(&buffer) {
                        Ok(settings) => Ok(settings),
                        Err(error) => {
                            tracing::error!(path = %path.display(), "Settings file is malformed: {}", error);
                            Err(Error::Settings(error.to_string()))
                        }
                    },
                    Err(error) => {
                        tracing::error!(path = %path.display(), "Settings file could not be read: {}", error);
                        Err(error.into())
                    }
                }
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Loads `path`, falling back to [`Settings::new`] when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load(path.as_ref()) {
            Err(Error::Io(error)) if error.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.as_ref().display(), "No settings file, using defaults");
                Ok(Self::new())
            }
            other => other,
        }
    }

    pub fn new() -> Self {
        Settings {
            ipv4_addr: Ipv4Setting {
                name: "Ipv4 Address".to_string(),
                value: Ipv4Addr::new(0, 0, 0, 0),
            },
            port: U16Setting {
                name: "Port".to_string(),
                value: 8080,
            },
            dist_path: StrSetting {
                name: "dist_path".to_string(),
                value: "dist/portfolio/browser".to_string(),
            },
            assets_url: StrSetting {
                name: "Assets URL".to_string(),
                value: "http://127.0.0.1:8080".to_string(),
            },
            prefs_path: StrSetting {
                name: "prefs_path".to_string(),
                value: "folio-prefs.json".to_string(),
            },
            fetch_retries: U32Setting {
                name: "fetch_retries".to_string(),
                value: 3,
            },
            retry_delay_ms: U64Setting {
                name: "retry_delay_ms".to_string(),
                value: 0,
            },
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ipv4_addr.value, self.port.value))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.value)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}
