use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default base URL of the GENESIS-Online RESTful service.
pub const BASE_URL: &str = "https://www-genesis.destatis.de/genesisWS/rest/2020/";

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base API URL, typically [`BASE_URL`].
    pub url: String,
    /// GENESIS account name.
    pub username: String,
    /// GENESIS account password.
    pub password: String,
    /// Response language, `"de"` or `"en"`.
    pub language: String,
}

#[derive(Debug, Default)]
struct RcConfig {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    language: Option<String>,
}

/// Assembles a configuration from (in order of precedence):
/// - explicit arguments
/// - environment variables `GENESIS_URL`, `GENESIS_USERNAME`,
///   `GENESIS_PASSWORD`, `GENESIS_LANGUAGE`
/// - a `.genesisrc` file from `GENESIS_RC`, the current directory, or the
///   home directory
pub(crate) fn load_config(
    username: Option<String>,
    password: Option<String>,
    language: Option<String>,
) -> Result<ClientConfig> {
    let mut url = std::env::var("GENESIS_URL").ok();
    let mut username = username.or_else(|| std::env::var("GENESIS_USERNAME").ok());
    let mut password = password.or_else(|| std::env::var("GENESIS_PASSWORD").ok());
    let mut language = language.or_else(|| std::env::var("GENESIS_LANGUAGE").ok());

    let rc_candidates = rc_candidates();

    if username.is_none() || password.is_none() || language.is_none() || url.is_none() {
        for rc_path in &rc_candidates {
            if rc_path.exists() {
                let cfg = read_rc(rc_path)?;
                if url.is_none() {
                    url = cfg.url;
                }
                if username.is_none() {
                    username = cfg.username;
                }
                if password.is_none() {
                    password = cfg.password;
                }
                if language.is_none() {
                    language = cfg.language;
                }
                break;
            }
        }
    }

    let username = username.ok_or_else(|| missing("username", &rc_candidates))?;
    let password = password.ok_or_else(|| missing("password", &rc_candidates))?;

    Ok(ClientConfig {
        url: url.unwrap_or_else(|| BASE_URL.to_string()),
        username,
        password,
        language: language.unwrap_or_else(|| "en".to_string()),
    })
}

fn missing(field: &str, rc_candidates: &[PathBuf]) -> Error {
    let upper = field.to_uppercase();
    if rc_candidates.is_empty() {
        return Error::Config(format!("{field} (set GENESIS_{upper} or create .genesisrc)"));
    }
    Error::Config(format!(
        "{field} (set GENESIS_{upper} or put `{field}:` in one of: {})",
        rc_candidates.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    ))
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Store { path: path.to_path_buf(), source: e })?;
    let mut cfg = RcConfig::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((k, v)) = line.split_once(':') {
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                continue;
            }
            match k.trim() {
                "url" => cfg.url = Some(v.to_string()),
                "username" => cfg.username = Some(v.to_string()),
                "password" => cfg.password = Some(v.to_string()),
                "language" => cfg.language = Some(v.to_string()),
                _ => {}
            }
        }
    }

    Ok(cfg)
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // Search order: explicit override, execution directory, home directory.
    if let Ok(p) = std::env::var("GENESIS_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".genesisrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".genesisrc"));
    }
    v
}
