//! Config file loading and the flag > file > env > default resolution.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{GenerateError, Result};
use crate::providers::{select_provider, CredentialEnv, ProviderChoice, DEFAULT_OPENROUTER_MODEL};
use crate::request::{AspectRatio, ImageSize};

const CONFIG_DIR_NAME: &str = "nanobanana";
const CONFIG_FILE_NAME: &str = "config.json";

/// Contents of `config.json`. Every field is optional; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api: Option<String>,
    pub model: Option<String>,
    pub aspect: Option<String>,
    pub size: Option<String>,
}

impl FileConfig {
    fn wants_openrouter(&self) -> bool {
        match non_empty(self.api.as_deref()) {
            Some("openrouter") => true,
            Some("gemini") | None => false,
            Some(other) => {
                warn!(api = other, "unknown api in config file; expected gemini or openrouter");
                false
            }
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    config_path_from(env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir())
}

fn config_path_from(xdg_config_home: Option<String>, home: Option<PathBuf>) -> Option<PathBuf> {
    let base = match xdg_config_home.filter(|value| !value.trim().is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => home?.join(".config"),
    };
    Some(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Loads the user config file. A missing file is not an error.
pub fn load_config() -> Result<Option<FileConfig>> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(None),
    }
}

pub fn load_config_from(path: &Path) -> Result<Option<FileConfig>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(GenerateError::Config {
                path: path.to_path_buf(),
                message: format!("failed to read config file: {err}"),
            })
        }
    };
    let parsed = serde_json::from_str::<FileConfig>(&raw).map_err(|err| GenerateError::Config {
        path: path.to_path_buf(),
        message: format!("failed to parse config file: {err}"),
    })?;
    debug!(path = %path.display(), "loaded config file");
    Ok(Some(parsed))
}

/// Values given on the command line. `None` or blank means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsFlags {
    pub aspect: Option<String>,
    pub size: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub choice: ProviderChoice,
    pub aspect_ratio: AspectRatio,
    pub size: ImageSize,
}

/// Layers flags over the config file over built-in defaults, then selects the
/// provider and validates aspect ratio and size, in that order.
pub fn resolve_settings(
    flags: &SettingsFlags,
    file_config: Option<&FileConfig>,
    creds: &CredentialEnv,
) -> Result<ResolvedSettings> {
    let file = file_config.cloned().unwrap_or_default();

    let aspect = non_empty(flags.aspect.as_deref())
        .or(non_empty(file.aspect.as_deref()))
        .unwrap_or(AspectRatio::default().as_str());
    let size = non_empty(flags.size.as_deref())
        .or(non_empty(file.size.as_deref()))
        .unwrap_or(ImageSize::default().as_str());

    let model_override = non_empty(flags.model.as_deref())
        .or(non_empty(file.model.as_deref()))
        .or_else(|| file.wants_openrouter().then_some(DEFAULT_OPENROUTER_MODEL));

    let choice = select_provider(creds, model_override)?;
    let aspect_ratio = aspect.parse::<AspectRatio>()?;
    let size = size.parse::<ImageSize>()?;

    Ok(ResolvedSettings {
        choice,
        aspect_ratio,
        size,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{
        config_path_from, load_config_from, resolve_settings, FileConfig, SettingsFlags,
    };
    use crate::error::GenerateError;
    use crate::providers::{CredentialEnv, ProviderKind, DEFAULT_OPENROUTER_MODEL};
    use crate::request::{AspectRatio, ImageSize};

    fn gemini_only() -> CredentialEnv {
        CredentialEnv {
            gemini: Some("gem-key".to_string()),
            openrouter: None,
        }
    }

    fn openrouter_only() -> CredentialEnv {
        CredentialEnv {
            gemini: None,
            openrouter: Some("or-key".to_string()),
        }
    }

    fn flags(aspect: &str, size: &str, model: &str) -> SettingsFlags {
        let given = |value: &str| (!value.is_empty()).then(|| value.to_string());
        SettingsFlags {
            aspect: given(aspect),
            size: given(size),
            model: given(model),
        }
    }

    #[test]
    fn config_path_prefers_xdg_config_home() {
        let path = config_path_from(Some("/tmp/xdg".to_string()), Some(PathBuf::from("/home/u")));
        assert_eq!(path, Some(PathBuf::from("/tmp/xdg/nanobanana/config.json")));

        let path = config_path_from(None, Some(PathBuf::from("/home/u")));
        assert_eq!(
            path,
            Some(PathBuf::from("/home/u/.config/nanobanana/config.json"))
        );
        assert_eq!(config_path_from(Some(String::new()), None), None);
    }

    #[test]
    fn load_config_reads_all_fields() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.json");
        fs::write(
            &path,
            r#"{"api":"openrouter","model":"test/model","aspect":"4:3","size":"2K","extra":1}"#,
        )?;
        let config = load_config_from(&path)?.expect("config present");
        assert_eq!(config.api.as_deref(), Some("openrouter"));
        assert_eq!(config.model.as_deref(), Some("test/model"));
        assert_eq!(config.aspect.as_deref(), Some("4:3"));
        assert_eq!(config.size.as_deref(), Some("2K"));
        Ok(())
    }

    #[test]
    fn load_config_missing_file_is_none() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        assert!(load_config_from(&temp.path().join("config.json"))?.is_none());
        Ok(())
    }

    #[test]
    fn load_config_rejects_invalid_json() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.json");
        fs::write(&path, "{not json")?;
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, GenerateError::Config { .. }));
        assert!(err.to_string().contains("failed to parse config file"));
        Ok(())
    }

    #[test]
    fn defaults_apply_without_flags_or_file() {
        let resolved = resolve_settings(&SettingsFlags::default(), None, &gemini_only()).unwrap();
        assert_eq!(resolved.aspect_ratio, AspectRatio::Square);
        assert_eq!(resolved.size, ImageSize::OneK);
        assert_eq!(resolved.choice.provider, ProviderKind::Gemini);
        assert_eq!(resolved.choice.credentials.api_key(), "gem-key");
    }

    #[test]
    fn file_config_overrides_defaults() {
        let file = FileConfig {
            api: Some("openrouter".to_string()),
            model: Some("my/model".to_string()),
            aspect: Some("16:9".to_string()),
            size: Some("2K".to_string()),
        };
        let resolved =
            resolve_settings(&SettingsFlags::default(), Some(&file), &openrouter_only()).unwrap();
        assert_eq!(resolved.aspect_ratio, AspectRatio::Landscape16x9);
        assert_eq!(resolved.size, ImageSize::TwoK);
        assert_eq!(resolved.choice.provider, ProviderKind::OpenRouter);
        assert_eq!(resolved.choice.model, "my/model");
    }

    #[test]
    fn flags_override_file_config() {
        let file = FileConfig {
            aspect: Some("16:9".to_string()),
            size: Some("2K".to_string()),
            ..FileConfig::default()
        };
        let resolved =
            resolve_settings(&flags("3:2", "4K", ""), Some(&file), &gemini_only()).unwrap();
        assert_eq!(resolved.aspect_ratio, AspectRatio::Landscape3x2);
        assert_eq!(resolved.size, ImageSize::FourK);
        assert_eq!(resolved.choice.provider, ProviderKind::Gemini);
    }

    #[test]
    fn model_flag_forces_openrouter() {
        let resolved =
            resolve_settings(&flags("", "", "custom/model"), None, &openrouter_only()).unwrap();
        assert_eq!(resolved.choice.provider, ProviderKind::OpenRouter);
        assert_eq!(resolved.choice.model, "custom/model");
    }

    #[test]
    fn config_api_openrouter_uses_default_model() {
        let file = FileConfig {
            api: Some("openrouter".to_string()),
            ..FileConfig::default()
        };
        let both = CredentialEnv {
            gemini: Some("gem".to_string()),
            openrouter: Some("or".to_string()),
        };
        let resolved = resolve_settings(&SettingsFlags::default(), Some(&file), &both).unwrap();
        assert_eq!(resolved.choice.provider, ProviderKind::OpenRouter);
        assert_eq!(resolved.choice.model, DEFAULT_OPENROUTER_MODEL);
    }

    #[test]
    fn credentials_are_checked_before_parameters() {
        let err = resolve_settings(&flags("99:1", "", "custom/m"), None, &CredentialEnv::default())
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::MissingCredential {
                variable: "OPENROUTER_API_KEY",
                ..
            }
        ));
    }

    #[test]
    fn invalid_aspect_and_size_are_rejected() {
        let err = resolve_settings(&flags("99:1", "", ""), None, &gemini_only()).unwrap_err();
        assert!(err.to_string().starts_with("invalid aspect ratio"));

        let err = resolve_settings(&flags("", "8K", ""), None, &gemini_only()).unwrap_err();
        assert!(err.to_string().starts_with("invalid size"));
    }

    #[test]
    fn invalid_size_in_file_is_rejected() {
        let file = FileConfig {
            size: Some("1k".to_string()),
            ..FileConfig::default()
        };
        let err =
            resolve_settings(&SettingsFlags::default(), Some(&file), &gemini_only()).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidParameter { name: "size", .. }));
    }
}
