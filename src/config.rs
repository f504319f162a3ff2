//! Environment configuration

use crate::backend::{DataService, SupabaseClient};
use crate::client::{GeminiClient, GenerativeModel, Unconfigured, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::preferences::ThemeStore;
use crate::TrackiflyError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_PREFERENCES_PATH: &str = ".trackifly/preferences.json";

/// Service settings. Absent values switch the matching feature off.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub preferences_path: PathBuf,
}

impl Config {
    /// Read from the process environment. Blank values count as absent.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            supabase_url: get("SUPABASE_URL"),
            supabase_anon_key: get("SUPABASE_ANON_KEY"),
            gemini_api_key: get("API_KEY").or_else(|| get("GEMINI_API_KEY")),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            preferences_path: get("TRACKIFLY_PREFS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFERENCES_PATH)),
        }
    }

    /// Backend client, when both the URL and the anonymous key are set
    pub fn backend(&self) -> Option<SupabaseClient> {
        let (url, key) = (self.supabase_url.as_deref()?, self.supabase_anon_key.as_deref()?);
        match SupabaseClient::new(url, key) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "Could not build Supabase client, persistence disabled");
                None
            }
        }
    }

    pub fn data_service(&self) -> DataService {
        match self.backend() {
            Some(client) => {
                info!("Supabase persistence enabled");
                DataService::new(Arc::new(client))
            }
            None => {
                info!("Supabase not configured, running in memory only");
                DataService::unconfigured()
            }
        }
    }

    pub fn model(&self) -> Result<GeminiClient, TrackiflyError> {
        let key = self
            .gemini_api_key
            .as_deref()
            .ok_or(TrackiflyError::MissingConfig("API_KEY"))?;
        GeminiClient::with_endpoint(key, &self.gemini_model, &self.gemini_base_url)
    }

    /// The configured model, or [`Unconfigured`] so AI features fall back.
    pub fn model_or_fallback(&self) -> Arc<dyn GenerativeModel> {
        match self.model() {
            Ok(client) => Arc::new(client),
            Err(e) => {
                warn!(error = %e, "Gemini not available, AI features will use fallbacks");
                Arc::new(Unconfigured)
            }
        }
    }

    pub fn theme_store(&self) -> ThemeStore {
        ThemeStore::new(&self.preferences_path)
    }
}
