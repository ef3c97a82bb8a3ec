use std::{collections::HashMap, fs, time::Duration};

use client_core::UnvoteEncoding;

const CONFIG_FILE: &str = "shareit.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub unvote_encoding: UnvoteEncoding,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            unvote_encoding: UnvoteEncoding::Zero,
            request_timeout: Duration::from_secs(10),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        apply_file_settings(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("SHAREIT_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("SHAREIT_UNVOTE_ENCODING") {
        if let Some(parsed) = parse_unvote_encoding(&v) {
            settings.unvote_encoding = parsed;
        }
    }
    if let Ok(v) = std::env::var("SHAREIT_TIMEOUT_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout = Duration::from_secs(parsed);
        }
    }

    settings
}

fn apply_file_settings(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("server_url") {
        settings.server_url = v.clone();
    }
    if let Some(v) = file_cfg.get("unvote_encoding") {
        if let Some(parsed) = parse_unvote_encoding(v) {
            settings.unvote_encoding = parsed;
        }
    }
    if let Some(v) = file_cfg.get("timeout_seconds") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout = Duration::from_secs(parsed);
        }
    }
}

fn parse_unvote_encoding(raw: &str) -> Option<UnvoteEncoding> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "zero" | "0" => Some(UnvoteEncoding::Zero),
        "prior_direction" | "prior-direction" => Some(UnvoteEncoding::PriorDirection),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_settings_override_defaults() {
        let mut settings = Settings::default();
        apply_file_settings(
            &mut settings,
            "server_url = \"http://forum.example\"\nunvote_encoding = \"prior_direction\"\ntimeout_seconds = \"30\"\n",
        );
        assert_eq!(settings.server_url, "http://forum.example");
        assert_eq!(settings.unvote_encoding, UnvoteEncoding::PriorDirection);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn malformed_file_leaves_defaults_in_place() {
        let mut settings = Settings::default();
        apply_file_settings(&mut settings, "not toml at all [");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn unvote_encoding_accepts_both_spellings() {
        assert_eq!(parse_unvote_encoding("zero"), Some(UnvoteEncoding::Zero));
        assert_eq!(
            parse_unvote_encoding("PRIOR-DIRECTION"),
            Some(UnvoteEncoding::PriorDirection)
        );
        assert_eq!(parse_unvote_encoding("sideways"), None);
    }
}
