use fpt_config::FptConfig;

/// Emit warnings for likely mistyped env var keys that silently fell back to defaults.
pub fn warn_unconfigured(config: &FptConfig) {
    for warning in collect_unconfigured_warnings(config, std::env::vars()) {
        tracing::warn!("{warning}");
    }
}

fn collect_unconfigured_warnings<I>(config: &FptConfig, env: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_keys = env.into_iter().map(|(key, _)| key).collect::<Vec<_>>();

    let mut warnings = Vec::new();

    if !config.store.is_configured() && has_env_prefix(&env_keys, "FPT_STORE") {
        warnings.push(
            "Store config appears default while FPT_STORE* env vars exist. Use double underscores (example: FPT_STORE__URL)."
                .to_string(),
        );
    }

    if !config.email.is_configured() && has_env_prefix(&env_keys, "FPT_EMAIL") {
        warnings.push(
            "Email config appears default while FPT_EMAIL* env vars exist. Use double underscores (example: FPT_EMAIL__RESEND_API_KEY)."
                .to_string(),
        );
    }

    if !config.server.requires_auth() && has_env_prefix(&env_keys, "FPT_SERVER") {
        warnings.push(
            "Function secret is empty while FPT_SERVER* env vars exist. Use double underscores (example: FPT_SERVER__FUNCTION_SECRET)."
                .to_string(),
        );
    }

    warnings
}

fn has_env_prefix(keys: &[String], prefix: &str) -> bool {
    keys.iter()
        .any(|key| key.starts_with(prefix) && !key.starts_with(&format!("{prefix}__")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn single_underscore_store_key_warns() {
        let warnings = collect_unconfigured_warnings(
            &FptConfig::default(),
            env(&[("FPT_STORE_URL", "https://x.supabase.co")]),
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("FPT_STORE__URL"));
    }

    #[test]
    fn correctly_nested_keys_do_not_warn() {
        let warnings = collect_unconfigured_warnings(
            &FptConfig::default(),
            env(&[
                ("FPT_STORE__URL", "https://x.supabase.co"),
                ("FPT_EMAIL__FROM", "ops@example.com"),
            ]),
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn configured_sections_do_not_warn() {
        let mut config = FptConfig::default();
        config.email.resend_api_key = "re_123".into();
        let warnings =
            collect_unconfigured_warnings(&config, env(&[("FPT_EMAIL_RESEND_API_KEY", "re_123")]));
        assert!(warnings.is_empty());
    }
}
