//! Environment variable precedence tests.
//!
//! Uses figment::Jail for sandboxed env var manipulation.

use figment::Jail;
use fpt_config::{FptConfig, KeyKind};

#[test]
fn legacy_variables_fill_config_values() {
    Jail::expect_with(|jail| {
        jail.set_env("SUPABASE_URL", "https://legacy.supabase.co");
        jail.set_env("SUPABASE_SERVICE_ROLE_KEY", "service-legacy");
        jail.set_env("BACKUP_DIR", "/var/backups/fpt");
        jail.set_env("RESEND_API_KEY", "re_legacy");
        jail.set_env("FUNCTION_SECRET", "cron-secret");

        let config = FptConfig::load().expect("config loads");
        assert_eq!(config.store.url, "https://legacy.supabase.co");
        assert_eq!(config.store.key_kind(), Some(KeyKind::Service));
        assert_eq!(config.backup.dir.to_str(), Some("/var/backups/fpt"));
        assert!(config.email.has_resend());
        assert!(config.server.requires_auth());
        Ok(())
    });
}

#[test]
fn unprefixed_url_beats_vite_url() {
    Jail::expect_with(|jail| {
        jail.set_env("VITE_SUPABASE_URL", "https://vite.supabase.co");
        jail.set_env("SUPABASE_URL", "https://server.supabase.co");
        jail.set_env("VITE_SUPABASE_ANON_KEY", "anon");

        let config = FptConfig::load().expect("config loads");
        assert_eq!(config.store.url, "https://server.supabase.co");
        assert_eq!(config.store.key_kind(), Some(KeyKind::Anon));
        Ok(())
    });
}

#[test]
fn prefixed_variables_beat_legacy_variables() {
    Jail::expect_with(|jail| {
        jail.set_env("SUPABASE_URL", "https://legacy.supabase.co");
        jail.set_env("FPT_STORE__URL", "https://prefixed.supabase.co");
        jail.set_env("FPT_BACKUP__KEEP", "3");
        jail.set_env("FPT_NOTIFY__SCAN_LIMIT", "25");

        let config = FptConfig::load().expect("config loads");
        assert_eq!(config.store.url, "https://prefixed.supabase.co");
        assert_eq!(config.backup.keep, 3);
        assert_eq!(config.notify.scan_limit, 25);
        Ok(())
    });
}

#[test]
fn env_beats_project_toml() {
    Jail::expect_with(|jail| {
        jail.create_dir(".fpt")?;
        jail.create_file(
            ".fpt/config.toml",
            r#"
[email]
from = "toml@example.com"
"#,
        )?;
        jail.set_env("FROM_EMAIL", "env@example.com");

        let config = FptConfig::load().expect("config loads");
        assert_eq!(config.email.from, "env@example.com");
        Ok(())
    });
}

#[test]
fn dotenv_file_is_loaded_from_project_root() {
    Jail::expect_with(|jail| {
        jail.create_file(".env", "FPT_SERVER__BIND=0.0.0.0:9000\n")?;

        let config = FptConfig::load_with_dotenv(jail.directory()).expect("config loads");
        assert_eq!(config.server.bind, "0.0.0.0:9000");

        // dotenvy writes into the process env, outside Jail's bookkeeping.
        // No other test asserts on server.bind.
        Ok(())
    });
}

#[test]
fn invalid_values_fail_to_load() {
    Jail::expect_with(|jail| {
        jail.set_env("FPT_BACKUP__PAGE_SIZE", "0");
        assert!(FptConfig::load().is_err());
        Ok(())
    });
}
