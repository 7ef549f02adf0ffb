//! Integration tests for TOML configuration loading.

use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use fpt_config::FptConfig;
use pretty_assertions::assert_eq;

#[test]
fn loads_every_section_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[store]
url = "https://abcd.supabase.co"
service_key = "service"
timeout_secs = 10

[backup]
dir = "/srv/backups"
tables = ["clients", "tasks"]
keep = 14
batch_size = 250

[email]
from = "alerts@fireco.example"
sendgrid_api_key = "SG.key"

[notify]
queue_limit = 20
lookahead_days = 3

[server]
bind = "0.0.0.0:8080"
function_secret = "s3cret"
"#,
        )?;

        let config: FptConfig = Figment::from(Serialized::defaults(FptConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert!(config.store.is_configured());
        assert_eq!(config.store.timeout_secs, 10);
        assert_eq!(config.store.schema, "public");
        assert_eq!(config.backup.tables, vec!["clients", "tasks"]);
        assert_eq!(config.backup.keep, 14);
        assert_eq!(config.backup.batch_size, 250);
        assert_eq!(config.backup.page_size, 1000);
        assert_eq!(config.email.from, "alerts@fireco.example");
        assert!(config.email.has_sendgrid());
        assert_eq!(config.notify.queue_limit, 20);
        assert_eq!(config.notify.lookahead_days, 3);
        assert_eq!(config.notify.scan_limit, 50);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert!(config.server.requires_auth());
        Ok(())
    });
}

#[test]
fn project_toml_is_picked_up_from_project_root() {
    Jail::expect_with(|jail| {
        jail.create_dir("site/.fpt")?;
        jail.create_file(
            "site/.fpt/config.toml",
            r#"
[backup]
keep = 2
"#,
        )?;

        let root = jail.directory().join("site");
        let config = FptConfig::load_from(&root).expect("config loads");
        assert_eq!(config.backup.keep, 2);

        let without = FptConfig::load().expect("config loads");
        assert_eq!(without.backup.keep, 7);
        Ok(())
    });
}

#[test]
fn partial_sections_keep_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[email]
resend_api_key = "re_123"
"#,
        )?;

        let config: FptConfig = Figment::from(Serialized::defaults(FptConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert!(config.email.has_resend());
        assert_eq!(config.email.resend_url, "https://api.resend.com");
        assert_eq!(config.email.app_url, "https://fire-protection-tracker.com");
        assert!(!config.store.is_configured());
        Ok(())
    });
}
