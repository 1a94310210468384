use std::{env, fs, sync::Mutex};

use stockroom::config::{load_config_from, AppConfigError, DeletePolicy};
use tempfile::TempDir;

// load_config_from reads process-wide environment variables
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "RUN_ENV",
        "APP_ENV",
        "APP__DATABASE_URL",
        "APP__PRODUCT_DELETE_POLICY",
        "APP__LOG_LEVEL",
    ] {
        env::remove_var(key);
    }
}

#[test]
fn defaults_apply_without_files() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    let dir = TempDir::new().unwrap();

    let cfg = load_config_from(&dir.path().join("missing")).unwrap();

    assert_eq!(cfg.database_url(), "sqlite://stockroom.db?mode=rwc");
    assert_eq!(cfg.environment, "development");
    assert!(cfg.is_development());
    assert!(cfg.auto_migrate);
    assert_eq!(cfg.default_low_stock_threshold, 10);
    assert_eq!(cfg.product_delete_policy, DeletePolicy::Orphan);
}

#[test]
fn files_layer_and_env_overrides() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("default.toml"),
        r#"
            database_url = "sqlite://from-default.db?mode=rwc"
            default_low_stock_threshold = 4
        "#,
    )
    .unwrap();
    fs::write(
        dir.path().join("production.toml"),
        r#"
            product_delete_policy = "restrict"
            log_json = true
        "#,
    )
    .unwrap();

    env::set_var("RUN_ENV", "production");
    env::set_var("APP__DATABASE_URL", "sqlite://from-env.db?mode=rwc");

    let cfg = load_config_from(dir.path());
    clear_env();
    let cfg = cfg.unwrap();

    assert!(cfg.is_production());
    assert_eq!(cfg.database_url(), "sqlite://from-env.db?mode=rwc");
    assert_eq!(cfg.default_low_stock_threshold, 4);
    assert_eq!(cfg.product_delete_policy, DeletePolicy::Restrict);
    assert!(cfg.log_json);
}

#[test]
fn invalid_values_fail_validation() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("default.toml"),
        r#"
            log_level = "chatty"
            default_low_stock_threshold = -1
        "#,
    )
    .unwrap();

    let result = load_config_from(dir.path());

    match result {
        Err(AppConfigError::Validation(errors)) => {
            let fields = errors.field_errors();
            assert!(fields.contains_key("log_level"));
            assert!(fields.contains_key("default_low_stock_threshold"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn unknown_keys_are_rejected() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("default.toml"), "jwt_secret = \"nope\"\n").unwrap();

    assert!(matches!(
        load_config_from(dir.path()),
        Err(AppConfigError::Load(_))
    ));
}
