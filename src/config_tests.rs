use crate::config::{Config, SinkName};
use crate::domain::errors::ConfigError;
use crate::infrastructure::settings_persistence::SettingsPersistence;
use std::env;
use std::sync::PoisonError;

fn lock() -> std::sync::MutexGuard<'static, ()> {
    crate::config::test_env_lock()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

#[test]
fn test_threshold_overrides() {
    let _guard = lock();
    unsafe {
        env::set_var("MIN_PCT_OVER", "0.05");
        env::set_var("MIN_VOL_RATIO", "3.5");
        env::set_var("MAX_RSI", "80");
    }

    let config = Config::from_env().unwrap();
    let thresholds = config.thresholds();
    assert!((thresholds.min_pct_over - 0.05).abs() < 1e-12);
    assert!((thresholds.min_vol_ratio - 3.5).abs() < 1e-12);
    assert_eq!(thresholds.max_rsi, Some(80.0));
    assert!(config.validate().is_ok());

    unsafe {
        env::remove_var("MIN_PCT_OVER");
        env::remove_var("MIN_VOL_RATIO");
        env::remove_var("MAX_RSI");
    }
}

#[test]
fn test_unparseable_value_returns_error() {
    let _guard = lock();
    unsafe { env::set_var("RSI_PERIOD", "fourteen") };

    let result = Config::from_env();
    assert!(result.is_err());
    let err_msg = format!("{:?}", result.err().unwrap());
    assert!(err_msg.contains("RSI_PERIOD"));

    unsafe { env::remove_var("RSI_PERIOD") };
}

#[test]
fn test_zero_period_fails_validation() {
    let _guard = lock();
    unsafe { env::set_var("MACD_SIGNAL_PERIOD", "0") };

    let config = Config::from_env().unwrap();
    assert_eq!(
        config.validate(),
        Err(ConfigError::InvalidPeriod {
            name: "macd_signal_period",
            value: 0
        })
    );

    unsafe { env::remove_var("MACD_SIGNAL_PERIOD") };
}

#[test]
fn test_inverted_macd_periods_fail_validation() {
    let _guard = lock();
    unsafe {
        env::set_var("MACD_FAST_PERIOD", "30");
        env::set_var("MACD_SLOW_PERIOD", "10");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(
        config.validate(),
        Err(ConfigError::MacdPeriodOrder { fast: 30, slow: 10 })
    );

    unsafe {
        env::remove_var("MACD_FAST_PERIOD");
        env::remove_var("MACD_SLOW_PERIOD");
    }
}

#[test]
fn test_zero_workers_fail_validation() {
    let _guard = lock();
    unsafe { env::set_var("WORKER_COUNT", "0") };

    let config = Config::from_env().unwrap();
    assert_eq!(config.validate(), Err(ConfigError::NoWorkers));

    unsafe { env::remove_var("WORKER_COUNT") };
}

#[test]
fn test_sink_file_overlaid_by_env() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sinks.json");

    let persistence = SettingsPersistence::new(&path);
    let mut settings = persistence.load().unwrap().unwrap_or_default();
    settings.set_enabled(SinkName::Sqlite, true);
    settings.sqlite.db_url = "sqlite://from-file.db".to_string();
    persistence.save(&settings).unwrap();

    unsafe {
        env::set_var("SINK_SETTINGS_PATH", &path);
        env::set_var("SQLITE_URL", "sqlite://from-env.db");
        env::set_var("CSV_ENABLED", "false");
    }

    let config = Config::from_env().unwrap();
    assert!(config.sinks.sqlite.enabled);
    assert_eq!(config.sinks.sqlite.db_url, "sqlite://from-env.db");
    assert!(!config.sinks.csv.enabled);

    unsafe {
        env::remove_var("SINK_SETTINGS_PATH");
        env::remove_var("SQLITE_URL");
        env::remove_var("CSV_ENABLED");
    }
}

#[test]
fn test_enabled_discord_without_webhook_fails_fast() {
    let _guard = lock();
    unsafe { env::set_var("DISCORD_ENABLED", "true") };

    let config = Config::from_env().unwrap();
    assert_eq!(
        config.validate(),
        Err(ConfigError::IncompleteSink {
            sink: "discord",
            missing: "webhook_url"
        })
    );

    unsafe { env::remove_var("DISCORD_ENABLED") };
}

#[test]
fn test_universe_mapping_from_env() {
    let _guard = lock();
    unsafe {
        env::set_var("DEFAULT_UNIVERSE", "alts");
        env::set_var("UNIVERSES", "BTC-USD:majors,ETH-USD:majors");
    }

    let config = Config::from_env().unwrap();
    let universes = config.universes();
    assert_eq!(universes.resolve("BTC-USD"), "majors");
    assert_eq!(universes.resolve("PEPE-USD"), "alts");

    unsafe {
        env::remove_var("DEFAULT_UNIVERSE");
        env::remove_var("UNIVERSES");
    }
}
