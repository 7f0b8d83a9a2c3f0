//! Settings keys editable with `tilewall config`.
//!
//! Pure functions only. No I/O or filesystem access happens here.

use tilewall_common::{ComponentKind, ComponentSettings, KindSettings};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const COMMON_KEYS: &[&str] = &["enabled", "run_in_background"];
pub const DISPLAY_SERVICE_KEYS: &[&str] = &["on_start", "on_stop", "kill_names"];
pub const APP_LAUNCHER_KEYS: &[&str] = &["report", "report_server", "port"];
pub const PROXY_KEYS: &[&str] = &["host", "port", "password"];
pub const UI_KEYS: &[&str] = &["host", "port", "autologin", "saved_state"];

const BOOL_VALUES: &str = "true, false, yes, no, on, off, 1, 0";

/// Keys valid for `kind`, common keys first.
#[must_use]
pub fn valid_keys(kind: ComponentKind) -> Vec<&'static str> {
    let specific: &[&str] = match kind {
        ComponentKind::DisplayService => DISPLAY_SERVICE_KEYS,
        ComponentKind::AppLauncher => APP_LAUNCHER_KEYS,
        ComponentKind::Ui => UI_KEYS,
        ComponentKind::FileServer => &[],
        ComponentKind::Proxy => PROXY_KEYS,
    };
    COMMON_KEYS.iter().chain(specific).copied().collect()
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a key against the keys of `kind`.
pub fn validate_config_key(kind: ComponentKind, key: &str) -> Result<(), ConfigError> {
    let keys = valid_keys(kind);
    if keys.contains(&key) {
        Ok(())
    } else {
        Err(ConfigError::UnknownKey {
            kind,
            key: key.to_string(),
            valid: keys.join(", "),
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            valid: BOOL_VALUES.to_string(),
        }),
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16, ConfigError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            valid: "1-65535".to_string(),
        }),
    }
}

fn non_empty(key: &str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            valid: "a non-empty string".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Empty clears the value.
fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Hook scripts accept a literal `\n` as a line break so multi-line scripts
/// fit on one command line.
fn script(value: &str) -> String {
    value.replace("\\n", "\n")
}

// ── Get / set ────────────────────────────────────────────────────────────────

/// Current value of `key`, rendered as text.
pub fn get_value(settings: &ComponentSettings, key: &str) -> Result<String, ConfigError> {
    let kind = settings.kind();
    validate_config_key(kind, key)?;
    let value = match (key, &settings.details) {
        ("enabled", _) => settings.enabled.to_string(),
        ("run_in_background", _) => settings.run_in_background.to_string(),
        ("on_start", KindSettings::DisplayService(d)) => d.on_start.clone(),
        ("on_stop", KindSettings::DisplayService(d)) => d.on_stop.clone(),
        ("kill_names", KindSettings::DisplayService(d)) => d.kill_names.clone(),
        ("report", KindSettings::AppLauncher(l)) => l.report.to_string(),
        ("report_server", KindSettings::AppLauncher(l)) => l.report_server.clone(),
        ("port", KindSettings::AppLauncher(l)) => l.port.to_string(),
        ("host", KindSettings::Proxy(p)) => p.host.clone(),
        ("port", KindSettings::Proxy(p)) => p.port.to_string(),
        ("password", KindSettings::Proxy(p)) => p.password.clone(),
        ("host", KindSettings::Ui(u)) => u.host.clone(),
        ("port", KindSettings::Ui(u)) => u.port.to_string(),
        ("autologin", KindSettings::Ui(u)) => u.autologin.clone().unwrap_or_default(),
        ("saved_state", KindSettings::Ui(u)) => u.saved_state.clone().unwrap_or_default(),
        _ => unreachable_key(kind, key)?,
    };
    Ok(value)
}

/// Parse `value` for `key` and store it.
pub fn set_value(
    settings: &mut ComponentSettings,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let kind = settings.kind();
    validate_config_key(kind, key)?;
    match (key, &mut settings.details) {
        ("enabled", _) => settings.enabled = parse_bool(key, value)?,
        ("run_in_background", _) => settings.run_in_background = parse_bool(key, value)?,
        ("on_start", KindSettings::DisplayService(d)) => d.on_start = script(value),
        ("on_stop", KindSettings::DisplayService(d)) => d.on_stop = script(value),
        ("kill_names", KindSettings::DisplayService(d)) => {
            d.kill_names = value.split_whitespace().collect::<Vec<_>>().join(" ");
        }
        ("report", KindSettings::AppLauncher(l)) => l.report = parse_bool(key, value)?,
        ("report_server", KindSettings::AppLauncher(l)) => {
            l.report_server = non_empty(key, value)?;
        }
        ("port", KindSettings::AppLauncher(l)) => l.port = parse_port(key, value)?,
        ("host", KindSettings::Proxy(p)) => p.host = non_empty(key, value)?,
        ("port", KindSettings::Proxy(p)) => p.port = parse_port(key, value)?,
        ("password", KindSettings::Proxy(p)) => p.password = value.to_string(),
        ("host", KindSettings::Ui(u)) => u.host = non_empty(key, value)?,
        ("port", KindSettings::Ui(u)) => u.port = parse_port(key, value)?,
        ("autologin", KindSettings::Ui(u)) => u.autologin = optional(value),
        ("saved_state", KindSettings::Ui(u)) => u.saved_state = optional(value),
        _ => unreachable_key(kind, key)?,
    }
    Ok(())
}

/// A key that passed validation but has no accessor. Only reachable when the
/// key tables and the accessors drift apart.
fn unreachable_key<T>(kind: ComponentKind, key: &str) -> Result<T, ConfigError> {
    Err(ConfigError::UnknownKey {
        kind,
        key: key.to_string(),
        valid: valid_keys(kind).join(", "),
    })
}

// ── Unit tests ───────────────────────────────────────────────────────────────
