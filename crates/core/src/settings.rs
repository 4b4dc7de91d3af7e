use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Keys read from the company settings key-value store.
pub const KEY_ESCALATION_ENABLED: &str = "escalation.enabled";
pub const KEY_ESCALATION_BUSINESS_DAYS: &str = "escalation.business_days_before";
pub const KEY_AUTO_APPROVE_AFTER_MAX: &str = "escalation.auto_approve_after_max";
pub const KEY_MAX_ESCALATION_LEVELS: &str = "escalation.max_levels";
pub const KEY_AUTO_SKIP_ABSENT: &str = "escalation.auto_skip_absent";
pub const KEY_COMPANY_TIMEZONE: &str = "company.timezone_offset";

/// Typed view of the escalation knobs stored in `company_settings`.
/// Missing or unparseable keys fall back to their defaults with a warning;
/// the sweep must keep running on a half-configured install.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationConfig {
    pub enabled: bool,
    pub business_days_before_escalation: u32,
    pub auto_approve_after_max_escalations: bool,
    pub max_escalation_levels: u32,
    pub auto_skip_absent_approvers: bool,
    pub timezone_offset: String,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            business_days_before_escalation: 3,
            auto_approve_after_max_escalations: false,
            max_escalation_levels: 3,
            auto_skip_absent_approvers: true,
            timezone_offset: "UTC".to_string(),
        }
    }
}

impl EscalationConfig {
    pub fn from_settings(settings: &BTreeMap<String, String>) -> Self {
        let defaults = Self::default();
        Self {
            enabled: parse_key(settings, KEY_ESCALATION_ENABLED, defaults.enabled),
            business_days_before_escalation: parse_key(
                settings,
                KEY_ESCALATION_BUSINESS_DAYS,
                defaults.business_days_before_escalation,
            ),
            auto_approve_after_max_escalations: parse_key(
                settings,
                KEY_AUTO_APPROVE_AFTER_MAX,
                defaults.auto_approve_after_max_escalations,
            ),
            max_escalation_levels: parse_key(
                settings,
                KEY_MAX_ESCALATION_LEVELS,
                defaults.max_escalation_levels,
            ),
            auto_skip_absent_approvers: parse_key(
                settings,
                KEY_AUTO_SKIP_ABSENT,
                defaults.auto_skip_absent_approvers,
            ),
            timezone_offset: settings
                .get(KEY_COMPANY_TIMEZONE)
                .cloned()
                .unwrap_or(defaults.timezone_offset),
        }
    }

    pub fn company_offset(&self) -> chrono::FixedOffset {
        crate::workdays::company_offset(&self.timezone_offset)
    }
}

fn parse_key<T>(settings: &BTreeMap<String, String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match settings.get(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(
                event_name = "settings.unparseable_value",
                key,
                value = raw.as_str(),
                "company setting has an unparseable value, using the default"
            );
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{
        EscalationConfig, KEY_AUTO_APPROVE_AFTER_MAX, KEY_COMPANY_TIMEZONE,
        KEY_ESCALATION_BUSINESS_DAYS, KEY_ESCALATION_ENABLED, KEY_MAX_ESCALATION_LEVELS,
    };

    #[test]
    fn empty_settings_yield_the_defaults() {
        let config = EscalationConfig::from_settings(&BTreeMap::new());
        assert_eq!(config, EscalationConfig::default());
        assert!(config.enabled);
        assert_eq!(config.business_days_before_escalation, 3);
    }

    #[test]
    fn stored_values_override_the_defaults() {
        let mut settings = BTreeMap::new();
        settings.insert(KEY_ESCALATION_ENABLED.to_string(), "false".to_string());
        settings.insert(KEY_ESCALATION_BUSINESS_DAYS.to_string(), "5".to_string());
        settings.insert(KEY_AUTO_APPROVE_AFTER_MAX.to_string(), "true".to_string());
        settings.insert(KEY_MAX_ESCALATION_LEVELS.to_string(), "4".to_string());
        settings.insert(KEY_COMPANY_TIMEZONE.to_string(), "+06:00".to_string());

        let config = EscalationConfig::from_settings(&settings);
        assert!(!config.enabled);
        assert_eq!(config.business_days_before_escalation, 5);
        assert!(config.auto_approve_after_max_escalations);
        assert_eq!(config.max_escalation_levels, 4);
        assert_eq!(config.company_offset().local_minus_utc(), 6 * 3600);
    }

    #[test]
    fn garbage_values_fall_back_per_key() {
        let mut settings = BTreeMap::new();
        settings.insert(KEY_ESCALATION_BUSINESS_DAYS.to_string(), "soon".to_string());
        settings.insert(KEY_ESCALATION_ENABLED.to_string(), "false".to_string());

        let config = EscalationConfig::from_settings(&settings);
        assert_eq!(config.business_days_before_escalation, 3);
        assert!(!config.enabled);
    }

    #[test]
    fn invalid_timezone_offset_resolves_to_utc() {
        let mut settings = BTreeMap::new();
        settings.insert(KEY_COMPANY_TIMEZONE.to_string(), "Mars/Olympus".to_string());

        let config = EscalationConfig::from_settings(&settings);
        assert_eq!(config.company_offset().local_minus_utc(), 0);
    }
}
