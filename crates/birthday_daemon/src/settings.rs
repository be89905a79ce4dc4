use birthday_core::{
    default_log_level, LogSettings, ScheduleConfig, ScheduleConfigError, SmtpSettings,
};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "birthday_reminder.toml";
const ENV_PREFIX: &str = "BIRTHDAY";
const DEFAULT_DATABASE_PATH: &str = "birthday_reminder.sqlite3";
const DEFAULT_TIME_ZONE: &str = "Europe/Moscow";
const DEFAULT_FIRE_AT: &str = "12:15";
const DEFAULT_SEND_TIMEOUT_SECS: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Schedule {
    /// IANA zone name.
    pub time_zone: String,
    /// `HH:MM`, 24-hour.
    pub fire_at: String,
    pub send_timeout_secs: u64,
}

impl Schedule {
    pub fn to_config(&self) -> Result<ScheduleConfig, ScheduleConfigError> {
        ScheduleConfig::parse(
            &self.time_zone,
            &self.fire_at,
            Duration::from_secs(self.send_timeout_secs),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: Database,
    pub logging: LogSettings,
    pub schedule: Schedule,
    pub smtp: SmtpSettings,
}

impl Settings {
    /// Defaults, then `birthday_reminder.toml` if present, then
    /// `BIRTHDAY_<SECTION>__<KEY>` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(CONFIG_FILE_NAME, Environment::with_prefix(ENV_PREFIX))
    }

    fn from_sources(file: &str, environment: Environment) -> Result<Self, ConfigError> {
        let logging = LogSettings::default();
        let smtp = SmtpSettings::default();
        let config = Config::builder()
            .set_default("database.path", DEFAULT_DATABASE_PATH)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.dir", logging.dir)?
            .set_default("schedule.time_zone", DEFAULT_TIME_ZONE)?
            .set_default("schedule.fire_at", DEFAULT_FIRE_AT)?
            .set_default("schedule.send_timeout_secs", DEFAULT_SEND_TIMEOUT_SECS)?
            .set_default("smtp.host", smtp.host)?
            .set_default("smtp.port", i64::from(smtp.port))?
            .set_default("smtp.username", smtp.username)?
            .set_default("smtp.password", smtp.password)?
            .add_source(
                File::with_name(file)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(environment.prefix_separator("_").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
