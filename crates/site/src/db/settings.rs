//! Settings repository: opening hours and the key-value settings store.
//!
//! Settings live as text key-value rows; [`SiteSettings`] is the typed view
//! with a default for every missing or unparseable value, so a half-seeded
//! table never breaks a page.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::RepositoryError;

/// Opening hours for one weekday. Two shifts cover the lunch/dinner split;
/// a shift with either end missing is not shown.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusinessHour {
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: i32,
    pub is_open: bool,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub open_time_2: Option<NaiveTime>,
    pub close_time_2: Option<NaiveTime>,
}

impl BusinessHour {
    /// Spanish weekday name.
    #[must_use]
    pub const fn day_label(&self) -> &'static str {
        match self.day_of_week {
            0 => "Domingo",
            1 => "Lunes",
            2 => "Martes",
            3 => "Miércoles",
            4 => "Jueves",
            5 => "Viernes",
            _ => "Sábado",
        }
    }

    /// Human-readable schedule line, e.g. `12:00 - 15:00 | 20:00 - 23:30`,
    /// or `Cerrado` when the day is closed or has no complete shift.
    #[must_use]
    pub fn schedule(&self) -> String {
        if !self.is_open {
            return "Cerrado".to_owned();
        }

        let shifts: Vec<String> = [
            (self.open_time, self.close_time),
            (self.open_time_2, self.close_time_2),
        ]
        .into_iter()
        .filter_map(|(open, close)| match (open, close) {
            (Some(open), Some(close)) => {
                Some(format!("{} - {}", open.format("%H:%M"), close.format("%H:%M")))
            }
            _ => None,
        })
        .collect();

        if shifts.is_empty() {
            "Cerrado".to_owned()
        } else {
            shifts.join(" | ")
        }
    }
}

/// New values for one weekday's hours.
#[derive(Debug, Clone)]
pub struct HoursUpdate {
    pub is_open: bool,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub open_time_2: Option<NaiveTime>,
    pub close_time_2: Option<NaiveTime>,
}

/// Typed view over the `site_settings` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    /// Master switch for accepting orders.
    pub orders_open: bool,
    pub dine_in_enabled: bool,
    pub pickup_enabled: bool,
    pub delivery_enabled: bool,
    pub delivery_fee: Decimal,
    pub restaurant_phone: String,
    pub restaurant_address: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            orders_open: true,
            dine_in_enabled: true,
            pickup_enabled: true,
            delivery_enabled: true,
            delivery_fee: Decimal::from(500),
            restaurant_phone: String::new(),
            restaurant_address: String::new(),
        }
    }
}

impl SiteSettings {
    /// Build the typed view from raw key-value rows. Unknown keys are
    /// ignored; missing or unparseable values keep their default.
    #[must_use]
    pub fn from_rows(rows: &[(String, String)]) -> Self {
        let mut settings = Self::default();
        for (key, value) in rows {
            match key.as_str() {
                "orders_open" => {
                    settings.orders_open = value.parse().unwrap_or(settings.orders_open);
                }
                "dine_in_enabled" => {
                    settings.dine_in_enabled = value.parse().unwrap_or(settings.dine_in_enabled);
                }
                "pickup_enabled" => {
                    settings.pickup_enabled = value.parse().unwrap_or(settings.pickup_enabled);
                }
                "delivery_enabled" => {
                    settings.delivery_enabled =
                        value.parse().unwrap_or(settings.delivery_enabled);
                }
                "delivery_fee" => {
                    settings.delivery_fee = value.parse().unwrap_or(settings.delivery_fee);
                }
                "restaurant_phone" => settings.restaurant_phone.clone_from(value),
                "restaurant_address" => settings.restaurant_address.clone_from(value),
                _ => {}
            }
        }
        settings
    }

    fn to_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("orders_open", self.orders_open.to_string()),
            ("dine_in_enabled", self.dine_in_enabled.to_string()),
            ("pickup_enabled", self.pickup_enabled.to_string()),
            ("delivery_enabled", self.delivery_enabled.to_string()),
            ("delivery_fee", self.delivery_fee.to_string()),
            ("restaurant_phone", self.restaurant_phone.clone()),
            ("restaurant_address", self.restaurant_address.clone()),
        ]
    }
}

/// Repository for hours and settings reads and back-office writes.
pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All seven weekdays, Sunday first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn hours(&self) -> Result<Vec<BusinessHour>, RepositoryError> {
        let hours = sqlx::query_as::<_, BusinessHour>(
            r"
            SELECT day_of_week, is_open, open_time, close_time,
                   open_time_2, close_time_2
            FROM business_hours
            ORDER BY day_of_week
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(hours)
    }

    /// Replace one weekday's hours.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the weekday row doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_hours(
        &self,
        day_of_week: i32,
        update: &HoursUpdate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE business_hours
            SET is_open = $1, open_time = $2, close_time = $3,
                open_time_2 = $4, close_time_2 = $5
            WHERE day_of_week = $6
            ",
        )
        .bind(update.is_open)
        .bind(update.open_time)
        .bind(update.close_time)
        .bind(update.open_time_2)
        .bind(update.close_time_2)
        .bind(day_of_week)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// The typed settings view.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn settings(&self) -> Result<SiteSettings, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r"
            SELECT key, value FROM site_settings
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(SiteSettings::from_rows(&rows))
    }

    /// Persist every setting, inserting keys that don't exist yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a write fails.
    pub async fn save(&self, settings: &SiteSettings) -> Result<(), RepositoryError> {
        for (key, value) in settings.to_rows() {
            sqlx::query(
                r"
                INSERT INTO site_settings (key, value)
                VALUES ($1, $2)
                ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
                ",
            )
            .bind(key)
            .bind(value)
            .execute(self.pool)
            .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rows(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect()
    }

    #[test]
    fn test_settings_from_rows() {
        let settings = SiteSettings::from_rows(&rows(&[
            ("orders_open", "false"),
            ("delivery_fee", "750"),
            ("restaurant_phone", "+54 11 5555"),
            ("restaurant_address", "Calle 1"),
        ]));

        assert!(!settings.orders_open);
        assert_eq!(settings.delivery_fee, Decimal::from(750));
        assert_eq!(settings.restaurant_phone, "+54 11 5555");
        // Keys with no row keep their default
        assert!(settings.dine_in_enabled);
        assert!(settings.delivery_enabled);
    }

    #[test]
    fn test_settings_bad_values_keep_defaults() {
        let settings = SiteSettings::from_rows(&rows(&[
            ("orders_open", "yes please"),
            ("delivery_fee", "cheap"),
            ("mystery_key", "42"),
        ]));

        assert_eq!(settings, SiteSettings::default());
    }

    #[test]
    fn test_settings_round_trip_through_rows() {
        let settings = SiteSettings {
            orders_open: false,
            delivery_fee: Decimal::from(900),
            restaurant_phone: "123".to_owned(),
            ..SiteSettings::default()
        };

        let stored: Vec<(String, String)> = settings
            .to_rows()
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();
        assert_eq!(SiteSettings::from_rows(&stored), settings);
    }

    fn hour(is_open: bool, shifts: &[(&str, &str)]) -> BusinessHour {
        let parse = |s: &str| NaiveTime::parse_from_str(s, "%H:%M").unwrap();
        BusinessHour {
            day_of_week: 2,
            is_open,
            open_time: shifts.first().map(|&(o, _)| parse(o)),
            close_time: shifts.first().map(|&(_, c)| parse(c)),
            open_time_2: shifts.get(1).map(|&(o, _)| parse(o)),
            close_time_2: shifts.get(1).map(|&(_, c)| parse(c)),
        }
    }

    #[test]
    fn test_schedule_two_shifts() {
        let line = hour(true, &[("12:00", "15:00"), ("20:00", "23:30")]).schedule();
        assert_eq!(line, "12:00 - 15:00 | 20:00 - 23:30");
    }

    #[test]
    fn test_schedule_single_shift() {
        assert_eq!(hour(true, &[("12:00", "16:00")]).schedule(), "12:00 - 16:00");
    }

    #[test]
    fn test_schedule_closed_day() {
        assert_eq!(hour(false, &[("12:00", "15:00")]).schedule(), "Cerrado");
        // Open flag set but no complete shift configured
        assert_eq!(hour(true, &[]).schedule(), "Cerrado");
        let mut partial = hour(true, &[("12:00", "15:00")]);
        partial.close_time = None;
        assert_eq!(partial.schedule(), "Cerrado");
    }

    #[test]
    fn test_day_labels() {
        let mut h = hour(true, &[]);
        h.day_of_week = 0;
        assert_eq!(h.day_label(), "Domingo");
        h.day_of_week = 6;
        assert_eq!(h.day_label(), "Sábado");
    }
}
