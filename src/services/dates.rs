//! Date formatting for post timestamps.
//!
//! The content source reports timestamps as `2021-03-25T19:25:28+0000`; RFC
//! 3339 is accepted as well. A missing timestamp formats as an empty string.

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    PtBr,
    En,
}

impl FromStr for Locale {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "pt-br" | "pt" => Ok(Self::PtBr),
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            _ => Err(()),
        }
    }
}

impl Locale {
    pub fn month_abbrevs(self) -> &'static [&'static str; 12] {
        const PT_BR: [&str; 12] = [
            "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
        ];
        const EN: [&str; 12] = [
            "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
        ];
        match self {
            Self::PtBr => &PT_BR,
            Self::En => &EN,
        }
    }

    fn month_abbrev(self, month: u32) -> &'static str {
        self.month_abbrevs()[(month as usize).saturating_sub(1).min(11)]
    }

    /// BCP 47 tag, as used in the page's `lang` attribute.
    pub fn tag(self) -> &'static str {
        match self {
            Self::PtBr => "pt-BR",
            Self::En => "en",
        }
    }

    fn edited_label(self, date: &str, time: &str) -> String {
        match self {
            Self::PtBr => format!("editado em {}, às {}", date, time),
            Self::En => format!("edited on {}, at {}", date, time),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DateFormatter {
    locale: Locale,
    timezone: Tz,
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self::new(Locale::default(), Tz::UTC)
    }
}

impl DateFormatter {
    pub fn new(locale: Locale, timezone: Tz) -> Self {
        Self { locale, timezone }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// `"15 mar 2021"`: day without padding, localized month abbreviation.
    pub fn format_date(&self, timestamp: Option<&str>) -> String {
        self.render(timestamp, |dt| {
            format!(
                "{} {} {}",
                dt.format("%-d"),
                self.locale.month_abbrev(chrono::Datelike::month(&dt)),
                dt.format("%Y")
            )
        })
    }

    /// `"15/03/2021 19:25"`.
    pub fn format_date_time(&self, timestamp: Option<&str>) -> String {
        self.render(timestamp, |dt| dt.format("%d/%m/%Y %H:%M").to_string())
    }

    /// The "edited on" line for a post; `None` when the post carries no
    /// last-updated timestamp.
    pub fn format_updated_at(&self, timestamp: Option<&str>) -> Option<String> {
        let raw = timestamp?;
        match parse_timestamp(raw) {
            Some(dt) => {
                let local = dt.with_timezone(&self.timezone);
                let date = self.format_date(Some(raw));
                let time = local.format("%H:%M").to_string();
                Some(self.locale.edited_label(&date, &time))
            }
            None => {
                tracing::warn!("Unparseable last publication date '{}'", raw);
                None
            }
        }
    }

    fn render<F>(&self, timestamp: Option<&str>, f: F) -> String
    where
        F: Fn(DateTime<Tz>) -> String,
    {
        let Some(raw) = timestamp else {
            return String::new();
        };
        match parse_timestamp(raw) {
            Some(dt) => f(dt.with_timezone(&self.timezone)),
            None => raw.to_string(),
        }
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
}
