//! Money and percentage formatting for reports and exports.

use serde::{Deserialize, Serialize};

/// ISO 4217 currency code, stored upper-case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("CAD")
    }
}

/// Separators used when rendering numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleConfig {
    pub language_tag: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language_tag: "en-CA".into(),
            decimal_separator: '.',
            grouping_separator: ',',
        }
    }
}

impl LocaleConfig {
    /// Picks separators for a language tag; unknown tags fall back to `en`.
    pub fn for_tag(tag: &str) -> Self {
        let lowered = tag.to_ascii_lowercase();
        let (decimal_separator, grouping_separator) = if lowered.starts_with("fr") {
            (',', ' ')
        } else if lowered.starts_with("de") || lowered.starts_with("pt") {
            (',', '.')
        } else {
            ('.', ',')
        };
        Self {
            language_tag: tag.to_string(),
            decimal_separator,
            grouping_separator,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum NegativeStyle {
    #[default]
    Sign,
    Parentheses,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CurrencyDisplay {
    #[default]
    Symbol,
    Code,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FormatOptions {
    pub currency_display: CurrencyDisplay,
    pub negative_style: NegativeStyle,
}

pub fn symbol_for(code: &str) -> &str {
    match code {
        "USD" | "CAD" | "AUD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        other => other,
    }
}

pub fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

/// Renders `value` with the locale's separators and fixed precision.
pub fn format_number(locale: &LocaleConfig, value: f64, precision: u8) -> String {
    let rendered = format!("{:.*}", precision as usize, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (rendered.as_str(), None),
    };
    let mut out = String::new();
    if value < 0.0 && rendered.chars().any(|ch| ch != '0' && ch != '.') {
        out.push('-');
    }
    out.push_str(&group_digits(int_part, locale.grouping_separator));
    if let Some(frac) = frac_part {
        out.push(locale.decimal_separator);
        out.push_str(frac);
    }
    out
}

fn group_digits(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    grouped
}

pub fn format_currency_value(
    amount: f64,
    code: &CurrencyCode,
    locale: &LocaleConfig,
    options: &FormatOptions,
) -> String {
    let precision = minor_units_for(code.as_str());
    let body = format_number(locale, amount.abs(), precision);
    let negative = amount < 0.0 && body.chars().any(|ch| ch.is_ascii_digit() && ch != '0');
    let prefixed = match options.currency_display {
        CurrencyDisplay::Symbol => format!("{}{}", symbol_for(code.as_str()), body),
        CurrencyDisplay::Code => format!("{} {}", code.as_str(), body),
    };
    match (negative, options.negative_style) {
        (false, _) => prefixed,
        (true, NegativeStyle::Sign) => format!("-{prefixed}"),
        (true, NegativeStyle::Parentheses) => format!("({prefixed})"),
    }
}

/// Formats a fraction as a percentage, e.g. `0.13` as `13.00%`.
pub fn format_percent(locale: &LocaleConfig, fraction: f64) -> String {
    format!("{}%", format_number(locale, fraction * 100.0, 2))
}

/// Formatter bundle handed to report and export code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoneyFormat {
    pub code: CurrencyCode,
    pub locale: LocaleConfig,
    pub options: FormatOptions,
}

impl MoneyFormat {
    pub fn new(code: &str, language_tag: &str) -> Self {
        Self {
            code: CurrencyCode::new(code),
            locale: LocaleConfig::for_tag(language_tag),
            options: FormatOptions::default(),
        }
    }

    pub fn money(&self, amount: f64) -> String {
        format_currency_value(amount, &self.code, &self.locale, &self.options)
    }

    pub fn percent(&self, fraction: f64) -> String {
        format_percent(&self.locale, fraction)
    }
}
