use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Day zero of the spreadsheet serial date system.
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Date ordering used when rendering serial dates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateStyle {
    /// 2024-03-15
    #[default]
    Iso,
    /// 03/15/2024
    Us,
    /// 15.03.2024
    European,
}

impl DateStyle {
    fn pattern(&self) -> &'static str {
        match self {
            DateStyle::Iso => "%Y-%m-%d",
            DateStyle::Us => "%m/%d/%Y",
            DateStyle::European => "%d.%m.%Y",
        }
    }
}

/// How a numeric cell renders, and whether it counts as a date.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum NumberFormat {
    #[default]
    General,
    Number { decimals: u8 },
    Currency { decimals: u8 },
    Percent { decimals: u8 },
    Date(DateStyle),
    Time,
    DateTime(DateStyle),
}

impl NumberFormat {
    /// Date/time category: values rendered with this format are offered as dates.
    pub fn is_date_or_time(&self) -> bool {
        matches!(self, NumberFormat::Date(_) | NumberFormat::Time | NumberFormat::DateTime(_))
    }
}

/// Per-cell formatting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CellFormat {
    pub number_format: NumberFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if let Ok(num) = trimmed.parse::<f64>() {
            return CellValue::Number(num);
        }

        CellValue::Text(trimmed.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, CellValue::Text(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Render `n` under `format`.
    pub fn format_number(n: f64, format: &NumberFormat) -> String {
        match format {
            NumberFormat::General => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", n as i64)
                } else {
                    format!("{}", n)
                }
            }
            NumberFormat::Number { decimals } => {
                format!("{:.*}", *decimals as usize, n)
            }
            NumberFormat::Currency { decimals } => {
                if n < 0.0 {
                    format!("-${:.*}", *decimals as usize, n.abs())
                } else {
                    format!("${:.*}", *decimals as usize, n)
                }
            }
            NumberFormat::Percent { decimals } => {
                format!("{:.*}%", *decimals as usize, n * 100.0)
            }
            NumberFormat::Date(style) => match serial_to_datetime(n) {
                Some(dt) => dt.format(style.pattern()).to_string(),
                None => Self::format_number(n, &NumberFormat::General),
            },
            NumberFormat::Time => match serial_to_datetime(n) {
                Some(dt) => dt.format("%H:%M:%S").to_string(),
                None => Self::format_number(n, &NumberFormat::General),
            },
            NumberFormat::DateTime(style) => match serial_to_datetime(n) {
                Some(dt) => format!("{} {}", dt.format(style.pattern()), dt.format("%H:%M:%S")),
                None => Self::format_number(n, &NumberFormat::General),
            },
        }
    }

    /// Rendering used for filter candidates and equality tests.
    pub fn formatted_display(&self, format: &CellFormat) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => Self::format_number(*n, &format.number_format),
        }
    }
}

/// Convert a serial date (days since 1899-12-30, fraction = time of day).
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

/// Inverse of `serial_to_datetime` for whole dates.
pub fn date_to_serial(date: NaiveDate) -> Option<f64> {
    let (y, m, d) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    Some((date - epoch).num_days() as f64)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    pub format: CellFormat,
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, input: &str) {
        self.value = CellValue::from_input(input);
    }

    pub fn display(&self) -> String {
        self.value.formatted_display(&self.format)
    }

    /// Numeric cell rendered with a date/time format.
    pub fn is_date(&self) -> bool {
        matches!(self.value, CellValue::Number(_)) && self.format.number_format.is_date_or_time()
    }
}
