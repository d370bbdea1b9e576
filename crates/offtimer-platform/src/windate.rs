//! Windows short-date rendering.
//!
//! `schtasks /sd` expects the start date in the user's regional
//! short-date format, which varies between locales (`M/d/yyyy`,
//! `dd.MM.yyyy`, `yyyy-MM-dd`, ...). The pattern is resolved from the
//! registry by the gateway and rendered here as pure string work.

use chrono::{Datelike, NaiveDate};

/// Fallback when the pattern cannot be resolved from the OS.
pub const DEFAULT_SHORT_DATE_PATTERN: &str = "M/d/yyyy";

/// Render `date` according to a Windows short-date pattern.
///
/// Supports the `d`, `dd`, `M`, `MM`, `yy` and `yyyy` tokens; every other
/// character is copied through as a separator. Longer runs collapse to
/// the zero-padded numeric forms.
pub fn format_short_date(pattern: &str, date: NaiveDate) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        match c {
            'd' => {
                if run >= 2 {
                    out.push_str(&format!("{:02}", date.day()));
                } else {
                    out.push_str(&date.day().to_string());
                }
            }
            'M' => {
                if run >= 2 {
                    out.push_str(&format!("{:02}", date.month()));
                } else {
                    out.push_str(&date.month().to_string());
                }
            }
            'y' => {
                if run >= 4 {
                    out.push_str(&format!("{:04}", date.year()));
                } else {
                    out.push_str(&format!("{:02}", date.year().rem_euclid(100)));
                }
            }
            _ => {
                for _ in 0..run {
                    out.push(c);
                }
            }
        }
        i += run;
    }

    out
}
