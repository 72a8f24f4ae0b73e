//! Number format codes.
//!
//! Both container formats attach a number format to each cell: XLSX via
//! `styles.xml` (`numFmtId` per cell XF), XLS via FORMAT/XF records. The
//! converter only needs to answer two questions about a format: is it a
//! date/time format, and is it the text format — everything else renders
//! through the general decimal pattern.

/// A cell number format, either one of the well-known built-in IDs or a
/// custom format code string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NumberFormat {
    /// General format (default)
    #[default]
    General,

    /// Built-in format by ID
    BuiltIn(u32),

    /// Custom format code
    Custom(String),
}

impl NumberFormat {
    /// 49 - `@` (text)
    pub const ID_TEXT: u32 = 49;

    /// Create a number format from a format code string.
    ///
    /// Recognizes `General` (case-insensitive) and normalizes it.
    pub fn from_code<S: Into<String>>(code: S) -> Self {
        let code = code.into();
        if code.eq_ignore_ascii_case("general") {
            NumberFormat::General
        } else {
            NumberFormat::Custom(code)
        }
    }

    /// Create a built-in format by ID.
    pub fn from_id(id: u32) -> Self {
        if id == 0 {
            NumberFormat::General
        } else {
            NumberFormat::BuiltIn(id)
        }
    }

    /// Get the format code string.
    pub fn code(&self) -> &str {
        match self {
            NumberFormat::General => "General",
            NumberFormat::BuiltIn(id) => Self::builtin_code(*id),
            NumberFormat::Custom(s) => s,
        }
    }

    /// Format code for a built-in ID.
    fn builtin_code(id: u32) -> &'static str {
        match id {
            0 => "General",
            1 => "0",
            2 => "0.00",
            3 => "#,##0",
            4 => "#,##0.00",
            9 => "0%",
            10 => "0.00%",
            11 => "0.00E+00",
            12 => "# ?/?",
            13 => "# ??/??",
            14 => "mm-dd-yy",
            15 => "d-mmm-yy",
            16 => "d-mmm",
            17 => "mmm-yy",
            18 => "h:mm AM/PM",
            19 => "h:mm:ss AM/PM",
            20 => "h:mm",
            21 => "h:mm:ss",
            22 => "m/d/yy h:mm",
            37 => "#,##0 ;(#,##0)",
            38 => "#,##0 ;[Red](#,##0)",
            39 => "#,##0.00;(#,##0.00)",
            40 => "#,##0.00;[Red](#,##0.00)",
            45 => "mm:ss",
            46 => "[h]:mm:ss",
            47 => "mm:ss.0",
            49 => "@",
            _ => "General",
        }
    }

    /// Check whether this is the text format (`@`).
    pub fn is_text(&self) -> bool {
        match self {
            NumberFormat::BuiltIn(id) => *id == Self::ID_TEXT,
            NumberFormat::Custom(s) => s == "@",
            NumberFormat::General => false,
        }
    }

    /// Check whether this is a date/time format.
    ///
    /// Built-ins 14-22 and 45-47 are date/time. Custom codes are classified
    /// by scanning for date placeholder letters outside quoted literals,
    /// `[...]` sections (colors, locale prefixes) and backslash escapes.
    pub fn is_date(&self) -> bool {
        match self {
            NumberFormat::General => false,
            NumberFormat::BuiltIn(id) => matches!(id, 14..=22 | 45..=47),
            NumberFormat::Custom(code) => code_is_date(code),
        }
    }
}

/// Scan a custom format code for date/time placeholders.
fn code_is_date(code: &str) -> bool {
    let mut chars = code.chars();
    let mut has_date_token = false;
    let mut has_digit_token = false;

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                // Quoted literal: skip to the closing quote
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '[' => {
                // Color/locale/elapsed section. Elapsed-time sections like
                // [h] or [mm] are themselves time tokens.
                let mut section = String::new();
                for q in chars.by_ref() {
                    if q == ']' {
                        break;
                    }
                    section.push(q);
                }
                if section
                    .chars()
                    .all(|c| matches!(c, 'h' | 'H' | 'm' | 'M' | 's' | 'S'))
                    && !section.is_empty()
                {
                    has_date_token = true;
                }
            }
            '\\' => {
                // Escaped literal character
                chars.next();
            }
            'y' | 'Y' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' | 'm' | 'M' => {
                has_date_token = true;
            }
            '0' | '#' | '?' => {
                has_digit_token = true;
            }
            _ => {}
        }
    }

    // A code mixing digit placeholders with date letters but no date
    // separator ("#0 m") is a numeric code with a stray letter
    has_date_token && !(has_digit_token && !code_has_separator(code))
}

/// True if the code contains a date/time separator (`/`, `:`, `-`).
fn code_has_separator(code: &str) -> bool {
    code.contains('/') || code.contains(':') || code.contains('-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_date_ids() {
        assert!(NumberFormat::from_id(14).is_date());
        assert!(NumberFormat::from_id(22).is_date());
        assert!(NumberFormat::from_id(46).is_date());
        assert!(!NumberFormat::from_id(2).is_date());
        assert!(!NumberFormat::from_id(49).is_date());
    }

    #[test]
    fn test_custom_date_codes() {
        assert!(NumberFormat::from_code("yyyy-mm-dd").is_date());
        assert!(NumberFormat::from_code("dd/mm/yyyy hh:mm").is_date());
        assert!(NumberFormat::from_code("[h]:mm:ss").is_date());
        assert!(!NumberFormat::from_code("0.00").is_date());
        assert!(!NumberFormat::from_code("0.00E+00").is_date());
        assert!(!NumberFormat::from_code("#,##0").is_date());
        // "m" inside a quoted literal is not a date token
        assert!(!NumberFormat::from_code("0.0\" m\"").is_date());
    }

    #[test]
    fn test_general_normalization() {
        assert_eq!(NumberFormat::from_code("General"), NumberFormat::General);
        assert_eq!(NumberFormat::from_code("GENERAL"), NumberFormat::General);
        assert_eq!(NumberFormat::from_id(0), NumberFormat::General);
    }

    #[test]
    fn test_is_text() {
        assert!(NumberFormat::from_id(49).is_text());
        assert!(NumberFormat::from_code("@").is_text());
        assert!(!NumberFormat::General.is_text());
    }
}
