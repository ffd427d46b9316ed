//! Numeric entry buffer
//!
//! Accumulates digits and at most one decimal point. The text is re-parsed
//! after every edit; an empty buffer or a trailing point yields no value.

use heapless::String;

/// Maximum characters held in the entry buffer
pub const MAX_INPUT_LEN: usize = 12;

/// Text being typed into the field under the cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NumericInput {
    text: String<MAX_INPUT_LEN>,
    has_point: bool,
}

impl NumericInput {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            text: String::new(),
            has_point: false,
        }
    }

    /// Append a digit (0-9)
    ///
    /// Returns false if the digit is invalid or the buffer is full.
    pub fn push_digit(&mut self, digit: u8) -> bool {
        match char::from_digit(digit as u32, 10) {
            Some(c) => self.text.push(c).is_ok(),
            None => false,
        }
    }

    /// Append the decimal point
    ///
    /// A bare leading point becomes `0.`. Returns false if a point is
    /// already present or there is no room.
    pub fn push_point(&mut self) -> bool {
        if self.has_point {
            return false;
        }
        let pushed = if self.text.is_empty() {
            self.text.push_str("0.").is_ok()
        } else {
            self.text.push('.').is_ok()
        };
        self.has_point |= pushed;
        pushed
    }

    /// Remove the last character
    pub fn backspace(&mut self) -> bool {
        match self.text.pop() {
            Some('.') => {
                self.has_point = false;
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Discard everything typed
    pub fn clear(&mut self) {
        self.text.clear();
        self.has_point = false;
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Parsed value, if the text is a complete number
    pub fn value(&self) -> Option<f32> {
        if self.text.is_empty() || self.text.ends_with('.') {
            return None;
        }
        self.text.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(keys: &str) -> NumericInput {
        let mut input = NumericInput::new();
        for key in keys.chars() {
            match key {
                '.' => {
                    input.push_point();
                }
                '<' => {
                    input.backspace();
                }
                d => {
                    input.push_digit(d.to_digit(10).unwrap() as u8);
                }
            }
        }
        input
    }

    #[test]
    fn test_decimal_value() {
        let input = typed("1.5");
        assert_eq!(input.as_str(), "1.5");
        assert_eq!(input.value(), Some(1.5));
    }

    #[test]
    fn test_trailing_point_has_no_value() {
        assert_eq!(typed("12.").value(), None);
        assert_eq!(NumericInput::new().value(), None);
    }

    #[test]
    fn test_leading_point_normalized() {
        let input = typed(".25");
        assert_eq!(input.as_str(), "0.25");
        assert_eq!(input.value(), Some(0.25));
    }

    #[test]
    fn test_single_decimal_point() {
        let mut input = typed("3.1");
        assert!(!input.push_point());
        assert_eq!(input.as_str(), "3.1");
    }

    #[test]
    fn test_backspace_restores_point() {
        let mut input = typed("4.<");
        assert_eq!(input.as_str(), "4");
        assert!(input.push_point());
        assert_eq!(typed("4.<.5").value(), Some(4.5));
    }

    #[test]
    fn test_backspace_empty() {
        let mut input = NumericInput::new();
        assert!(!input.backspace());
    }

    #[test]
    fn test_full_buffer_rejects() {
        let mut input = typed("123456789012");
        assert!(!input.push_digit(3));
        assert!(!input.push_point());
        assert_eq!(input.as_str().len(), MAX_INPUT_LEN);
    }

    #[test]
    fn test_invalid_digit() {
        let mut input = NumericInput::new();
        assert!(!input.push_digit(10));
        assert!(input.is_empty());
    }
}
