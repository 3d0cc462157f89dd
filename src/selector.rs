// src/selector.rs
//! Operator-supplied selectors and the predicates that validate them.
use std::{fmt, str::FromStr};

use crate::error::{FeeScheduleError, Result};

/// Which physician rate column prices the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateType {
    Physician,
    Facility,
}

impl FromStr for RateType {
    type Err = FeeScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "physician" => Ok(Self::Physician),
            "2" | "facility" => Ok(Self::Facility),
            _ => Err(FeeScheduleError::UnknownRateType(s.to_string())),
        }
    }
}

impl fmt::Display for RateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Physician => write!(f, "Physician"),
            Self::Facility => write!(f, "Facility"),
        }
    }
}

/// Upper-cased two-letter state abbreviation.
pub fn parse_state(input: &str) -> Result<String> {
    let state = input.trim().to_ascii_uppercase();
    if state.len() == 2 && state.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(state)
    } else {
        Err(FeeScheduleError::InvalidState(input.to_string()))
    }
}

pub fn parse_locality(input: &str) -> Result<u32> {
    input
        .trim()
        .parse()
        .map_err(|_| FeeScheduleError::InvalidLocality(input.to_string()))
}

/// Whole-number percentage, strictly positive.
pub fn parse_percentage(input: &str) -> Result<u32> {
    match input.trim().parse::<u32>() {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(FeeScheduleError::InvalidPercentage(input.to_string())),
    }
}

/// Schedule numbers end up in a file name, so no separators or whitespace.
pub fn parse_schedule_number(input: &str) -> Result<String> {
    let number = input.trim();
    let ok = !number.is_empty()
        && !number
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control());
    if ok {
        Ok(number.to_string())
    } else {
        Err(FeeScheduleError::InvalidScheduleNumber(input.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_type_accepts_numbers_and_names() {
        assert_eq!("1".parse::<RateType>().ok(), Some(RateType::Physician));
        assert_eq!(" Facility ".parse::<RateType>().ok(), Some(RateType::Facility));
        assert!(matches!(
            "3".parse::<RateType>(),
            Err(FeeScheduleError::UnknownRateType(_))
        ));
        assert!("".parse::<RateType>().is_err());
    }

    #[test]
    fn state_is_case_insensitive() {
        assert_eq!(parse_state(" va").ok().as_deref(), Some("VA"));
        assert!(parse_state("Virginia").is_err());
        assert!(parse_state("V1").is_err());
    }

    #[test]
    fn percentage_must_be_positive_integer() {
        assert_eq!(parse_percentage("110").ok(), Some(110));
        assert!(parse_percentage("0").is_err());
        assert!(parse_percentage("-5").is_err());
        assert!(parse_percentage("12.5").is_err());
    }

    #[test]
    fn schedule_number_is_file_name_safe() {
        assert_eq!(parse_schedule_number(" 1234 ").ok().as_deref(), Some("1234"));
        assert!(parse_schedule_number("").is_err());
        assert!(parse_schedule_number("12/34").is_err());
        assert!(parse_schedule_number("12 34").is_err());
    }

    #[test]
    fn locality_is_an_integer() {
        assert_eq!(parse_locality("01").ok(), Some(1));
        assert!(parse_locality("one").is_err());
    }
}
