//! Checks that a completion follows the output skeleton of the template.
//!
//! The template constrains the model only through natural-language rules, so
//! the response is parsed back against the skeleton before it reaches a user:
//! headers present once and in order, no text outside the skeleton, the
//! mandatory note unchanged and the address type one of the two allowed
//! values.
//!
//! The address type is not cross-checked against the delivery lines here:
//! the model may drop the RESIDENTIAL marker when it copies the address, so
//! only the source document can settle the classification.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::template::{MANDATORY_NOTE_BODY, MANDATORY_NOTE_HEADER, SECTION_HEADERS};

static RESIDENTIAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bRESIDENTIAL\b").unwrap());

/// Delivery address classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AddressType {
    Residential,
    Commercial,
}

impl AddressType {
    /// `Residential` iff the word RESIDENTIAL appears in the address.
    pub fn classify(address: &str) -> Self {
        if RESIDENTIAL_RE.is_match(address) {
            AddressType::Residential
        } else {
            AddressType::Commercial
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AddressType::Residential => "RESIDENTIAL",
            AddressType::Commercial => "COMMERCIAL",
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressType {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "RESIDENTIAL" => Ok(AddressType::Residential),
            "COMMERCIAL" => Ok(AddressType::Commercial),
            other => Err(LayoutError::InvalidAddressType(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("text before the first section: {0:?}")]
    LeadingText(String),
    #[error("missing header {0:?}")]
    MissingHeader(&'static str),
    #[error("header {0:?} appears more than once")]
    DuplicateHeader(&'static str),
    #[error("header {header:?} appears before {after:?}")]
    OutOfOrder {
        header: &'static str,
        after: &'static str,
    },
    #[error("unexpected text outside the skeleton: {0:?}")]
    UnexpectedText(String),
    #[error("address type must be RESIDENTIAL or COMMERCIAL, got {0:?}")]
    InvalidAddressType(String),
    #[error("mandatory note was altered")]
    NoticeAltered,
}

/// The fields of a completion that passed validation.
///
/// Fields the source document lacked are kept as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentSummary {
    pub pickup: Vec<String>,
    pub delivery: Vec<String>,
    pub address_type: AddressType,
    pub weight: String,
    pub pieces: String,
    pub miles: String,
    pub total_rate: String,
}

// Indices into SECTION_HEADERS.
const PICK_UP: usize = 0;
const DELIVERY: usize = 1;
const ADDRESS_TYPE: usize = 2;
const WEIGHT: usize = 3;
const PIECES: usize = 4;
const MILES: usize = 5;
const TOTAL_RATE: usize = 6;
const NOTE: usize = 7;

/// Labels take a value after the colon; bare headers stand on their own line.
fn matches_header(line: &str, header: &str) -> bool {
    if header.ends_with(':') && header != MANDATORY_NOTE_HEADER {
        line.starts_with(header)
    } else {
        line == header
    }
}

fn non_blank<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    lines.iter().copied().filter(|l| !l.is_empty()).collect()
}

/// Parse `completion` against the output skeleton.
pub fn validate_layout(completion: &str) -> Result<ShipmentSummary, LayoutError> {
    let lines: Vec<&str> = completion.lines().map(str::trim).collect();

    match lines.iter().find(|l| !l.is_empty()) {
        Some(first) if *first == SECTION_HEADERS[PICK_UP] => {}
        Some(first) if SECTION_HEADERS.iter().any(|h| matches_header(first, h)) => {
            return Err(LayoutError::MissingHeader(SECTION_HEADERS[PICK_UP]));
        }
        Some(first) => return Err(LayoutError::LeadingText(first.to_string())),
        None => return Err(LayoutError::MissingHeader(SECTION_HEADERS[PICK_UP])),
    }

    let mut positions = [0usize; SECTION_HEADERS.len()];
    for (slot, header) in SECTION_HEADERS.into_iter().enumerate() {
        let mut found = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| matches_header(l, header))
            .map(|(i, _)| i);
        positions[slot] = found.next().ok_or(LayoutError::MissingHeader(header))?;
        if found.next().is_some() {
            return Err(LayoutError::DuplicateHeader(header));
        }
    }
    for pair in 1..positions.len() {
        if positions[pair] < positions[pair - 1] {
            return Err(LayoutError::OutOfOrder {
                header: SECTION_HEADERS[pair],
                after: SECTION_HEADERS[pair - 1],
            });
        }
    }

    // Between the address type and the note only the labelled fields may appear.
    for line in &lines[positions[ADDRESS_TYPE] + 1..positions[NOTE]] {
        if !line.is_empty() && !SECTION_HEADERS.iter().any(|h| matches_header(line, h)) {
            return Err(LayoutError::UnexpectedText(line.to_string()));
        }
    }

    let expected_note: Vec<&str> = MANDATORY_NOTE_BODY
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if non_blank(&lines[positions[NOTE] + 1..]) != expected_note {
        return Err(LayoutError::NoticeAltered);
    }

    let value = |slot: usize| -> String {
        lines[positions[slot]][SECTION_HEADERS[slot].len()..]
            .trim()
            .to_string()
    };

    let pickup = non_blank(&lines[positions[PICK_UP] + 1..positions[DELIVERY]]);
    let delivery = non_blank(&lines[positions[DELIVERY] + 1..positions[ADDRESS_TYPE]]);

    let address_type: AddressType = value(ADDRESS_TYPE).parse()?;

    Ok(ShipmentSummary {
        pickup: pickup.into_iter().map(str::to_string).collect(),
        delivery: delivery.into_iter().map(str::to_string).collect(),
        address_type,
        weight: value(WEIGHT),
        pieces: value(PIECES),
        miles: value(MILES),
        total_rate: value(TOTAL_RATE),
    })
}
