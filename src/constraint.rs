//! Location constraint validation.
//!
//! A query targets stations through exactly one of five location filters:
//! site ids, state codes, hydrologic unit codes, a bounding box or county
//! codes. Callers hand over all five candidates as `LocationInputs`;
//! `ConstraintSet::from_inputs` checks that exactly one is populated and
//! that a bounding box is well formed, reporting every problem it finds.

use crate::model::ConfigurationError;

// ---------------------------------------------------------------------------
// Query keys
// ---------------------------------------------------------------------------

pub const KEY_SITES: &str = "sites";
pub const KEY_STATES: &str = "stateCd";
pub const KEY_HUC: &str = "huc";
pub const KEY_BBOX: &str = "bBox";
pub const KEY_COUNTIES: &str = "countyCd";

const BBOX_COMPONENTS: [&str; 4] = ["west", "south", "east", "north"];

// ---------------------------------------------------------------------------
// Caller input
// ---------------------------------------------------------------------------

/// Unvalidated location filters as supplied by the caller.
///
/// Empty strings inside the lists are ignored, so `vec![" ".into()]`
/// counts as an empty filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationInputs {
    pub sites: Vec<String>,
    pub states: Vec<String>,
    pub huc_codes: Vec<String>,
    /// `"west,south,east,north"` in decimal degrees.
    pub bounding_box: Option<String>,
    pub counties: Vec<String>,
}

impl LocationInputs {
    pub fn for_sites(sites: &[&str]) -> Self {
        Self {
            sites: sites.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }
}

/// Splits free-form list text on commas and whitespace, dropping empties.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Validated constraint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

/// A validated location filter. Exactly one kind is ever present.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintSet {
    Sites(Vec<String>),
    States(Vec<String>),
    HucCodes(Vec<String>),
    BoundingBox(BoundingBox),
    Counties(Vec<String>),
}

impl ConstraintSet {
    /// Validates caller input into a constraint.
    ///
    /// Fails if zero or several filters are populated, and independently
    /// if the bounding box does not have four numeric components inside
    /// longitude [-180, 180] / latitude [-90, 90]. Problems from both
    /// checks are returned together.
    pub fn from_inputs(inputs: &LocationInputs) -> Result<Self, ConfigurationError> {
        let sites = clean(&inputs.sites);
        let states = clean(&inputs.states);
        let hucs = clean(&inputs.huc_codes);
        let counties = clean(&inputs.counties);
        let bbox_text = inputs
            .bounding_box
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let populated: Vec<&str> = [
            (KEY_SITES, !sites.is_empty()),
            (KEY_STATES, !states.is_empty()),
            (KEY_HUC, !hucs.is_empty()),
            (KEY_BBOX, bbox_text.is_some()),
            (KEY_COUNTIES, !counties.is_empty()),
        ]
        .into_iter()
        .filter(|(_, set)| *set)
        .map(|(key, _)| key)
        .collect();

        let mut errors = ConfigurationError::new();

        match populated.len() {
            0 => errors.push(
                "location",
                None,
                format!(
                    "one of {}, {}, {}, {} or {} is required",
                    KEY_SITES, KEY_STATES, KEY_HUC, KEY_BBOX, KEY_COUNTIES
                ),
            ),
            1 => {}
            _ => {
                for key in &populated {
                    let others: Vec<&str> = populated.iter().copied().filter(|k| k != key).collect();
                    errors.push(key, None, format!("conflicts with {}", others.join(", ")));
                }
            }
        }

        let bbox = bbox_text.and_then(|text| parse_bounding_box(text, &mut errors));

        errors.into_result()?;

        let constraint = if !sites.is_empty() {
            ConstraintSet::Sites(sites)
        } else if !states.is_empty() {
            ConstraintSet::States(states)
        } else if !hucs.is_empty() {
            ConstraintSet::HucCodes(hucs)
        } else if !counties.is_empty() {
            ConstraintSet::Counties(counties)
        } else {
            match bbox {
                Some(b) => ConstraintSet::BoundingBox(b),
                // A populated but unparsable box has already been reported.
                None => return Err(ConfigurationError::single(KEY_BBOX, "bounding box missing")),
            }
        };
        Ok(constraint)
    }

    /// Query key this constraint is sent under.
    pub fn query_key(&self) -> &'static str {
        match self {
            ConstraintSet::Sites(_) => KEY_SITES,
            ConstraintSet::States(_) => KEY_STATES,
            ConstraintSet::HucCodes(_) => KEY_HUC,
            ConstraintSet::BoundingBox(_) => KEY_BBOX,
            ConstraintSet::Counties(_) => KEY_COUNTIES,
        }
    }

    /// Query value: a single comma-joined list, or the box corners at
    /// six decimal places.
    pub fn query_value(&self) -> String {
        match self {
            ConstraintSet::Sites(v)
            | ConstraintSet::States(v)
            | ConstraintSet::HucCodes(v)
            | ConstraintSet::Counties(v) => v.join(","),
            ConstraintSet::BoundingBox(b) => format!(
                "{:.6},{:.6},{:.6},{:.6}",
                b.west, b.south, b.east, b.north
            ),
        }
    }

    /// The only site, when the constraint names exactly one.
    pub fn single_site(&self) -> Option<&str> {
        match self {
            ConstraintSet::Sites(v) if v.len() == 1 => Some(v[0].as_str()),
            _ => None,
        }
    }
}

fn clean(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

/// Parses `west,south,east,north`, recording every bad component.
fn parse_bounding_box(text: &str, errors: &mut ConfigurationError) -> Option<BoundingBox> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let before = errors.problems().len();

    if parts.len() != BBOX_COMPONENTS.len() {
        errors.push(
            KEY_BBOX,
            None,
            format!("expected 4 components (west,south,east,north), found {}", parts.len()),
        );
    }

    let mut values = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let value = match part.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                errors.push(KEY_BBOX, Some(i), format!("\"{}\" is not a number", part));
                continue;
            }
        };

        // Components alternate longitude, latitude.
        let (limit, axis) = if i % 2 == 0 { (180.0, "longitude") } else { (90.0, "latitude") };
        if value < -limit || value > limit {
            let name = BBOX_COMPONENTS.get(i).copied().unwrap_or("extra");
            errors.push(
                KEY_BBOX,
                Some(i),
                format!("{} {} {} outside [-{}, {}]", name, axis, value, limit, limit),
            );
        }
        values.push(value);
    }

    if errors.problems().len() != before {
        return None;
    }
    Some(BoundingBox {
        west: values[0],
        south: values[1],
        east: values[2],
        north: values[3],
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
