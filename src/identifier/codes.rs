//! Jurisdiction code tables
//!
//! Maps state names to two-letter codes, (state, district) pairs to
//! two-digit district codes and (district, constituency) pairs to two-digit
//! constituency codes. Lookups in both directions are scoped by the parent
//! jurisdiction, since district and constituency codes repeat across
//! parents.

use std::collections::HashMap;

/// Sentinel state code for names missing from the table
pub const UNKNOWN_STATE_CODE: &str = "XX";

/// Sentinel district/constituency code for names missing from the table
pub const UNKNOWN_AREA_CODE: &str = "00";

/// Decoded name for an unmapped state code
pub const UNKNOWN_STATE: &str = "Unknown State";

/// Decoded name for an unmapped district code
pub const UNKNOWN_DISTRICT: &str = "Unknown District";

/// Decoded name for an unmapped constituency code
pub const UNKNOWN_CONSTITUENCY: &str = "Unknown Constituency";

const STATES: &[(&str, &str)] = &[
    ("Andhra Pradesh", "AP"),
    ("Arunachal Pradesh", "AR"),
    ("Assam", "AS"),
    ("Bihar", "BR"),
    ("Chhattisgarh", "CG"),
    ("Goa", "GA"),
    ("Gujarat", "GJ"),
    ("Haryana", "HR"),
    ("Himachal Pradesh", "HP"),
    ("Jharkhand", "JH"),
    ("Karnataka", "KA"),
    ("Kerala", "KL"),
    ("Madhya Pradesh", "MP"),
    ("Maharashtra", "MH"),
    ("Manipur", "MN"),
    ("Meghalaya", "ML"),
    ("Mizoram", "MZ"),
    ("Nagaland", "NL"),
    ("Odisha", "OD"),
    ("Punjab", "PB"),
    ("Rajasthan", "RJ"),
    ("Sikkim", "SK"),
    ("Tamil Nadu", "TN"),
    ("Telangana", "TG"),
    ("Tripura", "TR"),
    ("Uttar Pradesh", "UP"),
    ("Uttarakhand", "UK"),
    ("West Bengal", "WB"),
    // Union Territories
    ("Andaman and Nicobar Islands", "AN"),
    ("Chandigarh", "CH"),
    ("Dadra and Nagar Haveli and Daman and Diu", "DH"),
    ("Delhi", "DL"),
    ("Jammu and Kashmir", "JK"),
    ("Ladakh", "LA"),
    ("Lakshadweep", "LD"),
    ("Puducherry", "PY"),
];

const DISTRICTS: &[(&str, &[(&str, &str)])] = &[
    (
        "Rajasthan",
        &[
            ("Jaipur", "06"),
            ("Jodhpur", "07"),
            ("Udaipur", "08"),
            ("Kota", "09"),
            ("Ajmer", "10"),
        ],
    ),
    (
        "Maharashtra",
        &[
            ("Mumbai", "04"),
            ("Pune", "05"),
            ("Nagpur", "06"),
            ("Nashik", "07"),
            ("Aurangabad", "08"),
        ],
    ),
    (
        "Uttar Pradesh",
        &[
            ("Lucknow", "11"),
            ("Kanpur", "12"),
            ("Varanasi", "13"),
            ("Agra", "14"),
            ("Prayagraj", "15"),
        ],
    ),
    (
        "Delhi",
        &[
            ("New Delhi", "01"),
            ("South Delhi", "02"),
            ("North Delhi", "03"),
            ("East Delhi", "04"),
        ],
    ),
    (
        "Karnataka",
        &[
            ("Bengaluru", "21"),
            ("Mysuru", "22"),
            ("Mangaluru", "23"),
            ("Hubballi", "24"),
        ],
    ),
];

const CONSTITUENCIES: &[(&str, &[(&str, &str)])] = &[
    (
        "Jaipur",
        &[
            ("Jaipur South", "23"),
            ("Jaipur North", "24"),
            ("Jaipur Rural", "25"),
        ],
    ),
    ("Mumbai", &[("Mumbai South", "11"), ("Mumbai North", "12")]),
    (
        "Bengaluru",
        &[
            ("Bangalore South", "31"),
            ("Bangalore Central", "32"),
            ("Bangalore North", "33"),
        ],
    ),
    (
        "Lucknow",
        &[("Lucknow Central", "41"), ("Lucknow East", "42")],
    ),
];

/// Bidirectional lookup over a single level of the jurisdiction hierarchy
#[derive(Debug, Clone, Default)]
struct CodeMap {
    by_name: HashMap<String, String>,
    by_code: HashMap<String, String>,
}

impl CodeMap {
    fn insert(&mut self, name: &str, code: &str) {
        if let Some(old_code) = self.by_name.insert(name.to_string(), code.to_string()) {
            // The old code may since have been claimed by another name
            if self.by_code.get(&old_code).is_some_and(|owner| owner == name) {
                self.by_code.remove(&old_code);
            }
        }
        self.by_code.insert(code.to_string(), name.to_string());
    }
}

/// State, district and constituency code tables
#[derive(Debug, Clone, Default)]
pub struct CodeTable {
    states: CodeMap,
    /// keyed by state name
    districts: HashMap<String, CodeMap>,
    /// keyed by district name
    constituencies: HashMap<String, CodeMap>,
}

impl CodeTable {
    /// An empty table; every lookup falls back to the sentinels
    pub fn empty() -> Self {
        Self::default()
    }

    /// The tables shipped with the registration service
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (state, code) in STATES {
            table.insert_state(state, code);
        }
        for (state, districts) in DISTRICTS {
            for (district, code) in *districts {
                table.insert_district(state, district, code);
            }
        }
        for (district, constituencies) in CONSTITUENCIES {
            for (constituency, code) in *constituencies {
                table.insert_constituency(district, constituency, code);
            }
        }
        table
    }

    pub fn insert_state(&mut self, state: &str, code: &str) {
        self.states.insert(state, code);
    }

    pub fn insert_district(&mut self, state: &str, district: &str, code: &str) {
        self.districts
            .entry(state.to_string())
            .or_default()
            .insert(district, code);
    }

    pub fn insert_constituency(&mut self, district: &str, constituency: &str, code: &str) {
        self.constituencies
            .entry(district.to_string())
            .or_default()
            .insert(constituency, code);
    }

    /// Two-letter code for `state`, or [`UNKNOWN_STATE_CODE`]
    pub fn state_code(&self, state: &str) -> &str {
        self.states
            .by_name
            .get(state)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_STATE_CODE)
    }

    /// Two-digit code for `district` within `state`, or [`UNKNOWN_AREA_CODE`]
    pub fn district_code(&self, state: &str, district: &str) -> &str {
        self.districts
            .get(state)
            .and_then(|map| map.by_name.get(district))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_AREA_CODE)
    }

    /// Two-digit code for `constituency` within `district`, or [`UNKNOWN_AREA_CODE`]
    pub fn constituency_code(&self, district: &str, constituency: &str) -> &str {
        self.constituencies
            .get(district)
            .and_then(|map| map.by_name.get(constituency))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_AREA_CODE)
    }

    pub fn state_name(&self, code: &str) -> Option<&str> {
        self.states.by_code.get(code).map(String::as_str)
    }

    pub fn district_name(&self, state: &str, code: &str) -> Option<&str> {
        self.districts
            .get(state)
            .and_then(|map| map.by_code.get(code))
            .map(String::as_str)
    }

    pub fn constituency_name(&self, district: &str, code: &str) -> Option<&str> {
        self.constituencies
            .get(district)
            .and_then(|map| map.by_code.get(code))
            .map(String::as_str)
    }
}
