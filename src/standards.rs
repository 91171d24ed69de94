/// Regulatory standard registry for the pollution index service.
///
/// Defines the built-in WHO and EPA drinking-water tables (permissible limit
/// and health weight per metal) and `StandardSet`, the indexed form the
/// calculator binds to. This is the single source of truth for reference
/// limits; other modules should look rows up through a `StandardSet` rather
/// than hardcoding limits.
///
/// Sources:
///   - WHO Guidelines for Drinking-water Quality, 4th ed.
///   - US EPA National Primary/Secondary Drinking Water Regulations

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use crate::model::{HmpiError, RegulatoryStandard, Result, StandardFamily};

// ---------------------------------------------------------------------------
// Static reference rows
// ---------------------------------------------------------------------------

/// One row of a built-in table, in `'static` form.
pub struct StandardRow {
    pub metal: &'static str,
    /// Permissible limit in mg/L.
    pub permissible_limit: f64,
    pub health_weight: f64,
}

/// WHO guideline values. Default standard set.
pub static WHO_STANDARDS: &[StandardRow] = &[
    StandardRow { metal: "As", permissible_limit: 0.01, health_weight: 10.0 },
    StandardRow { metal: "Pb", permissible_limit: 0.01, health_weight: 8.0 },
    StandardRow { metal: "Cd", permissible_limit: 0.003, health_weight: 9.0 },
    StandardRow { metal: "Cr", permissible_limit: 0.05, health_weight: 6.0 },
    StandardRow { metal: "Hg", permissible_limit: 0.006, health_weight: 9.5 },
    StandardRow { metal: "Ni", permissible_limit: 0.07, health_weight: 5.0 },
    StandardRow { metal: "Cu", permissible_limit: 2.0, health_weight: 3.0 },
    StandardRow { metal: "Zn", permissible_limit: 3.0, health_weight: 2.0 },
    StandardRow { metal: "Fe", permissible_limit: 0.3, health_weight: 2.5 },
    StandardRow { metal: "Mn", permissible_limit: 0.4, health_weight: 3.5 },
];

/// EPA maximum contaminant levels (action level for Pb and Cu).
/// Zn, Fe and Mn are secondary-only under EPA and are not listed.
pub static EPA_STANDARDS: &[StandardRow] = &[
    StandardRow { metal: "As", permissible_limit: 0.01, health_weight: 10.0 },
    StandardRow { metal: "Pb", permissible_limit: 0.015, health_weight: 8.0 },
    StandardRow { metal: "Cd", permissible_limit: 0.005, health_weight: 9.0 },
    StandardRow { metal: "Cr", permissible_limit: 0.1, health_weight: 6.0 },
    StandardRow { metal: "Hg", permissible_limit: 0.002, health_weight: 9.5 },
    StandardRow { metal: "Ni", permissible_limit: 0.1, health_weight: 5.0 },
    StandardRow { metal: "Cu", permissible_limit: 1.3, health_weight: 3.0 },
];

/// Smallest permissible limit a custom row may declare, in mg/L.
pub const MIN_PERMISSIBLE_LIMIT: f64 = 1.0e-9;

/// Largest health weight a custom row may declare.
pub const MAX_HEALTH_WEIGHT: f64 = 1.0e6;

static WHO_SET: LazyLock<Arc<StandardSet>> =
    LazyLock::new(|| Arc::new(StandardSet::from_static(WHO_STANDARDS, StandardFamily::Who)));

static EPA_SET: LazyLock<Arc<StandardSet>> =
    LazyLock::new(|| Arc::new(StandardSet::from_static(EPA_STANDARDS, StandardFamily::Epa)));

// ---------------------------------------------------------------------------
// Standard set
// ---------------------------------------------------------------------------

/// An ordered, immutable collection of standard rows with O(1) lookup by
/// metal symbol. Symbols are unique within a set.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardSet {
    rows: Vec<RegulatoryStandard>,
    index: HashMap<String, usize>,
}

impl StandardSet {
    /// Builds a set from caller-supplied rows.
    ///
    /// Fails if a metal appears twice, if a limit is below
    /// `MIN_PERMISSIBLE_LIMIT`, or if a weight is not in (0, `MAX_HEALTH_WEIGHT`].
    pub fn new(rows: Vec<RegulatoryStandard>) -> Result<Self> {
        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            validate_row(row)?;
            if index.insert(row.metal.clone(), i).is_some() {
                return Err(HmpiError::DuplicateStandard(row.metal.clone()));
            }
        }
        Ok(Self { rows, index })
    }

    fn from_static(table: &[StandardRow], family: StandardFamily) -> Self {
        let rows = table
            .iter()
            .map(|r| RegulatoryStandard {
                metal: r.metal.to_string(),
                permissible_limit: r.permissible_limit,
                health_weight: r.health_weight,
                standard: family,
            })
            .collect::<Vec<_>>();
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.metal.clone(), i))
            .collect();
        Self { rows, index }
    }

    /// The built-in WHO set.
    pub fn who() -> Arc<StandardSet> {
        Arc::clone(&WHO_SET)
    }

    /// The built-in EPA set.
    pub fn epa() -> Arc<StandardSet> {
        Arc::clone(&EPA_SET)
    }

    /// Looks up a built-in set by name ("WHO" or "EPA", case-insensitive).
    pub fn by_name(name: &str) -> Result<Arc<StandardSet>> {
        match name.trim().to_ascii_uppercase().as_str() {
            "WHO" => Ok(Self::who()),
            "EPA" => Ok(Self::epa()),
            _ => Err(HmpiError::UnknownStandard(name.to_string())),
        }
    }

    pub fn get(&self, metal: &str) -> Option<&RegulatoryStandard> {
        self.index.get(metal).map(|&i| &self.rows[i])
    }

    /// Rows in declaration order.
    pub fn rows(&self) -> &[RegulatoryStandard] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The family shared by every row; `Custom` for mixed or empty sets.
    pub fn family(&self) -> StandardFamily {
        let mut families = self.rows.iter().map(|r| r.standard);
        match families.next() {
            Some(first) if families.all(|f| f == first) => first,
            _ => StandardFamily::Custom,
        }
    }
}

fn validate_row(row: &RegulatoryStandard) -> Result<()> {
    if row.metal.trim().is_empty() {
        return Err(HmpiError::InvalidStandard {
            metal: row.metal.clone(),
            reason: "metal symbol is empty".to_string(),
        });
    }
    if !(row.permissible_limit.is_finite() && row.permissible_limit >= MIN_PERMISSIBLE_LIMIT) {
        return Err(HmpiError::InvalidStandard {
            metal: row.metal.clone(),
            reason: format!(
                "permissible limit must be at least {} mg/L, got {}",
                MIN_PERMISSIBLE_LIMIT, row.permissible_limit
            ),
        });
    }
    if !(row.health_weight.is_finite() && row.health_weight > 0.0 && row.health_weight <= MAX_HEALTH_WEIGHT) {
        return Err(HmpiError::InvalidStandard {
            metal: row.metal.clone(),
            reason: format!(
                "health weight must be positive and at most {}, got {}",
                MAX_HEALTH_WEIGHT, row.health_weight
            ),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
