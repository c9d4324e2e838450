//! Fine-resolution values with an explicit missing-value mask.

use crate::error::{RegridError, Result};

/// A flat array of fine samples, one value per point, with an optional
/// per-element "is missing" mask of the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray {
    values: Vec<f64>,
    mask: Option<Vec<bool>>,
}

impl MaskedArray {
    /// Unmasked array: every value is present.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, mask: None }
    }

    /// Array with a missing mask (`true` = missing).
    pub fn with_mask(values: Vec<f64>, mask: Vec<bool>) -> Result<Self> {
        if values.len() != mask.len() {
            return Err(RegridError::MaskLength {
                values: values.len(),
                mask: mask.len(),
            });
        }
        Ok(Self {
            values,
            mask: Some(mask),
        })
    }

    /// Build from optional values; `None` entries are masked.
    pub fn from_options(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let (values, mask): (Vec<f64>, Vec<bool>) = values
            .into_iter()
            .map(|v| match v {
                Some(v) => (v, false),
                None => (0.0, true),
            })
            .unzip();
        Self {
            values,
            mask: Some(mask),
        }
    }

    /// Mask values equal to `sentinel`, and any NaN.
    pub fn from_values_with_sentinel(values: Vec<f64>, sentinel: f64) -> Self {
        let mask = values.iter().map(|&v| v.is_nan() || v == sentinel).collect();
        Self {
            values,
            mask: Some(mask),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw payload, including the placeholder behind masked entries.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn mask(&self) -> Option<&[bool]> {
        self.mask.as_deref()
    }

    /// Whether element `i` is missing. Out-of-range positions are not
    /// missing; they are not present either, see [`MaskedArray::get`].
    pub fn is_missing(&self, i: usize) -> bool {
        self.mask
            .as_ref()
            .and_then(|m| m.get(i).copied())
            .unwrap_or(false)
    }

    /// Value at `i`: `None` when out of range, `Some(None)` when masked.
    pub fn get(&self, i: usize) -> Option<Option<f64>> {
        let v = *self.values.get(i)?;
        Some(if self.is_missing(i) { None } else { Some(v) })
    }

    /// Number of masked elements.
    pub fn missing_count(&self) -> usize {
        self.mask
            .as_ref()
            .map_or(0, |m| m.iter().filter(|&&b| b).count())
    }
}

impl From<Vec<f64>> for MaskedArray {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}
