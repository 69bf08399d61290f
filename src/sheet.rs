//! CSV input: one sheet per category.

use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Result};
use bigdecimal::{BigDecimal, RoundingMode, Signed, Zero};

use crate::error::SeedError;

const NAME_COLUMN: &str = "name";
const PRICE_COLUMN: &str = "price";
/// Integer digits a price may carry: `DECIMAL(10,2)`.
const PRICE_INTEGER_DIGITS: i64 = 8;

/// Cell spellings that mean "no value". Empty cells are always missing.
#[derive(Debug, Clone, Default)]
pub struct MissingMarkers(HashSet<String>);

impl MissingMarkers {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(markers.into_iter().map(Into::into).collect())
    }

    fn value(&self, cell: &str) -> Option<String> {
        let cell = cell.trim();
        if cell.is_empty() || self.0.contains(cell) {
            None
        } else {
            Some(cell.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProductRow {
    /// 0-based position within the sheet.
    pub ordinal: usize,
    pub name: String,
    pub price: Option<String>,
    /// Aligned with [`ProductSheet::attribute_columns`].
    pub values: Vec<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct ProductSheet {
    pub attribute_columns: Vec<String>,
    pub rows: Vec<ProductRow>,
}

impl ProductSheet {
    pub fn from_path(path: &Path, markers: &MissingMarkers) -> Result<Self, SeedError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|source| SeedError::Input {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_csv(reader, path, markers)
    }

    pub fn from_reader<R: Read>(
        rdr: R,
        origin: &Path,
        markers: &MissingMarkers,
    ) -> Result<Self, SeedError> {
        let reader = csv::ReaderBuilder::new().has_headers(true).from_reader(rdr);
        Self::from_csv(reader, origin, markers)
    }

    fn from_csv<R: Read>(
        mut reader: csv::Reader<R>,
        origin: &Path,
        markers: &MissingMarkers,
    ) -> Result<Self, SeedError> {
        let input_err = |source| SeedError::Input {
            path: origin.to_path_buf(),
            source,
        };

        let headers = reader.headers().map_err(input_err)?.clone();
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(column))
                .ok_or_else(|| SeedError::MissingColumn {
                    path: origin.to_path_buf(),
                    column,
                })
        };
        let idx_name = find(NAME_COLUMN)?;
        let idx_price = find(PRICE_COLUMN)?;

        let attribute_idx: Vec<usize> = (0..headers.len())
            .filter(|i| *i != idx_name && *i != idx_price)
            .collect();
        let attribute_columns = attribute_idx
            .iter()
            .map(|i| headers[*i].trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (ordinal, record) in reader.records().enumerate() {
            let record = record.map_err(input_err)?;
            let cell = |i: usize| record.get(i).unwrap_or("");
            rows.push(ProductRow {
                ordinal,
                name: cell(idx_name).trim().to_string(),
                price: markers.value(cell(idx_price)),
                values: attribute_idx.iter().map(|i| markers.value(cell(*i))).collect(),
            });
        }

        Ok(Self {
            attribute_columns,
            rows,
        })
    }

    /// Present attribute cells of `row` as `(column, value)` pairs.
    pub fn attributes<'a>(&'a self, row: &'a ProductRow) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.attribute_columns
            .iter()
            .zip(&row.values)
            .filter_map(|(column, value)| Some((column.as_str(), value.as_deref()?)))
    }
}

/// Non-negative price with two fractional digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price(BigDecimal);

impl Price {
    /// A missing price is zero. Halves round away from zero, as MySQL does
    /// when storing into a `DECIMAL(10,2)` column.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(Self::zero());
        };
        let value = match BigDecimal::from_str(raw) {
            Ok(v) => v,
            Err(_) => bail!("malformed price `{raw}`"),
        };
        if value.is_negative() {
            bail!("negative price `{raw}`");
        }
        if value.is_zero() {
            return Ok(Self::zero());
        }

        // Judge the magnitude from digit count and scale: rescaling a value
        // like `1e100000000` would materialize every digit.
        let integer_digits = i64::try_from(value.digits())
            .unwrap_or(i64::MAX)
            .saturating_sub(value.fractional_digit_count());
        if integer_digits > PRICE_INTEGER_DIGITS {
            bail!("price `{raw}` out of range");
        }
        // below 0.001, so it rounds to zero
        if integer_digits < -2 {
            return Ok(Self::zero());
        }
        let value = value.with_scale_round(2, RoundingMode::HalfUp);
        if value.digits() > (PRICE_INTEGER_DIGITS + 2) as u64 {
            bail!("price `{raw}` out of range");
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(BigDecimal::from(0).with_scale(2))
    }

    #[cfg(test)]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> MissingMarkers {
        MissingMarkers::new(["NA", "NaN", "nan", "None"])
    }

    fn sheet(csv: &str) -> ProductSheet {
        ProductSheet::from_reader(csv.as_bytes(), Path::new("test.csv"), &markers()).unwrap()
    }

    #[test]
    fn splits_name_price_and_attributes() {
        let s = sheet(
            "name,price,memory_gb,core_clock\n\
             Card A,,8,1.5\n\
             Card B,499.99,NaN, 2.1 \n",
        );
        assert_eq!(s.attribute_columns, vec!["memory_gb", "core_clock"]);
        assert_eq!(s.rows.len(), 2);

        let a = &s.rows[0];
        assert_eq!(a.ordinal, 0);
        assert_eq!(a.name, "Card A");
        assert_eq!(a.price, None);
        let attrs: Vec<_> = s.attributes(a).collect();
        assert_eq!(attrs, vec![("memory_gb", "8"), ("core_clock", "1.5")]);

        let b = &s.rows[1];
        assert_eq!(b.ordinal, 1);
        assert_eq!(b.price.as_deref(), Some("499.99"));
        let attrs: Vec<_> = s.attributes(b).collect();
        assert_eq!(attrs, vec![("core_clock", "2.1")]);
    }

    #[test]
    fn name_and_price_found_anywhere() {
        let s = sheet("socket,Price,Name\nAM5,199,Board X\n");
        assert_eq!(s.attribute_columns, vec!["socket"]);
        assert_eq!(s.rows[0].name, "Board X");
        assert_eq!(s.rows[0].price.as_deref(), Some("199"));
    }

    #[test]
    fn missing_price_column_is_fatal() {
        let err = ProductSheet::from_reader(
            "name,socket\nBoard,AM5\n".as_bytes(),
            Path::new("mb.csv"),
            &markers(),
        )
        .unwrap_err();
        assert!(matches!(err, SeedError::MissingColumn { column: "price", .. }));
    }

    #[test]
    fn ragged_rows_are_an_input_error() {
        let err = ProductSheet::from_reader(
            "name,price\nA,1,extra\n".as_bytes(),
            Path::new("bad.csv"),
            &markers(),
        )
        .unwrap_err();
        assert!(matches!(err, SeedError::Input { .. }));
    }

    #[test]
    fn unreadable_file_is_an_input_error() {
        let err = ProductSheet::from_path(Path::new("/nonexistent/gpu.csv"), &markers()).unwrap_err();
        assert!(matches!(err, SeedError::Input { .. }));
    }

    #[test]
    fn price_parsing() {
        assert!(Price::parse(None).unwrap().is_zero());
        assert_eq!(Price::parse(Some("199.99")).unwrap().to_string(), "199.99");
        assert_eq!(Price::parse(Some("45")).unwrap().to_string(), "45.00");
        assert_eq!(Price::parse(Some("12.346")).unwrap().to_string(), "12.35");
        assert_eq!(Price::parse(Some("0.001")).unwrap().to_string(), "0.00");
        assert!(Price::parse(Some("1e-100000000")).unwrap().is_zero());
        assert!(Price::parse(Some("0e100000000")).unwrap().is_zero());
        assert!(Price::parse(Some("free")).is_err());
        assert!(Price::parse(Some("-1.00")).is_err());
    }

    #[test]
    fn price_halves_round_away_from_zero() {
        assert_eq!(Price::parse(Some("12.345")).unwrap().to_string(), "12.35");
        assert_eq!(Price::parse(Some("0.125")).unwrap().to_string(), "0.13");
        assert_eq!(Price::parse(Some("1.005")).unwrap().to_string(), "1.01");
        assert_eq!(Price::parse(Some("2.5")).unwrap().to_string(), "2.50");
    }

    #[test]
    fn price_beyond_column_range_is_rejected() {
        assert_eq!(
            Price::parse(Some("99999999.99")).unwrap().to_string(),
            "99999999.99"
        );
        let err = Price::parse(Some("100000000")).unwrap_err();
        assert_eq!(err.to_string(), "price `100000000` out of range");
        assert!(Price::parse(Some("1e100000000")).is_err());
        assert!(Price::parse(Some("1E9")).is_err());
        // rounds up past the column's range
        assert!(Price::parse(Some("99999999.995")).is_err());
    }
}
