use std::cmp::Ordering;

use serde_json::Value;

/// One value of a tabular column.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Parse a raw CSV field. Empty fields and the usual NaN spellings are missing.
    pub fn parse(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return Cell::Int(i);
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            return Cell::from_f64(f);
        }

        match trimmed {
            "NA" | "N/A" | "NaN" | "nan" | "NULL" | "null" | "None" => Cell::Missing,
            _ => Cell::Text(trimmed.to_owned()),
        }
    }

    #[inline]
    pub fn from_f64(f: f64) -> Cell {
        if f.is_nan() {
            Cell::Missing
        } else {
            Cell::Float(f)
        }
    }

    #[inline]
    pub fn from_opt(v: Option<f64>) -> Cell {
        v.map_or(Cell::Missing, Cell::from_f64)
    }

    pub fn from_json(v: &Value) -> Cell {
        match v {
            Value::Null => Cell::Missing,
            Value::Bool(b) => Cell::Int(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => Cell::from_f64(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Cell::Text(s.clone()),
            // Nested values have no tabular meaning; keep their text form.
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Missing => Value::Null,
        }
    }

    /// Numeric view. Text that looks like a number is accepted; anything else is missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) if !f.is_nan() => Some(*f),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|f| !f.is_nan()),
            _ => None,
        }
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing) || matches!(self, Cell::Float(f) if f.is_nan())
    }

    /// Normalised join key; integral floats compare equal to integers.
    pub fn join_key(&self) -> Option<String> {
        match self {
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) if f.is_nan() => None,
            Cell::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some((*f as i64).to_string()),
            Cell::Float(f) => Some(f.to_string()),
            Cell::Text(s) => Some(s.trim().to_owned()),
            Cell::Missing => None,
        }
    }

    /// Total order used when sorting group keys: numbers (numerically) before text.
    pub fn sort_cmp(&self, other: &Cell) -> Ordering {
        match (self.rank(), other.rank()) {
            (0, 0) => {
                let a = self.as_f64().unwrap_or(f64::NAN);
                let b = other.as_f64().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            }
            (1, 1) => match (self, other) {
                (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
                _ => Ordering::Equal,
            },
            (a, b) => a.cmp(&b),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Cell::Int(_) | Cell::Float(_) => 0,
            Cell::Text(_) => 1,
            Cell::Missing => 2,
        }
    }
}
