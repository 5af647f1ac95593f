//! Monetary values in Brazilian notation.
//!
//! Report lines and open-data records carry amounts like `R$ 1.234,56`:
//! `.` as thousands separator, `,` as decimal separator, always two
//! decimal places. Values are stored as integer centavos so formatting
//! and re-parsing a value is exact.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A monetary amount in centavos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Valor(i64);

impl Valor {
    pub fn from_centavos(centavos: i64) -> Self {
        Valor(centavos)
    }

    pub fn centavos(&self) -> i64 {
        self.0
    }

    /// Convert a float amount in reais, rounding to the nearest centavo.
    pub fn from_reais(reais: f64) -> Option<Self> {
        if !reais.is_finite() {
            return None;
        }
        Some(Valor((reais * 100.0).round() as i64))
    }

    pub fn as_reais(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Parse an amount in Brazilian notation (`1.234,56`).
    ///
    /// A leading `R$` and surrounding whitespace are tolerated. Anything
    /// that does not reduce to a plain number yields `None`; this function
    /// never panics on malformed input.
    pub fn parse(texto: &str) -> Option<Self> {
        let t = texto.trim();
        let t = t.strip_prefix("R$").unwrap_or(t).trim();
        if t.is_empty() {
            return None;
        }
        let normalizado = t.replace('.', "").replace(',', ".");
        let reais: f64 = normalizado.parse().ok()?;
        Self::from_reais(reais)
    }
}

impl std::fmt::Display for Valor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let negativo = self.0 < 0;
        let abs = self.0.unsigned_abs();
        let inteiro = abs / 100;
        let centavos = abs % 100;

        // Insert thousands separators right-to-left.
        let digitos = inteiro.to_string();
        let mut agrupado = String::new();
        for (i, c) in digitos.chars().enumerate() {
            if i > 0 && (digitos.len() - i) % 3 == 0 {
                agrupado.push('.');
            }
            agrupado.push(c);
        }

        if negativo {
            write!(f, "-{agrupado},{centavos:02}")
        } else {
            write!(f, "{agrupado},{centavos:02}")
        }
    }
}

impl Serialize for Valor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_reais())
    }
}

impl<'de> Deserialize<'de> for Valor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let reais = f64::deserialize(deserializer)?;
        Valor::from_reais(reais)
            .ok_or_else(|| serde::de::Error::custom("non-finite monetary value"))
    }
}
