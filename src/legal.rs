//! Static Chilean pension-domain data.
//!
//! Legal survivorship shares per D.L. 3.500: each beneficiary category is
//! entitled to a fixed fraction of the causante's base pension. The table is
//! keyed by the exact relationship text the SCOMP uses.

/// Relationship text -> legal share of the 100% base pension.
pub const PORCENTAJES_SOBREVIVENCIA: [(&str, f64); 5] = [
    ("Cónyuge con hijos con derecho a pensión", 0.50),
    ("Cónyuge sin hijos con derecho a pensión", 0.60),
    ("Hijo de cónyuge con derecho a pensión", 0.15),
    ("Hijo", 0.15),
    ("Madre o Padre de hijos de filiación no matrimonial", 0.30),
];

/// Looks up the legal share for a relationship. Unknown relationships have
/// no share; the caller treats that as a non-fatal derivation failure.
pub fn porcentaje_legal(parentesco: &str) -> Option<f64> {
    let parentesco = parentesco.trim();
    PORCENTAJES_SOBREVIVENCIA
        .iter()
        .find(|(texto, _)| *texto == parentesco)
        .map(|(_, pct)| *pct)
}

/// Default PGU (Pensión Garantizada Universal) supplement in pesos.
pub const DEFAULT_PGU_AMOUNT: f64 = 231_732.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_shares() {
        assert_eq!(
            porcentaje_legal("Cónyuge con hijos con derecho a pensión"),
            Some(0.50)
        );
        assert_eq!(porcentaje_legal("Hijo"), Some(0.15));
        assert_eq!(
            porcentaje_legal("Madre o Padre de hijos de filiación no matrimonial"),
            Some(0.30)
        );
    }

    #[test]
    fn test_unknown_share() {
        assert_eq!(porcentaje_legal("Sobrino"), None);
        assert_eq!(porcentaje_legal(""), None);
    }

    #[test]
    fn test_lookup_trims_whitespace() {
        assert_eq!(porcentaje_legal("  Hijo "), Some(0.15));
    }
}
