//! Deterministic ordering of processed tables.
//!
//! Each pension family has a fixed modality precedence; within a modality
//! group, longer guarantee/increase/deferral periods come first. Phase-2
//! tables inherit their parent's key with a final tiebreak so they land
//! immediately after it. The sort is stable, so equal keys preserve
//! insertion order.

use crate::tables::{ProcessedTable, TableKind};
use std::collections::HashMap;

type Key3 = (i64, i64, i64);

/// Full ordering key: modality precedence, secondary, tertiary, and the
/// parent/child tiebreak.
pub type SortKey = (i64, i64, i64, i64);

const UNKNOWN_KEY: Key3 = (100, 0, 0);
const ORPHAN_KEY: SortKey = (i64::MAX, 0, 0, 0);

/// Modality precedence for old-age/disability tables.
pub fn vejez_sort_key(kind: &TableKind) -> Key3 {
    match kind {
        TableKind::RetiroProgramado => (1, 0, 0),
        TableKind::Referencia => (2, 0, 0),
        TableKind::RentaVitalicia { meses_garantizados } => {
            if *meses_garantizados > 0 {
                (4, -i64::from(*meses_garantizados), 0)
            } else {
                (3, 0, 0)
            }
        }
        TableKind::RentaVitaliciaAumentada {
            meses_aumento,
            meses_garantizados,
        } => {
            if *meses_garantizados > 0 {
                (6, -i64::from(*meses_aumento), -i64::from(*meses_garantizados))
            } else {
                (5, -i64::from(*meses_aumento), 0)
            }
        }
        TableKind::RentaTemporal {
            periodo_diferido_meses,
            meses_garantizados,
        } => {
            if *meses_garantizados > 0 {
                (
                    8,
                    -i64::from(*periodo_diferido_meses),
                    -i64::from(*meses_garantizados),
                )
            } else {
                (7, -i64::from(*periodo_diferido_meses), 0)
            }
        }
        _ => UNKNOWN_KEY,
    }
}

/// Modality precedence for survivorship tables. Slots 2 (reference) and 5
/// (temporary/deferred) are reserved for kinds the transformer does not
/// emit yet.
pub fn sobrevivencia_sort_key(kind: &TableKind) -> Key3 {
    match kind {
        TableKind::RetiroProgramadoSobrevivencia => (1, 0, 0),
        TableKind::RentaVitaliciaSobrevivencia { meses_garantizados } => {
            if *meses_garantizados > 0 {
                (4, -i64::from(*meses_garantizados), 0)
            } else {
                (3, 0, 0)
            }
        }
        _ => UNKNOWN_KEY,
    }
}

/// Assigns sort keys and orders an old-age/disability collection in place.
///
/// Phase-1 tables get their modality key with tiebreak 0. Phase-2 tables
/// inherit the parent's key with tiebreak 1; a phase-2 table whose parent is
/// missing from the collection sorts to the absolute end.
pub fn ordenar_vejez(tables: &mut Vec<ProcessedTable>) {
    let mut parent_keys: HashMap<_, Key3> = HashMap::new();

    for table in tables.iter_mut() {
        if table.linked_to.is_none() {
            let key = vejez_sort_key(&table.kind);
            table.sort_key = Some((key.0, key.1, key.2, 0));
            parent_keys.insert(table.id, key);
        }
    }

    for table in tables.iter_mut() {
        if let Some(parent) = table.linked_to {
            table.sort_key = Some(match parent_keys.get(&parent) {
                Some(key) => (key.0, key.1, key.2, 1),
                None => {
                    log::warn!(
                        "tabla '{}' enlazada a una tabla inexistente, se ordena al final",
                        table.titulo
                    );
                    ORPHAN_KEY
                }
            });
        }
    }

    tables.sort_by_key(|t| t.sort_key.unwrap_or((100, 0, 0, 0)));
}

/// Assigns sort keys and orders a survivorship collection in place.
pub fn ordenar_sobrevivencia(tables: &mut Vec<ProcessedTable>) {
    for table in tables.iter_mut() {
        let key = sobrevivencia_sort_key(&table.kind);
        table.sort_key = Some((key.0, key.1, key.2, 0));
    }
    tables.sort_by_key(|t| t.sort_key.unwrap_or((100, 0, 0, 0)));
}
