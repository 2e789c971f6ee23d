//! Processed output model.
//!
//! The transformers emit [`ProcessedTable`] collections; renderers consume
//! them read-only. The table kind is a closed enum carrying exactly the
//! modality parameters the sort-key assigner needs, and phase-2 rows point
//! at their parent through a [`TableId`] generated at creation time rather
//! than by title matching.

use crate::schema::EldOferta;
use serde::Serialize;

/// Identifier assigned to each table when it is created, unique within one
/// processing pass. Phase-2 (linked) tables reference their parent by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TableId(pub u32);

/// Closed set of table kinds. Each variant carries the modality parameters
/// its ordering and rendering logic needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TableKind {
    /// Programmed withdrawal, old-age/disability.
    RetiroProgramado,
    /// Law-guaranteed reference pension.
    Referencia,
    /// Immediate life annuity (simple or guaranteed-period).
    RentaVitalicia { meses_garantizados: u32 },
    /// Increased phase of a percentage-increase immediate annuity.
    RentaVitaliciaAumentada {
        meses_aumento: u32,
        meses_garantizados: u32,
    },
    /// Base phase of a percentage-increase immediate annuity, linked to its
    /// increased phase.
    RentaVitaliciaBase {
        meses_aumento: u32,
        meses_garantizados: u32,
    },
    /// Temporary-income phase of a deferred annuity modality.
    RentaTemporal {
        periodo_diferido_meses: u32,
        meses_garantizados: u32,
    },
    /// Deferred base phase, linked to its temporary-income phase.
    RentaVitaliciaDiferida {
        periodo_diferido_meses: u32,
        meses_garantizados: u32,
    },
    /// Programmed withdrawal, survivorship (per-beneficiary breakdown).
    RetiroProgramadoSobrevivencia,
    /// Immediate annuity, survivorship (multi-beneficiary columns).
    RentaVitaliciaSobrevivencia { meses_garantizados: u32 },
}

impl TableKind {
    /// Short tag for renderers, matching the SCOMP report conventions.
    pub fn tag(&self) -> &'static str {
        match self {
            TableKind::RetiroProgramado => "RP",
            TableKind::Referencia => "REF",
            TableKind::RentaVitalicia { .. } => "RV",
            TableKind::RentaVitaliciaAumentada { .. } => "RV_Aumentada",
            TableKind::RentaVitaliciaBase { .. } => "RV_Base",
            TableKind::RentaTemporal { .. } => "RT",
            TableKind::RentaVitaliciaDiferida { .. } => "RVD",
            TableKind::RetiroProgramadoSobrevivencia => "RP_SOBREVIVENCIA",
            TableKind::RentaVitaliciaSobrevivencia { .. } => "RV_SOBREVIVENCIA",
        }
    }
}

/// One company's (or the AFP's) processed offer in an old-age/disability
/// table. Discount fields follow the fixed policy: health first, commission
/// only where a commission applies, net = gross - health - commission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferRow {
    /// Company name, or the source AFP for programmed withdrawal.
    pub entidad: String,
    /// Pension in UF, locale-formatted for display.
    pub pension_uf: String,
    pub pension_bruta: f64,
    pub descuento_salud: f64,
    /// Commission fraction, present only on commission-bearing rows.
    pub comision_pct: Option<f64>,
    pub descuento_comision: Option<f64>,
    pub pension_liquida: f64,
    /// Gross plus enabled supplements (PGU, bono).
    pub pension_total: f64,
}

/// One beneficiary's row in the survivorship programmed-withdrawal table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeneficiaryRow {
    pub beneficiario: String,
    pub pension_uf: String,
    pub pension_bruta: f64,
    pub descuento_salud: f64,
    pub descuento_comision: f64,
    pub pension_liquida: f64,
}

/// UF/pesos amount pair for one beneficiary inside a survivorship annuity
/// offer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeneficiaryAmount {
    pub pension_uf: String,
    pub pension_pesos: f64,
}

/// One company's offer in a survivorship annuity table. `beneficiarios` is
/// padded with `None` (or truncated) to the table's column count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurvivorOfferRow {
    pub compania: String,
    pub beneficiarios: Vec<Option<BeneficiaryAmount>>,
    pub total_bruto: f64,
    pub total_liquido: f64,
}

/// Table body, one shape per family of table kinds. A row always carries
/// every field its kind requires, so renderers never probe for missing
/// columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableBody {
    /// Old-age/disability offer rows.
    Ofertas(Vec<OfferRow>),
    /// Survivorship programmed withdrawal: one row per beneficiary plus a
    /// "Pensión mensual total" row.
    Beneficiarios {
        filas: Vec<BeneficiaryRow>,
        total: BeneficiaryRow,
    },
    /// Survivorship annuity: dynamic per-beneficiary columns.
    OfertasSobrevivencia {
        columnas: Vec<String>,
        filas: Vec<SurvivorOfferRow>,
    },
}

impl TableBody {
    pub fn is_empty(&self) -> bool {
        match self {
            TableBody::Ofertas(filas) => filas.is_empty(),
            TableBody::Beneficiarios { filas, .. } => filas.is_empty(),
            TableBody::OfertasSobrevivencia { filas, .. } => filas.is_empty(),
        }
    }
}

/// The core's primary output unit: one titled, typed, ordered table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedTable {
    pub id: TableId,
    pub titulo: String,
    pub kind: TableKind,
    pub body: TableBody,
    /// Display title for the pension-plus-supplements column, synthesized
    /// from the enabled options (e.g. "Pensión + PGU + Bono").
    pub col_pension_total: String,
    /// Free-disposal-surplus offer, passed through from the raw modality.
    pub eld_info: Option<EldOferta>,
    /// Parent table for phase-2 rows; sorts immediately after it.
    pub linked_to: Option<TableId>,
    /// Ordering key filled in by the sort-key assigner.
    pub sort_key: Option<(i64, i64, i64, i64)>,
}

impl ProcessedTable {
    pub fn is_linked(&self) -> bool {
        self.linked_to.is_some()
    }
}

/// Hands out sequential [`TableId`]s during one processing pass.
#[derive(Debug, Default)]
pub(crate) struct TableIdGen {
    next: u32,
}

impl TableIdGen {
    pub fn next_id(&mut self) -> TableId {
        self.next += 1;
        TableId(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(TableKind::RetiroProgramado.tag(), "RP");
        assert_eq!(
            TableKind::RentaVitalicia {
                meses_garantizados: 120
            }
            .tag(),
            "RV"
        );
        assert_eq!(
            TableKind::RentaVitaliciaDiferida {
                periodo_diferido_meses: 24,
                meses_garantizados: 0
            }
            .tag(),
            "RVD"
        );
        assert_eq!(
            TableKind::RetiroProgramadoSobrevivencia.tag(),
            "RP_SOBREVIVENCIA"
        );
    }

    #[test]
    fn test_id_gen_is_sequential() {
        let mut ids = TableIdGen::default();
        assert_eq!(ids.next_id(), TableId(1));
        assert_eq!(ids.next_id(), TableId(2));
        assert_eq!(ids.next_id(), TableId(3));
    }
}
