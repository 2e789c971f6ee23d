//! # SCOMP Engine
//!
//! A library for turning the structured extraction of a Chilean pension
//! quote comparison document (SCOMP) into computed, deterministically
//! ordered comparison tables.
//!
//! ## Core Concepts
//!
//! - **RawExtraction**: the loosely-typed nested structure an LLM
//!   collaborator produces from the document text. Any field may be absent,
//!   null, or malformed; the engine tolerates all of it.
//! - **Vejez/Invalidez pipeline**: per-modality tables for a single retiree
//!   (programmed withdrawal, reference pension, immediate and deferred
//!   annuity variants) with the fixed discount chain: health 7%, AFP
//!   commission where it applies, net = gross minus both.
//! - **Sobrevivencia pipeline**: beneficiaries ordered by legal precedence,
//!   the 100%-equivalent base pension derived from the legal-share table,
//!   and per-beneficiary columnar offer tables.
//! - **Deterministic ordering**: every table gets a sort key; multi-phase
//!   modalities produce linked tables that always follow their parent.
//!
//! ## Example
//!
//! ```rust,ignore
//! use scomp_engine::{HeaderData, RawExtraction, ScompProcessor, VejezOptions};
//!
//! let raw = RawExtraction::from_json(&llm_response)?;
//! let header = HeaderData::from_header(&raw.header);
//! let tables = ScompProcessor::process_vejez(&raw, &header, &VejezOptions::default());
//! for table in &tables {
//!     println!("{} ({})", table.titulo, table.kind.tag());
//! }
//! ```

pub mod error;
pub mod legal;
pub mod numeric;
pub mod schema;
pub mod sobrevivencia;
pub mod sort;
pub mod tables;
pub mod vejez;

#[cfg(feature = "gemini")]
pub mod llm;

pub use error::{Result, ScompError};
pub use legal::{porcentaje_legal, DEFAULT_PGU_AMOUNT, PORCENTAJES_SOBREVIVENCIA};
pub use numeric::{clean_number, clean_str, format_uf};
pub use schema::{
    Beneficiario, EldOferta, Header, HeaderData, RawAmount, RawExtraction, RentaTemporal,
    RentaVitalicia, RetiroProgramado,
};
pub use sobrevivencia::{SobrevivenciaResult, SobrevivenciaWarning};
pub use sort::{ordenar_sobrevivencia, ordenar_vejez, sobrevivencia_sort_key, vejez_sort_key};
pub use tables::{
    BeneficiaryAmount, BeneficiaryRow, OfferRow, ProcessedTable, SurvivorOfferRow, TableBody,
    TableId, TableKind,
};
pub use vejez::{VejezOptions, DESCUENTO_SALUD};

/// Facade composing transform and ordering into one call per pension
/// family. Both calls are pure given their inputs; the caller owns any
/// caching of the raw extraction.
pub struct ScompProcessor;

impl ScompProcessor {
    /// Runs the old-age/disability pipeline and returns the tables in final
    /// display order.
    pub fn process_vejez(
        raw: &RawExtraction,
        header: &HeaderData,
        opts: &VejezOptions,
    ) -> Vec<ProcessedTable> {
        let mut tables = vejez::process_vejez(raw, header, opts);
        sort::ordenar_vejez(&mut tables);
        log::debug!("vejez/invalidez: {} tablas procesadas", tables.len());
        tables
    }

    /// Runs the survivorship pipeline, augmenting `header` in place, and
    /// returns the tables in final display order plus collected warnings.
    pub fn process_sobrevivencia(
        raw: &RawExtraction,
        header: &mut HeaderData,
    ) -> SobrevivenciaResult {
        let mut result = sobrevivencia::process_sobrevivencia(raw, header);
        sort::ordenar_sobrevivencia(&mut result.tables);
        log::debug!(
            "sobrevivencia: {} tablas procesadas, {} advertencias",
            result.tables.len(),
            result.warnings.len()
        );
        result
    }
}

/// Convenience wrapper over [`ScompProcessor::process_vejez`].
pub fn process_data_vejez(
    raw: &RawExtraction,
    header: &HeaderData,
    opts: &VejezOptions,
) -> Vec<ProcessedTable> {
    ScompProcessor::process_vejez(raw, header, opts)
}

/// Convenience wrapper over [`ScompProcessor::process_sobrevivencia`].
pub fn process_data_sobrevivencia(
    raw: &RawExtraction,
    header: &mut HeaderData,
) -> SobrevivenciaResult {
    ScompProcessor::process_sobrevivencia(raw, header)
}
