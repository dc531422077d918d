pub mod drug;
pub mod locus;
pub mod mutation;
pub mod observation;
pub mod record;
pub mod resistance;

// re-export for cleaner imports
pub use self::drug::{Drug, DrugCatalog, DrugClass};
pub use self::locus::Locus;
pub use self::mutation::{MutationToken, Residue, parse_token};
pub use self::observation::Observation;
pub use self::record::{ReportRecord, normalize_patient_id};
pub use self::resistance::{DrugScore, ResistanceCategory};
