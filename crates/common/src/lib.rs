// folio-common: shared types and the ADL document format for the folio workspace

pub mod adl;
pub mod path;
pub mod proposal;
pub mod types;
pub mod value;
