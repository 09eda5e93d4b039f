// The ADL document format: markdown with anchored headings, each block
// optionally carrying one fenced machine-readable payload.

pub mod machine;
mod parse;
mod serialize;

pub use parse::parse;
pub use serialize::serialize;
