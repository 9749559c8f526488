pub mod convert;
pub mod csv_io;
pub mod normalize;

pub use convert::{BatchReport, ConvertError, Converter, FileOutcome};
pub use normalize::FieldMap;
