pub mod fonts;
pub mod pdf;
pub mod warranty;
pub mod xlsx;
