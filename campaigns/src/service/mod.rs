pub mod campaign;
pub mod merge;
pub mod recipients;
pub mod template;
