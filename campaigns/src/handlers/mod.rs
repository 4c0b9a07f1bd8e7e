pub mod campaign;
pub mod template;
