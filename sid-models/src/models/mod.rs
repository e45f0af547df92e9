//! Entity model definitions.

pub mod penduduk;
pub mod desa;
pub mod form;
pub mod surat;
pub mod user;
pub mod content;
