pub mod history;
pub mod init;
pub mod list_models;
pub mod list_variants;
pub mod play;
pub mod validate;
