//! Core abstractions for order preferences: the per-user record, its repository
//! contract, template/signature file discovery, and the form model the host renders.

pub mod files;
pub mod form;
pub mod preferences;
