//! Database entity models for the SeaORM-backed key-value backend.
//!
//! The primary entity in this module is the `session` entity, which maps the
//! `sessions` table holding one JSON record per namespaced session key.

/// Session entity model for Sea-ORM database interaction.
///
/// Contains the database schema representation used by
/// [`SeaOrmBackend`](crate::backend::SeaOrmBackend).
pub mod session;
