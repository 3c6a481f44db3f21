//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces implemented by the storage adapters:
//! - ContactRepository: persistence for contacts
//! - TagRepository: persistence for tags and contact-tag links

pub mod contact_repository;
pub mod tag_repository;

pub use contact_repository::ContactRepository;
pub use tag_repository::TagRepository;
