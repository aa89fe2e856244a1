//! InMemory Repository 実装

pub mod space;

pub use space::InMemorySpaceRepository;
