//! Repository 実装
//!
//! - `inmemory`: JSON カタログから読み込んだ空間ジオメトリを保持する実装

pub mod inmemory;

pub use inmemory::InMemorySpaceRepository;
