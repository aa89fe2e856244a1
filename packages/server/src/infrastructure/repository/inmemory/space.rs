//! InMemory Space Repository 実装
//!
//! ドメイン層が定義する SpaceGeometryRepository trait の具体的な実装。
//! 起動時に JSON カタログを読み込み、HashMap に保持します。
//!
//! ```json
//! { "spaces": [ { "id": "s1", "dimensions": "100x200",
//!     "elements": [ { "x": 20, "y": 20, "width": 1, "height": 1, "static": true } ] } ] }
//! ```
//!
//! `static: true` の要素は `(x, y)` を起点とする `width × height` のセルを通行不可にします。
//! 空間からはみ出したセルは切り捨てます。

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{
    Dimensions, Position, RepositoryError, SpaceGeometry, SpaceGeometryRepository, SpaceId,
};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    spaces: Vec<SpaceEntry>,
}

#[derive(Debug, Deserialize)]
struct SpaceEntry {
    id: String,
    dimensions: String,
    #[serde(default)]
    elements: Vec<ElementEntry>,
}

#[derive(Debug, Deserialize)]
struct ElementEntry {
    x: i64,
    y: i64,
    #[serde(default = "one")]
    width: u32,
    #[serde(default = "one")]
    height: u32,
    #[serde(rename = "static", default)]
    is_static: bool,
}

fn one() -> u32 {
    1
}

impl SpaceEntry {
    fn into_geometry(self) -> Result<(SpaceId, SpaceGeometry), RepositoryError> {
        let invalid = RepositoryError::InvalidCatalog;

        let space_id = SpaceId::new(self.id).map_err(|e| invalid(e.to_string()))?;
        let dimensions: Dimensions = self
            .dimensions
            .parse()
            .map_err(|e: crate::domain::DomainError| invalid(format!("{space_id}: {e}")))?;

        let mut blocked = Vec::new();
        for element in self.elements.iter().filter(|e| e.is_static) {
            let anchor = Position::new(element.x, element.y);
            if !dimensions.contains(&anchor) {
                return Err(invalid(format!(
                    "{space_id}: element anchored at {anchor} lies outside {dimensions}"
                )));
            }
            // Footprints are clipped to the space before walking them.
            let x_end = (anchor.x + i64::from(element.width)).min(i64::from(dimensions.width()));
            let y_end = (anchor.y + i64::from(element.height)).min(i64::from(dimensions.height()));
            for y in anchor.y..y_end {
                for x in anchor.x..x_end {
                    blocked.push(Position::new(x, y));
                }
            }
        }

        let geometry =
            SpaceGeometry::new(dimensions, blocked).map_err(|e| invalid(e.to_string()))?;
        Ok((space_id, geometry))
    }
}

/// インメモリ Space Repository 実装
pub struct InMemorySpaceRepository {
    spaces: HashMap<SpaceId, SpaceGeometry>,
}

impl InMemorySpaceRepository {
    pub fn new(spaces: HashMap<SpaceId, SpaceGeometry>) -> Self {
        Self { spaces }
    }

    /// JSON カタログ文字列から構築
    pub fn from_catalog_json(json: &str) -> Result<Self, RepositoryError> {
        let catalog: CatalogFile = serde_json::from_str(json)
            .map_err(|e| RepositoryError::InvalidCatalog(e.to_string()))?;

        let mut spaces = HashMap::with_capacity(catalog.spaces.len());
        for entry in catalog.spaces {
            let (space_id, geometry) = entry.into_geometry()?;
            if spaces.insert(space_id.clone(), geometry).is_some() {
                return Err(RepositoryError::InvalidCatalog(format!(
                    "duplicate space id: {space_id}"
                )));
            }
        }
        Ok(Self::new(spaces))
    }

    /// JSON カタログファイルから構築
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| RepositoryError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::from_catalog_json(&json)
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }
}

#[async_trait]
impl SpaceGeometryRepository for InMemorySpaceRepository {
    async fn get_space_geometry(
        &self,
        space_id: &SpaceId,
    ) -> Result<SpaceGeometry, RepositoryError> {
        self.spaces
            .get(space_id)
            .cloned()
            .ok_or_else(|| RepositoryError::SpaceNotFound(space_id.clone()))
    }
}
