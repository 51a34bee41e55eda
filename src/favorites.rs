use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum FavoritesError {
    #[error("City not found in favorites")]
    NotFound,
    #[error("Failed to write favorites file: {0}")]
    Persistence(#[from] std::io::Error),
    #[error("Failed to encode favorites: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Favorite cities, held in memory and mirrored to a JSON array on disk.
///
/// Cities keep the casing they were added with but are compared
/// case-insensitively. A mutation only lands in memory once the file write
/// succeeded, and the write lock is held across the write.
pub struct FavoritesStore {
    path: PathBuf,
    cities: RwLock<Vec<String>>,
}

impl FavoritesStore {
    /// Reads the favorites file. A missing or unreadable file yields an empty list.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let cities = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<Vec<String>>(&contents) {
                Ok(cities) => cities,
                Err(e) => {
                    tracing::warn!(
                        "Couldn't parse {}, using empty list: {}",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!("Couldn't read {}, using empty list: {}", path.display(), e);
                Vec::new()
            }
        };

        tracing::info!("Loaded {} favorite cities", cities.len());

        Self {
            path,
            cities: RwLock::new(cities),
        }
    }

    pub async fn list(&self) -> Vec<String> {
        self.cities.read().await.clone()
    }

    pub async fn add(&self, city: &str) -> Result<Vec<String>, FavoritesError> {
        let mut cities = self.cities.write().await;

        if cities.iter().any(|fav| same_city(fav, city)) {
            return Ok(cities.clone());
        }

        let mut updated = cities.clone();
        updated.push(city.to_string());
        self.persist(&updated).await?;

        tracing::info!("Added {} to favorites", city);
        *cities = updated;
        Ok(cities.clone())
    }

    pub async fn remove(&self, city: &str) -> Result<Vec<String>, FavoritesError> {
        let mut cities = self.cities.write().await;

        let updated: Vec<String> = cities
            .iter()
            .filter(|fav| !same_city(fav, city))
            .cloned()
            .collect();

        if updated.len() == cities.len() {
            return Err(FavoritesError::NotFound);
        }

        self.persist(&updated).await?;

        tracing::info!("Removed {} from favorites", city);
        *cities = updated;
        Ok(cities.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, cities: &[String]) -> Result<(), FavoritesError> {
        let json = serde_json::to_string_pretty(cities)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

fn same_city(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
