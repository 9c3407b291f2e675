//! Song Catalog
//!
//! Set lists and songs consumed by the slide workflow. The lookup traits
//! are the seam to whatever database holds the catalog; [`MemoryCatalog`]
//! serves a YAML snapshot of it.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::error::StepError;

/// Catalog shipped with the binary for demonstrations.
pub const SAMPLE_CATALOG: &str = include_str!("sample_catalog.yaml");

/// An ordered list of song titles performed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetList {
    pub name: String,
    #[serde(default)]
    pub songs: Vec<String>,
}

/// A song with its lyrics split into named stanzas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,

    #[serde(default)]
    pub authors: Vec<String>,

    /// Stanza name to lines.
    #[serde(default)]
    pub lyrics: BTreeMap<String, Vec<String>>,

    /// Stanza names in performance order. A stanza may repeat.
    #[serde(default)]
    pub lyric_order: Vec<String>,
}

impl Song {
    /// Stanzas in performance order, skipping names without lyrics.
    pub fn stanzas(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.lyric_order.iter().filter_map(|name| {
            self.lyrics
                .get(name)
                .map(|lines| (name.as_str(), lines.as_slice()))
        })
    }
}

/// Looks up set lists by name.
#[async_trait]
pub trait SetListSource: Send + Sync {
    async fn find_set_list(&self, name: &str) -> Result<Option<SetList>, StepError>;
}

/// Looks up songs by title.
#[async_trait]
pub trait SongSource: Send + Sync {
    async fn find_song(&self, title: &str) -> Result<Option<Song>, StepError>;
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    set_lists: Vec<SetList>,
    #[serde(default)]
    songs: Vec<Song>,
}

/// In-memory catalog, loadable from YAML:
///
/// ```yaml
/// set_lists:
///   - name: easter
///     songs: [Amazing Grace]
/// songs:
///   - title: Amazing Grace
///     lyrics:
///       v1: ["Amazing grace, how sweet the sound"]
///     lyric_order: [v1]
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    set_lists: HashMap<String, SetList>,
    songs: HashMap<String, Song>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a catalog from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        let mut catalog = Self::new();
        for set_list in file.set_lists {
            catalog.add_set_list(set_list);
        }
        for song in file.songs {
            catalog.add_song(song);
        }
        Ok(catalog)
    }

    /// Loads a catalog from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = Self::from_yaml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            "Loaded catalog {} ({} set lists, {} songs)",
            path.display(),
            catalog.set_lists.len(),
            catalog.songs.len()
        );
        Ok(catalog)
    }

    /// The built-in demonstration catalog.
    pub fn sample() -> Result<Self, serde_yaml::Error> {
        Self::from_yaml_str(SAMPLE_CATALOG)
    }

    pub fn add_set_list(&mut self, set_list: SetList) -> &mut Self {
        self.set_lists.insert(set_list.name.clone(), set_list);
        self
    }

    pub fn add_song(&mut self, song: Song) -> &mut Self {
        self.songs.insert(song.title.clone(), song);
        self
    }

    /// Set list names, sorted.
    pub fn set_list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.set_lists.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl SetListSource for MemoryCatalog {
    async fn find_set_list(&self, name: &str) -> Result<Option<SetList>, StepError> {
        Ok(self.set_lists.get(name).cloned())
    }
}

#[async_trait]
impl SongSource for MemoryCatalog {
    async fn find_song(&self, title: &str) -> Result<Option<Song>, StepError> {
        Ok(self.songs.get(title).cloned())
    }
}
