//! Slide Deck Workflow
//!
//! The `build-slides` workflow turns a set list name into a rendered
//! slide deck:
//!
//! 1. `find-set-list`: look up the set list (unknown name is a user error)
//! 2. `find-songs-for-set-list`: look up each song, skipping missing ones
//! 3. `build-slide-show`: render the deck as `application/xml`

pub mod catalog;
pub mod context;
pub mod render;
pub mod steps;

use std::sync::Arc;

pub use catalog::{MemoryCatalog, SetList, SetListSource, Song, SongSource};
pub use context::BuildSlidesContext;
pub use render::{SlideShowConfig, SLIDE_SHOW_CONTENT_TYPE};
pub use steps::{BuildSlideShow, FindSetList, FindSongsForSetList};

use crate::pipeline::{FailureCheckpoint, Pipeline};
use crate::store::StateStore;

/// Registered name of the workflow.
pub const WORKFLOW_NAME: &str = "build-slides";

/// Builds the `build-slides` pipeline.
pub fn build_slides_pipeline(
    state_store: StateStore,
    set_lists: Arc<dyn SetListSource>,
    songs: Arc<dyn SongSource>,
    config: SlideShowConfig,
    failure_checkpoint: FailureCheckpoint,
) -> Pipeline<BuildSlidesContext> {
    Pipeline::builder(state_store)
        .step(FindSetList::new(set_lists))
        .step(FindSongsForSetList::new(songs))
        .step(BuildSlideShow::new(config))
        .failure_checkpoint(failure_checkpoint)
        .build()
}
