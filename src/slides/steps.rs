//! Slide Workflow Steps

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use super::catalog::{SetListSource, SongSource};
use super::context::BuildSlidesContext;
use super::render::{render_slide_show, SlideShowConfig, SLIDE_SHOW_CONTENT_TYPE};
use crate::error::{StepError, UserError};
use crate::pipeline::Step;
use crate::workflow::WorkflowContext;

/// Looks up the requested set list.
pub struct FindSetList {
    source: Arc<dyn SetListSource>,
}

impl FindSetList {
    pub const NAME: &'static str = "find-set-list";

    pub fn new(source: Arc<dyn SetListSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Step<BuildSlidesContext> for FindSetList {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, mut context: BuildSlidesContext) -> Result<BuildSlidesContext, StepError> {
        let set_list = self
            .source
            .find_set_list(&context.set_list_name)
            .await?
            .ok_or_else(|| UserError::new(format!("Unknown set list: '{}'", context.set_list_name)))?;

        debug!(
            "Found set list '{}' with {} songs - claimTicket = {}",
            set_list.name,
            set_list.songs.len(),
            context.claim_ticket()
        );
        context.set_list = Some(set_list);
        Ok(context)
    }
}

/// Looks up every song of the set list. Titles missing from the catalog
/// are skipped.
pub struct FindSongsForSetList {
    source: Arc<dyn SongSource>,
}

impl FindSongsForSetList {
    pub const NAME: &'static str = "find-songs-for-set-list";

    pub fn new(source: Arc<dyn SongSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Step<BuildSlidesContext> for FindSongsForSetList {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, mut context: BuildSlidesContext) -> Result<BuildSlidesContext, StepError> {
        let titles = match &context.set_list {
            Some(set_list) => set_list.songs.clone(),
            None => return Err("no set list loaded".into()),
        };

        let mut songs = BTreeMap::new();
        for title in titles {
            match self.source.find_song(&title).await? {
                Some(song) => {
                    songs.insert(song.title.clone(), song);
                }
                None => warn!(
                    "Song '{}' not found - skipping (claimTicket = {})",
                    title,
                    context.claim_ticket()
                ),
            }
        }

        context.songs = songs;
        Ok(context)
    }
}

/// Renders the deck into the context's final content.
pub struct BuildSlideShow {
    config: SlideShowConfig,
}

impl BuildSlideShow {
    pub const NAME: &'static str = "build-slide-show";

    pub fn new(config: SlideShowConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Step<BuildSlidesContext> for BuildSlideShow {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, mut context: BuildSlidesContext) -> Result<BuildSlidesContext, StepError> {
        let set_list = context
            .set_list
            .as_ref()
            .ok_or_else(|| StepError::from("no set list loaded"))?;

        // Set list order, not title order
        let songs = set_list
            .songs
            .iter()
            .filter_map(|title| context.songs.get(title));
        let deck = render_slide_show(&self.config, &set_list.name, songs);

        info!(
            "Built slide show for '{}' ({} bytes) - claimTicket = {}",
            set_list.name,
            deck.len(),
            context.claim_ticket()
        );
        context.content = deck.into_bytes();
        context.content_type = Some(SLIDE_SHOW_CONTENT_TYPE.to_string());
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slides::catalog::{MemoryCatalog, SetList, Song};
    use crate::workflow::FinalContent;

    struct BrokenSource;

    #[async_trait]
    impl SongSource for BrokenSource {
        async fn find_song(&self, _title: &str) -> Result<Option<Song>, StepError> {
            Err("catalog offline".into())
        }
    }

    fn catalog() -> Arc<MemoryCatalog> {
        let mut catalog = MemoryCatalog::new();
        catalog.add_set_list(SetList {
            name: "easter".to_string(),
            songs: vec!["Zion".to_string(), "Missing".to_string(), "Abide".to_string()],
        });
        for title in ["Zion", "Abide"] {
            let mut lyrics = BTreeMap::new();
            lyrics.insert("v1".to_string(), vec![format!("{} line", title)]);
            catalog.add_song(Song {
                title: title.to_string(),
                authors: Vec::new(),
                lyrics,
                lyric_order: vec!["v1".to_string()],
            });
        }
        Arc::new(catalog)
    }

    #[tokio::test]
    async fn test_find_set_list() {
        let step = FindSetList::new(catalog());
        let ctx = step.run(BuildSlidesContext::new("easter")).await.unwrap();
        assert_eq!(ctx.set_list.unwrap().songs.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_set_list_is_user_error() {
        let step = FindSetList::new(catalog());
        let err = step.run(BuildSlidesContext::new("christmas")).await.unwrap_err();

        let user = err.downcast_ref::<UserError>().unwrap();
        assert_eq!(user.message(), "Unknown set list: 'christmas'");
    }

    #[tokio::test]
    async fn test_find_songs_skips_missing() {
        let catalog = catalog();
        let ctx = FindSetList::new(catalog.clone())
            .run(BuildSlidesContext::new("easter"))
            .await
            .unwrap();
        let ctx = FindSongsForSetList::new(catalog).run(ctx).await.unwrap();

        let titles: Vec<&str> = ctx.songs.keys().map(String::as_str).collect();
        assert_eq!(titles, vec!["Abide", "Zion"]);
    }

    #[tokio::test]
    async fn test_find_songs_propagates_source_error() {
        let ctx = FindSetList::new(catalog())
            .run(BuildSlidesContext::new("easter"))
            .await
            .unwrap();
        let err = FindSongsForSetList::new(Arc::new(BrokenSource))
            .run(ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "catalog offline");
    }

    #[tokio::test]
    async fn test_build_slide_show_keeps_set_list_order() {
        let catalog = catalog();
        let ctx = FindSetList::new(catalog.clone())
            .run(BuildSlidesContext::new("easter"))
            .await
            .unwrap();
        let ctx = FindSongsForSetList::new(catalog).run(ctx).await.unwrap();
        let ctx = BuildSlideShow::new(SlideShowConfig::default())
            .run(ctx)
            .await
            .unwrap();

        assert_eq!(ctx.final_content_type(), "application/xml");
        let xml = String::from_utf8(ctx.final_content().to_vec()).unwrap();
        let zion = xml.find("Zion line").unwrap();
        let abide = xml.find("Abide line").unwrap();
        assert!(zion < abide);
    }

    #[tokio::test]
    async fn test_build_without_set_list_fails() {
        let err = BuildSlideShow::new(SlideShowConfig::default())
            .run(BuildSlidesContext::new("easter"))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<UserError>().is_none());
    }
}
