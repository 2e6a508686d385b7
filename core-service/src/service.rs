//! Player service wiring.

use crate::adapters::{ArticlePlayButton, BackgroundMusic, EpisodeControls, FooterPlayer};
use crate::error::{CoreError, Result};
use bridge_traits::AudioProbe;
use core_library::{Article, Episode, EpisodeSource, HttpEpisodeSource};
use core_playback::{AudioEngine, PlaybackSession, PlayerConfig, PreloadCache, SymphoniaProbe};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The narration engine, its preload cache and session, the episode source
/// and the optional background track, built from one [`CoreConfig`].
///
/// Must be created inside a Tokio runtime.
pub struct PlayerService {
    engine: Arc<AudioEngine>,
    preload: Arc<PreloadCache>,
    session: Arc<PlaybackSession>,
    episodes: Arc<dyn EpisodeSource>,
    background: Option<Arc<BackgroundMusic>>,
    events: Option<EventBus>,
}

impl PlayerService {
    pub fn new(config: CoreConfig) -> Result<Self> {
        Self::with_player_config(config, PlayerConfig::default())
    }

    #[instrument(skip_all, fields(api = %config.api_base_url))]
    pub fn with_player_config(config: CoreConfig, mut player: PlayerConfig) -> Result<Self> {
        if player.engine.origin.is_none() {
            player.engine.origin = config.media_origin.clone();
        }
        player.validate().map_err(CoreError::Config)?;

        let events = config
            .events_enabled()
            .then(|| EventBus::new(config.event_buffer_size));

        let probe: Arc<dyn AudioProbe> = match &config.audio_probe {
            Some(probe) => Arc::clone(probe),
            None => Arc::new(SymphoniaProbe::new()),
        };
        let preload = Arc::new(
            PreloadCache::new(Arc::clone(&config.http_client), player.preload.clone())
                .with_probe(probe)
                .with_origin(player.engine.origin.clone()),
        );

        let engine = Arc::new(
            AudioEngine::new(
                Arc::clone(&config.audio_output),
                Arc::clone(&config.http_client),
                player.engine.clone(),
            )
            .with_preload(Arc::clone(&preload)),
        );

        let session = match &events {
            Some(bus) => PlaybackSession::with_event_bus(
                Arc::clone(&engine),
                player.session.clone(),
                bus.clone(),
            ),
            None => PlaybackSession::new(Arc::clone(&engine), player.session.clone()),
        }?;

        let mut source = HttpEpisodeSource::new(Arc::clone(&config.http_client), &config.api_base_url);
        if let Some(bus) = &events {
            source = source.with_event_bus(bus.clone());
        }

        let background = match &config.background_output {
            Some(output) => {
                let music = BackgroundMusic::new(
                    Arc::clone(output),
                    Arc::clone(&config.http_client),
                    &config.background_track,
                    player.engine.origin.clone(),
                )?;
                music.follow(&session);
                Some(music)
            }
            None => None,
        };

        info!(
            preload = player.preload.enabled,
            background = background.is_some(),
            "Player service ready"
        );

        Ok(Self {
            engine,
            preload,
            session,
            episodes: Arc::new(source),
            background,
            events,
        })
    }

    pub fn session(&self) -> &Arc<PlaybackSession> {
        &self.session
    }

    pub fn preload(&self) -> &Arc<PreloadCache> {
        &self.preload
    }

    pub fn episodes(&self) -> &Arc<dyn EpisodeSource> {
        &self.episodes
    }

    pub fn background(&self) -> Option<&Arc<BackgroundMusic>> {
        self.background.as_ref()
    }

    /// Stream of playback and catalog events. `None` when the bus is
    /// disabled.
    pub fn subscribe_events(&self) -> Option<EventStream> {
        self.events
            .as_ref()
            .map(|bus| EventStream::new(bus.subscribe()))
    }

    pub fn footer(&self) -> FooterPlayer {
        FooterPlayer::new(Arc::clone(&self.session))
    }

    pub fn article_button(&self, article: Article) -> ArticlePlayButton {
        ArticlePlayButton::new(Arc::clone(&self.session), article)
    }

    pub fn episode_controls(&self, episode: Episode) -> EpisodeControls {
        EpisodeControls::new(Arc::clone(&self.session), Arc::clone(&self.preload), episode)
    }

    /// Stop everything and release every buffer.
    ///
    /// # Errors
    ///
    /// [`CoreError::BuffersOutstanding`] when the engine still holds a
    /// buffer afterwards.
    pub fn shutdown(&self) -> Result<()> {
        self.session.stop();
        if let Some(music) = &self.background {
            music.stop();
        }
        self.preload.clear();

        let count = self.engine.outstanding_buffers();
        if count > 0 {
            warn!(count, "Decode buffers outstanding after shutdown");
            return Err(CoreError::BuffersOutstanding { count });
        }
        debug!("Player service shut down");
        Ok(())
    }
}
