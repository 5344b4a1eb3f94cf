use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, ImageDescriptor, SelectionCriteria};
use crate::config::Configuration;
use crate::events::{Command, DisplayEvent, FetchIntent, FetchOutcome, FetchRequest};
use crate::nav::{Direction, Epoch, Mode, Navigation};
use crate::prefetch::PrefetchCache;
use crate::timer::RearmTimer;

/// Engine tuning distilled from configuration (local file merged with the
/// collaborator's startup config).
#[derive(Debug, Clone)]
pub struct Options {
    pub image_interval: Duration,
    pub attribution_delay: Duration,
    pub attribution_dwell: Duration,
    pub lookahead_count: usize,
    pub page_size: usize,
    pub catalog_cap: usize,
    pub criteria: SelectionCriteria,
}

impl Options {
    pub fn from_config(cfg: &Configuration) -> Self {
        Self {
            image_interval: cfg.image_interval,
            attribution_delay: cfg.attribution_delay,
            attribution_dwell: cfg.attribution_dwell,
            lookahead_count: cfg.lookahead_count,
            page_size: cfg.page_size,
            catalog_cap: cfg.catalog_cap,
            criteria: SelectionCriteria {
                orientation: cfg.orientation,
                query: cfg.image_query.clone(),
            },
        }
    }
}

struct Engine {
    opts: Options,
    catalog: Catalog,
    cache: PrefetchCache,
    nav: Navigation,
    criteria: SelectionCriteria,
    /// Completions issued under an epoch below this floor predate the last
    /// reset and are dropped on arrival.
    reset_floor: Epoch,
    extend_in_flight: bool,
    /// The loading screen stays up until a display load confirms.
    first_image_pending: bool,
    attribution_visible: bool,
    advance: RearmTimer,
    attribution_show: RearmTimer,
    attribution_hide: RearmTimer,
    requests: Sender<FetchRequest>,
    display: Sender<DisplayEvent>,
}

/// Drives the slideshow. This task owns every piece of mutable state
/// (catalog, cache, navigation, timers) and is the only place that mutates
/// it; commands, fetch completions, and timer fires are serialized through
/// one select loop. Navigation never awaits network work: it updates state
/// synchronously and schedules fetches whose completions are validated when
/// they arrive.
pub async fn run(
    opts: Options,
    mut commands: Receiver<Command>,
    requests: Sender<FetchRequest>,
    mut outcomes: Receiver<FetchOutcome>,
    display: Sender<DisplayEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let criteria = opts.criteria.clone();
    let mut engine = Engine {
        catalog: Catalog::new(opts.catalog_cap),
        cache: PrefetchCache::new(opts.lookahead_count),
        nav: Navigation::new(),
        criteria,
        reset_floor: Epoch::ZERO,
        extend_in_flight: false,
        first_image_pending: true,
        attribution_visible: false,
        advance: RearmTimer::new(),
        attribution_show: RearmTimer::new(),
        attribution_hide: RearmTimer::new(),
        requests,
        display,
        opts,
    };

    engine.reload(&mut outcomes, &cancel).await;

    loop {
        select! {
            _ = cancel.cancelled() => break,

            Some(command) = commands.recv() => {
                if command == Command::Quit {
                    info!("quit requested");
                    cancel.cancel();
                    break;
                }
                engine.on_command(command, &mut outcomes, &cancel).await;
            }

            Some(outcome) = outcomes.recv() => engine.on_outcome(outcome).await,

            _ = engine.advance.fired(), if engine.advance.is_armed() => {
                debug!("auto-advance");
                engine.navigate(Direction::Forward).await;
            }

            _ = engine.attribution_show.fired(), if engine.attribution_show.is_armed() => {
                engine.show_attribution().await;
            }

            _ = engine.attribution_hide.fired(), if engine.attribution_hide.is_armed() => {
                engine.hide_attribution().await;
            }
        }
    }
    Ok(())
}

impl Engine {
    async fn on_command(
        &mut self,
        command: Command,
        outcomes: &mut Receiver<FetchOutcome>,
        cancel: &CancellationToken,
    ) {
        match command {
            Command::Next => self.navigate(Direction::Forward).await,
            Command::Previous => self.navigate(Direction::Back).await,
            Command::Jump(index) => self.jump(index).await,
            Command::ToggleOffline => self.toggle_offline().await,
            Command::ToggleAttribution => self.toggle_attribution().await,
            Command::SetQuery(query) => {
                let criteria = SelectionCriteria {
                    orientation: self.criteria.orientation,
                    query,
                };
                self.change_criteria(criteria, outcomes, cancel).await;
            }
            Command::SetOrientation(orientation) => {
                let criteria = SelectionCriteria {
                    orientation,
                    query: self.criteria.query.clone(),
                };
                self.change_criteria(criteria, outcomes, cancel).await;
            }
            // Handled by the caller before dispatch.
            Command::Quit => {}
        }
    }

    async fn navigate(&mut self, direction: Direction) {
        if self.catalog.is_empty() {
            debug!("navigation ignored; catalog is empty");
            return;
        }
        let index = self.nav.step(direction, self.catalog.len());
        debug!(index, offline = self.nav.is_offline(), "navigate");
        self.display_current().await;
    }

    async fn jump(&mut self, index: usize) {
        if self.nav.jump(index, self.catalog.len()) {
            self.display_current().await;
        } else {
            warn!(index, "jump rejected");
        }
    }

    /// Show the image at the current position and kick off the follow-up
    /// work: display fetch, liveness probe, window refill, pagination.
    async fn display_current(&mut self) {
        self.advance.rearm(self.opts.image_interval);
        self.retract_attribution().await;

        let epoch = self.nav.epoch();
        let index = self.nav.current();
        let Some(descriptor) = self.catalog.get(index).cloned() else {
            warn!(index, "no descriptor at current position");
            return;
        };

        info!(index, url = %descriptor.url, "displaying");
        self.emit(DisplayEvent::Image {
            index,
            descriptor: descriptor.clone(),
        })
        .await;

        self.request(FetchRequest::Image {
            index,
            url: descriptor.url,
            intent: FetchIntent::Display,
            epoch,
        })
        .await;
        self.request(FetchRequest::Probe { epoch }).await;

        if !self.nav.is_offline() {
            self.refill(index, epoch).await;
            self.maybe_extend(index, epoch).await;
        }
    }

    /// Fire-and-forget loads for every window position not already cached
    /// or in flight.
    async fn refill(&mut self, current: usize, epoch: Epoch) {
        for index in self.cache.missing(current, self.catalog.len()) {
            let Some(descriptor) = self.catalog.get(index) else {
                continue;
            };
            let url = descriptor.url.clone();
            self.cache.begin(index);
            debug!(index, "prefetching");
            self.request(FetchRequest::Image {
                index,
                url,
                intent: FetchIntent::Prefetch,
                epoch,
            })
            .await;
        }
    }

    async fn maybe_extend(&mut self, current: usize, epoch: Epoch) {
        if self.extend_in_flight || !self.catalog.near_end(current) {
            return;
        }
        self.extend_in_flight = true;
        let start = self.catalog.next_start();
        info!(start, "requesting catalog extension");
        self.request(FetchRequest::Metadata {
            criteria: self.criteria.clone(),
            start,
            count: self.opts.page_size,
            epoch,
        })
        .await;
    }

    async fn on_outcome(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::ImageReady {
                index,
                intent,
                bytes,
                epoch,
            } => {
                if self.stale(epoch) {
                    return;
                }
                let recorded = self
                    .cache
                    .complete(index, self.nav.current(), self.catalog.len());
                debug!(index, bytes, recorded, ?intent, "image ready");
                if intent == FetchIntent::Display && index == self.nav.current() {
                    if self.first_image_pending {
                        self.first_image_pending = false;
                        self.emit(DisplayEvent::LoadingScreen(false)).await;
                    }
                    self.schedule_attribution();
                }
            }
            FetchOutcome::ImageFailed {
                index,
                intent,
                error,
                epoch,
            } => {
                if self.stale(epoch) {
                    return;
                }
                match intent {
                    FetchIntent::Prefetch => {
                        self.cache.fail(index);
                        warn!(index, %error, "prefetch failed");
                    }
                    FetchIntent::Display => {
                        warn!(index, %error, "display image failed to load");
                        if index == self.nav.current() && !self.nav.is_offline() {
                            self.enter_offline(false).await;
                        }
                    }
                }
            }
            FetchOutcome::ProbeResult { reachable, epoch } => {
                if self.stale(epoch) {
                    return;
                }
                self.on_probe(reachable).await;
            }
            FetchOutcome::MetadataReady {
                start,
                images,
                epoch,
            } => {
                self.extend_in_flight = false;
                if self.stale(epoch) {
                    return;
                }
                let appended = self.catalog.absorb(start, images);
                if appended > 0 {
                    info!(appended, total = self.catalog.len(), "catalog extended");
                } else {
                    debug!(start, "discarding misaligned metadata page");
                }
            }
            FetchOutcome::MetadataFailed {
                start,
                error,
                epoch,
            } => {
                self.extend_in_flight = false;
                if self.stale(epoch) {
                    return;
                }
                warn!(start, %error, "metadata request failed");
                if !self.nav.is_offline() {
                    self.enter_offline(false).await;
                }
            }
        }
    }

    fn stale(&self, epoch: Epoch) -> bool {
        if epoch < self.reset_floor {
            debug!(
                epoch = epoch.value(),
                floor = self.reset_floor.value(),
                "dropping completion from before the last reset"
            );
            true
        } else {
            false
        }
    }

    /// Probe results are idempotent with respect to mode, and automatic
    /// recovery never overrides a manual offline entry.
    async fn on_probe(&mut self, reachable: bool) {
        if reachable {
            if matches!(self.nav.mode(), Mode::OfflineAuto(_)) {
                info!("connectivity restored");
                self.leave_offline().await;
            }
        } else if !self.nav.is_offline() {
            warn!("connectivity lost");
            self.enter_offline(false).await;
        }
    }

    /// Automatic or manual offline entry: freeze the cache snapshot and
    /// start browsing it.
    async fn enter_offline(&mut self, manual: bool) {
        if self.nav.is_offline() {
            return;
        }
        let snapshot = self.cache.snapshot();
        info!(manual, cached = snapshot.len(), positions = ?snapshot, "entering offline mode");
        self.nav.enter_offline(manual, snapshot);
        self.emit(DisplayEvent::OfflineIndicator(true)).await;
    }

    async fn leave_offline(&mut self) {
        if !self.nav.is_offline() {
            return;
        }
        info!("exiting offline mode");
        self.nav.exit_offline();
        self.emit(DisplayEvent::OfflineIndicator(false)).await;
    }

    async fn toggle_offline(&mut self) {
        if self.nav.is_offline() {
            self.leave_offline().await;
        } else {
            self.enter_offline(true).await;
        }
    }

    fn schedule_attribution(&mut self) {
        let has_attribution = self
            .catalog
            .get(self.nav.current())
            .map(|descriptor| descriptor.attribution.is_some())
            .unwrap_or(false);
        if has_attribution {
            self.attribution_show.rearm(self.opts.attribution_delay);
        }
    }

    async fn show_attribution(&mut self) {
        self.attribution_visible = true;
        self.emit(DisplayEvent::AttributionVisible(true)).await;
        self.attribution_hide.rearm(self.opts.attribution_dwell);
    }

    async fn hide_attribution(&mut self) {
        if self.attribution_visible {
            self.attribution_visible = false;
            self.emit(DisplayEvent::AttributionVisible(false)).await;
        }
    }

    /// Navigation clears the attribution immediately along with any pending
    /// show/hide deadlines.
    async fn retract_attribution(&mut self) {
        self.attribution_show.disarm();
        self.attribution_hide.disarm();
        self.hide_attribution().await;
    }

    async fn toggle_attribution(&mut self) {
        if self.attribution_visible {
            self.attribution_hide.disarm();
            self.hide_attribution().await;
        } else {
            self.attribution_show.disarm();
            self.show_attribution().await;
        }
    }

    async fn change_criteria(
        &mut self,
        criteria: SelectionCriteria,
        outcomes: &mut Receiver<FetchOutcome>,
        cancel: &CancellationToken,
    ) {
        if criteria == self.criteria {
            debug!("selection criteria unchanged");
            return;
        }
        info!(query = %criteria.query, orientation = %criteria.orientation, "selection criteria changed");
        self.criteria = criteria;
        self.reload(outcomes, cancel).await;
    }

    /// Full invalidation: blocking loading state, fresh metadata under the
    /// current criteria, navigation back to (online, position 0). Startup
    /// runs through here once with the configured criteria.
    async fn reload(&mut self, outcomes: &mut Receiver<FetchOutcome>, cancel: &CancellationToken) {
        self.emit(DisplayEvent::LoadingScreen(true)).await;
        self.first_image_pending = true;
        self.advance.disarm();
        self.attribution_show.disarm();
        self.attribution_hide.disarm();
        self.attribution_visible = false;
        let was_offline = self.nav.is_offline();
        self.catalog.clear();
        self.cache.clear();
        self.reset_floor = self.nav.reset();
        self.extend_in_flight = false;
        if was_offline {
            self.emit(DisplayEvent::OfflineIndicator(false)).await;
        }

        let epoch = self.nav.epoch();
        self.request(FetchRequest::Metadata {
            criteria: self.criteria.clone(),
            start: 0,
            count: self.opts.page_size,
            epoch,
        })
        .await;

        match self.await_initial_page(outcomes, cancel, epoch).await {
            Some(images) if !images.is_empty() => {
                let count = self.catalog.absorb(0, images);
                info!(count, query = %self.criteria.query, "catalog loaded");
                self.advance.rearm(self.opts.image_interval);
                self.display_current().await;
            }
            Some(_) => {
                warn!("metadata reload returned no images");
                self.enter_offline(false).await;
            }
            None => {
                self.enter_offline(false).await;
            }
        }
    }

    /// Block on the one outstanding initial page, dropping whatever stale
    /// completions race in. Commands are deliberately not serviced while
    /// the loading state is up.
    async fn await_initial_page(
        &mut self,
        outcomes: &mut Receiver<FetchOutcome>,
        cancel: &CancellationToken,
        epoch: Epoch,
    ) -> Option<Vec<ImageDescriptor>> {
        loop {
            select! {
                _ = cancel.cancelled() => return None,
                maybe = outcomes.recv() => match maybe {
                    Some(FetchOutcome::MetadataReady { start: 0, images, epoch: e }) if e >= epoch => {
                        return Some(images);
                    }
                    Some(FetchOutcome::MetadataFailed { start: 0, error, epoch: e }) if e >= epoch => {
                        warn!(%error, "initial metadata load failed");
                        return None;
                    }
                    Some(other) => debug!(outcome = ?other, "dropped while reloading"),
                    None => return None,
                },
            }
        }
    }

    async fn emit(&self, event: DisplayEvent) {
        if self.display.send(event).await.is_err() {
            debug!("viewer channel closed");
        }
    }

    async fn request(&self, request: FetchRequest) {
        if self.requests.send(request).await.is_err() {
            debug!("fetcher channel closed");
        }
    }
}
