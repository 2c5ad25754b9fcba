//! Async image loading orchestrator.
//!
//! Memory -> Disk -> Raw source, with results delivered on the main context
//! only while the requesting target still wants them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, trace, warn};

use crate::domain::entities::{DecodedImage, ImageId, LoadStage};
use crate::domain::errors::{DecodeError, EngineError, LoadError, StoreError};
use crate::domain::ports::{
    DisplayTarget, ImageCachePort, ImageDecoderPort, MainContextPort, RawFetchPort,
};
use crate::infrastructure::fetch::FetchTimeouts;

use super::assignment::{AssignmentTracker, TargetHandle};
use super::decoder::{DEFAULT_DECODE_ALLOC_LIMIT, SampledDecoder};
use super::fetcher::Fetcher;
use super::file_cache::FileCache;
use super::memory_cache::{DEFAULT_MEMORY_LIMIT, MemoryImageCache};

/// Default number of concurrent load tasks.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Default larger-side size for targets that report no measured size.
pub const DEFAULT_MAX_DIMENSION: u32 = 70;

/// Prefix of identifiers handed out by [`LoadEngine::store`].
pub const STORED_ID_PREFIX: &str = "user-image-";

const STORED_JPEG_QUALITY: u8 = 100;

/// How a queued load ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The decoded image was rendered.
    Rendered,
    /// The load failed and the placeholder was rendered.
    Placeholder,
    /// The target had moved on; nothing was rendered.
    Discarded {
        /// Stage at which staleness was detected.
        stage: LoadStage,
    },
}

/// Message sent when a queued load finishes.
#[derive(Debug, Clone)]
pub struct LoadEvent {
    /// The image ID.
    pub id: ImageId,
    /// What happened to the target.
    pub outcome: LoadOutcome,
}

/// Configuration for the load engine.
#[derive(Debug, Clone)]
pub struct LoadEngineConfig {
    /// Maximum concurrent load tasks.
    pub pool_size: usize,
    /// Size used for targets that report no measured size.
    pub default_max_dimension: u32,
    /// Byte budget of the memory tier.
    pub memory_limit_bytes: usize,
    /// Allocation cap for a single decode.
    pub decode_alloc_limit_bytes: u64,
    /// Raw fetch timeouts.
    pub timeouts: FetchTimeouts,
}

impl Default for LoadEngineConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            default_max_dimension: DEFAULT_MAX_DIMENSION,
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT,
            decode_alloc_limit_bytes: DEFAULT_DECODE_ALLOC_LIMIT,
            timeouts: FetchTimeouts::default(),
        }
    }
}

/// A load waiting for a worker.
struct LoadJob {
    id: ImageId,
    target: TargetHandle,
    max_dimension: u32,
}

/// Everything a running load needs, shared by all workers.
struct JobContext {
    memory_cache: Arc<MemoryImageCache>,
    fetcher: Fetcher,
    decoder: Arc<dyn ImageDecoderPort>,
    tracker: Arc<AssignmentTracker>,
    main_context: Arc<dyn MainContextPort>,
    events: Option<mpsc::UnboundedSender<LoadEvent>>,
    pending: Arc<AtomicUsize>,
}

/// State for the background dispatcher loop.
struct WorkerState {
    context: Arc<JobContext>,
    semaphore: Arc<Semaphore>,
    request_rx: mpsc::UnboundedReceiver<LoadJob>,
}

/// Builder for [`LoadEngine`].
pub struct LoadEngineBuilder {
    file_cache: FileCache,
    source: Arc<dyn RawFetchPort>,
    main_context: Arc<dyn MainContextPort>,
    decoder: Option<Arc<dyn ImageDecoderPort>>,
    events: Option<mpsc::UnboundedSender<LoadEvent>>,
    config: LoadEngineConfig,
}

impl LoadEngineBuilder {
    /// Replaces the default configuration.
    #[must_use]
    pub fn config(mut self, config: LoadEngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default [`SampledDecoder`].
    #[must_use]
    pub fn decoder(mut self, decoder: Arc<dyn ImageDecoderPort>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Reports one [`LoadEvent`] per queued load on `tx`.
    #[must_use]
    pub fn events(mut self, tx: mpsc::UnboundedSender<LoadEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Builds the engine and starts its dispatcher on the current runtime.
    ///
    /// # Errors
    /// Returns error if called outside a tokio runtime.
    pub fn build(self) -> Result<LoadEngine, EngineError> {
        let runtime = tokio::runtime::Handle::try_current()?;
        let config = self.config;

        let memory_cache = Arc::new(MemoryImageCache::new(config.memory_limit_bytes));
        let tracker = Arc::new(AssignmentTracker::new());
        let pending = Arc::new(AtomicUsize::new(0));
        let decoder = self.decoder.unwrap_or_else(|| {
            Arc::new(SampledDecoder::new(config.decode_alloc_limit_bytes))
        });
        let fetcher = Fetcher::new(self.file_cache.clone(), self.source, config.timeouts);

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(config.pool_size.max(1)));

        let context = Arc::new(JobContext {
            memory_cache: memory_cache.clone(),
            fetcher,
            decoder,
            tracker: tracker.clone(),
            main_context: self.main_context,
            events: self.events,
            pending: pending.clone(),
        });
        let worker_state = WorkerState {
            context: context.clone(),
            semaphore,
            request_rx,
        };

        runtime.spawn(LoadEngine::run_worker_loop(worker_state));
        info!(pool_size = config.pool_size.max(1), "Image load engine started");

        Ok(LoadEngine {
            context,
            memory_cache,
            file_cache: self.file_cache,
            tracker,
            default_dimension: AtomicU32::new(config.default_max_dimension),
            pending,
            request_tx,
            config,
        })
    }
}

/// Orchestrates image loading from memory, disk, and raw sources.
pub struct LoadEngine {
    context: Arc<JobContext>,
    memory_cache: Arc<MemoryImageCache>,
    file_cache: FileCache,
    tracker: Arc<AssignmentTracker>,
    default_dimension: AtomicU32,
    pending: Arc<AtomicUsize>,
    request_tx: mpsc::UnboundedSender<LoadJob>,
    config: LoadEngineConfig,
}

impl std::fmt::Debug for LoadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadEngine")
            .field("config", &self.config)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl LoadEngine {
    /// Starts building an engine over a file cache, a raw source and a main context.
    #[must_use]
    pub fn builder(
        file_cache: FileCache,
        source: Arc<dyn RawFetchPort>,
        main_context: Arc<dyn MainContextPort>,
    ) -> LoadEngineBuilder {
        LoadEngineBuilder {
            file_cache,
            source,
            main_context,
            decoder: None,
            events: None,
            config: LoadEngineConfig::default(),
        }
    }

    /// Dispatcher loop: queues jobs in arrival order and hands each one a
    /// worker permit as soon as one is free.
    async fn run_worker_loop(mut state: WorkerState) {
        let mut queue: VecDeque<LoadJob> = VecDeque::new();

        loop {
            tokio::select! {
                job = state.request_rx.recv() => {
                    match job {
                        Some(job) => {
                            trace!(id = %job.id, stage = %LoadStage::Queued, "Load stage");
                            queue.push_back(job);
                        }
                        None => break,
                    }
                }
                Ok(permit) = state.semaphore.clone().acquire_owned(), if !queue.is_empty() => {
                    if let Some(job) = queue.pop_front() {
                        let context = state.context.clone();
                        tokio::spawn(async move {
                            context.run(job).await;
                            drop(permit);
                        });
                    }
                }
            }
        }

        debug!(dropped = queue.len(), "Image load engine stopped");
    }

    /// Shows `id` on `target`, using the target's measured size (or the
    /// default dimension) as the decode size.
    ///
    /// Renders synchronously on a memory hit and returns [`LoadStage::Done`].
    /// Otherwise renders the placeholder, queues a load and returns
    /// [`LoadStage::Queued`].
    pub fn request<T: DisplayTarget + 'static>(
        &self,
        id: impl Into<ImageId>,
        target: &Arc<T>,
    ) -> LoadStage {
        let max_dimension = target
            .measured_size()
            .filter(|size| *size > 0)
            .unwrap_or_else(|| self.default_dimension());
        self.request_with_size(id, target, max_dimension)
    }

    /// Like [`LoadEngine::request`] with an explicit decode size.
    pub fn request_with_size<T: DisplayTarget + 'static>(
        &self,
        id: impl Into<ImageId>,
        target: &Arc<T>,
        max_dimension: u32,
    ) -> LoadStage {
        let id = id.into();
        let target: Arc<dyn DisplayTarget> = target.clone();

        self.tracker.assign(&target, id.clone());

        if let Some(image) = self.memory_cache.get(&id) {
            trace!(id = %id, "Rendering from memory cache");
            target.render_image(image);
            return LoadStage::Done;
        }

        target.render_placeholder();
        trace!(id = %id, stage = %LoadStage::Requested, max_dimension, "Load stage");

        self.pending.fetch_add(1, Ordering::SeqCst);
        let job = LoadJob {
            id,
            target: Arc::downgrade(&target),
            max_dimension,
        };
        if let Err(e) = self.request_tx.send(job) {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            error!(id = %e.0.id, "Failed to queue load: dispatcher stopped");
        }
        LoadStage::Queued
    }

    /// Loads `id` without a display target and returns the decoded image.
    ///
    /// Uses the same tiers as [`LoadEngine::request`]: a memory hit returns at
    /// once, otherwise the file is fetched if needed, decoded to
    /// `max_dimension` and added to the memory tier. Failures are logged and
    /// return `None`.
    pub async fn load(
        &self,
        id: impl Into<ImageId>,
        max_dimension: u32,
    ) -> Option<Arc<DecodedImage>> {
        let id = id.into();
        if let Some(image) = self.memory_cache.get(&id) {
            return Some(image);
        }
        self.context.resolve(&id, max_dimension).await
    }

    /// Saves a caller-supplied image into the disk tier and returns the
    /// identifier to request it by.
    ///
    /// Images whose larger side exceeds `preferred_size` are scaled down to
    /// fit it, keeping their aspect ratio. The result is stored as JPEG.
    ///
    /// # Errors
    /// Returns error if encoding fails or the file cannot be written.
    pub async fn store(
        &self,
        image: DynamicImage,
        preferred_size: u32,
    ) -> Result<ImageId, StoreError> {
        let bytes = tokio::task::spawn_blocking(move || encode_for_store(&image, preferred_size))
            .await
            .map_err(|e| StoreError::Task {
                message: e.to_string(),
            })??;

        let id = ImageId::new(format!("{STORED_ID_PREFIX}{}", uuid::Uuid::new_v4().simple()));
        self.file_cache.insert(&id, &bytes).await?;
        debug!(id = %id, size = bytes.len(), "Stored caller image");
        Ok(id)
    }

    /// Returns the identifier `target` was last requested with.
    #[must_use]
    pub fn current_assignment<T: DisplayTarget + 'static>(&self, target: &Arc<T>) -> Option<ImageId> {
        let target: Arc<dyn DisplayTarget> = target.clone();
        self.tracker.current(&Arc::downgrade(&target))
    }

    /// Forgets `target`; any load still in flight for it will be discarded.
    pub fn forget<T: DisplayTarget + 'static>(&self, target: &Arc<T>) {
        let target: Arc<dyn DisplayTarget> = target.clone();
        self.tracker.release(&Arc::downgrade(&target));
    }

    /// Sets the decode size used for targets without a measured size.
    /// Affects subsequent requests only.
    pub fn set_default_dimension(&self, max_dimension: u32) {
        self.default_dimension.store(max_dimension, Ordering::Relaxed);
    }

    /// Returns the decode size used for targets without a measured size.
    #[must_use]
    pub fn default_dimension(&self) -> u32 {
        self.default_dimension.load(Ordering::Relaxed)
    }

    /// Returns the number of queued loads that have not finished.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Returns the memory tier.
    #[must_use]
    pub const fn memory_cache(&self) -> &Arc<MemoryImageCache> {
        &self.memory_cache
    }

    /// Returns the disk tier.
    #[must_use]
    pub const fn file_cache(&self) -> &FileCache {
        &self.file_cache
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &LoadEngineConfig {
        &self.config
    }

    /// Clears both cache tiers.
    pub async fn clear_cache(&self) {
        self.memory_cache.clear();
        self.file_cache.clear().await;
        info!("Cleared all image caches");
    }
}

impl JobContext {
    async fn run(&self, job: LoadJob) {
        let LoadJob {
            id,
            target,
            max_dimension,
        } = job;

        if !self.tracker.is_current(&target, &id) {
            trace!(id = %id, stage = %LoadStage::Discarded, "Target reassigned before load");
            self.finish(&id, LoadOutcome::Discarded {
                stage: LoadStage::Queued,
            });
            return;
        }

        let result = self.resolve(&id, max_dimension).await;

        if !self.tracker.is_current(&target, &id) {
            trace!(id = %id, stage = %LoadStage::Discarded, "Target reassigned during load");
            self.finish(&id, LoadOutcome::Discarded {
                stage: LoadStage::Decoding,
            });
            return;
        }

        trace!(id = %id, stage = %LoadStage::Delivering, "Load stage");
        let tracker = self.tracker.clone();
        let events = self.events.clone();
        let pending = self.pending.clone();
        let delivered_id = id.clone();
        let posted = self.main_context.post(Box::new(move || {
            let outcome = deliver(&tracker, &target, &delivered_id, result);
            report(events.as_ref(), &pending, delivered_id, outcome);
        }));
        if posted.is_err() {
            self.finish(&id, LoadOutcome::Discarded {
                stage: LoadStage::Delivering,
            });
        }
    }

    /// Fetches and decodes `id`, adding the image to the memory tier on
    /// success. Failures are logged and become `None`.
    async fn resolve(&self, id: &ImageId, max_dimension: u32) -> Option<Arc<DecodedImage>> {
        match self.load(id, max_dimension).await {
            Ok(image) => {
                if let Some(image) = &image {
                    self.memory_cache.put(id.clone(), image.clone());
                }
                image
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Image load failed");
                if e.is_resource_exhaustion() {
                    self.memory_cache.clear();
                    warn!("Cleared memory cache after resource exhaustion");
                }
                None
            }
        }
    }

    /// Fetches and decodes. `Ok(None)` means the cached file vanished.
    async fn load(
        &self,
        id: &ImageId,
        max_dimension: u32,
    ) -> Result<Option<Arc<DecodedImage>>, LoadError> {
        trace!(id = %id, stage = %LoadStage::Fetching, "Load stage");
        let path = self.fetcher.ensure_cached(id).await?;

        trace!(id = %id, stage = %LoadStage::Decoding, "Load stage");
        let decoder = self.decoder.clone();
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&path, max_dimension))
            .await
            .map_err(|e| DecodeError::corrupt(format!("Decode task panicked: {e}")))?;

        match decoded {
            Ok(image) => Ok(image.map(Arc::new)),
            Err(e) => {
                if e.is_bad_content() {
                    self.fetcher.file_cache().evict(id).await;
                }
                Err(e.into())
            }
        }
    }

    fn finish(&self, id: &ImageId, outcome: LoadOutcome) {
        report(self.events.as_ref(), &self.pending, id.clone(), outcome);
    }
}

/// Shrinks `image` to fit `preferred_size` and encodes it as JPEG.
fn encode_for_store(image: &DynamicImage, preferred_size: u32) -> Result<Vec<u8>, StoreError> {
    let preferred_size = preferred_size.max(1);
    let fitted = if image.width().max(image.height()) > preferred_size {
        image.resize(preferred_size, preferred_size, FilterType::Triangle)
    } else {
        image.clone()
    };

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(fitted.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, STORED_JPEG_QUALITY))?;
    Ok(bytes)
}

/// Final staleness check and render, run on the main context.
fn deliver(
    tracker: &AssignmentTracker,
    target: &Weak<dyn DisplayTarget>,
    id: &ImageId,
    result: Option<Arc<DecodedImage>>,
) -> LoadOutcome {
    let discarded = LoadOutcome::Discarded {
        stage: LoadStage::Delivering,
    };
    if !tracker.is_current(target, id) {
        trace!(id = %id, stage = %LoadStage::Discarded, "Target reassigned before render");
        return discarded;
    }
    let Some(target) = target.upgrade() else {
        return discarded;
    };

    trace!(id = %id, stage = %LoadStage::Done, "Load stage");
    match result {
        Some(image) => {
            target.render_image(image);
            LoadOutcome::Rendered
        }
        None => {
            target.render_placeholder();
            LoadOutcome::Placeholder
        }
    }
}

fn report(
    events: Option<&mpsc::UnboundedSender<LoadEvent>>,
    pending: &AtomicUsize,
    id: ImageId,
    outcome: LoadOutcome,
) {
    pending.fetch_sub(1, Ordering::SeqCst);
    if let Some(tx) = events {
        let _ = tx.send(LoadEvent { id, outcome });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::dispatch::main_context;
    use crate::infrastructure::fetch::SourceRouter;

    async fn engine() -> Result<(LoadEngine, tempfile::TempDir), Box<dyn std::error::Error>> {
        let temp_dir = tempfile::TempDir::new()?;
        let file_cache = FileCache::new(temp_dir.path().to_path_buf()).await?;
        let source = Arc::new(SourceRouter::new(FetchTimeouts::default(), None)?);
        let (queue, _runner) = main_context();
        let engine = LoadEngine::builder(file_cache, source, Arc::new(queue)).build()?;
        Ok((engine, temp_dir))
    }

    #[tokio::test]
    async fn test_engine_creation() -> Result<(), Box<dyn std::error::Error>> {
        let (engine, _temp) = engine().await?;
        assert_eq!(engine.pending_count(), 0);
        assert_eq!(engine.default_dimension(), DEFAULT_MAX_DIMENSION);
        assert_eq!(engine.config().pool_size, DEFAULT_POOL_SIZE);
        Ok(())
    }

    #[tokio::test]
    async fn test_default_dimension_setter() -> Result<(), Box<dyn std::error::Error>> {
        let (engine, _temp) = engine().await?;
        engine.set_default_dimension(120);
        assert_eq!(engine.default_dimension(), 120);
        Ok(())
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let file_cache = rt
            .block_on(FileCache::new(temp_dir.path().to_path_buf()))
            .unwrap();
        let source = Arc::new(SourceRouter::new(FetchTimeouts::default(), None).unwrap());
        let (queue, _runner) = main_context();

        let result = LoadEngine::builder(file_cache, source, Arc::new(queue)).build();
        assert!(matches!(result, Err(EngineError::NoRuntime(_))));
    }
}
