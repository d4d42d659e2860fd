//! Thumbgrid Scheduler Library
//!
//! Background loading of images into display targets.
//!
//! An [`ImageLoader`] serves memory-cache hits synchronously and queues
//! everything else as a cancellable [`WorkUnit`] on a small worker pool.
//! Each [`ImageTarget`] is bound to at most one unit; rebinding a target
//! cancels stale work, and a result is only delivered to a target that is
//! still waiting for it. Cache maintenance runs on its own thread.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use thumbgrid_cache::{CacheConfig, CacheRegistry};
//! use thumbgrid_fetch::{FetcherConfig, ImageFetcher};
//! use thumbgrid_scheduler::{ImageLoader, ImageTarget, LoaderConfig, ScrollState};
//!
//! let registry = CacheRegistry::new();
//! let fetcher = Arc::new(ImageFetcher::new(FetcherConfig::default()));
//! let loader = ImageLoader::new(fetcher, LoaderConfig::default())?;
//! let _ = loader.add_image_cache(&registry, "thumbs", CacheConfig::for_namespace("thumbs"));
//!
//! let cell = Arc::new(ImageTarget::new());
//! loader.load_image(Some("https://example.com/a.jpg"), &cell);
//!
//! loader.on_scroll_state_changed(ScrollState::Fling);
//! loader.on_scroll_state_changed(ScrollState::Idle);
//! # Ok::<(), std::io::Error>(())
//! ```

mod cancel;
mod lifecycle;
mod loader;
mod maintenance;
mod pause;
mod queue;
mod target;
mod work;
mod worker;

pub use cancel::CancellationToken;
pub use lifecycle::ScrollState;
pub use loader::{ImageLoader, LoaderConfig, WorkConflict, DEFAULT_FADE_IN_DURATION};
pub use maintenance::{CacheOp, CacheThread, Completion};
pub use pause::PauseGate;
pub use queue::JobQueue;
pub use target::{ImageTarget, TargetContent, TargetListener, Transition};
pub use work::WorkUnit;
pub use worker::{JobExecutor, WorkerPool, WorkerPoolConfig};
