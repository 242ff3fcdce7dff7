//! Chunk streaming runtime: tick scheduler, wire protocol, and worker pool.
#![forbid(unsafe_code)]

pub mod clock;
pub mod events;
pub mod host;
pub mod options;
pub mod pool;
pub mod protocol;
pub mod scheduler;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use events::{BlockUpdate, BlockUpdateListener, ChunkInitListener};
pub use host::{ChunkRenderer, NullRenderer};
pub use options::SchedulerOptions;
pub use pool::JobPool;
pub use protocol::{ClientMessage, LoadRequest, ServerMessage, UnloadRequest, VoxelUpdate};
pub use scheduler::{ChunkStatus, SchedulerError, SchedulerStats, StreamingScheduler};
