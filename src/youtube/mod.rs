pub mod api_key_manager;
pub mod client;
pub mod errors;
pub mod poller;
pub mod resolver;
pub mod state;
pub mod types;
pub mod video_id;

pub use client::YouTubeClient;
pub use errors::YouTubeError;
pub use poller::{ChatPoller, StopSignal};
pub use resolver::{ResolvedStream, StreamLookup, StreamResolver};
pub use video_id::extract_video_id;
