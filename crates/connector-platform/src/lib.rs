pub mod backoff;
pub mod credentials;
pub mod facebook;
pub mod platform;
pub mod router;
pub mod youtube_common;
pub mod youtube_direct;
pub mod youtube_live;
pub mod youtube_mcn;

pub use credentials::{CredentialSource, FacebookCredentialSource, YoutubeDirectCredentialSource};
pub use facebook::{FacebookAdapter, FacebookGraphClient, LiveFacebookGraphClient};
pub use platform::{PlatformAdapter, UpdateOutcome, UploadOutcome};
pub use router::PlatformRouter;
pub use youtube_common::YoutubeClient;
pub use youtube_direct::YoutubeDirectAdapter;
pub use youtube_live::LiveYoutubeClient;
pub use youtube_mcn::YoutubeMcnAdapter;
