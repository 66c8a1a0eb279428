pub mod error;
pub mod filter;
pub mod reconcile;
pub mod resolver;
pub mod scrobbler;

pub use error::ScrobbleError;
pub use filter::ViewerFilter;
pub use reconcile::reconcile;
pub use resolver::{parse_season_metadata, MetadataResolver};
pub use scrobbler::{ScrobbleOutcome, Scrobbler};
