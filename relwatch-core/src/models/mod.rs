//! Domain models
//!
//! Stored rows ([`Repository`], [`Release`], [`SeenEvent`]), the derived
//! [`SeenStatus`], and the views handed to transports.

pub mod ids;
pub mod release;
pub mod repository;
pub mod seen;
pub mod view;

pub use ids::{ReleaseId, RepositoryId, UserId};
pub use release::{NewRelease, Release};
pub use repository::{NewRepository, Repository};
pub use seen::{SeenEvent, SeenStatus};
pub use view::{ReleaseView, RepositoryView};
