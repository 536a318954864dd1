//! Core engine for icsmirror.
//!
//! This crate holds everything with real invariants:
//! - `record` and `store` for the composite-key, first-write-wins event store
//! - `ics` for turning feed bytes into records and records back into a feed
//! - `category` for keyword-precedence categorization
//! - `progress` and `mirror` for per-destination idempotent mirroring
//!
//! Network and VCS collaborators are reached through the `FeedSource`,
//! `DestinationService` and `Publisher` traits.

pub mod category;
pub mod error;
pub mod feed;
pub mod ics;
pub mod ingest;
pub mod mirror;
pub mod progress;
pub mod publish;
pub mod record;
pub mod state;
pub mod store;

pub use category::{Categorizer, Category, CategoryRules, KeywordRule, OverrideRule};
pub use error::{DecodeError, FetchError, IcsMirrorError, IcsMirrorResult, PublishError, RemoteError};
pub use feed::FeedSource;
pub use mirror::{Destination, DestinationService, EventPayload, MirrorDriver, PushOutcome, SweepReport};
pub use progress::ProgressSet;
pub use publish::{GitPublisher, Publisher};
pub use record::{EventRecord, IdentityKey};
pub use state::StateDir;
pub use store::EventStore;
