#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

//! Feature extractors for the Ronda pipeline.
//!
//! - Content: title, description, tags, category and duration
//! - Temporal: publish hour, weekday and month
//! - Channel: per-channel view and engagement aggregates
//! - Time series: growth, peak day and engagement ratios from the daily window
//!
//! The [`registry`] lists every feature and derives the at-publish allow-list.
//!
//! # Example
//!
//! ```
//! use ronda_features::FeatureBuilder;
//! use ronda_features::registry::at_publish_features;
//!
//! let builder = FeatureBuilder::new(60);
//! assert_eq!(builder.extractor_names(), ["content", "temporal", "channel", "time_series"]);
//! assert!(at_publish_features().contains(&"publish_hour"));
//! ```

pub mod builder;
pub mod channel;
pub mod content;
pub mod language;
pub mod registry;
pub mod temporal;
pub mod timeseries;

// Re-export key types
pub use builder::{FeatureBuilder, FeatureSet};
pub use channel::ChannelFeatures;
pub use content::ContentFeatures;
pub use registry::{FeatureCategory, FeatureInfo, FeatureKind};
pub use temporal::TemporalFeatures;
pub use timeseries::TimeSeriesFeatures;
