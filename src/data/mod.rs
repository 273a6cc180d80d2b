//! Match data, reference catalog and training data sets

pub mod catalog;
pub mod dataset;
pub mod league;

pub use catalog::{Catalog, Ground, Team};
pub use dataset::{DataBatch, DataPoint, DataSet};
pub use league::{League, LeagueStats, MatchCorpus, Round, Season};
