//! Distribution of access-scoped agenda views
//!
//! Changes are reduced to the agendas they affect, and every audience's
//! published graph is rebuilt for those agendas through a scratch graph.

pub mod audience;
pub mod audiences;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod reducer;
pub mod scratch;
pub mod service;


pub use audience::{Audience, CollectionStep};
pub use audiences::{audience_names, get_audience};
pub use error::{DistributeError, Result};
pub use model::build_model;
pub use pipeline::{Distributor, DistributorSettings, RunReport, Scope, StepReport};
pub use reducer::ChangeReducer;
pub use scratch::{ScratchGraph, find_scratch_graphs, reconcile_orphaned_scratch_graphs};
pub use service::SyncService;
