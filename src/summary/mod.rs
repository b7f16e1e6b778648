//! Mail summary workflow: sign in, fetch recent mail, stream a summary.

pub mod effects;
pub mod reducer;
pub mod state;
pub mod view;

pub use effects::SummaryEffects;
pub use reducer::{SummaryAction, SummaryEffect, SummaryReducer};
pub use state::{Screen, SummaryState};
pub use view::SummaryView;
