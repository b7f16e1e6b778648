//! Chat with the language model.

pub mod effects;
pub mod model;
pub mod reducer;
pub mod view;

pub use effects::ChatEffects;
pub use model::{AssistantStatus, ChatEntry, ChatState};
pub use reducer::{ChatAction, ChatEffect, ChatReducer};
pub use view::{Bubble, ChatView};
