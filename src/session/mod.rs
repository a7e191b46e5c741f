pub mod selection;
pub mod training;
pub mod word_detail;

pub use selection::{Anchor, Languages, SelectionWorkflow};
pub use training::{TrainingQueue, TrainingWord};
pub use word_detail::{CommitPolicy, WordDetailFlow, WordDetailSession};
