pub mod intent;

pub use intent::{
    Intent, IntentRecord, IntentResponse, IntentState, IntentStatus, IntentStep, IntentStepRecord,
    SimulationResponse,
};
