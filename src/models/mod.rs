pub mod account;
pub mod run_log;
pub mod session;

pub use account::{Account, ErrorResponse, UserPreferences};
pub use run_log::RunLog;
pub use session::{
    DistanceUnit, SessionConfig, SessionError, SessionRecord, SessionRecordBuilder, SplitPlan,
    Splits, TimeSpan,
};
