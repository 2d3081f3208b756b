pub mod auth;
pub mod derivative;
pub mod design_automation;
pub mod storage;

pub use auth::*;
pub use derivative::*;
pub use design_automation::*;
pub use storage::*;
