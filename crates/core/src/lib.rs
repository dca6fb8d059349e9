//! Portal core: client session state and the types around it

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod grant;
pub mod session;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{InstrumentationConfig, PortalConfig, SessionConfig, SessionMode};
pub use error::{Error, Result};
pub use events::{ListenerId, SessionEvent, SessionListener};
pub use grant::LoginGrant;
pub use session::SessionState;
