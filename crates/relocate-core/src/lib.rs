// # relocate-core
//
// Core library for propagating a change of address to third-party
// providers.
//
// ## Architecture Overview
//
// - **AddressUpdateService**: Trait every provider integration implements
// - **FormAutomation**: Capability for integrations that drive a web form
// - **BrowserEngine / BrowserSession**: Seam to whatever drives the browser
// - **ServiceRegistry**: Closed set of integrations, routed by service id
// - **UpdateEngine**: Fans one move out to every selected provider
// - **StatusPoller**: Follows pending updates until they settle
//
// ## Design Principles
//
// 1. **One session per attempt**: integrations are created fresh from a
//    factory for every attempt and release their session exactly once
// 2. **Results, not exceptions**: provider rejections are data; only
//    conditions that leave an integration blind are errors
// 3. **Human in the loop**: verification is a state the caller acts on,
//    never a callback
// 4. **Library-First**: the daemon is a thin shell over this crate

pub mod config;
pub mod engine;
pub mod error;
pub mod forms;
pub mod model;
pub mod poller;
pub mod registry;
pub mod result;
pub mod traits;

// Re-export core types for convenience
pub use config::{AutomationConfig, EngineConfig, PollingConfig, ProviderConfig, RelocateConfig};
pub use engine::{EngineEvent, MoveUpdateRequest, ServiceRequest, UpdateEngine};
pub use error::{Error, ErrorKind, Result};
pub use forms::{FormData, FormDescriptor, FormDrift, FormField, ServiceWebForm};
pub use model::{Address, Move, MoveStatus, ServiceCredentials};
pub use poller::{PollHandle, PollSnapshot, PollStop, PollTarget, StatusPoller};
pub use registry::{ServiceAttempt, ServiceRegistry};
pub use result::{MoveUpdateReport, Progress, ServiceOutcome, ServiceUpdateResult, UpdateStatus};
pub use traits::{
    AddressUpdateService, BrowserEngine, BrowserSession, FormAutomation, IntegrationType,
    LaunchOptions, ServiceDescriptor, ServiceFactory, Viewport,
};
