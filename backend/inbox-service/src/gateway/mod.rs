pub mod events;
pub mod registry;

pub use events::GatewayEvent;
pub use registry::SessionRegistry;
